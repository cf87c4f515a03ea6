//! The per-sample augmentation pipeline.
//!
//! [`AugmentationPipeline::generate`] turns one [`SampleRequest`] into a
//! [`Sample`]: it resolves the font and its glyph profile, filters the
//! label, samples an [`AugmentationRecipe`] and runs every stage in order.
//! All randomness comes from one `StdRng` seeded from the batch seed and
//! the sample index.

use crate::core::config::{ConfigValidator, GeneratorConfig};
use crate::core::constants::BASE_PADDING_SPACES;
use crate::core::errors::{SynthError, SynthResult};
use crate::core::validation::ensure_non_empty;
use crate::domain::{
    AugmentationRecipe, Bitmap, DistortionParams, Sample, SampleRequest, TextColor, TextSpec,
};
use crate::fonts::{FontStore, GlyphProfileRepository};
use crate::processors::{
    BackgroundSource, BlurProcessor, ElasticAffineWarper, GeometricDistorter,
    ProceduralBackgrounds, TextRasterizer, apply_erosion, apply_pixel_noise, aspect_resize,
    composite, crop_top, invert, rotate_expand, sharpen, shear, speckle,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Generates samples from requests.
///
/// The pipeline is `Sync`; one instance serves every worker of a batch.
pub struct AugmentationPipeline {
    config: GeneratorConfig,
    rasterizer: TextRasterizer,
    distorter: GeometricDistorter,
    warper: ElasticAffineWarper,
    blur: BlurProcessor,
    backgrounds: Arc<dyn BackgroundSource>,
    fonts: Arc<FontStore>,
    profiles: Arc<GlyphProfileRepository>,
}

impl std::fmt::Debug for AugmentationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AugmentationPipeline")
            .field("height", &self.config.height)
            .field("fonts", &self.fonts.len())
            .field("profiles", &self.profiles)
            .finish()
    }
}

/// Collects stage outputs when debug dumps are enabled.
struct StageTrace {
    enabled: bool,
    stages: Vec<(&'static str, Bitmap)>,
}

impl StageTrace {
    fn record(&mut self, stage: &'static str, bitmap: &Bitmap) {
        if self.enabled {
            self.stages.push((stage, bitmap.clone()));
        }
    }
}

impl AugmentationPipeline {
    /// Creates a pipeline from a validated configuration.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid or `pictures_dir` cannot be
    /// read.
    pub fn new(
        config: GeneratorConfig,
        fonts: Arc<FontStore>,
        profiles: Arc<GlyphProfileRepository>,
    ) -> SynthResult<Self> {
        config.validate()?;
        let backgrounds: Arc<dyn BackgroundSource> = match &config.pictures_dir {
            Some(dir) => Arc::new(ProceduralBackgrounds::with_pictures_dir(dir)?),
            None => Arc::new(ProceduralBackgrounds::new()),
        };
        Ok(Self {
            rasterizer: TextRasterizer::from_config(&config),
            distorter: GeometricDistorter::new(),
            warper: ElasticAffineWarper::new(config.weights.warp_min_size),
            blur: BlurProcessor::from_config(&config),
            backgrounds,
            fonts,
            profiles,
            config,
        })
    }

    /// Replaces the background source.
    pub fn with_backgrounds(mut self, backgrounds: Arc<dyn BackgroundSource>) -> Self {
        self.backgrounds = backgrounds;
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn profiles(&self) -> &GlyphProfileRepository {
        &self.profiles
    }

    /// Builds the glyph profiles of `fonts` ahead of sample generation.
    ///
    /// Returns the number of fonts whose profile is available.
    pub fn warm_profiles(&self, fonts: &[PathBuf]) -> usize {
        self.profiles.warm(fonts, &self.fonts)
    }

    /// Generates one sample with a freshly sampled recipe.
    ///
    /// # Errors
    ///
    /// Any stage failure aborts the sample: [`SynthError::FontLoad`] for an
    /// unusable font, [`SynthError::Render`] when no drawable character is
    /// left or a stage degenerates, [`SynthError::Transform`] for singular
    /// warps.
    pub fn generate(&self, request: &SampleRequest, batch_seed: u64) -> SynthResult<Sample> {
        let mut rng = StdRng::seed_from_u64(request.seed(batch_seed));
        self.run(request, None, &mut rng)
    }

    /// Generates one sample, replaying `recipe` instead of sampling one.
    pub fn generate_with_recipe(
        &self,
        request: &SampleRequest,
        recipe: &AugmentationRecipe,
        batch_seed: u64,
    ) -> SynthResult<Sample> {
        let mut rng = StdRng::seed_from_u64(request.seed(batch_seed));
        self.run(request, Some(recipe), &mut rng)
    }

    fn run(
        &self,
        request: &SampleRequest,
        recipe: Option<&AugmentationRecipe>,
        rng: &mut StdRng,
    ) -> SynthResult<Sample> {
        let font = self.fonts.get(&request.font)?;
        let profile = self.profiles.get_or_build(&font)?;

        // Blank requests are legitimate samples; blank leftovers of real text
        // are not.
        let label = profile.filter_text(&request.text);
        let emptied = label.trim().is_empty() && !request.text.trim().is_empty();
        if label.is_empty() || emptied {
            return Err(SynthError::render(format!(
                "no drawable characters in {:?} for {}",
                request.text,
                profile.font_key()
            )));
        }

        let recipe = match recipe {
            Some(recipe) => recipe.clone(),
            None => AugmentationRecipe::sample(&self.config, &label, rng)?,
        };
        debug!("Sample {} recipe: {:?}", request.index, recipe);

        let mut trace = StageTrace {
            enabled: self.config.debug,
            stages: Vec::new(),
        };
        let w = &self.config.weights;

        // 1. padding
        let body = if recipe.expand_spaces {
            expand_spaces(&label, rng)
        } else {
            label.clone()
        };
        let text = format!(
            "{}{}{}",
            " ".repeat(BASE_PADDING_SPACES + recipe.leading_spaces),
            body,
            " ".repeat(BASE_PADDING_SPACES + recipe.trailing_spaces)
        );

        // 2. rasterize
        let spec = TextSpec::new(text, recipe.text_mode, self.config.height);
        let color = TextColor::from_signed(self.config.text_color);
        let mut image = self.rasterizer.render(&spec, &font, color, rng)?;
        trace.record("text", &image);

        // 3. rotation
        image = rotate_expand(&image, recipe.rotation_degrees)?;
        trace.record("rotated", &image);

        // 4. erosion and pixel noise
        image = apply_erosion(&image, &recipe.erosion)?;
        image = apply_pixel_noise(&image, &recipe.pixel_noise, rng)?;
        trace.record("eroded", &image);

        // 5. pixel-shift distortion
        image = self.distorter.warp(&image, &recipe.distortion, rng)?;
        trace.record("distorted", &image);

        // 6. resampling warp
        let affine_too_small = matches!(recipe.warp, DistortionParams::AffineJitter { .. })
            && image.height() <= w.affine_min_height;
        if affine_too_small {
            debug!(
                "Skipping affine jitter on {}px tall image",
                image.height()
            );
        } else {
            image = self.warper.apply(&image, &recipe.warp, rng)?;
        }
        trace.record("warped", &image);

        // 7. background
        if let Some(kind) = recipe.background {
            let (mx, my) = recipe.background_margin;
            let canvas =
                self.backgrounds
                    .generate(kind, image.width() + mx, image.height() + my, rng)?;
            image = composite(&canvas, &image, (mx / 2, my / 2));
            trace.record("background", &image);
        }

        // 8. aspect resize
        image = aspect_resize(&image, &recipe.resize, self.config.height_bounds())?;
        trace.record("resized", &image);

        // 9-10. blur and sharpen
        image = self.blur.apply(&image, recipe.blur, rng)?;
        if recipe.sharpen {
            image = sharpen(&image);
        }
        trace.record("blurred", &image);

        // 11. shear
        image = shear(&image, recipe.shear_degrees)?;
        trace.record("sheared", &image);

        // 12. inversion and speckle
        if recipe.invert {
            image = invert(&image);
        }
        image = speckle(&image, &recipe.speckle, rng);
        trace.record("photometric", &image);

        // 13. crop
        if let Some(rows) = recipe.crop_top {
            image = crop_top(&image, rows);
            trace.record("cropped", &image);
        }

        ensure_non_empty(&image, "sample")?;
        Ok(Sample {
            index: request.index,
            image,
            label,
            font: request.font.clone(),
            recipe,
            stages: trace.stages,
        })
    }
}

/// Lengthens every inner space by a geometric number of extra spaces
/// (each further space with probability 2/3).
fn expand_spaces<R: Rng + ?Sized>(text: &str, rng: &mut R) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() * 2);
    for (i, &ch) in chars.iter().enumerate() {
        out.push(ch);
        if ch == ' ' && i + 1 < chars.len() {
            while rng.gen_range(0..3) != 0 {
                out.push(' ');
            }
        }
    }
    out
}
