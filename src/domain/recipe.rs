//! The augmentation recipe: every random decision for one sample.
//!
//! A recipe is sampled once, before any pixel is touched, from the weighted
//! tables in [`RecipeWeights`]. Stages then read their decision from the
//! recipe instead of rolling dice inline, so a recipe can be logged,
//! replayed against another text, or unit-tested without rendering.
//!
//! Per-pixel randomness (masks, displacement fields, noise) is still drawn
//! during execution from the same seeded generator.

use super::distortion::{DistortionKind, DistortionParams, Orientation, WarpKind};
use super::text::TextMode;
use crate::core::config::{GeneratorConfig, RecipeWeights};
use crate::core::errors::SynthResult;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Structural erosion of the rotated text image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Erosion {
    None,
    /// Erode the whole image with a `kernel x kernel` window.
    Full { kernel: u32 },
    /// Erode the column span `[start, end)`, given as width fractions.
    Band { start: f32, end: f32, kernel: u32 },
}

/// Sparse per-pixel perturbation. The two variants are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PixelNoise {
    None,
    /// Pixels where a random mask is set take their eroded value.
    RandomErode { kernel: u32, keep_probability: f32 },
    /// Pixels where a random mask is clear are forced to background.
    PixelDiscard { keep_probability: f32 },
}

impl PixelNoise {
    pub fn is_active(&self) -> bool {
        !matches!(self, PixelNoise::None)
    }
}

/// Procedural canvas placed behind the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackgroundKind {
    GaussianNoise,
    PlainWhite,
    Quasicrystal,
    Picture,
}

impl BackgroundKind {
    /// Maps the numeric CLI code (0 noise, 1 plain, 2 quasicrystal, 3 picture).
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(BackgroundKind::GaussianNoise),
            1 => Some(BackgroundKind::PlainWhite),
            2 => Some(BackgroundKind::Quasicrystal),
            3 => Some(BackgroundKind::Picture),
            _ => None,
        }
    }
}

/// Axes scaled by the aspect-ratio jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResizeAxis {
    Width,
    Height,
    Both,
}

/// Resampling filter used by the aspect-ratio jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResizeFilter {
    Bilinear,
    Lanczos,
}

/// Aspect-ratio jitter decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResizePlan {
    pub axis: ResizeAxis,
    pub factor: f32,
    pub filter: ResizeFilter,
}

/// Blur applied after compositing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlurKind {
    None,
    LinearMotion,
    Gaussian,
    Box,
    Averaging,
    /// Point-spread-function blur; only for samples without a background.
    PointSpread,
}

/// Sparse salt (white) or pepper (black) noise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SpeckleNoise {
    None,
    Salt { density: f32 },
    Pepper { density: f32 },
}

/// The full bag of sampled decisions for one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AugmentationRecipe {
    /// Extra leading spaces beyond the fixed padding.
    pub leading_spaces: usize,
    /// Extra trailing spaces beyond the fixed padding.
    pub trailing_spaces: usize,
    /// Randomly widen internal spaces.
    pub expand_spaces: bool,
    pub text_mode: TextMode,
    /// Counter-clockwise rotation in degrees.
    pub rotation_degrees: f32,
    pub erosion: Erosion,
    pub pixel_noise: PixelNoise,
    /// Pixel-shift distortion pass.
    pub distortion: DistortionParams,
    /// Resampling warp pass (affine, elastic or perspective).
    pub warp: DistortionParams,
    /// `None` skips compositing and keeps the text image as the canvas.
    pub background: Option<BackgroundKind>,
    /// Extra background width and height around the text.
    pub background_margin: (u32, u32),
    pub resize: ResizePlan,
    pub blur: BlurKind,
    pub sharpen: bool,
    /// Horizontal shear angle in degrees.
    pub shear_degrees: f32,
    pub invert: bool,
    pub speckle: SpeckleNoise,
    /// Rows dropped from the top, when random cropping is enabled.
    pub crop_top: Option<u32>,
}

impl AugmentationRecipe {
    /// A recipe that renders the text plainly: no perturbation at all.
    ///
    /// Resize still clamps the height into the configured bounds and the
    /// mandatory shear runs with a zero angle.
    pub fn identity() -> Self {
        Self {
            leading_spaces: 0,
            trailing_spaces: 0,
            expand_spaces: false,
            text_mode: TextMode::Normal,
            rotation_degrees: 0.0,
            erosion: Erosion::None,
            pixel_noise: PixelNoise::None,
            distortion: DistortionParams::None,
            warp: DistortionParams::None,
            background: None,
            background_margin: (0, 0),
            resize: ResizePlan {
                axis: ResizeAxis::Both,
                factor: 1.0,
                filter: ResizeFilter::Lanczos,
            },
            blur: BlurKind::None,
            sharpen: false,
            shear_degrees: 0.0,
            invert: false,
            speckle: SpeckleNoise::None,
            crop_top: None,
        }
    }

    /// Samples every decision for one sample.
    ///
    /// # Arguments
    ///
    /// * `config` - Generator configuration holding the weight tables.
    /// * `text` - The (already filtered) sample text; only its shape is read.
    /// * `rng` - The per-sample random generator.
    ///
    /// # Errors
    ///
    /// Fails only if a weight table is not samplable.
    pub fn sample<R: Rng + ?Sized>(
        config: &GeneratorConfig,
        text: &str,
        rng: &mut R,
    ) -> SynthResult<Self> {
        let w = &config.weights;

        let leading_spaces = extra_spaces(w, 3, rng);
        let trailing_spaces = extra_spaces(w, 4, rng);
        let expand_spaces = text.contains(' ') && rng.gen_bool(w.expand_spaces_probability);

        let text_mode = w.text_mode.sample("text_mode", rng)?;
        let rotation_degrees = sample_rotation(config, rng);

        let erosion = sample_erosion(w, rng);
        let pixel_noise = sample_pixel_noise(w, rng);

        let mut distortion_kind = match config.distortion {
            Some(kind) => kind,
            None => w.distortion.sample("distortion", rng)?,
        };
        if distortion_kind == DistortionKind::Random && pixel_noise.is_active() {
            distortion_kind = DistortionKind::Cosine;
        }
        let distortion = distortion_params(
            distortion_kind,
            config.distortion_orientation,
            w.max_offset,
        );

        let warp = if pixel_noise.is_active() {
            DistortionParams::None
        } else {
            warp_params(w.warp.sample("warp", rng)?, w)
        };

        let skip_background = rng.gen_bool(w.background_skip_probability);
        let background = if skip_background {
            None
        } else {
            let kind = match config.background {
                Some(kind) => kind,
                None => w.background.sample("background", rng)?,
            };
            Some(constrain_background(kind, pixel_noise, distortion_kind))
        };
        let background_margin = (
            rng.gen_range(w.background_margin.0..=w.background_margin.1),
            rng.gen_range(w.background_margin.0..=w.background_margin.1),
        );

        let resize = ResizePlan {
            axis: w.resize_axis.sample("resize_axis", rng)?,
            factor: rng.gen_range(w.aspect_range.0..=w.aspect_range.1),
            filter: if rng.gen_bool(0.5) {
                ResizeFilter::Lanczos
            } else {
                ResizeFilter::Bilinear
            },
        };

        let blur = if config.blur && !pixel_noise.is_active() {
            match w.blur.sample("blur", rng)? {
                BlurKind::PointSpread if background.is_some() => BlurKind::None,
                kind => kind,
            }
        } else {
            BlurKind::None
        };
        let sharpen = blur != BlurKind::PointSpread && rng.gen_bool(w.sharpen_probability);

        let shear_degrees = rng.gen_range(-w.shear_max_degrees..=w.shear_max_degrees);

        let busy = background == Some(BackgroundKind::Picture)
            || distortion_kind != DistortionKind::None
            || blur != BlurKind::None;
        let invert = rng.gen_bool(w.invert_probability)
            && (!busy || rng.gen_bool(w.busy_invert_probability));
        let speckle = if rng.gen_bool(w.speckle_probability) {
            let density = rng.gen_range(w.speckle_density.0..=w.speckle_density.1);
            if invert {
                SpeckleNoise::Salt { density }
            } else {
                SpeckleNoise::Pepper { density }
            }
        } else {
            SpeckleNoise::None
        };

        let crop_top = config
            .random_crop
            .then(|| rng.gen_range(w.crop_rows.0..=w.crop_rows.1));

        Ok(Self {
            leading_spaces,
            trailing_spaces,
            expand_spaces,
            text_mode,
            rotation_degrees,
            erosion,
            pixel_noise,
            distortion,
            warp,
            background,
            background_margin,
            resize,
            blur,
            sharpen,
            shear_degrees,
            invert,
            speckle,
            crop_top,
        })
    }
}

fn extra_spaces<R: Rng + ?Sized>(w: &RecipeWeights, max: usize, rng: &mut R) -> usize {
    if rng.gen_bool(w.pad_extra_probability) {
        rng.gen_range(1..=max)
    } else {
        0
    }
}

fn sample_rotation<R: Rng + ?Sized>(config: &GeneratorConfig, rng: &mut R) -> f32 {
    if !config.random_skew {
        return config.skew_angle;
    }
    let magnitude = config.skew_angle.abs();
    let bound = if rng.gen_bool(config.weights.near_level_probability) {
        magnitude / 4.0
    } else {
        magnitude
    };
    rng.gen_range(-bound..=bound)
}

fn sample_erosion<R: Rng + ?Sized>(w: &RecipeWeights, rng: &mut R) -> Erosion {
    if !rng.gen_bool(w.erosion_probability) {
        return Erosion::None;
    }
    if rng.gen_bool(w.full_erosion_probability) {
        Erosion::Full {
            kernel: rng.gen_range(1..=3),
        }
    } else {
        let start = rng.gen_range(0.0..=0.7f32);
        Erosion::Band {
            start,
            end: rng.gen_range(start..=1.0),
            kernel: rng.gen_range(1..=4),
        }
    }
}

fn sample_pixel_noise<R: Rng + ?Sized>(w: &RecipeWeights, rng: &mut R) -> PixelNoise {
    let (low, high) = w.pixel_keep_range;
    if rng.gen_bool(w.random_erode_probability) {
        PixelNoise::RandomErode {
            kernel: rng.gen_range(1..=3),
            keep_probability: rng.gen_range(low..=high),
        }
    } else if rng.gen_bool(w.pixel_discard_probability) {
        PixelNoise::PixelDiscard {
            keep_probability: rng.gen_range(low..=high),
        }
    } else {
        PixelNoise::None
    }
}

fn distortion_params(
    kind: DistortionKind,
    orientation: Orientation,
    max_offset: u32,
) -> DistortionParams {
    match kind {
        DistortionKind::None => DistortionParams::None,
        DistortionKind::Sine => DistortionParams::Sine {
            orientation,
            max_offset,
        },
        DistortionKind::Cosine => DistortionParams::Cosine {
            orientation,
            max_offset,
        },
        DistortionKind::Random => DistortionParams::UniformRandom { orientation },
    }
}

fn warp_params(kind: WarpKind, w: &RecipeWeights) -> DistortionParams {
    match kind {
        WarpKind::None => DistortionParams::None,
        WarpKind::Affine => DistortionParams::AffineJitter {
            magnitude: w.affine_magnitude,
        },
        WarpKind::Elastic => DistortionParams::Elastic {
            alpha_x: w.elastic_alpha.0,
            alpha_y: w.elastic_alpha.1,
            sigma: w.elastic_sigma,
        },
        WarpKind::Perspective => DistortionParams::Perspective {
            jitter_range: w.perspective_jitter,
        },
    }
}

/// Busy backgrounds are not combined with pixel noise or random distortion.
fn constrain_background(
    kind: BackgroundKind,
    pixel_noise: PixelNoise,
    distortion: DistortionKind,
) -> BackgroundKind {
    match kind {
        BackgroundKind::Quasicrystal if pixel_noise.is_active() => BackgroundKind::GaussianNoise,
        BackgroundKind::Picture
            if pixel_noise.is_active() || distortion == DistortionKind::Random =>
        {
            BackgroundKind::GaussianNoise
        }
        kind => kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::WeightedTable;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_same_seed_same_recipe() {
        let config = GeneratorConfig::default().with_skew(4.0, true);
        let a = AugmentationRecipe::sample(&config, "hello world", &mut StdRng::seed_from_u64(5))
            .unwrap();
        let b = AugmentationRecipe::sample(&config, "hello world", &mut StdRng::seed_from_u64(5))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fixed_skew_is_used_verbatim() {
        let config = GeneratorConfig::default().with_skew(2.5, false);
        let recipe =
            AugmentationRecipe::sample(&config, "abc", &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(recipe.rotation_degrees, 2.5);
    }

    #[test]
    fn test_random_skew_within_bounds() {
        let config = GeneratorConfig::default().with_skew(6.0, true);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let recipe = AugmentationRecipe::sample(&config, "abc", &mut rng).unwrap();
            assert!(recipe.rotation_degrees.abs() <= 6.0);
        }
    }

    #[test]
    fn test_pixel_noise_excludes_warp_and_blur() {
        let mut weights = RecipeWeights::default();
        weights.random_erode_probability = 1.0;
        weights.warp = WeightedTable::always(WarpKind::Elastic);
        weights.blur = WeightedTable::always(BlurKind::Gaussian);
        weights.distortion = WeightedTable::always(DistortionKind::Random);
        let config = GeneratorConfig::default().with_weights(weights);

        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let recipe = AugmentationRecipe::sample(&config, "abc", &mut rng).unwrap();
            assert!(matches!(recipe.pixel_noise, PixelNoise::RandomErode { .. }));
            assert_eq!(recipe.warp, DistortionParams::None);
            assert_eq!(recipe.blur, BlurKind::None);
            assert!(matches!(recipe.distortion, DistortionParams::Cosine { .. }));
        }
    }

    #[test]
    fn test_point_spread_only_without_background() {
        let mut weights = RecipeWeights::default();
        weights.blur = WeightedTable::always(BlurKind::PointSpread);
        weights.random_erode_probability = 0.0;
        weights.pixel_discard_probability = 0.0;
        let config = GeneratorConfig::default().with_weights(weights);

        let mut rng = StdRng::seed_from_u64(21);
        for _ in 0..200 {
            let recipe = AugmentationRecipe::sample(&config, "abc", &mut rng).unwrap();
            if recipe.background.is_some() {
                assert_eq!(recipe.blur, BlurKind::None);
            } else {
                assert_eq!(recipe.blur, BlurKind::PointSpread);
                assert!(!recipe.sharpen);
            }
        }
    }

    #[test]
    fn test_speckle_matches_inversion() {
        let mut weights = RecipeWeights::default();
        weights.speckle_probability = 1.0;
        let config = GeneratorConfig::default().with_weights(weights);

        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..200 {
            let recipe = AugmentationRecipe::sample(&config, "abc", &mut rng).unwrap();
            match recipe.speckle {
                SpeckleNoise::Salt { .. } => assert!(recipe.invert),
                SpeckleNoise::Pepper { .. } => assert!(!recipe.invert),
                SpeckleNoise::None => panic!("speckle probability is 1"),
            }
        }
    }

    #[test]
    fn test_forced_background_and_distortion() {
        let mut weights = RecipeWeights::default();
        weights.background_skip_probability = 0.0;
        weights.random_erode_probability = 0.0;
        weights.pixel_discard_probability = 0.0;
        let config = GeneratorConfig::default()
            .with_weights(weights)
            .with_background(Some(BackgroundKind::PlainWhite))
            .with_distortion(Some(DistortionKind::Sine), Orientation::Both);

        let recipe =
            AugmentationRecipe::sample(&config, "abc", &mut StdRng::seed_from_u64(2)).unwrap();
        assert_eq!(recipe.background, Some(BackgroundKind::PlainWhite));
        assert_eq!(
            recipe.distortion,
            DistortionParams::Sine {
                orientation: Orientation::Both,
                max_offset: 2
            }
        );
    }

    #[test]
    fn test_expand_spaces_requires_space() {
        let mut weights = RecipeWeights::default();
        weights.expand_spaces_probability = 1.0;
        let config = GeneratorConfig::default().with_weights(weights);
        let mut rng = StdRng::seed_from_u64(4);
        let recipe = AugmentationRecipe::sample(&config, "nospace", &mut rng).unwrap();
        assert!(!recipe.expand_spaces);
        let recipe = AugmentationRecipe::sample(&config, "has space", &mut rng).unwrap();
        assert!(recipe.expand_spaces);
    }

    #[test]
    fn test_recipe_serializes() {
        let recipe = AugmentationRecipe::identity();
        let json = serde_json::to_string(&recipe).unwrap();
        let back: AugmentationRecipe = serde_json::from_str(&json).unwrap();
        assert_eq!(back, recipe);
    }
}
