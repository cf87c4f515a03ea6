//! Generator configuration.
//!
//! [`GeneratorConfig`] carries every knob the sample pipeline reads: the
//! caller-facing parameters (height, skew, blur, background, distortion,
//! output naming) and the [`RecipeWeights`] that govern how often each
//! augmentation fires. All tunables are named here rather than hardcoded in
//! the stages, so a run can be reproduced from its JSON config and seed.

use super::errors::{ConfigError, ConfigValidator};
use super::parallel::ParallelPolicy;
use super::weights::WeightedTable;
use crate::core::constants::{DEFAULT_HEIGHT, DEFAULT_TEXT_MARGIN};
use crate::core::errors::SynthResult;
use crate::domain::{BackgroundKind, BlurKind, DistortionKind, Orientation, ResizeAxis, TextMode, WarpKind};
use crate::fonts::GlyphCheckConfig;
use crate::pipeline::output::NameFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Probabilities, ranges and weight tables used when sampling a recipe.
///
/// The defaults are the tuning of the last production snapshot; they are
/// starting points to be validated against the target recognition task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipeWeights {
    /// Probability that extra leading (1..=3) or trailing (1..=4) spaces are added.
    pub pad_extra_probability: f64,
    /// Probability that internal spaces get expanded, when the text has any.
    pub expand_spaces_probability: f64,

    /// Text layout mode table.
    pub text_mode: WeightedTable<TextMode>,
    /// Enlargement factor range for the split dual-size mode.
    pub split_scale_range: (f32, f32),
    /// Enlargement factor range for the per-character jitter mode.
    pub jitter_scale_range: (f32, f32),
    /// Per-character enlargement probability in the jitter mode.
    pub jitter_big_probability: f64,
    /// Advance compression range for tight kerning.
    pub tight_advance_range: (f32, f32),
    /// Extra pixel gap table for the random spacing mode.
    pub extra_spacing: WeightedTable<u32>,

    /// Probability that a random skew is drawn from a quarter of the magnitude.
    pub near_level_probability: f64,

    /// Probability of a morphological erosion pass.
    pub erosion_probability: f64,
    /// Given erosion, probability that it covers the whole image (else a band).
    pub full_erosion_probability: f64,
    /// Probability of blending an eroded copy through a random pixel mask.
    pub random_erode_probability: f64,
    /// Probability of whitening a sparse random pixel mask.
    pub pixel_discard_probability: f64,
    /// Range of the per-pixel keep probability for the two masks above.
    pub pixel_keep_range: (f32, f32),

    /// Pixel-shift distortion table.
    pub distortion: WeightedTable<DistortionKind>,
    /// Amplitude of sine/cosine distortion in pixels.
    pub max_offset: u32,

    /// Resampling warp table.
    pub warp: WeightedTable<WarpKind>,
    /// Affine jitter magnitude relative to the smaller image side.
    pub affine_magnitude: f32,
    /// Images at or below this height skip the affine jitter.
    pub affine_min_height: u32,
    /// Elastic displacement amplitude `(x, y)` relative to the smaller image side.
    pub elastic_alpha: (f32, f32),
    /// Gaussian smoothing of the coarse elastic field, in grid cells.
    pub elastic_sigma: f32,
    /// Perspective corner jitter relative to the smaller image side.
    pub perspective_jitter: f32,
    /// Images whose smaller side is below this skip every resampling warp.
    pub warp_min_size: u32,

    /// Background canvas table.
    pub background: WeightedTable<BackgroundKind>,
    /// Probability that the text image is used as the final canvas.
    pub background_skip_probability: f64,
    /// Extra background margin range in pixels, per axis.
    pub background_margin: (u32, u32),

    /// Aspect-ratio jitter factor range.
    pub aspect_range: (f32, f32),
    /// Which axes the aspect jitter scales.
    pub resize_axis: WeightedTable<ResizeAxis>,

    /// Blur table.
    pub blur: WeightedTable<BlurKind>,
    /// Point-spread blur only applies to images wider than this.
    pub psf_min_width: u32,
    /// Probability of edge-enhancement sharpening.
    pub sharpen_probability: f64,

    /// Shear angle bound in degrees.
    pub shear_max_degrees: f32,

    /// Probability of photometric inversion.
    pub invert_probability: f64,
    /// Inversion probability multiplier for already busy samples.
    pub busy_invert_probability: f64,
    /// Probability of salt/pepper speckle injection.
    pub speckle_probability: f64,
    /// Fraction of pixels flipped by the speckle pass.
    pub speckle_density: (f32, f32),

    /// Range of rows dropped by the top crop.
    pub crop_rows: (u32, u32),
}

impl Default for RecipeWeights {
    fn default() -> Self {
        Self {
            pad_extra_probability: 0.25,
            expand_spaces_probability: 0.7,
            text_mode: WeightedTable::new([
                (TextMode::Normal, 0.87),
                (TextMode::SplitDualSize, 0.10),
                (TextMode::TightKerning, 0.03),
                (TextMode::PerCharacterJitteredSize, 0.0),
                (TextMode::RandomExtraSpacing, 0.0),
            ]),
            split_scale_range: (1.0, 1.5),
            jitter_scale_range: (1.0, 1.1),
            jitter_big_probability: 0.3,
            tight_advance_range: (0.9, 0.96),
            extra_spacing: WeightedTable::new([(0, 0.55), (1, 0.25), (2, 0.12), (3, 0.08)]),
            near_level_probability: 0.5,
            erosion_probability: 0.3,
            full_erosion_probability: 0.7,
            random_erode_probability: 0.06,
            pixel_discard_probability: 0.06,
            pixel_keep_range: (0.97, 1.0),
            distortion: WeightedTable::new([
                (DistortionKind::None, 0.65),
                (DistortionKind::Sine, 0.15),
                (DistortionKind::Cosine, 0.15),
                (DistortionKind::Random, 0.05),
            ]),
            max_offset: 2,
            warp: WeightedTable::new([
                (WarpKind::Affine, 0.30),
                (WarpKind::Elastic, 0.15),
                (WarpKind::Perspective, 0.0),
                (WarpKind::None, 0.55),
            ]),
            affine_magnitude: 0.005,
            affine_min_height: 40,
            elastic_alpha: (0.03, 0.03),
            elastic_sigma: 1.0,
            perspective_jitter: 0.05,
            warp_min_size: 8,
            background: WeightedTable::new([
                (BackgroundKind::GaussianNoise, 0.10),
                (BackgroundKind::PlainWhite, 0.30),
                (BackgroundKind::Quasicrystal, 0.02),
                (BackgroundKind::Picture, 0.58),
            ]),
            background_skip_probability: 1.0 / 11.0,
            background_margin: (1, 10),
            aspect_range: (0.6, 1.4),
            resize_axis: WeightedTable::new([
                (ResizeAxis::Width, 0.5),
                (ResizeAxis::Height, 0.25),
                (ResizeAxis::Both, 0.25),
            ]),
            blur: WeightedTable::new([
                (BlurKind::None, 0.45),
                (BlurKind::LinearMotion, 0.10),
                (BlurKind::Gaussian, 0.20),
                (BlurKind::Box, 0.05),
                (BlurKind::Averaging, 0.05),
                (BlurKind::PointSpread, 0.15),
            ]),
            psf_min_width: 100,
            sharpen_probability: 0.2,
            shear_max_degrees: 3.0,
            invert_probability: 0.2,
            busy_invert_probability: 0.1,
            speckle_probability: 0.05,
            speckle_density: (0.001, 0.005),
            crop_rows: (10, 20),
        }
    }
}

impl ConfigValidator for RecipeWeights {
    fn validate(&self) -> Result<(), ConfigError> {
        for (field, p) in [
            ("pad_extra_probability", self.pad_extra_probability),
            ("expand_spaces_probability", self.expand_spaces_probability),
            ("jitter_big_probability", self.jitter_big_probability),
            ("near_level_probability", self.near_level_probability),
            ("erosion_probability", self.erosion_probability),
            ("full_erosion_probability", self.full_erosion_probability),
            ("random_erode_probability", self.random_erode_probability),
            ("pixel_discard_probability", self.pixel_discard_probability),
            ("background_skip_probability", self.background_skip_probability),
            ("sharpen_probability", self.sharpen_probability),
            ("invert_probability", self.invert_probability),
            ("busy_invert_probability", self.busy_invert_probability),
            ("speckle_probability", self.speckle_probability),
        ] {
            self.validate_probability(field, p)?;
        }

        self.validate_range("split_scale_range", self.split_scale_range, 1.0)?;
        self.validate_range("jitter_scale_range", self.jitter_scale_range, 1.0)?;
        self.validate_range("tight_advance_range", self.tight_advance_range, 0.1)?;
        if self.tight_advance_range.1 > 1.0 {
            return Err(ConfigError::InvalidRange {
                field: "tight_advance_range".to_string(),
                low: self.tight_advance_range.0 as f64,
                high: self.tight_advance_range.1 as f64,
            });
        }
        self.validate_range("pixel_keep_range", self.pixel_keep_range, 0.0)?;
        self.validate_range("aspect_range", self.aspect_range, 0.05)?;
        self.validate_range("speckle_density", self.speckle_density, 0.0)?;
        self.validate_int_range("background_margin", self.background_margin)?;
        self.validate_int_range("crop_rows", self.crop_rows)?;
        for (field, value) in [
            ("pixel_keep_range", self.pixel_keep_range.1),
            ("speckle_density", self.speckle_density.1),
        ] {
            self.validate_probability(field, value as f64)?;
        }

        for (field, value) in [
            ("affine_magnitude", self.affine_magnitude),
            ("elastic_alpha.x", self.elastic_alpha.0),
            ("elastic_alpha.y", self.elastic_alpha.1),
            ("elastic_sigma", self.elastic_sigma),
            ("perspective_jitter", self.perspective_jitter),
            ("shear_max_degrees", self.shear_max_degrees),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidConfig {
                    message: format!("{} must be finite and non-negative, got {}", field, value),
                });
            }
        }

        self.text_mode.validate("text_mode")?;
        self.extra_spacing.validate("extra_spacing")?;
        self.distortion.validate("distortion")?;
        self.warp.validate("warp")?;
        self.background.validate("background")?;
        self.resize_axis.validate("resize_axis")?;
        self.blur.validate("blur")?;
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

/// Output naming settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Image file extension (determines the encoder).
    #[serde(default = "OutputConfig::default_extension")]
    pub extension: String,
    /// File naming scheme.
    #[serde(default)]
    pub name_format: NameFormat,
    /// Prefix used by [`NameFormat::PrefixIndex`].
    #[serde(default)]
    pub prefix: String,
}

impl OutputConfig {
    fn default_extension() -> String {
        "jpg".to_string()
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            extension: Self::default_extension(),
            name_format: NameFormat::default(),
            prefix: String::new(),
        }
    }
}

/// Top-level configuration for sample generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Nominal text height in pixels.
    #[serde(default = "GeneratorConfig::default_height")]
    pub height: u32,
    /// Padding added around the rasterized text, in pixels.
    #[serde(default = "GeneratorConfig::default_margin")]
    pub margin: u32,
    /// Foreground gray value; negative picks a random dark value per run.
    #[serde(default = "GeneratorConfig::default_text_color")]
    pub text_color: i32,

    /// Skew angle in degrees.
    #[serde(default)]
    pub skew_angle: f32,
    /// Draw the skew angle uniformly from `[-skew_angle, skew_angle]`.
    #[serde(default)]
    pub random_skew: bool,

    /// Enables the blur stage.
    #[serde(default = "GeneratorConfig::default_blur")]
    pub blur: bool,
    /// Overrides the Gaussian blur sigma when positive.
    #[serde(default)]
    pub blur_sigma: f32,
    /// Draw the Gaussian sigma uniformly from `(0, blur_sigma]`.
    #[serde(default)]
    pub random_blur: bool,

    /// Forces a background kind instead of sampling the table.
    #[serde(default)]
    pub background: Option<BackgroundKind>,
    /// Directory of photographs for [`BackgroundKind::Picture`].
    #[serde(default)]
    pub pictures_dir: Option<PathBuf>,

    /// Forces a distortion kind instead of sampling the table.
    #[serde(default)]
    pub distortion: Option<DistortionKind>,
    /// Axes of the pixel-shift distortion.
    #[serde(default)]
    pub distortion_orientation: Orientation,

    /// Lower bound of the final height, as a multiple of `height`.
    #[serde(default = "GeneratorConfig::default_min_height_factor")]
    pub min_height_factor: f32,
    /// Upper bound of the final height, as a multiple of `height`.
    #[serde(default = "GeneratorConfig::default_max_height_factor")]
    pub max_height_factor: f32,
    /// Absolute cap on the final height.
    #[serde(default)]
    pub max_height: Option<u32>,

    /// Drop a random 10-20 pixel band from the top of every sample.
    #[serde(default)]
    pub random_crop: bool,
    /// Write every intermediate stage next to the output.
    #[serde(default)]
    pub debug: bool,
    /// Batch seed; `None` draws one from entropy.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Output naming.
    #[serde(default)]
    pub output: OutputConfig,
    /// Augmentation probabilities.
    #[serde(default)]
    pub weights: RecipeWeights,
    /// Glyph support heuristics.
    #[serde(default)]
    pub glyphs: GlyphCheckConfig,
    /// Worker pool settings.
    #[serde(default)]
    pub parallel: ParallelPolicy,
}

impl GeneratorConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration from a JSON file and validates it.
    ///
    /// Fields absent from the file keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON for
    /// this schema, or fails validation.
    pub fn from_json_file(path: &Path) -> SynthResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: GeneratorConfig =
            serde_json::from_str(&contents).map_err(|e| ConfigError::InvalidConfig {
                message: format!("{}: {}", path.display(), e),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_height(mut self, height: u32) -> Self {
        self.height = height;
        self
    }

    pub fn with_skew(mut self, angle: f32, random: bool) -> Self {
        self.skew_angle = angle;
        self.random_skew = random;
        self
    }

    pub fn with_blur(mut self, enabled: bool, sigma: f32, random: bool) -> Self {
        self.blur = enabled;
        self.blur_sigma = sigma;
        self.random_blur = random;
        self
    }

    pub fn with_background(mut self, kind: Option<BackgroundKind>) -> Self {
        self.background = kind;
        self
    }

    pub fn with_distortion(mut self, kind: Option<DistortionKind>, orientation: Orientation) -> Self {
        self.distortion = kind;
        self.distortion_orientation = orientation;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_weights(mut self, weights: RecipeWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_output(mut self, output: OutputConfig) -> Self {
        self.output = output;
        self
    }

    /// Inclusive `(min, max)` bounds on the final sample height.
    pub fn height_bounds(&self) -> (u32, u32) {
        let nominal = self.height as f32;
        let low = ((nominal * self.min_height_factor).ceil() as u32).max(1);
        let mut high = ((nominal * self.max_height_factor).floor() as u32).max(low);
        if let Some(cap) = self.max_height {
            high = high.min(cap).max(low);
        }
        (low, high)
    }

    fn default_height() -> u32 {
        DEFAULT_HEIGHT
    }

    fn default_margin() -> u32 {
        DEFAULT_TEXT_MARGIN
    }

    fn default_text_color() -> i32 {
        -1
    }

    fn default_blur() -> bool {
        true
    }

    fn default_min_height_factor() -> f32 {
        0.5
    }

    fn default_max_height_factor() -> f32 {
        3.0
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            height: Self::default_height(),
            margin: Self::default_margin(),
            text_color: Self::default_text_color(),
            skew_angle: 0.0,
            random_skew: false,
            blur: Self::default_blur(),
            blur_sigma: 0.0,
            random_blur: false,
            background: None,
            pictures_dir: None,
            distortion: None,
            distortion_orientation: Orientation::default(),
            min_height_factor: Self::default_min_height_factor(),
            max_height_factor: Self::default_max_height_factor(),
            max_height: None,
            random_crop: false,
            debug: false,
            seed: None,
            output: OutputConfig::default(),
            weights: RecipeWeights::default(),
            glyphs: GlyphCheckConfig::default(),
            parallel: ParallelPolicy::default(),
        }
    }
}

impl ConfigValidator for GeneratorConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.height == 0 {
            return Err(ConfigError::InvalidConfig {
                message: "height must be greater than 0".to_string(),
            });
        }
        if !self.skew_angle.is_finite() || !self.blur_sigma.is_finite() || self.blur_sigma < 0.0 {
            return Err(ConfigError::InvalidConfig {
                message: "skew_angle and blur_sigma must be finite, blur_sigma non-negative"
                    .to_string(),
            });
        }
        self.validate_range(
            "height_factor",
            (self.min_height_factor, self.max_height_factor),
            0.01,
        )?;
        if self.max_height == Some(0) {
            return Err(ConfigError::InvalidConfig {
                message: "max_height must be greater than 0".to_string(),
            });
        }
        if self.output.extension.trim().is_empty() {
            return Err(ConfigError::InvalidConfig {
                message: "output extension cannot be empty".to_string(),
            });
        }
        if let Some(dir) = &self.pictures_dir {
            self.validate_path_exists(dir)?;
        }
        self.weights.validate()?;
        self.glyphs.validate()?;
        self.parallel.validate()?;
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}
