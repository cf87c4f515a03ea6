//! Domain-level structures shared across the generator.
//!
//! This module groups the value types that describe one synthetic sample:
//! what text is drawn and how ([`text`]), which geometric perturbation is
//! applied ([`distortion`]), the fully sampled set of augmentation choices
//! ([`recipe`]) and the finished sample ([`sample`]).

pub mod distortion;
pub mod recipe;
pub mod sample;
pub mod text;

pub use distortion::{DistortionKind, DistortionParams, Orientation, WarpKind};
pub use recipe::{
    AugmentationRecipe, BackgroundKind, BlurKind, Erosion, PixelNoise, ResizeAxis, ResizeFilter,
    ResizePlan, SpeckleNoise,
};
pub use sample::{Sample, SampleRequest};
pub use text::{TextColor, TextMode, TextSpec};

/// A single-channel 8-bit intensity image.
///
/// Every pipeline stage consumes one bitmap by reference and returns a new
/// one; width and height are non-zero after every stage.
pub type Bitmap = image::GrayImage;
