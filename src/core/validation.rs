//! Input and stage-output validation utilities.
//!
//! Every stage of the augmentation pipeline returns a bitmap with non-zero
//! width and height; the helpers here turn violations into typed errors
//! instead of panics deeper down.

use crate::core::errors::{SynthError, SynthResult};
use image::GrayImage;

/// Largest width or height any stage may produce.
pub const MAX_DIMENSION: u32 = 32_768;

/// Validates that a bitmap has a non-zero area and sane dimensions.
///
/// # Arguments
///
/// * `image` - The stage output to check.
/// * `stage` - Stage name used in the error message.
///
/// # Errors
///
/// Returns [`SynthError::Render`] for zero-area or oversized bitmaps.
#[inline]
pub fn ensure_non_empty(image: &GrayImage, stage: &str) -> SynthResult<()> {
    validate_image_dimensions(image.width(), image.height(), stage)
}

/// Validates image dimensions.
pub fn validate_image_dimensions(width: u32, height: u32, context: &str) -> SynthResult<()> {
    if width == 0 || height == 0 {
        return Err(SynthError::render(format!(
            "{}: image dimensions must be positive, got {}x{}",
            context, width, height
        )));
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(SynthError::render(format!(
            "{}: image dimensions exceed maximum of {}x{}, got {}x{}",
            context, MAX_DIMENSION, MAX_DIMENSION, width, height
        )));
    }
    Ok(())
}
