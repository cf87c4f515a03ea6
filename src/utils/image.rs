//! Utility functions for grayscale image handling.
//!
//! Loading pictures for backgrounds, whiteness statistics used by the
//! degenerate-warp fallback, border colour estimation for fills, and masked
//! pasting for background compositing.

use crate::core::constants::BACKGROUND_VALUE;
use crate::core::errors::{SynthError, SynthResult};
use image::{GrayImage, Luma};
use std::path::Path;

/// Loads an image from a file path and converts it to a GrayImage.
///
/// # Errors
///
/// Returns [`SynthError::InvalidInput`] if the file cannot be opened or
/// decoded.
pub fn load_gray_image(path: &Path) -> SynthResult<GrayImage> {
    let img = image::open(path).map_err(|e| {
        SynthError::invalid_input(format!("cannot load image {}: {}", path.display(), e))
    })?;
    Ok(img.to_luma8())
}

/// Fraction of pixels that are pure background white.
pub fn white_fraction(image: &GrayImage) -> f32 {
    let total = image.as_raw().len();
    if total == 0 {
        return 1.0;
    }
    let white = image
        .as_raw()
        .iter()
        .filter(|&&v| v == BACKGROUND_VALUE)
        .count();
    white as f32 / total as f32
}

/// Whether more than `threshold` of the pixels are pure white.
#[inline]
pub fn is_mostly_white(image: &GrayImage, threshold: f32) -> bool {
    white_fraction(image) > threshold
}

/// Mean intensity of the outermost pixel ring.
///
/// Used as the fill colour for transforms that expose new area on images
/// that already carry a background.
pub fn border_mean(image: &GrayImage) -> u8 {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return BACKGROUND_VALUE;
    }
    let mut sum = 0u64;
    let mut count = 0u64;
    for x in 0..width {
        sum += image.get_pixel(x, 0).0[0] as u64;
        sum += image.get_pixel(x, height - 1).0[0] as u64;
        count += 2;
    }
    for y in 1..height.saturating_sub(1) {
        sum += image.get_pixel(0, y).0[0] as u64;
        sum += image.get_pixel(width - 1, y).0[0] as u64;
        count += 2;
    }
    (sum as f64 / count as f64).round() as u8
}

/// Pastes `src` onto `dst` at `(left, top)` through a binary mask.
///
/// A source pixel is copied only when it is neither pure white nor pure
/// black; saturated pixels are treated as transparent fill. Pixels falling
/// outside `dst` are clipped.
pub fn paste_with_mask(dst: &mut GrayImage, src: &GrayImage, left: u32, top: u32) {
    let (dst_width, dst_height) = dst.dimensions();
    for (x, y, pixel) in src.enumerate_pixels() {
        let value = pixel.0[0];
        if value == 0 || value == 255 {
            continue;
        }
        let (tx, ty) = (x + left, y + top);
        if tx < dst_width && ty < dst_height {
            dst.put_pixel(tx, ty, Luma([value]));
        }
    }
}
