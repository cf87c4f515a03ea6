//! Structural perturbations: grayscale erosion and sparse pixel masks.
//!
//! Text is dark on a white ground, so erosion is a minimum filter: dark
//! strokes get thicker and thin gaps close up, which mimics ink bleed.

use crate::core::constants::BACKGROUND_VALUE;
use crate::core::errors::SynthResult;
use crate::core::validation::ensure_non_empty;
use crate::domain::{Bitmap, Erosion, PixelNoise};
use image::Luma;
use rand::Rng;

/// Narrowest band, in pixels, that a band erosion covers.
const MIN_BAND_WIDTH: u32 = 10;

/// Minimum filter over a `kernel x kernel` window.
///
/// The window is anchored at its center (left/top of center for even
/// sizes). Kernels of size 0 or 1 return a copy.
pub fn erode(bitmap: &Bitmap, kernel: u32) -> Bitmap {
    if kernel <= 1 {
        return bitmap.clone();
    }
    let before = (kernel - 1) / 2;
    let after = kernel / 2;
    let (width, height) = bitmap.dimensions();

    let mut rows = Bitmap::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let lo = x.saturating_sub(before);
            let hi = (x + after).min(width - 1);
            let min = (lo..=hi).map(|sx| bitmap.get_pixel(sx, y).0[0]).min();
            rows.put_pixel(x, y, Luma([min.unwrap_or(BACKGROUND_VALUE)]));
        }
    }

    let mut out = Bitmap::new(width, height);
    for y in 0..height {
        let lo = y.saturating_sub(before);
        let hi = (y + after).min(height - 1);
        for x in 0..width {
            let min = (lo..=hi).map(|sy| rows.get_pixel(x, sy).0[0]).min();
            out.put_pixel(x, y, Luma([min.unwrap_or(BACKGROUND_VALUE)]));
        }
    }
    out
}

/// Applies the sampled erosion decision.
pub fn apply_erosion(bitmap: &Bitmap, erosion: &Erosion) -> SynthResult<Bitmap> {
    let out = match *erosion {
        Erosion::None => bitmap.clone(),
        Erosion::Full { kernel } => erode(bitmap, kernel),
        Erosion::Band { start, end, kernel } => erode_band(bitmap, start, end, kernel),
    };
    ensure_non_empty(&out, "erosion")?;
    Ok(out)
}

/// Erodes the column span `[start, end)` given as fractions of the width.
///
/// The span is widened to [`MIN_BAND_WIDTH`] pixels where the image allows.
fn erode_band(bitmap: &Bitmap, start: f32, end: f32, kernel: u32) -> Bitmap {
    let width = bitmap.width();
    let first = ((start.clamp(0.0, 1.0) * width as f32) as u32).min(width);
    let last = ((end.clamp(0.0, 1.0) * width as f32) as u32)
        .max(first + MIN_BAND_WIDTH)
        .min(width);
    if first >= last {
        return bitmap.clone();
    }

    let eroded = erode(bitmap, kernel);
    let mut out = bitmap.clone();
    for y in 0..bitmap.height() {
        for x in first..last {
            out.put_pixel(x, y, *eroded.get_pixel(x, y));
        }
    }
    out
}

/// Applies the sampled pixel-level perturbation.
///
/// `RandomErode` takes the eroded value wherever a Bernoulli mask with
/// `keep_probability` is set. `PixelDiscard` whitens every pixel where such
/// a mask is clear.
pub fn apply_pixel_noise<R: Rng + ?Sized>(
    bitmap: &Bitmap,
    noise: &PixelNoise,
    rng: &mut R,
) -> SynthResult<Bitmap> {
    let out = match *noise {
        PixelNoise::None => bitmap.clone(),
        PixelNoise::RandomErode {
            kernel,
            keep_probability,
        } => {
            let p = f64::from(keep_probability.clamp(0.0, 1.0));
            let eroded = erode(bitmap, kernel);
            let mut out = bitmap.clone();
            for (dst, src) in out.pixels_mut().zip(eroded.pixels()) {
                if rng.gen_bool(p) {
                    *dst = *src;
                }
            }
            out
        }
        PixelNoise::PixelDiscard { keep_probability } => {
            let p = f64::from(keep_probability.clamp(0.0, 1.0));
            let mut out = bitmap.clone();
            for pixel in out.pixels_mut() {
                if !rng.gen_bool(p) {
                    *pixel = Luma([BACKGROUND_VALUE]);
                }
            }
            out
        }
    };
    ensure_non_empty(&out, "pixel noise")?;
    Ok(out)
}
