//! Pixel-shift distortions.
//!
//! Each column (vertical pass) or row (horizontal pass) of the bitmap is
//! moved by an offset drawn from a sine curve, a cosine curve, or an
//! independent random value. The canvas grows by twice the largest offset
//! along the shifted axis so nothing is cut off; exposed pixels are white.

use crate::core::constants::BACKGROUND_VALUE;
use crate::core::errors::{SynthError, SynthResult};
use crate::core::validation::ensure_non_empty;
use crate::domain::{Bitmap, DistortionParams, Orientation};
use image::Luma;
use rand::Rng;

/// Periodic and random per-column/per-row pixel-shift warps.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeometricDistorter;

/// Offset curve of one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Curve {
    Sine,
    Cosine,
    Random,
}

impl GeometricDistorter {
    pub fn new() -> Self {
        Self
    }

    /// Applies a pixel-shift distortion.
    ///
    /// [`DistortionParams::None`] returns an identical copy.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::InvalidInput`] for resampling variants (affine,
    /// elastic, perspective), which belong to the elastic warper.
    pub fn warp<R: Rng + ?Sized>(
        &self,
        bitmap: &Bitmap,
        params: &DistortionParams,
        rng: &mut R,
    ) -> SynthResult<Bitmap> {
        let (curve, orientation, max_offset) = match *params {
            DistortionParams::None => return Ok(bitmap.clone()),
            DistortionParams::Sine {
                orientation,
                max_offset,
            } => (Curve::Sine, orientation, max_offset),
            DistortionParams::Cosine {
                orientation,
                max_offset,
            } => (Curve::Cosine, orientation, max_offset),
            DistortionParams::UniformRandom { orientation } => (
                Curve::Random,
                orientation,
                (bitmap.height() as f32).powf(0.4) as u32,
            ),
            other => {
                return Err(SynthError::invalid_input(format!(
                    "{} is not a pixel-shift distortion",
                    other.name()
                )));
            }
        };
        self.shift(bitmap, curve, orientation, max_offset, rng)
    }

    fn shift<R: Rng + ?Sized>(
        &self,
        bitmap: &Bitmap,
        curve: Curve,
        orientation: Orientation,
        max_offset: u32,
        rng: &mut R,
    ) -> SynthResult<Bitmap> {
        let mut current = bitmap.clone();
        if orientation.vertical() {
            let offsets = offsets(curve, current.width(), max_offset, rng);
            current = shift_columns(&current, &offsets, max_offset);
        }
        if orientation.horizontal() {
            let offsets = offsets(curve, current.height(), max_offset, rng);
            current = shift_rows(&current, &offsets, max_offset);
        }
        ensure_non_empty(&current, "distortion")?;
        Ok(current)
    }
}

/// One offset per line, each within `[-max_offset, max_offset]`.
fn offsets<R: Rng + ?Sized>(curve: Curve, count: u32, max_offset: u32, rng: &mut R) -> Vec<i32> {
    let amplitude = max_offset as f32;
    (0..count)
        .map(|i| match curve {
            Curve::Sine => ((i as f32).to_radians().sin() * amplitude) as i32,
            Curve::Cosine => ((i as f32).to_radians().cos() * amplitude) as i32,
            Curve::Random => rng.gen_range(0..=max_offset) as i32,
        })
        .collect()
}

fn shift_columns(bitmap: &Bitmap, offsets: &[i32], max_offset: u32) -> Bitmap {
    let (width, height) = bitmap.dimensions();
    let mut out = Bitmap::from_pixel(width, height + 2 * max_offset, Luma([BACKGROUND_VALUE]));
    for (x, &offset) in offsets.iter().enumerate() {
        let top = (max_offset as i32 + offset) as u32;
        for y in 0..height {
            out.put_pixel(x as u32, top + y, *bitmap.get_pixel(x as u32, y));
        }
    }
    out
}

fn shift_rows(bitmap: &Bitmap, offsets: &[i32], max_offset: u32) -> Bitmap {
    let (width, height) = bitmap.dimensions();
    let mut out = Bitmap::from_pixel(width + 2 * max_offset, height, Luma([BACKGROUND_VALUE]));
    for (y, &offset) in offsets.iter().enumerate() {
        let left = (max_offset as i32 + offset) as u32;
        for x in 0..width {
            out.put_pixel(left + x, y as u32, *bitmap.get_pixel(x, y as u32));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn sample() -> Bitmap {
        Bitmap::from_fn(40, 12, |x, y| Luma([((x * 7 + y * 3) % 200) as u8]))
    }

    #[test]
    fn test_none_is_identity() {
        let bitmap = sample();
        let out = GeometricDistorter::new()
            .warp(&bitmap, &DistortionParams::None, &mut StdRng::seed_from_u64(0))
            .unwrap();
        assert_eq!(out, bitmap);
    }

    #[test]
    fn test_sine_vertical_grows_height_only() {
        let bitmap = sample();
        let params = DistortionParams::Sine {
            orientation: Orientation::Vertical,
            max_offset: 2,
        };
        let out = GeometricDistorter::new()
            .warp(&bitmap, &params, &mut StdRng::seed_from_u64(0))
            .unwrap();
        assert_eq!(out.width(), bitmap.width());
        assert!(out.height() <= bitmap.height() + 4);
        assert!(out.height() > bitmap.height());
    }

    #[test]
    fn test_columns_keep_their_content() {
        let bitmap = sample();
        let params = DistortionParams::Cosine {
            orientation: Orientation::Vertical,
            max_offset: 3,
        };
        let out = GeometricDistorter::new()
            .warp(&bitmap, &params, &mut StdRng::seed_from_u64(0))
            .unwrap();
        for x in [0u32, 10, 39] {
            let original: Vec<u8> = (0..12).map(|y| bitmap.get_pixel(x, y).0[0]).collect();
            let column: Vec<u8> = (0..out.height()).map(|y| out.get_pixel(x, y).0[0]).collect();
            assert!(column.windows(12).any(|w| w == original.as_slice()));
        }
    }

    #[test]
    fn test_both_orientations_grow_both_axes() {
        let bitmap = sample();
        let params = DistortionParams::UniformRandom {
            orientation: Orientation::Both,
        };
        let out = GeometricDistorter::new()
            .warp(&bitmap, &params, &mut StdRng::seed_from_u64(4))
            .unwrap();
        let m = (12f32).powf(0.4) as u32;
        assert_eq!(out.width(), 40 + 2 * m);
        assert_eq!(out.height(), 12 + 2 * m);
    }

    #[test]
    fn test_resampling_variant_rejected() {
        let params = DistortionParams::AffineJitter { magnitude: 0.01 };
        assert!(
            GeometricDistorter::new()
                .warp(&sample(), &params, &mut StdRng::seed_from_u64(0))
                .is_err()
        );
    }
}
