//! Resampling warps: affine jitter, elastic deformation and perspective.
//!
//! All three build a per-pixel source coordinate for every destination
//! pixel and resample with bilinear interpolation; lookups that fall
//! outside the source read white.

use crate::core::constants::{BACKGROUND_VALUE, DEGENERATE_WHITE_FRACTION};
use crate::core::errors::{SynthError, SynthResult};
use crate::core::validation::ensure_non_empty;
use crate::domain::{Bitmap, DistortionParams};
use crate::utils::image::is_mostly_white;
use crate::utils::transform::{
    Point2f, distance, get_perspective_transform, remap, solve_affine, warp_perspective,
};
use nalgebra::Vector3;
use rand::Rng;
use tracing::debug;

/// Cell size, in pixels, of the coarse elastic displacement grid.
const ELASTIC_GRID_CELL: u32 = 25;

/// Affine, elastic and perspective warps.
#[derive(Debug, Clone, Copy)]
pub struct ElasticAffineWarper {
    min_size: u32,
}

impl Default for ElasticAffineWarper {
    fn default() -> Self {
        Self::new(8)
    }
}

impl ElasticAffineWarper {
    /// Creates a warper that leaves images whose smaller side is below
    /// `min_size` untouched.
    pub fn new(min_size: u32) -> Self {
        Self { min_size }
    }

    /// Dispatches on the resampling variants of [`DistortionParams`].
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::InvalidInput`] for pixel-shift variants and
    /// [`SynthError::Transform`] when a solve is degenerate.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        bitmap: &Bitmap,
        params: &DistortionParams,
        rng: &mut R,
    ) -> SynthResult<Bitmap> {
        match *params {
            DistortionParams::None => Ok(bitmap.clone()),
            DistortionParams::AffineJitter { magnitude } => self.affine(bitmap, magnitude, rng),
            DistortionParams::Elastic {
                alpha_x,
                alpha_y,
                sigma,
            } => self.elastic(bitmap, alpha_x, alpha_y, sigma, rng),
            DistortionParams::Perspective { jitter_range } => {
                self.perspective(bitmap, jitter_range, rng)
            }
            other => Err(SynthError::invalid_input(format!(
                "{} is not a resampling warp",
                other.name()
            ))),
        }
    }

    fn too_small(&self, bitmap: &Bitmap, operation: &str) -> bool {
        let small = bitmap.width().min(bitmap.height()) < self.min_size;
        if small {
            debug!(
                "Skipping {} warp on {}x{} image",
                operation,
                bitmap.width(),
                bitmap.height()
            );
        }
        small
    }

    /// Near-identity affine warp.
    ///
    /// Three reference points around the image center are each moved by up
    /// to `magnitude * min(width, height)` pixels; the least-squares affine
    /// map between the two point sets drives the resample.
    pub fn affine<R: Rng + ?Sized>(
        &self,
        bitmap: &Bitmap,
        magnitude: f32,
        rng: &mut R,
    ) -> SynthResult<Bitmap> {
        if self.too_small(bitmap, "affine") {
            return Ok(bitmap.clone());
        }
        let (width, height) = bitmap.dimensions();
        let alpha = width.min(height) as f32 * magnitude;
        let (cx, cy) = ((width / 2) as f32, (height / 2) as f32);
        let square = (width.min(height) / 3) as f32;

        let src = [
            Point2f::new(cx + square, cy + square),
            Point2f::new(cx + square, cy - square),
            Point2f::new(cx - square, cy - square),
        ];
        let dst: Vec<Point2f> = src
            .iter()
            .map(|p| {
                Point2f::new(
                    p.x + jitter(alpha, rng),
                    p.y + jitter(alpha, rng),
                )
            })
            .collect();

        // The solved map sends destination pixels to source coordinates.
        let matrix = solve_affine(&src, &dst)?;
        let out = remap(bitmap, width, height, BACKGROUND_VALUE, |x, y| {
            let p = matrix * Vector3::new(x as f32, y as f32, 1.0);
            Some((p.x, p.y))
        });
        ensure_non_empty(&out, "affine")?;
        Ok(out)
    }

    /// Elastic deformation with a smooth random displacement field.
    ///
    /// A coarse grid (one cell per 25 pixels, at least 2x2) of uniform
    /// `[-1, 1]` values is Gaussian-smoothed with `sigma` cells, bilinearly
    /// upsampled, and scaled by `alpha * min(width, height)` per axis.
    pub fn elastic<R: Rng + ?Sized>(
        &self,
        bitmap: &Bitmap,
        alpha_x: f32,
        alpha_y: f32,
        sigma: f32,
        rng: &mut R,
    ) -> SynthResult<Bitmap> {
        if self.too_small(bitmap, "elastic") {
            return Ok(bitmap.clone());
        }
        let (width, height) = bitmap.dimensions();
        let grid_w = (width / ELASTIC_GRID_CELL).max(2) as usize;
        let grid_h = (height / ELASTIC_GRID_CELL).max(2) as usize;
        let scale = width.min(height) as f32;

        let dx = DisplacementGrid::random(grid_w, grid_h, rng).smoothed(sigma);
        let dy = DisplacementGrid::random(grid_w, grid_h, rng).smoothed(sigma);
        let (ax, ay) = (alpha_x * scale, alpha_y * scale);

        let out = remap(bitmap, width, height, BACKGROUND_VALUE, |x, y| {
            let u = x as f32 / (width - 1).max(1) as f32;
            let v = y as f32 / (height - 1).max(1) as f32;
            Some((
                x as f32 + dx.sample(u, v) * ax,
                y as f32 + dy.sample(u, v) * ay,
            ))
        });
        ensure_non_empty(&out, "elastic")?;
        Ok(out)
    }

    /// Perspective warp from randomly displaced corners.
    ///
    /// Each corner moves by up to `jitter_range * min(width, height)`. The
    /// displaced quadrilateral is ordered (top-left has the smallest `x + y`,
    /// bottom-right the largest, top-right the smallest `y - x`, bottom-left
    /// the largest) and mapped onto an upright rectangle. Results that are
    /// almost entirely white fall back to the input.
    pub fn perspective<R: Rng + ?Sized>(
        &self,
        bitmap: &Bitmap,
        jitter_range: f32,
        rng: &mut R,
    ) -> SynthResult<Bitmap> {
        if self.too_small(bitmap, "perspective") {
            return Ok(bitmap.clone());
        }
        let (width, height) = bitmap.dimensions();
        let alpha = width.min(height) as f32 * jitter_range;
        let (w, h) = ((width - 1) as f32, (height - 1) as f32);

        let corners: Vec<Point2f> = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)]
            .into_iter()
            .map(|(x, y)| {
                Point2f::new(
                    (x + jitter(alpha, rng)).clamp(0.0, w),
                    (y + jitter(alpha, rng)).clamp(0.0, h),
                )
            })
            .collect();
        let quad = order_quad(&corners);

        let dst_w = distance(&quad[0], &quad[1])
            .max(distance(&quad[3], &quad[2]))
            .round()
            .max(1.0);
        let dst_h = distance(&quad[0], &quad[3])
            .max(distance(&quad[1], &quad[2]))
            .round()
            .max(1.0);
        let rect = [
            Point2f::new(0.0, 0.0),
            Point2f::new(dst_w - 1.0, 0.0),
            Point2f::new(dst_w - 1.0, dst_h - 1.0),
            Point2f::new(0.0, dst_h - 1.0),
        ];

        let matrix = get_perspective_transform(&quad, &rect)?;
        let out = warp_perspective(
            bitmap,
            &matrix,
            dst_w as u32 + 1,
            dst_h as u32 + 1,
            BACKGROUND_VALUE,
        )?;
        if is_mostly_white(&out, DEGENERATE_WHITE_FRACTION) {
            debug!("Perspective result is blank, keeping the unwarped image");
            return Ok(bitmap.clone());
        }
        ensure_non_empty(&out, "perspective")?;
        Ok(out)
    }
}

fn jitter<R: Rng + ?Sized>(alpha: f32, rng: &mut R) -> f32 {
    if alpha > 0.0 {
        rng.gen_range(-alpha..=alpha)
    } else {
        0.0
    }
}

/// Orders four points as top-left, top-right, bottom-right, bottom-left.
fn order_quad(points: &[Point2f]) -> [Point2f; 4] {
    let by = |key: fn(&Point2f) -> f32, max: bool| {
        let mut best = points[0];
        for p in &points[1..] {
            if (max && key(p) > key(&best)) || (!max && key(p) < key(&best)) {
                best = *p;
            }
        }
        best
    };
    let sum = |p: &Point2f| p.x + p.y;
    let diff = |p: &Point2f| p.y - p.x;
    [
        by(sum, false),
        by(diff, false),
        by(sum, true),
        by(diff, true),
    ]
}

/// A small row-major grid of displacement values.
#[derive(Debug, Clone)]
struct DisplacementGrid {
    width: usize,
    height: usize,
    values: Vec<f32>,
}

impl DisplacementGrid {
    fn random<R: Rng + ?Sized>(width: usize, height: usize, rng: &mut R) -> Self {
        let values = (0..width * height)
            .map(|_| rng.gen_range(-1.0..=1.0f32))
            .collect();
        Self {
            width,
            height,
            values,
        }
    }

    fn at(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.width + x]
    }

    /// Separable Gaussian smoothing with clamped borders.
    fn smoothed(&self, sigma: f32) -> Self {
        if sigma <= 0.0 {
            return self.clone();
        }
        let radius = (3.0 * sigma).ceil() as i64;
        let kernel: Vec<f32> = (-radius..=radius)
            .map(|i| (-(i * i) as f32 / (2.0 * sigma * sigma)).exp())
            .collect();
        let norm: f32 = kernel.iter().sum();

        let pass = |grid: &Self, horizontal: bool| -> Self {
            let mut values = vec![0.0; grid.values.len()];
            for y in 0..grid.height {
                for x in 0..grid.width {
                    let mut acc = 0.0;
                    for (k, weight) in kernel.iter().enumerate() {
                        let offset = k as i64 - radius;
                        let (sx, sy) = if horizontal {
                            ((x as i64 + offset).clamp(0, grid.width as i64 - 1) as usize, y)
                        } else {
                            (x, (y as i64 + offset).clamp(0, grid.height as i64 - 1) as usize)
                        };
                        acc += weight * grid.at(sx, sy);
                    }
                    values[y * grid.width + x] = acc / norm;
                }
            }
            Self {
                width: grid.width,
                height: grid.height,
                values,
            }
        };
        pass(&pass(self, true), false)
    }

    /// Bilinear lookup at normalized coordinates `u, v` in `[0, 1]`.
    fn sample(&self, u: f32, v: f32) -> f32 {
        let gx = u.clamp(0.0, 1.0) * (self.width - 1) as f32;
        let gy = v.clamp(0.0, 1.0) * (self.height - 1) as f32;
        let (x0, y0) = (gx.floor() as usize, gy.floor() as usize);
        let (x1, y1) = ((x0 + 1).min(self.width - 1), (y0 + 1).min(self.height - 1));
        let (fx, fy) = (gx - x0 as f32, gy - y0 as f32);
        let top = self.at(x0, y0) * (1.0 - fx) + self.at(x1, y0) * fx;
        let bottom = self.at(x0, y1) * (1.0 - fx) + self.at(x1, y1) * fx;
        top * (1.0 - fy) + bottom * fy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn text_like() -> Bitmap {
        let mut bitmap = Bitmap::from_pixel(120, 40, Luma([255]));
        for x in (10..110).step_by(6) {
            for y in 8..32 {
                bitmap.put_pixel(x, y, Luma([20]));
                bitmap.put_pixel(x + 1, y, Luma([20]));
            }
        }
        bitmap
    }

    #[test]
    fn test_none_is_identity() {
        let bitmap = text_like();
        let out = ElasticAffineWarper::default()
            .apply(&bitmap, &DistortionParams::None, &mut StdRng::seed_from_u64(0))
            .unwrap();
        assert_eq!(out, bitmap);
    }

    #[test]
    fn test_zero_magnitude_affine_is_identity() {
        let bitmap = text_like();
        let out = ElasticAffineWarper::default()
            .affine(&bitmap, 0.0, &mut StdRng::seed_from_u64(1))
            .unwrap();
        assert_eq!(out, bitmap);
    }

    #[test]
    fn test_affine_keeps_dimensions() {
        let bitmap = text_like();
        let out = ElasticAffineWarper::default()
            .affine(&bitmap, 0.05, &mut StdRng::seed_from_u64(2))
            .unwrap();
        assert_eq!(out.dimensions(), bitmap.dimensions());
        assert!(out.pixels().any(|p| p.0[0] < 128));
    }

    #[test]
    fn test_elastic_zero_alpha_is_identity() {
        let bitmap = text_like();
        let out = ElasticAffineWarper::default()
            .elastic(&bitmap, 0.0, 0.0, 1.0, &mut StdRng::seed_from_u64(3))
            .unwrap();
        assert_eq!(out, bitmap);
    }

    #[test]
    fn test_elastic_moves_pixels() {
        let bitmap = text_like();
        let out = ElasticAffineWarper::default()
            .elastic(&bitmap, 0.2, 0.2, 0.0, &mut StdRng::seed_from_u64(4))
            .unwrap();
        assert_eq!(out.dimensions(), bitmap.dimensions());
        assert_ne!(out, bitmap);
    }

    #[test]
    fn test_perspective_blank_input_falls_back() {
        let bitmap = Bitmap::from_pixel(60, 30, Luma([255]));
        let out = ElasticAffineWarper::default()
            .perspective(&bitmap, 0.1, &mut StdRng::seed_from_u64(5))
            .unwrap();
        assert_eq!(out, bitmap);
    }

    #[test]
    fn test_perspective_produces_image() {
        let bitmap = text_like();
        let out = ElasticAffineWarper::default()
            .perspective(&bitmap, 0.05, &mut StdRng::seed_from_u64(6))
            .unwrap();
        assert!(out.width() > 0 && out.height() > 0);
        assert!(out.pixels().any(|p| p.0[0] < 128));
    }

    #[test]
    fn test_small_images_are_skipped() {
        let bitmap = Bitmap::from_pixel(40, 4, Luma([0]));
        let out = ElasticAffineWarper::new(8)
            .affine(&bitmap, 0.5, &mut StdRng::seed_from_u64(7))
            .unwrap();
        assert_eq!(out, bitmap);
    }

    #[test]
    fn test_order_quad() {
        let points = [
            Point2f::new(10.0, 9.0),
            Point2f::new(0.0, 0.0),
            Point2f::new(0.0, 10.0),
            Point2f::new(10.0, 1.0),
        ];
        let quad = order_quad(&points);
        assert_eq!(quad[0], Point2f::new(0.0, 0.0));
        assert_eq!(quad[1], Point2f::new(10.0, 1.0));
        assert_eq!(quad[2], Point2f::new(10.0, 9.0));
        assert_eq!(quad[3], Point2f::new(0.0, 10.0));
    }

    #[test]
    fn test_smoothing_preserves_constant_field() {
        let grid = DisplacementGrid {
            width: 3,
            height: 3,
            values: vec![0.5; 9],
        };
        let smoothed = grid.smoothed(1.0);
        assert!(smoothed.values.iter().all(|v| (v - 0.5).abs() < 1e-5));
        assert!((smoothed.sample(0.3, 0.7) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_pixel_shift_variant_rejected() {
        let params = DistortionParams::UniformRandom {
            orientation: crate::domain::Orientation::Vertical,
        };
        assert!(
            ElasticAffineWarper::default()
                .apply(&text_like(), &params, &mut StdRng::seed_from_u64(0))
                .is_err()
        );
    }
}
