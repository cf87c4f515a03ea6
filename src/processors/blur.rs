//! Blur catalogue and edge-enhancement sharpening.
//!
//! Gaussian and box blurs come from `imageproc`; the motion, defocus and
//! point-spread kernels are built here and applied by [`convolve`].

use crate::core::config::{GeneratorConfig, WeightedTable};
use crate::core::errors::SynthResult;
use crate::core::validation::ensure_non_empty;
use crate::domain::{Bitmap, BlurKind};
use imageproc::filter::{box_filter, gaussian_blur_f32};
use rand::Rng;
use rayon::prelude::*;
use std::f32::consts::PI;
use tracing::debug;

/// A dense convolution kernel, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    width: usize,
    height: usize,
    weights: Vec<f32>,
}

impl Kernel {
    /// Builds a kernel; `weights.len()` must equal `width * height`.
    pub fn new(width: usize, height: usize, weights: Vec<f32>) -> Option<Self> {
        (width > 0 && height > 0 && weights.len() == width * height).then_some(Self {
            width,
            height,
            weights,
        })
    }

    /// Scales the weights to sum to one. Kernels summing to zero are kept.
    pub fn normalized(mut self) -> Self {
        let sum: f32 = self.weights.iter().sum();
        if sum.abs() > f32::EPSILON {
            self.weights.iter_mut().for_each(|w| *w /= sum);
        }
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// A straight line of length `length` through the center at `angle` radians.
    pub fn motion(length: u32, angle: f32) -> Self {
        let size = (length.max(1) | 1) as usize;
        let center = (size / 2) as f32;
        let mut weights = vec![0.0; size * size];
        let (sin, cos) = angle.sin_cos();
        let steps = (size * 4) as i32;
        for i in -steps..=steps {
            let t = i as f32 / steps as f32 * center;
            let x = (center + t * cos).round() as usize;
            let y = (center + t * sin).round() as usize;
            if x < size && y < size {
                weights[y * size + x] = 1.0;
            }
        }
        Self {
            width: size,
            height: size,
            weights,
        }
        .normalized()
    }

    /// A filled disk of the given radius.
    pub fn disk(radius: u32) -> Self {
        let size = (2 * radius + 1) as usize;
        let r = radius as f32 + 0.5;
        let weights = (0..size * size)
            .map(|i| {
                let dx = (i % size) as f32 - radius as f32;
                let dy = (i / size) as f32 - radius as f32;
                if dx * dx + dy * dy <= r * r { 1.0 } else { 0.0 }
            })
            .collect();
        Self {
            width: size,
            height: size,
            weights,
        }
        .normalized()
    }

    /// An anisotropic Gaussian with standard deviations `major` and `minor`
    /// along axes rotated by `angle` radians.
    pub fn anisotropic_gaussian(major: f32, minor: f32, angle: f32) -> Self {
        let radius = (3.0 * major.max(minor)).ceil().max(1.0) as i32;
        let size = (2 * radius + 1) as usize;
        let (sin, cos) = angle.sin_cos();
        let mut weights = Vec::with_capacity(size * size);
        for y in -radius..=radius {
            for x in -radius..=radius {
                let u = x as f32 * cos + y as f32 * sin;
                let v = -(x as f32) * sin + y as f32 * cos;
                weights.push((-(u * u) / (2.0 * major * major) - (v * v) / (2.0 * minor * minor)).exp());
            }
        }
        Self {
            width: size,
            height: size,
            weights,
        }
        .normalized()
    }

    /// The 3x3 edge-enhancement kernel (center 10, neighbours -1, scale 1/2).
    pub fn edge_enhance() -> Self {
        let mut weights = vec![-0.5; 9];
        weights[4] = 5.0;
        Self {
            width: 3,
            height: 3,
            weights,
        }
    }
}

/// Convolves with clamp-to-edge borders. Rows run in parallel.
pub fn convolve(bitmap: &Bitmap, kernel: &Kernel) -> Bitmap {
    let (width, height) = bitmap.dimensions();
    let mut out = Bitmap::new(width, height);
    if width == 0 || height == 0 {
        return out;
    }
    let (kx, ky) = ((kernel.width / 2) as i64, (kernel.height / 2) as i64);
    let (max_x, max_y) = (width as i64 - 1, height as i64 - 1);
    let buffer: &mut [u8] = out.as_mut();

    buffer
        .par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, pixel) in row.iter_mut().enumerate() {
                let mut acc = 0.0f32;
                for j in 0..kernel.height {
                    let sy = (y as i64 + j as i64 - ky).clamp(0, max_y) as u32;
                    for i in 0..kernel.width {
                        let weight = kernel.weights[j * kernel.width + i];
                        if weight == 0.0 {
                            continue;
                        }
                        let sx = (x as i64 + i as i64 - kx).clamp(0, max_x) as u32;
                        acc += weight * bitmap.get_pixel(sx, sy).0[0] as f32;
                    }
                }
                *pixel = acc.round().clamp(0.0, 255.0) as u8;
            }
        });
    out
}

/// Applies blurs from the catalogue.
#[derive(Debug, Clone)]
pub struct BlurProcessor {
    /// Fixed Gaussian sigma; `None` samples from `gaussian_sigmas`.
    sigma_override: Option<f32>,
    /// Draw the Gaussian sigma from `(0, sigma_override]`.
    random_sigma: bool,
    gaussian_sigmas: WeightedTable<u32>,
    psf_min_width: u32,
}

impl Default for BlurProcessor {
    fn default() -> Self {
        Self::from_config(&GeneratorConfig::default())
    }
}

impl BlurProcessor {
    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self {
            sigma_override: (config.blur_sigma > 0.0).then_some(config.blur_sigma),
            random_sigma: config.random_blur,
            // Sigmas in tenths of a pixel.
            gaussian_sigmas: WeightedTable::new([(10, 0.5), (15, 0.3), (20, 0.2)]),
            psf_min_width: config.weights.psf_min_width,
        }
    }

    /// Applies `kind`. Point-spread blur is skipped on images no wider
    /// than the configured minimum.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        bitmap: &Bitmap,
        kind: BlurKind,
        rng: &mut R,
    ) -> SynthResult<Bitmap> {
        let out = match kind {
            BlurKind::None => bitmap.clone(),
            BlurKind::LinearMotion => {
                let length = rng.gen_range(3..=9);
                let angle = rng.gen_range(0.0..PI);
                convolve(bitmap, &Kernel::motion(length, angle))
            }
            BlurKind::Gaussian => gaussian_blur_f32(bitmap, self.gaussian_sigma(rng)?),
            BlurKind::Box => box_filter(bitmap, 1, 1),
            BlurKind::Averaging => convolve(bitmap, &Kernel::disk(rng.gen_range(1..=2))),
            BlurKind::PointSpread => {
                if bitmap.width() <= self.psf_min_width {
                    debug!(
                        "Skipping point-spread blur on {}px wide image",
                        bitmap.width()
                    );
                    bitmap.clone()
                } else {
                    let major = rng.gen_range(0.8..=1.6);
                    let minor = rng.gen_range(0.3..=0.8);
                    let angle = rng.gen_range(0.0..PI);
                    convolve(bitmap, &Kernel::anisotropic_gaussian(major, minor, angle))
                }
            }
        };
        ensure_non_empty(&out, "blur")?;
        Ok(out)
    }

    fn gaussian_sigma<R: Rng + ?Sized>(&self, rng: &mut R) -> SynthResult<f32> {
        Ok(match self.sigma_override {
            Some(sigma) if self.random_sigma => rng.gen_range(0.1f32.min(sigma)..=sigma),
            Some(sigma) => sigma,
            None => self.gaussian_sigmas.sample("gaussian_sigma", rng)? as f32 / 10.0,
        })
    }
}

/// Edge-enhancement sharpening.
pub fn sharpen(bitmap: &Bitmap) -> Bitmap {
    convolve(bitmap, &Kernel::edge_enhance())
}
