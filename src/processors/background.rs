//! Background canvases and compositing.
//!
//! A [`BackgroundSource`] produces a canvas of a requested size for a
//! [`BackgroundKind`]; [`composite`] pastes the text image on top through
//! the saturated-pixel mask.

use crate::core::constants::BACKGROUND_VALUE;
use crate::core::errors::{SynthError, SynthResult};
use crate::core::validation::ensure_non_empty;
use crate::domain::{BackgroundKind, Bitmap};
use crate::utils::image::{load_gray_image, paste_with_mask};
use image::Luma;
use image::imageops::{self, FilterType};
use rand::{Rng, RngCore};
use std::f32::consts::PI;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const NOISE_MEAN: f32 = 235.0;
const NOISE_STD_DEV: f32 = 10.0;
const QUASICRYSTAL_WAVES: u32 = 7;
const PICTURE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "tiff"];

/// Produces background canvases.
pub trait BackgroundSource: Send + Sync {
    /// Returns a `width x height` canvas of the requested kind.
    fn generate(
        &self,
        kind: BackgroundKind,
        width: u32,
        height: u32,
        rng: &mut dyn RngCore,
    ) -> SynthResult<Bitmap>;
}

/// Procedural canvases plus photographs from an optional directory.
#[derive(Debug, Clone, Default)]
pub struct ProceduralBackgrounds {
    pictures: Vec<PathBuf>,
}

impl ProceduralBackgrounds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects the images in `dir` for [`BackgroundKind::Picture`].
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be read.
    pub fn with_pictures_dir(dir: &Path) -> SynthResult<Self> {
        let mut pictures: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| PICTURE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        pictures.sort();
        debug!("Found {} background pictures in {}", pictures.len(), dir.display());
        Ok(Self { pictures })
    }

    pub fn pictures(&self) -> &[PathBuf] {
        &self.pictures
    }

    fn picture(&self, width: u32, height: u32, rng: &mut dyn RngCore) -> SynthResult<Bitmap> {
        let path = &self.pictures[rng.gen_range(0..self.pictures.len())];
        let source = load_gray_image(path)?;
        let (pw, ph) = source.dimensions();
        if pw == 0 || ph == 0 {
            return Err(SynthError::invalid_input(format!(
                "empty background picture {}",
                path.display()
            )));
        }

        let scale = (width as f32 / pw as f32).max(height as f32 / ph as f32);
        let source = if scale > 1.0 {
            let w = ((pw as f32 * scale).ceil() as u32).max(width);
            let h = ((ph as f32 * scale).ceil() as u32).max(height);
            imageops::resize(&source, w, h, FilterType::Triangle)
        } else {
            source
        };

        let left = rng.gen_range(0..=source.width() - width);
        let top = rng.gen_range(0..=source.height() - height);
        Ok(imageops::crop_imm(&source, left, top, width, height).to_image())
    }
}

impl BackgroundSource for ProceduralBackgrounds {
    fn generate(
        &self,
        kind: BackgroundKind,
        width: u32,
        height: u32,
        rng: &mut dyn RngCore,
    ) -> SynthResult<Bitmap> {
        let canvas = match kind {
            BackgroundKind::GaussianNoise => gaussian_noise(width, height, rng),
            BackgroundKind::PlainWhite => Bitmap::from_pixel(width, height, Luma([BACKGROUND_VALUE])),
            BackgroundKind::Quasicrystal => quasicrystal(width, height, rng),
            BackgroundKind::Picture if self.pictures.is_empty() => {
                debug!("No background pictures available, using noise");
                gaussian_noise(width, height, rng)
            }
            BackgroundKind::Picture => match self.picture(width, height, rng) {
                Ok(canvas) => canvas,
                Err(e) => {
                    warn!("Background picture unusable, using noise: {}", e);
                    gaussian_noise(width, height, rng)
                }
            },
        };
        ensure_non_empty(&canvas, "background")?;
        Ok(canvas)
    }
}

/// Light Gaussian noise around a near-white mean.
pub fn gaussian_noise(width: u32, height: u32, rng: &mut dyn RngCore) -> Bitmap {
    Bitmap::from_fn(width, height, |_, _| {
        // Box-Muller
        let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
        let u2: f32 = rng.gen_range(0.0..1.0);
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
        Luma([(NOISE_MEAN + NOISE_STD_DEV * z).round().clamp(0.0, 255.0) as u8])
    })
}

/// Interference pattern of rotated cosine plane waves.
pub fn quasicrystal(width: u32, height: u32, rng: &mut dyn RngCore) -> Bitmap {
    let frequency = rng.gen_range(20.0..50.0f32);
    let phase = rng.gen_range(0.0..2.0 * PI);
    let waves: Vec<(f32, f32)> = (0..QUASICRYSTAL_WAVES)
        .map(|i| (i as f32 * PI / QUASICRYSTAL_WAVES as f32).sin_cos())
        .collect();
    let (wd, hd) = ((width.max(2) - 1) as f32, (height.max(2) - 1) as f32);

    Bitmap::from_fn(width, height, |px, py| {
        let x = px as f32 / wd * 4.0 * PI - 2.0 * PI;
        let y = py as f32 / hd * 4.0 * PI - 2.0 * PI;
        let z: f32 = waves
            .iter()
            .map(|&(sin, cos)| ((x * cos + y * sin) * frequency / (4.0 * PI) + phase).cos())
            .sum();
        let normalized = (z / QUASICRYSTAL_WAVES as f32 + 1.0) / 2.0;
        Luma([(normalized * 255.0).round().clamp(0.0, 255.0) as u8])
    })
}

/// Pastes `text` onto `background` at `offset`.
///
/// Pure white and pure black text pixels are transparent.
pub fn composite(background: &Bitmap, text: &Bitmap, offset: (u32, u32)) -> Bitmap {
    let mut canvas = background.clone();
    paste_with_mask(&mut canvas, text, offset.0, offset.1);
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tempfile::TempDir;

    #[test]
    fn test_every_kind_has_requested_size() {
        let source = ProceduralBackgrounds::new();
        let mut rng = StdRng::seed_from_u64(5);
        for kind in [
            BackgroundKind::GaussianNoise,
            BackgroundKind::PlainWhite,
            BackgroundKind::Quasicrystal,
            BackgroundKind::Picture,
        ] {
            let canvas = source.generate(kind, 73, 41, &mut rng).unwrap();
            assert_eq!(canvas.dimensions(), (73, 41));
        }
    }

    #[test]
    fn test_noise_is_near_white() {
        let canvas = gaussian_noise(100, 100, &mut StdRng::seed_from_u64(1));
        let mean = canvas.pixels().map(|p| p.0[0] as f64).sum::<f64>() / 10_000.0;
        assert!((mean - 235.0).abs() < 2.0);
    }

    #[test]
    fn test_quasicrystal_has_contrast() {
        let canvas = quasicrystal(64, 64, &mut StdRng::seed_from_u64(1));
        let min = canvas.pixels().map(|p| p.0[0]).min().unwrap();
        let max = canvas.pixels().map(|p| p.0[0]).max().unwrap();
        assert!(max - min > 100);
    }

    #[test]
    fn test_picture_crop_and_upscale() {
        let dir = TempDir::new().unwrap();
        Bitmap::from_pixel(20, 10, Luma([77]))
            .save(dir.path().join("small.png"))
            .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let source = ProceduralBackgrounds::with_pictures_dir(dir.path()).unwrap();
        assert_eq!(source.pictures().len(), 1);
        let canvas = source
            .generate(BackgroundKind::Picture, 60, 30, &mut StdRng::seed_from_u64(3))
            .unwrap();
        assert_eq!(canvas.dimensions(), (60, 30));
        assert!(canvas.pixels().all(|p| p.0[0] == 77));
    }

    #[test]
    fn test_composite_keeps_background_under_white() {
        let background = Bitmap::from_pixel(10, 10, Luma([100]));
        let mut text = Bitmap::from_pixel(4, 4, Luma([255]));
        text.put_pixel(1, 1, Luma([20]));
        let canvas = composite(&background, &text, (2, 3));
        assert_eq!(canvas.get_pixel(3, 4).0[0], 20);
        assert_eq!(canvas.get_pixel(2, 3).0[0], 100);
    }
}
