//! Photometric stages: inversion and salt/pepper speckle.

use crate::domain::{Bitmap, SpeckleNoise};
use image::Luma;
use rand::Rng;

/// Negates every intensity.
pub fn invert(bitmap: &Bitmap) -> Bitmap {
    let mut out = bitmap.clone();
    image::imageops::invert(&mut out);
    out
}

/// Sets a random `density` fraction of pixels to white (salt) or black
/// (pepper). Pixels are drawn with replacement.
pub fn speckle<R: Rng + ?Sized>(bitmap: &Bitmap, noise: &SpeckleNoise, rng: &mut R) -> Bitmap {
    let (density, value) = match *noise {
        SpeckleNoise::None => return bitmap.clone(),
        SpeckleNoise::Salt { density } => (density, 255u8),
        SpeckleNoise::Pepper { density } => (density, 0u8),
    };
    let (width, height) = bitmap.dimensions();
    let mut out = bitmap.clone();
    let count = ((width * height) as f32 * density.clamp(0.0, 1.0)).round() as u32;
    for _ in 0..count {
        let x = rng.gen_range(0..width);
        let y = rng.gen_range(0..height);
        out.put_pixel(x, y, Luma([value]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_invert_twice_is_identity() {
        let bitmap = Bitmap::from_fn(8, 4, |x, y| Luma([(x * 20 + y) as u8]));
        assert_eq!(invert(&bitmap).get_pixel(0, 0).0[0], 255);
        assert_eq!(invert(&invert(&bitmap)), bitmap);
    }

    #[test]
    fn test_pepper_only_darkens() {
        let bitmap = Bitmap::from_pixel(100, 50, Luma([200]));
        let out = speckle(
            &bitmap,
            &SpeckleNoise::Pepper { density: 0.01 },
            &mut StdRng::seed_from_u64(2),
        );
        let black = out.pixels().filter(|p| p.0[0] == 0).count();
        assert!(black > 0 && black <= 50);
        assert!(out.pixels().all(|p| p.0[0] == 0 || p.0[0] == 200));
    }

    #[test]
    fn test_salt_whitens() {
        let bitmap = Bitmap::from_pixel(100, 50, Luma([0]));
        let out = speckle(
            &bitmap,
            &SpeckleNoise::Salt { density: 0.01 },
            &mut StdRng::seed_from_u64(2),
        );
        assert!(out.pixels().any(|p| p.0[0] == 255));
    }
}
