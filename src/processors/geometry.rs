//! Whole-image geometric stages: rotation, shear, aspect resize and crop.

use crate::core::constants::BACKGROUND_VALUE;
use crate::core::errors::SynthResult;
use crate::core::validation::ensure_non_empty;
use crate::domain::{Bitmap, ResizeAxis, ResizeFilter, ResizePlan};
use crate::utils::image::border_mean;
use crate::utils::transform::remap;
use image::imageops::{self, FilterType};
use tracing::debug;

/// Rotates counter-clockwise by `degrees`, growing the canvas to fit.
///
/// Exposed corners are white.
pub fn rotate_expand(bitmap: &Bitmap, degrees: f32) -> SynthResult<Bitmap> {
    if degrees == 0.0 {
        return Ok(bitmap.clone());
    }
    let (width, height) = bitmap.dimensions();
    let (sin, cos) = degrees.to_radians().sin_cos();
    let new_width = (width as f32 * cos.abs() + height as f32 * sin.abs()).ceil() as u32;
    let new_height = (width as f32 * sin.abs() + height as f32 * cos.abs()).ceil() as u32;

    let (cx, cy) = ((width as f32 - 1.0) / 2.0, (height as f32 - 1.0) / 2.0);
    let (ncx, ncy) = ((new_width as f32 - 1.0) / 2.0, (new_height as f32 - 1.0) / 2.0);
    let out = remap(
        bitmap,
        new_width.max(1),
        new_height.max(1),
        BACKGROUND_VALUE,
        |x, y| {
            let (ox, oy) = (x as f32 - ncx, y as f32 - ncy);
            Some((cx + ox * cos - oy * sin, cy + ox * sin + oy * cos))
        },
    );
    ensure_non_empty(&out, "rotate")?;
    Ok(out)
}

/// Horizontal shear by `degrees`, widening the canvas by `|tan| * height`.
///
/// Exposed area takes the mean border intensity so sheared samples that
/// already carry a background do not grow white wedges.
pub fn shear(bitmap: &Bitmap, degrees: f32) -> SynthResult<Bitmap> {
    if degrees == 0.0 {
        return Ok(bitmap.clone());
    }
    let (width, height) = bitmap.dimensions();
    let t = degrees.to_radians().tan();
    let extra = (t.abs() * height as f32).ceil() as u32;
    let base = if t >= 0.0 {
        0.0
    } else {
        -t * (height as f32 - 1.0)
    };
    let fill = border_mean(bitmap);
    let out = remap(bitmap, width + extra, height, fill, |x, y| {
        Some((x as f32 - (t * y as f32 + base), y as f32))
    });
    ensure_non_empty(&out, "shear")?;
    Ok(out)
}

/// Applies the aspect-ratio jitter and clamps the height into `bounds`.
///
/// The clamp rescales both axes so the jittered aspect survives.
pub fn aspect_resize(bitmap: &Bitmap, plan: &ResizePlan, bounds: (u32, u32)) -> SynthResult<Bitmap> {
    let (width, height) = bitmap.dimensions();
    let factor = plan.factor.max(f32::EPSILON);
    let (mut w, mut h) = match plan.axis {
        ResizeAxis::Width => (width as f32 * factor, height as f32),
        ResizeAxis::Height => (width as f32, height as f32 * factor),
        ResizeAxis::Both => (width as f32 * factor, height as f32 * factor),
    };

    let (min_height, max_height) = bounds;
    if h > max_height as f32 {
        let scale = max_height as f32 / h;
        w *= scale;
        h = max_height as f32;
    } else if h < min_height as f32 {
        let scale = min_height as f32 / h;
        w *= scale;
        h = min_height as f32;
    }

    let target_w = (w.round() as u32).max(1);
    let target_h = (h.round() as u32).clamp(min_height.max(1), max_height.max(1));
    if (target_w, target_h) == (width, height) {
        return Ok(bitmap.clone());
    }
    debug!(
        "Resizing {}x{} to {}x{} ({:?})",
        width, height, target_w, target_h, plan.axis
    );

    let filter = match plan.filter {
        ResizeFilter::Lanczos => FilterType::Lanczos3,
        ResizeFilter::Bilinear => FilterType::Triangle,
    };
    let out = imageops::resize(bitmap, target_w, target_h, filter);
    ensure_non_empty(&out, "resize")?;
    Ok(out)
}

/// Drops the top `rows` rows when at least one row would remain.
pub fn crop_top(bitmap: &Bitmap, rows: u32) -> Bitmap {
    let (width, height) = bitmap.dimensions();
    if rows == 0 || rows >= height {
        return bitmap.clone();
    }
    imageops::crop_imm(bitmap, 0, rows, width, height - rows).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn bar() -> Bitmap {
        let mut bitmap = Bitmap::from_pixel(60, 20, Luma([255]));
        for x in 10..50 {
            for y in 8..12 {
                bitmap.put_pixel(x, y, Luma([0]));
            }
        }
        bitmap
    }

    #[test]
    fn test_zero_rotation_is_identity() {
        assert_eq!(rotate_expand(&bar(), 0.0).unwrap(), bar());
    }

    #[test]
    fn test_quarter_rotation_swaps_dimensions() {
        let out = rotate_expand(&bar(), 90.0).unwrap();
        assert!(out.width().abs_diff(20) <= 1);
        assert!(out.height().abs_diff(60) <= 1);
    }

    #[test]
    fn test_rotation_grows_canvas() {
        let out = rotate_expand(&bar(), 10.0).unwrap();
        assert!(out.height() > 20);
        assert!(out.pixels().any(|p| p.0[0] < 128));
    }

    #[test]
    fn test_shear_widens_by_tangent() {
        let out = shear(&bar(), 3.0).unwrap();
        let extra = (3f32.to_radians().tan() * 20.0).ceil() as u32;
        assert_eq!(out.dimensions(), (60 + extra, 20));
        let out = shear(&bar(), -3.0).unwrap();
        assert_eq!(out.dimensions(), (60 + extra, 20));
    }

    #[test]
    fn test_shear_fill_uses_border_mean() {
        let bitmap = Bitmap::from_pixel(40, 20, Luma([180]));
        let out = shear(&bitmap, 20.0).unwrap();
        assert!(out.pixels().all(|p| p.0[0].abs_diff(180) <= 1));
    }

    #[test]
    fn test_resize_width_only() {
        let plan = ResizePlan {
            axis: ResizeAxis::Width,
            factor: 0.5,
            filter: ResizeFilter::Bilinear,
        };
        let out = aspect_resize(&bar(), &plan, (10, 60)).unwrap();
        assert_eq!(out.dimensions(), (30, 20));
    }

    #[test]
    fn test_resize_clamps_height() {
        let plan = ResizePlan {
            axis: ResizeAxis::Both,
            factor: 4.0,
            filter: ResizeFilter::Lanczos,
        };
        let out = aspect_resize(&bar(), &plan, (10, 40)).unwrap();
        assert_eq!(out.height(), 40);
        assert_eq!(out.width(), 120);

        let plan = ResizePlan {
            axis: ResizeAxis::Height,
            factor: 0.1,
            filter: ResizeFilter::Lanczos,
        };
        let out = aspect_resize(&bar(), &plan, (16, 40)).unwrap();
        assert_eq!(out.height(), 16);
    }

    #[test]
    fn test_unit_resize_is_identity() {
        let plan = ResizePlan {
            axis: ResizeAxis::Both,
            factor: 1.0,
            filter: ResizeFilter::Lanczos,
        };
        assert_eq!(aspect_resize(&bar(), &plan, (10, 40)).unwrap(), bar());
    }

    #[test]
    fn test_crop_top() {
        assert_eq!(crop_top(&bar(), 5).height(), 15);
        assert_eq!(crop_top(&bar(), 20).height(), 20);
    }
}
