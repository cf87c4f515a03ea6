//! Geometric transformation utilities.
//!
//! This module provides the matrix solvers and the inverse-mapping resampler
//! shared by the affine, perspective and elastic warps. All warps work on
//! grayscale bitmaps and fill pixels that map outside the source with a
//! constant value (white for text images).

use crate::core::errors::{SynthError, SynthResult};
use image::GrayImage;
use nalgebra::{DMatrix, DVector, Matrix3, Vector3};
use rayon::prelude::*;

/// A 2D point with floating-point coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2f {
    /// X coordinate of the point.
    pub x: f32,
    /// Y coordinate of the point.
    pub y: f32,
}

impl Point2f {
    /// Creates a new Point2f with the given coordinates.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Calculates the Euclidean distance between two points.
pub fn distance(p1: &Point2f, p2: &Point2f) -> f32 {
    (p1.x - p2.x).hypot(p1.y - p2.y)
}

/// Calculates the perspective transformation matrix that maps source points to destination points.
///
/// # Errors
///
/// Returns an error if either slice doesn't contain exactly 4 points or the
/// linear system is singular.
pub fn get_perspective_transform(
    src_points: &[Point2f],
    dst_points: &[Point2f],
) -> SynthResult<Matrix3<f32>> {
    if src_points.len() != 4 || dst_points.len() != 4 {
        return Err(SynthError::transform(
            "perspective",
            "need exactly 4 points for perspective transformation",
        ));
    }

    let mut a = DMatrix::<f32>::zeros(8, 8);
    let mut b = DVector::<f32>::zeros(8);

    for (i, (src, dst)) in src_points.iter().zip(dst_points).enumerate() {
        a.set_row(
            i * 2,
            &nalgebra::RowDVector::from_row_slice(&[
                src.x,
                src.y,
                1.0,
                0.0,
                0.0,
                0.0,
                -src.x * dst.x,
                -src.y * dst.x,
            ]),
        );
        b[i * 2] = dst.x;

        a.set_row(
            i * 2 + 1,
            &nalgebra::RowDVector::from_row_slice(&[
                0.0,
                0.0,
                0.0,
                src.x,
                src.y,
                1.0,
                -src.x * dst.y,
                -src.y * dst.y,
            ]),
        );
        b[i * 2 + 1] = dst.y;
    }

    let solution = a
        .lu()
        .solve(&b)
        .ok_or_else(|| SynthError::transform("perspective", "cannot solve perspective system"))?;

    Ok(Matrix3::new(
        solution[0],
        solution[1],
        solution[2],
        solution[3],
        solution[4],
        solution[5],
        solution[6],
        solution[7],
        1.0,
    ))
}

/// Least-squares affine transform mapping `src_points` onto `dst_points`.
///
/// Three points determine the transform exactly; more are fitted in the
/// least-squares sense.
///
/// # Errors
///
/// Returns an error for fewer than 3 point pairs, mismatched lengths, or a
/// degenerate (collinear) configuration.
pub fn solve_affine(src_points: &[Point2f], dst_points: &[Point2f]) -> SynthResult<Matrix3<f32>> {
    if src_points.len() < 3 || src_points.len() != dst_points.len() {
        return Err(SynthError::transform(
            "affine",
            "need at least 3 matching point pairs",
        ));
    }

    let n = src_points.len();
    let (mx, my) = src_points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    let (mx, my) = (mx / n as f32, my / n as f32);
    let (sxx, syy, sxy) = src_points.iter().fold((0.0, 0.0, 0.0), |(a, b, c), p| {
        let (dx, dy) = (p.x - mx, p.y - my);
        (a + dx * dx, b + dy * dy, c + dx * dy)
    });
    if sxx * syy - sxy * sxy <= 1e-6 * (sxx + syy).max(1.0) {
        return Err(SynthError::transform("affine", "source points are collinear"));
    }

    let mut a = DMatrix::<f32>::zeros(n * 2, 6);
    let mut b = DVector::<f32>::zeros(n * 2);
    for (i, (src, dst)) in src_points.iter().zip(dst_points).enumerate() {
        a.set_row(
            i * 2,
            &nalgebra::RowDVector::from_row_slice(&[src.x, src.y, 1.0, 0.0, 0.0, 0.0]),
        );
        b[i * 2] = dst.x;
        a.set_row(
            i * 2 + 1,
            &nalgebra::RowDVector::from_row_slice(&[0.0, 0.0, 0.0, src.x, src.y, 1.0]),
        );
        b[i * 2 + 1] = dst.y;
    }

    let at = a.transpose();
    let normal = &at * &a;
    let rhs = &at * &b;
    let solution = normal
        .lu()
        .solve(&rhs)
        .ok_or_else(|| SynthError::transform("affine", "degenerate point configuration"))?;

    Ok(Matrix3::new(
        solution[0],
        solution[1],
        solution[2],
        solution[3],
        solution[4],
        solution[5],
        0.0,
        0.0,
        1.0,
    ))
}

/// Applies a projective (or affine) transformation to an image.
///
/// Uses inverse mapping with bilinear interpolation; destination pixels that
/// map outside the source take `fill`.
///
/// # Errors
///
/// Returns an error if the transformation matrix cannot be inverted.
pub fn warp_perspective(
    src_image: &GrayImage,
    transform_matrix: &Matrix3<f32>,
    dst_width: u32,
    dst_height: u32,
    fill: u8,
) -> SynthResult<GrayImage> {
    let inv_matrix = transform_matrix
        .try_inverse()
        .ok_or_else(|| SynthError::transform("warp", "cannot invert transformation matrix"))?;

    Ok(remap(src_image, dst_width, dst_height, fill, |x, y| {
        let src_point = inv_matrix * Vector3::new(x as f32, y as f32, 1.0);
        if src_point.z.abs() > f32::EPSILON {
            Some((src_point.x / src_point.z, src_point.y / src_point.z))
        } else {
            None
        }
    }))
}

/// Builds a `dst_width x dst_height` image by sampling `src_image` at the
/// coordinates returned by `map` for every destination pixel.
///
/// Rows are processed in parallel. `None` or out-of-range coordinates yield
/// `fill`.
pub fn remap<F>(src_image: &GrayImage, dst_width: u32, dst_height: u32, fill: u8, map: F) -> GrayImage
where
    F: Fn(u32, u32) -> Option<(f32, f32)> + Sync,
{
    let mut dst_image = GrayImage::from_pixel(dst_width, dst_height, image::Luma([fill]));
    if dst_width == 0 || dst_height == 0 {
        return dst_image;
    }
    let buffer: &mut [u8] = dst_image.as_mut();

    buffer
        .par_chunks_mut(dst_width as usize)
        .enumerate()
        .for_each(|(dst_y, row_buffer)| {
            for (dst_x, pixel) in row_buffer.iter_mut().enumerate() {
                if let Some((src_x, src_y)) = map(dst_x as u32, dst_y as u32) {
                    *pixel = bilinear_interpolate(src_image, src_x, src_y, fill);
                }
            }
        });

    dst_image
}

/// Performs bilinear interpolation at fractional coordinates.
///
/// Samples further than one pixel outside the image return `fill`; samples
/// on the border blend with `fill`.
pub fn bilinear_interpolate(image: &GrayImage, x: f32, y: f32, fill: u8) -> u8 {
    let (width, height) = image.dimensions();
    if !x.is_finite() || !y.is_finite() {
        return fill;
    }
    if x <= -1.0 || y <= -1.0 || x >= width as f32 || y >= height as f32 {
        return fill;
    }

    let x0 = x.floor();
    let y0 = y.floor();
    let dx = x - x0;
    let dy = y - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let at = |px: i64, py: i64| -> f32 {
        if px < 0 || py < 0 || px >= width as i64 || py >= height as i64 {
            fill as f32
        } else {
            image.get_pixel(px as u32, py as u32).0[0] as f32
        }
    };

    let val = (1.0 - dx) * (1.0 - dy) * at(x0, y0)
        + dx * (1.0 - dy) * at(x0 + 1, y0)
        + (1.0 - dx) * dy * at(x0, y0 + 1)
        + dx * dy * at(x0 + 1, y0 + 1);
    val.round().clamp(0.0, 255.0) as u8
}
