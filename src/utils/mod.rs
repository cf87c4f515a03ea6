//! Utility functions for the generator.
//!
//! This module provides image helpers, the geometric transformation
//! primitives used by the warps, and logging setup.

pub mod image;
pub mod transform;

pub use image::{
    border_mean, is_mostly_white, load_gray_image, paste_with_mask, white_fraction,
};
pub use transform::{Point2f, bilinear_interpolate, remap, solve_affine, warp_perspective};

/// Initializes the tracing subscriber for logging.
///
/// This function sets up the tracing subscriber with environment filter and formatting layer.
/// It's typically called at the start of an application to enable logging.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
