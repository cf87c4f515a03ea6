//! Image processing stages of the generator.
//!
//! Each stage takes a bitmap by reference and returns a new one.
//!
//! # Modules
//!
//! * `rasterize` - Text to bitmap, in every layout mode
//! * `distortion` - Sine, cosine and random pixel-shift warps
//! * `elastic` - Affine jitter, elastic and perspective resampling warps
//! * `morphology` - Erosion and sparse pixel masks
//! * `geometry` - Rotation, shear, aspect resize and crop
//! * `background` - Background canvases and compositing
//! * `blur` - Blur catalogue and sharpening
//! * `photometric` - Inversion and salt/pepper speckle

pub mod background;
pub mod blur;
pub mod distortion;
pub mod elastic;
pub mod geometry;
pub mod morphology;
pub mod photometric;
pub mod rasterize;

pub use background::{BackgroundSource, ProceduralBackgrounds, composite};
pub use blur::{BlurProcessor, Kernel, convolve, sharpen};
pub use distortion::GeometricDistorter;
pub use elastic::ElasticAffineWarper;
pub use geometry::{aspect_resize, crop_top, rotate_expand, shear};
pub use morphology::{apply_erosion, apply_pixel_noise, erode};
pub use photometric::{invert, speckle};
pub use rasterize::{LayoutTuning, TextRasterizer};
