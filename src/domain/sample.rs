//! Sample requests and finished samples.

use super::Bitmap;
use super::recipe::AugmentationRecipe;
use std::path::PathBuf;

/// One unit of batch work: draw `text` with `font`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRequest {
    /// Position in the batch; drives naming and the per-sample seed.
    pub index: usize,
    /// Raw text before glyph filtering.
    pub text: String,
    /// Font file to draw with.
    pub font: PathBuf,
}

impl SampleRequest {
    pub fn new(index: usize, text: impl Into<String>, font: impl Into<PathBuf>) -> Self {
        Self {
            index,
            text: text.into(),
            font: font.into(),
        }
    }

    /// Derives the per-sample seed from the batch seed.
    ///
    /// The mix is a splitmix64 step, so neighbouring indices get unrelated
    /// streams and the result does not depend on scheduling order.
    pub fn seed(&self, batch_seed: u64) -> u64 {
        let mut z = batch_seed ^ (self.index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}

/// A finished sample.
#[derive(Debug, Clone)]
pub struct Sample {
    pub index: usize,
    /// Final grayscale image.
    pub image: Bitmap,
    /// Ground-truth label: the filtered text that was actually drawn.
    pub label: String,
    /// Font the label was drawn with.
    pub font: PathBuf,
    /// The recipe that produced the image.
    pub recipe: AugmentationRecipe,
    /// Intermediate stage outputs, recorded only in debug mode.
    pub stages: Vec<(&'static str, Bitmap)>,
}
