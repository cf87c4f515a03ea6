//! Geometric distortion descriptors.

use serde::{Deserialize, Serialize};

/// Which axes a periodic or random pixel-shift warp acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Orientation {
    /// Columns move up and down.
    #[default]
    Vertical,
    /// Rows move left and right.
    Horizontal,
    /// Both passes, vertical first.
    Both,
}

impl Orientation {
    /// Maps the numeric CLI code (0 vertical, 1 horizontal, 2 both).
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Orientation::Vertical),
            1 => Some(Orientation::Horizontal),
            2 => Some(Orientation::Both),
            _ => None,
        }
    }

    pub fn vertical(self) -> bool {
        matches!(self, Orientation::Vertical | Orientation::Both)
    }

    pub fn horizontal(self) -> bool {
        matches!(self, Orientation::Horizontal | Orientation::Both)
    }
}

/// The pixel-shift distortion family selected for a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistortionKind {
    None,
    Sine,
    Cosine,
    Random,
}

impl DistortionKind {
    /// Maps the numeric CLI code (0 none, 1 sine, 2 cosine, 3 random).
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(DistortionKind::None),
            1 => Some(DistortionKind::Sine),
            2 => Some(DistortionKind::Cosine),
            3 => Some(DistortionKind::Random),
            _ => None,
        }
    }
}

/// The resampling warp family selected for a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarpKind {
    None,
    Affine,
    Elastic,
    Perspective,
}

/// Parameters of one distortion pass.
///
/// Exactly one variant is active per pass. Magnitudes of the resampling
/// variants are relative to the smaller image dimension so that a recipe
/// can be sampled before the bitmap it applies to exists.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DistortionParams {
    /// Identity.
    None,
    /// Rows/columns follow `sin(x°) * max_offset`.
    Sine {
        orientation: Orientation,
        max_offset: u32,
    },
    /// Rows/columns follow `cos(x°) * max_offset`.
    Cosine {
        orientation: Orientation,
        max_offset: u32,
    },
    /// Every row/column gets an independent random offset.
    UniformRandom { orientation: Orientation },
    /// Reference points move by up to `magnitude * min(width, height)`.
    AffineJitter { magnitude: f32 },
    /// Smoothed displacement field with amplitude `alpha * min(width, height)`.
    Elastic {
        alpha_x: f32,
        alpha_y: f32,
        sigma: f32,
    },
    /// Corners move by up to `jitter_range * min(width, height)`.
    Perspective { jitter_range: f32 },
}

impl DistortionParams {
    /// Short stage name for logs and debug dumps.
    pub fn name(&self) -> &'static str {
        match self {
            DistortionParams::None => "none",
            DistortionParams::Sine { .. } => "sine",
            DistortionParams::Cosine { .. } => "cosine",
            DistortionParams::UniformRandom { .. } => "random",
            DistortionParams::AffineJitter { .. } => "affine",
            DistortionParams::Elastic { .. } => "elastic",
            DistortionParams::Perspective { .. } => "perspective",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, DistortionParams::None)
    }
}
