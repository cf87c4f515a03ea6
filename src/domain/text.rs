//! Text rendering request types.

use serde::{Deserialize, Serialize};

/// How a text run is laid out by the rasterizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextMode {
    /// Single pass at the nominal size.
    Normal,
    /// Glyph-by-glyph with a compressed advance, simulating condensed type.
    TightKerning,
    /// Two or three runs alternating between an enlarged and the nominal size.
    SplitDualSize,
    /// Each character independently drawn at nominal or enlarged size.
    PerCharacterJitteredSize,
    /// Glyph-by-glyph with a small random gap after each character.
    RandomExtraSpacing,
}

impl TextMode {
    /// All modes, in declaration order.
    pub const ALL: [TextMode; 5] = [
        TextMode::Normal,
        TextMode::TightKerning,
        TextMode::SplitDualSize,
        TextMode::PerCharacterJitteredSize,
        TextMode::RandomExtraSpacing,
    ];
}

/// Foreground intensity used when drawing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextColor {
    /// Always draw with this gray value.
    Fixed(u8),
    /// Pick a random dark value for every drawn run.
    #[default]
    RandomDark,
}

impl TextColor {
    /// Interprets the CLI convention where a negative value means "random".
    pub fn from_signed(value: i32) -> Self {
        if value < 0 {
            TextColor::RandomDark
        } else {
            TextColor::Fixed(value.min(255) as u8)
        }
    }
}

/// The text to draw, its layout mode and nominal height in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpec {
    /// Text to rasterize, already filtered through the font's glyph profile.
    pub text: String,
    /// Layout mode.
    pub mode: TextMode,
    /// Nominal line height in pixels.
    pub height: u32,
}

impl TextSpec {
    /// Creates a new text spec.
    pub fn new(text: impl Into<String>, mode: TextMode, height: u32) -> Self {
        Self {
            text: text.into(),
            mode,
            height,
        }
    }
}
