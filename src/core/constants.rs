//! Constants used throughout the generator.
//!
//! This module defines default values shared by the rasterizer, the
//! augmentation stages and the glyph support resolver.

/// The default nominal text height in pixels.
pub const DEFAULT_HEIGHT: u32 = 32;

/// The default padding around rasterized text, in pixels.
pub const DEFAULT_TEXT_MARGIN: u32 = 2;

/// Background intensity of every canvas before compositing.
pub const BACKGROUND_VALUE: u8 = 255;

/// Intensity range for randomly picked dark foregrounds.
///
/// Tight-kerning runs use the wider [`RANDOM_DARK_TIGHT_MAX`] bound.
pub const RANDOM_DARK_RANGE: (u8, u8) = (1, 50);

/// Upper intensity bound for random foregrounds in tight-kerning mode.
pub const RANDOM_DARK_TIGHT_MAX: u8 = 80;

/// Number of leading and trailing spaces always added around sample text.
pub const BASE_PADDING_SPACES: usize = 2;

/// Reference pixel size used when checking whether a glyph renders.
pub const GLYPH_REFERENCE_SIZE: f32 = 32.0;

/// Number of blank characters appended to every glyph profile.
pub const PROFILE_BLANK_COUNT: usize = 4;

/// Fraction of white pixels above which a perspective warp is discarded.
pub const DEGENERATE_WHITE_FRACTION: f32 = 0.98;

/// Version tag written into the persisted glyph cache.
pub const GLYPH_CACHE_VERSION: u32 = 1;
