//! Fonts and glyph support.
//!
//! - [`loader`]: opening font files and discovering them on disk
//! - [`candidates`]: per-script pools of characters worth testing
//! - [`support`]: the render-and-inspect glyph support check
//! - [`profile`]: per-font supported-character profiles and their cache

pub mod candidates;
pub mod loader;
pub mod profile;
pub mod support;

pub use candidates::CandidatePool;
pub use loader::{FontHandle, FontStore, load_fonts};
pub use profile::{FontGlyphProfile, GlyphProfileRepository, font_key};
pub use support::{GlyphCheckConfig, GlyphRasterSource, GlyphSupportResolver, GlyphVerdict};

/// A TrueType font available on the test machine, if any.
#[cfg(test)]
pub(crate) fn test_font_path() -> Option<std::path::PathBuf> {
    [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ]
    .iter()
    .map(std::path::PathBuf::from)
    .find(|p| p.exists())
}
