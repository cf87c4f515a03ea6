//! Glyph support detection.
//!
//! A font's character map routinely overclaims: many fonts map characters
//! to an empty outline or to a generic "missing glyph" box. The resolver
//! therefore decides support by rendering each candidate and inspecting the
//! pixels:
//!
//! 1. the character map must declare the character,
//! 2. the glyph rendered at the reference size must contain ink,
//! 3. the glyph must not look like a placeholder box: few outer contours,
//!    one of which simplifies to a large near-square quadrilateral.
//!
//! Step 3 has an allow-list for characters that are legitimately square.

use super::candidates::CandidatePool;
use super::loader::FontHandle;
use crate::core::config::{ConfigError, ConfigValidator};
use crate::core::constants::{BACKGROUND_VALUE, GLYPH_REFERENCE_SIZE, PROFILE_BLANK_COUNT};
use ab_glyph::{Font, ScaleFont, point};
use image::{GrayImage, Luma};
use imageproc::contours::{BorderType, find_contours};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Something that can answer "is this character mapped" and "what does it
/// look like" for one font.
pub trait GlyphRasterSource {
    /// Whether the character map declares `ch`.
    fn has_mapping(&self, ch: char) -> bool;

    /// Renders `ch` alone, dark on a white canvas, at `size` pixels.
    ///
    /// Returns `None` when the font has no outline for the character.
    fn render_glyph(&self, ch: char, size: f32) -> Option<GrayImage>;
}

impl GlyphRasterSource for FontHandle {
    fn has_mapping(&self, ch: char) -> bool {
        FontHandle::has_mapping(self, ch)
    }

    fn render_glyph(&self, ch: char, size: f32) -> Option<GrayImage> {
        let font = self.font();
        let scaled = font.as_scaled(size);
        let mut glyph = scaled.scaled_glyph(ch);
        let advance = scaled.h_advance(glyph.id).ceil().max(1.0) as u32;
        let ascent = scaled.ascent();
        let height = (ascent - scaled.descent()).ceil().max(1.0) as u32;

        glyph.position = point(0.0, ascent);
        let outlined = font.outline_glyph(glyph)?;
        let bounds = outlined.px_bounds();
        let left = bounds.min.x.min(0.0);
        let top = bounds.min.y.min(0.0);
        let width = (bounds.max.x.max(advance as f32) - left).ceil().max(1.0) as u32;
        let height = (bounds.max.y.max(height as f32) - top).ceil().max(1.0) as u32;

        let mut canvas = GrayImage::from_pixel(width, height, Luma([BACKGROUND_VALUE]));
        let (offset_x, offset_y) = ((bounds.min.x - left) as i64, (bounds.min.y - top) as i64);
        outlined.draw(|x, y, coverage| {
            let px = offset_x + x as i64;
            let py = offset_y + y as i64;
            if px >= 0 && py >= 0 && (px as u32) < width && (py as u32) < height {
                let value = (255.0 * (1.0 - coverage.clamp(0.0, 1.0))).round() as u8;
                let pixel = canvas.get_pixel_mut(px as u32, py as u32);
                pixel.0[0] = pixel.0[0].min(value);
            }
        });
        Some(canvas)
    }
}

/// Tunables of the support heuristics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlyphCheckConfig {
    /// Pixel size glyphs are rendered at for inspection.
    #[serde(default = "GlyphCheckConfig::default_reference_size")]
    pub reference_size: f32,
    /// Pixels darker than this count as ink.
    #[serde(default = "GlyphCheckConfig::default_ink_threshold")]
    pub ink_threshold: u8,
    /// Glyphs with at least this many outer contours are never boxes.
    #[serde(default = "GlyphCheckConfig::default_max_box_contours")]
    pub max_box_contours: usize,
    /// Polygon simplification tolerance, as a fraction of the contour length.
    #[serde(default = "GlyphCheckConfig::default_approx_epsilon")]
    pub approx_epsilon: f64,
    /// Width/height ratio range of a box.
    #[serde(default = "GlyphCheckConfig::default_box_aspect")]
    pub box_aspect: (f32, f32),
    /// Smallest box side, as a fraction of the reference size.
    #[serde(default = "GlyphCheckConfig::default_min_box_fraction")]
    pub min_box_fraction: f32,
    /// Characters accepted even when they look like boxes.
    #[serde(default = "GlyphCheckConfig::default_square_allow_list")]
    pub square_allow_list: String,
    /// Number of blank separators appended to every profile.
    #[serde(default = "GlyphCheckConfig::default_blank_count")]
    pub blank_count: usize,
}

impl GlyphCheckConfig {
    fn default_reference_size() -> f32 {
        GLYPH_REFERENCE_SIZE
    }

    fn default_ink_threshold() -> u8 {
        128
    }

    fn default_max_box_contours() -> usize {
        4
    }

    fn default_approx_epsilon() -> f64 {
        0.01
    }

    fn default_box_aspect() -> (f32, f32) {
        (0.8, 1.2)
    }

    fn default_min_box_fraction() -> f32 {
        0.4
    }

    fn default_square_allow_list() -> String {
        "ロ口囗□■".to_string()
    }

    fn default_blank_count() -> usize {
        PROFILE_BLANK_COUNT
    }
}

impl Default for GlyphCheckConfig {
    fn default() -> Self {
        Self {
            reference_size: Self::default_reference_size(),
            ink_threshold: Self::default_ink_threshold(),
            max_box_contours: Self::default_max_box_contours(),
            approx_epsilon: Self::default_approx_epsilon(),
            box_aspect: Self::default_box_aspect(),
            min_box_fraction: Self::default_min_box_fraction(),
            square_allow_list: Self::default_square_allow_list(),
            blank_count: Self::default_blank_count(),
        }
    }
}

impl ConfigValidator for GlyphCheckConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.reference_size.is_finite() || self.reference_size < 4.0 {
            return Err(ConfigError::InvalidConfig {
                message: format!("reference_size must be at least 4, got {}", self.reference_size),
            });
        }
        if self.ink_threshold == 0 {
            return Err(ConfigError::InvalidConfig {
                message: "ink_threshold must be greater than 0".to_string(),
            });
        }
        if !(self.approx_epsilon > 0.0 && self.approx_epsilon < 1.0) {
            return Err(ConfigError::InvalidConfig {
                message: format!("approx_epsilon must be in (0, 1), got {}", self.approx_epsilon),
            });
        }
        self.validate_range("box_aspect", self.box_aspect, 0.0)?;
        self.validate_probability("min_box_fraction", self.min_box_fraction as f64)
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

/// Outcome of checking one character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlyphVerdict {
    Supported,
    /// Not declared by the character map.
    Unmapped,
    /// Declared but renders no ink.
    Blank,
    /// Renders as a missing-glyph placeholder box.
    PlaceholderBox,
}

/// Decides which candidate characters a font can visibly produce.
#[derive(Debug, Clone, Default)]
pub struct GlyphSupportResolver {
    config: GlyphCheckConfig,
}

impl GlyphSupportResolver {
    pub fn new(config: GlyphCheckConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GlyphCheckConfig {
        &self.config
    }

    /// Checks a single character.
    pub fn check<S: GlyphRasterSource + ?Sized>(&self, source: &S, ch: char) -> GlyphVerdict {
        if !source.has_mapping(ch) {
            return GlyphVerdict::Unmapped;
        }
        let Some(glyph) = source.render_glyph(ch, self.config.reference_size) else {
            return GlyphVerdict::Blank;
        };
        if !glyph.pixels().any(|p| p.0[0] != BACKGROUND_VALUE) {
            return GlyphVerdict::Blank;
        }
        if !self.config.square_allow_list.contains(ch) && self.looks_like_box(&glyph) {
            return GlyphVerdict::PlaceholderBox;
        }
        GlyphVerdict::Supported
    }

    /// Returns the supported characters of `pool`, in pool order, followed
    /// by the configured number of blank separators.
    pub fn resolve<S: GlyphRasterSource + ?Sized>(
        &self,
        source: &S,
        pool: &CandidatePool,
    ) -> Vec<char> {
        let mut rejected = [0usize; 3];
        let mut chars: Vec<char> = pool
            .chars()
            .iter()
            .copied()
            .filter(|&ch| match self.check(source, ch) {
                GlyphVerdict::Supported => true,
                GlyphVerdict::Unmapped => {
                    rejected[0] += 1;
                    false
                }
                GlyphVerdict::Blank => {
                    rejected[1] += 1;
                    false
                }
                GlyphVerdict::PlaceholderBox => {
                    rejected[2] += 1;
                    false
                }
            })
            .collect();
        debug!(
            "Glyph check: {} supported, {} unmapped, {} blank, {} boxes",
            chars.len(),
            rejected[0],
            rejected[1],
            rejected[2]
        );
        chars.extend(std::iter::repeat_n(' ', self.config.blank_count));
        chars
    }

    /// Contour heuristic for missing-glyph boxes.
    pub fn looks_like_box(&self, glyph: &GrayImage) -> bool {
        let threshold = self.config.ink_threshold;
        let binary = GrayImage::from_fn(glyph.width(), glyph.height(), |x, y| {
            if glyph.get_pixel(x, y).0[0] < threshold {
                Luma([255])
            } else {
                Luma([0])
            }
        });

        let outer: Vec<_> = find_contours::<i32>(&binary)
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer)
            .collect();
        if outer.is_empty() || outer.len() >= self.config.max_box_contours {
            return false;
        }

        let min_side = self.config.min_box_fraction * self.config.reference_size;
        let (low, high) = self.config.box_aspect;
        outer.iter().any(|contour| {
            let epsilon = self.config.approx_epsilon * arc_length(&contour.points, true);
            let approx = approximate_polygon_dp(&contour.points, epsilon, true);
            if approx.len() != 4 {
                return false;
            }
            let (min_x, max_x) = approx
                .iter()
                .fold((i32::MAX, i32::MIN), |(lo, hi), p| (lo.min(p.x), hi.max(p.x)));
            let (min_y, max_y) = approx
                .iter()
                .fold((i32::MAX, i32::MIN), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));
            let w = (max_x - min_x + 1) as f32;
            let h = (max_y - min_y + 1) as f32;
            let aspect = w / h;
            aspect >= low && aspect <= high && w.max(h) >= min_side
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::fonts::test_font_path;
    use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut};
    use imageproc::rect::Rect;
    use std::collections::HashMap;

    /// In-memory font: every mapped character has a canned rendering.
    #[derive(Default)]
    pub(crate) struct FakeGlyphs {
        pub glyphs: HashMap<char, Option<GrayImage>>,
    }

    impl FakeGlyphs {
        pub fn with(mut self, ch: char, image: Option<GrayImage>) -> Self {
            self.glyphs.insert(ch, image);
            self
        }
    }

    impl GlyphRasterSource for FakeGlyphs {
        fn has_mapping(&self, ch: char) -> bool {
            self.glyphs.contains_key(&ch)
        }

        fn render_glyph(&self, ch: char, _size: f32) -> Option<GrayImage> {
            self.glyphs.get(&ch).cloned().flatten()
        }
    }

    pub(crate) fn blank() -> GrayImage {
        GrayImage::from_pixel(32, 32, Luma([255]))
    }

    pub(crate) fn tofu() -> GrayImage {
        let mut image = blank();
        draw_hollow_rect_mut(&mut image, Rect::at(6, 6).of_size(20, 20), Luma([0]));
        draw_hollow_rect_mut(&mut image, Rect::at(7, 7).of_size(18, 18), Luma([0]));
        image
    }

    pub(crate) fn ring() -> GrayImage {
        let mut image = blank();
        draw_filled_circle_mut(&mut image, (16, 16), 10, Luma([0]));
        draw_filled_circle_mut(&mut image, (16, 16), 6, Luma([255]));
        image
    }

    pub(crate) fn dot() -> GrayImage {
        let mut image = blank();
        for y in 26..30 {
            for x in 14..18 {
                image.put_pixel(x, y, Luma([0]));
            }
        }
        image
    }

    #[test]
    fn test_verdicts() {
        let fake = FakeGlyphs::default()
            .with('O', Some(ring()))
            .with('?', Some(tofu()))
            .with('■', Some(tofu()))
            .with(' ', None)
            .with('_', Some(blank()))
            .with('.', Some(dot()));
        let resolver = GlyphSupportResolver::default();
        assert_eq!(resolver.check(&fake, 'O'), GlyphVerdict::Supported);
        assert_eq!(resolver.check(&fake, '?'), GlyphVerdict::PlaceholderBox);
        assert_eq!(resolver.check(&fake, '■'), GlyphVerdict::Supported);
        assert_eq!(resolver.check(&fake, ' '), GlyphVerdict::Blank);
        assert_eq!(resolver.check(&fake, '_'), GlyphVerdict::Blank);
        assert_eq!(resolver.check(&fake, 'Z'), GlyphVerdict::Unmapped);
        assert_eq!(resolver.check(&fake, '.'), GlyphVerdict::Supported);
    }

    #[test]
    fn test_resolve_keeps_pool_order_and_appends_blanks() {
        let fake = FakeGlyphs::default()
            .with('b', Some(ring()))
            .with('a', Some(ring()))
            .with('x', Some(tofu()));
        let pool = CandidatePool::from_chars("abxz".chars());
        let chars = GlyphSupportResolver::default().resolve(&fake, &pool);
        assert_eq!(chars, vec!['a', 'b', ' ', ' ', ' ', ' ']);
    }

    #[test]
    fn test_many_contours_never_a_box() {
        let mut image = tofu();
        for x in [2, 28] {
            for y in [2, 28] {
                image.put_pixel(x, y, Luma([0]));
            }
        }
        assert!(!GlyphSupportResolver::default().looks_like_box(&image));
    }

    #[test]
    fn test_real_font_glyphs() {
        let Some(path) = test_font_path() else {
            return;
        };
        let font = FontHandle::open(&path).unwrap();
        let resolver = GlyphSupportResolver::default();
        assert_eq!(resolver.check(&font, 'A'), GlyphVerdict::Supported);
        assert_eq!(resolver.check(&font, 'g'), GlyphVerdict::Supported);
        assert_eq!(resolver.check(&font, '中'), GlyphVerdict::Unmapped);
        assert_eq!(resolver.check(&font, ' '), GlyphVerdict::Blank);
    }

    #[test]
    fn test_real_font_soundness() {
        let Some(path) = test_font_path() else {
            return;
        };
        let font = FontHandle::open(&path).unwrap();
        let resolver = GlyphSupportResolver::default();
        let chars = resolver.resolve(&font, &CandidatePool::for_language("en"));
        for ch in chars.into_iter().filter(|c| *c != ' ') {
            let glyph = font.render_glyph(ch, GLYPH_REFERENCE_SIZE).unwrap();
            assert!(glyph.pixels().any(|p| p.0[0] != 255), "{ch:?} is blank");
            assert!(
                ch == '■' || ch == '□' || !resolver.looks_like_box(&glyph),
                "{ch:?} looks like a box"
            );
        }
    }
}
