//! Text rasterization.
//!
//! The rasterizer lays a string out as a sequence of glyph placements, then
//! draws them on a white canvas sized from the measured layout. Every mode
//! reduces to the same placement model: each character gets a pixel size,
//! a foreground value, an advance multiplier and a trailing gap.
//!
//! All runs share one baseline, so mixed sizes line up along the bottom of
//! their x-height the way mixed-size typesetting does.

use crate::core::config::{GeneratorConfig, WeightedTable};
use crate::core::constants::{BACKGROUND_VALUE, RANDOM_DARK_RANGE, RANDOM_DARK_TIGHT_MAX};
use crate::core::errors::{SynthError, SynthResult};
use crate::core::validation::ensure_non_empty;
use crate::domain::{Bitmap, TextColor, TextMode, TextSpec};
use crate::fonts::FontHandle;
use ab_glyph::{Font, GlyphId, ScaleFont, point};
use image::Luma;
use rand::Rng;
use tracing::debug;

/// Size and spacing tunables of the layout modes.
#[derive(Debug, Clone)]
pub struct LayoutTuning {
    pub split_scale_range: (f32, f32),
    pub jitter_scale_range: (f32, f32),
    pub jitter_big_probability: f64,
    pub tight_advance_range: (f32, f32),
    pub extra_spacing: WeightedTable<u32>,
}

impl LayoutTuning {
    pub fn from_config(config: &GeneratorConfig) -> Self {
        let w = &config.weights;
        Self {
            split_scale_range: w.split_scale_range,
            jitter_scale_range: w.jitter_scale_range,
            jitter_big_probability: w.jitter_big_probability,
            tight_advance_range: w.tight_advance_range,
            extra_spacing: w.extra_spacing.clone(),
        }
    }
}

impl Default for LayoutTuning {
    fn default() -> Self {
        Self::from_config(&GeneratorConfig::default())
    }
}

/// One character to place.
#[derive(Debug, Clone, Copy)]
struct GlyphSlot {
    ch: char,
    size: f32,
    color: u8,
    advance_factor: f32,
    gap: f32,
}

/// One placed glyph, relative to the pen origin.
#[derive(Debug, Clone, Copy)]
struct Placement {
    id: GlyphId,
    size: f32,
    color: u8,
    x: f32,
}

/// Renders text lines into grayscale bitmaps.
#[derive(Debug, Clone)]
pub struct TextRasterizer {
    margin: u32,
    tuning: LayoutTuning,
}

impl TextRasterizer {
    /// Creates a rasterizer with the given margin (pixels on every side).
    pub fn new(margin: u32, tuning: LayoutTuning) -> Self {
        Self { margin, tuning }
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new(config.margin, LayoutTuning::from_config(config))
    }

    pub fn margin(&self) -> u32 {
        self.margin
    }

    /// Renders `spec.text` with `font`.
    ///
    /// # Arguments
    ///
    /// * `spec` - Text, layout mode and nominal height in pixels.
    /// * `font` - The font to draw with.
    /// * `color` - Fixed foreground value, or random dark per drawn run.
    /// * `rng` - Source of the per-mode random choices.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::Render`] for empty text or a zero-area canvas.
    pub fn render<R: Rng + ?Sized>(
        &self,
        spec: &TextSpec,
        font: &FontHandle,
        color: TextColor,
        rng: &mut R,
    ) -> SynthResult<Bitmap> {
        let chars: Vec<char> = spec.text.chars().collect();
        if chars.is_empty() {
            return Err(SynthError::render("nothing to rasterize: text is empty"));
        }
        if spec.height == 0 {
            return Err(SynthError::render("nominal height is zero"));
        }

        let slots = self.plan(&chars, spec.mode, spec.height as f32, color, rng)?;
        let bitmap = self.draw(font, &slots);
        ensure_non_empty(&bitmap, "rasterize")?;
        debug!(
            "Rasterized {} chars ({:?}) into {}x{}",
            chars.len(),
            spec.mode,
            bitmap.width(),
            bitmap.height()
        );
        Ok(bitmap)
    }

    /// Assigns size, color, advance factor and gap to every character.
    fn plan<R: Rng + ?Sized>(
        &self,
        chars: &[char],
        mode: TextMode,
        nominal: f32,
        color: TextColor,
        rng: &mut R,
    ) -> SynthResult<Vec<GlyphSlot>> {
        let slot = |ch, size, color| GlyphSlot {
            ch,
            size,
            color,
            advance_factor: 1.0,
            gap: 0.0,
        };

        let slots = match mode {
            TextMode::Normal => {
                let c = pick_color(color, RANDOM_DARK_RANGE.1, rng);
                chars.iter().map(|&ch| slot(ch, nominal, c)).collect()
            }
            TextMode::TightKerning => {
                let (low, high) = self.tuning.tight_advance_range;
                let factor = rng.gen_range(low..=high);
                let c = pick_color(color, RANDOM_DARK_TIGHT_MAX, rng);
                chars
                    .iter()
                    .map(|&ch| GlyphSlot {
                        advance_factor: factor,
                        ..slot(ch, nominal, c)
                    })
                    .collect()
            }
            TextMode::SplitDualSize => {
                let (low, high) = self.tuning.split_scale_range;
                let big = nominal * rng.gen_range(low..=high);
                let big_first = !rng.gen_bool(0.5);
                let cuts = split_points(chars.len(), rng);
                let mut slots = Vec::with_capacity(chars.len());
                let mut start = 0;
                for (run, end) in cuts.into_iter().enumerate() {
                    let size = if (run % 2 == 0) == big_first {
                        big
                    } else {
                        nominal
                    };
                    let c = pick_color(color, RANDOM_DARK_RANGE.1, rng);
                    slots.extend(chars[start..end].iter().map(|&ch| slot(ch, size, c)));
                    start = end;
                }
                slots
            }
            TextMode::PerCharacterJitteredSize => {
                let (low, high) = self.tuning.jitter_scale_range;
                chars
                    .iter()
                    .map(|&ch| {
                        let size = if rng.gen_bool(self.tuning.jitter_big_probability) {
                            nominal * rng.gen_range(low..=high)
                        } else {
                            nominal
                        };
                        slot(ch, size, pick_color(color, RANDOM_DARK_RANGE.1, rng))
                    })
                    .collect()
            }
            TextMode::RandomExtraSpacing => {
                let c = pick_color(color, RANDOM_DARK_RANGE.1, rng);
                let mut slots = Vec::with_capacity(chars.len());
                for &ch in chars {
                    let gap = self.tuning.extra_spacing.sample("extra_spacing", rng)?;
                    slots.push(GlyphSlot {
                        gap: gap as f32,
                        ..slot(ch, nominal, c)
                    });
                }
                slots
            }
        };
        Ok(slots)
    }

    /// Lays out and draws the slots on a canvas fitted to the layout.
    fn draw(&self, font: &FontHandle, slots: &[GlyphSlot]) -> Bitmap {
        let font = font.font();
        let mut placements = Vec::with_capacity(slots.len());
        let mut pen = 0.0f32;
        let mut previous: Option<(GlyphId, f32)> = None;
        let mut ascent = 0.0f32;
        let mut descent = 0.0f32;

        for slot in slots {
            let scaled = font.as_scaled(slot.size);
            let id = font.glyph_id(slot.ch);
            if let Some((prev_id, prev_size)) = previous
                && prev_size == slot.size
            {
                pen += scaled.kern(prev_id, id) * slot.advance_factor;
            }
            placements.push(Placement {
                id,
                size: slot.size,
                color: slot.color,
                x: pen,
            });
            pen += scaled.h_advance(id) * slot.advance_factor + slot.gap;
            ascent = ascent.max(scaled.ascent());
            descent = descent.max(-scaled.descent());
            previous = Some((id, slot.size));
        }

        // Ink may overhang the advance box on either side.
        let mut left = 0.0f32;
        let mut right = pen;
        let outlines: Vec<_> = placements
            .iter()
            .map(|p| {
                let glyph = p.id.with_scale_and_position(p.size, point(p.x, ascent));
                let outline = font.outline_glyph(glyph);
                if let Some(outline) = &outline {
                    let bounds = outline.px_bounds();
                    left = left.min(bounds.min.x);
                    right = right.max(bounds.max.x);
                }
                (p.color, outline)
            })
            .collect();

        let margin = self.margin as f32;
        let origin_x = margin - left;
        let width = (right - left + 2.0 * margin).ceil().max(0.0) as u32;
        let height = (ascent + descent + 2.0 * margin).ceil().max(0.0) as u32;
        let mut canvas = Bitmap::from_pixel(width, height, Luma([BACKGROUND_VALUE]));

        for (color, outline) in outlines {
            let Some(outline) = outline else {
                continue;
            };
            let bounds = outline.px_bounds();
            let base_x = (bounds.min.x + origin_x).floor() as i64;
            let base_y = (bounds.min.y + margin).floor() as i64;
            outline.draw(|x, y, coverage| {
                let px = base_x + x as i64;
                let py = base_y + y as i64;
                if px < 0 || py < 0 || px >= width as i64 || py >= height as i64 {
                    return;
                }
                let coverage = coverage.clamp(0.0, 1.0);
                let value = (color as f32 * coverage + BACKGROUND_VALUE as f32 * (1.0 - coverage))
                    .round() as u8;
                let pixel = canvas.get_pixel_mut(px as u32, py as u32);
                pixel.0[0] = pixel.0[0].min(value);
            });
        }
        canvas
    }
}

fn pick_color<R: Rng + ?Sized>(color: TextColor, dark_max: u8, rng: &mut R) -> u8 {
    match color {
        TextColor::Fixed(value) => value,
        TextColor::RandomDark => rng.gen_range(RANDOM_DARK_RANGE.0..=dark_max),
    }
}

/// Exclusive end indices of the runs of a dual-size split.
///
/// Two runs split at the midpoint, or, for texts of six characters or more
/// with probability 1/3, three runs at two random cut points.
fn split_points<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Vec<usize> {
    if len < 6 || rng.gen_bool(2.0 / 3.0) {
        return vec![len / 2, len];
    }
    let first = rng.gen_range(1..=len - 3);
    let second = rng.gen_range(first + 1..=len);
    vec![first, second, len]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ErrorKind;
    use crate::fonts::test_font_path;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn font() -> Option<FontHandle> {
        test_font_path().map(|p| FontHandle::open(&p).unwrap())
    }

    fn render(font: &FontHandle, text: &str, mode: TextMode, seed: u64) -> Bitmap {
        TextRasterizer::new(2, LayoutTuning::default())
            .render(
                &TextSpec::new(text, mode, 32),
                font,
                TextColor::Fixed(0),
                &mut StdRng::seed_from_u64(seed),
            )
            .unwrap()
    }

    #[test]
    fn test_split_points_cover_text() {
        let mut rng = StdRng::seed_from_u64(0);
        for len in 1..20 {
            for _ in 0..20 {
                let cuts = split_points(len, &mut rng);
                assert_eq!(*cuts.last().unwrap(), len);
                assert!(cuts.windows(2).all(|w| w[0] <= w[1]));
                assert!(cuts.len() == 2 || len >= 6);
            }
        }
    }

    #[test]
    fn test_pick_color_ranges() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let c = pick_color(TextColor::RandomDark, RANDOM_DARK_TIGHT_MAX, &mut rng);
            assert!((1..=80).contains(&c));
        }
        assert_eq!(pick_color(TextColor::Fixed(7), 50, &mut rng), 7);
    }

    #[test]
    fn test_empty_text_is_render_error() {
        let Some(font) = font() else {
            return;
        };
        let err = TextRasterizer::new(2, LayoutTuning::default())
            .render(
                &TextSpec::new("", TextMode::Normal, 32),
                &font,
                TextColor::RandomDark,
                &mut StdRng::seed_from_u64(0),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Render);
    }

    #[test]
    fn test_hello_normal_metrics() {
        let Some(font) = font() else {
            return;
        };
        let bitmap = render(&font, "HELLO", TextMode::Normal, 0);

        let scaled = font.font().as_scaled(32.0);
        let advances: f32 = "HELLO"
            .chars()
            .map(|c| scaled.h_advance(font.font().glyph_id(c)))
            .sum();
        let expected_width = advances + 4.0;
        assert!((bitmap.width() as f32 - expected_width).abs() <= 4.0);
        assert!((bitmap.height() as i64 - 36).abs() <= 4);
        assert!(bitmap.pixels().any(|p| p.0[0] < 128));
        assert_eq!(bitmap.pixels().map(|p| p.0[0]).min(), Some(0));
    }

    #[test]
    fn test_tight_never_wider_than_normal() {
        let Some(font) = font() else {
            return;
        };
        for (seed, text) in ["HELLO", "Wavy text", "jump, quickly!"].iter().enumerate() {
            let normal = render(&font, text, TextMode::Normal, seed as u64);
            let tight = render(&font, text, TextMode::TightKerning, seed as u64);
            assert!(tight.width() <= normal.width(), "{text}");
        }
    }

    #[test]
    fn test_split_mode_is_taller() {
        let Some(font) = font() else {
            return;
        };
        let mut tuning = LayoutTuning::default();
        tuning.split_scale_range = (1.5, 1.5);
        let rasterizer = TextRasterizer::new(0, tuning);
        let spec = TextSpec::new("abcdefgh", TextMode::SplitDualSize, 32);
        let split = rasterizer
            .render(&spec, &font, TextColor::Fixed(0), &mut StdRng::seed_from_u64(3))
            .unwrap();
        let normal = rasterizer
            .render(
                &TextSpec::new("abcdefgh", TextMode::Normal, 32),
                &font,
                TextColor::Fixed(0),
                &mut StdRng::seed_from_u64(3),
            )
            .unwrap();
        assert!(split.height() > normal.height());
    }

    #[test]
    fn test_extra_spacing_never_narrower() {
        let Some(font) = font() else {
            return;
        };
        let normal = render(&font, "spacing", TextMode::Normal, 9);
        let spaced = render(&font, "spacing", TextMode::RandomExtraSpacing, 9);
        assert!(spaced.width() >= normal.width());
    }

    #[test]
    fn test_same_seed_same_bitmap() {
        let Some(font) = font() else {
            return;
        };
        for mode in TextMode::ALL {
            assert_eq!(
                render(&font, "Repeat 42", mode, 5),
                render(&font, "Repeat 42", mode, 5)
            );
        }
    }
}
