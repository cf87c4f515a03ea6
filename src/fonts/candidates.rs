//! Per-script candidate character pools.
//!
//! The glyph support resolver only tests characters from a candidate pool;
//! anything outside the pool never enters a profile.

use crate::core::errors::{SynthError, SynthResult};
use std::collections::HashSet;
use std::path::Path;

/// Latin-1 punctuation and symbols tested in addition to ASCII.
const EXTRA_SYMBOLS: &str = "¡¢£¥§©«®°±²³µ¶·¹º»¿×÷€‘’“”•…※←↑→↓○●◎△▲□■☆★〒";

/// CJK unified ideographs scanned for the `cn` pool.
pub const CJK_RANGE: std::ops::RangeInclusive<u32> = 0x4E00..=0x9FCB;

/// An ordered, duplicate-free list of characters to test.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidatePool {
    chars: Vec<char>,
    seen: HashSet<char>,
}

impl CandidatePool {
    /// Builds a pool from arbitrary characters, dropping duplicates and
    /// whitespace while keeping first-seen order.
    pub fn from_chars(chars: impl IntoIterator<Item = char>) -> Self {
        let mut pool = Self::default();
        pool.extend(chars);
        pool
    }

    /// ASCII letters and digits plus accented Latin-1 letters.
    pub fn latin() -> Self {
        Self::from_chars(
            ('0'..='9')
                .chain('A'..='Z')
                .chain('a'..='z')
                .chain(('\u{C0}'..='\u{FF}').filter(|c| c.is_alphabetic())),
        )
    }

    /// ASCII punctuation and common typographic symbols.
    pub fn symbols() -> Self {
        Self::from_chars(
            ('!'..='~')
                .filter(|c| c.is_ascii_punctuation())
                .chain(EXTRA_SYMBOLS.chars()),
        )
    }

    /// Hiragana, katakana and the prolonged sound mark.
    pub fn japanese() -> Self {
        Self::from_chars(
            ('\u{3041}'..='\u{3096}')
                .chain('\u{30A1}'..='\u{30FA}')
                .chain(['ー', '、', '。', '「', '」', '・']),
        )
    }

    /// CJK unified ideographs.
    pub fn cjk() -> Self {
        Self::from_chars(CJK_RANGE.filter_map(char::from_u32))
    }

    /// Default pool for a language code.
    ///
    /// `ja` adds kana and ideographs, `cn` adds ideographs; every other
    /// code gets the Latin and symbol pools.
    pub fn for_language(language: &str) -> Self {
        let mut pool = Self::latin();
        pool.extend(Self::symbols().chars);
        match language {
            "ja" => {
                pool.extend(Self::japanese().chars);
                pool.extend(Self::cjk().chars);
            }
            "cn" => pool.extend(Self::cjk().chars),
            _ => {}
        }
        pool
    }

    /// Reads one candidate per line (only the first character of each line
    /// counts).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or yields no characters.
    pub fn from_file(path: &Path) -> SynthResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let pool = Self::from_chars(contents.lines().filter_map(|line| line.chars().next()));
        if pool.is_empty() {
            return Err(SynthError::invalid_input(format!(
                "candidate file {} is empty",
                path.display()
            )));
        }
        Ok(pool)
    }

    pub fn extend(&mut self, chars: impl IntoIterator<Item = char>) {
        for ch in chars {
            if !ch.is_whitespace() && self.seen.insert(ch) {
                self.chars.push(ch);
            }
        }
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// Stable FNV-1a digest of the ordered characters.
    ///
    /// Profiles built from different pools differ, so the glyph cache
    /// records the digest of the pool that filled it.
    pub fn fingerprint(&self) -> String {
        let hash = self
            .chars
            .iter()
            .flat_map(|&ch| (ch as u32).to_le_bytes())
            .fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
                (hash ^ byte as u64).wrapping_mul(0x0000_0100_0000_01b3)
            });
        format!("{:016x}", hash)
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }
}
