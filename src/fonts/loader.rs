//! Font file loading.

use crate::core::errors::{SynthError, SynthResult};
use ab_glyph::{Font, FontVec};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Extensions recognised as font files.
const FONT_EXTENSIONS: [&str; 3] = ["ttf", "ttc", "otf"];

/// A parsed font together with the path it was loaded from.
///
/// Collections (`.ttc`) are opened at face index 0.
pub struct FontHandle {
    path: PathBuf,
    font: FontVec,
}

impl std::fmt::Debug for FontHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontHandle").field("path", &self.path).finish()
    }
}

impl FontHandle {
    /// Reads and parses a font file.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::FontLoad`] when the file is missing, unreadable
    /// or not a font.
    pub fn open(path: &Path) -> SynthResult<Self> {
        let data = std::fs::read(path).map_err(|e| SynthError::font_load(path, e.to_string()))?;
        let font = FontVec::try_from_vec_and_index(data, 0)
            .map_err(|e| SynthError::font_load(path, e.to_string()))?;
        debug!("Loaded font {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            font,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn font(&self) -> &FontVec {
        &self.font
    }

    /// Whether the character map declares a glyph for `ch`.
    pub fn has_mapping(&self, ch: char) -> bool {
        self.font.glyph_id(ch).0 != 0
    }
}

/// Process-wide cache of parsed fonts keyed by path.
///
/// Parsing is cheap compared to glyph checks but not free; batch tasks that
/// share a font share one parsed copy.
#[derive(Debug, Default)]
pub struct FontStore {
    fonts: Mutex<HashMap<PathBuf, Arc<FontHandle>>>,
}

impl FontStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached font for `path`, loading it on first use.
    ///
    /// Failed loads are not cached, so a later call retries.
    pub fn get(&self, path: &Path) -> SynthResult<Arc<FontHandle>> {
        if let Some(handle) = self.lock().get(path) {
            return Ok(Arc::clone(handle));
        }
        let handle = Arc::new(FontHandle::open(path)?);
        Ok(Arc::clone(
            self.lock()
                .entry(path.to_path_buf())
                .or_insert(handle),
        ))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Arc<FontHandle>>> {
        // A poisoned map still holds only fully inserted entries.
        self.fonts.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Lists every font file in `dir`, sorted by path.
///
/// # Errors
///
/// Returns an error if the directory cannot be read, or
/// [`SynthError::InvalidInput`] if it holds no font.
pub fn load_fonts(dir: &Path) -> SynthResult<Vec<PathBuf>> {
    let mut fonts = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_font = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| FONT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
        if path.is_file() && is_font {
            fonts.push(path);
        }
    }
    if fonts.is_empty() {
        return Err(SynthError::invalid_input(format!(
            "no font files found in {}",
            dir.display()
        )));
    }
    fonts.sort();
    Ok(fonts)
}
