//! Output naming and writing.

use crate::core::config::OutputConfig;
use crate::core::errors::{SynthError, SynthResult};
use crate::domain::Sample;
use crate::pipeline::stats::WrittenSample;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the index-to-label side file written for [`NameFormat::Index`].
pub const LABELS_FILE: &str = "labels.txt";

/// Byte budget for the text part of a file stem.
///
/// File systems cap names at 255 bytes; the rest covers the index, the
/// extension and a debug stage suffix.
pub const MAX_STEM_TEXT_BYTES: usize = 200;

/// How output files are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NameFormat {
    /// `[TEXT]_[ID].[EXT]`
    #[default]
    TextIndex,
    /// `[ID]_[TEXT].[EXT]`
    IndexText,
    /// `[ID].[EXT]`, with labels in `labels.txt`
    Index,
    /// `[PREFIX]_[ID].[EXT]`
    PrefixIndex,
}

impl NameFormat {
    /// Maps the numeric CLI code (0 to 3, in declaration order).
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(NameFormat::TextIndex),
            1 => Some(NameFormat::IndexText),
            2 => Some(NameFormat::Index),
            3 => Some(NameFormat::PrefixIndex),
            _ => None,
        }
    }

    /// File stem for a sample.
    ///
    /// Path separators in the text become `_`, and the text (or prefix) is
    /// cut to [`MAX_STEM_TEXT_BYTES`] on a character boundary.
    pub fn stem(&self, index: usize, text: &str, prefix: &str) -> String {
        match self {
            NameFormat::TextIndex => format!("{}_{}", sanitize(text), index),
            NameFormat::IndexText => format!("{}_{}", index, sanitize(text)),
            NameFormat::Index => index.to_string(),
            NameFormat::PrefixIndex => format!("{}_{}", sanitize(prefix), index),
        }
    }
}

fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len().min(MAX_STEM_TEXT_BYTES));
    for c in text.chars() {
        let c = match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        };
        if out.len() + c.len_utf8() > MAX_STEM_TEXT_BYTES {
            break;
        }
        out.push(c);
    }
    out
}

/// Writes samples and side files into one output directory.
#[derive(Debug, Clone)]
pub struct SampleWriter {
    dir: PathBuf,
    output: OutputConfig,
    log_dir: Option<PathBuf>,
}

impl SampleWriter {
    /// Creates the writer, creating `dir` if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::IoWrite`] if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>, output: OutputConfig) -> SynthResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| SynthError::io_write(&dir, e))?;
        Ok(Self {
            dir,
            output,
            log_dir: None,
        })
    }

    /// Also write `src-train.txt`, `tgt-train.txt` and `tgt-fonts.txt`
    /// into `dir` after each batch.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }

    fn stem(&self, index: usize, text: &str) -> String {
        self.output.name_format.stem(index, text, &self.output.prefix)
    }

    pub fn file_name(&self, index: usize, text: &str) -> String {
        format!("{}.{}", self.stem(index, text), self.output.extension)
    }

    /// Encodes the sample image (and any debug stages next to it).
    ///
    /// The format follows the configured extension.
    pub fn write(&self, sample: &Sample) -> SynthResult<WrittenSample> {
        let stem = self.stem(sample.index, &sample.label);
        let path = self.dir.join(format!("{}.{}", stem, self.output.extension));
        sample
            .image
            .save(&path)
            .map_err(|e| SynthError::image_write(&path, e))?;

        for (stage, bitmap) in &sample.stages {
            let stage_path = self
                .dir
                .join(format!("{}_{}.{}", stem, stage, self.output.extension));
            bitmap
                .save(&stage_path)
                .map_err(|e| SynthError::image_write(&stage_path, e))?;
        }
        debug!("Wrote {}", path.display());

        Ok(WrittenSample {
            index: sample.index,
            path,
            label: sample.label.clone(),
            font: sample.font.clone(),
        })
    }

    /// Writes `labels.txt` for [`NameFormat::Index`] runs.
    ///
    /// One `"<file> <label>"` line per written sample, in index order.
    /// Returns `None` for other name formats.
    pub fn write_labels(&self, written: &[WrittenSample]) -> SynthResult<Option<PathBuf>> {
        if self.output.name_format != NameFormat::Index {
            return Ok(None);
        }
        let entries = in_index_order(written);
        let lines = entries
            .iter()
            .map(|w| format!("{} {}", written_file_name(w), w.label));
        let path = self.dir.join(LABELS_FILE);
        write_lines(&path, lines)?;
        Ok(Some(path))
    }

    /// Writes the bookkeeping logs for the written samples, when a log
    /// directory is configured.
    ///
    /// Lines are in index order and carry the real file name, the filtered
    /// label and the font; skipped samples are absent.
    pub fn write_logs(&self, written: &[WrittenSample]) -> SynthResult<()> {
        let Some(dir) = &self.log_dir else {
            return Ok(());
        };
        fs::create_dir_all(dir).map_err(|e| SynthError::io_write(dir, e))?;
        let entries = in_index_order(written);
        write_lines(
            &dir.join("src-train.txt"),
            entries.iter().map(|w| written_file_name(w)),
        )?;
        write_lines(
            &dir.join("tgt-train.txt"),
            entries.iter().map(|w| w.label.clone()),
        )?;
        write_lines(
            &dir.join("tgt-fonts.txt"),
            entries.iter().map(|w| w.font.display().to_string()),
        )?;
        Ok(())
    }
}

fn in_index_order(written: &[WrittenSample]) -> Vec<&WrittenSample> {
    let mut entries: Vec<&WrittenSample> = written.iter().collect();
    entries.sort_by_key(|w| w.index);
    entries
}

fn written_file_name(written: &WrittenSample) -> String {
    written
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn write_lines(path: &Path, lines: impl Iterator<Item = String>) -> SynthResult<()> {
    let file = fs::File::create(path).map_err(|e| SynthError::io_write(path, e))?;
    let mut writer = std::io::BufWriter::new(file);
    for line in lines {
        writeln!(writer, "{}", line).map_err(|e| SynthError::io_write(path, e))?;
    }
    writer.flush().map_err(|e| SynthError::io_write(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ErrorKind;
    use crate::domain::{AugmentationRecipe, Bitmap};
    use image::Luma;
    use tempfile::TempDir;

    fn sample(index: usize, label: &str) -> Sample {
        Sample {
            index,
            image: Bitmap::from_pixel(20, 10, Luma([90])),
            label: label.to_string(),
            font: PathBuf::from("f.ttf"),
            recipe: AugmentationRecipe::identity(),
            stages: Vec::new(),
        }
    }

    fn output(name_format: NameFormat) -> OutputConfig {
        OutputConfig {
            extension: "png".to_string(),
            name_format,
            prefix: "train".to_string(),
        }
    }

    #[test]
    fn test_stems() {
        assert_eq!(NameFormat::TextIndex.stem(3, "ab", "p"), "ab_3");
        assert_eq!(NameFormat::IndexText.stem(3, "a/b", "p"), "3_a_b");
        assert_eq!(NameFormat::Index.stem(3, "ab", "p"), "3");
        assert_eq!(NameFormat::PrefixIndex.stem(3, "ab", "p"), "p_3");
        assert_eq!(NameFormat::from_code(2), Some(NameFormat::Index));
        assert_eq!(NameFormat::from_code(4), None);
    }

    #[test]
    fn test_write_and_labels_in_index_order() {
        let dir = TempDir::new().unwrap();
        let writer = SampleWriter::new(dir.path().join("out"), output(NameFormat::Index)).unwrap();
        let b = writer.write(&sample(1, "second")).unwrap();
        let a = writer.write(&sample(0, "first")).unwrap();
        assert!(a.path.exists() && b.path.exists());

        let labels = writer.write_labels(&[b, a]).unwrap().unwrap();
        let contents = fs::read_to_string(labels).unwrap();
        assert_eq!(contents, "0.png first\n1.png second\n");
    }

    #[test]
    fn test_labels_only_for_index_format() {
        let dir = TempDir::new().unwrap();
        let writer = SampleWriter::new(dir.path(), output(NameFormat::TextIndex)).unwrap();
        assert!(writer.write_labels(&[]).unwrap().is_none());
    }

    #[test]
    fn test_debug_stages_are_written() {
        let dir = TempDir::new().unwrap();
        let writer = SampleWriter::new(dir.path(), output(NameFormat::PrefixIndex)).unwrap();
        let mut sample = sample(4, "x");
        sample.stages.push(("text", Bitmap::from_pixel(5, 5, Luma([0]))));
        writer.write(&sample).unwrap();
        assert!(dir.path().join("train_4.png").exists());
        assert!(dir.path().join("train_4_text.png").exists());
    }

    #[test]
    fn test_unknown_extension_is_io_write_error() {
        let dir = TempDir::new().unwrap();
        let mut config = output(NameFormat::Index);
        config.extension = "nope".to_string();
        let writer = SampleWriter::new(dir.path(), config).unwrap();
        let err = writer.write(&sample(0, "x")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoWrite);
    }

    #[test]
    fn test_logs_follow_written_samples() {
        let dir = TempDir::new().unwrap();
        let writer = SampleWriter::new(dir.path(), output(NameFormat::TextIndex))
            .unwrap()
            .with_log_dir(dir.path().join("logs"));
        let mut second = sample(2, "yo");
        second.font = PathBuf::from("b.ttf");
        let b = writer.write(&second).unwrap();
        let a = writer.write(&sample(0, "hi")).unwrap();
        writer.write_logs(&[b, a]).unwrap();

        let src = fs::read_to_string(dir.path().join("logs/src-train.txt")).unwrap();
        assert_eq!(src, "hi_0.png\nyo_2.png\n");
        let tgt = fs::read_to_string(dir.path().join("logs/tgt-train.txt")).unwrap();
        assert_eq!(tgt, "hi\nyo\n");
        let fonts = fs::read_to_string(dir.path().join("logs/tgt-fonts.txt")).unwrap();
        assert_eq!(fonts, "f.ttf\nb.ttf\n");
    }

    #[test]
    fn test_no_logs_without_log_dir() {
        let dir = TempDir::new().unwrap();
        let writer = SampleWriter::new(dir.path(), output(NameFormat::Index)).unwrap();
        assert!(writer.log_dir().is_none());
        writer.write_logs(&[]).unwrap();
        assert!(!dir.path().join("src-train.txt").exists());
    }

    #[test]
    fn test_long_labels_fit_file_name_limit() {
        let label = "長".repeat(80);
        let stem = NameFormat::TextIndex.stem(123_456, &label, "");
        assert!(stem.len() <= MAX_STEM_TEXT_BYTES + "_123456".len());
        assert!(stem.ends_with("_123456"));
        assert!(stem.starts_with("長長"));

        let dir = TempDir::new().unwrap();
        let writer = SampleWriter::new(dir.path(), output(NameFormat::IndexText)).unwrap();
        let mut long = sample(7, &label);
        long.stages.push(("photometric", Bitmap::from_pixel(4, 4, Luma([0]))));
        let written = writer.write(&long).unwrap();
        assert!(written.path.exists());
        assert_eq!(written.label, label);
        let name = written_file_name(&written);
        assert!(name.len() <= 255);
    }
}
