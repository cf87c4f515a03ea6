//! Error enum and error-kind taxonomy.

use crate::core::config::ConfigError;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a failure, used for batch reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ErrorKind {
    /// Font file missing, unreadable or not a font.
    FontLoad,
    /// Rasterization produced a degenerate (zero-area) bitmap.
    Render,
    /// A geometric solve or resample was numerically degenerate.
    Transform,
    /// An output file could not be written.
    IoWrite,
    /// A caller handed in something unusable.
    InvalidInput,
    /// Configuration failed validation.
    Config,
    /// Any other I/O problem (cache files, corpus files).
    Io,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::FontLoad => "font load",
            ErrorKind::Render => "render",
            ErrorKind::Transform => "transform",
            ErrorKind::IoWrite => "io write",
            ErrorKind::InvalidInput => "invalid input",
            ErrorKind::Config => "configuration",
            ErrorKind::Io => "io",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while generating samples.
#[derive(Error, Debug)]
pub enum SynthError {
    /// The font file could not be opened or parsed.
    #[error("failed to load font {path}: {message}")]
    FontLoad {
        /// Path of the font that failed to load.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// Rasterization or a stage produced a zero-area image.
    #[error("render failed: {message}")]
    Render {
        /// A message describing the degenerate result.
        message: String,
    },

    /// A geometric transform could not be solved or applied.
    #[error("{operation} transform failed: {message}")]
    Transform {
        /// The transform that failed (affine, elastic, perspective, ...).
        operation: &'static str,
        /// A message describing the failure.
        message: String,
    },

    /// Writing an output file failed.
    #[error("failed to write {path}")]
    IoWrite {
        /// Destination path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Encoding an output image failed.
    #[error("failed to encode image {path}")]
    ImageWrite {
        /// Destination path.
        path: PathBuf,
        /// The underlying image error.
        #[source]
        source: image::ImageError,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The persisted glyph cache could not be (de)serialized.
    #[error("glyph cache format")]
    CacheFormat(#[from] serde_json::Error),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

impl SynthError {
    /// Returns the coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SynthError::FontLoad { .. } => ErrorKind::FontLoad,
            SynthError::Render { .. } => ErrorKind::Render,
            SynthError::Transform { .. } => ErrorKind::Transform,
            SynthError::IoWrite { .. } | SynthError::ImageWrite { .. } => ErrorKind::IoWrite,
            SynthError::InvalidInput { .. } => ErrorKind::InvalidInput,
            SynthError::Config(_) => ErrorKind::Config,
            SynthError::CacheFormat(_) | SynthError::Io(_) => ErrorKind::Io,
        }
    }
}
