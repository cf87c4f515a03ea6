//! Ergonomic helpers for building [`SynthError`] values.

use super::types::SynthError;
use std::path::Path;

impl SynthError {
    /// Creates a font loading error.
    ///
    /// # Arguments
    ///
    /// * `path` - The font path that failed to load.
    /// * `message` - What went wrong.
    pub fn font_load(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::FontLoad {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// Creates a render error for degenerate rasterization results.
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
        }
    }

    /// Creates a transform error.
    ///
    /// # Arguments
    ///
    /// * `operation` - Name of the transform (e.g. `"affine"`).
    /// * `message` - Why the transform could not be applied.
    pub fn transform(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Transform {
            operation,
            message: message.into(),
        }
    }

    /// Creates an output write error.
    pub fn io_write(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::IoWrite {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Creates an image encoding error for the given output path.
    pub fn image_write(path: impl AsRef<Path>, source: image::ImageError) -> Self {
        match source {
            image::ImageError::IoError(source) => Self::io_write(path, source),
            source => Self::ImageWrite {
                path: path.as_ref().to_path_buf(),
                source,
            },
        }
    }

    /// Creates an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Renders the error together with its source chain on one line.
    ///
    /// Used when a failure is flattened into a batch report entry.
    pub fn detail(&self) -> String {
        use std::error::Error;

        let mut message = self.to_string();
        let mut source = self.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }
}
