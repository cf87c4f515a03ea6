//! Configuration error types and validation traits.

use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A probability was outside `[0, 1]` or not finite.
    #[error("probability '{field}' must be within [0, 1], got {value}")]
    InvalidProbability { field: String, value: f64 },

    /// A `(low, high)` range was inverted or not finite.
    #[error("range '{field}' is invalid: [{low}, {high}]")]
    InvalidRange { field: String, low: f64, high: f64 },

    /// A weighted choice table cannot be sampled.
    #[error("weight table '{field}' is invalid: {message}")]
    InvalidWeights { field: String, message: String },

    /// A configured path does not exist.
    #[error("path does not exist: {path}")]
    PathNotFound { path: std::path::PathBuf },

    /// Error indicating that a configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// A trait for validating configuration parameters.
///
/// Implemented by every configuration struct so that a config loaded from
/// JSON or assembled from CLI flags is checked once, before any sample is
/// generated.
pub trait ConfigValidator {
    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError>;

    /// Returns the default configuration.
    fn get_defaults() -> Self
    where
        Self: Sized;

    /// Validates that `value` is a probability.
    fn validate_probability(&self, field: &str, value: f64) -> Result<(), ConfigError> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(())
        } else {
            Err(ConfigError::InvalidProbability {
                field: field.to_string(),
                value,
            })
        }
    }

    /// Validates that `(low, high)` is a finite, non-inverted range.
    fn validate_range(
        &self,
        field: &str,
        (low, high): (f32, f32),
        min: f32,
    ) -> Result<(), ConfigError> {
        if low.is_finite() && high.is_finite() && low >= min && low <= high {
            Ok(())
        } else {
            Err(ConfigError::InvalidRange {
                field: field.to_string(),
                low: low as f64,
                high: high as f64,
            })
        }
    }

    /// Validates an inclusive integer range.
    fn validate_int_range(&self, field: &str, (low, high): (u32, u32)) -> Result<(), ConfigError> {
        if low <= high {
            Ok(())
        } else {
            Err(ConfigError::InvalidRange {
                field: field.to_string(),
                low: low as f64,
                high: high as f64,
            })
        }
    }

    /// Validates that a path exists.
    fn validate_path_exists(&self, path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            Ok(())
        } else {
            Err(ConfigError::PathNotFound {
                path: path.to_path_buf(),
            })
        }
    }
}
