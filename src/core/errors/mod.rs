//! Error types for the sample generator.
//!
//! Every failure raised while producing one sample is a [`SynthError`]. The
//! batch runner catches it at the sample boundary, records its [`ErrorKind`]
//! in the batch report and moves on to the next task.
//!
//! # Usage
//!
//! ```rust
//! use oar_synth::core::errors::{ErrorKind, SynthError};
//!
//! let error = SynthError::font_load("fonts/missing.ttf", "no such file");
//! assert_eq!(error.kind(), ErrorKind::FontLoad);
//!
//! let error = SynthError::transform("affine", "reference points are collinear");
//! assert_eq!(error.kind(), ErrorKind::Transform);
//! ```

pub mod constructors;
pub mod types;

pub use types::{ErrorKind, SynthError};

/// Convenient result alias for generator operations.
pub type SynthResult<T> = Result<T, SynthError>;
