//! The core module of the generator.
//!
//! This module contains the fundamental components shared by every stage:
//! - Configuration management and weighted choice tables
//! - Constants used throughout the pipeline
//! - Error handling
//! - Stage-output validation
//!
//! It also provides re-exports of commonly used types for convenience.

pub mod config;
pub mod constants;
pub mod errors;
pub mod validation;

pub use config::{
    ConfigError, ConfigValidator, GeneratorConfig, OutputConfig, ParallelPolicy, RecipeWeights,
    WeightedTable,
};
pub use constants::*;
pub use errors::{ErrorKind, SynthError, SynthResult};
pub use validation::ensure_non_empty;
