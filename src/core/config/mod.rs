//! Configuration types for the generator.
//!
//! This module provides the serde-backed configuration structs, the weighted
//! choice tables used to sample augmentation recipes, and the validation
//! trait every configuration implements.

pub mod errors;
pub mod generator;
pub mod parallel;
pub mod weights;

pub use errors::{ConfigError, ConfigValidator};
pub use generator::{GeneratorConfig, OutputConfig, RecipeWeights};
pub use parallel::ParallelPolicy;
pub use weights::{WeightedEntry, WeightedTable};
