//! Sample generation pipeline.
//!
//! - [`generator`]: the per-sample augmentation pipeline
//! - [`batch`]: parallel fan-out over a list of requests
//! - [`output`]: file naming, image writing and side files
//! - [`stats`]: the batch report

pub mod batch;
pub mod generator;
pub mod output;
pub mod stats;

pub use batch::run_batch;
pub use generator::AugmentationPipeline;
pub use output::{LABELS_FILE, NameFormat, SampleWriter};
pub use stats::{BatchReport, SampleFailure, WrittenSample};
