//! # OAR Synth
//!
//! A synthetic text-line image generator for training OCR recognition models.
//! Each sample is a grayscale image of a short string drawn with a TrueType
//! font and pushed through a randomized chain of degradations, paired with
//! its ground-truth label.
//!
//! ## Features
//!
//! - Glyph-aware rendering: characters a font cannot draw are detected once
//!   per font and filtered out of the label
//! - Five text layout modes (normal, dual size, per-character jitter, tight
//!   kerning, random spacing)
//! - Geometric degradations: rotation, pixel-shift distortion, affine,
//!   elastic and perspective warps, shear, aspect jitter
//! - Photometric degradations: erosion, pixel masks, blur family,
//!   sharpening, inversion, speckle noise
//! - Procedural and photographic backgrounds
//! - Reproducible batches: every sample draws from its own seeded RNG
//!
//! ## Modules
//!
//! * [`core`] - Configuration, constants and error handling
//! * [`corpus`] - Sources of sample text
//! * [`domain`] - Requests, recipes and other plain data types
//! * [`fonts`] - Font loading and glyph support profiles
//! * [`pipeline`] - The augmentation pipeline and the batch driver
//! * [`processors`] - Individual image stages
//! * [`utils`] - Image helpers, geometric transforms and logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use oar_synth::prelude::*;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GeneratorConfig::default().with_height(32).with_seed(Some(7));
//! let profiles = GlyphProfileRepository::in_memory(
//!     GlyphSupportResolver::new(config.glyphs.clone()),
//!     CandidatePool::for_language("en"),
//! );
//! let pipeline = AugmentationPipeline::new(
//!     config.clone(),
//!     Arc::new(FontStore::new()),
//!     Arc::new(profiles),
//! )?;
//!
//! let fonts = load_fonts(Path::new("fonts/en"))?;
//! let requests = vec![
//!     SampleRequest::new(0, "hello world", &fonts[0]),
//!     SampleRequest::new(1, "synthetic data", &fonts[0]),
//! ];
//! let writer = SampleWriter::new("out", config.output.clone())?;
//! let report = run_batch(&pipeline, &writer, &requests)?;
//! println!("{}", report);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod corpus;
pub mod domain;
pub mod fonts;
pub mod pipeline;
pub mod processors;
pub mod utils;

/// Prelude module for convenient imports.
///
/// ```rust
/// use oar_synth::prelude::*;
/// ```
///
/// Covers the types needed to configure a pipeline and run a batch. Stage
/// level APIs live in [`processors`](crate::processors).
pub mod prelude {
    pub use crate::core::{GeneratorConfig, OutputConfig, RecipeWeights, SynthError, SynthResult};
    pub use crate::domain::{Sample, SampleRequest};
    pub use crate::fonts::{
        CandidatePool, FontStore, GlyphProfileRepository, GlyphSupportResolver, load_fonts,
    };
    pub use crate::pipeline::{
        AugmentationPipeline, BatchReport, NameFormat, SampleWriter, run_batch,
    };
}
