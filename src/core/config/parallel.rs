//! Worker pool configuration.

use super::errors::{ConfigError, ConfigValidator};
use serde::{Deserialize, Serialize};

/// Configuration for parallel sample generation.
///
/// Sample generation is embarrassingly parallel: tasks share nothing but the
/// read-only glyph profile cache, so the only knobs are the pool size and
/// the thresholds below which work stays on the calling thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallelPolicy {
    /// Maximum number of worker threads.
    /// If None, rayon will use the default thread pool size (typically number of CPU cores).
    #[serde(default)]
    pub max_threads: Option<usize>,

    /// Number of samples at or below which the batch runs sequentially.
    /// Default: 1
    #[serde(default = "ParallelPolicy::default_sample_threshold")]
    pub sample_threshold: usize,

    /// Number of distinct fonts above which glyph profiles are built up
    /// front on the pool instead of lazily by the first sample that needs them.
    /// Default: 1
    #[serde(default = "ParallelPolicy::default_font_threshold")]
    pub font_threshold: usize,
}

impl ParallelPolicy {
    /// Create a new ParallelPolicy with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of threads.
    pub fn with_max_threads(mut self, max_threads: Option<usize>) -> Self {
        self.max_threads = max_threads;
        self
    }

    /// Set the sequential sample threshold.
    pub fn with_sample_threshold(mut self, threshold: usize) -> Self {
        self.sample_threshold = threshold;
        self
    }

    /// Set the sequential font threshold.
    pub fn with_font_threshold(mut self, threshold: usize) -> Self {
        self.font_threshold = threshold;
        self
    }

    /// Builds a dedicated rayon pool honoring `max_threads`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created.
    pub fn build_pool(&self) -> Result<rayon::ThreadPool, ConfigError> {
        let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("synth-{}", i));
        if let Some(threads) = self.max_threads {
            builder = builder.num_threads(threads);
        }
        builder.build().map_err(|e| ConfigError::InvalidConfig {
            message: format!("failed to build worker pool: {}", e),
        })
    }

    fn default_sample_threshold() -> usize {
        1
    }

    fn default_font_threshold() -> usize {
        1
    }
}

impl Default for ParallelPolicy {
    fn default() -> Self {
        Self {
            max_threads: None,
            sample_threshold: Self::default_sample_threshold(),
            font_threshold: Self::default_font_threshold(),
        }
    }
}

impl ConfigValidator for ParallelPolicy {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_threads == Some(0) {
            return Err(ConfigError::InvalidConfig {
                message: "max_threads must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}
