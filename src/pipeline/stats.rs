//! Batch-wide outcome reporting.
//!
//! This module defines the [`BatchReport`] returned by a batch run: which
//! samples were written and, for every skipped sample, its index, error
//! kind and detail.

use crate::core::errors::{ErrorKind, SynthError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// One sample that made it to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenSample {
    pub index: usize,
    /// Image path.
    pub path: PathBuf,
    /// The label actually drawn.
    pub label: String,
    pub font: PathBuf,
}

/// One skipped sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleFailure {
    pub index: usize,
    pub kind: ErrorKind,
    pub detail: String,
}

impl SampleFailure {
    pub fn new(index: usize, error: &SynthError) -> Self {
        Self {
            index,
            kind: error.kind(),
            detail: error.detail(),
        }
    }
}

/// Outcome of a batch run.
///
/// Entries arrive in completion order; [`BatchReport::sort`] restores index
/// order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// The batch seed, so the run can be reproduced.
    pub seed: u64,
    pub written: Vec<WrittenSample>,
    pub failures: Vec<SampleFailure>,
}

impl BatchReport {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    pub fn succeeded(&self) -> usize {
        self.written.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn total(&self) -> usize {
        self.succeeded() + self.failed()
    }

    /// Returns the success rate as a percentage (0.0 to 100.0).
    pub fn success_rate(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            (self.succeeded() as f64 / self.total() as f64) * 100.0
        }
    }

    /// Number of failures per error kind.
    pub fn failure_counts(&self) -> BTreeMap<ErrorKind, usize> {
        let mut counts = BTreeMap::new();
        for failure in &self.failures {
            *counts.entry(failure.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Orders both lists by sample index.
    pub fn sort(&mut self) {
        self.written.sort_by_key(|w| w.index);
        self.failures.sort_by_key(|f| f.index);
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Batch summary (seed {}):", self.seed)?;
        writeln!(
            f,
            "  Written: {} of {} ({:.1}%)",
            self.succeeded(),
            self.total(),
            self.success_rate()
        )?;
        for (kind, count) in self.failure_counts() {
            writeln!(f, "  Skipped ({}): {}", kind, count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_rate_handles_empty_batch() {
        assert_eq!(BatchReport::default().success_rate(), 0.0);
    }

    #[test]
    fn counts_and_sorting() {
        let mut report = BatchReport::new(7);
        report.written.push(WrittenSample {
            index: 2,
            path: PathBuf::from("b.jpg"),
            label: "b".to_string(),
            font: PathBuf::from("f.ttf"),
        });
        report.written.push(WrittenSample {
            index: 0,
            path: PathBuf::from("a.jpg"),
            label: "a".to_string(),
            font: PathBuf::from("f.ttf"),
        });
        report
            .failures
            .push(SampleFailure::new(1, &SynthError::render("empty")));
        report
            .failures
            .push(SampleFailure::new(3, &SynthError::font_load("x.ttf", "missing")));

        report.sort();
        assert_eq!(report.written[0].index, 0);
        assert_eq!(report.total(), 4);
        assert_eq!(report.success_rate(), 50.0);
        assert_eq!(report.failure_counts().get(&ErrorKind::FontLoad), Some(&1));

        let text = report.to_string();
        assert!(text.contains("Written: 2 of 4"));
        assert!(text.contains("Skipped (render): 1"));
    }
}
