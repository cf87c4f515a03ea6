//! Parallel batch driver.
//!
//! Every request is generated and written independently on a rayon pool.
//! A failing sample is logged and recorded in the [`BatchReport`]; it never
//! stops the rest of the batch.

use crate::core::errors::SynthResult;
use crate::domain::SampleRequest;
use crate::pipeline::generator::AugmentationPipeline;
use crate::pipeline::output::SampleWriter;
use crate::pipeline::stats::{BatchReport, SampleFailure, WrittenSample};
use itertools::Itertools;
use rayon::prelude::*;
use std::path::PathBuf;
use tracing::{info, warn};

/// Generates and writes every request.
///
/// The batch seed is taken from the configuration, or drawn once from
/// entropy and recorded in the report.
///
/// # Errors
///
/// Only batch-level problems fail: an unbuildable worker pool or an
/// unwritable label or log file. Per-sample failures are reported.
pub fn run_batch(
    pipeline: &AugmentationPipeline,
    writer: &SampleWriter,
    requests: &[SampleRequest],
) -> SynthResult<BatchReport> {
    let config = pipeline.config();
    let seed = config.seed.unwrap_or_else(rand::random);
    info!(
        "Generating {} samples into {} (seed {})",
        requests.len(),
        writer.dir().display(),
        seed
    );
    let pool = config.parallel.build_pool()?;
    let fonts: Vec<PathBuf> = requests.iter().map(|r| r.font.clone()).unique().collect();
    if fonts.len() > config.parallel.font_threshold {
        let ready = pool.install(|| pipeline.warm_profiles(&fonts));
        info!("Glyph profiles ready for {} of {} fonts", ready, fonts.len());
    }

    let process = |request: &SampleRequest| -> Result<WrittenSample, SampleFailure> {
        pipeline
            .generate(request, seed)
            .and_then(|sample| writer.write(&sample))
            .map_err(|e| {
                let failure = SampleFailure::new(request.index, &e);
                warn!(
                    "Skipping sample {} ({}): {}",
                    failure.index, failure.kind, failure.detail
                );
                failure
            })
    };

    let outcomes: Vec<Result<WrittenSample, SampleFailure>> =
        if requests.len() <= config.parallel.sample_threshold {
            requests.iter().map(process).collect()
        } else {
            pool.install(|| requests.par_iter().map(process).collect())
        };

    let mut report = BatchReport::new(seed);
    for outcome in outcomes {
        match outcome {
            Ok(written) => report.written.push(written),
            Err(failure) => report.failures.push(failure),
        }
    }
    report.sort();

    if let Some(path) = writer.write_labels(&report.written)? {
        info!("Wrote labels to {}", path.display());
    }
    writer.write_logs(&report.written)?;
    if let Some(dir) = writer.log_dir() {
        info!("Wrote bookkeeping logs to {}", dir.display());
    }
    info!("{}", report);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{GeneratorConfig, OutputConfig};
    use crate::core::errors::ErrorKind;
    use crate::fonts::{
        CandidatePool, FontStore, GlyphCheckConfig, GlyphProfileRepository, GlyphSupportResolver,
        font_key, test_font_path,
    };
    use crate::pipeline::output::NameFormat;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn pipeline(config: GeneratorConfig) -> AugmentationPipeline {
        let profiles = GlyphProfileRepository::in_memory(
            GlyphSupportResolver::new(GlyphCheckConfig::default()),
            CandidatePool::latin(),
        );
        AugmentationPipeline::new(config, Arc::new(FontStore::new()), Arc::new(profiles)).unwrap()
    }

    fn index_output() -> OutputConfig {
        OutputConfig {
            extension: "png".to_string(),
            name_format: NameFormat::Index,
            prefix: String::new(),
        }
    }

    #[test]
    fn test_missing_font_is_reported_and_batch_continues() {
        let Some(font) = test_font_path() else {
            return;
        };
        let dir = TempDir::new().unwrap();
        let config = GeneratorConfig::default().with_seed(Some(17));
        let pipeline = pipeline(config);
        let writer = SampleWriter::new(dir.path(), index_output()).unwrap();
        let requests = vec![
            SampleRequest::new(0, "first", &font),
            SampleRequest::new(1, "broken", "/nonexistent/font.ttf"),
            SampleRequest::new(2, "third", &font),
        ];

        let report = run_batch(&pipeline, &writer, &requests).unwrap();
        assert_eq!(report.seed, 17);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 1);
        assert_eq!(report.failures[0].kind, ErrorKind::FontLoad);
        assert!(!dir.path().join("1.png").exists());
        assert!(dir.path().join("0.png").exists());

        let labels = std::fs::read_to_string(dir.path().join("labels.txt")).unwrap();
        assert_eq!(labels, "0.png first\n2.png third\n");
    }

    #[test]
    fn test_logs_record_filtered_labels_of_written_samples() {
        let Some(font) = test_font_path() else {
            return;
        };
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(GeneratorConfig::default().with_seed(Some(3)));
        pipeline
            .profiles()
            .get_or_build_with(&font_key(&font), || Ok("AB ".chars().collect()))
            .unwrap();
        let output = OutputConfig {
            name_format: NameFormat::TextIndex,
            ..index_output()
        };
        let writer = SampleWriter::new(dir.path(), output)
            .unwrap()
            .with_log_dir(dir.path().join("logs"));
        let requests = vec![
            SampleRequest::new(0, "AΩB", &font),
            SampleRequest::new(1, "lost", "/nonexistent/font.ttf"),
        ];

        let report = run_batch(&pipeline, &writer, &requests).unwrap();
        assert_eq!(report.succeeded(), 1);
        assert!(dir.path().join("AB_0.png").exists());

        let logs = dir.path().join("logs");
        let src = std::fs::read_to_string(logs.join("src-train.txt")).unwrap();
        assert_eq!(src, "AB_0.png\n");
        let tgt = std::fs::read_to_string(logs.join("tgt-train.txt")).unwrap();
        assert_eq!(tgt, "AB\n");
        let fonts = std::fs::read_to_string(logs.join("tgt-fonts.txt")).unwrap();
        assert_eq!(fonts, format!("{}\n", font.display()));
    }

    #[test]
    fn test_seeded_batches_are_reproducible() {
        let Some(font) = test_font_path() else {
            return;
        };
        let requests: Vec<SampleRequest> = (0..4)
            .map(|i| SampleRequest::new(i, format!("sample {}", i), &font))
            .collect();
        let run = |seed: u64| -> Vec<Vec<u8>> {
            let dir = TempDir::new().unwrap();
            let pipeline = pipeline(GeneratorConfig::default().with_seed(Some(seed)));
            let writer = SampleWriter::new(dir.path(), index_output()).unwrap();
            let report = run_batch(&pipeline, &writer, &requests).unwrap();
            report
                .written
                .iter()
                .map(|w| std::fs::read(&w.path).unwrap())
                .collect()
        };
        let first = run(5);
        assert_eq!(first.len(), 4);
        assert_eq!(first, run(5));
        assert_ne!(first, run(6));
    }

    #[test]
    fn test_all_failures_still_return_report() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(GeneratorConfig::default().with_seed(Some(1)));
        let writer = SampleWriter::new(dir.path(), index_output()).unwrap();
        let requests: Vec<SampleRequest> = (0..3)
            .map(|i| SampleRequest::new(i, "x", "/missing.ttf"))
            .collect();
        let report = run_batch(&pipeline, &writer, &requests).unwrap();
        assert_eq!(report.succeeded(), 0);
        assert_eq!(report.failed(), 3);
        let labels = std::fs::read_to_string(dir.path().join("labels.txt")).unwrap();
        assert!(labels.is_empty());
    }
}
