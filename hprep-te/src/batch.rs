//! Batch driver
//!
//! Runs the extractor over every pair of a split with a bounded number of
//! concurrent workers. Extraction is CPU and file bound, so each pair runs
//! on the blocking pool.

use crate::extractor::{Extractor, PairOutcome};
use futures::stream::{self, StreamExt};
use hprep_common::pairs::read_split_pairs;
use hprep_common::{Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Per-split outcome counts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitReport {
    pub split: String,
    pub total: usize,
    pub written: usize,
    pub missing: usize,
    pub below_threshold: usize,
    pub empty_window: usize,
    pub failed: usize,
}

impl SplitReport {
    fn new(split: &str, total: usize) -> Self {
        Self {
            split: split.to_string(),
            total,
            ..Default::default()
        }
    }

    fn record(&mut self, outcome: &PairOutcome) {
        match outcome {
            PairOutcome::Written(_) => self.written += 1,
            PairOutcome::MissingDiagnostics => self.missing += 1,
            PairOutcome::BelowThreshold { .. } => self.below_threshold += 1,
            PairOutcome::EmptyWindow => self.empty_window += 1,
            PairOutcome::Failed => self.failed += 1,
        }
    }

    /// Pairs that were looked at but produced no example
    pub fn skipped(&self) -> usize {
        self.missing + self.below_threshold + self.empty_window
    }
}

/// Process every pair listed for `split`
///
/// Only an unreadable pair list or an uncreatable output directory is an
/// error; individual pairs never abort the split.
pub async fn run_split(extractor: Arc<Extractor>, split: &str) -> Result<SplitReport> {
    let output_dir = extractor.output_dir(split);
    tokio::fs::create_dir_all(&output_dir).await.map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to create {}: {}", output_dir.display(), e),
        ))
    })?;

    let pair_list = extractor.pair_list_path(split);
    let pairs = read_split_pairs(&pair_list)?;
    let total = pairs.len();
    let workers = extractor.config().workers.max(1);

    tracing::info!(
        split,
        pairs = total,
        workers,
        pair_list = %pair_list.display(),
        "Starting split"
    );

    let processed = Arc::new(AtomicUsize::new(0));

    let outcomes: Vec<PairOutcome> = stream::iter(pairs)
        .map(|key| {
            let extractor = extractor.clone();
            let processed = processed.clone();
            let split = split.to_string();

            async move {
                let worker_key = key.clone();
                let joined = tokio::task::spawn_blocking(move || {
                    extractor.process_pair(&split, &worker_key)
                })
                .await;

                let outcome = match joined {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::error!(pair = %key, error = %e, "Worker aborted while processing pair");
                        PairOutcome::Failed
                    }
                };

                let current = processed.fetch_add(1, Ordering::Relaxed) + 1;
                if current % 10 == 0 || current == total {
                    tracing::info!(
                        progress = format!("{}/{}", current, total),
                        "Extraction progress"
                    );
                }

                outcome
            }
        })
        .buffer_unordered(workers)
        .collect()
        .await;

    let mut report = SplitReport::new(split, total);
    for outcome in &outcomes {
        report.record(outcome);
    }

    tracing::info!(
        split,
        total = report.total,
        written = report.written,
        missing = report.missing,
        below_threshold = report.below_threshold,
        empty_window = report.empty_window,
        failed = report.failed,
        "Split complete"
    );
    Ok(report)
}

/// Run every configured split in order
pub async fn run_all(extractor: Arc<Extractor>) -> Result<Vec<SplitReport>> {
    let splits = extractor.config().splits.clone();
    let mut reports = Vec::with_capacity(splits.len());
    for split in &splits {
        reports.push(run_split(extractor.clone(), split).await?);
    }
    Ok(reports)
}
