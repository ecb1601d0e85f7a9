//! hprep-te - Training Example Extractor
//!
//! Builds time-synchronized MIDI/audio feature pairs from successful
//! alignments, one output directory per data split.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hprep_common::logging::init_tracing;
use hprep_common::HprepConfig;
use hprep_te::{run_all, valid_matches, Extractor, PianoRollExtractor};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Command-line arguments for hprep-te
#[derive(Parser, Debug)]
#[command(name = "hprep-te")]
#[command(about = "Create hash-training examples from aligned audio/MIDI pairs")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "HPREP_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write training examples for each split
    Extract {
        /// Split to process (repeatable; default: configured splits)
        #[arg(long = "split")]
        splits: Vec<String>,

        /// Concurrent workers
        #[arg(short, long, env = "HPREP_WORKERS")]
        workers: Option<usize>,

        /// Root directory for training examples
        #[arg(long)]
        output_root: Option<PathBuf>,
    },

    /// Print MIDI -> corpus ids whose alignment scored above a threshold
    ValidMatches {
        /// Pair list (midi_hash,dataset,pair_id)
        #[arg(long)]
        pairs: PathBuf,

        /// Dataset to report
        #[arg(long, default_value = "msd")]
        dataset: String,

        /// Score threshold (default: configured score_threshold)
        #[arg(long)]
        threshold: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_control = init_tracing("hprep_te", args.log_level.as_deref());

    let mut config =
        HprepConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    log_control.apply_config(&config.logging);

    match args.command {
        Command::Extract {
            splits,
            workers,
            output_root,
        } => {
            if !splits.is_empty() {
                config.extract.splits = splits;
            }
            if let Some(workers) = workers {
                config.extract.workers = workers;
            }
            if let Some(output_root) = output_root {
                config.extract.output_root = output_root;
            }
            config.validate().context("Invalid command-line overrides")?;

            info!("Starting hprep-te (Training Example Extractor)");
            info!("Version: {}", env!("CARGO_PKG_VERSION"));
            info!(
                "Splits: {} | Workers: {} | Score threshold: {}",
                config.extract.splits.join(", "),
                config.extract.workers,
                config.extract.score_threshold
            );

            let features = Arc::new(PianoRollExtractor::new(config.features.clone()));
            let extractor = Arc::new(Extractor::new(&config, features));
            let reports = run_all(extractor).await.context("Extraction failed")?;

            for report in &reports {
                info!(
                    "Split {} | Pairs: {} | Written: {} | Skipped: {} | Failed: {}",
                    report.split,
                    report.total,
                    report.written,
                    report.skipped(),
                    report.failed
                );
            }
        }
        Command::ValidMatches {
            pairs,
            dataset,
            threshold,
        } => {
            let threshold = threshold.unwrap_or(config.extract.score_threshold);
            let matches = valid_matches(&pairs, &dataset, threshold, &config.extract.diagnostics_dir)
                .with_context(|| format!("Failed to read matches from {}", pairs.display()))?;
            println!("{}", serde_json::to_string_pretty(&matches)?);
        }
    }

    Ok(())
}
