//! hprep-dm - Dedup Matcher
//!
//! Excludes MIDI files already present in the reference audio corpora and
//! writes candidate MIDI <-> target corpus pairs for the external aligner.

use anyhow::{Context, Result};
use clap::Parser;
use hprep_common::logging::init_tracing;
use hprep_common::HprepConfig;
use hprep_dm::DedupMatcher;
use std::path::PathBuf;
use tracing::info;

/// Command-line arguments for hprep-dm
#[derive(Parser, Debug)]
#[command(name = "hprep-dm")]
#[command(about = "Deduplicate a MIDI catalog against reference corpora and match it to a target corpus")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Candidate pairs output file (overrides configuration)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "HPREP_LOG_LEVEL")]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let log_control = init_tracing("hprep_dm", args.log_level.as_deref());

    let mut config =
        HprepConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    log_control.apply_config(&config.logging);
    if let Some(output) = args.output {
        config.dedup.pairs_output = output;
    }

    info!("Starting hprep-dm (Dedup Matcher)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        "Reference corpora: {} | Target corpus: {}",
        config.dedup.reference_corpora.join(", "),
        config.dedup.target_corpus
    );

    let report = DedupMatcher::new(config)
        .run()
        .context("Dedup matching failed")?;

    info!(
        "Done | Catalog: {} | Excluded: {} | Survivors: {} | Matched: {} | Pairs: {}",
        report.catalog_size,
        report.excluded,
        report.survivors,
        report.matched_entries,
        report.pairs
    );
    Ok(())
}
