//! Configuration loading and resolution
//!
//! Configuration is resolved once at startup and then frozen into an
//! [`HprepConfig`] that every component receives at construction.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line `--config` argument
//! 2. `HPREP_CONFIG` environment variable
//! 3. `<config dir>/hprep/config.toml` (platform config directory)
//! 4. Built-in defaults (code constants)
//!
//! A file named explicitly by (1) or (2) must exist and parse. A missing
//! file at (3) only produces a warning; built-in defaults are used.

use crate::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming a configuration file
pub const CONFIG_ENV_VAR: &str = "HPREP_CONFIG";

/// Reference corpora the MIDI collection is deduplicated against by default
pub const DEFAULT_REFERENCE_CORPORA: [&str; 3] = ["uspop2002", "cal10k", "cal500"];

/// Corpus the surviving MIDI files are matched against by default
pub const DEFAULT_TARGET_CORPUS: &str = "msd";

/// Alignments scoring below this are considered unreliable
pub const DEFAULT_SCORE_THRESHOLD: f64 = 0.5;

/// Splits processed by the extractor by default
pub const DEFAULT_SPLITS: [&str; 2] = ["train", "validation"];

/// Fully resolved, immutable run configuration
#[derive(Debug, Clone, PartialEq)]
pub struct HprepConfig {
    /// Corpus name -> metadata index location
    pub corpora: BTreeMap<String, PathBuf>,
    pub dedup: DedupConfig,
    pub search: SearchConfig,
    pub extract: ExtractConfig,
    pub features: FeatureConfig,
    pub logging: LoggingConfig,
}

/// Dedup Matcher settings
#[derive(Debug, Clone, PartialEq)]
pub struct DedupConfig {
    /// JSON catalog of MIDI entries
    pub catalog: PathBuf,
    /// Corpora whose matches exclude a MIDI entry
    pub reference_corpora: Vec<String>,
    /// Corpus producing candidate pairs
    pub target_corpus: String,
    /// Candidate pairs output file
    pub pairs_output: PathBuf,
}

/// Training Example Extractor settings
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractConfig {
    /// Minimum alignment score (inclusive) for a pair to be used
    pub score_threshold: f64,
    /// Where the aligner wrote `{dataset}_{id}_{md5}.json` diagnostics
    pub diagnostics_dir: PathBuf,
    /// Directory holding `<split>_pairs.csv` files
    pub pairs_dir: PathBuf,
    /// Examples are written under `<output_root>/<split>/`
    pub output_root: PathBuf,
    pub splits: Vec<String>,
    /// Number of items processed concurrently
    pub workers: usize,
}

/// Fuzzy query tuning for the corpus metadata index
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum hits returned per query
    pub limit: usize,
    /// Maximum edit distance between a query term and an indexed term
    pub max_edits: usize,
    /// Leading characters that must match exactly
    pub prefix_length: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: 10,
            max_edits: 1,
            prefix_length: 1,
        }
    }
}

/// Frame geometry shared by MIDI-derived and audio feature matrices
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub sample_rate: u32,
    pub hop_length: u32,
    /// MIDI note number of the lowest feature bin
    pub note_start: u8,
    /// Number of semitone bins
    pub n_bins: usize,
    /// Longest score, in seconds, that will be rendered to frames
    pub max_duration_secs: u32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            hop_length: 1024,
            note_start: 36,
            n_bins: 48,
            max_duration_secs: 3600,
        }
    }
}

impl FeatureConfig {
    /// Seconds between consecutive frames
    pub fn frame_period(&self) -> f64 {
        self.hop_length as f64 / self.sample_rate as f64
    }

    /// Frames covering `max_duration_secs`
    pub fn max_frames(&self) -> usize {
        (self.max_duration_secs as f64 / self.frame_period()).floor() as usize + 1
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// On-disk TOML layout; every field is optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub data_root: Option<PathBuf>,
    #[serde(default)]
    pub results_root: Option<PathBuf>,
    #[serde(default)]
    pub corpora: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub dedup: TomlDedup,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub extract: TomlExtract,
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlDedup {
    pub catalog: Option<PathBuf>,
    pub reference_corpora: Option<Vec<String>>,
    pub target_corpus: Option<String>,
    pub pairs_output: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlExtract {
    pub score_threshold: Option<f64>,
    pub diagnostics_dir: Option<PathBuf>,
    pub pairs_dir: Option<PathBuf>,
    pub output_root: Option<PathBuf>,
    pub splits: Option<Vec<String>>,
    pub workers: Option<usize>,
}

/// Where the configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Named on the command line or in the environment; must load
    Explicit(PathBuf),
    /// Found in the platform config directory
    Discovered(PathBuf),
    /// No file; built-in defaults
    Defaults,
}

/// Resolve which configuration file to read, following the priority order
pub fn resolve_config_source(cli_arg: Option<&Path>) -> ConfigSource {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return ConfigSource::Explicit(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return ConfigSource::Explicit(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    if let Some(path) = dirs::config_dir().map(|d| d.join("hprep").join("config.toml")) {
        if path.exists() {
            return ConfigSource::Discovered(path);
        }
    }

    ConfigSource::Defaults
}

impl HprepConfig {
    /// Resolve, read and validate the run configuration
    pub fn load(cli_arg: Option<&Path>) -> Result<Self> {
        let source = resolve_config_source(cli_arg);
        let toml_config = match &source {
            ConfigSource::Explicit(path) => read_toml_config(path)?,
            ConfigSource::Discovered(path) => match read_toml_config(path) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Ignoring unreadable config {}: {}", path.display(), e);
                    TomlConfig::default()
                }
            },
            ConfigSource::Defaults => {
                warn!("No configuration file found, using built-in defaults");
                TomlConfig::default()
            }
        };

        let config = Self::from_toml(toml_config);
        config.validate()?;

        match source {
            ConfigSource::Explicit(path) | ConfigSource::Discovered(path) => {
                info!("Configuration loaded from {}", path.display())
            }
            ConfigSource::Defaults => {}
        }
        Ok(config)
    }

    /// Fill every unset field from built-in defaults
    pub fn from_toml(toml_config: TomlConfig) -> Self {
        let data_root = toml_config
            .data_root
            .unwrap_or_else(|| PathBuf::from("data"));
        let results_root = toml_config
            .results_root
            .unwrap_or_else(|| PathBuf::from("results"));

        let mut corpora = toml_config.corpora;
        for name in DEFAULT_REFERENCE_CORPORA
            .iter()
            .chain(std::iter::once(&DEFAULT_TARGET_CORPUS))
        {
            corpora
                .entry(name.to_string())
                .or_insert_with(|| data_root.join(name).join("index"));
        }

        let dedup = toml_config.dedup;
        let extract = toml_config.extract;

        Self {
            corpora,
            dedup: DedupConfig {
                catalog: dedup
                    .catalog
                    .unwrap_or_else(|| data_root.join("clean_midi").join("index.js")),
                reference_corpora: dedup.reference_corpora.unwrap_or_else(|| {
                    DEFAULT_REFERENCE_CORPORA.iter().map(|s| s.to_string()).collect()
                }),
                target_corpus: dedup
                    .target_corpus
                    .unwrap_or_else(|| DEFAULT_TARGET_CORPUS.to_string()),
                pairs_output: dedup
                    .pairs_output
                    .unwrap_or_else(|| PathBuf::from("file_lists").join("test_pairs.csv")),
            },
            search: toml_config.search,
            extract: ExtractConfig {
                score_threshold: extract.score_threshold.unwrap_or(DEFAULT_SCORE_THRESHOLD),
                diagnostics_dir: extract
                    .diagnostics_dir
                    .unwrap_or_else(|| results_root.join("clean_midi_aligned")),
                pairs_dir: extract.pairs_dir.unwrap_or_else(|| results_root.clone()),
                output_root: extract
                    .output_root
                    .unwrap_or_else(|| results_root.join("training_dataset")),
                splits: extract
                    .splits
                    .unwrap_or_else(|| DEFAULT_SPLITS.iter().map(|s| s.to_string()).collect()),
                workers: extract.workers.unwrap_or(10),
            },
            features: toml_config.features,
            logging: toml_config.logging,
        }
    }

    /// Reject values no pipeline can run with
    pub fn validate(&self) -> Result<()> {
        if !self.extract.score_threshold.is_finite() {
            return Err(Error::Config(format!(
                "score_threshold must be finite, got {}",
                self.extract.score_threshold
            )));
        }
        if self.extract.workers == 0 {
            return Err(Error::Config("workers must be at least 1".to_string()));
        }
        if self.features.sample_rate == 0 || self.features.hop_length == 0 {
            return Err(Error::Config(
                "sample_rate and hop_length must be positive".to_string(),
            ));
        }
        if self.features.n_bins == 0 {
            return Err(Error::Config("n_bins must be at least 1".to_string()));
        }
        if self.features.max_duration_secs == 0 {
            return Err(Error::Config("max_duration_secs must be positive".to_string()));
        }
        if self.search.limit == 0 {
            return Err(Error::Config("search limit must be at least 1".to_string()));
        }
        for name in self
            .dedup
            .reference_corpora
            .iter()
            .chain(std::iter::once(&self.dedup.target_corpus))
        {
            self.corpus_index_path(name)?;
        }
        Ok(())
    }

    /// Index location for a named corpus
    pub fn corpus_index_path(&self, name: &str) -> Result<&Path> {
        self.corpora
            .get(name)
            .map(PathBuf::as_path)
            .ok_or_else(|| Error::Config(format!("No index path configured for corpus '{}'", name)))
    }
}

/// Read and parse a TOML configuration file
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_data_and_results_roots() {
        let config = HprepConfig::from_toml(TomlConfig {
            data_root: Some(PathBuf::from("/srv/data")),
            results_root: Some(PathBuf::from("/srv/results")),
            ..Default::default()
        });

        assert_eq!(config.corpora["msd"], PathBuf::from("/srv/data/msd/index"));
        assert_eq!(config.corpora["cal500"], PathBuf::from("/srv/data/cal500/index"));
        assert_eq!(
            config.dedup.catalog,
            PathBuf::from("/srv/data/clean_midi/index.js")
        );
        assert_eq!(
            config.extract.diagnostics_dir,
            PathBuf::from("/srv/results/clean_midi_aligned")
        );
        assert_eq!(
            config.extract.output_root,
            PathBuf::from("/srv/results/training_dataset")
        );
        assert_eq!(config.extract.splits, vec!["train", "validation"]);
        assert_eq!(config.extract.workers, 10);
        assert_eq!(config.extract.score_threshold, 0.5);
    }

    #[test]
    fn explicit_corpus_paths_win_over_defaults() {
        let raw: TomlConfig = toml::from_str(
            r#"
            [corpora]
            msd = "/indexes/msd"
            "#,
        )
        .unwrap();
        let config = HprepConfig::from_toml(raw);

        assert_eq!(config.corpora["msd"], PathBuf::from("/indexes/msd"));
        assert_eq!(config.corpora["uspop2002"], PathBuf::from("data/uspop2002/index"));
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let mut config = HprepConfig::from_toml(TomlConfig::default());
        config.extract.workers = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn validate_rejects_unknown_target_corpus() {
        let mut config = HprepConfig::from_toml(TomlConfig::default());
        config.dedup.target_corpus = "nowhere".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn frame_period_uses_hop_and_rate() {
        let features = FeatureConfig {
            sample_rate: 1000,
            hop_length: 100,
            ..Default::default()
        };
        assert!((features.frame_period() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn max_frames_covers_max_duration() {
        let features = FeatureConfig {
            sample_rate: 1024,
            hop_length: 128,
            max_duration_secs: 10,
            ..Default::default()
        };
        assert_eq!(features.max_frames(), 81);

        let mut config = HprepConfig::from_toml(TomlConfig::default());
        config.features.max_duration_secs = 0;
        assert!(config.validate().is_err());
    }
}
