//! Training Example Extractor
//!
//! Turns one successfully aligned (audio, MIDI) pair into a time-synchronized
//! training example. Every failure is contained at the pair boundary: the
//! caller only ever sees a [`PairOutcome`].

use crate::features::FeatureExtractor;
use crate::midi::MidiScore;
use crate::window::AlignmentWindow;
use anyhow::Context;
use hprep_common::config::ExtractConfig;
use hprep_common::features::{FeatureFile, TrainingExample};
use hprep_common::pairs::{ARRAY_EXT, DIAGNOSTICS_EXT};
use hprep_common::{AlignmentDiagnostics, HprepConfig, PairKey};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error};

/// What happened to one pair
#[derive(Debug, Clone, PartialEq)]
pub enum PairOutcome {
    /// Example written to this path
    Written(PathBuf),
    /// No diagnostics file: the aligner never produced this pair
    MissingDiagnostics,
    /// Alignment too poor to train on
    BelowThreshold { score: f64 },
    /// Aligned MIDI and audio share no usable span
    EmptyWindow,
    /// Processing error, already logged
    Failed,
}

/// Builds training examples from aligned pairs
pub struct Extractor {
    config: ExtractConfig,
    features: Arc<dyn FeatureExtractor>,
}

impl Extractor {
    pub fn new(config: &HprepConfig, features: Arc<dyn FeatureExtractor>) -> Self {
        Self {
            config: config.extract.clone(),
            features,
        }
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// `<diagnostics_dir>/{dataset}_{id}_{hash}.json`
    pub fn diagnostics_path(&self, key: &PairKey) -> PathBuf {
        self.config
            .diagnostics_dir
            .join(key.file_name(DIAGNOSTICS_EXT))
    }

    /// `<pairs_dir>/<split>_pairs.csv`
    pub fn pair_list_path(&self, split: &str) -> PathBuf {
        self.config.pairs_dir.join(format!("{split}_pairs.csv"))
    }

    pub fn output_dir(&self, split: &str) -> PathBuf {
        self.config.output_root.join(split)
    }

    /// `<output_root>/<split>/{dataset}_{id}_{hash}.bin`
    pub fn output_path(&self, split: &str, key: &PairKey) -> PathBuf {
        self.output_dir(split).join(key.file_name(ARRAY_EXT))
    }

    /// Process one pair; errors are logged here and reported as `Failed`
    pub fn process_pair(&self, split: &str, key: &PairKey) -> PairOutcome {
        let diagnostics_path = self.diagnostics_path(key);
        if !diagnostics_path.exists() {
            debug!(pair = %key, "No alignment diagnostics");
            return PairOutcome::MissingDiagnostics;
        }

        let output_path = self.output_path(split, key);
        match self.try_process(&diagnostics_path, &output_path) {
            Ok(outcome) => {
                debug!(pair = %key, outcome = ?outcome, "Pair processed");
                outcome
            }
            Err(e) => {
                error!(
                    diagnostics = %diagnostics_path.display(),
                    "Error creating training example: {:?}",
                    e
                );
                PairOutcome::Failed
            }
        }
    }

    fn try_process(&self, diagnostics_path: &Path, output_path: &Path) -> anyhow::Result<PairOutcome> {
        let diagnostics = AlignmentDiagnostics::load(diagnostics_path)
            .context("Failed to load alignment diagnostics")?;

        if !diagnostics.passes(self.config.score_threshold) {
            return Ok(PairOutcome::BelowThreshold {
                score: diagnostics.score,
            });
        }

        let Some(example) = self.build_example(&diagnostics)? else {
            return Ok(PairOutcome::EmptyWindow);
        };

        example
            .save(output_path)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;
        Ok(PairOutcome::Written(output_path.to_path_buf()))
    }

    /// Load, window and pack both feature matrices of an accepted alignment
    ///
    /// `None` when the window or the trimmed matrices are empty.
    pub fn build_example(
        &self,
        diagnostics: &AlignmentDiagnostics,
    ) -> anyhow::Result<Option<TrainingExample>> {
        let midi_path = &diagnostics.output_midi_filename;
        let score = MidiScore::load(midi_path)
            .with_context(|| format!("Failed to parse MIDI {}", midi_path.display()))?;
        let midi_gram = self
            .features
            .midi_gram(&score)
            .with_context(|| format!("Failed to extract features from {}", midi_path.display()))?;
        let midi_times = self.features.frame_times(midi_gram.nrows());

        let audio_path = &diagnostics.audio_features_filename;
        let audio = FeatureFile::load(audio_path)
            .with_context(|| format!("Failed to load audio features {}", audio_path.display()))?;
        let audio_times = self.features.frame_times(audio.gram.nrows());

        let start = score
            .first_onset()
            .with_context(|| format!("{} contains no notes", midi_path.display()))?;
        let midi_last = midi_times.last().copied().context("MIDI features have no frames")?;
        let audio_last = audio_times.last().copied().context("Audio features have no frames")?;

        let Some(window) = AlignmentWindow::compute(start, score.end_time(), midi_last, audio_last)
        else {
            return Ok(None);
        };

        let (midi_gram, audio_gram) =
            window.trim_pair((&midi_gram, &midi_times[..]), (&audio.gram, &audio_times[..]))?;
        if midi_gram.nrows() == 0 {
            return Ok(None);
        }

        Ok(Some(TrainingExample::new(midi_gram, audio_gram)?))
    }
}
