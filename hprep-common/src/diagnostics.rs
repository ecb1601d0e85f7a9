//! Alignment diagnostics records written by the external aligner

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Outcome of one attempted audio/MIDI alignment
///
/// Only the fields consumed here are modelled; anything else the aligner
/// records is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentDiagnostics {
    /// Normalized alignment score; higher is better
    pub score: f64,
    /// MIDI file re-timed to the audio
    pub output_midi_filename: PathBuf,
    /// Audio feature matrix the alignment ran against
    pub audio_features_filename: PathBuf,
}

impl AlignmentDiagnostics {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read diagnostics {}: {}", path.display(), e),
            ))
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    /// Quality gate: only a score strictly below the threshold is rejected
    pub fn passes(&self, threshold: f64) -> bool {
        !(self.score < threshold)
    }
}
