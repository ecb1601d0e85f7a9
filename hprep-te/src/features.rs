//! MIDI feature extraction
//!
//! The extractor never renders audio itself; it asks a [`FeatureExtractor`]
//! for a time-frequency matrix of the aligned MIDI and for the frame time
//! grid shared by that matrix and the stored audio matrix.

use crate::midi::MidiScore;
use hprep_common::config::FeatureConfig;
use hprep_common::{Error, Result};
use ndarray::Array2;

/// Produces the MIDI-side matrix and the frame time grid
pub trait FeatureExtractor: Send + Sync {
    /// Matrix of shape (frames, bins) for the score
    fn midi_gram(&self, score: &MidiScore) -> Result<Array2<f64>>;

    /// Start time in seconds of each of `n_frames` frames
    fn frame_times(&self, n_frames: usize) -> Vec<f64>;
}

/// Velocity-weighted piano roll on the configured frame grid
///
/// One bin per semitone starting at `note_start`; frame `i` sits at
/// `i * hop_length / sample_rate` seconds.
#[derive(Debug, Clone)]
pub struct PianoRollExtractor {
    params: FeatureConfig,
}

impl PianoRollExtractor {
    pub fn new(params: FeatureConfig) -> Self {
        Self { params }
    }

    fn bin(&self, pitch: u8) -> Option<usize> {
        let offset = pitch.checked_sub(self.params.note_start)? as usize;
        (offset < self.params.n_bins).then_some(offset)
    }
}

impl FeatureExtractor for PianoRollExtractor {
    fn midi_gram(&self, score: &MidiScore) -> Result<Array2<f64>> {
        let period = self.params.frame_period();
        let end = score.end_time();
        if !(end > 0.0) || !end.is_finite() {
            return Err(Error::Features(format!(
                "cannot render score with end time {end}"
            )));
        }

        let max_frames = self.params.max_frames();
        let frames = (end / period).floor();
        if frames >= max_frames as f64 {
            return Err(Error::Features(format!(
                "score lasts {end:.1} s, longer than the {} s limit",
                self.params.max_duration_secs
            )));
        }
        let n_frames = frames as usize + 1;
        let cells = n_frames.checked_mul(self.params.n_bins);
        if cells.and_then(|c| c.checked_mul(std::mem::size_of::<f64>())).is_none() {
            return Err(Error::Features(format!(
                "{n_frames} x {} feature matrix is too large",
                self.params.n_bins
            )));
        }
        let mut gram = Array2::<f64>::zeros((n_frames, self.params.n_bins));

        for note in score.notes() {
            let Some(bin) = self.bin(note.pitch) else {
                continue;
            };
            let first = (note.start / period).ceil() as usize;
            let stop = ((note.end / period).ceil() as usize).min(n_frames);
            let level = note.velocity as f64 / 127.0;
            for frame in first..stop {
                let cell = &mut gram[[frame, bin]];
                *cell = cell.max(level);
            }
        }

        Ok(gram)
    }

    fn frame_times(&self, n_frames: usize) -> Vec<f64> {
        let period = self.params.frame_period();
        (0..n_frames).map(|i| i as f64 * period).collect()
    }
}
