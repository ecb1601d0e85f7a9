//! Alignment window
//!
//! The span of time covered by the aligned MIDI, both feature matrices and
//! the score itself. Frames outside it are dropped before an example is
//! written.

use hprep_common::{Error, Result};
use ndarray::{Array2, Axis};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentWindow {
    pub start: f64,
    pub end: f64,
}

impl AlignmentWindow {
    /// Window from the first onset to the earliest of the three end times
    ///
    /// `None` when nothing remains (`end <= start`, or any bound is NaN).
    pub fn compute(
        score_start: f64,
        midi_end: f64,
        midi_last_frame: f64,
        audio_last_frame: f64,
    ) -> Option<Self> {
        let end = midi_end.min(midi_last_frame).min(audio_last_frame);
        if end > score_start {
            Some(Self {
                start: score_start,
                end,
            })
        } else {
            None
        }
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time <= self.end
    }

    /// Indices of frames whose time falls inside the window, both ends inclusive
    pub fn frame_indices(&self, times: &[f64]) -> Vec<usize> {
        times
            .iter()
            .enumerate()
            .filter(|&(_, &t)| self.contains(t))
            .map(|(i, _)| i)
            .collect()
    }

    /// Rows of `gram` inside the window; `times` gives each row's time
    pub fn trim(&self, gram: &Array2<f64>, times: &[f64]) -> Result<Array2<f64>> {
        if gram.nrows() != times.len() {
            return Err(Error::ShapeMismatch(format!(
                "{} frames but {} frame times",
                gram.nrows(),
                times.len()
            )));
        }
        Ok(gram.select(Axis(0), &self.frame_indices(times)))
    }

    /// Trim both matrices and cut them to a common frame count
    ///
    /// When the two grids disagree at the window edges, trailing frames of
    /// the longer matrix are dropped.
    pub fn trim_pair(
        &self,
        midi: (&Array2<f64>, &[f64]),
        audio: (&Array2<f64>, &[f64]),
    ) -> Result<(Array2<f64>, Array2<f64>)> {
        let midi = self.trim(midi.0, midi.1)?;
        let audio = self.trim(audio.0, audio.1)?;

        let n = midi.nrows().min(audio.nrows());
        if midi.nrows() != audio.nrows() {
            tracing::debug!(
                midi_frames = midi.nrows(),
                audio_frames = audio.nrows(),
                kept = n,
                "Trimmed frame counts differ"
            );
        }
        Ok((
            midi.slice_axis(Axis(0), (..n).into()).to_owned(),
            audio.slice_axis(Axis(0), (..n).into()).to_owned(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(start: f64, step: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| start + i as f64 * step).collect()
    }

    #[test]
    fn end_is_earliest_bound() {
        let window = AlignmentWindow::compute(2.0, 50.0, 49.9, 48.0).unwrap();
        assert_eq!(window, AlignmentWindow { start: 2.0, end: 48.0 });

        let window = AlignmentWindow::compute(1.0, 10.0, 30.0, 40.0).unwrap();
        assert_eq!(window.end, 10.0);
    }

    #[test]
    fn empty_window_is_none() {
        assert_eq!(AlignmentWindow::compute(5.0, 5.0, 10.0, 10.0), None);
        assert_eq!(AlignmentWindow::compute(5.0, 10.0, 10.0, 3.0), None);
        assert_eq!(AlignmentWindow::compute(f64::NAN, 10.0, 10.0, 10.0), None);
    }

    #[test]
    fn both_edges_are_inclusive() {
        let window = AlignmentWindow { start: 0.5, end: 1.5 };
        let times = grid(0.0, 0.25, 8);
        assert_eq!(window.frame_indices(&times), vec![2, 3, 4, 5, 6]);
    }

    #[test]
    fn trim_keeps_columns_and_selects_rows() {
        let gram = Array2::from_shape_fn((8, 3), |(r, c)| (r * 10 + c) as f64);
        let window = AlignmentWindow { start: 0.5, end: 1.0 };

        let trimmed = window.trim(&gram, &grid(0.0, 0.25, 8)).unwrap();

        assert_eq!(trimmed.dim(), (3, 3));
        assert_eq!(trimmed[[0, 0]], 20.0);
        assert_eq!(trimmed[[2, 2]], 42.0);
    }

    #[test]
    fn trim_rejects_mismatched_times() {
        let gram = Array2::<f64>::zeros((4, 2));
        let window = AlignmentWindow { start: 0.0, end: 1.0 };
        assert!(matches!(
            window.trim(&gram, &[0.0, 0.5]),
            Err(Error::ShapeMismatch(_))
        ));
    }

    #[test]
    fn differing_grids_yield_equal_frame_counts() {
        // 500 MIDI frames over [0, 50) and 480 audio frames over [2, 48]
        let midi_times = grid(0.0, 0.1, 500);
        let audio_times = grid(2.0, 46.0 / 479.0, 480);
        let midi = Array2::<f64>::ones((500, 4));
        let audio = Array2::<f64>::ones((480, 4));

        let window = AlignmentWindow::compute(
            2.0,
            50.0,
            midi_times[499],
            audio_times[479],
        )
        .unwrap();
        assert!((window.end - 48.0).abs() < 1e-9);

        let (midi, audio) = window
            .trim_pair((&midi, &midi_times[..]), (&audio, &audio_times[..]))
            .unwrap();

        assert_eq!(midi.nrows(), audio.nrows());
        assert!(midi.nrows() > 400);
        assert_eq!(midi.ncols(), 4);
    }
}
