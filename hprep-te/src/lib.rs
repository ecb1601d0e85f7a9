//! hprep-te library interface
//!
//! Training Example Extractor: turns successfully aligned audio/MIDI pairs
//! into time-synchronized (X, Y) feature matrices for hash model training.

pub mod batch;
pub mod extractor;
pub mod features;
pub mod matches;
pub mod midi;
pub mod window;

pub use batch::{run_all, run_split, SplitReport};
pub use extractor::{Extractor, PairOutcome};
pub use features::{FeatureExtractor, PianoRollExtractor};
pub use matches::valid_matches;
pub use midi::{MidiScore, Note};
pub use window::AlignmentWindow;
