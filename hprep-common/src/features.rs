//! Feature matrix and training example files
//!
//! Matrices are `ndarray` arrays encoded with `bincode`. Rows are time
//! frames, columns are feature channels; training examples carry an extra
//! leading channel axis of size 1.

use crate::{Error, Result};
use ndarray::{Array2, Array3, Axis};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Audio feature matrix as stored by the feature extraction stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureFile {
    /// frames x channels
    pub gram: Array2<f64>,
}

impl FeatureFile {
    pub fn load(path: &Path) -> Result<Self> {
        let file: Self = read_bincode(path)?;
        if file.gram.nrows() == 0 {
            return Err(Error::Features(format!(
                "{} contains no frames",
                path.display()
            )));
        }
        Ok(file)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_bincode(path, self)
    }
}

/// Time-synchronized (X, Y) pair for supervising the hashing model
///
/// Both arrays are `1 x frames x channels`, single precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    /// MIDI-derived features
    #[serde(rename = "X")]
    pub x: Array3<f32>,
    /// Audio-derived features
    #[serde(rename = "Y")]
    pub y: Array3<f32>,
}

impl TrainingExample {
    /// Add the channel axis, downcast, and check both share a time axis
    pub fn new(midi_gram: Array2<f64>, audio_gram: Array2<f64>) -> Result<Self> {
        if midi_gram.nrows() != audio_gram.nrows() {
            return Err(Error::ShapeMismatch(format!(
                "MIDI features have {} frames, audio features have {}",
                midi_gram.nrows(),
                audio_gram.nrows()
            )));
        }

        Ok(Self {
            x: midi_gram.mapv(|v| v as f32).insert_axis(Axis(0)),
            y: audio_gram.mapv(|v| v as f32).insert_axis(Axis(0)),
        })
    }

    /// Number of time frames shared by X and Y
    pub fn n_frames(&self) -> usize {
        self.x.len_of(Axis(1))
    }

    pub fn load(path: &Path) -> Result<Self> {
        read_bincode(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_bincode(path, self)
    }
}

fn read_bincode<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to open {}: {}", path.display(), e),
        ))
    })?;
    Ok(bincode::deserialize_from(BufReader::new(file))?)
}

/// Encode into a uniquely named sibling temporary file, then rename over the target
///
/// Concurrent writers of the same target never share a temporary file; the
/// last rename wins.
fn write_bincode<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::Builder::new()
        .prefix(".partial-")
        .tempfile_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        bincode::serialize_into(&mut writer, value)?;
        writer.flush()?;
    }

    tmp.persist(path).map_err(|e| {
        Error::Io(std::io::Error::new(
            e.error.kind(),
            format!("Failed to write {}: {}", path.display(), e.error),
        ))
    })?;
    Ok(())
}
