//! Pair keys and pair-list file formats
//!
//! Two distinct plain-text schemas are in play:
//! - Candidate pairs written by the dedup matcher: `midi_id,corpus_id`
//! - Split pair lists read by the extractor: `midi_hash,dataset,pair_id`
//!
//! The extractor addresses every artifact of a pair by the stem
//! `{dataset}_{pair_id}_{midi_hash}`, which joins diagnostics files to
//! training example files.

use crate::{Error, Result};
use std::fmt;
use std::path::Path;

/// Extension of alignment diagnostics files
pub const DIAGNOSTICS_EXT: &str = "json";

/// Extension of feature matrix and training example files
pub const ARRAY_EXT: &str = "bin";

/// Identity of one aligned audio/MIDI pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    pub dataset: String,
    pub pair_id: String,
    pub midi_hash: String,
}

impl PairKey {
    pub fn new(
        dataset: impl Into<String>,
        pair_id: impl Into<String>,
        midi_hash: impl Into<String>,
    ) -> Self {
        Self {
            dataset: dataset.into(),
            pair_id: pair_id.into(),
            midi_hash: midi_hash.into(),
        }
    }

    /// Parse one split pair-list line
    ///
    /// On disk the columns are `(midi_hash, dataset, pair_id)`; they are
    /// permuted into `(dataset, pair_id, midi_hash)`.
    pub fn from_split_line(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.trim().split(',').map(str::trim).collect();
        match fields.as_slice() {
            [midi_hash, dataset, pair_id]
                if !midi_hash.is_empty() && !dataset.is_empty() && !pair_id.is_empty() =>
            {
                Ok(Self::new(*dataset, *pair_id, *midi_hash))
            }
            _ => Err(Error::InvalidInput(format!(
                "Expected 'midi_hash,dataset,pair_id', got '{}'",
                line.trim()
            ))),
        }
    }

    /// `{dataset}_{pair_id}_{midi_hash}`
    pub fn file_stem(&self) -> String {
        format!("{}_{}_{}", self.dataset, self.pair_id, self.midi_hash)
    }

    pub fn file_name(&self, ext: &str) -> String {
        format!("{}.{}", self.file_stem(), ext)
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_stem())
    }
}

/// Read every pair of a split pair-list file
///
/// Blank lines are skipped. A malformed line fails the whole read.
pub fn read_split_pairs(path: &Path) -> Result<Vec<PairKey>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to read pair list {}: {}", path.display(), e),
        ))
    })?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            PairKey::from_split_line(line).map_err(|e| {
                Error::InvalidInput(format!("{} line {}: {}", path.display(), n + 1, e))
            })
        })
        .collect()
}

/// Tentative MIDI <-> corpus entry association
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidatePair {
    pub midi_id: String,
    pub corpus_id: String,
}

impl CandidatePair {
    pub fn new(midi_id: impl Into<String>, corpus_id: impl Into<String>) -> Self {
        Self {
            midi_id: midi_id.into(),
            corpus_id: corpus_id.into(),
        }
    }
}

/// Write candidate pairs as `midi_id,corpus_id` lines
///
/// No header and no trailing newline. Parent directories are created.
pub fn write_candidate_pairs(path: &Path, pairs: &[CandidatePair]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let body = pairs
        .iter()
        .map(|p| format!("{},{}", p.midi_id, p.corpus_id))
        .collect::<Vec<_>>()
        .join("\n");
    std::fs::write(path, body)?;
    Ok(())
}

/// Read a candidate pairs file
pub fn read_candidate_pairs(path: &Path) -> Result<Vec<CandidatePair>> {
    let content = std::fs::read_to_string(path)?;
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| match line.trim().split_once(',') {
            Some((midi, corpus)) if !midi.is_empty() && !corpus.is_empty() => {
                Ok(CandidatePair::new(midi, corpus))
            }
            _ => Err(Error::InvalidInput(format!(
                "Expected 'midi_id,corpus_id', got '{}'",
                line.trim()
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn split_line_columns_are_permuted() {
        let key = PairKey::from_split_line("m1,trainset,7").unwrap();
        assert_eq!(key, PairKey::new("trainset", "7", "m1"));
        assert_eq!(key.file_name(DIAGNOSTICS_EXT), "trainset_7_m1.json");
        assert_ne!(key.file_name(DIAGNOSTICS_EXT), "m1_trainset_7.json");
    }

    #[test]
    fn split_line_tolerates_line_endings() {
        let key = PairKey::from_split_line("abc123,msd,TRAAAGR128F425B14B\r\n").unwrap();
        assert_eq!(key.file_stem(), "msd_TRAAAGR128F425B14B_abc123");
    }

    #[test]
    fn split_line_rejects_wrong_arity() {
        assert!(PairKey::from_split_line("abc,msd").is_err());
        assert!(PairKey::from_split_line("abc,msd,1,extra").is_err());
        assert!(PairKey::from_split_line("abc,,1").is_err());
    }

    #[test]
    fn read_split_pairs_skips_blank_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("train_pairs.csv");
        std::fs::write(&path, "h1,msd,A\n\nh2,cal500,B\n").unwrap();

        let pairs = read_split_pairs(&path).unwrap();
        assert_eq!(
            pairs,
            vec![PairKey::new("msd", "A", "h1"), PairKey::new("cal500", "B", "h2")]
        );
    }

    #[test]
    fn read_split_pairs_reports_bad_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("train_pairs.csv");
        std::fs::write(&path, "h1,msd,A\nbroken\n").unwrap();

        let err = read_split_pairs(&path).unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn candidate_pairs_file_has_no_header_or_trailing_newline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lists").join("test_pairs.csv");
        let pairs = vec![
            CandidatePair::new("abc", "TR1"),
            CandidatePair::new("abc", "TR2"),
            CandidatePair::new("def", "TR1"),
        ];

        write_candidate_pairs(&path, &pairs).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "abc,TR1\nabc,TR2\ndef,TR1");
        assert_eq!(read_candidate_pairs(&path).unwrap(), pairs);
    }
}
