//! Successful alignment lookup
//!
//! Lists, per MIDI file, the corpus entries it aligned to with a score
//! strictly above a threshold. Used when building evaluation sets from the
//! aligner's output.

use hprep_common::pairs::{read_split_pairs, DIAGNOSTICS_EXT};
use hprep_common::{AlignmentDiagnostics, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// MIDI hash -> corpus ids of `dataset` whose alignment scored above `threshold`
///
/// Pairs without a diagnostics file are left out. Ids keep pair-list order.
pub fn valid_matches(
    pair_file: &Path,
    dataset: &str,
    threshold: f64,
    diagnostics_dir: &Path,
) -> Result<BTreeMap<String, Vec<String>>> {
    let mut matches: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for key in read_split_pairs(pair_file)? {
        if key.dataset != dataset {
            continue;
        }

        let path = diagnostics_dir.join(key.file_name(DIAGNOSTICS_EXT));
        if !path.exists() {
            continue;
        }

        let diagnostics = AlignmentDiagnostics::load(&path)?;
        if diagnostics.score > threshold {
            matches.entry(key.midi_hash).or_default().push(key.pair_id);
        }
    }

    tracing::debug!(
        pair_file = %pair_file.display(),
        dataset,
        midi_files = matches.len(),
        "Collected valid matches"
    );
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hprep_common::PairKey;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_diagnostics(dir: &Path, key: &PairKey, score: f64) {
        AlignmentDiagnostics {
            score,
            output_midi_filename: PathBuf::from("aligned.mid"),
            audio_features_filename: PathBuf::from("audio.bin"),
        }
        .save(&dir.join(key.file_name(DIAGNOSTICS_EXT)))
        .unwrap();
    }

    #[test]
    fn keeps_only_scores_above_threshold_for_dataset() {
        let dir = TempDir::new().unwrap();
        let pair_file = dir.path().join("test_pairs.csv");
        std::fs::write(
            &pair_file,
            "aaa,msd,TR1\naaa,msd,TR2\naaa,uspop2002,US1\nbbb,msd,TR3\nccc,msd,TR4\n",
        )
        .unwrap();

        write_diagnostics(dir.path(), &PairKey::new("msd", "TR1", "aaa"), 0.9);
        write_diagnostics(dir.path(), &PairKey::new("msd", "TR2", "aaa"), 0.7);
        write_diagnostics(dir.path(), &PairKey::new("uspop2002", "US1", "aaa"), 0.9);
        // exactly at threshold: not strictly above
        write_diagnostics(dir.path(), &PairKey::new("msd", "TR3", "bbb"), 0.5);
        // TR4 has no diagnostics

        let matches = valid_matches(&pair_file, "msd", 0.5, dir.path()).unwrap();

        assert_eq!(
            matches,
            BTreeMap::from([("aaa".to_string(), vec!["TR1".to_string(), "TR2".to_string()])])
        );
    }

    #[test]
    fn missing_pair_file_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(valid_matches(&dir.path().join("nope.csv"), "msd", 0.5, dir.path()).is_err());
    }
}
