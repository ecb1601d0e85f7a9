//! End-to-end Dedup Matcher tests over on-disk catalog and indexes

use hprep_common::config::{HprepConfig, TomlConfig};
use hprep_common::pairs::read_candidate_pairs;
use hprep_common::{CandidatePair, Error};
use hprep_dm::index::INDEX_FILE;
use hprep_dm::DedupMatcher;
use std::path::Path;
use tempfile::TempDir;

fn write_index(root: &Path, corpus: &str, records: &str) {
    let dir = root.join(corpus).join("index");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(INDEX_FILE), records).unwrap();
}

/// Data tree with three reference corpora and the target corpus
fn setup(catalog: &str) -> (TempDir, HprepConfig) {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data");

    write_index(&data, "uspop2002", r#"[{"id": "us-1", "artist": "Madonna", "title": "Vogue"}]"#);
    write_index(&data, "cal10k", r#"[]"#);
    write_index(
        &data,
        "cal500",
        r#"[{"id": "cal-42", "artist": "The Beatles", "title": "Help!"}]"#,
    );
    write_index(
        &data,
        "msd",
        r#"[
            {"id": "TRHELP01", "artist": "Beatles", "title": "Help"},
            {"id": "TRVOGUE1", "artist": "Madonna", "title": "Vogue"},
            {"id": "TRBIKE01", "artist": "Queen", "title": "Bicycle Race"},
            {"id": "TRBIKE02", "artist": "Queen", "title": "Bicycle Race (Live)"},
            {"id": "TRKASH01", "artist": "Led Zeppelin", "title": "Kashmir"}
        ]"#,
    );

    let catalog_path = data.join("clean_midi").join("index.js");
    std::fs::create_dir_all(catalog_path.parent().unwrap()).unwrap();
    std::fs::write(&catalog_path, catalog).unwrap();

    let mut config = HprepConfig::from_toml(TomlConfig {
        data_root: Some(data),
        results_root: Some(dir.path().join("results")),
        ..Default::default()
    });
    config.dedup.pairs_output = dir.path().join("file_lists").join("test_pairs.csv");
    (dir, config)
}

#[test]
fn reference_matches_never_appear_in_candidate_pairs() {
    let (_dir, config) = setup(
        r#"[
            {"md5": "abc", "artist": "Beatles", "title": "Help"},
            {"md5": "vog", "artist": "madonna", "title": "VOGUE"},
            {"md5": "bik", "artist": "Queen", "title": "Bicycle Race"},
            {"md5": "kas", "artist": "Led Zepelin", "title": "Kashmir"},
            {"md5": "zzz", "artist": "Unknown Band", "title": "Unknown Song"}
        ]"#,
    );
    let output = config.dedup.pairs_output.clone();

    let report = DedupMatcher::new(config).run().unwrap();

    let pairs = read_candidate_pairs(&output).unwrap();
    assert_eq!(
        pairs,
        vec![
            CandidatePair::new("bik", "TRBIKE01"),
            CandidatePair::new("bik", "TRBIKE02"),
            CandidatePair::new("kas", "TRKASH01"),
        ]
    );
    assert!(pairs.iter().all(|p| p.midi_id != "abc" && p.midi_id != "vog"));

    assert_eq!(report.catalog_size, 5);
    assert_eq!(report.excluded, 2);
    assert_eq!(report.survivors, 3);
    assert_eq!(report.matched_entries, 2);
    assert_eq!(report.pairs, 3);
}

#[test]
fn duplicate_catalog_entries_are_each_excluded() {
    let (_dir, config) = setup(
        r#"[
            {"md5": "abc", "artist": "Beatles", "title": "Help"},
            {"md5": "abc", "artist": "Beatles", "title": "Help"},
            {"md5": "kas", "artist": "Led Zeppelin", "title": "Kashmir"}
        ]"#,
    );
    let output = config.dedup.pairs_output.clone();

    let report = DedupMatcher::new(config).run().unwrap();

    assert_eq!(report.excluded, 2);
    assert_eq!(
        read_candidate_pairs(&output).unwrap(),
        vec![CandidatePair::new("kas", "TRKASH01")]
    );
}

#[test]
fn unopenable_reference_index_aborts_without_output() {
    let (dir, config) = setup(r#"[{"md5": "kas", "artist": "Led Zeppelin", "title": "Kashmir"}]"#);
    std::fs::remove_dir_all(dir.path().join("data").join("cal10k")).unwrap();
    let output = config.dedup.pairs_output.clone();

    let err = DedupMatcher::new(config).run().unwrap_err();

    assert!(matches!(err, Error::Index(_)), "{err}");
    assert!(!output.exists());
}

#[test]
fn missing_catalog_is_fatal() {
    let (dir, config) = setup("[]");
    std::fs::remove_file(dir.path().join("data").join("clean_midi").join("index.js")).unwrap();

    assert!(matches!(DedupMatcher::new(config).run(), Err(Error::Catalog(_))));
}
