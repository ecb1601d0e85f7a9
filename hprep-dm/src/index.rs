//! Corpus metadata index
//!
//! Read-only artist/title index over one audio corpus, queried with fuzzy
//! term matching so that spelling, punctuation and casing differences
//! between a MIDI catalog entry and a corpus entry still produce a hit.
//!
//! An index is stored as `<index dir>/index.json`, a JSON array of
//! `{"id", "artist", "title"}` records. Queries go through a [`Searcher`],
//! a session borrowed from the index for one sweep over the catalog.

use hprep_common::config::SearchConfig;
use hprep_common::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// File name of the index records inside an index directory
pub const INDEX_FILE: &str = "index.json";

/// Tokens dropped during analysis
const STOP_WORDS: [&str; 34] = [
    "a", "an", "and", "are", "as", "at", "be", "by", "can", "for", "from", "have", "if", "in",
    "is", "it", "may", "not", "of", "on", "or", "tbd", "that", "the", "this", "to", "us", "we",
    "when", "will", "with", "yet", "you", "your",
];

/// Shortest token kept by analysis, in characters
const MIN_TOKEN_CHARS: usize = 2;

/// One corpus entry as stored in the index
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IndexRecord {
    pub id: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub title: String,
}

/// One query result
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Corpus entry identifier
    pub id: String,
    /// Relevance; higher is better
    pub score: f32,
}

/// Fuzzy (artist, title) lookup against one corpus
///
/// Results are ordered by descending score. An empty result means no match.
pub trait MetadataSearch {
    fn search(&mut self, artist: &str, title: &str) -> Result<Vec<SearchHit>>;
}

/// Lowercase, split on non-alphanumerics, drop short tokens and stop words
pub fn analyze(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS && !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Field {
    Artist,
    Title,
}

/// Term dictionary and postings for one field
#[derive(Debug, Default)]
struct FieldIndex {
    terms: Vec<String>,
    /// term index -> ascending document numbers
    postings: Vec<Vec<usize>>,
}

impl FieldIndex {
    fn build<'a>(values: impl Iterator<Item = &'a str>) -> Self {
        let mut lookup: HashMap<String, usize> = HashMap::new();
        let mut index = FieldIndex::default();

        for (doc, value) in values.enumerate() {
            for term in analyze(value) {
                let slot = *lookup.entry(term.clone()).or_insert_with(|| {
                    index.terms.push(term);
                    index.postings.push(Vec::new());
                    index.terms.len() - 1
                });
                let postings = &mut index.postings[slot];
                if postings.last() != Some(&doc) {
                    postings.push(doc);
                }
            }
        }
        index
    }
}

/// Opened, immutable corpus index
#[derive(Debug)]
pub struct CorpusIndex {
    location: PathBuf,
    records: Vec<IndexRecord>,
    artist: FieldIndex,
    title: FieldIndex,
}

impl CorpusIndex {
    /// Open an index directory (or an index file directly)
    ///
    /// Any failure is an [`Error::Index`]: a corpus that cannot be opened
    /// invalidates the whole run.
    pub fn open(path: &Path) -> Result<Self> {
        let file = if path.is_dir() {
            path.join(INDEX_FILE)
        } else {
            path.to_path_buf()
        };

        let content = std::fs::read(&file)
            .map_err(|e| Error::Index(format!("Open {} failed: {}", file.display(), e)))?;
        let records: Vec<IndexRecord> = serde_json::from_slice(&content)
            .map_err(|e| Error::Index(format!("Parse {} failed: {}", file.display(), e)))?;

        tracing::info!(
            index = %file.display(),
            entries = records.len(),
            "Opened corpus index"
        );

        Ok(Self::from_records(path, records))
    }

    /// Build an index from records already in memory
    pub fn from_records(location: impl Into<PathBuf>, records: Vec<IndexRecord>) -> Self {
        let artist = FieldIndex::build(records.iter().map(|r| r.artist.as_str()));
        let title = FieldIndex::build(records.iter().map(|r| r.title.as_str()));
        Self {
            location: location.into(),
            records,
            artist,
            title,
        }
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Start a query session
    pub fn searcher(&self, options: &SearchConfig) -> Searcher<'_> {
        Searcher {
            index: self,
            options: options.clone(),
            expansions: HashMap::new(),
        }
    }

    fn field(&self, field: Field) -> &FieldIndex {
        match field {
            Field::Artist => &self.artist,
            Field::Title => &self.title,
        }
    }
}

/// Query session over one [`CorpusIndex`]
///
/// Caches the fuzzy expansion of every query term it has seen, so repeated
/// artist names across a catalog sweep are expanded once.
pub struct Searcher<'a> {
    index: &'a CorpusIndex,
    options: SearchConfig,
    /// (field, query term) -> matching (term index, similarity)
    expansions: HashMap<(Field, String), Vec<(usize, f32)>>,
}

impl<'a> Searcher<'a> {
    fn expand(&mut self, field: Field, term: &str) -> &[(usize, f32)] {
        let index = self.index;
        let options = &self.options;
        self.expansions
            .entry((field, term.to_string()))
            .or_insert_with(|| {
                index
                    .field(field)
                    .terms
                    .iter()
                    .enumerate()
                    .filter(|(_, candidate)| fuzzy_matches(term, candidate, options))
                    .map(|(slot, candidate)| {
                        (slot, strsim::normalized_levenshtein(term, candidate) as f32)
                    })
                    .collect()
            })
    }

    /// Documents matching one query term, with the best similarity per document
    fn term_documents(&mut self, field: Field, term: &str) -> HashMap<usize, f32> {
        let index = self.index;
        let mut docs: HashMap<usize, f32> = HashMap::new();
        for &(slot, similarity) in self.expand(field, term) {
            for &doc in &index.field(field).postings[slot] {
                let best = docs.entry(doc).or_insert(0.0);
                if similarity > *best {
                    *best = similarity;
                }
            }
        }
        docs
    }
}

impl MetadataSearch for Searcher<'_> {
    fn search(&mut self, artist: &str, title: &str) -> Result<Vec<SearchHit>> {
        let query: Vec<(Field, String)> = analyze(artist)
            .into_iter()
            .map(|t| (Field::Artist, t))
            .chain(analyze(title).into_iter().map(|t| (Field::Title, t)))
            .collect();

        if query.is_empty() {
            return Ok(Vec::new());
        }

        // Conjunction over every query term of both fields
        let mut scores: Option<HashMap<usize, f32>> = None;
        for (field, term) in &query {
            let matches = self.term_documents(*field, term);
            scores = Some(match scores {
                None => matches,
                Some(mut acc) => {
                    acc.retain(|doc, _| matches.contains_key(doc));
                    for (doc, score) in acc.iter_mut() {
                        *score += matches[doc];
                    }
                    acc
                }
            });
            if scores.as_ref().is_some_and(HashMap::is_empty) {
                return Ok(Vec::new());
            }
        }

        let mut ranked: Vec<(usize, f32)> = scores.unwrap_or_default().into_iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(self.options.limit);

        Ok(ranked
            .into_iter()
            .map(|(doc, score)| SearchHit {
                id: self.index.records[doc].id.clone(),
                score,
            })
            .collect())
    }
}

/// Prefix must agree exactly; the remainder may differ by `max_edits`
fn fuzzy_matches(query: &str, candidate: &str, options: &SearchConfig) -> bool {
    let prefix_ok = query
        .chars()
        .take(options.prefix_length)
        .eq(candidate.chars().take(options.prefix_length));
    prefix_ok && strsim::levenshtein(query, candidate) <= options.max_edits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, artist: &str, title: &str) -> IndexRecord {
        IndexRecord {
            id: id.to_string(),
            artist: artist.to_string(),
            title: title.to_string(),
        }
    }

    fn sample_index() -> CorpusIndex {
        CorpusIndex::from_records(
            "memory",
            vec![
                record("TR1", "The Beatles", "Help!"),
                record("TR2", "Beatles", "Hey Jude"),
                record("TR3", "Led Zeppelin", "Kashmir"),
                record("TR4", "The Beatles", "Help"),
            ],
        )
    }

    #[test]
    fn analyze_drops_stop_words_punctuation_and_short_tokens() {
        assert_eq!(analyze("The Beatles"), vec!["beatles"]);
        assert_eq!(analyze("Sgt. Pepper's Lonely Hearts"), vec!["sgt", "pepper", "lonely", "hearts"]);
        assert_eq!(analyze("A-ha"), vec!["ha"]);
        assert!(analyze("The The").is_empty());
    }

    #[test]
    fn casing_and_punctuation_do_not_prevent_a_match() {
        let index = sample_index();
        let mut searcher = index.searcher(&SearchConfig::default());

        let hits = searcher.search("the BEATLES", "help").unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["TR1", "TR4"]);
    }

    #[test]
    fn single_typo_matches() {
        let index = sample_index();
        let mut searcher = index.searcher(&SearchConfig::default());

        let hits = searcher.search("Led Zepelin", "Kashmir").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "TR3");
    }

    #[test]
    fn exact_match_outranks_fuzzy_match() {
        let index = CorpusIndex::from_records(
            "memory",
            vec![record("fuzzy", "Beatle", "Help"), record("exact", "Beatles", "Help")],
        );
        let mut searcher = index.searcher(&SearchConfig::default());

        let hits = searcher.search("Beatles", "Help").unwrap();
        assert_eq!(hits[0].id, "exact");
        assert_eq!(hits[1].id, "fuzzy");
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn every_term_must_match() {
        let index = sample_index();
        let mut searcher = index.searcher(&SearchConfig::default());

        assert!(searcher.search("The Beatles", "Yesterday").unwrap().is_empty());
        assert!(searcher.search("Nirvana", "Help").unwrap().is_empty());
    }

    #[test]
    fn prefix_must_agree() {
        let index = CorpusIndex::from_records("memory", vec![record("TR1", "Madonna", "Vogue")]);
        let mut searcher = index.searcher(&SearchConfig::default());

        assert!(searcher.search("Madonna", "Rogue").unwrap().is_empty());
        assert_eq!(searcher.search("Madona", "Vogue").unwrap().len(), 1);
    }

    #[test]
    fn empty_field_constrains_nothing_but_empty_query_matches_nothing() {
        let index = sample_index();
        let mut searcher = index.searcher(&SearchConfig::default());

        assert_eq!(searcher.search("", "Kashmir").unwrap().len(), 1);
        assert!(searcher.search("The", "!!").unwrap().is_empty());
    }

    #[test]
    fn limit_caps_results() {
        let records = (0..20)
            .map(|i| record(&format!("TR{i}"), "Queen", "Bohemian Rhapsody"))
            .collect();
        let index = CorpusIndex::from_records("memory", records);
        let options = SearchConfig {
            limit: 5,
            ..Default::default()
        };
        let mut searcher = index.searcher(&options);

        let hits = searcher.search("Queen", "Bohemian Rhapsody").unwrap();
        assert_eq!(hits.len(), 5);
        assert_eq!(hits[0].id, "TR0");
    }

    #[test]
    fn open_missing_index_is_index_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = CorpusIndex::open(&dir.path().join("cal500").join("index")).unwrap_err();
        assert!(matches!(err, Error::Index(_)));
    }

    #[test]
    fn open_reads_index_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(INDEX_FILE),
            r#"[{"id": "TRX", "artist": "Blondie", "title": "Heart of Glass"}]"#,
        )
        .unwrap();

        let index = CorpusIndex::open(dir.path()).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.location(), dir.path());
        let mut searcher = index.searcher(&SearchConfig::default());
        assert_eq!(searcher.search("blondie", "heart glass").unwrap()[0].id, "TRX");
    }
}
