//! Dedup Matcher
//!
//! Removes every MIDI catalog entry that matches anything in a reference
//! corpus, then matches the survivors against the target corpus.
//!
//! Any non-empty query result counts as a match; no relevance threshold is
//! applied. Losing a usable MIDI file is cheaper than leaking a reference
//! corpus song into the target matching set.

use crate::catalog::Catalog;
use crate::index::{CorpusIndex, MetadataSearch};
use hprep_common::pairs::write_candidate_pairs;
use hprep_common::{CandidatePair, HprepConfig, Result};
use std::collections::HashSet;

/// Summary of one dedup run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupReport {
    pub catalog_size: usize,
    pub excluded: usize,
    pub survivors: usize,
    /// Survivors with at least one target match
    pub matched_entries: usize,
    pub pairs: usize,
}

/// Sequence numbers of catalog entries that match anything in a corpus
pub fn find_excluded<S: MetadataSearch>(catalog: &Catalog, searcher: &mut S) -> Result<HashSet<usize>> {
    let mut excluded = HashSet::new();
    for item in catalog.iter() {
        let hits = searcher.search(&item.entry.artist, &item.entry.title)?;
        if !hits.is_empty() {
            tracing::debug!(
                md5 = %item.entry.md5,
                artist = %item.entry.artist,
                title = %item.entry.title,
                first_match = %hits[0].id,
                "Catalog entry present in reference corpus"
            );
            excluded.insert(item.seq);
        }
    }
    Ok(excluded)
}

/// One candidate pair per (entry, hit); an entry may yield several
pub fn match_target<S: MetadataSearch>(catalog: &Catalog, searcher: &mut S) -> Result<Vec<CandidatePair>> {
    let mut pairs = Vec::new();
    for item in catalog.iter() {
        for hit in searcher.search(&item.entry.artist, &item.entry.title)? {
            pairs.push(CandidatePair::new(item.entry.md5.clone(), hit.id));
        }
    }
    Ok(pairs)
}

/// Dedup Matcher over the configured catalog and corpora
pub struct DedupMatcher {
    config: HprepConfig,
}

impl DedupMatcher {
    pub fn new(config: HprepConfig) -> Self {
        Self { config }
    }

    /// Sweep every reference corpus and return the surviving catalog
    ///
    /// Each index is opened, searched with one session and released before
    /// the next is opened.
    pub fn exclude_reference_matches(&self, catalog: &Catalog) -> Result<(Catalog, usize)> {
        let mut excluded = HashSet::new();

        for corpus in &self.config.dedup.reference_corpora {
            let index = CorpusIndex::open(self.config.corpus_index_path(corpus)?)?;
            let found = {
                let mut searcher = index.searcher(&self.config.search);
                find_excluded(catalog, &mut searcher)?
            };

            tracing::info!(
                corpus = %corpus,
                index = %index.location().display(),
                matched = found.len(),
                "Reference corpus sweep complete"
            );
            excluded.extend(found);
        }

        Ok((catalog.without(&excluded), excluded.len()))
    }

    /// Match surviving entries against the target corpus
    pub fn match_survivors(&self, survivors: &Catalog) -> Result<Vec<CandidatePair>> {
        let corpus = &self.config.dedup.target_corpus;
        let index = CorpusIndex::open(self.config.corpus_index_path(corpus)?)?;
        let mut searcher = index.searcher(&self.config.search);
        let pairs = match_target(survivors, &mut searcher)?;

        tracing::info!(
            corpus = %corpus,
            index = %index.location().display(),
            pairs = pairs.len(),
            "Target corpus sweep complete"
        );
        Ok(pairs)
    }

    /// Full run: load catalog, dedup, match, write the pairs file
    ///
    /// Nothing is written unless every index opened and every sweep finished.
    pub fn run(&self) -> Result<DedupReport> {
        let catalog = Catalog::load(&self.config.dedup.catalog)?;
        let (survivors, excluded) = self.exclude_reference_matches(&catalog)?;

        tracing::info!(
            catalog = catalog.len(),
            excluded,
            survivors = survivors.len(),
            "Removed MIDI entries found in reference corpora"
        );

        let pairs = self.match_survivors(&survivors)?;
        let matched_entries = pairs
            .iter()
            .map(|p| p.midi_id.as_str())
            .collect::<HashSet<_>>()
            .len();

        write_candidate_pairs(&self.config.dedup.pairs_output, &pairs)?;
        tracing::info!(
            output = %self.config.dedup.pairs_output.display(),
            pairs = pairs.len(),
            "Wrote candidate pairs"
        );

        Ok(DedupReport {
            catalog_size: catalog.len(),
            excluded,
            survivors: survivors.len(),
            matched_entries,
            pairs: pairs.len(),
        })
    }
}
