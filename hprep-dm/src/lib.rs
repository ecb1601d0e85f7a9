//! hprep-dm library interface
//!
//! Dedup Matcher: excludes MIDI catalog entries already present in the
//! reference audio corpora and matches the rest against the target corpus.

pub mod catalog;
pub mod index;
pub mod matcher;

pub use catalog::{Catalog, CatalogEntry, MidiCatalogEntry};
pub use index::{CorpusIndex, MetadataSearch, SearchHit, Searcher};
pub use matcher::{DedupMatcher, DedupReport};
