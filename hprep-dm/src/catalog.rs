//! MIDI catalog
//!
//! Entries are loaded once from the JSON catalog (`index.js`) and given a
//! synthetic sequence number. Exclusion works on those numbers, so two
//! entries with identical fields stay distinct records.

use hprep_common::{Error, Result};
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::path::Path;

/// One MIDI file as described by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MidiCatalogEntry {
    /// Content hash of the MIDI file
    pub md5: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub artist: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
}

impl MidiCatalogEntry {
    pub fn new(md5: impl Into<String>, artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            md5: md5.into(),
            artist: artist.into(),
            title: title.into(),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Catalog entry with its load-order identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub seq: usize,
    pub entry: MidiCatalogEntry,
}

/// In-memory MIDI catalog
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Load the JSON catalog; any failure is a configuration error
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read(path)
            .map_err(|e| Error::Catalog(format!("Read {} failed: {}", path.display(), e)))?;
        let entries: Vec<MidiCatalogEntry> = serde_json::from_slice(&content)
            .map_err(|e| Error::Catalog(format!("Parse {} failed: {}", path.display(), e)))?;

        tracing::info!(
            catalog = %path.display(),
            entries = entries.len(),
            "Loaded MIDI catalog"
        );

        Ok(Self::from_entries(entries))
    }

    pub fn from_entries(entries: Vec<MidiCatalogEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .enumerate()
                .map(|(seq, entry)| CatalogEntry { seq, entry })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }

    /// Catalog minus exactly the entries whose sequence numbers are excluded
    pub fn without(&self, excluded: &HashSet<usize>) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|e| !excluded.contains(&e.seq))
                .cloned()
                .collect(),
        }
    }
}
