//! Interest filters a replica declares to its peers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::document::Document;

/// What documents a replica wants to receive.
///
/// Both sets empty means "no restriction", never "match nothing". When
/// either set is non-empty a document matches if its author is listed
/// **or** its path starts with one of the prefixes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncFilters {
    #[serde(default)]
    pub path_prefixes: BTreeSet<String>,
    #[serde(default)]
    pub versions_by_authors: BTreeSet<String>,
}

impl SyncFilters {
    /// No restriction.
    pub fn unfiltered() -> Self {
        Self::default()
    }

    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefixes.insert(prefix.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.versions_by_authors.insert(author.into());
        self
    }

    pub fn is_unfiltered(&self) -> bool {
        self.path_prefixes.is_empty() && self.versions_by_authors.is_empty()
    }

    /// Whether `doc` is selected by these filters. Tombstones are not
    /// special here; callers decide whether to include them.
    pub fn matches(&self, doc: &Document) -> bool {
        if self.is_unfiltered() {
            return true;
        }
        self.versions_by_authors.contains(&doc.author)
            || self
                .path_prefixes
                .iter()
                .any(|prefix| doc.path.starts_with(prefix.as_str()))
    }

    /// Select matching documents, preserving input order.
    pub fn select<'a, I>(&self, docs: I, include_deleted: bool) -> Vec<Document>
    where
        I: IntoIterator<Item = &'a Document>,
    {
        docs.into_iter()
            .filter(|d| include_deleted || !d.is_tombstone())
            .filter(|d| self.matches(d))
            .cloned()
            .collect()
    }
}
