//! Substring search over source concepts.

use crate::model::ConceptEntry;
use crate::tables::ConceptTables;

impl ConceptTables {
    /// Search source concepts by display name, code or description.
    ///
    /// Matching is a case-insensitive substring test of the query, as given, against each of the
    /// three fields. Results keep table insertion order; there is no relevance ranking. Only the
    /// empty query short-circuits to no results.
    pub fn search(&self, query: &str) -> Vec<&ConceptEntry> {
        if query.is_empty() {
            return Vec::new();
        }
        let needle = query.to_lowercase();

        let results: Vec<&ConceptEntry> = self
            .concepts()
            .iter()
            .filter(|entry| matches(entry, &needle))
            .collect();

        tracing::debug!(query = %needle, hits = results.len(), "terminology search");
        results
    }
}

fn matches(entry: &ConceptEntry, needle: &str) -> bool {
    [
        entry.display.as_str(),
        entry.code.as_str(),
        entry.description.as_str(),
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(needle))
}
