//! Term-overlap ranking

use std::collections::HashSet;

use super::{Document, SearchHit};

/// Most hits returned for one query
pub const MAX_RESULTS: usize = 3;

/// Shortest term that takes part in matching
pub const MIN_TERM_CHARS: usize = 3;

/// Lowercase alphanumeric terms of at least [`MIN_TERM_CHARS`] characters
pub fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|term| term.chars().count() >= MIN_TERM_CHARS)
        .map(str::to_lowercase)
        .collect()
}

/// Rank documents by how many distinct query terms they contain
///
/// Zero-score documents are dropped. Ties keep document order.
pub fn rank(documents: &[Document], query: &str) -> Vec<SearchHit> {
    let wanted = terms(query);
    if wanted.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<SearchHit> = documents
        .iter()
        .filter_map(|document| {
            let mut present = terms(&document.title);
            present.extend(terms(&document.text));

            let score = wanted.iter().filter(|term| present.contains(*term)).count();
            (score > 0).then(|| SearchHit {
                document: document.clone(),
                score,
            })
        })
        .collect();

    // stable
    hits.sort_by(|a, b| b.score.cmp(&a.score));
    hits.truncate(MAX_RESULTS);
    hits
}
