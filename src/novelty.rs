//! Novelty detection: which fetched items the corpus has not seen yet.

use std::collections::HashSet;

use crate::ingest::types::NewsItem;

/// Keep the fetched items whose link is not in `existing`, in fetch order.
///
/// Comparison is exact link equality. A link repeated inside `fetched` is kept
/// once (first occurrence), which also applies to empty links.
pub fn find_new_items(fetched: Vec<NewsItem>, existing: &[NewsItem]) -> Vec<NewsItem> {
    let mut seen: HashSet<String> = existing.iter().map(|it| it.link.clone()).collect();
    fetched
        .into_iter()
        .filter(|it| seen.insert(it.link.clone()))
        .collect()
}
