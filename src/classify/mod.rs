// src/classify/mod.rs
//! Batch tagging: one request per batch of new items, reconciled to one tag list per item.

pub mod ai_adapter;
pub mod prompt;
pub mod reconcile;

use std::collections::BTreeSet;

use crate::classify::ai_adapter::{CompletionClient, CompletionError};
use crate::ingest::types::NewsItem;

pub use crate::classify::reconcile::{default_tags, DEFAULT_TAG};

/// Send one batch request for `items` and return the service's raw reply.
pub async fn request_tags(
    client: &dyn CompletionClient,
    items: &[NewsItem],
    vocabulary: &BTreeSet<String>,
) -> Result<String, CompletionError> {
    let request = prompt::build_request(items, vocabulary);
    tracing::debug!(
        provider = client.provider_name(),
        items = items.len(),
        vocabulary = vocabulary.len(),
        "requesting batch classification"
    );
    client.complete(&request).await
}

/// Tag `items` in a single call, normalizing against `vocabulary`.
///
/// The result has at least `items.len()` entries; entry `i` belongs to item `i`.
/// Never fails: any problem with the service degrades to the default tag.
pub async fn tag_batch(
    client: &dyn CompletionClient,
    items: &[NewsItem],
    vocabulary: &BTreeSet<String>,
) -> Vec<Vec<String>> {
    if items.is_empty() {
        return Vec::new();
    }
    let outcome = request_tags(client, items, vocabulary).await;
    reconcile::reconcile(outcome, items.len())
}
