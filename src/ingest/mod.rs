// src/ingest/mod.rs
pub mod rss;
pub mod types;

use crate::ingest::types::{FeedSource, NewsItem};
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_items_total", "Items parsed from feeds.");
        describe_counter!("feed_errors_total", "Feed fetch/parse errors.");
        describe_histogram!("feed_parse_ms", "Feed parse time in milliseconds.");
    });
}

/// Fetch every source in order, keeping at most `max_per_feed` items from each.
///
/// A failing source is logged and contributes nothing; the others still run.
pub async fn fetch_all(sources: &[Box<dyn FeedSource>], max_per_feed: usize) -> Vec<NewsItem> {
    ensure_metrics_described();

    let mut out = Vec::new();
    for src in sources {
        match src.fetch_items().await {
            Ok(mut items) => {
                items.truncate(max_per_feed);
                tracing::debug!(feed = src.name(), count = items.len(), "feed fetched");
                out.append(&mut items);
            }
            Err(e) => {
                tracing::warn!(error = ?e, feed = src.name(), "feed error");
                counter!("feed_errors_total").increment(1);
            }
        }
    }
    out
}
