//! # Incremental tagging pipeline
//!
//! One cycle: fetch feeds, keep the items the corpus does not know, tag them
//! in one classification call, prepend them to the corpus and persist it.
//!
//! Stages: `Fetching -> Classifying -> Reconciling -> Merging -> Persisted`, or
//! `Fetching -> Idle` when nothing is new. Cycles run one at a time per
//! pipeline; reads that only need the stored corpus do not wait for them.

use anyhow::{Context, Result};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::classify::{self, ai_adapter::DynCompletionClient, reconcile::reconcile};
use crate::corpus::{tag_vocabulary, CorpusStore};
use crate::ingest::{self, types::FeedSource, types::NewsItem};
use crate::novelty::find_new_items;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("news_cycles_total", "Completed fetch/tag/merge cycles.");
        describe_counter!("news_new_items_total", "Items added to the corpus.");
        describe_counter!(
            "classify_fallback_total",
            "Batches tagged with the default tag after a failed or unreadable reply."
        );
        describe_gauge!("corpus_items", "Items in the corpus after the last cycle.");
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStage {
    Fetching,
    Classifying,
    Reconciling,
    Merging,
    Persisted,
    Idle,
}

/// Outcome of one cycle: the full corpus after the cycle and how many items it added.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub corpus: Vec<NewsItem>,
    pub new_count: usize,
    /// Stages the cycle went through, in order.
    pub stages: Vec<CycleStage>,
}

/// Attach `tag_lists[i]` to `new_items[i]` and put the new items in front of `existing`.
///
/// Surplus tag lists are ignored. A missing tag list leaves the item untagged,
/// which `reconcile` never produces.
pub fn merge(
    new_items: Vec<NewsItem>,
    tag_lists: Vec<Vec<String>>,
    existing: Vec<NewsItem>,
) -> Vec<NewsItem> {
    let mut tag_lists = tag_lists.into_iter();
    let mut out = Vec::with_capacity(new_items.len() + existing.len());
    for mut item in new_items {
        item.tags = tag_lists.next().unwrap_or_default();
        out.push(item);
    }
    out.extend(existing);
    out
}

/// Parse a `tags=a,b` query value. `None` means "no filter".
pub fn parse_tag_filter(raw: Option<&str>) -> Option<HashSet<String>> {
    let set: HashSet<String> = raw?
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    if set.is_empty() {
        None
    } else {
        Some(set)
    }
}

/// Keep items sharing at least one tag with `filter`; everything when there is no filter.
pub fn filter_by_tags(items: Vec<NewsItem>, filter: Option<&HashSet<String>>) -> Vec<NewsItem> {
    match filter {
        None => items,
        Some(wanted) => items.into_iter().filter(|it| it.has_any_tag(wanted)).collect(),
    }
}

pub struct NewsPipeline {
    feeds: Vec<Box<dyn FeedSource>>,
    store: Arc<dyn CorpusStore>,
    ai: DynCompletionClient,
    max_per_feed: usize,
    cycle_lock: Mutex<()>,
}

impl NewsPipeline {
    pub fn new(
        feeds: Vec<Box<dyn FeedSource>>,
        store: Arc<dyn CorpusStore>,
        ai: DynCompletionClient,
        max_per_feed: usize,
    ) -> Self {
        Self {
            feeds,
            store,
            ai,
            max_per_feed,
            cycle_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn CorpusStore> {
        &self.store
    }

    /// Run one full cycle. Only corpus read/write failures are errors.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        ensure_metrics_described();
        let _guard = self.cycle_lock.lock().await;

        let existing = self.store.load().await.context("loading corpus")?;

        let mut stages = Vec::new();
        enter(&mut stages, CycleStage::Fetching);
        let fetched = ingest::fetch_all(&self.feeds, self.max_per_feed).await;
        let new_items = find_new_items(fetched, &existing);

        if new_items.is_empty() {
            tracing::info!(corpus = existing.len(), "no new items");
            enter(&mut stages, CycleStage::Idle);
            counter!("news_cycles_total").increment(1);
            return Ok(CycleReport {
                corpus: existing,
                new_count: 0,
                stages,
            });
        }

        let new_count = new_items.len();
        tracing::info!(new_count, "new items detected");

        enter(&mut stages, CycleStage::Classifying);
        let vocabulary = tag_vocabulary(&existing);
        let outcome = classify::request_tags(self.ai.as_ref(), &new_items, &vocabulary).await;

        enter(&mut stages, CycleStage::Reconciling);
        let tag_lists = reconcile(outcome, new_count);

        enter(&mut stages, CycleStage::Merging);
        let corpus = merge(new_items, tag_lists, existing);
        self.store
            .save(&corpus)
            .await
            .context("persisting corpus")?;
        enter(&mut stages, CycleStage::Persisted);

        counter!("news_cycles_total").increment(1);
        counter!("news_new_items_total").increment(new_count as u64);
        gauge!("corpus_items").set(corpus.len() as f64);

        Ok(CycleReport {
            corpus,
            new_count,
            stages,
        })
    }
}

fn enter(stages: &mut Vec<CycleStage>, stage: CycleStage) {
    tracing::debug!(stage = ?stage, "cycle stage");
    stages.push(stage);
}
