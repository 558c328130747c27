// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod classify;
pub mod config;
pub mod corpus;
pub mod ingest;
pub mod metrics;
pub mod novelty;
pub mod pipeline;
pub mod scheduler;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::classify::ai_adapter;
pub use crate::ingest::types::NewsItem;
pub use crate::pipeline::{CycleReport, NewsPipeline};

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{ai::AiConfig, news::NewsConfig};
use crate::corpus::JsonFileStore;
use crate::ingest::rss::RssFeedProvider;
use crate::ingest::types::FeedSource;

/// Install the tracing subscriber: `RUST_LOG` filter (default
/// `ncc_ai_news=info,warn`), JSON lines when `LOG_FORMAT=json`.
/// No-op if a subscriber is already installed (e.g. by the hosting runtime).
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ncc_ai_news=info,warn"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

/// Wire feeds, the JSON corpus file and the completion client from configuration.
pub fn build_pipeline(news: &NewsConfig, ai: &AiConfig) -> anyhow::Result<NewsPipeline> {
    let http = reqwest::Client::builder()
        .user_agent("ncc-ai-news/0.1")
        .timeout(Duration::from_secs(news.fetch_timeout_secs))
        .build()
        .context("building feed http client")?;

    let feeds: Vec<Box<dyn FeedSource>> = news
        .feeds
        .iter()
        .map(|f| Box::new(RssFeedProvider::from_url(&f.name, &f.url, http.clone())) as Box<dyn FeedSource>)
        .collect();

    tracing::info!(
        feeds = feeds.len(),
        corpus = %news.corpus_path.display(),
        provider = %ai.provider,
        ai_enabled = ai.enabled,
        key_len = ai.api_key.len(),
        "pipeline configured"
    );

    Ok(NewsPipeline::new(
        feeds,
        Arc::new(JsonFileStore::new(news.corpus_path.clone())),
        ai_adapter::build_client_from_config(ai),
        news.max_per_feed,
    ))
}
