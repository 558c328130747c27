// src/config/news.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_NEWS_CONFIG_PATH: &str = "NEWS_CONFIG_PATH";
pub const ENV_NEWS_CORPUS_PATH: &str = "NEWS_CORPUS_PATH";
pub const DEFAULT_NEWS_CONFIG_PATH: &str = "config/news.toml";

pub const DEFAULT_MAX_PER_FEED: usize = 4;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FeedCfg {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsConfig {
    #[serde(default = "default_feeds")]
    pub feeds: Vec<FeedCfg>,
    #[serde(default = "default_max_per_feed")]
    pub max_per_feed: usize,
    #[serde(default = "default_corpus_path")]
    pub corpus_path: PathBuf,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// 0 disables the background refresh.
    #[serde(default)]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

fn default_max_per_feed() -> usize {
    DEFAULT_MAX_PER_FEED
}
fn default_corpus_path() -> PathBuf {
    PathBuf::from("data/all_topics.json")
}
fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}
fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_feeds() -> Vec<FeedCfg> {
    [
        (
            "yahoo-top-picks",
            "https://news.yahoo.co.jp/rss/topics/top-picks.xml",
        ),
        ("nhk-main", "https://www.nhk.or.jp/rss/news/cat0.xml"),
        ("biz-journal", "https://biz-journal.jp/index.xml"),
    ]
    .into_iter()
    .map(|(name, url)| FeedCfg {
        name: name.to_string(),
        url: url.to_string(),
    })
    .collect()
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            feeds: default_feeds(),
            max_per_feed: default_max_per_feed(),
            corpus_path: default_corpus_path(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            refresh_interval_secs: 0,
            static_dir: default_static_dir(),
        }
    }
}

impl NewsConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: NewsConfig = toml::from_str(s).context("parsing news config")?;
        Ok(cfg.sanitized())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading news config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Load using env var + fallbacks:
    /// 1) $NEWS_CONFIG_PATH (must exist)
    /// 2) config/news.toml
    /// 3) built-in defaults
    ///
    /// $NEWS_CORPUS_PATH overrides `corpus_path` in every case.
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_NEWS_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("NEWS_CONFIG_PATH points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let p = PathBuf::from(DEFAULT_NEWS_CONFIG_PATH);
            if p.exists() {
                Self::load_from(&p)?
            } else {
                Self::default()
            }
        };

        if let Ok(corpus) = std::env::var(ENV_NEWS_CORPUS_PATH) {
            if !corpus.trim().is_empty() {
                cfg.corpus_path = PathBuf::from(corpus.trim());
            }
        }
        Ok(cfg)
    }

    fn sanitized(mut self) -> Self {
        if self.max_per_feed == 0 {
            self.max_per_feed = DEFAULT_MAX_PER_FEED;
        }
        if self.fetch_timeout_secs == 0 {
            self.fetch_timeout_secs = DEFAULT_FETCH_TIMEOUT_SECS;
        }
        self.feeds.retain(|f| !f.url.trim().is_empty());
        self
    }
}
