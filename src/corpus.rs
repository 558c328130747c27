//! # Corpus Store
//!
//! The corpus is the ordered list of every known news item, newest discovery
//! first. It is always read and written as a whole.
//!
//! - `JsonFileStore` keeps it in one pretty-printed JSON file (non-ASCII kept
//!   as-is), replaced atomically through a temporary sibling file.
//! - `MemoryStore` keeps it in process, for tests and offline runs.
//! - `tag_vocabulary` / `tag_counts` derive tag statistics from a snapshot.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::ingest::types::NewsItem;

#[async_trait::async_trait]
pub trait CorpusStore: Send + Sync {
    /// Whole corpus; empty when nothing was stored yet.
    async fn load(&self) -> Result<Vec<NewsItem>>;
    /// Replace the whole corpus.
    async fn save(&self, items: &[NewsItem]) -> Result<()>;
}

pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Four-space indented JSON, matching the historical `all_topics.json` layout.
pub fn to_pretty_json(items: &[NewsItem]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let fmt = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, fmt);
    items.serialize(&mut ser).context("serializing corpus")?;
    Ok(buf)
}

#[async_trait::async_trait]
impl CorpusStore for JsonFileStore {
    async fn load(&self) -> Result<Vec<NewsItem>> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", self.path.display()));
            }
        };
        serde_json::from_slice(&data)
            .with_context(|| format!("parsing corpus {}", self.path.display()))
    }

    async fn save(&self, items: &[NewsItem]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = to_pretty_json(items)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<Vec<NewsItem>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<NewsItem>) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }

    pub fn snapshot(&self) -> Vec<NewsItem> {
        self.items.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl CorpusStore for MemoryStore {
    async fn load(&self) -> Result<Vec<NewsItem>> {
        let g = self
            .items
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        Ok(g.clone())
    }

    async fn save(&self, items: &[NewsItem]) -> Result<()> {
        let mut g = self
            .items
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        *g = items.to_vec();
        Ok(())
    }
}

/// Every distinct tag in the corpus, sorted.
pub fn tag_vocabulary(items: &[NewsItem]) -> BTreeSet<String> {
    items
        .iter()
        .flat_map(|it| it.tags.iter().cloned())
        .collect()
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TagCount {
    pub name: String,
    pub count: usize,
}

/// Occurrences per tag, most frequent first.
/// Equal counts keep the order in which the tags were first met in the corpus.
pub fn tag_counts(items: &[NewsItem]) -> Vec<TagCount> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut out: Vec<TagCount> = Vec::new();
    for tag in items.iter().flat_map(|it| it.tags.iter()) {
        match index.get(tag.as_str()) {
            Some(&i) => out[i].count += 1,
            None => {
                index.insert(tag.as_str(), out.len());
                out.push(TagCount {
                    name: tag.clone(),
                    count: 1,
                });
            }
        }
    }
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(link: &str, tags: &[&str]) -> NewsItem {
        NewsItem {
            title: link.to_string(),
            link: link.to_string(),
            description: String::new(),
            pub_date: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn counts_are_aggregated_and_sorted() {
        let items = vec![
            item("1", &["a"]),
            item("2", &["a", "b"]),
            item("3", &["b"]),
            item("4", &["c"]),
        ];
        let counts = tag_counts(&items);
        assert_eq!(counts.len(), 3);
        assert_eq!(counts[0], TagCount { name: "a".into(), count: 2 });
        assert_eq!(counts[1], TagCount { name: "b".into(), count: 2 });
        assert_eq!(counts[2], TagCount { name: "c".into(), count: 1 });
        assert_eq!(items.len(), 4);
    }

    #[test]
    fn untagged_items_contribute_nothing() {
        let items = vec![item("1", &[]), item("2", &["政治"])];
        let counts = tag_counts(&items);
        assert_eq!(counts, vec![TagCount { name: "政治".into(), count: 1 }]);
        assert!(tag_counts(&[]).is_empty());
    }

    #[test]
    fn vocabulary_is_distinct_and_sorted() {
        let items = vec![item("1", &["b", "a"]), item("2", &["a", "c"])];
        let vocab: Vec<_> = tag_vocabulary(&items).into_iter().collect();
        assert_eq!(vocab, vec!["a", "b", "c"]);
    }

    #[test]
    fn pretty_json_keeps_non_ascii_and_indent() {
        let json = to_pretty_json(&[item("https://x.test/1", &["経済"])]).unwrap();
        let s = String::from_utf8(json).unwrap();
        assert!(s.contains("\"経済\""));
        assert!(s.contains("\n    {\n        \"title\""));
    }

    #[tokio::test]
    async fn memory_store_replaces_whole_corpus() {
        let store = MemoryStore::with_items(vec![item("1", &[])]);
        store.save(&[item("2", &[]), item("3", &[])]).await.unwrap();
        let back = store.load().await.unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[0].link, "2");
    }
}
