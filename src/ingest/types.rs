// src/ingest/types.rs
use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize};

/// One news entry as fetched from a feed and stored in the corpus.
///
/// `link` is the identity of the item: two entries with the same link are the
/// same news, whatever their titles say.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewsItem {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub link: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// RFC 3339 timestamp, or empty when the feed carried no date.
    #[serde(default, deserialize_with = "null_as_default")]
    pub pub_date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
}

// Older corpus files store `null` for absent fields.
fn null_as_default<'de, D, T>(de: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

impl NewsItem {
    /// Text handed to the classifier: title and description joined by a space.
    pub fn classification_text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }

    pub fn has_any_tag(&self, wanted: &std::collections::HashSet<String>) -> bool {
        self.tags.iter().any(|t| wanted.contains(t))
    }
}

#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_items(&self) -> Result<Vec<NewsItem>>;
    fn name(&self) -> &str;
}
