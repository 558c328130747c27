// src/ingest/rss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::ingest::types::{FeedSource, NewsItem};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

/// RSS 2.0 feed, either downloaded over HTTP or read from an in-memory document.
pub struct RssFeedProvider {
    name: String,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl RssFeedProvider {
    pub fn from_fixture(name: &str, xml: &str) -> Self {
        Self {
            name: name.to_string(),
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    /// `client` carries the per-request timeout; share one client across feeds.
    pub fn from_url(name: &str, url: &str, client: reqwest::Client) -> Self {
        Self {
            name: name.to_string(),
            mode: Mode::Http {
                url: url.to_string(),
                client,
            },
        }
    }

    pub fn parse_items_from_str(s: &str) -> Result<Vec<NewsItem>> {
        Self::parse_items_at(s, Utc::now())
    }

    fn parse_items_at(s: &str, now: DateTime<Utc>) -> Result<Vec<NewsItem>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(s);
        let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;

        let out: Vec<NewsItem> = rss
            .channel
            .item
            .into_iter()
            .map(|it| NewsItem {
                title: it.title.unwrap_or_default(),
                link: it.link.map(|l| l.trim().to_string()).unwrap_or_default(),
                description: it.description.unwrap_or_default(),
                pub_date: resolve_pub_date(it.pub_date.as_deref(), now),
                tags: Vec::new(),
            })
            .collect();

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("feed_parse_ms").record(ms);
        counter!("feed_items_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl FeedSource for RssFeedProvider {
    async fn fetch_items(&self) -> Result<Vec<NewsItem>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_items_from_str(s),
            Mode::Http { url, client } => {
                let body = client
                    .get(url.as_str())
                    .send()
                    .await
                    .with_context(|| format!("GET {url}"))?
                    .error_for_status()
                    .with_context(|| format!("GET {url} non-2xx"))?
                    .text()
                    .await
                    .with_context(|| format!("reading body of {url}"))?;
                Self::parse_items_from_str(&body)
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Map a raw `pubDate` to the stored timestamp.
///
/// Absent or blank dates stay empty. Dates that are present but unreadable
/// (malformed, unknown zone abbreviation) become `now`.
pub fn resolve_pub_date(raw: Option<&str>, now: DateTime<Utc>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return String::new();
    };
    match parse_pub_date(raw) {
        Ok(formatted) => formatted,
        Err(e) => {
            tracing::debug!(error = %e, raw, "unreadable pubDate, using fetch time");
            now.to_rfc3339_opts(SecondsFormat::Secs, true)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DateParseError {
    #[error("unknown time zone `{0}`")]
    UnknownZone(String),
    #[error("malformed date: {0}")]
    Malformed(#[from] time::error::Parse),
    #[error("cannot format date: {0}")]
    Format(#[from] time::error::Format),
}

/// Accepts `Mon, 06 Jan 2025 09:30:00 +0900` and `Tue, 07 Jan 2025 01:00:00 GMT`.
pub fn parse_pub_date(raw: &str) -> Result<String, DateParseError> {
    let s = raw.trim();
    let (head, zone) = s.rsplit_once(' ').unwrap_or((s, ""));

    let dt = if is_numeric_offset(zone) {
        OffsetDateTime::parse(s, &Rfc2822)?
    } else if matches!(
        zone.to_ascii_uppercase().as_str(),
        "GMT" | "UTC" | "UT" | "Z"
    ) {
        OffsetDateTime::parse(&format!("{head} +0000"), &Rfc2822)?
    } else {
        return Err(DateParseError::UnknownZone(zone.to_string()));
    };

    Ok(dt.format(&Rfc3339)?)
}

fn is_numeric_offset(zone: &str) -> bool {
    zone.len() == 5
        && (zone.starts_with('+') || zone.starts_with('-'))
        && zone[1..].chars().all(|c| c.is_ascii_digit())
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 8, 12, 0, 0).unwrap()
    }

    #[test]
    fn numeric_offset_is_kept() {
        let out = parse_pub_date("Mon, 06 Jan 2025 09:30:00 +0900").unwrap();
        assert_eq!(out, "2025-01-06T09:30:00+09:00");
    }

    #[test]
    fn gmt_abbreviation_is_utc() {
        let out = parse_pub_date("Tue, 07 Jan 2025 01:00:00 GMT").unwrap();
        assert_eq!(out, "2025-01-07T01:00:00Z");
    }

    #[test]
    fn unknown_zone_falls_back_to_now() {
        let out = resolve_pub_date(Some("Tue, 07 Jan 2025 01:00:00 JST"), fixed_now());
        assert_eq!(out, "2025-01-08T12:00:00Z");
    }

    #[test]
    fn garbage_falls_back_to_now() {
        let out = resolve_pub_date(Some("yesterday-ish"), fixed_now());
        assert_eq!(out, "2025-01-08T12:00:00Z");
    }

    #[test]
    fn missing_date_stays_empty() {
        assert_eq!(resolve_pub_date(None, fixed_now()), "");
        assert_eq!(resolve_pub_date(Some("   "), fixed_now()), "");
    }

    #[test]
    fn missing_fields_become_empty_strings() {
        let xml = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>t</title>
  <item><title>only a title</title></item>
  <item><link>https://example.test/2</link><description>desc &amp; more</description></item>
</channel></rss>"#;
        let items = RssFeedProvider::parse_items_at(xml, fixed_now()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "only a title");
        assert_eq!(items[0].link, "");
        assert_eq!(items[0].description, "");
        assert_eq!(items[0].pub_date, "");
        assert_eq!(items[1].title, "");
        assert_eq!(items[1].description, "desc & more");
        assert!(items.iter().all(|i| i.tags.is_empty()));
    }

    #[test]
    fn channel_without_items_is_empty() {
        let xml = r#"<rss version="2.0"><channel><title>empty</title></channel></rss>"#;
        let items = RssFeedProvider::parse_items_at(xml, fixed_now()).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn broken_xml_is_an_error() {
        assert!(RssFeedProvider::parse_items_from_str("<html><body>nope</body></html>").is_err());
    }
}
