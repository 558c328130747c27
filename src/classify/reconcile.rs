// src/classify/reconcile.rs
//! Turns the service's reply into exactly one tag list per batch item.

use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::classify::ai_adapter::CompletionError;

/// Tag given to an item whose classification could not be recovered.
pub const DEFAULT_TAG: &str = "uncategorized";

pub fn default_tags() -> Vec<String> {
    vec![DEFAULT_TAG.to_string()]
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("reply is not a JSON list of string lists: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

static OPENING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```[A-Za-z0-9_+-]*").expect("fence regex"));

/// Remove a leading ```` ``` ```` / ```` ```json ```` line and a trailing ```` ``` ````.
pub fn strip_code_fence(raw: &str) -> &str {
    let mut s = raw.trim();
    if let Some(m) = OPENING_FENCE.find(s) {
        s = &s[m.end()..];
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

/// Strict parse of a (possibly fenced) reply.
pub fn parse_tag_lists(raw: &str) -> Result<Vec<Vec<String>>, ReconcileError> {
    let rows: Vec<Vec<String>> = serde_json::from_str(strip_code_fence(raw))?;
    Ok(rows.into_iter().map(clean_row).collect())
}

fn clean_row(row: Vec<String>) -> Vec<String> {
    let tags: Vec<String> = row
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if tags.is_empty() {
        default_tags()
    } else {
        tags
    }
}

/// Reconcile a completion outcome against a batch of `expected` items.
///
/// - call failed or reply unparseable: `expected` default entries;
/// - reply shorter than the batch: padded with default entries;
/// - reply longer than the batch: returned as is. Callers pair entries with
///   items by position, so the surplus is never used.
pub fn reconcile(outcome: Result<String, CompletionError>, expected: usize) -> Vec<Vec<String>> {
    let raw = match outcome {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(error = %e, expected, "classification call failed, using default tags");
            counter!("classify_fallback_total").increment(1);
            return vec![default_tags(); expected];
        }
    };

    let mut rows = match parse_tag_lists(&raw) {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(error = %e, raw = ?raw, "unparseable classification reply, using default tags");
            counter!("classify_fallback_total").increment(1);
            return vec![default_tags(); expected];
        }
    };

    if rows.len() != expected {
        tracing::warn!(
            expected,
            got = rows.len(),
            "classification reply length does not match batch"
        );
    }
    if rows.len() < expected {
        rows.resize(expected, default_tags());
    }
    rows
}
