// src/classify/prompt.rs
//! Builds the single batch-tagging request sent to the text-completion service.

use std::collections::BTreeSet;

use crate::classify::ai_adapter::{CompletionRequest, SamplingConfig};
use crate::ingest::types::NewsItem;

/// Deterministic output, room for a few dozen items with several tags each.
pub const BATCH_SAMPLING: SamplingConfig = SamplingConfig {
    temperature: 0.0,
    top_p: 1.0,
    max_output_tokens: 4096,
};

const INSTRUCTIONS: &str = "\
# Task
Generate topical tags for each of the numbered news articles in the input and output them as JSON.

# Rules
- Output nothing but the data.
- Output one entry per article, in the same order as the input numbering (entry 1 for article 1, and so on).
- Give every article at least one tag.
- Write tags in the language of the articles.
- IMPORTANT: when a tag means the same as a tag in the existing tag list below, use the existing spelling instead.
  Examples: \"ベースボール\" -> \"野球\", \"テック\" -> \"テクノロジー\".
";

const OUTPUT_FORMAT: &str = "\
# Output format
Example for three input articles:
[
    [\"政治\", \"外交\"],
    [\"経済\", \"株式\"],
    [\"スポーツ\", \"野球\"]
]
";

/// System instruction embedding the known vocabulary as a sorted JSON array.
pub fn system_prompt(vocabulary: &BTreeSet<String>) -> String {
    let vocab_json = serde_json::to_string(vocabulary).unwrap_or_else(|_| "[]".to_string());
    format!("{INSTRUCTIONS}\n# Existing tags\n{vocab_json}\n\n{OUTPUT_FORMAT}")
}

/// `1. <title> <description>` per item, one line each, numbered from 1.
pub fn user_content(items: &[NewsItem]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, it)| format!("{}. {}", i + 1, single_line(&it.classification_text())))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_request(items: &[NewsItem], vocabulary: &BTreeSet<String>) -> CompletionRequest {
    CompletionRequest {
        system_prompt: system_prompt(vocabulary),
        user_content: user_content(items),
        sampling: BATCH_SAMPLING,
    }
}

/// True for lines produced by `user_content` (`<n>. ...`).
pub fn is_numbered_line(line: &str) -> bool {
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    digits > 0 && line[digits..].starts_with(". ")
}

// Keeps the numbering unambiguous when a description spans several lines.
fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, description: &str) -> NewsItem {
        NewsItem {
            title: title.to_string(),
            link: format!("https://x.test/{title}"),
            description: description.to_string(),
            pub_date: String::new(),
            tags: Vec::new(),
        }
    }

    #[test]
    fn items_are_numbered_from_one() {
        let items = vec![item("円安進む", "為替市場で"), item("大谷が本塁打", "")];
        let content = user_content(&items);
        assert_eq!(content, "1. 円安進む 為替市場で\n2. 大谷が本塁打");
    }

    #[test]
    fn multiline_description_stays_on_its_line() {
        let content = user_content(&[item("a", "line one\nline two")]);
        assert_eq!(content, "1. a line one line two");
        assert_eq!(content.lines().filter(|l| is_numbered_line(l)).count(), 1);
    }

    #[test]
    fn vocabulary_is_embedded_sorted() {
        let vocab: BTreeSet<String> = ["経済", "スポーツ", "政治"]
            .into_iter()
            .map(String::from)
            .collect();
        let sys = system_prompt(&vocab);
        let expected = serde_json::to_string(&vocab).unwrap();
        assert!(sys.contains(&expected));
        assert!(sys.contains("at least one tag"));
        assert!(sys.contains("existing spelling"));
    }

    #[test]
    fn empty_vocabulary_is_an_empty_list() {
        assert!(system_prompt(&BTreeSet::new()).contains("# Existing tags\n[]\n"));
    }

    #[test]
    fn sampling_is_fixed() {
        let req = build_request(&[item("a", "b")], &BTreeSet::new());
        assert_eq!(req.sampling.temperature, 0.0);
        assert_eq!(req.sampling.top_p, 1.0);
        assert_eq!(req.sampling.max_output_tokens, 4096);
    }

    #[test]
    fn numbered_line_detection() {
        assert!(is_numbered_line("12. foo"));
        assert!(!is_numbered_line("foo. bar"));
        assert!(!is_numbered_line("3.bar"));
    }
}
