//! AI adapter: text-completion abstraction + concrete providers.
//!
//! The rest of the crate only sees `CompletionClient`: a system instruction
//! and user content go in, free text (or an error) comes out.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ai::AiConfig;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplingConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

/// Everything a provider needs for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_content: String,
    pub sampling: SamplingConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("completion client is disabled")]
    Disabled,
    #[error("no API key configured")]
    MissingApiKey,
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("provider returned no text")]
    EmptyResponse,
}

/// Trait object used by the tagging pipeline (and tests).
pub trait CompletionClient: Send + Sync {
    fn complete<'a>(
        &'a self,
        req: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, CompletionError>> + Send + 'a>>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynCompletionClient = Arc<dyn CompletionClient>;

/// Factory: build a client according to config and environment variables.
///
/// * If `AI_TEST_MODE=mock`, returns an offline mock that tags every item `["mock"]`.
/// * Else if `config.enabled==false`, returns a disabled client.
/// * Else builds the configured provider.
pub fn build_client_from_config(config: &AiConfig) -> DynCompletionClient {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockProvider::per_item("mock"));
    }

    if !config.enabled {
        return Arc::new(DisabledClient);
    }

    match config.provider.as_str() {
        "gemini" => match GeminiProvider::new(config) {
            Ok(p) => Arc::new(p),
            Err(e) => {
                tracing::warn!(error = ?e, "cannot build gemini client, tagging disabled");
                Arc::new(DisabledClient)
            }
        },
        other => {
            tracing::warn!(provider = other, "unsupported AI provider, tagging disabled");
            Arc::new(DisabledClient)
        }
    }
}

// ------------------------------------------------------------
// Gemini
// ------------------------------------------------------------

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Google Generative Language API (`generateContent`).
pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(config: &AiConfig) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder()
            .user_agent("ncc-ai-news/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    /// Point the client at another host (local proxies, tests).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn complete_impl(&self, req: &CompletionRequest) -> Result<String, CompletionError> {
        if self.api_key.is_empty() {
            return Err(CompletionError::MissingApiKey);
        }

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = GenerateRequest::from(req);

        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = resp.json().await?;
        let text = parsed.first_text();
        if text.trim().is_empty() {
            return Err(CompletionError::EmptyResponse);
        }
        Ok(text)
    }
}

impl CompletionClient for GeminiProvider {
    fn complete<'a>(
        &'a self,
        req: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, CompletionError>> + Send + 'a>> {
        Box::pin(self.complete_impl(req))
    }
    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<PartOut<'a>>,
}

#[derive(Serialize)]
struct PartOut<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
}

impl<'a> From<&'a CompletionRequest> for GenerateRequest<'a> {
    fn from(req: &'a CompletionRequest) -> Self {
        Self {
            system_instruction: Content {
                role: None,
                parts: vec![PartOut {
                    text: &req.system_prompt,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![PartOut {
                    text: &req.user_content,
                }],
            }],
            generation_config: GenerationConfig {
                temperature: req.sampling.temperature,
                top_p: req.sampling.top_p,
                max_output_tokens: req.sampling.max_output_tokens,
            },
        }
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<PartIn>,
}

#[derive(Deserialize)]
struct PartIn {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    fn first_text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default()
    }
}

// ------------------------------------------------------------
// Disabled + mock
// ------------------------------------------------------------

/// Fails every call; used when AI is disabled.
pub struct DisabledClient;

impl CompletionClient for DisabledClient {
    fn complete<'a>(
        &'a self,
        _req: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, CompletionError>> + Send + 'a>> {
        Box::pin(async { Err(CompletionError::Disabled) })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

#[derive(Clone)]
enum MockReply {
    Fixed(String),
    Fail,
    PerItem(String),
}

/// Deterministic provider for tests/local runs. Counts how often it was called.
pub struct MockProvider {
    reply: MockReply,
    calls: AtomicUsize,
}

impl MockProvider {
    /// Always answers with `text`, verbatim.
    pub fn replying(text: &str) -> Self {
        Self::with(MockReply::Fixed(text.to_string()))
    }

    /// Always fails as if the service were unreachable.
    pub fn failing() -> Self {
        Self::with(MockReply::Fail)
    }

    /// Answers `[[tag], [tag], ...]` with one entry per numbered input line.
    pub fn per_item(tag: &str) -> Self {
        Self::with(MockReply::PerItem(tag.to_string()))
    }

    fn with(reply: MockReply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CompletionClient for MockProvider {
    fn complete<'a>(
        &'a self,
        req: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, CompletionError>> + Send + 'a>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let out = match &self.reply {
            MockReply::Fixed(s) => Ok(s.clone()),
            MockReply::Fail => Err(CompletionError::EmptyResponse),
            MockReply::PerItem(tag) => {
                let n = req
                    .user_content
                    .lines()
                    .filter(|l| crate::classify::prompt::is_numbered_line(l))
                    .count();
                let rows = vec![vec![tag.clone()]; n];
                Ok(serde_json::to_string(&rows).unwrap_or_else(|_| "[]".to_string()))
            }
        };
        Box::pin(async move { out })
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(user: &str) -> CompletionRequest {
        CompletionRequest {
            system_prompt: "sys".into(),
            user_content: user.into(),
            sampling: SamplingConfig {
                temperature: 0.0,
                top_p: 1.0,
                max_output_tokens: 4096,
            },
        }
    }

    #[test]
    fn gemini_body_shape() {
        let r = req("1. hello");
        let body = serde_json::to_value(GenerateRequest::from(&r)).unwrap();
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "sys");
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "1. hello");
        assert_eq!(body["generationConfig"]["temperature"], 0.0);
        assert_eq!(body["generationConfig"]["topP"], 1.0);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 4096);
    }

    #[test]
    fn gemini_response_text_parts_are_joined() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"[[\"a\"],"},{"text":"[\"b\"]]"}],"role":"model"}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.first_text(), r#"[["a"],["b"]]"#);

        let empty: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.first_text(), "");
    }

    #[tokio::test]
    async fn gemini_without_key_fails_fast() {
        let cfg = AiConfig {
            api_key: String::new(),
            ..AiConfig::default()
        };
        let p = GeminiProvider::new(&cfg).unwrap();
        let err = p.complete(&req("1. x")).await.unwrap_err();
        assert!(matches!(err, CompletionError::MissingApiKey));
    }

    #[tokio::test]
    async fn disabled_client_errors() {
        let err = DisabledClient.complete(&req("1. x")).await.unwrap_err();
        assert!(matches!(err, CompletionError::Disabled));
    }

    #[tokio::test]
    async fn per_item_mock_matches_numbered_lines() {
        let m = MockProvider::per_item("mock");
        let out = m.complete(&req("1. first\n2. second")).await.unwrap();
        assert_eq!(out, r#"[["mock"],["mock"]]"#);
        assert_eq!(m.calls(), 1);
    }
}
