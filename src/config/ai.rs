// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

pub const DEFAULT_AI_CONFIG_PATH: &str = "config/ai.json";
pub const ENV_GEMINI_TOKEN: &str = "GEMINI_TOKEN";

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    "gemini-2.5-flash-lite".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Only "gemini" is wired (case-insensitive).
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from GEMINI_TOKEN.
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            provider: default_provider(),
            model: default_model(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AiConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let cfg: AiConfig = serde_json::from_str(&data)?;
        Ok(cfg.resolved())
    }

    /// `config/ai.json` if readable, otherwise defaults with the key taken from env.
    pub fn load_default() -> Self {
        match Self::load_from_file(DEFAULT_AI_CONFIG_PATH) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::debug!(error = ?e, "no usable AI config file, using defaults");
                Self {
                    api_key: default_api_key(),
                    ..Self::default()
                }
                .resolved()
            }
        }
    }

    fn resolved(mut self) -> Self {
        self.provider = self.provider.trim().to_lowercase();

        // A missing env key is not fatal: every call then fails and items
        // are tagged with the default tag.
        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = env::var(ENV_GEMINI_TOKEN).unwrap_or_default();
        }

        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout_secs();
        }
        self
    }
}
