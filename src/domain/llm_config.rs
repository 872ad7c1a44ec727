use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum LLMProvider {
    #[default]
    OpenAI,
    OpenRouter,
    /// Any OpenAI-compatible server, e.g. LM Studio or llama.cpp.
    Local,
}

impl LLMProvider {
    pub fn default_base_url(self) -> &'static str {
        match self {
            LLMProvider::OpenAI => "https://api.openai.com/v1",
            LLMProvider::OpenRouter => "https://openrouter.ai/api/v1",
            LLMProvider::Local => "http://localhost:1234/v1",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    /// Falls back to the provider's public endpoint when unset.
    pub base_url: Option<String>,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Request timeout for a single completion call.
    pub timeout_secs: u64,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::OpenAI,
            base_url: None,
            model: "gpt-4o-mini".to_string(),
            max_tokens: Some(1024),
            temperature: Some(0.0),
            timeout_secs: 120,
        }
    }
}

impl LLMConfig {
    pub fn endpoint(&self) -> &str {
        match self.base_url.as_deref() {
            Some(url) if !url.trim().is_empty() => url,
            _ => self.provider.default_base_url(),
        }
    }
}

/// API key for the model provider. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Returns `None` for a blank key, which counts as missing.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}
