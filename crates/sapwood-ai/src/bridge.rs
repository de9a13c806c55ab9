//! Boundary with the inference service

use crate::error::InferenceError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Text produced by one inference call plus its token counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Completion {
    pub fn new(text: impl Into<String>, input_tokens: u64, output_tokens: u64) -> Self {
        Completion {
            text: text.into(),
            input_tokens,
            output_tokens,
        }
    }

    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Inference backend for different LLM providers
#[async_trait::async_trait]
pub trait InferenceProvider: Send + Sync {
    /// Run one system + user prompt pair.
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<Completion, InferenceError>;

    /// Get provider name
    fn name(&self) -> &str;

    /// Identity recorded on cache entries. A different identity makes every
    /// cached summary a miss.
    fn model_identity(&self) -> String;
}

/// Provider selection and request settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// `openai`, `anthropic` or `local`.
    pub provider: String,
    /// Provider default when unset.
    pub model: Option<String>,
    /// Explicit key; takes precedence over `api_key_env`.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Environment variable holding the key. Provider default when unset.
    pub api_key_env: Option<String>,
    /// Override the chat completions endpoint.
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Transport-level timeout; the orchestrator applies its own per call.
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            provider: "local".to_string(),
            model: None,
            api_key: None,
            api_key_env: None,
            base_url: None,
            temperature: 0.2,
            max_tokens: 600,
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl ProviderConfig {
    pub fn named(provider: impl Into<String>) -> Self {
        ProviderConfig {
            provider: provider.into(),
            ..ProviderConfig::default()
        }
    }

    /// Resolve the API key from the explicit value or the environment.
    pub fn resolve_api_key(&self, default_env: &str) -> Result<String, InferenceError> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Ok(key.clone());
        }
        let env_var = self.api_key_env.as_deref().unwrap_or(default_env);
        std::env::var(env_var)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| InferenceError::MissingApiKey {
                provider: self.provider.clone(),
                env_var: env_var.to_string(),
            })
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
