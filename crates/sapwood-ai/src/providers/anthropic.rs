//! Anthropic Claude provider, reached through OpenRouter

use super::chat::ChatClient;
use crate::bridge::{Completion, InferenceProvider, ProviderConfig};
use crate::error::InferenceError;

pub const OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const OPENROUTER_KEY_ENV: &str = "OPENROUTER_API_KEY";
/// OpenRouter model naming
pub const ANTHROPIC_DEFAULT_MODEL: &str = "anthropic/claude-3-haiku-20240307";

pub struct AnthropicProvider {
    chat: ChatClient,
}

impl AnthropicProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, InferenceError> {
        let api_key = config.resolve_api_key(OPENROUTER_KEY_ENV)?;
        let chat = ChatClient::new(
            "Anthropic",
            config.base_url.as_deref().unwrap_or(OPENROUTER_ENDPOINT),
            api_key,
            config.model.as_deref().unwrap_or(ANTHROPIC_DEFAULT_MODEL),
            config.request_timeout,
        )?
        .with_sampling(config.temperature, config.max_tokens);
        Ok(AnthropicProvider { chat })
    }
}

#[async_trait::async_trait]
impl InferenceProvider for AnthropicProvider {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<Completion, InferenceError> {
        self.chat.complete(system_prompt, user_prompt).await
    }

    fn name(&self) -> &str {
        "Anthropic (OpenRouter)"
    }

    fn model_identity(&self) -> String {
        format!("openrouter/{}", self.chat.model())
    }
}
