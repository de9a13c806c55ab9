//! OpenAI provider implementation

use super::chat::ChatClient;
use crate::bridge::{Completion, InferenceProvider, ProviderConfig};
use crate::error::InferenceError;

pub const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

pub struct OpenAIProvider {
    chat: ChatClient,
}

impl OpenAIProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, InferenceError> {
        let api_key = config.resolve_api_key(OPENAI_KEY_ENV)?;
        let chat = ChatClient::new(
            "OpenAI",
            config.base_url.as_deref().unwrap_or(OPENAI_ENDPOINT),
            api_key,
            config.model.as_deref().unwrap_or(OPENAI_DEFAULT_MODEL),
            config.request_timeout,
        )?
        .with_sampling(config.temperature, config.max_tokens);
        Ok(OpenAIProvider { chat })
    }
}

#[async_trait::async_trait]
impl InferenceProvider for OpenAIProvider {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<Completion, InferenceError> {
        self.chat.complete(system_prompt, user_prompt).await
    }

    fn name(&self) -> &str {
        "OpenAI"
    }

    fn model_identity(&self) -> String {
        format!("openai/{}", self.chat.model())
    }
}
