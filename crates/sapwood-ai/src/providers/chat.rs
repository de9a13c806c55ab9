//! OpenAI-compatible chat completions client
//!
//! Shared by the OpenAI provider and the OpenRouter-backed Anthropic provider.

use crate::bridge::Completion;
use crate::error::InferenceError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub struct ChatClient {
    client: reqwest::Client,
    provider: String,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

impl ChatClient {
    pub fn new(
        provider: impl Into<String>,
        endpoint: impl Into<String>,
        api_key: String,
        model: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, InferenceError> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(ChatClient {
            client,
            provider: provider.into(),
            endpoint: endpoint.into(),
            api_key,
            model: model.into(),
            temperature: 0.2,
            max_tokens: 600,
        })
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<Completion, InferenceError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Api {
                provider: self.provider.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = response.json().await?;
        let text = chat
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| InferenceError::MalformedResponse("response has no choices".to_string()))?;
        let (input_tokens, output_tokens) = chat
            .usage
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or((0, 0));
        tracing::debug!("{} returned {} input / {} output tokens", self.provider, input_tokens, output_tokens);

        Ok(Completion::new(text, input_tokens, output_tokens))
    }
}
