//! Inference provider implementations

pub mod anthropic;
pub mod chat;
pub mod local;
pub mod openai;

use crate::bridge::{InferenceProvider, ProviderConfig};
use crate::error::InferenceError;
use std::sync::Arc;

/// Factory function to create inference providers
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn InferenceProvider>, InferenceError> {
    let provider: Arc<dyn InferenceProvider> = match config.provider.as_str() {
        "openai" => Arc::new(openai::OpenAIProvider::new(config)?),
        "anthropic" | "openrouter" => Arc::new(anthropic::AnthropicProvider::new(config)?),
        "local" => Arc::new(local::LocalProvider::new()),
        other => return Err(InferenceError::UnknownProvider(other.to_string())),
    };
    tracing::info!("Using inference provider {} ({})", provider.name(), provider.model_identity());
    Ok(provider)
}
