//! Error types for inference calls

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("{provider} API error ({status}): {body}")]
    Api {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("missing API key for {provider}: set {env_var}")]
    MissingApiKey { provider: String, env_var: String },

    #[error("token budget exhausted")]
    BudgetExhausted,

    #[error("unknown inference provider: {0}")]
    UnknownProvider(String),
}

impl InferenceError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            InferenceError::Transport(_) | InferenceError::Timeout(_) | InferenceError::MalformedResponse(_) => true,
            InferenceError::Api { status, .. } => *status == 429 || *status >= 500,
            InferenceError::MissingApiKey { .. }
            | InferenceError::BudgetExhausted
            | InferenceError::UnknownProvider(_) => false,
        }
    }
}

impl From<reqwest::Error> for InferenceError {
    fn from(err: reqwest::Error) -> Self {
        InferenceError::Transport(err.to_string())
    }
}
