//! Local provider for offline summarization
//!
//! Reads the `Name:`, `Kind:` and `Docstring:` lines of a prompt and the
//! dependency or member bullets below them, and answers with deterministic
//! JSON. No network access.

use crate::bridge::{Completion, InferenceProvider};
use crate::error::InferenceError;

pub const LOCAL_MODEL_IDENTITY: &str = "local/heuristic-v1";

pub struct LocalProvider;

impl LocalProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn field<'a>(prompt: &'a str, key: &str) -> Option<&'a str> {
    prompt
        .lines()
        .find_map(|line| line.strip_prefix(key))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Names from `- name (kind): summary` or `- label: summary` bullets.
fn bullet_names(prompt: &str) -> Vec<String> {
    prompt
        .lines()
        .take_while(|line| *line != "Source:")
        .filter_map(|line| line.strip_prefix("- "))
        .filter(|rest| *rest != "none")
        .filter_map(|rest| {
            let end = rest.find(" (").or_else(|| rest.find(':'))?;
            Some(rest[..end].to_string())
        })
        .collect()
}

/// Rough token estimate (~4 characters per token)
fn estimate_tokens(text: &str) -> u64 {
    (text.len() as u64).div_ceil(4)
}

#[async_trait::async_trait]
impl InferenceProvider for LocalProvider {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<Completion, InferenceError> {
        let name = field(user_prompt, "Name:").unwrap_or("unnamed");
        let kind = field(user_prompt, "Kind:").unwrap_or("entity");
        let names = bullet_names(user_prompt);

        let summary = match field(user_prompt, "Docstring:") {
            Some(doc) => format!("{} `{}`: {}", kind, name, doc.lines().next().unwrap_or(doc)),
            None => format!("{} `{}`", kind, name),
        };
        let description = if names.is_empty() {
            format!("The {} `{}` has no summarized dependencies.", kind, name)
        } else {
            format!("The {} `{}` builds on {}.", kind, name, names.join(", "))
        };
        let body = serde_json::json!({
            "summary": summary,
            "description": description,
            "responsibilities": names,
        });
        let text = body.to_string();

        Ok(Completion::new(
            text.clone(),
            estimate_tokens(system_prompt) + estimate_tokens(user_prompt),
            estimate_tokens(&text),
        ))
    }

    fn name(&self) -> &str {
        "Local (Heuristic)"
    }

    fn model_identity(&self) -> String {
        LOCAL_MODEL_IDENTITY.to_string()
    }
}
