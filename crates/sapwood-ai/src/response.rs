//! Parsing model output into summary fields

use crate::error::InferenceError;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

/// Fields a model is asked to return.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParsedSummary {
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub responsibilities: Vec<String>,
}

fn fence_regex() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").ok())
        .as_ref()
}

/// Extract the JSON object from a completion. Models like to wrap it in
/// code fences or add prose around it.
pub fn extract_json(text: &str) -> Option<&str> {
    let body = fence_regex()
        .and_then(|re| re.captures(text))
        .and_then(|c| c.get(1))
        .map_or(text, |m| m.as_str());
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (start < end).then(|| &body[start..=end])
}

/// Parse a completion into summary fields. An empty `summary` is malformed.
pub fn parse_summary(text: &str) -> Result<ParsedSummary, InferenceError> {
    let json_str = extract_json(text)
        .ok_or_else(|| InferenceError::MalformedResponse("no JSON object in response".to_string()))?;
    let mut parsed: ParsedSummary =
        serde_json::from_str(json_str).map_err(|e| InferenceError::MalformedResponse(e.to_string()))?;

    parsed.summary = parsed.summary.lines().next().unwrap_or_default().trim().to_string();
    if parsed.summary.is_empty() {
        return Err(InferenceError::MalformedResponse("empty summary".to_string()));
    }
    if parsed.description.trim().is_empty() {
        parsed.description = parsed.summary.clone();
    }
    parsed.responsibilities.retain(|r| !r.trim().is_empty());
    Ok(parsed)
}
