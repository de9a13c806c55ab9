//! Prompt templates for summarization
//!
//! Dependency context is built only from already-produced summaries: name,
//! kind and the one-line short form. Raw source of dependencies never
//! reaches a prompt.

use sapwood_core::{Entity, EntityKind, EntityStore, Summary, WorkspaceType};
use std::collections::BTreeSet;

/// Size limits applied while building prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptLimits {
    pub max_dependencies: usize,
    pub max_summary_chars: usize,
    pub max_content_chars: usize,
}

impl Default for PromptLimits {
    fn default() -> Self {
        PromptLimits {
            max_dependencies: 12,
            max_summary_chars: 200,
            max_content_chars: 6000,
        }
    }
}

/// Short form of one dependency as shown to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextItem {
    pub name: String,
    pub kind: EntityKind,
    pub summary: String,
}

/// Repository-level facts for the architecture prompt.
#[derive(Debug, Clone, Default)]
pub struct ProjectContext {
    pub name: String,
    pub workspace: Option<WorkspaceType>,
}

/// Context items for `entity_id`: one per distinct dependency that already
/// has a summary, ordered by id and capped at `limits.max_dependencies`.
pub fn dependency_context(
    store: &EntityStore,
    entity_id: &str,
    produced: impl Fn(&str) -> Option<Summary>,
    limits: &PromptLimits,
) -> Vec<ContextItem> {
    let dependencies: BTreeSet<String> = store
        .dependencies_of(entity_id)
        .into_iter()
        .map(|(id, _)| id)
        .filter(|id| id != entity_id)
        .collect();
    dependencies
        .iter()
        .filter_map(|id| {
            let entity = store.entity(id)?;
            let summary = produced(id.as_str())?;
            Some(ContextItem {
                name: entity.name.clone(),
                kind: entity.kind(),
                summary: truncate(&summary.summary, limits.max_summary_chars),
            })
        })
        .take(limits.max_dependencies)
        .collect()
}

pub const ENTITY_SYSTEM_PROMPT: &str = r#"You are a senior engineer documenting a codebase. You summarize one code entity at a time.

Rules:
1. Describe what the entity does and why a caller would use it, not how each line works
2. Use the dependency summaries as ground truth for what called code does
3. Keep "summary" to one sentence of at most 25 words
4. Return only valid JSON in the requested format"#;

pub const MODULE_SYSTEM_PROMPT: &str = r#"You are a senior engineer documenting a codebase. You summarize a module (one directory) from the summaries of its members.

Return only valid JSON in the requested format. Keep "summary" to one sentence."#;

pub const ARCHITECTURE_SYSTEM_PROMPT: &str = r#"You are a software architect. You describe the overall architecture of a repository from the summaries of its modules.

Return only valid JSON in the requested format. Keep "summary" to one or two sentences."#;

const RESPONSE_FORMAT: &str = r#"Return a JSON object:
{
  "summary": "One-line summary",
  "description": "A short paragraph",
  "responsibilities": ["responsibility", "..."]
}"#;

/// Generate a prompt for one entity.
pub fn entity_prompt(entity: &Entity, context: &[ContextItem], limits: &PromptLimits) -> String {
    let mut prompt = String::new();
    prompt.push_str(&format!("Summarize this {}.\n\n", entity.kind()));
    prompt.push_str(&format!("Name: {}\n", entity.name));
    prompt.push_str(&format!("Kind: {}\n", entity.kind()));
    prompt.push_str(&format!("Language: {}\n", entity.language.as_str()));
    prompt.push_str(&format!(
        "Location: {}:{}-{}\n",
        entity.file_path().display(),
        entity.location.line_start,
        entity.location.line_end
    ));
    if let Some(signature) = entity.detail.signature() {
        prompt.push_str(&format!("Signature: {}\n", signature));
    }
    if let Some(doc) = entity.docstring.as_deref().filter(|d| !d.trim().is_empty()) {
        let doc = doc.split_whitespace().collect::<Vec<_>>().join(" ");
        prompt.push_str(&format!("Docstring: {}\n", truncate(&doc, limits.max_summary_chars)));
    }

    prompt.push_str("\nDependencies (already summarized):\n");
    push_items(&mut prompt, context);

    prompt.push_str(&format!(
        "\nSource:\n```{}\n{}\n```\n\n{}",
        entity.language.as_str(),
        truncate(&entity.content, limits.max_content_chars),
        RESPONSE_FORMAT
    ));
    prompt
}

/// Generate a prompt for one module from its members' short forms.
pub fn module_prompt(label: &str, members: &[ContextItem]) -> String {
    let mut prompt = format!("Summarize this module.\n\nName: {}\nKind: module\n\nMembers:\n", label);
    push_items(&mut prompt, members);
    prompt.push('\n');
    prompt.push_str(RESPONSE_FORMAT);
    prompt
}

/// Generate the architecture prompt from module summaries `(label, summary)`.
pub fn architecture_prompt(project: &ProjectContext, modules: &[(String, String)]) -> String {
    let mut prompt = format!(
        "Describe the architecture of this repository.\n\nName: {}\nKind: architecture\n",
        project.name
    );
    if let Some(workspace) = project.workspace {
        prompt.push_str(&format!("Project type: {}\n", workspace));
    }
    prompt.push_str("\nModules:\n");
    if modules.is_empty() {
        prompt.push_str("- none\n");
    }
    for (label, summary) in modules {
        prompt.push_str(&format!("- {}: {}\n", label, summary));
    }
    prompt.push('\n');
    prompt.push_str(RESPONSE_FORMAT);
    prompt
}

fn push_items(prompt: &mut String, items: &[ContextItem]) {
    if items.is_empty() {
        prompt.push_str("- none\n");
    }
    for item in items {
        prompt.push_str(&format!("- {} ({}): {}\n", item.name, item.kind, item.summary));
    }
}

/// Cut `text` to at most `max_chars` characters, marking the cut.
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}
