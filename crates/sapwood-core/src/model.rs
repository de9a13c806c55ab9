//! Core data structures for entities, relations and summaries

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Discriminates what kind of code entity an id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    File,
    Type,
    Function,
    Method,
    Import,
    Module,
    Constant,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::File => "file",
            EntityKind::Type => "type",
            EntityKind::Function => "function",
            EntityKind::Method => "method",
            EntityKind::Import => "import",
            EntityKind::Module => "module",
            EntityKind::Constant => "constant",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flavour of a type definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Struct,
    Enum,
    Union,
    Class,
    Trait,
    Interface,
    Alias,
}

/// Kind-specific data. The variant determines the entity's [`EntityKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityDetail {
    File {
        line_count: u32,
    },
    Type {
        type_kind: TypeKind,
        #[serde(default)]
        fields: Vec<String>,
    },
    Function {
        signature: Option<String>,
        #[serde(default)]
        is_async: bool,
    },
    Method {
        /// Receiver or enclosing type name.
        owner: String,
        signature: Option<String>,
        #[serde(default)]
        is_async: bool,
    },
    Import {
        module: String,
    },
    Module,
    Constant,
}

impl EntityDetail {
    /// A plain function with no signature information.
    pub fn function() -> Self {
        EntityDetail::Function {
            signature: None,
            is_async: false,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            EntityDetail::File { .. } => EntityKind::File,
            EntityDetail::Type { .. } => EntityKind::Type,
            EntityDetail::Function { .. } => EntityKind::Function,
            EntityDetail::Method { .. } => EntityKind::Method,
            EntityDetail::Import { .. } => EntityKind::Import,
            EntityDetail::Module => EntityKind::Module,
            EntityDetail::Constant => EntityKind::Constant,
        }
    }

    /// Signature line for callables, if the parser captured one.
    pub fn signature(&self) -> Option<&str> {
        match self {
            EntityDetail::Function { signature, .. } | EntityDetail::Method { signature, .. } => {
                signature.as_deref()
            }
            _ => None,
        }
    }
}

/// Supported languages for syntax-aware parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Rust,
    TypeScript,
    JavaScript,
    Python,
    Go,
    Java,
    C,
    Cpp,
    Other,
}

impl Language {
    /// Detect language from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("rs") => Language::Rust,
            Some("ts") | Some("tsx") => Language::TypeScript,
            Some("js") | Some("jsx") | Some("mjs") | Some("cjs") => Language::JavaScript,
            Some("py") | Some("pyi") => Language::Python,
            Some("go") => Language::Go,
            Some("java") => Language::Java,
            Some("c") | Some("h") => Language::C,
            Some("cpp") | Some("cc") | Some("cxx") | Some("hpp") | Some("hh") => Language::Cpp,
            _ => Language::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::Go => "go",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Other => "other",
        }
    }
}

/// Where an entity lives in the source tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: PathBuf,
    pub line_start: u32,
    pub line_end: u32,
}

impl Location {
    pub fn new(file: impl Into<PathBuf>, line_start: u32, line_end: u32) -> Self {
        Location {
            file: file.into(),
            line_start,
            line_end,
        }
    }
}

/// A single named code unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Stable across runs for the same logical code unit.
    pub id: String,
    pub name: String,
    pub detail: EntityDetail,
    pub language: Language,
    pub location: Location,
    /// Raw source text, used for hashing and as inference input.
    pub content: String,
    pub docstring: Option<String>,
}

impl Entity {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        detail: EntityDetail,
        location: Location,
    ) -> Self {
        let language = Language::from_path(&location.file);
        Entity {
            id: id.into(),
            name: name.into(),
            detail,
            language,
            location,
            content: String::new(),
            docstring: None,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_docstring(mut self, docstring: impl Into<String>) -> Self {
        self.docstring = Some(docstring.into());
        self
    }

    pub fn kind(&self) -> EntityKind {
        self.detail.kind()
    }

    pub fn file_path(&self) -> &Path {
        &self.location.file
    }
}

/// What kind of dependency a relation expresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Calls,
    Imports,
    Extends,
    Implements,
    UsesTrait,
    /// A container (file, type) depends on what it defines.
    Contains,
    References,
}

impl RelationKind {
    /// Weight the indexer assigns; higher weights are kept longer when cycles are cut.
    pub fn suggested_weight(&self) -> f32 {
        match self {
            RelationKind::Contains => 2.0,
            RelationKind::Extends | RelationKind::Implements | RelationKind::UsesTrait => 1.5,
            RelationKind::Calls | RelationKind::References => 1.0,
            RelationKind::Imports => 0.5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Calls => "calls",
            RelationKind::Imports => "imports",
            RelationKind::Extends => "extends",
            RelationKind::Implements => "implements",
            RelationKind::UsesTrait => "uses_trait",
            RelationKind::Contains => "contains",
            RelationKind::References => "references",
        }
    }
}

/// A directed edge: `source_id` depends on `target_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub source_id: String,
    pub target_id: String,
    pub kind: RelationKind,
    /// Tie-breaker when cutting cycles. Defaults to 1.0.
    pub weight: f32,
}

impl Relation {
    pub fn new(source_id: impl Into<String>, target_id: impl Into<String>, kind: RelationKind) -> Self {
        Relation {
            source_id: source_id.into(),
            target_id: target_id.into(),
            kind,
            weight: 1.0,
        }
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }
}

/// Granularity a summary describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryScope {
    Entity,
    Module,
    Architecture,
}

/// Token counters reported by the inference service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        TokenUsage {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.input_tokens += rhs.input_tokens;
        self.output_tokens += rhs.output_tokens;
    }
}

/// Model identity recorded on summaries that never reached the inference service.
pub const FALLBACK_MODEL: &str = "fallback";

/// Result of summarizing one entity, module or the whole architecture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub entity_id: String,
    pub scope: SummaryScope,
    /// One-line short form. This is what dependents see as context.
    pub summary: String,
    pub description: String,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub usage: TokenUsage,
    pub model_identity: String,
    /// Hash the summary was produced under.
    pub content_hash: String,
    #[serde(default)]
    pub fallback: bool,
}

impl Summary {
    /// Inference-free summary built from the entity's kind and name only.
    pub fn fallback_for(entity: &Entity, content_hash: impl Into<String>) -> Self {
        let kind = entity.kind();
        Summary {
            entity_id: entity.id.clone(),
            scope: SummaryScope::Entity,
            summary: format!("{} `{}`", capitalize(kind.as_str()), entity.name),
            description: format!(
                "{} {} (no generated summary available).",
                capitalize(kind.as_str()),
                entity.name
            ),
            responsibilities: Vec::new(),
            usage: TokenUsage::default(),
            model_identity: FALLBACK_MODEL.to_string(),
            content_hash: content_hash.into(),
            fallback: true,
        }
    }

    /// Inference-free summary for an aggregate (module or architecture).
    pub fn fallback_aggregate(
        id: impl Into<String>,
        scope: SummaryScope,
        label: &str,
        content_hash: impl Into<String>,
    ) -> Self {
        Summary {
            entity_id: id.into(),
            scope,
            summary: label.to_string(),
            description: format!("{} (no generated summary available).", label),
            responsibilities: Vec::new(),
            usage: TokenUsage::default(),
            model_identity: FALLBACK_MODEL.to_string(),
            content_hash: content_hash.into(),
            fallback: true,
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
