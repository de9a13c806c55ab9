//! Boundary with language-specific parsers

use crate::model::{Entity, Relation, RelationKind};
use std::path::Path;

/// A relation whose target is only known by name.
///
/// Parsers see one file at a time, so calls into other files cannot be
/// resolved at parse time. [`SymbolTable::resolve_into`](crate::SymbolTable::resolve_into)
/// turns these into [`Relation`]s once every file is in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReference {
    pub source_id: String,
    /// Bare or qualified name (`helper`, `Store::insert`, `os.path.join`).
    pub target_name: String,
    pub kind: RelationKind,
    pub weight: f32,
}

impl RawReference {
    pub fn new(source_id: impl Into<String>, target_name: impl Into<String>, kind: RelationKind) -> Self {
        RawReference {
            source_id: source_id.into(),
            target_name: target_name.into(),
            kind,
            weight: kind.suggested_weight(),
        }
    }
}

/// Everything a parser extracted from one file.
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub entities: Vec<Entity>,
    /// Relations whose both endpoints are known (e.g. file contains function).
    pub relations: Vec<Relation>,
    pub references: Vec<RawReference>,
}

/// Produces entities and relations for a single source file.
pub trait SourceParser: Send + Sync {
    /// `None` when the file is not something this parser understands.
    fn parse(&self, path: &Path, source: &str) -> Option<ParsedFile>;
}
