//! Symbol table for best-effort, name-based cross-file resolution
//!
//! Resolution is deliberately imprecise: when several entities share a name,
//! a candidate from the referencing file wins, otherwise the first
//! registered candidate wins. No type information is consulted.

use crate::model::{EntityDetail, Relation};
use crate::parser::RawReference;
use crate::store::EntityStore;
use dashmap::DashMap;
use std::path::{Path, PathBuf};

/// Symbol table mapping names to entity ids. Thread-safe for concurrent access.
pub struct SymbolTable {
    symbols: DashMap<String, Vec<Candidate>>,
    /// For fast file lookup: file path -> names registered from that file
    file_symbols: DashMap<PathBuf, Vec<String>>,
}

#[derive(Debug, Clone)]
struct Candidate {
    id: String,
    file: PathBuf,
}

/// Outcome of resolving a batch of references.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionStats {
    pub resolved: usize,
    pub unresolved: usize,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            symbols: DashMap::new(),
            file_symbols: DashMap::new(),
        }
    }

    /// Register every definition in the store. Files and imports are not
    /// call targets and are skipped.
    pub fn from_store(store: &EntityStore) -> Self {
        let table = SymbolTable::new();
        for entity in store.entities() {
            match &entity.detail {
                EntityDetail::File { .. } | EntityDetail::Import { .. } => continue,
                EntityDetail::Method { owner, .. } => {
                    let qualified = format!("{}::{}", owner, entity.name);
                    table.insert(qualified, entity.id.clone(), entity.file_path());
                }
                _ => {}
            }
            table.insert(entity.name.clone(), entity.id.clone(), entity.file_path());
        }
        table
    }

    /// Insert a symbol. Later candidates for the same name are kept behind earlier ones.
    pub fn insert(&self, name: String, id: String, file_path: &Path) {
        self.symbols
            .entry(name.clone())
            .or_insert_with(Vec::new)
            .push(Candidate {
                id,
                file: file_path.to_path_buf(),
            });
        self.file_symbols
            .entry(file_path.to_path_buf())
            .or_insert_with(Vec::new)
            .push(name);
    }

    /// Look up all ids registered under a name.
    pub fn lookup(&self, name: &str) -> Vec<String> {
        self.symbols
            .get(name)
            .map(|r| r.value().iter().map(|c| c.id.clone()).collect())
            .unwrap_or_default()
    }

    /// Pick one target for `name` as seen from `from_file`, never `exclude`.
    ///
    /// Tries the full name first, then its last path segment (`a::b::c`,
    /// `a.b.c` -> `c`).
    pub fn resolve(&self, name: &str, from_file: Option<&Path>, exclude: &str) -> Option<String> {
        let last_segment = name
            .rsplit(|c: char| c == ':' || c == '.')
            .find(|s| !s.is_empty())
            .unwrap_or(name);

        for key in [name, last_segment] {
            let Some(candidates) = self.symbols.get(key) else {
                continue;
            };
            let eligible = || candidates.iter().filter(|c| c.id != exclude);
            let same_file = from_file.and_then(|f| eligible().find(|c| c.file == f));
            if let Some(c) = same_file.or_else(|| eligible().next()) {
                return Some(c.id.clone());
            }
        }
        None
    }

    /// Resolve raw references against this table and add the resulting
    /// relations to the store.
    pub fn resolve_into(&self, store: &mut EntityStore, references: &[RawReference]) -> ResolutionStats {
        let mut stats = ResolutionStats::default();
        for reference in references {
            let from_file = store
                .entity(&reference.source_id)
                .map(|e| e.file_path().to_path_buf());
            let target = self.resolve(&reference.target_name, from_file.as_deref(), &reference.source_id);
            let added = target.is_some_and(|target| {
                store.add_relation(
                    Relation::new(reference.source_id.clone(), target, reference.kind)
                        .with_weight(reference.weight),
                )
            });
            if added {
                stats.resolved += 1;
            } else {
                tracing::debug!(
                    "Unresolved {} reference from {} to {}",
                    reference.kind.as_str(),
                    reference.source_id,
                    reference.target_name
                );
                stats.unresolved += 1;
            }
        }
        stats
    }

    /// Get all names registered from a file.
    pub fn symbols_in_file(&self, file_path: &Path) -> Vec<String> {
        self.file_symbols
            .get(file_path)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    /// Remove all symbols for a file (useful for incremental re-indexing).
    pub fn remove_file(&self, file_path: &Path) {
        if let Some((_, names)) = self.file_symbols.remove(file_path) {
            for name in names {
                if let Some(mut candidates) = self.symbols.get_mut(&name) {
                    candidates.retain(|c| c.file != file_path);
                }
                self.symbols.remove_if(&name, |_, v| v.is_empty());
            }
        }
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
