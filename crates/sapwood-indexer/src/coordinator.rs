//! Orchestrates parallel indexing

use crate::config::IndexOptions;
use crate::languages::LanguageRegistry;
use crate::walker;
use anyhow::{Context, Result};
use rayon::prelude::*;
use sapwood_core::{CoreError, EntityStore, ParsedFile, RawReference, SourceParser, SymbolTable};
use serde::Serialize;
use std::path::Path;

/// Counts from one indexing pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub files_found: usize,
    pub files_parsed: usize,
    pub entities: usize,
    pub relations: usize,
    pub duplicates: usize,
    pub resolved_references: usize,
    pub unresolved_references: usize,
}

/// A populated store plus what it took to build it.
#[derive(Debug)]
pub struct IndexResult {
    pub store: EntityStore,
    pub stats: IndexStats,
}

pub struct Coordinator {
    options: IndexOptions,
    registry: LanguageRegistry,
}

impl Coordinator {
    pub fn new(options: IndexOptions) -> Self {
        let registry = LanguageRegistry::new(&options.languages);
        Coordinator { options, registry }
    }

    pub fn options(&self) -> &IndexOptions {
        &self.options
    }

    /// Walk `root`, parse every supported file in parallel, then resolve
    /// cross-file references against the finished store.
    pub fn run_full_index(&self, root: &Path) -> Result<IndexResult> {
        let root = root
            .canonicalize()
            .with_context(|| format!("Cannot open repository root {}", root.display()))?;
        let files = walker::collect_files(&root, &self.options, &self.registry)?;

        let parsed: Vec<ParsedFile> = files
            .par_iter()
            .filter_map(|relative| {
                let source = match std::fs::read_to_string(root.join(relative)) {
                    Ok(source) => source,
                    Err(e) => {
                        tracing::warn!("Skipping {}: {}", relative.display(), e);
                        return None;
                    }
                };
                self.registry.parse(relative, &source)
            })
            .collect();

        let mut stats = IndexStats {
            files_found: files.len(),
            files_parsed: parsed.len(),
            ..IndexStats::default()
        };
        let mut store = EntityStore::new();
        let mut relations = Vec::new();
        let mut references: Vec<RawReference> = Vec::new();
        for file in parsed {
            for entity in file.entities {
                match store.add_entity(entity) {
                    Ok(()) => {}
                    Err(CoreError::DuplicateId(id)) => {
                        tracing::warn!("Duplicate entity id {}, keeping the first", id);
                        stats.duplicates += 1;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            relations.extend(file.relations);
            references.extend(file.references);
        }
        for relation in relations {
            store.add_relation(relation);
        }

        let symbols = SymbolTable::from_store(&store);
        let resolution = symbols.resolve_into(&mut store, &references);
        stats.entities = store.len();
        stats.relations = store.relation_count();
        stats.resolved_references = resolution.resolved;
        stats.unresolved_references = resolution.unresolved;

        tracing::info!(
            "Indexed {} files: {} entities, {} relations ({} of {} references resolved)",
            stats.files_parsed,
            stats.entities,
            stats.relations,
            stats.resolved_references,
            references.len()
        );
        Ok(IndexResult { store, stats })
    }
}

/// Index `root` with `options`.
pub fn index_repository(root: &Path, options: &IndexOptions) -> Result<IndexResult> {
    Coordinator::new(options.clone()).run_full_index(root)
}
