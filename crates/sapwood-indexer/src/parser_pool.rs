//! Per-thread tree-sitter parsers
//!
//! `tree_sitter::Parser` is not `Sync`, so every worker thread keeps its own
//! parser per grammar and reuses it across files.

use anyhow::{Result, anyhow};
use sapwood_core::Language;
use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::Path;
use tree_sitter::{Parser, Tree};

/// Grammars the indexer can parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grammar {
    Rust,
    Python,
}

impl Grammar {
    /// Determine the grammar from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        Self::for_language(Language::from_path(path))
    }

    pub fn for_language(language: Language) -> Option<Self> {
        match language {
            Language::Rust => Some(Grammar::Rust),
            Language::Python => Some(Grammar::Python),
            _ => None,
        }
    }

    /// Get the tree-sitter language for this grammar
    pub fn language(&self) -> tree_sitter::Language {
        match self {
            Grammar::Rust => tree_sitter_rust::LANGUAGE.into(),
            Grammar::Python => tree_sitter_python::LANGUAGE.into(),
        }
    }
}

thread_local! {
    static PARSERS: RefCell<HashMap<Grammar, Parser>> = RefCell::new(HashMap::new());
}

/// Parse `source` with this thread's parser for `grammar`.
pub fn parse(grammar: Grammar, source: &str) -> Result<Tree> {
    PARSERS.with(|cell| {
        let mut parsers = cell.borrow_mut();
        let parser = match parsers.entry(grammar) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let mut parser = Parser::new();
                parser
                    .set_language(&grammar.language())
                    .map_err(|e| anyhow!("Failed to set language: {}", e))?;
                entry.insert(parser)
            }
        };
        parser
            .parse(source, None)
            .ok_or_else(|| anyhow!("Failed to parse content"))
    })
}
