//! Indexing options

use sapwood_core::Language;
use serde::{Deserialize, Serialize};

/// Directories never worth indexing.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "**/target/**",
    "**/.git/**",
    "**/node_modules/**",
    "**/__pycache__/**",
    "**/.venv/**",
    "**/venv/**",
    "**/.sapwood/**",
];

/// What to index and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexOptions {
    /// Extra glob patterns (relative to the root) to skip.
    pub exclude: Vec<String>,
    /// Languages to parse; empty means all supported.
    pub languages: Vec<Language>,
    /// Honour `.gitignore` and `.ignore` files.
    pub respect_gitignore: bool,
    /// Larger files are skipped.
    pub max_file_bytes: u64,
}

impl Default for IndexOptions {
    fn default() -> Self {
        IndexOptions {
            exclude: Vec::new(),
            languages: Vec::new(),
            respect_gitignore: true,
            max_file_bytes: 1024 * 1024,
        }
    }
}
