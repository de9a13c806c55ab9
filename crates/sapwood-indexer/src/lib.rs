//! File discovery, parsing and symbol extraction

pub mod config;
pub mod coordinator;
pub mod extractor;
pub mod languages;
pub mod parser_pool;
pub mod walker;

#[cfg(test)]
mod tests;

pub use config::{DEFAULT_EXCLUDES, IndexOptions};
pub use coordinator::{Coordinator, IndexResult, IndexStats, index_repository};
pub use languages::{LanguageRegistry, SUPPORTED_LANGUAGES, get_parser};
pub use parser_pool::Grammar;
