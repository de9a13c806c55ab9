//! Language extractors for different programming languages

pub mod python;
pub mod rust;

use crate::parser_pool::Grammar;
use sapwood_core::{Language, ParsedFile, SourceParser};
use std::path::Path;

/// Get the appropriate parser for a file based on its extension
pub fn get_parser(path: &Path) -> Option<Box<dyn SourceParser>> {
    parser_for(Grammar::from_path(path)?)
}

fn parser_for(grammar: Grammar) -> Option<Box<dyn SourceParser>> {
    match grammar {
        Grammar::Rust => Some(Box::new(rust::RustParser)),
        Grammar::Python => Some(Box::new(python::PythonParser)),
    }
}

/// Every language the indexer has a grammar for.
pub const SUPPORTED_LANGUAGES: &[Language] = &[Language::Rust, Language::Python];

/// Dispatches files to the parser of their language, limited to the
/// enabled languages.
pub struct LanguageRegistry {
    parsers: Vec<(Language, Box<dyn SourceParser>)>,
}

impl LanguageRegistry {
    /// `enabled` empty means every supported language.
    pub fn new(enabled: &[Language]) -> Self {
        let parsers = SUPPORTED_LANGUAGES
            .iter()
            .copied()
            .filter(|lang| enabled.is_empty() || enabled.contains(lang))
            .filter_map(|lang| Some((lang, parser_for(Grammar::for_language(lang)?)?)))
            .collect();
        LanguageRegistry { parsers }
    }

    pub fn languages(&self) -> Vec<Language> {
        self.parsers.iter().map(|(lang, _)| *lang).collect()
    }

    pub fn supports(&self, path: &Path) -> bool {
        let language = Language::from_path(path);
        self.parsers.iter().any(|(lang, _)| *lang == language)
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl SourceParser for LanguageRegistry {
    fn parse(&self, path: &Path, source: &str) -> Option<ParsedFile> {
        let language = Language::from_path(path);
        let (_, parser) = self.parsers.iter().find(|(lang, _)| *lang == language)?;
        parser.parse(path, source)
    }
}
