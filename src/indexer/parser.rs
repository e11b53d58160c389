//! Native tree-sitter parser wrapper.
//!
//! Grammars are statically linked. `CodeParser` carries no state: a
//! tree-sitter `Parser` is `!Sync`, so every call builds a fresh one, which
//! lets the same `CodeParser` be shared across rayon workers.

use std::path::Path;

use crate::error::{CallGraphError, Result};
use crate::types::Language;

const UTF8_BOM: char = '\u{feff}';

/// Thin wrapper around native tree-sitter parsing.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeParser;

impl CodeParser {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parse `content` with the grammar for `language`.
    ///
    /// `path` only labels errors.
    pub fn parse(&self, path: &Path, content: &str, language: Language) -> Result<tree_sitter::Tree> {
        let ts_lang = Self::get_ts_language(language);

        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&ts_lang)
            .map_err(|e| CallGraphError::parse(path, format!("language version mismatch: {e}")))?;

        parser.parse(content, None).ok_or_else(|| {
            CallGraphError::parse(path, "tree-sitter returned no tree (timeout or cancellation)")
        })
    }

    /// Native `tree_sitter::Language` for a [`Language`] variant.
    #[must_use]
    pub fn get_ts_language(language: Language) -> tree_sitter::Language {
        match language {
            Language::CSharp => tree_sitter_c_sharp::LANGUAGE.into(),
            Language::Java => tree_sitter_java::LANGUAGE.into(),
        }
    }

    /// Read a source file as UTF-8, dropping a leading byte-order mark.
    pub fn read_source(path: &Path) -> Result<String> {
        let bytes = std::fs::read(path).map_err(|e| CallGraphError::parse(path, e.to_string()))?;
        let text = String::from_utf8(bytes)
            .map_err(|e| CallGraphError::parse(path, format!("not valid UTF-8: {e}")))?;
        Ok(match text.strip_prefix(UTF8_BOM) {
            Some(stripped) => stripped.to_string(),
            None => text,
        })
    }

    /// Detect the [`Language`] for a file path based on its extension.
    #[must_use]
    pub fn detect_language(file_path: &Path) -> Option<Language> {
        file_path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(|e| Language::from_extension(&format!(".{e}")))
    }

    #[must_use]
    pub fn is_supported(file_path: &Path) -> bool {
        Self::detect_language(file_path).is_some()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
