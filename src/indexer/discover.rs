//! Candidate source file selection.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};

use crate::indexer::parser::CodeParser;
use crate::types::Language;

/// An entry point reported by an external scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPoint {
    pub name: String,
    pub file: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Every supported source file under `root`, honouring `.gitignore`, sorted.
pub fn candidate_files(root: &Path) -> Vec<PathBuf> {
    let walker = WalkBuilder::new(root)
        .standard_filters(true)
        .hidden(true)
        .build();

    let mut files: Vec<PathBuf> = walker
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!(error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .map(ignore::DirEntry::into_path)
        .filter(|path| CodeParser::is_supported(path))
        .collect();
    files.sort();
    files
}

/// Unique files named by `entries`, in first-seen order. Relative paths are
/// joined onto `project_root`.
pub fn files_from_entrypoints(entries: &[EntryPoint], project_root: &Path) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .filter(|e| !e.file.trim().is_empty())
        .map(|e| {
            let path = Path::new(&e.file);
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                project_root.join(path)
            }
        })
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

/// Supported paths grouped by language; unsupported paths are dropped.
pub fn group_by_language(paths: &[PathBuf]) -> BTreeMap<Language, Vec<PathBuf>> {
    let mut groups: BTreeMap<Language, Vec<PathBuf>> = BTreeMap::new();
    for path in paths {
        if let Some(language) = CodeParser::detect_language(path) {
            groups.entry(language).or_default().push(path.clone());
        }
    }
    groups
}
