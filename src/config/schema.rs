//! Configuration data structures for codepecker.
//!
//! Defines the YAML config format: storage backend, ingest tuning and query
//! defaults. Every field has a serde default so partial files are valid.

use serde::{Deserialize, Serialize};

use crate::graph::traversal::{MAX_PATH_DEPTH, MAX_TREE_DEPTH};
use crate::types::Language;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration.
///
/// Loaded from YAML files, environment variables, and CLI flags; see
/// [`crate::config::load`] for the merge order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodepeckerConfig {
    /// Config format version (currently "1.0").
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub query: QueryConfig,
}

impl Default for CodepeckerConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            database: DatabaseConfig::default(),
            ingest: IngestConfig::default(),
            query: QueryConfig::default(),
        }
    }
}

impl CodepeckerConfig {
    /// Pull query depths back under the traversal caps.
    pub fn clamp(mut self) -> Self {
        self.query.default_tree_depth = self.query.default_tree_depth.min(MAX_TREE_DEPTH);
        self.query.default_path_depth = self.query.default_path_depth.min(MAX_PATH_DEPTH);
        self
    }
}

// ---------------------------------------------------------------------------
// BackendKind
// ---------------------------------------------------------------------------

/// Which [`GraphBackend`](crate::graph::GraphBackend) to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Sqlite,
    Memory,
}

impl BackendKind {
    /// Parse from a loose string (case-insensitive, surrounding space ignored).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            "memory" | "mem" | "in-memory" => Some(Self::Memory),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Memory => "memory",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: BackendKind,

    /// SQLite file; ignored by the memory backend.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Wipe the graph when the store is opened.
    #[serde(default)]
    pub clear_on_open: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            path: default_db_path(),
            clear_on_open: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_languages")]
    pub languages: Vec<Language>,

    /// Store method source text alongside each method node.
    #[serde(default = "default_true")]
    pub include_definitions: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            languages: default_languages(),
            include_definitions: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_tree_depth")]
    pub default_tree_depth: u32,

    #[serde(default = "default_path_depth")]
    pub default_path_depth: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_tree_depth: default_tree_depth(),
            default_path_depth: default_path_depth(),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_version() -> String {
    "1.0".to_string()
}

fn default_db_path() -> String {
    ".codepecker/graph.db".to_string()
}

fn default_workers() -> usize {
    4
}

fn default_languages() -> Vec<Language> {
    Language::ALL.to_vec()
}

fn default_true() -> bool {
    true
}

fn default_tree_depth() -> u32 {
    5
}

fn default_path_depth() -> u32 {
    10
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn test_default_config() {
        let config = CodepeckerConfig::default();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.database.backend, BackendKind::Sqlite);
        assert_eq!(config.database.path, ".codepecker/graph.db");
        assert!(!config.database.clear_on_open);
        assert_eq!(config.ingest.workers, 4);
        assert_eq!(config.ingest.languages, vec![Language::CSharp, Language::Java]);
        assert!(config.ingest.include_definitions);
        assert_eq!(config.query.default_tree_depth, 5);
        assert_eq!(config.query.default_path_depth, 10);
    }

    #[test]
    fn test_full_yaml_config() {
        let yaml = r#"
version: "1.0"
database:
  backend: memory
  path: /tmp/g.db
  clear_on_open: true
ingest:
  workers: 2
  languages: [java]
  include_definitions: false
query:
  default_tree_depth: 3
  default_path_depth: 7
"#;
        let config: CodepeckerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.database.backend, BackendKind::Memory);
        assert_eq!(config.database.path, "/tmp/g.db");
        assert!(config.database.clear_on_open);
        assert_eq!(config.ingest.workers, 2);
        assert_eq!(config.ingest.languages, vec![Language::Java]);
        assert!(!config.ingest.include_definitions);
        assert_eq!(config.query.default_tree_depth, 3);
        assert_eq!(config.query.default_path_depth, 7);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: CodepeckerConfig = serde_yaml::from_str("ingest:\n  workers: 8\n").unwrap();
        assert_eq!(config.ingest.workers, 8);
        assert_eq!(config.ingest.languages.len(), 2);
        assert_eq!(config.database, DatabaseConfig::default());
    }

    #[test]
    fn test_invalid_yaml_returns_error() {
        let result: Result<CodepeckerConfig, _> = serde_yaml::from_str("{{invalid yaml}}");
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let result: Result<CodepeckerConfig, _> =
            serde_yaml::from_str("database:\n  backend: neo4j\n");
        assert!(result.is_err());
    }

    #[test]
    fn clamp_caps_query_depths() {
        let mut config = CodepeckerConfig::default();
        config.query.default_tree_depth = 99;
        config.query.default_path_depth = 99;
        let config = config.clamp();
        assert_eq!(config.query.default_tree_depth, MAX_TREE_DEPTH);
        assert_eq!(config.query.default_path_depth, MAX_PATH_DEPTH);
    }

    #[test_case("sqlite", Some(BackendKind::Sqlite) ; "sqlite")]
    #[test_case("  SQLite3 ", Some(BackendKind::Sqlite) ; "padded sqlite3")]
    #[test_case("memory", Some(BackendKind::Memory) ; "memory")]
    #[test_case("in-memory", Some(BackendKind::Memory) ; "in memory")]
    #[test_case("neo4j", None ; "unsupported")]
    fn backend_from_str_loose(input: &str, expected: Option<BackendKind>) {
        assert_eq!(BackendKind::from_str_loose(input), expected);
    }
}
