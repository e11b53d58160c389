//! Error taxonomy for codepecker.
//!
//! Extraction and ingestion failures are scoped to a single file and get
//! aggregated into reports by the pipeline; traversal failures are returned
//! straight to the caller with enough context to retry.

use std::path::PathBuf;

/// Every failure the library can surface.
#[derive(Debug, thiserror::Error)]
pub enum CallGraphError {
    /// A single file could not be read or parsed. Never aborts a batch.
    #[error("failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// Records for one file could not be written.
    #[error("ingest failed for {file_path}: {reason}")]
    Ingest { file_path: String, reason: String },

    /// Ingestion input failed boundary validation.
    #[error("invalid record in {file_path}: {reason}")]
    InvalidRecord { file_path: String, reason: String },

    /// The queried class or method does not exist in the graph.
    #[error("{}", describe_not_found(.class, .method.as_deref()))]
    NotFound {
        class: String,
        method: Option<String>,
    },

    /// A traversal asked for more depth than the engine allows.
    #[error("{operation}: requested depth {requested} exceeds the limit of {limit}")]
    DepthLimitExceeded {
        operation: &'static str,
        requested: u32,
        limit: u32,
    },

    /// The backing store cannot be reached; the caller should retry.
    #[error("graph store unavailable: {0}")]
    StoreUnavailable(String),

    /// The store returned data that breaks a graph invariant.
    #[error("inconsistent graph: {0}")]
    Inconsistent(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

fn describe_not_found(class: &str, method: Option<&str>) -> String {
    match method {
        Some(m) => format!("method {class}.{m} not found"),
        None => format!("class {class} not found"),
    }
}

impl CallGraphError {
    pub fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// A method record names a class the graph does not hold.
    pub fn missing_parent_class(file_path: &str, class_name: &str) -> Self {
        Self::Ingest {
            file_path: file_path.to_string(),
            reason: format!("parent class {class_name} does not exist"),
        }
    }

    pub fn method_not_found(class: &str, method: &str) -> Self {
        Self::NotFound {
            class: class.to_string(),
            method: Some(method.to_string()),
        }
    }

    pub fn class_not_found(class: &str) -> Self {
        Self::NotFound {
            class: class.to_string(),
            method: None,
        }
    }

    /// `true` for query misses, which are answers rather than system failures.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// `true` when retrying the same operation later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::StoreUnavailable(_) => true,
            Self::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy
                    | rusqlite::ErrorCode::DatabaseLocked
                    | rusqlite::ErrorCode::CannotOpen
            ),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, CallGraphError>;
