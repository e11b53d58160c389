//! codepecker: static call-graph construction and traversal.
//!
//! Extracts classes, methods and call sites from C# and Java sources,
//! merges them into an idempotent graph store with call resolution, and
//! answers bounded call-tree, call-path and caller queries.

pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod indexer;
pub mod observability;
pub mod types;

pub use error::{CallGraphError, Result};
