//! Graph layer: storage backends, ingest with call resolution, traversal.

pub mod backend;
pub mod ingest;
pub mod memory;
pub mod render;
pub mod resolver;
pub mod store;
pub mod traversal;

pub use backend::{GraphBackend, GraphCounts};
pub use ingest::{ingest, IngestOptions, IngestReport};
pub use memory::MemoryStore;
pub use resolver::CallResolver;
pub use store::SqliteStore;
pub use traversal::TraversalEngine;

use crate::config::{BackendKind, DatabaseConfig};
use crate::error::Result;

/// Construct the backend `config` names, wiping it first when
/// `clear_on_open` is set.
///
/// A memory backend is always empty when opened; nothing outlives the
/// returned box.
pub fn open_backend(config: &DatabaseConfig) -> Result<Box<dyn GraphBackend>> {
    let backend: Box<dyn GraphBackend> = match config.backend {
        BackendKind::Sqlite => Box::new(SqliteStore::open(&config.path)?),
        BackendKind::Memory => Box::new(MemoryStore::new()),
    };
    if config.clear_on_open {
        tracing::info!(backend = backend.backend_name(), "clearing graph on open");
        backend.reset()?;
    }
    Ok(backend)
}
