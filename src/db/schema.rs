//! SQLite schema initialization for the call graph.
//!
//! Four tables mirror the property graph: `classes` and `methods` are the
//! node kinds, `declares` and `calls` the edge kinds. Identity keys are
//! enforced with UNIQUE constraints so every write can be an UPSERT.

use rusqlite::Connection;

// ---------------------------------------------------------------------------
// DDL constants
// ---------------------------------------------------------------------------

const CREATE_CLASSES: &str = "\
CREATE TABLE IF NOT EXISTS classes (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL,
  file_path TEXT NOT NULL,
  visibility TEXT NOT NULL DEFAULT 'Private',
  UNIQUE (name, file_path)
)";

const CREATE_METHODS: &str = "\
CREATE TABLE IF NOT EXISTS methods (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL,
  class_name TEXT NOT NULL,
  visibility TEXT NOT NULL DEFAULT 'Public',
  raw_calls TEXT NOT NULL DEFAULT '[]',
  definition TEXT,
  UNIQUE (name, class_name)
)";

const CREATE_DECLARES: &str = "\
CREATE TABLE IF NOT EXISTS declares (
  class_id INTEGER NOT NULL,
  method_id INTEGER NOT NULL,
  UNIQUE (class_id, method_id),
  FOREIGN KEY (class_id) REFERENCES classes(id) ON DELETE CASCADE,
  FOREIGN KEY (method_id) REFERENCES methods(id) ON DELETE CASCADE
)";

const CREATE_CALLS: &str = "\
CREATE TABLE IF NOT EXISTS calls (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  source_id INTEGER NOT NULL,
  target_id INTEGER NOT NULL,
  kind TEXT NOT NULL,
  call_name TEXT NOT NULL,
  UNIQUE (source_id, target_id, kind, call_name),
  FOREIGN KEY (source_id) REFERENCES methods(id) ON DELETE CASCADE,
  FOREIGN KEY (target_id) REFERENCES methods(id) ON DELETE CASCADE
)";

// Indexes ----------------------------------------------------------------

const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_classes_name ON classes(name)",
    "CREATE INDEX IF NOT EXISTS idx_methods_name ON methods(name)",
    "CREATE INDEX IF NOT EXISTS idx_methods_class ON methods(class_name)",
    "CREATE INDEX IF NOT EXISTS idx_calls_source ON calls(source_id)",
    "CREATE INDEX IF NOT EXISTS idx_calls_target ON calls(target_id)",
    "CREATE INDEX IF NOT EXISTS idx_declares_method ON declares(method_id)",
];

/// Every table, in the order `reset` clears them.
pub const ALL_TABLES: &[&str] = &["calls", "declares", "methods", "classes"];

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Open (or create) the SQLite database at `db_path` and apply the schema.
///
/// The returned connection has WAL mode and synchronous NORMAL configured.
/// Pass `":memory:"` for a throwaway database.
pub fn initialize_database(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;

    // -- Pragmas ----------------------------------------------------------
    conn.pragma_update(None, "journal_mode", "WAL")?;
    // Referential checks happen in the store (missing parent class is an
    // ingest error with file context), not in SQLite.
    conn.pragma_update(None, "foreign_keys", "OFF")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;

    // -- Tables -----------------------------------------------------------
    conn.execute_batch(CREATE_CLASSES)?;
    conn.execute_batch(CREATE_METHODS)?;
    conn.execute_batch(CREATE_DECLARES)?;
    conn.execute_batch(CREATE_CALLS)?;

    // -- Indexes ----------------------------------------------------------
    for ddl in CREATE_INDEXES {
        conn.execute_batch(ddl)?;
    }

    Ok(conn)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
