//! SQLite-backed [`GraphBackend`].
//!
//! One connection behind a `Mutex` serializes writers. Every statement goes
//! through [`Connection::prepare_cached`], and the multi-statement writes
//! (`write_file_structure`, `replace_calls_from`, `reset`) run inside a
//! transaction so concurrent readers only ever see committed state.

use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use crate::db::converters::{
    row_to_call, row_to_class, row_to_method, CALL_COLUMNS, CLASS_COLUMNS, METHOD_COLUMNS,
};
use crate::db::schema::{initialize_database, ALL_TABLES};
use crate::error::{CallGraphError, Result};
use crate::graph::backend::{GraphBackend, GraphCounts, UpsertedMethod};
use crate::types::{
    CallEdge, ClassNode, ClassRecord, MethodNode, MethodRecord, NodeId, Visibility,
};

// ---------------------------------------------------------------------------
// SQL constants
// ---------------------------------------------------------------------------

const UPSERT_CLASS_SQL: &str = "\
INSERT INTO classes (name, file_path, visibility)
VALUES (?1, ?2, ?3)
ON CONFLICT(name, file_path) DO UPDATE SET
  visibility = excluded.visibility
RETURNING id";

const UPSERT_METHOD_SQL: &str = "\
INSERT INTO methods (name, class_name, visibility, raw_calls, definition)
VALUES (?1, ?2, ?3, ?4, ?5)
ON CONFLICT(name, class_name) DO UPDATE SET
  visibility = excluded.visibility,
  raw_calls = excluded.raw_calls,
  definition = excluded.definition
RETURNING id";

const UPSERT_DECLARES_SQL: &str = "\
INSERT INTO declares (class_id, method_id)
VALUES (?1, ?2)
ON CONFLICT(class_id, method_id) DO NOTHING";

const UPSERT_CALL_SQL: &str = "\
INSERT INTO calls (source_id, target_id, kind, call_name)
VALUES (?1, ?2, ?3, ?4)
ON CONFLICT(source_id, target_id, kind, call_name) DO NOTHING";

const DELETE_CALLS_FROM_SQL: &str = "DELETE FROM calls WHERE source_id = ?1";

const CLASS_EXISTS_SQL: &str = "SELECT 1 FROM classes WHERE name = ?1 LIMIT 1";

const DECLARED_METHODS_SQL: &str = "\
SELECT m.id, m.name, m.class_name, m.visibility, m.raw_calls, m.definition
FROM methods m
JOIN declares d ON d.method_id = m.id
WHERE d.class_id = ?1
ORDER BY m.name";

const COUNTS_SQL: &str = "\
SELECT
  (SELECT count(*) FROM classes),
  (SELECT count(*) FROM methods),
  (SELECT count(*) FROM declares),
  (SELECT count(*) FROM calls WHERE kind = 'RESOLVED'),
  (SELECT count(*) FROM calls WHERE kind = 'UNRESOLVED')";

// ---------------------------------------------------------------------------
// Statement helpers (shared by the single-row and transactional paths)
// ---------------------------------------------------------------------------

fn upsert_class_on(
    conn: &Connection,
    name: &str,
    file_path: &str,
    visibility: Visibility,
) -> Result<NodeId> {
    let mut stmt = conn.prepare_cached(UPSERT_CLASS_SQL)?;
    let id = stmt.query_row(params![name, file_path, visibility.as_str()], |row| row.get(0))?;
    Ok(id)
}

fn upsert_method_on(
    conn: &Connection,
    file_path: &str,
    class_name: &str,
    record: &MethodRecord,
    keep_definition: bool,
) -> Result<NodeId> {
    let parent: Option<i64> = conn
        .prepare_cached(CLASS_EXISTS_SQL)?
        .query_row(params![class_name], |row| row.get(0))
        .optional()?;
    if parent.is_none() {
        return Err(CallGraphError::missing_parent_class(file_path, class_name));
    }

    let raw_calls = serde_json::to_string(&record.raw_calls)?;
    let definition = if keep_definition {
        record.definition.as_deref()
    } else {
        None
    };
    let mut stmt = conn.prepare_cached(UPSERT_METHOD_SQL)?;
    let id = stmt.query_row(
        params![
            record.name,
            class_name,
            record.visibility.as_str(),
            raw_calls,
            definition,
        ],
        |row| row.get(0),
    )?;
    Ok(id)
}

fn upsert_declares_on(conn: &Connection, class_id: NodeId, method_id: NodeId) -> Result<()> {
    conn.prepare_cached(UPSERT_DECLARES_SQL)?
        .execute(params![class_id, method_id])?;
    Ok(())
}

fn upsert_call_on(conn: &Connection, edge: &CallEdge) -> Result<()> {
    conn.prepare_cached(UPSERT_CALL_SQL)?.execute(params![
        edge.source,
        edge.target,
        edge.kind.as_str(),
        edge.call_name,
    ])?;
    Ok(())
}

fn clear_calls_on(conn: &Connection, method_id: NodeId) -> Result<()> {
    conn.prepare_cached(DELETE_CALLS_FROM_SQL)?
        .execute(params![method_id])?;
    Ok(())
}

// ---------------------------------------------------------------------------
// SqliteStore
// ---------------------------------------------------------------------------

/// Embedded graph store, on disk or `:memory:`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: String,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) the database at `db_path` and apply the schema.
    ///
    /// Parent directories are created for on-disk paths.
    pub fn open(db_path: &str) -> Result<Self> {
        if db_path != ":memory:" {
            if let Some(parent) = std::path::Path::new(db_path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }
        let conn = initialize_database(db_path).map_err(|e| match e {
            rusqlite::Error::SqliteFailure(ref f, _)
                if f.code == rusqlite::ErrorCode::CannotOpen =>
            {
                CallGraphError::StoreUnavailable(format!("{db_path}: {e}"))
            }
            other => other.into(),
        })?;
        tracing::debug!(path = db_path, "opened sqlite graph store");
        Ok(Self {
            conn: Mutex::new(conn),
            path: db_path.to_string(),
        })
    }

    /// Throwaway store, mostly for tests.
    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    /// Wrap a connection that already has the schema applied.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            path: String::from("<connection>"),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Close the underlying connection, surfacing any error SQLite reports.
    pub fn close(self) -> Result<()> {
        let conn = self.conn.into_inner().unwrap_or_else(|e| e.into_inner());
        conn.close().map_err(|(_, e)| e.into())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn query_methods(&self, sql: &str, key: &dyn rusqlite::ToSql) -> Result<Vec<MethodNode>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(sql)?;
        let rows = stmt
            .query_map([key], row_to_method)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn query_calls(&self, sql: &str, key: &dyn rusqlite::ToSql) -> Result<Vec<CallEdge>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(sql)?;
        let rows = stmt
            .query_map([key], row_to_call)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

impl GraphBackend for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn reset(&self) -> Result<()> {
        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;
        for table in ALL_TABLES {
            tx.execute(&format!("DELETE FROM {table}"), [])?;
        }
        tx.commit()?;
        tracing::info!(path = %self.path, "graph reset");
        Ok(())
    }

    // -------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------

    fn upsert_class(&self, name: &str, file_path: &str, visibility: Visibility) -> Result<NodeId> {
        upsert_class_on(&self.conn(), name, file_path, visibility)
    }

    fn upsert_method(
        &self,
        file_path: &str,
        class_name: &str,
        record: &MethodRecord,
        keep_definition: bool,
    ) -> Result<NodeId> {
        upsert_method_on(&self.conn(), file_path, class_name, record, keep_definition)
    }

    fn upsert_declares(&self, class_id: NodeId, method_id: NodeId) -> Result<()> {
        upsert_declares_on(&self.conn(), class_id, method_id)
    }

    fn upsert_call(&self, edge: &CallEdge) -> Result<()> {
        upsert_call_on(&self.conn(), edge)
    }

    fn clear_calls_from(&self, method_id: NodeId) -> Result<()> {
        clear_calls_on(&self.conn(), method_id)
    }

    fn replace_calls_from(&self, method_id: NodeId, edges: &[CallEdge]) -> Result<()> {
        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;
        clear_calls_on(&tx, method_id)?;
        for edge in edges {
            upsert_call_on(&tx, edge)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn write_file_structure(
        &self,
        file_path: &str,
        classes: &[ClassRecord],
        keep_definitions: bool,
    ) -> Result<Vec<UpsertedMethod>> {
        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;
        let mut written = Vec::new();
        for class in classes {
            let class_id = upsert_class_on(&tx, &class.name, file_path, class.visibility)?;
            for method in &class.methods {
                let method_id = upsert_method_on(&tx, file_path, &class.name, method, keep_definitions)?;
                upsert_declares_on(&tx, class_id, method_id)?;
                written.push(UpsertedMethod {
                    id: method_id,
                    class_name: class.name.clone(),
                    name: method.name.clone(),
                });
            }
        }
        tx.commit()?;
        Ok(written)
    }

    // -------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------

    fn classes(&self) -> Result<Vec<ClassNode>> {
        let conn = self.conn();
        let sql = format!("SELECT {CLASS_COLUMNS} FROM classes ORDER BY name, file_path");
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt
            .query_map([], row_to_class)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn classes_named(&self, name: &str) -> Result<Vec<ClassNode>> {
        let conn = self.conn();
        let sql = format!("SELECT {CLASS_COLUMNS} FROM classes WHERE name = ?1 ORDER BY file_path");
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt
            .query_map(params![name], row_to_class)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn method(&self, id: NodeId) -> Result<Option<MethodNode>> {
        let conn = self.conn();
        let sql = format!("SELECT {METHOD_COLUMNS} FROM methods WHERE id = ?1");
        let node = conn
            .prepare_cached(&sql)?
            .query_row(params![id], row_to_method)
            .optional()?;
        Ok(node)
    }

    fn find_method(&self, class_name: &str, name: &str) -> Result<Option<MethodNode>> {
        let conn = self.conn();
        let sql = format!("SELECT {METHOD_COLUMNS} FROM methods WHERE class_name = ?1 AND name = ?2");
        let node = conn
            .prepare_cached(&sql)?
            .query_row(params![class_name, name], row_to_method)
            .optional()?;
        Ok(node)
    }

    fn methods_named(&self, name: &str) -> Result<Vec<MethodNode>> {
        let sql = format!("SELECT {METHOD_COLUMNS} FROM methods WHERE name = ?1 ORDER BY class_name, name");
        self.query_methods(&sql, &name)
    }

    fn methods(&self) -> Result<Vec<MethodNode>> {
        let conn = self.conn();
        let sql = format!("SELECT {METHOD_COLUMNS} FROM methods ORDER BY class_name, name");
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt
            .query_map([], row_to_method)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn declared_methods(&self, class_id: NodeId) -> Result<Vec<MethodNode>> {
        self.query_methods(DECLARED_METHODS_SQL, &class_id)
    }

    fn outgoing_calls(&self, method_id: NodeId) -> Result<Vec<CallEdge>> {
        let sql = format!(
            "SELECT {CALL_COLUMNS} FROM calls WHERE source_id = ?1 ORDER BY target_id, kind, call_name"
        );
        self.query_calls(&sql, &method_id)
    }

    fn incoming_calls(&self, method_id: NodeId) -> Result<Vec<CallEdge>> {
        let sql = format!(
            "SELECT {CALL_COLUMNS} FROM calls WHERE target_id = ?1 ORDER BY source_id, kind, call_name"
        );
        self.query_calls(&sql, &method_id)
    }

    fn counts(&self) -> Result<GraphCounts> {
        let conn = self.conn();
        let counts = conn.prepare_cached(COUNTS_SQL)?.query_row([], |row| {
            Ok(GraphCounts {
                classes: row.get::<_, i64>(0)? as usize,
                methods: row.get::<_, i64>(1)? as usize,
                declares: row.get::<_, i64>(2)? as usize,
                resolved_calls: row.get::<_, i64>(3)? as usize,
                unresolved_calls: row.get::<_, i64>(4)? as usize,
            })
        })?;
        Ok(counts)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
