//! Row → domain type conversions for the SQLite store.
//!
//! Column order follows the `SELECT` lists in [`CLASS_COLUMNS`],
//! [`METHOD_COLUMNS`] and [`CALL_COLUMNS`]; every query that feeds these
//! converters must use them.

use rusqlite::types::Type;
use rusqlite::Row;

use crate::types::{CallEdge, CallKind, ClassNode, MethodNode, Visibility};

pub const CLASS_COLUMNS: &str = "id, name, file_path, visibility";
pub const METHOD_COLUMNS: &str = "id, name, class_name, visibility, raw_calls, definition";
pub const CALL_COLUMNS: &str = "source_id, target_id, kind, call_name";

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn visibility_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Visibility> {
    let raw: String = row.get(idx)?;
    Visibility::from_modifier(&raw)
        .ok_or_else(|| conversion_error(idx, format!("unknown visibility '{raw}'")))
}

pub fn row_to_class(row: &Row<'_>) -> rusqlite::Result<ClassNode> {
    Ok(ClassNode {
        id: row.get(0)?,
        name: row.get(1)?,
        file_path: row.get(2)?,
        visibility: visibility_at(row, 3)?,
    })
}

pub fn row_to_method(row: &Row<'_>) -> rusqlite::Result<MethodNode> {
    let calls_json: String = row.get(4)?;
    let raw_calls: Vec<String> = serde_json::from_str(&calls_json)
        .map_err(|e| conversion_error(4, format!("parse raw_calls: {e}")))?;
    Ok(MethodNode {
        id: row.get(0)?,
        name: row.get(1)?,
        class_name: row.get(2)?,
        visibility: visibility_at(row, 3)?,
        raw_calls,
        definition: row.get(5)?,
    })
}

pub fn row_to_call(row: &Row<'_>) -> rusqlite::Result<CallEdge> {
    let kind: String = row.get(2)?;
    Ok(CallEdge {
        source: row.get(0)?,
        target: row.get(1)?,
        kind: CallKind::from_str_loose(&kind)
            .ok_or_else(|| conversion_error(2, format!("unknown call kind '{kind}'")))?,
        call_name: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::initialize_database;

    #[test]
    fn method_row_decodes_call_list() {
        let conn = initialize_database(":memory:").unwrap();
        conn.execute(
            "INSERT INTO methods (name, class_name, visibility, raw_calls) \
             VALUES ('Get', 'Repo', 'Private', '[\"Open\",\"Read\"]')",
            [],
        )
        .unwrap();
        let m = conn
            .query_row(
                &format!("SELECT {METHOD_COLUMNS} FROM methods"),
                [],
                row_to_method,
            )
            .unwrap();
        assert_eq!(m.qualified_name(), "Repo.Get");
        assert_eq!(m.visibility, Visibility::Private);
        assert_eq!(m.raw_calls, vec!["Open", "Read"]);
        assert_eq!(m.definition, None);
    }

    #[test]
    fn unknown_call_kind_is_a_conversion_error() {
        let conn = initialize_database(":memory:").unwrap();
        conn.execute(
            "INSERT INTO calls (source_id, target_id, kind, call_name) VALUES (1, 2, 'MAYBE', 'x')",
            [],
        )
        .unwrap();
        let err = conn
            .query_row(&format!("SELECT {CALL_COLUMNS} FROM calls"), [], row_to_call)
            .unwrap_err();
        assert!(matches!(err, rusqlite::Error::FromSqlConversionFailure(2, _, _)));
    }
}
