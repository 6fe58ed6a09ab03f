use base64::{engine::general_purpose::STANDARD, Engine as _};
use rusqlite::{types::ValueRef, Batch, Connection, Row, Statement};

use crate::core::readonly::{self, StatementKind};
use crate::core::types::{DbRow, PlanStep, QueryResult};
use crate::error::{AppError, AppResult};

/// Runs one statement. With `readonly` set, mutating statements are refused
/// before anything reaches the engine.
pub fn run_query(conn: &Connection, sql: &str, readonly: bool) -> AppResult<QueryResult> {
    match readonly::enforce(sql, readonly)? {
        StatementKind::ReadOnlySafe => fetch_all(conn, sql),
        StatementKind::Mutating => {
            run_execute(conn, sql)?;
            Ok(QueryResult::empty())
        }
    }
}

/// Prepares `sql`, which must hold exactly one statement. Trailing
/// whitespace and comments are fine; a second statement is an error.
fn prepare_single<'c>(conn: &'c Connection, sql: &str) -> AppResult<Statement<'c>> {
    let mut batch = Batch::new(conn, sql);
    let Some(stmt) = batch.next()? else {
        return Err(AppError::Validation("sql contains no statement".into()));
    };
    if batch.next()?.is_some() {
        return Err(AppError::Engine(rusqlite::Error::MultipleStatement));
    }
    Ok(stmt)
}

fn fetch_all(conn: &Connection, sql: &str) -> AppResult<QueryResult> {
    let mut stmt = prepare_single(conn, sql)?;
    let col_names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

    let mut rows = Vec::new();
    let mut r = stmt.query([])?;
    while let Some(row) = r.next()? {
        rows.push(row_to_json_object(row, &col_names)?);
    }

    Ok(QueryResult::from_rows(rows))
}

/// Steps the statement to completion for its side effects. Rows produced by
/// `RETURNING` are discarded.
fn run_execute(conn: &Connection, sql: &str) -> AppResult<()> {
    let mut stmt = prepare_single(conn, sql)?;
    let mut r = stmt.query([])?;
    while r.next()?.is_some() {}
    Ok(())
}

/// `EXPLAIN QUERY PLAN` rows in the order the engine reports them.
pub fn explain_plan(conn: &Connection, sql: &str) -> AppResult<Vec<PlanStep>> {
    let mut stmt = prepare_single(conn, &format!("EXPLAIN QUERY PLAN {sql}"))?;
    let steps = stmt
        .query_map([], |row| {
            Ok(PlanStep {
                id: row.get(0)?,
                parent: row.get(1)?,
                detail: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(steps)
}

fn row_to_json_object(row: &Row<'_>, col_names: &[String]) -> AppResult<DbRow> {
    let mut out = DbRow::with_capacity(col_names.len());
    for (i, name) in col_names.iter().enumerate() {
        let v = match row.get_ref(i)? {
            ValueRef::Null => serde_json::Value::Null,
            ValueRef::Integer(x) => serde_json::Value::from(x),
            ValueRef::Real(x) => serde_json::Value::from(x),
            ValueRef::Text(t) => serde_json::Value::from(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => serde_json::json!({
                "$type": "blob",
                "base64": STANDARD.encode(b),
                "size": b.len()
            }),
        };
        out.insert(name.clone(), v);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn users_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, email TEXT);
             INSERT INTO users (name, email) VALUES
                ('alice', 'alice@example.com'),
                ('bob', 'bob@example.com'),
                ('carol', NULL);",
        )
        .unwrap();
        conn
    }

    fn count_users(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0)).unwrap()
    }

    #[test]
    fn test_select_returns_rows_in_column_order() {
        let conn = users_db();
        let qr = run_query(&conn, "SELECT name, id FROM users ORDER BY id", true).unwrap();
        assert_eq!(qr.columns, vec!["name", "id"]);
        assert_eq!(qr.row_count, 3);
        assert_eq!(qr.rows.len(), qr.row_count);
        assert_eq!(qr.rows[0]["name"], json!("alice"));
        assert_eq!(qr.rows[0]["id"], json!(1));
    }

    #[test]
    fn test_null_and_blob_values() {
        let conn = users_db();
        let qr = run_query(&conn, "SELECT email, x'DEADBEEF' AS raw, 1.5 AS f FROM users WHERE id = 3", true)
            .unwrap();
        assert_eq!(qr.rows[0]["email"], json!(null));
        assert_eq!(
            qr.rows[0]["raw"],
            json!({ "$type": "blob", "base64": "3q2+7w==", "size": 4 })
        );
        assert_eq!(qr.rows[0]["f"], json!(1.5));
    }

    #[test]
    fn test_empty_select_loses_columns() {
        let conn = users_db();
        let qr = run_query(&conn, "SELECT * FROM users WHERE id = 999", true).unwrap();
        assert_eq!(qr.row_count, 0);
        assert!(qr.columns.is_empty());
        assert!(qr.rows.is_empty());
    }

    #[test]
    fn test_insert_rejected_in_readonly_mode() {
        let conn = users_db();
        let err = run_query(&conn, "INSERT INTO users (name) VALUES ('dave')", true).unwrap_err();
        assert!(matches!(err, AppError::WriteNotAllowed));
        assert!(err.to_string().contains("Write operations are not allowed"));
        assert_eq!(count_users(&conn), 3);
    }

    #[test]
    fn test_insert_allowed_when_writable() {
        let conn = users_db();
        let qr = run_query(&conn, "INSERT INTO users (name) VALUES ('dave')", false).unwrap();
        assert_eq!(qr, QueryResult::empty());

        let qr = run_query(&conn, "SELECT name FROM users WHERE name = 'dave'", true).unwrap();
        assert_eq!(qr.row_count, 1);
    }

    #[test]
    fn test_returning_rows_are_not_reported() {
        let conn = users_db();
        let qr = run_query(&conn, "DELETE FROM users WHERE id = 1 RETURNING id", false).unwrap();
        assert_eq!(qr.row_count, 0);
        assert_eq!(count_users(&conn), 2);
    }

    #[test]
    fn test_repeated_select_is_idempotent() {
        let conn = users_db();
        let first = run_query(&conn, "SELECT * FROM users ORDER BY id", true).unwrap();
        let second = run_query(&conn, "SELECT * FROM users ORDER BY id", true).unwrap();
        assert_eq!(first, second);
        assert_eq!(count_users(&conn), 3);
    }

    #[test]
    fn test_engine_error_passes_through() {
        let conn = users_db();
        let err = run_query(&conn, "SELECT * FROM nope", true).unwrap_err();
        assert!(matches!(err, AppError::Engine(_)));
        assert!(err.to_string().contains("no such table: nope"));
    }

    #[test]
    fn test_explain_plan_lines() {
        let conn = users_db();
        let steps = explain_plan(&conn, "SELECT * FROM users WHERE id = 1").unwrap();
        assert!(!steps.is_empty());
        assert!(steps.iter().any(|s| s.detail.contains("users")));
    }

    #[test]
    fn test_explain_does_not_execute() {
        let conn = users_db();
        explain_plan(&conn, "DELETE FROM users").unwrap();
        assert_eq!(count_users(&conn), 3);
    }

    #[test]
    fn test_multiple_writes_are_rejected_whole() {
        let conn = users_db();
        let err = run_query(
            &conn,
            "INSERT INTO users (name) VALUES ('dave'); INSERT INTO users (name) VALUES ('erin')",
            false,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Engine(rusqlite::Error::MultipleStatement)));
        assert_eq!(count_users(&conn), 3);
    }

    #[test]
    fn test_select_with_trailing_statement_is_rejected() {
        let conn = users_db();
        let err = run_query(&conn, "SELECT 1; DELETE FROM users", true).unwrap_err();
        assert!(matches!(err, AppError::Engine(rusqlite::Error::MultipleStatement)));
        assert_eq!(count_users(&conn), 3);
    }

    #[test]
    fn test_trailing_semicolon_and_comment_are_allowed() {
        let conn = users_db();
        let qr = run_query(&conn, "SELECT id FROM users WHERE id = 1;  -- first\n", true).unwrap();
        assert_eq!(qr.row_count, 1);
    }

    #[test]
    fn test_comment_only_sql_is_invalid() {
        let conn = users_db();
        let err = run_query(&conn, "-- nothing here", false).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_explain_invalid_sql() {
        let conn = users_db();
        assert!(matches!(explain_plan(&conn, "SELEC nonsense"), Err(AppError::Engine(_))));
    }
}
