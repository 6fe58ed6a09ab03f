use rusqlite::{Connection, OptionalExtension, Row};

use crate::core::types::{ColumnInfo, SchemaInfo, TableInfo};
use crate::error::{AppError, AppResult};

/// User tables in ascending name order; `sqlite_*` catalog tables are skipped.
pub fn list_tables(conn: &Connection) -> AppResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' ORDER BY name",
    )?;
    let rows = stmt
        .query_map([], |r| r.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Column metadata in declaration order. An unknown table yields no columns.
pub fn list_columns(conn: &Connection, table: &str) -> AppResult<Vec<ColumnInfo>> {
    // The table-valued form lets the name be bound instead of spliced in.
    let mut stmt = conn.prepare(
        "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?1) ORDER BY cid",
    )?;
    let cols = stmt
        .query_map([table], |row: &Row<'_>| {
            Ok(ColumnInfo {
                name: row.get("name")?,
                declared_type: row.get::<_, Option<String>>("type")?.unwrap_or_default(),
                not_null: row.get::<_, i64>("notnull")? != 0,
                primary_key: row.get::<_, i64>("pk")? != 0,
                default_value: row.get("dflt_value")?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(cols)
}

/// Callers must only pass names that came from the catalog.
fn count_rows(conn: &Connection, table: &str) -> AppResult<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
    Ok(conn.query_row(&sql, [], |r| r.get(0))?)
}

/// The catalog spelling of `table`. Identifiers match case-insensitively,
/// as they do everywhere else in SQLite.
fn catalog_name(conn: &Connection, table: &str) -> AppResult<Option<String>> {
    let name = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1 COLLATE NOCASE",
            [table],
            |r| r.get(0),
        )
        .optional()?;
    Ok(name)
}

pub fn get_schema(conn: &Connection) -> AppResult<SchemaInfo> {
    let names = list_tables(conn)?;
    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        let columns = list_columns(conn, &name)?;
        let row_count = count_rows(conn, &name)?;
        tables.push(TableInfo {
            name,
            columns,
            row_count,
        });
    }
    Ok(SchemaInfo::new(tables))
}

pub fn get_table_info(conn: &Connection, table: &str) -> AppResult<TableInfo> {
    let columns = list_columns(conn, table)?;
    let name = match catalog_name(conn, table)? {
        Some(name) if !columns.is_empty() => name,
        _ => return Err(AppError::TableNotFound(table.to_string())),
    };
    let row_count = count_rows(conn, &name)?;
    Ok(TableInfo {
        name,
        columns,
        row_count,
    })
}

pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
