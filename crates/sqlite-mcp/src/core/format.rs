//! Plain-text rendering of operation results. Everything here is pure.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::core::types::{ColumnInfo, PlanStep, QueryResult, SchemaInfo, TableInfo};

pub fn format_query(qr: &QueryResult) -> String {
    format!("Rows: {}\n\n{}", qr.row_count, format_table(qr))
}

/// Width-aligned text table.
pub fn format_table(qr: &QueryResult) -> String {
    if qr.columns.is_empty() {
        return if qr.row_count == 0 {
            "(no columns)".to_string()
        } else {
            format!("{} row(s) affected", qr.row_count)
        };
    }

    let cells: Vec<Vec<String>> = qr
        .rows
        .iter()
        .map(|row| {
            qr.columns
                .iter()
                .map(|c| row.get(c).map(cell_text).unwrap_or_default())
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = qr.columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut lines = Vec::with_capacity(cells.len() + 2);
    lines.push(join_padded(&qr.columns, &widths));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in &cells {
        lines.push(join_padded(row, &widths));
    }
    lines.join("\n")
}

pub fn format_schema(schema: &SchemaInfo) -> String {
    let mut out = format!("Database schema ({} table(s))", schema.total_tables);
    for table in &schema.tables {
        out.push_str(&format!("\n\n## {} ({} rows)", table.name, table.row_count));
        for col in &table.columns {
            out.push('\n');
            out.push_str(&column_line(col));
        }
    }
    out
}

pub fn format_table_info(info: &TableInfo) -> String {
    let mut out = format!("Table: {} ({} rows)", info.name, info.row_count);
    for col in &info.columns {
        out.push('\n');
        out.push_str(&column_line(col));
    }
    out
}

pub fn format_plan(steps: &[PlanStep]) -> String {
    let mut out = String::from("Query plan:");
    for step in steps {
        out.push('\n');
        out.push_str(&step.line());
    }
    out
}

pub fn format_file_list(directory: &Path, files: &[PathBuf]) -> String {
    if files.is_empty() {
        return format!("No database files found in {}", directory.display());
    }
    let mut out = format!(
        "Found {} database file(s) in {}:",
        files.len(),
        directory.display()
    );
    for f in files {
        out.push_str(&format!("\n- {}", f.display()));
    }
    out
}

/// `  - name TYPE PK NOT NULL DEFAULT x`, annotations in that order.
fn column_line(col: &ColumnInfo) -> String {
    let mut line = format!("  - {}", col.name);
    if !col.declared_type.is_empty() {
        line.push(' ');
        line.push_str(&col.declared_type);
    }
    if col.primary_key {
        line.push_str(" PK");
    }
    if col.not_null {
        line.push_str(" NOT NULL");
    }
    if let Some(default) = &col.default_value {
        line.push_str(" DEFAULT ");
        line.push_str(default);
    }
    line
}

fn cell_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn join_padded<S: AsRef<str>>(cells: &[S], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(c, w)| format!("{:<w$}", c.as_ref(), w = *w))
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}
