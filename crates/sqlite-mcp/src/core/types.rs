use std::path::PathBuf;

use indexmap::IndexMap;
use serde::Serialize;

/// One result row, keyed by column name in result-column order.
pub type DbRow = IndexMap<String, serde_json::Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<DbRow>,
    pub row_count: usize,
}

impl QueryResult {
    /// Column names come from the first row, so an empty result has no columns.
    pub fn from_rows(rows: Vec<DbRow>) -> Self {
        let columns = rows
            .first()
            .map(|r| r.keys().cloned().collect())
            .unwrap_or_default();
        Self {
            columns,
            row_count: rows.len(),
            rows,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub declared_type: String,
    pub not_null: bool,
    pub primary_key: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    pub row_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaInfo {
    pub tables: Vec<TableInfo>,
    pub total_tables: usize,
}

impl SchemaInfo {
    pub fn new(tables: Vec<TableInfo>) -> Self {
        Self {
            total_tables: tables.len(),
            tables,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanStep {
    pub id: i64,
    pub parent: i64,
    pub detail: String,
}

impl PlanStep {
    pub fn line(&self) -> String {
        format!("{}|{}|{}", self.id, self.parent, self.detail)
    }
}

pub type DatabaseFileList = Vec<PathBuf>;
