//! Operation routing: a fixed table from tool name to handler.
//!
//! Each call goes `Received -> Validated -> Executed -> Responded`. Arguments
//! are deserialized and checked before any connection is opened, and every
//! outcome, good or bad, comes back as an [`Envelope`].

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;

use crate::{
    core::{
        connection::{self, ConnectOptions, OpenMode},
        files, format, paths, query, schema,
    },
    error::{AppError, AppResult},
};

/// Uniform result of one tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub is_error: bool,
    pub text: String,
    /// Typed result as JSON, present on success only.
    pub structured: Option<Value>,
}

impl Envelope {
    pub fn success(output: ToolOutput) -> Self {
        Self {
            is_error: false,
            text: output.text,
            structured: Some(output.structured),
        }
    }

    pub fn failure(err: &AppError) -> Self {
        Self {
            is_error: true,
            text: format!("Error: {err}"),
            structured: None,
        }
    }
}

#[derive(Debug)]
pub struct ToolOutput {
    pub text: String,
    pub structured: Value,
}

impl ToolOutput {
    fn new(text: String, structured: &impl serde::Serialize) -> AppResult<Self> {
        Ok(Self {
            text,
            structured: serde_json::to_value(structured)?,
        })
    }
}

type Handler = fn(&ConnectOptions, Value) -> AppResult<ToolOutput>;

pub struct Operation {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: fn() -> Value,
    handler: Handler,
}

static OPERATIONS: &[Operation] = &[
    Operation {
        name: "query",
        description: "Execute a SQL query against a SQLite database. Read-only by default: only SELECT, PRAGMA, EXPLAIN and WITH statements are accepted unless readonly is false.",
        input_schema: query_schema,
        handler: query_tool,
    },
    Operation {
        name: "schema",
        description: "Show every table in the database with its columns and row count.",
        input_schema: db_path_schema,
        handler: schema_tool,
    },
    Operation {
        name: "table_info",
        description: "Show the columns and row count of a single table.",
        input_schema: table_info_schema,
        handler: table_info_tool,
    },
    Operation {
        name: "explain",
        description: "Show the query plan SQLite would use for a statement, without running it.",
        input_schema: explain_schema,
        handler: explain_tool,
    },
    Operation {
        name: "list_databases",
        description: "List SQLite database files (.db, .sqlite, .sqlite3) in a directory.",
        input_schema: list_databases_schema,
        handler: list_databases_tool,
    },
];

#[derive(Debug, Clone)]
pub struct Dispatcher {
    operations: &'static [Operation],
    connect: ConnectOptions,
}

impl Dispatcher {
    pub fn new(connect: ConnectOptions) -> Self {
        Self {
            operations: OPERATIONS,
            connect,
        }
    }

    pub fn operations(&self) -> &'static [Operation] {
        self.operations
    }

    /// Runs one call to completion on the current thread.
    pub fn dispatch(&self, name: &str, arguments: Value) -> Envelope {
        let Some(op) = self.operations.iter().find(|op| op.name == name) else {
            let err = AppError::Validation(format!("unknown tool: {name}"));
            tracing::warn!(tool = name, code = err.code(), "rejected call");
            return Envelope::failure(&err);
        };

        tracing::debug!(tool = name, "dispatching");
        match (op.handler)(&self.connect, arguments) {
            Ok(output) => Envelope::success(output),
            Err(e) => {
                tracing::warn!(tool = name, code = e.code(), error = %e, "tool call failed");
                Envelope::failure(&e)
            }
        }
    }

    /// Same as [`Dispatcher::dispatch`], moved onto the blocking pool so
    /// SQLite work never stalls the transport.
    pub async fn dispatch_blocking(&self, name: String, arguments: Value) -> Envelope {
        let this = self.clone();
        match tokio::task::spawn_blocking(move || this.dispatch(&name, arguments)).await {
            Ok(envelope) => envelope,
            Err(e) => Envelope::failure(&AppError::Internal(format!("tool task failed: {e}"))),
        }
    }
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation").field("name", &self.name).finish()
    }
}

// Arguments

fn default_readonly() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct QueryArgs {
    db_path: String,
    sql: String,
    #[serde(default = "default_readonly")]
    readonly: bool,
}

#[derive(Debug, Deserialize)]
struct DbPathArgs {
    db_path: String,
}

#[derive(Debug, Deserialize)]
struct TableInfoArgs {
    db_path: String,
    table: String,
}

#[derive(Debug, Deserialize)]
struct ExplainArgs {
    db_path: String,
    sql: String,
}

#[derive(Debug, Default, Deserialize)]
struct ListDatabasesArgs {
    #[serde(default)]
    directory: Option<String>,
}

fn parse_args<T: DeserializeOwned>(arguments: Value) -> AppResult<T> {
    let arguments = match arguments {
        Value::Null => Value::Object(Default::default()),
        obj @ Value::Object(_) => obj,
        _ => return Err(AppError::Validation("arguments must be an object".into())),
    };
    serde_json::from_value(arguments).map_err(|e| AppError::Validation(e.to_string()))
}

fn require_non_blank<'a>(field: &str, value: &'a str) -> AppResult<&'a str> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} must not be empty")));
    }
    Ok(value)
}

fn resolve_db_path(raw: &str) -> AppResult<PathBuf> {
    paths::resolve(Path::new(require_non_blank("db_path", raw)?))
}

// Handlers

fn query_tool(opts: &ConnectOptions, arguments: Value) -> AppResult<ToolOutput> {
    let args: QueryArgs = parse_args(arguments)?;
    let sql = require_non_blank("sql", &args.sql)?;
    let db_path = resolve_db_path(&args.db_path)?;

    let mode = OpenMode::from_readonly(args.readonly);
    let qr = connection::with_connection(&db_path, mode, opts, |conn| {
        query::run_query(conn, sql, args.readonly)
    })?;
    ToolOutput::new(format::format_query(&qr), &qr)
}

fn schema_tool(opts: &ConnectOptions, arguments: Value) -> AppResult<ToolOutput> {
    let args: DbPathArgs = parse_args(arguments)?;
    let db_path = resolve_db_path(&args.db_path)?;

    let info = connection::with_connection(&db_path, OpenMode::ReadOnly, opts, schema::get_schema)?;
    ToolOutput::new(format::format_schema(&info), &info)
}

fn table_info_tool(opts: &ConnectOptions, arguments: Value) -> AppResult<ToolOutput> {
    let args: TableInfoArgs = parse_args(arguments)?;
    let table = require_non_blank("table", &args.table)?;
    let db_path = resolve_db_path(&args.db_path)?;

    let info = connection::with_connection(&db_path, OpenMode::ReadOnly, opts, |conn| {
        schema::get_table_info(conn, table)
    })?;
    ToolOutput::new(format::format_table_info(&info), &info)
}

fn explain_tool(opts: &ConnectOptions, arguments: Value) -> AppResult<ToolOutput> {
    let args: ExplainArgs = parse_args(arguments)?;
    let sql = require_non_blank("sql", &args.sql)?;
    let db_path = resolve_db_path(&args.db_path)?;

    let steps = connection::with_connection(&db_path, OpenMode::ReadOnly, opts, |conn| {
        query::explain_plan(conn, sql)
    })?;
    let lines: Vec<String> = steps.iter().map(|s| s.line()).collect();
    ToolOutput::new(
        format::format_plan(&steps),
        &serde_json::json!({ "plan": lines, "steps": steps }),
    )
}

fn list_databases_tool(_opts: &ConnectOptions, arguments: Value) -> AppResult<ToolOutput> {
    let args: ListDatabasesArgs = parse_args(arguments)?;
    let directory = match args.directory.as_deref().map(str::trim) {
        Some(d) if !d.is_empty() => paths::resolve(Path::new(d))?,
        _ => std::env::current_dir()?,
    };

    let files = files::list_databases(&directory)?;
    ToolOutput::new(
        format::format_file_list(&directory, &files),
        &serde_json::json!({ "directory": directory, "files": files }),
    )
}

// Input schemas

fn query_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "db_path": { "type": "string", "description": "Path to the SQLite database file" },
            "sql": { "type": "string", "description": "SQL statement to execute" },
            "readonly": {
                "type": "boolean",
                "default": true,
                "description": "Reject statements that are not SELECT, PRAGMA, EXPLAIN or WITH"
            }
        },
        "required": ["db_path", "sql"]
    })
}

fn db_path_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "db_path": { "type": "string", "description": "Path to the SQLite database file" }
        },
        "required": ["db_path"]
    })
}

fn table_info_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "db_path": { "type": "string", "description": "Path to the SQLite database file" },
            "table": { "type": "string", "description": "Table name" }
        },
        "required": ["db_path", "table"]
    })
}

fn explain_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "db_path": { "type": "string", "description": "Path to the SQLite database file" },
            "sql": { "type": "string", "description": "SQL statement to explain" }
        },
        "required": ["db_path", "sql"]
    })
}

fn list_databases_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "directory": {
                "type": "string",
                "description": "Directory to search (defaults to the current working directory)"
            }
        }
    })
}
