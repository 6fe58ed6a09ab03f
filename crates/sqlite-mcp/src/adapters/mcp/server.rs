use serde_json::Value;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt};

use super::protocol::{
    initialize_result, jsonrpc_error, jsonrpc_result, tool_result, tools_list_result,
    INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR,
};
use crate::{
    cli::Args,
    core::connection::ConnectOptions,
    dispatch::Dispatcher,
    error::AppResult,
};

/// MCP server (JSON-RPC 2.0 over stdio).
///
/// Supported methods:
/// - initialize, ping
/// - tools/list
/// - tools/call: query, schema, table_info, explain, list_databases
///
/// Requests are handled one at a time, in arrival order.
pub async fn run(args: Args) -> AppResult<()> {
    let dispatcher = Dispatcher::new(ConnectOptions {
        busy_timeout: args.busy_timeout(),
    });
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        tools = dispatcher.operations().len(),
        "sqlite-mcp serving on stdio"
    );

    let mut stdin = io::BufReader::new(io::stdin());
    let mut stdout = io::BufWriter::new(io::stdout());
    let mut line = String::new();

    loop {
        line.clear();
        let n = stdin.read_line(&mut line).await?;
        if n == 0 {
            break;
        }
        let raw = line.trim();
        if raw.is_empty() {
            continue;
        }

        if let Some(resp) = handle_line(&dispatcher, raw).await {
            write_line(&mut stdout, &resp).await?;
        }
    }

    tracing::info!("stdin closed, shutting down");
    Ok(())
}

/// Handles one raw JSON-RPC line. Notifications produce no reply.
pub async fn handle_line(dispatcher: &Dispatcher, raw: &str) -> Option<Value> {
    let msg: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            return Some(jsonrpc_error(Value::Null, PARSE_ERROR, format!("parse error: {e}")));
        }
    };

    // Notifications (no id) are ignored.
    let id = msg.get("id").cloned().unwrap_or(Value::Null);
    if id.is_null() {
        if let Some(method) = msg.get("method").and_then(|m| m.as_str()) {
            tracing::debug!(method, "notification");
        }
        return None;
    }

    let Some(method) = msg.get("method").and_then(|m| m.as_str()) else {
        return Some(jsonrpc_error(id, INVALID_REQUEST, "invalid request: missing method".into()));
    };

    let params = msg.get("params").cloned().unwrap_or(Value::Null);

    let resp = match method {
        "initialize" => jsonrpc_result(id, initialize_result(&params)),
        "ping" => jsonrpc_result(id, serde_json::json!({})),
        "tools/list" => jsonrpc_result(id, tools_list_result(dispatcher.operations())),
        "tools/call" => handle_tools_call(id, params, dispatcher).await,
        _ => jsonrpc_error(id, METHOD_NOT_FOUND, format!("method not found: {method}")),
    };
    Some(resp)
}

async fn handle_tools_call(id: Value, params: Value, dispatcher: &Dispatcher) -> Value {
    let Some(name) = params.get("name").and_then(|v| v.as_str()) else {
        return jsonrpc_error(id, INVALID_PARAMS, "invalid params: missing name".into());
    };
    let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

    let envelope = dispatcher.dispatch_blocking(name.to_string(), arguments).await;
    jsonrpc_result(id, tool_result(envelope))
}

async fn write_line(w: &mut io::BufWriter<io::Stdout>, v: &Value) -> AppResult<()> {
    let mut buf = serde_json::to_vec(v)?;
    buf.push(b'\n');
    w.write_all(&buf).await?;
    w.flush().await?;
    Ok(())
}
