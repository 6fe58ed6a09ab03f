use serde_json::{json, Value};

use crate::dispatch::{Envelope, Operation};

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;

/// Used when the client does not announce a protocol version.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

pub fn jsonrpc_result(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

pub fn jsonrpc_error(id: Value, code: i64, message: String) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message }
    })
}

pub fn initialize_result(params: &Value) -> Value {
    let version = params
        .get("protocolVersion")
        .and_then(|v| v.as_str())
        .unwrap_or(DEFAULT_PROTOCOL_VERSION);
    json!({
        "protocolVersion": version,
        "serverInfo": {
            "name": "sqlite-mcp",
            "version": env!("CARGO_PKG_VERSION")
        },
        "capabilities": {
            "tools": { "listChanged": false }
        }
    })
}

pub fn tools_list_result(operations: &[Operation]) -> Value {
    let tools: Vec<Value> = operations
        .iter()
        .map(|op| {
            json!({
                "name": op.name,
                "description": op.description,
                "inputSchema": (op.input_schema)()
            })
        })
        .collect();
    json!({ "tools": tools })
}

/// MCP `tools/call` result carrying an envelope.
pub fn tool_result(envelope: Envelope) -> Value {
    let mut result = json!({
        "content": [{ "type": "text", "text": envelope.text }],
        "isError": envelope.is_error
    });
    if let (Some(structured), Some(obj)) = (envelope.structured, result.as_object_mut()) {
        obj.insert("structuredContent".to_string(), structured);
    }
    result
}
