//! MCP server: JSON-RPC 2.0, one message per line over stdio.

mod protocol;
pub mod server;
