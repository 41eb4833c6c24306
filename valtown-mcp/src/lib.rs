//! MCP (Model Context Protocol) server for the Val Town bridge
//!
//! Speaks JSON-RPC 2.0 line-by-line over stdio and forwards the two tool
//! operations - `tools/list` and `tools/call` - to the Val Town client.

pub mod error;
pub mod jsonrpc;
pub mod mcp;
pub mod server;

// Re-export key types
pub use error::{McpError, McpResult};
pub use server::{serve_stdio, McpServer};
