//! neo4j-mcp-server: Neo4j tools for LLM clients over the Model Context Protocol.
//!
//! Requests arrive as newline-delimited JSON-RPC on stdin. Tool calls are
//! looked up in a fixed registry, validated, executed through the graph
//! service, and answered as MCP tool responses. Failures never take the
//! server down; they become structured error responses.

pub mod dispatch;
pub mod handlers;
pub mod protocol;
pub mod server;
pub mod tools;

pub use dispatch::{Dispatcher, ToolError};
pub use server::McpServer;
