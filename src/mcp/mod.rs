//! Tool dispatch for the `/mcp/tools` routes
//!
//! Provides the MCP tool definitions and the registry that resolves a tool name
//! to its implementation.

pub mod registry;
pub mod tools;

pub use registry::{acknowledgment, ToolHandler, ToolRegistry};
