// MCP (Model Context Protocol) server for the fit-common document tree
// Serves skill, shared and app-specific docs to agent clients over stdio.

pub mod codec;
pub mod config;
pub mod protocol;
pub mod server;
pub mod tools;

pub use config::{ConfigOverrides, ServerConfig};
pub use server::McpServer;
