//! Host harness for remote MCP servers.
//!
//! Calls tools and reads resources on a remote MCP server over JSON-RPC 2.0
//! (plain JSON or SSE-framed HTTP), normalizes the results for a UI, and
//! bridges embedded app frames to the server through a same-origin proxy
//! endpoint. Also serves a rate-limited chat endpoint.

pub mod bridge;
pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod protocol;
pub mod rate_limit;
pub mod server;

pub mod schema;
