//! MCP client for Nucleus Explorer.
//!
//! Connects to MCP servers over Streamable-HTTP, falling back to SSE, and
//! exposes their tools, prompts and resources in normalized form.
//!
//! # Architecture
//!
//! - `transport`: pluggable connectors, with an `rmcp`-backed default
//! - `client`: connection state machine and data operations
//! - `types`: normalized capability types
//! - `status`: health checks with retries
//!
//! # Examples
//!
//! ```no_run
//! use nucleus_mcp::McpClient;
//! use serde_json::json;
//!
//! # async fn example() -> nucleus_core::Result<()> {
//! let mut client = McpClient::new();
//! client.connect("http://localhost:3000/mcp").await?;
//! let result = client.call_tool("search", json!({"query": "blocks"})).await?;
//! println!("{result}");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

pub mod client;
pub mod status;
pub mod transport;
pub mod types;

pub use client::{ClientState, McpClient};
pub use status::{HealthChecker, HealthReport, ServerStatus};
pub use transport::{McpPeer, RmcpConnector, TransportConnector};
pub use types::{ConnectionInfo, Prompt, Resource, ServerInfo, Tool, TransportKind};
