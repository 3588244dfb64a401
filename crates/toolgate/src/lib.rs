//! Shared core for the toolgate MCP adapter fleet.
//!
//! Each adapter binary supplies a [`connect::Connector`] for its vendor and
//! a [`registry::ToolRegistry`] of handlers, then mounts the dual-transport
//! HTTP router from [`transport`]. Handlers read the per-request vendor
//! client from the ambient [`context`] instead of taking it as a parameter.

pub mod connect;
pub mod context;
pub mod model;
pub mod registry;
pub mod server;
pub mod transport;

pub use connect::{Connector, ProbeError};
pub use model::{CallToolResult, Content, ErrorCode, ErrorData};
pub use registry::{ToolRegistry, input_schema, parse_args};
pub use server::McpServer;
pub use transport::{AuthConfig, http_router, serve};
