//! Miro MCP adapter: boards and board items as tool-call endpoints.

pub mod client;
pub mod tools;

pub use client::{MiroClient, MiroConnector, MiroError};
