//! Fireflies.ai MCP adapter: meeting transcripts and summaries as
//! tool-call endpoints.

pub mod client;
pub mod tools;

pub use client::{FirefliesClient, FirefliesConnector, FirefliesError};
