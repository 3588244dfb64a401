//! Dropbox MCP adapter: exposes files, sharing, and batch operations as
//! tool-call endpoints over the toolgate transport.

pub mod client;
pub mod tools;

pub use client::{DropboxClient, DropboxConnector, DropboxError};
