//! The seam between the vendor-neutral transport layer and a concrete
//! vendor adapter: how to build a client from a bearer token, and how to
//! cheaply verify that the token works when a long-lived session opens.

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("vendor rejected the access token: {0}")]
    Unauthorized(String),
    #[error("vendor connectivity check failed: {0}")]
    Unreachable(String),
}

/// Implemented once per adapter binary.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Client: Send + Sync + 'static;

    /// Builds a fresh authenticated client from a bearer token. Called per
    /// request (streamable HTTP) or per session (SSE); clients are never
    /// shared across requests.
    fn connect(&self, token: &str) -> Self::Client;

    /// Lightweight connectivity check run once when an SSE session opens,
    /// before the session is registered.
    async fn probe(&self, client: &Self::Client) -> Result<(), ProbeError>;
}
