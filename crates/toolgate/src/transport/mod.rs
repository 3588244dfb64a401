//! Dual-transport HTTP surface for one adapter server.
//!
//! Routes:
//! - `POST /mcp` — stateless streamable HTTP, one MCP message per request
//! - `GET /sse` + `POST /messages?sessionId=` + `DELETE /sse/{id}` — the
//!   session-oriented SSE transport
//! - `GET /health` — liveness probe
//!
//! Both transports dispatch into the same [`McpServer`], constructed by the
//! binary at startup and injected here.

mod sse;
mod streamable;

use std::{io, sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

pub use self::sse::SessionId;
use crate::{connect::Connector, model::ErrorData, model::ServerMessage, server::McpServer};

/// Header carrying the vendor bearer token.
pub const AUTH_HEADER: &str = "x-auth-token";

const DEFAULT_SSE_KEEP_ALIVE: Duration = Duration::from_secs(15);

/// How requests authenticate: the `x-auth-token` header, with an optional
/// process-wide fallback token read from the environment at startup.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    missing_message: String,
    fallback: Option<String>,
}

impl AuthConfig {
    pub fn new(missing_message: impl Into<String>, fallback: Option<String>) -> Self {
        Self {
            missing_message: missing_message.into(),
            fallback: fallback.filter(|t| !t.is_empty()),
        }
    }

    fn token(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get(AUTH_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
            .or_else(|| self.fallback.clone())
    }
}

pub(crate) struct AppState<C: Connector> {
    pub(crate) connector: Arc<C>,
    pub(crate) server: Arc<McpServer>,
    pub(crate) auth: Arc<AuthConfig>,
    pub(crate) sessions: sse::SessionRegistry<C>,
    pub(crate) sse_keep_alive: Duration,
}

impl<C: Connector> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            connector: Arc::clone(&self.connector),
            server: Arc::clone(&self.server),
            auth: Arc::clone(&self.auth),
            sessions: Arc::clone(&self.sessions),
            sse_keep_alive: self.sse_keep_alive,
        }
    }
}

/// Builds the full route table for one adapter server.
pub fn http_router<C: Connector>(
    connector: Arc<C>,
    server: Arc<McpServer>,
    auth: AuthConfig,
) -> Router {
    let state = AppState {
        connector,
        server,
        auth: Arc::new(auth),
        sessions: sse::SessionRegistry::<C>::default(),
        sse_keep_alive: DEFAULT_SSE_KEEP_ALIVE,
    };
    Router::new()
        .route(
            "/mcp",
            post(streamable::post_handler::<C>)
                .get(streamable::method_not_allowed)
                .delete(streamable::method_not_allowed),
        )
        .route("/sse", get(sse::sse_handler::<C>))
        .route("/messages", post(sse::post_message_handler::<C>))
        .route("/sse/{session_id}", delete(sse::delete_session_handler::<C>))
        .route("/health", get(health_handler::<C>))
        .with_state(state)
}

/// Serves the router until the cancellation token fires.
pub async fn serve(
    listener: tokio::net::TcpListener,
    router: Router,
    ct: CancellationToken,
) -> io::Result<()> {
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            ct.cancelled().await;
            tracing::info!("server cancelled");
        })
        .await
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    version: String,
    server: String,
}

async fn health_handler<C: Connector>(State(state): State<AppState<C>>) -> Response {
    let info = state.server.info();
    Json(HealthResponse {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: info.version.clone(),
        server: info.name.clone(),
    })
    .into_response()
}

/// Protocol-level failure as an HTTP response: a JSON-RPC error envelope
/// with a null id, paired with the matching status code.
pub(crate) fn envelope_response(status: StatusCode, error: ErrorData) -> Response {
    (status, Json(ServerMessage::error(None, error))).into_response()
}

pub(crate) fn unauthorized_response(message: &str) -> Response {
    envelope_response(
        StatusCode::UNAUTHORIZED,
        ErrorData::unauthorized(message.to_owned()),
    )
}
