//! SSE transport: a long-lived session is opened by `GET /sse`, after which
//! tool-call POSTs reference it by session id and replies flow back down
//! the event stream.
//!
//! The session registry is the only mutable state shared across requests.
//! It is mutated only on the connect/disconnect path; the event loop
//! serializes those mutations, so a plain `RwLock`ed map suffices.

use std::{collections::HashMap, io, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::{RwLock, mpsc};
use tokio_stream::wrappers::ReceiverStream;

use super::{AppState, envelope_response, unauthorized_response};
use crate::{
    connect::Connector,
    context,
    model::{ErrorData, ServerMessage},
};

pub type SessionId = Arc<str>;

pub(crate) fn session_id() -> SessionId {
    uuid::Uuid::new_v4().to_string().into()
}

pub(crate) struct SseSession<C: Connector> {
    /// The vendor client authenticated when the session opened; bound into
    /// a fresh credential scope for every message POSTed to this session.
    client: Arc<C::Client>,
    to_client: mpsc::Sender<ServerMessage>,
}

impl<C: Connector> Clone for SseSession<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            to_client: self.to_client.clone(),
        }
    }
}

pub(crate) type SessionRegistry<C> = Arc<RwLock<HashMap<SessionId, SseSession<C>>>>;

pub(crate) async fn sse_handler<C: Connector>(
    State(state): State<AppState<C>>,
    headers: HeaderMap,
) -> Response {
    let Some(token) = state.auth.token(&headers) else {
        return unauthorized_response(&state.auth.missing_message);
    };

    let client = Arc::new(state.connector.connect(&token));
    // Credentials are validated once per session, not per message.
    if let Err(e) = state.connector.probe(&client).await {
        tracing::warn!(error = %e, "credential probe failed");
        return unauthorized_response(&e.to_string());
    }

    let session = session_id();
    let (to_client, from_server) = mpsc::channel::<ServerMessage>(64);
    state.sessions.write().await.insert(
        session.clone(),
        SseSession {
            client,
            to_client: to_client.clone(),
        },
    );
    tracing::info!(%session, "sse session opened");

    // Deregister when the client disconnects and the stream is dropped.
    {
        let sessions = Arc::clone(&state.sessions);
        let session = session.clone();
        tokio::spawn(async move {
            to_client.closed().await;
            sessions.write().await.remove(&session);
            tracing::debug!(%session, "sse session closed");
        });
    }

    let endpoint = format!("/messages?sessionId={session}");
    let stream = futures::stream::once(futures::future::ok::<_, io::Error>(
        Event::default().event("endpoint").data(endpoint),
    ))
    .chain(
        ReceiverStream::new(from_server).map(|message| match serde_json::to_string(&message) {
            Ok(json) => Ok(Event::default().event("message").data(json)),
            Err(e) => Err(io::Error::new(io::ErrorKind::InvalidData, e)),
        }),
    );

    Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(state.sse_keep_alive))
        .into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PostMessageQuery {
    session_id: Option<String>,
}

pub(crate) async fn post_message_handler<C: Connector>(
    State(state): State<AppState<C>>,
    Query(query): Query<PostMessageQuery>,
    body: String,
) -> Response {
    let Some(session_id) = query.session_id else {
        return envelope_response(
            StatusCode::BAD_REQUEST,
            ErrorData::invalid_request("missing sessionId query parameter"),
        );
    };

    let session = {
        let sessions = state.sessions.read().await;
        sessions.get(session_id.as_str()).cloned()
    };
    let Some(session) = session else {
        return envelope_response(
            StatusCode::NOT_FOUND,
            ErrorData::session_not_found(&session_id),
        );
    };

    let message = match serde_json::from_str(&body) {
        Ok(message) => message,
        Err(e) => {
            return envelope_response(
                StatusCode::BAD_REQUEST,
                ErrorData::parse_error(format!("malformed MCP message: {e}")),
            );
        }
    };

    let reply = context::scope(Arc::clone(&session.client), state.server.handle(message)).await;
    if let Some(reply) = reply {
        if session.to_client.send(reply).await.is_err() {
            // Session tore down while the call was in flight; the result is
            // discarded, matching the no-cancellation contract.
            tracing::debug!(session_id, "session closed before reply could be delivered");
            return envelope_response(StatusCode::GONE, ErrorData::session_not_found(&session_id));
        }
    }
    StatusCode::ACCEPTED.into_response()
}

pub(crate) async fn delete_session_handler<C: Connector>(
    State(state): State<AppState<C>>,
    Path(session_id): Path<String>,
) -> Response {
    let removed = state.sessions.write().await.remove(session_id.as_str());
    match removed {
        Some(_) => {
            tracing::info!(session_id, "sse session deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        None => envelope_response(
            StatusCode::NOT_FOUND,
            ErrorData::session_not_found(&session_id),
        ),
    }
}
