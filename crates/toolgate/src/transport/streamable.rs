//! Stateless streamable-HTTP transport: every `POST /mcp` independently
//! authenticates, binds a fresh credential context, handles one message,
//! and tears everything down when the response closes.

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use super::{AppState, envelope_response, unauthorized_response};
use crate::{connect::Connector, context, model::ClientMessage, model::ErrorData};

pub(crate) async fn post_handler<C: Connector>(
    State(state): State<AppState<C>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let Some(token) = state.auth.token(&headers) else {
        return unauthorized_response(&state.auth.missing_message);
    };

    let message: ClientMessage = match serde_json::from_str(&body) {
        Ok(message) => message,
        Err(e) => {
            return envelope_response(
                StatusCode::BAD_REQUEST,
                ErrorData::parse_error(format!("malformed MCP message: {e}")),
            );
        }
    };

    let client = Arc::new(state.connector.connect(&token));
    let reply = context::scope(client, state.server.handle(message)).await;
    match reply {
        Some(message) => Json(message).into_response(),
        // Notifications have no reply body.
        None => StatusCode::ACCEPTED.into_response(),
    }
}

pub(crate) async fn method_not_allowed() -> StatusCode {
    StatusCode::METHOD_NOT_ALLOWED
}
