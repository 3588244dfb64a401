//! Drives the Fireflies handlers against a stub GraphQL server.

use std::sync::Arc;

use axum::{Json, Router, routing::post};
use serde_json::{Value, json};
use toolgate::{Connector, Content, ProbeError, context};
use toolgate_fireflies::{FirefliesClient, FirefliesConnector};

/// One endpoint, dispatching on the query text the way the real API
/// dispatches on the GraphQL document.
async fn graphql(Json(body): Json<Value>) -> Json<Value> {
    let query = body["query"].as_str().unwrap_or_default();
    if query.contains("user {") {
        return Json(json!({
            "data": {"user": {
                "user_id": "u-1", "name": "Pat", "email": "pat@example.com",
                "num_transcripts": 12, "minutes_consumed": 340.0,
            }},
        }));
    }
    if query.contains("transcript(id:") {
        let id = body["variables"]["id"].as_str().unwrap_or_default();
        if id == "missing" {
            // In-band error under HTTP 200.
            return Json(json!({
                "errors": [{
                    "message": "Transcript not found",
                    "extensions": {"code": "object_not_found"},
                }],
            }));
        }
        return Json(json!({
            "data": {"transcript": {
                "id": id, "title": "Weekly sync", "date": "2025-06-02T10:00:00.000Z",
                "duration": 30.0, "organizer_email": "pat@example.com",
                "participants": ["pat@example.com", "sam@example.com"],
                "sentences": [
                    {"speaker_name": "Pat", "text": "Let's get started.", "start_time": 0.0},
                    {"speaker_name": "Sam", "text": "Sounds good.", "start_time": 2.5},
                ],
            }},
        }));
    }
    Json(json!({
        "data": {"transcripts": [
            {"id": "tx1", "title": "Weekly sync", "date": "2025-06-02T10:00:00.000Z",
             "duration": 30.0, "organizer_email": "pat@example.com"},
        ]},
    }))
}

async fn stub_vendor() -> anyhow::Result<String> {
    let app = Router::new().route("/graphql", post(graphql));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("http://{}/graphql", listener.local_addr()?);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(url)
}

async fn call(url: &str, tool: &str, args: Value) -> anyhow::Result<toolgate::CallToolResult> {
    let registry = toolgate_fireflies::tools::registry();
    let handler = registry.handler(tool).expect("tool registered");
    let client = Arc::new(FirefliesClient::with_url("stub-key", url));
    Ok(context::scope(client, handler(Some(args))).await?)
}

fn text_of(result: &toolgate::CallToolResult) -> &str {
    match &result.content[0] {
        Content::Text { text } => text,
        other => panic!("expected text content, got {other:?}"),
    }
}

#[tokio::test]
async fn get_user_reports_profile_and_usage() -> anyhow::Result<()> {
    let url = stub_vendor().await?;
    let result = call(&url, "fireflies_get_user", json!({})).await?;
    let text = text_of(&result);
    assert!(text.contains("Pat <pat@example.com>"), "text was: {text}");
    assert!(text.contains("12 transcripts"), "text was: {text}");
    Ok(())
}

#[tokio::test]
async fn transcript_lines_carry_speaker_names() -> anyhow::Result<()> {
    let url = stub_vendor().await?;
    let result = call(&url, "fireflies_get_transcript", json!({"transcript_id": "tx1"})).await?;
    let text = text_of(&result);
    assert!(text.contains("Weekly sync (id tx1)"), "text was: {text}");
    assert!(text.contains("Pat: Let's get started."), "text was: {text}");
    Ok(())
}

#[tokio::test]
async fn in_band_graphql_error_is_guidance_text_not_an_error() -> anyhow::Result<()> {
    let url = stub_vendor().await?;
    let result = call(
        &url,
        "fireflies_get_transcript",
        json!({"transcript_id": "missing"}),
    )
    .await?;
    assert!(result.is_error.is_none());
    let text = text_of(&result);
    assert!(text.contains("object_not_found"), "text was: {text}");
    assert!(text.contains("check the transcript id"), "text was: {text}");
    Ok(())
}

#[tokio::test]
async fn connector_probe_succeeds_against_the_stub() -> anyhow::Result<()> {
    let url = stub_vendor().await?;
    let connector = FirefliesConnector::with_url(&url);
    let client = connector.connect("stub-key");
    connector.probe(&client).await.map_err(|e| match e {
        ProbeError::Unauthorized(m) | ProbeError::Unreachable(m) => anyhow::anyhow!(m),
    })?;
    Ok(())
}
