//! Drives the Miro handlers against a stub vendor server.

use std::sync::Arc;

use axum::{Json, Router, http::StatusCode, routing::get, routing::post};
use serde_json::{Value, json};
use toolgate::{Content, context};
use toolgate_miro::MiroClient;

async fn stub_vendor() -> anyhow::Result<String> {
    let app = Router::new()
        .route(
            "/boards",
            get(|| async {
                Json(json!({
                    "data": [
                        {"id": "uX1", "name": "Roadmap"},
                        {"id": "uX2", "name": "Retro"},
                    ],
                }))
            }),
        )
        .route(
            "/boards/{board_id}/sticky_notes",
            post(|| async {
                (
                    StatusCode::NOT_FOUND,
                    Json(json!({"type": "error", "code": "not_found", "message": "Board not found"})),
                )
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let base = format!("http://{}", listener.local_addr()?);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(base)
}

async fn call(base: &str, tool: &str, args: Value) -> anyhow::Result<toolgate::CallToolResult> {
    let registry = toolgate_miro::tools::registry();
    let handler = registry.handler(tool).expect("tool registered");
    let client = Arc::new(MiroClient::with_base_url("stub-token", base));
    Ok(context::scope(client, handler(Some(args))).await?)
}

fn text_of(result: &toolgate::CallToolResult) -> &str {
    match &result.content[0] {
        Content::Text { text } => text,
        other => panic!("expected text content, got {other:?}"),
    }
}

#[tokio::test]
async fn list_boards_formats_names_and_ids() -> anyhow::Result<()> {
    let base = stub_vendor().await?;
    let result = call(&base, "miro_list_boards", json!({})).await?;
    let text = text_of(&result);
    assert!(text.contains("2 boards"));
    assert!(text.contains("Roadmap (id uX1)"));
    Ok(())
}

#[tokio::test]
async fn missing_board_is_guidance_text_not_an_error() -> anyhow::Result<()> {
    let base = stub_vendor().await?;
    let result = call(
        &base,
        "miro_create_sticky_note",
        json!({"board_id": "gone", "content": "hi"}),
    )
    .await?;
    assert!(result.is_error.is_none());
    let text = text_of(&result);
    assert!(text.contains("Error 404"), "text was: {text}");
    assert!(text.contains("check the board or item id"), "text was: {text}");
    Ok(())
}
