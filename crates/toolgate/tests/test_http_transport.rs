use std::sync::Arc;

use axum::{Router, body::Body, http::Request};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use toolgate::{
    AuthConfig, CallToolResult, Connector, McpServer, ProbeError, ToolRegistry, context,
    http_router, input_schema, parse_args,
};
use tower::ServiceExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".to_string().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

struct TestClient {
    token: String,
}

struct TestConnector {
    reject_probe: bool,
}

#[async_trait::async_trait]
impl Connector for TestConnector {
    type Client = TestClient;

    fn connect(&self, token: &str) -> Self::Client {
        TestClient {
            token: token.to_owned(),
        }
    }

    async fn probe(&self, client: &Self::Client) -> Result<(), ProbeError> {
        if self.reject_probe {
            Err(ProbeError::Unauthorized(format!(
                "token {} rejected",
                client.token
            )))
        } else {
            Ok(())
        }
    }
}

#[derive(serde::Deserialize, schemars::JsonSchema)]
struct ReverseArgs {
    text: String,
}

fn test_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(
        "whoami",
        "Report the token of the ambient client",
        input_schema::<ReverseArgs>(),
        |_args| async move {
            let client = context::current::<TestClient>();
            Ok(CallToolResult::text(client.token.clone()))
        },
    );
    registry.register(
        "reverse",
        "Reverse a string",
        input_schema::<ReverseArgs>(),
        |args| async move {
            let args: ReverseArgs = parse_args("reverse", args)?;
            Ok(CallToolResult::text(args.text.chars().rev().collect::<String>()))
        },
    );
    registry
}

fn test_router(fallback: Option<String>, reject_probe: bool) -> Router {
    init_tracing();
    let server = Arc::new(McpServer::new("toolgate-test", "0.0.1", test_registry()));
    let auth = AuthConfig::new(
        "Missing test access token. Pass it in the x-auth-token header or set TEST_ACCESS_TOKEN.",
        fallback,
    );
    http_router(Arc::new(TestConnector { reject_probe }), server, auth)
}

async fn post_mcp(router: &Router, token: Option<&str>, body: Value) -> (u16, Value) {
    let mut request = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json");
    if let Some(token) = token {
        request = request.header("x-auth-token", token);
    }
    let response = router
        .clone()
        .oneshot(request.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();
    let status = response.status().as_u16();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn call_tool(id: i64, name: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments},
    })
}

#[tokio::test]
async fn missing_token_is_a_401_envelope() {
    let router = test_router(None, false);
    let (status, body) = post_mcp(&router, None, json!({"jsonrpc": "2.0", "id": 1, "method": "ping"})).await;
    assert_eq!(status, 401);
    assert_eq!(body["jsonrpc"], "2.0");
    assert_eq!(body["id"], Value::Null);
    assert_eq!(body["error"]["code"], -32001);
    assert!(
        body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Missing test access token")
    );
}

#[tokio::test]
async fn env_fallback_token_authenticates() {
    let router = test_router(Some("fallback-token".into()), false);
    let (status, body) = post_mcp(&router, None, call_tool(1, "whoami", json!({}))).await;
    assert_eq!(status, 200);
    assert_eq!(body["result"]["content"][0]["text"], "fallback-token");
}

#[tokio::test]
async fn get_and_delete_on_mcp_are_405() {
    let router = test_router(None, false);
    for method in ["GET", "DELETE"] {
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri("/mcp")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), 405, "{method} /mcp");
    }
}

#[tokio::test]
async fn malformed_body_is_a_parse_error_envelope() {
    let router = test_router(None, false);
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/mcp")
                .header("x-auth-token", "tok")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], -32700);
    assert_eq!(body["id"], Value::Null);
}

#[tokio::test]
async fn tools_list_and_call_round_trip() {
    let router = test_router(None, false);
    let (status, body) = post_mcp(
        &router,
        Some("tok"),
        json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}),
    )
    .await;
    assert_eq!(status, 200);
    let names: Vec<&str> = body["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["whoami", "reverse"]);

    let (_, body) = post_mcp(&router, Some("tok"), call_tool(2, "reverse", json!({"text": "abc"}))).await;
    assert_eq!(body["result"]["content"][0]["text"], "cba");
}

#[tokio::test]
async fn notifications_get_an_empty_202() {
    let router = test_router(None, false);
    let (status, body) = post_mcp(
        &router,
        Some("tok"),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
    )
    .await;
    assert_eq!(status, 202);
    assert_eq!(body, Value::Null);
}

#[tokio::test(flavor = "current_thread")]
async fn concurrent_requests_see_their_own_client() {
    let router = test_router(None, false);
    let (a, b) = tokio::join!(
        post_mcp(&router, Some("token-a"), call_tool(1, "whoami", json!({}))),
        post_mcp(&router, Some("token-b"), call_tool(2, "whoami", json!({})))
    );
    assert_eq!(a.1["result"]["content"][0]["text"], "token-a");
    assert_eq!(b.1["result"]["content"][0]["text"], "token-b");
}

#[tokio::test]
async fn health_is_idempotent_with_non_decreasing_timestamp() {
    let router = test_router(None, false);
    let mut last_timestamp = String::new();
    let mut last_version = String::new();
    for _ in 0..3 {
        let response = router
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "healthy");
        let timestamp = body["timestamp"].as_str().unwrap().to_owned();
        let version = body["version"].as_str().unwrap().to_owned();
        assert!(timestamp >= last_timestamp);
        if !last_version.is_empty() {
            assert_eq!(version, last_version);
        }
        last_timestamp = timestamp;
        last_version = version;
    }
}

#[tokio::test]
async fn post_messages_without_session_id_is_400() {
    let router = test_router(None, false);
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/messages")
                .body(Body::from(call_tool(1, "whoami", json!({})).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn post_messages_with_unknown_session_is_404() {
    let router = test_router(None, false);
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/messages?sessionId=does-not-exist")
                .body(Body::from(call_tool(1, "whoami", json!({})).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], -32002);
}

#[tokio::test]
async fn delete_unknown_session_is_404() {
    let router = test_router(None, false);
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/sse/does-not-exist")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn sse_rejects_a_failing_credential_probe() {
    let router = test_router(None, true);
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/sse")
                .header("x-auth-token", "bad")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

/// Full SSE session lifecycle against a real listener: open, receive the
/// endpoint event, post a message, read the reply off the stream, delete
/// the session, and observe 404 afterwards.
#[tokio::test]
async fn sse_session_lifecycle() -> anyhow::Result<()> {
    let router = test_router(None, false);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let ct = CancellationToken::new();
    tokio::spawn(toolgate::serve(listener, router, ct.clone()));

    let http = reqwest::Client::new();
    let mut events = http
        .get(format!("http://{addr}/sse"))
        .header("accept", "text/event-stream")
        .header("x-auth-token", "session-token")
        .send()
        .await?;
    assert_eq!(events.status(), 200);

    // First event announces the message endpoint with the session id.
    let first = String::from_utf8(events.chunk().await?.expect("endpoint event").to_vec())?;
    let session_id = first
        .split("sessionId=")
        .nth(1)
        .expect("sessionId in endpoint event")
        .split_whitespace()
        .next()
        .unwrap()
        .to_owned();

    // A tool call posted into the session is answered over the stream.
    let post = http
        .post(format!("http://{addr}/messages?sessionId={session_id}"))
        .json(&call_tool(1, "whoami", json!({})))
        .send()
        .await?;
    assert_eq!(post.status(), 202);

    let mut reply = String::new();
    for _ in 0..10 {
        let chunk = tokio::time::timeout(std::time::Duration::from_secs(5), events.chunk())
            .await??
            .expect("message event");
        reply.push_str(std::str::from_utf8(&chunk)?);
        if reply.contains("session-token") {
            break;
        }
    }
    assert!(reply.contains("session-token"), "reply was: {reply}");

    // Explicit teardown removes the session; later posts see 404.
    let delete = http
        .delete(format!("http://{addr}/sse/{session_id}"))
        .send()
        .await?;
    assert_eq!(delete.status(), 204);

    let post = http
        .post(format!("http://{addr}/messages?sessionId={session_id}"))
        .json(&call_tool(2, "whoami", json!({})))
        .send()
        .await?;
    assert_eq!(post.status(), 404);

    ct.cancel();
    Ok(())
}
