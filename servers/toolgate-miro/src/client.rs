//! Thin authenticated wrapper over the Miro REST API (v2).
//!
//! One round trip per method, no retry or backoff. Miro reports failures
//! as `{"type": "error", "code": ..., "message": ...}` bodies alongside the
//! HTTP status.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Value, json};
use toolgate::{Connector, ProbeError};

pub const API_BASE: &str = "https://api.miro.com/v2";

#[derive(Debug, thiserror::Error)]
pub enum MiroError {
    #[error("Miro returned HTTP {status}: {message}")]
    Api {
        status: u16,
        message: String,
        body: Value,
    },
    #[error("request to Miro failed: {0}")]
    Transport(#[from] reqwest::Error),
}

pub struct MiroClient {
    http: reqwest::Client,
    token: String,
    base: String,
}

impl MiroClient {
    pub fn new(token: &str) -> Self {
        Self::with_base_url(token, API_BASE)
    }

    pub fn with_base_url(token: &str, base: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.to_owned(),
            base: base.trim_end_matches('/').to_owned(),
        }
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, MiroError> {
        let mut request = self
            .http
            .request(method, format!("{}{path}", self.base))
            .bearer_auth(&self.token);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            if status == reqwest::StatusCode::NO_CONTENT {
                return Ok(Value::Null);
            }
            return Ok(response.json().await?);
        }
        let text = response.text().await.unwrap_or_default();
        let body: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| {
                if text.is_empty() {
                    "no error body".to_owned()
                } else {
                    text
                }
            });
        Err(MiroError::Api {
            status: status.as_u16(),
            message,
            body,
        })
    }

    pub async fn list_boards(&self, limit: Option<u32>) -> Result<Value, MiroError> {
        let limit = limit.unwrap_or(20);
        self.request(Method::GET, &format!("/boards?limit={limit}"), None)
            .await
    }

    pub async fn create_board(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Value, MiroError> {
        let mut body = json!({"name": name});
        if let Some(description) = description {
            body["description"] = json!(description);
        }
        self.request(Method::POST, "/boards", Some(body)).await
    }

    pub async fn get_board(&self, board_id: &str) -> Result<Value, MiroError> {
        self.request(Method::GET, &format!("/boards/{board_id}"), None)
            .await
    }

    pub async fn update_board(
        &self,
        board_id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Value, MiroError> {
        let mut body = json!({});
        if let Some(name) = name {
            body["name"] = json!(name);
        }
        if let Some(description) = description {
            body["description"] = json!(description);
        }
        self.request(Method::PATCH, &format!("/boards/{board_id}"), Some(body))
            .await
    }

    pub async fn delete_board(&self, board_id: &str) -> Result<Value, MiroError> {
        self.request(Method::DELETE, &format!("/boards/{board_id}"), None)
            .await
    }

    pub async fn list_items(
        &self,
        board_id: &str,
        item_type: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Value, MiroError> {
        let limit = limit.unwrap_or(20);
        let mut path = format!("/boards/{board_id}/items?limit={limit}");
        if let Some(item_type) = item_type {
            path.push_str(&format!("&type={item_type}"));
        }
        self.request(Method::GET, &path, None).await
    }

    pub async fn create_sticky_note(
        &self,
        board_id: &str,
        content: &str,
        color: Option<&str>,
        x: f64,
        y: f64,
    ) -> Result<Value, MiroError> {
        let mut body = json!({
            "data": {"content": content},
            "position": {"x": x, "y": y},
        });
        if let Some(color) = color {
            body["style"] = json!({"fillColor": color});
        }
        self.request(
            Method::POST,
            &format!("/boards/{board_id}/sticky_notes"),
            Some(body),
        )
        .await
    }

    pub async fn create_shape(
        &self,
        board_id: &str,
        shape: &str,
        content: Option<&str>,
        x: f64,
        y: f64,
    ) -> Result<Value, MiroError> {
        let mut data = json!({"shape": shape});
        if let Some(content) = content {
            data["content"] = json!(content);
        }
        self.request(
            Method::POST,
            &format!("/boards/{board_id}/shapes"),
            Some(json!({"data": data, "position": {"x": x, "y": y}})),
        )
        .await
    }

    pub async fn create_card(
        &self,
        board_id: &str,
        title: &str,
        description: Option<&str>,
        x: f64,
        y: f64,
    ) -> Result<Value, MiroError> {
        let mut data = json!({"title": title});
        if let Some(description) = description {
            data["description"] = json!(description);
        }
        self.request(
            Method::POST,
            &format!("/boards/{board_id}/cards"),
            Some(json!({"data": data, "position": {"x": x, "y": y}})),
        )
        .await
    }

    pub async fn delete_item(&self, board_id: &str, item_id: &str) -> Result<Value, MiroError> {
        self.request(
            Method::DELETE,
            &format!("/boards/{board_id}/items/{item_id}"),
            None,
        )
        .await
    }
}

#[derive(Debug, Default)]
pub struct MiroConnector {
    base: Option<String>,
}

impl MiroConnector {
    pub fn with_base_url(base: &str) -> Self {
        Self {
            base: Some(base.to_owned()),
        }
    }
}

#[async_trait]
impl Connector for MiroConnector {
    type Client = MiroClient;

    fn connect(&self, token: &str) -> Self::Client {
        MiroClient::with_base_url(token, self.base.as_deref().unwrap_or(API_BASE))
    }

    async fn probe(&self, client: &Self::Client) -> Result<(), ProbeError> {
        match client.list_boards(Some(1)).await {
            Ok(_) => Ok(()),
            Err(MiroError::Api {
                status: 401,
                message,
                ..
            }) => Err(ProbeError::Unauthorized(message)),
            Err(e) => Err(ProbeError::Unreachable(e.to_string())),
        }
    }
}
