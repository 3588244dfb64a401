//! Thin authenticated wrapper over the Fireflies.ai GraphQL API.
//!
//! Every call is a POST of `{query, variables}` to a single endpoint.
//! Fireflies reports failures in an `errors` array (message plus an
//! `extensions.code` string) and may do so even under HTTP 200, so the
//! response body is checked on every round trip.

use async_trait::async_trait;
use serde_json::{Value, json};
use toolgate::{Connector, ProbeError};

pub const API_URL: &str = "https://api.fireflies.ai/graphql";

#[derive(Debug, thiserror::Error)]
pub enum FirefliesError {
    /// A GraphQL-level error: HTTP status (200 for in-band errors),
    /// the first error's message and its `extensions.code` if present.
    #[error("Fireflies returned {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
    #[error("request to Fireflies failed: {0}")]
    Transport(#[from] reqwest::Error),
}

pub struct FirefliesClient {
    http: reqwest::Client,
    token: String,
    url: String,
}

impl FirefliesClient {
    pub fn new(token: &str) -> Self {
        Self::with_url(token, API_URL)
    }

    pub fn with_url(token: &str, url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.to_owned(),
            url: url.to_owned(),
        }
    }

    /// Runs one GraphQL operation and returns the `data` payload.
    pub async fn query(&self, query: &str, variables: Value) -> Result<Value, FirefliesError> {
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&json!({"query": query, "variables": variables}))
            .send()
            .await?;
        let status = response.status().as_u16();
        let mut body: Value = response.json().await?;
        if let Some(first) = body["errors"].as_array().and_then(|errs| errs.first()) {
            return Err(FirefliesError::Api {
                status,
                code: first["extensions"]["code"]
                    .as_str()
                    .unwrap_or("unknown")
                    .to_owned(),
                message: first["message"]
                    .as_str()
                    .unwrap_or("no error message")
                    .to_owned(),
            });
        }
        if !(200..300).contains(&status) {
            return Err(FirefliesError::Api {
                status,
                code: "http_error".to_owned(),
                message: format!("HTTP {status} with no GraphQL errors array"),
            });
        }
        Ok(body["data"].take())
    }

    pub async fn get_user(&self) -> Result<Value, FirefliesError> {
        self.query(
            "query { user { user_id name email num_transcripts minutes_consumed } }",
            json!({}),
        )
        .await
    }

    pub async fn list_transcripts(&self, limit: u32) -> Result<Value, FirefliesError> {
        self.query(
            "query Transcripts($limit: Int) { transcripts(limit: $limit) { \
             id title date duration organizer_email } }",
            json!({"limit": limit}),
        )
        .await
    }

    pub async fn get_transcript(&self, transcript_id: &str) -> Result<Value, FirefliesError> {
        self.query(
            "query Transcript($id: String!) { transcript(id: $id) { \
             id title date duration organizer_email participants \
             sentences { speaker_name text start_time } } }",
            json!({"id": transcript_id}),
        )
        .await
    }

    pub async fn get_summary(&self, transcript_id: &str) -> Result<Value, FirefliesError> {
        self.query(
            "query Summary($id: String!) { transcript(id: $id) { \
             id title summary { overview keywords action_items outline } } }",
            json!({"id": transcript_id}),
        )
        .await
    }

    pub async fn search_transcripts(
        &self,
        title: &str,
        limit: u32,
    ) -> Result<Value, FirefliesError> {
        self.query(
            "query Search($title: String, $limit: Int) { \
             transcripts(title: $title, limit: $limit) { \
             id title date duration organizer_email } }",
            json!({"title": title, "limit": limit}),
        )
        .await
    }
}

#[derive(Debug, Default)]
pub struct FirefliesConnector {
    url: Option<String>,
}

impl FirefliesConnector {
    pub fn with_url(url: &str) -> Self {
        Self {
            url: Some(url.to_owned()),
        }
    }
}

#[async_trait]
impl Connector for FirefliesConnector {
    type Client = FirefliesClient;

    fn connect(&self, token: &str) -> Self::Client {
        FirefliesClient::with_url(token, self.url.as_deref().unwrap_or(API_URL))
    }

    async fn probe(&self, client: &Self::Client) -> Result<(), ProbeError> {
        match client.query("query { user { user_id } }", json!({})).await {
            Ok(_) => Ok(()),
            Err(FirefliesError::Api {
                status: 401,
                message,
                ..
            }) => Err(ProbeError::Unauthorized(message)),
            Err(FirefliesError::Api { code, message, .. })
                if code == "invalid_api_key" || code == "auth_error" =>
            {
                Err(ProbeError::Unauthorized(message))
            }
            Err(e) => Err(ProbeError::Unreachable(e.to_string())),
        }
    }
}
