//! Thin authenticated wrapper over the Dropbox HTTP API.
//!
//! Every method is one round trip; no retry, no caching, no backoff. RPC
//! endpoints live on `api.dropboxapi.com`, upload/download endpoints on
//! `content.dropboxapi.com` with arguments passed in the `Dropbox-API-Arg`
//! header. Failures carry the HTTP status and Dropbox's `error_summary` so
//! the handler layer can turn them into guidance text.

use async_trait::async_trait;
use serde_json::{Value, json};
use toolgate::{Connector, ProbeError};

pub const API_BASE: &str = "https://api.dropboxapi.com/2";
pub const CONTENT_BASE: &str = "https://content.dropboxapi.com/2";

#[derive(Debug, thiserror::Error)]
pub enum DropboxError {
    #[error("Dropbox returned HTTP {status}: {summary}")]
    Api {
        status: u16,
        summary: String,
        body: Value,
    },
    #[error("request to Dropbox failed: {0}")]
    Transport(#[from] reqwest::Error),
}

pub struct DropboxClient {
    http: reqwest::Client,
    token: String,
    api_base: String,
    content_base: String,
}

impl DropboxClient {
    pub fn new(token: &str) -> Self {
        Self::with_base_urls(token, API_BASE, CONTENT_BASE)
    }

    /// Base URLs are overridable so tests can point at a stub vendor.
    pub fn with_base_urls(token: &str, api_base: &str, content_base: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.to_owned(),
            api_base: api_base.trim_end_matches('/').to_owned(),
            content_base: content_base.trim_end_matches('/').to_owned(),
        }
    }

    async fn rpc(&self, endpoint: &str, args: Value) -> Result<Value, DropboxError> {
        let response = self
            .http
            .post(format!("{}/{endpoint}", self.api_base))
            .bearer_auth(&self.token)
            .json(&args)
            .send()
            .await?;
        decode_json(response).await
    }

    async fn content_upload(
        &self,
        endpoint: &str,
        args: &Value,
        body: Vec<u8>,
    ) -> Result<Value, DropboxError> {
        let response = self
            .http
            .post(format!("{}/{endpoint}", self.content_base))
            .bearer_auth(&self.token)
            .header("Dropbox-API-Arg", args.to_string())
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await?;
        decode_json(response).await
    }

    /// Returns the response body bytes plus the metadata Dropbox reports in
    /// the `dropbox-api-result` header.
    async fn content_download(
        &self,
        endpoint: &str,
        args: &Value,
    ) -> Result<(Option<Value>, Vec<u8>), DropboxError> {
        let response = self
            .http
            .post(format!("{}/{endpoint}", self.content_base))
            .bearer_auth(&self.token)
            .header("Dropbox-API-Arg", args.to_string())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        let metadata = response
            .headers()
            .get("dropbox-api-result")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| serde_json::from_str(s).ok());
        let bytes = response.bytes().await?.to_vec();
        Ok((metadata, bytes))
    }

    pub async fn get_current_account(&self) -> Result<Value, DropboxError> {
        self.rpc("users/get_current_account", Value::Null).await
    }

    pub async fn list_folder(
        &self,
        path: &str,
        recursive: bool,
        limit: Option<u32>,
    ) -> Result<Value, DropboxError> {
        let mut args = json!({"path": path, "recursive": recursive});
        if let Some(limit) = limit {
            args["limit"] = json!(limit);
        }
        self.rpc("files/list_folder", args).await
    }

    pub async fn get_metadata(&self, path: &str) -> Result<Value, DropboxError> {
        self.rpc("files/get_metadata", json!({"path": path})).await
    }

    pub async fn create_folder(&self, path: &str, autorename: bool) -> Result<Value, DropboxError> {
        self.rpc(
            "files/create_folder_v2",
            json!({"path": path, "autorename": autorename}),
        )
        .await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, DropboxError> {
        self.rpc("files/delete_v2", json!({"path": path})).await
    }

    pub async fn move_item(
        &self,
        from_path: &str,
        to_path: &str,
        autorename: bool,
    ) -> Result<Value, DropboxError> {
        self.rpc(
            "files/move_v2",
            json!({"from_path": from_path, "to_path": to_path, "autorename": autorename}),
        )
        .await
    }

    pub async fn copy_item(
        &self,
        from_path: &str,
        to_path: &str,
        autorename: bool,
    ) -> Result<Value, DropboxError> {
        self.rpc(
            "files/copy_v2",
            json!({"from_path": from_path, "to_path": to_path, "autorename": autorename}),
        )
        .await
    }

    pub async fn search(
        &self,
        query: &str,
        path: Option<&str>,
        max_results: Option<u32>,
    ) -> Result<Value, DropboxError> {
        let mut options = json!({});
        if let Some(path) = path {
            options["path"] = json!(path);
        }
        if let Some(max_results) = max_results {
            options["max_results"] = json!(max_results);
        }
        self.rpc("files/search_v2", json!({"query": query, "options": options}))
            .await
    }

    pub async fn get_temporary_link(&self, path: &str) -> Result<Value, DropboxError> {
        self.rpc("files/get_temporary_link", json!({"path": path}))
            .await
    }

    pub async fn create_shared_link(&self, path: &str) -> Result<Value, DropboxError> {
        self.rpc(
            "sharing/create_shared_link_with_settings",
            json!({"path": path}),
        )
        .await
    }

    pub async fn list_shared_links(&self, path: Option<&str>) -> Result<Value, DropboxError> {
        let args = match path {
            Some(path) => json!({"path": path}),
            None => json!({}),
        };
        self.rpc("sharing/list_shared_links", args).await
    }

    pub async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        overwrite: bool,
        autorename: bool,
    ) -> Result<Value, DropboxError> {
        let mode = if overwrite { "overwrite" } else { "add" };
        let args = json!({"path": path, "mode": mode, "autorename": autorename, "mute": false});
        self.content_upload("files/upload", &args, bytes).await
    }

    pub async fn download(&self, path: &str) -> Result<(Option<Value>, Vec<u8>), DropboxError> {
        self.content_download("files/download", &json!({"path": path}))
            .await
    }

    pub async fn get_thumbnail(
        &self,
        path: &str,
        format: &str,
        size: &str,
    ) -> Result<(Option<Value>, Vec<u8>), DropboxError> {
        let args = json!({
            "resource": {".tag": "path", "path": path},
            "format": {".tag": format},
            "size": {".tag": size},
        });
        self.content_download("files/get_thumbnail_v2", &args).await
    }

    pub async fn delete_batch(&self, paths: &[String]) -> Result<Value, DropboxError> {
        let entries: Vec<Value> = paths.iter().map(|p| json!({"path": p})).collect();
        self.rpc("files/delete_batch", json!({"entries": entries}))
            .await
    }

    pub async fn move_batch(
        &self,
        entries: Vec<Value>,
        autorename: bool,
    ) -> Result<Value, DropboxError> {
        self.rpc(
            "files/move_batch_v2",
            json!({"entries": entries, "autorename": autorename}),
        )
        .await
    }

    pub async fn copy_batch(
        &self,
        entries: Vec<Value>,
        autorename: bool,
    ) -> Result<Value, DropboxError> {
        self.rpc(
            "files/copy_batch_v2",
            json!({"entries": entries, "autorename": autorename}),
        )
        .await
    }

    pub async fn copy_batch_check(&self, async_job_id: &str) -> Result<Value, DropboxError> {
        self.rpc("files/copy_batch/check_v2", json!({"async_job_id": async_job_id}))
            .await
    }

    pub async fn move_batch_check(&self, async_job_id: &str) -> Result<Value, DropboxError> {
        self.rpc("files/move_batch/check_v2", json!({"async_job_id": async_job_id}))
            .await
    }

    pub async fn delete_batch_check(&self, async_job_id: &str) -> Result<Value, DropboxError> {
        self.rpc("files/delete_batch/check", json!({"async_job_id": async_job_id}))
            .await
    }
}

async fn decode_json(response: reqwest::Response) -> Result<Value, DropboxError> {
    if response.status().is_success() {
        Ok(response.json().await?)
    } else {
        Err(api_error(response).await)
    }
}

async fn api_error(response: reqwest::Response) -> DropboxError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let body: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
    let summary = body
        .get("error_summary")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| {
            if text.is_empty() {
                "no error body".to_owned()
            } else {
                text
            }
        });
    DropboxError::Api {
        status,
        summary,
        body,
    }
}

#[derive(Debug, Default)]
pub struct DropboxConnector {
    api_base: Option<String>,
    content_base: Option<String>,
}

impl DropboxConnector {
    pub fn with_base_urls(api_base: &str, content_base: &str) -> Self {
        Self {
            api_base: Some(api_base.to_owned()),
            content_base: Some(content_base.to_owned()),
        }
    }
}

#[async_trait]
impl Connector for DropboxConnector {
    type Client = DropboxClient;

    fn connect(&self, token: &str) -> Self::Client {
        DropboxClient::with_base_urls(
            token,
            self.api_base.as_deref().unwrap_or(API_BASE),
            self.content_base.as_deref().unwrap_or(CONTENT_BASE),
        )
    }

    async fn probe(&self, client: &Self::Client) -> Result<(), ProbeError> {
        match client.get_current_account().await {
            Ok(_) => Ok(()),
            Err(DropboxError::Api {
                status: 401,
                summary,
                ..
            }) => Err(ProbeError::Unauthorized(summary)),
            Err(e) => Err(ProbeError::Unreachable(e.to_string())),
        }
    }
}
