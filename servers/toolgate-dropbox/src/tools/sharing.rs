//! Shared-link tools.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use toolgate::{CallToolResult, ErrorData, context, parse_args};

use super::vendor_error;
use crate::client::{DropboxClient, DropboxError};

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct ListSharedLinksArgs {
    /// Only list links for this file or folder.
    #[serde(default)]
    pub path: Option<String>,
}

pub(crate) async fn create_shared_link(args: Option<Value>) -> Result<CallToolResult, ErrorData> {
    let args: super::files::PathArgs = parse_args("create_shared_link", args)?;
    let client = context::current::<DropboxClient>();
    match client.create_shared_link(&args.path).await {
        Ok(body) => Ok(CallToolResult::text(format!(
            "Shared link for \"{}\": {}",
            args.path,
            body["url"].as_str().unwrap_or("(no url returned)")
        ))),
        // shared_link_already_exists carries the existing link in the error body.
        Err(DropboxError::Api {
            status: 409, body, ..
        }) if body["error"][".tag"] == "shared_link_already_exists" => {
            let existing = body["error"]["shared_link_already_exists"]["metadata"]["url"]
                .as_str()
                .unwrap_or("(unknown)");
            Ok(CallToolResult::text(format!(
                "A shared link already exists for \"{}\": {existing}",
                args.path
            )))
        }
        Err(e) => Ok(vendor_error("create a shared link", &e)),
    }
}

pub(crate) async fn list_shared_links(args: Option<Value>) -> Result<CallToolResult, ErrorData> {
    let args: ListSharedLinksArgs = parse_args("list_shared_links", args)?;
    let client = context::current::<DropboxClient>();
    match client.list_shared_links(args.path.as_deref()).await {
        Ok(body) => {
            let links = body["links"].as_array().cloned().unwrap_or_default();
            if links.is_empty() {
                return Ok(CallToolResult::text("No shared links found."));
            }
            let lines: Vec<String> = links
                .iter()
                .map(|l| {
                    format!(
                        "{} -> {}",
                        l["path_lower"].as_str().unwrap_or("(unknown path)"),
                        l["url"].as_str().unwrap_or("(no url)")
                    )
                })
                .collect();
            Ok(CallToolResult::text(lines.join("\n")))
        }
        Err(e) => Ok(vendor_error("list shared links", &e)),
    }
}
