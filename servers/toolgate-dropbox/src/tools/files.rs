//! File and folder tools.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use toolgate::{CallToolResult, Content, ErrorData, context, parse_args};

use super::{describe_entry, vendor_error};
use crate::client::{DropboxClient, DropboxError};

/// Files above this size are not inlined; callers are pointed at
/// `get_temporary_link` instead.
const INLINE_DOWNLOAD_CAP: usize = 1024 * 1024;

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct PathArgs {
    /// Path of the file or folder, e.g. "/docs/report.pdf".
    pub path: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct ListFolderArgs {
    /// Folder path; use "" for the root folder.
    pub path: String,
    /// Also list the contents of all subfolders.
    #[serde(default)]
    pub recursive: bool,
    /// Maximum number of entries to return.
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct CreateFolderArgs {
    /// Path of the folder to create.
    pub path: String,
    /// Rename the new folder on conflict instead of failing.
    #[serde(default)]
    pub autorename: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct RelocateArgs {
    /// Current path of the file or folder.
    pub from_path: String,
    /// Destination path.
    pub to_path: String,
    /// Rename on conflict instead of failing.
    #[serde(default)]
    pub autorename: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct SearchArgs {
    /// Search query string.
    pub query: String,
    /// Restrict the search to this folder.
    #[serde(default)]
    pub path: Option<String>,
    /// Maximum number of matches to return.
    #[serde(default)]
    pub max_results: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub(crate) enum UploadEncoding {
    Text,
    Base64,
}

impl Default for UploadEncoding {
    fn default() -> Self {
        UploadEncoding::Text
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct UploadArgs {
    /// Destination path, including the file name.
    pub path: String,
    /// File content, plain text or base64 depending on `encoding`.
    pub content: String,
    /// How `content` is encoded.
    #[serde(default)]
    pub encoding: UploadEncoding,
    /// Overwrite an existing file at the path.
    #[serde(default)]
    pub overwrite: bool,
    /// Rename on conflict instead of failing.
    #[serde(default)]
    pub autorename: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct ThumbnailArgs {
    /// Path of the image or document file.
    pub path: String,
    /// Thumbnail format: "jpeg" or "png".
    #[serde(default = "default_thumbnail_format")]
    pub format: String,
    /// Thumbnail size tag, e.g. "w64h64", "w256h256", "w1024h768".
    #[serde(default = "default_thumbnail_size")]
    pub size: String,
}

fn default_thumbnail_format() -> String {
    "jpeg".to_owned()
}

fn default_thumbnail_size() -> String {
    "w256h256".to_owned()
}

pub(crate) async fn list_folder(args: Option<Value>) -> Result<CallToolResult, ErrorData> {
    let args: ListFolderArgs = parse_args("list_folder", args)?;
    let client = context::current::<DropboxClient>();
    match client
        .list_folder(&args.path, args.recursive, args.limit)
        .await
    {
        Ok(body) => {
            let entries = body["entries"].as_array().cloned().unwrap_or_default();
            let shown = match args.limit {
                Some(limit) => entries.iter().take(limit as usize).collect::<Vec<_>>(),
                None => entries.iter().collect(),
            };
            let mut lines = vec![format!(
                "{} entries in \"{}\":",
                shown.len(),
                if args.path.is_empty() { "/" } else { &args.path }
            )];
            lines.extend(shown.iter().map(|e| describe_entry(e)));
            if body["has_more"].as_bool().unwrap_or(false) {
                lines.push("(more entries exist; narrow the path or raise the limit)".to_owned());
            }
            Ok(CallToolResult::text(lines.join("\n")))
        }
        Err(e) => Ok(vendor_error("list the folder", &e)),
    }
}

pub(crate) async fn get_metadata(args: Option<Value>) -> Result<CallToolResult, ErrorData> {
    let args: PathArgs = parse_args("get_metadata", args)?;
    let client = context::current::<DropboxClient>();
    match client.get_metadata(&args.path).await {
        Ok(body) => Ok(CallToolResult::text(describe_entry(&body))),
        Err(e) => Ok(vendor_error("read the metadata", &e)),
    }
}

pub(crate) async fn create_folder(args: Option<Value>) -> Result<CallToolResult, ErrorData> {
    let args: CreateFolderArgs = parse_args("create_folder", args)?;
    let client = context::current::<DropboxClient>();
    match client.create_folder(&args.path, args.autorename).await {
        Ok(body) => {
            let created = body["metadata"]["path_display"]
                .as_str()
                .unwrap_or(&args.path);
            Ok(CallToolResult::text(format!("Created folder {created}")))
        }
        Err(DropboxError::Api {
            status: 409,
            summary,
            ..
        }) => Ok(CallToolResult::text(format!(
            "Error 409: something already exists at \"{}\" ({summary}). \
             Set autorename to true or choose a different name.",
            args.path
        ))),
        Err(e) => Ok(vendor_error("create the folder", &e)),
    }
}

pub(crate) async fn delete_item(args: Option<Value>) -> Result<CallToolResult, ErrorData> {
    let args: PathArgs = parse_args("delete_item", args)?;
    let client = context::current::<DropboxClient>();
    match client.delete(&args.path).await {
        Ok(body) => Ok(CallToolResult::text(format!(
            "Deleted {}",
            describe_entry(&body["metadata"])
        ))),
        Err(e) => Ok(vendor_error("delete the item", &e)),
    }
}

pub(crate) async fn move_item(args: Option<Value>) -> Result<CallToolResult, ErrorData> {
    let args: RelocateArgs = parse_args("move_item", args)?;
    let client = context::current::<DropboxClient>();
    match client
        .move_item(&args.from_path, &args.to_path, args.autorename)
        .await
    {
        Ok(body) => Ok(CallToolResult::text(format!(
            "Moved to {}",
            describe_entry(&body["metadata"])
        ))),
        Err(e) => Ok(vendor_error("move the item", &e)),
    }
}

pub(crate) async fn copy_item(args: Option<Value>) -> Result<CallToolResult, ErrorData> {
    let args: RelocateArgs = parse_args("copy_item", args)?;
    let client = context::current::<DropboxClient>();
    match client
        .copy_item(&args.from_path, &args.to_path, args.autorename)
        .await
    {
        Ok(body) => Ok(CallToolResult::text(format!(
            "Copied to {}",
            describe_entry(&body["metadata"])
        ))),
        Err(e) => Ok(vendor_error("copy the item", &e)),
    }
}

pub(crate) async fn search_files(args: Option<Value>) -> Result<CallToolResult, ErrorData> {
    let args: SearchArgs = parse_args("search_files", args)?;
    let client = context::current::<DropboxClient>();
    match client
        .search(&args.query, args.path.as_deref(), args.max_results)
        .await
    {
        Ok(body) => {
            let matches = body["matches"].as_array().cloned().unwrap_or_default();
            if matches.is_empty() {
                return Ok(CallToolResult::text(format!(
                    "No matches for \"{}\"",
                    args.query
                )));
            }
            let mut lines = vec![format!("{} matches for \"{}\":", matches.len(), args.query)];
            lines.extend(
                matches
                    .iter()
                    .map(|m| describe_entry(&m["metadata"]["metadata"])),
            );
            Ok(CallToolResult::text(lines.join("\n")))
        }
        Err(e) => Ok(vendor_error("search", &e)),
    }
}

pub(crate) async fn upload_file(args: Option<Value>) -> Result<CallToolResult, ErrorData> {
    let args: UploadArgs = parse_args("upload_file", args)?;
    let bytes = match args.encoding {
        UploadEncoding::Text => args.content.into_bytes(),
        UploadEncoding::Base64 => BASE64.decode(args.content.as_bytes()).map_err(|e| {
            ErrorData::invalid_params(format!("invalid arguments for upload_file: content is not valid base64: {e}"))
        })?,
    };
    let client = context::current::<DropboxClient>();
    match client
        .upload(&args.path, bytes, args.overwrite, args.autorename)
        .await
    {
        Ok(body) => Ok(CallToolResult::text(format!(
            "Uploaded {}",
            describe_entry(&body)
        ))),
        Err(e) => Ok(vendor_error("upload the file", &e)),
    }
}

pub(crate) async fn download_file(args: Option<Value>) -> Result<CallToolResult, ErrorData> {
    let args: PathArgs = parse_args("download_file", args)?;
    let client = context::current::<DropboxClient>();
    match client.download(&args.path).await {
        Ok((metadata, bytes)) => {
            if bytes.len() > INLINE_DOWNLOAD_CAP {
                return Ok(CallToolResult::text(format!(
                    "\"{}\" is {} bytes, too large to inline. Use get_temporary_link to download it by reference.",
                    args.path,
                    bytes.len()
                )));
            }
            let header = metadata
                .as_ref()
                .map(|m| describe_entry(m))
                .unwrap_or_else(|| args.path.clone());
            match String::from_utf8(bytes) {
                Ok(text) => Ok(CallToolResult::success(vec![
                    Content::text(header),
                    Content::text(text),
                ])),
                Err(raw) => Ok(CallToolResult::success(vec![
                    Content::text(format!("{header} (binary, base64 follows)")),
                    Content::text(BASE64.encode(raw.into_bytes())),
                ])),
            }
        }
        Err(e) => Ok(vendor_error("download the file", &e)),
    }
}

pub(crate) async fn get_temporary_link(args: Option<Value>) -> Result<CallToolResult, ErrorData> {
    let args: PathArgs = parse_args("get_temporary_link", args)?;
    let client = context::current::<DropboxClient>();
    match client.get_temporary_link(&args.path).await {
        Ok(body) => match body["link"].as_str() {
            Some(link) => {
                let name = args.path.rsplit('/').next().unwrap_or(&args.path);
                Ok(CallToolResult::success(vec![
                    Content::text(format!(
                        "Temporary link for \"{}\" (valid for about four hours):",
                        args.path
                    )),
                    Content::resource_link(link, name),
                ]))
            }
            None => Ok(CallToolResult::text(format!(
                "Dropbox returned no link for \"{}\": {body}",
                args.path
            ))),
        },
        Err(e) => Ok(vendor_error("create a temporary link", &e)),
    }
}

pub(crate) async fn get_thumbnail(args: Option<Value>) -> Result<CallToolResult, ErrorData> {
    let args: ThumbnailArgs = parse_args("get_thumbnail", args)?;
    let client = context::current::<DropboxClient>();
    match client
        .get_thumbnail(&args.path, &args.format, &args.size)
        .await
    {
        Ok((_, bytes)) => {
            let mime_type = match args.format.as_str() {
                "png" => "image/png",
                _ => "image/jpeg",
            };
            Ok(CallToolResult::success(vec![Content::image(
                BASE64.encode(&bytes),
                mime_type,
            )]))
        }
        Err(e) => Ok(vendor_error("render a thumbnail", &e)),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    // Schema-invalid arguments must fail before any vendor access: these
    // run with no credential context bound, so reaching the client would
    // panic the test.
    #[tokio::test]
    async fn validation_failure_never_touches_the_client() {
        let err = list_folder(Some(json!({"recursive": true}))).await.unwrap_err();
        assert!(err.message.contains("path"));

        let err = upload_file(Some(json!({"path": "/a"}))).await.unwrap_err();
        assert!(err.message.contains("content"));

        let err = upload_file(Some(json!({
            "path": "/a",
            "content": "not base64 !!!",
            "encoding": "base64"
        })))
        .await
        .unwrap_err();
        assert!(err.message.contains("base64"));
    }

    #[test]
    fn upload_encoding_defaults_to_text() {
        let args: UploadArgs =
            serde_json::from_value(json!({"path": "/a.txt", "content": "hi"})).unwrap();
        assert!(matches!(args.encoding, UploadEncoding::Text));
    }
}
