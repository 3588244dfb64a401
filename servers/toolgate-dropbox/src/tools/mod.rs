//! The Dropbox tool surface: one handler per tool, all reading the ambient
//! [`DropboxClient`] from the credential context.

mod batch;
mod files;
mod sharing;

use serde_json::Value;
use toolgate::{CallToolResult, ToolRegistry, input_schema};

use crate::client::DropboxError;

/// Builds the full Dropbox tool registry. Called once at startup.
pub fn registry() -> ToolRegistry {
    let mut r = ToolRegistry::new();
    r.register(
        "list_folder",
        "List the contents of a Dropbox folder (use \"\" for the root)",
        input_schema::<files::ListFolderArgs>(),
        files::list_folder,
    );
    r.register(
        "get_metadata",
        "Get metadata for a file or folder",
        input_schema::<files::PathArgs>(),
        files::get_metadata,
    );
    r.register(
        "create_folder",
        "Create a folder at the given path",
        input_schema::<files::CreateFolderArgs>(),
        files::create_folder,
    );
    r.register(
        "delete_item",
        "Delete a file or folder",
        input_schema::<files::PathArgs>(),
        files::delete_item,
    );
    r.register(
        "move_item",
        "Move or rename a file or folder",
        input_schema::<files::RelocateArgs>(),
        files::move_item,
    );
    r.register(
        "copy_item",
        "Copy a file or folder",
        input_schema::<files::RelocateArgs>(),
        files::copy_item,
    );
    r.register(
        "search_files",
        "Search file and folder names and contents",
        input_schema::<files::SearchArgs>(),
        files::search_files,
    );
    r.register(
        "upload_file",
        "Upload a file (plain text or base64-encoded content)",
        input_schema::<files::UploadArgs>(),
        files::upload_file,
    );
    r.register(
        "download_file",
        "Download a small file inline (larger files should use get_temporary_link)",
        input_schema::<files::PathArgs>(),
        files::download_file,
    );
    r.register(
        "get_temporary_link",
        "Get a short-lived direct download link for a file",
        input_schema::<files::PathArgs>(),
        files::get_temporary_link,
    );
    r.register(
        "get_thumbnail",
        "Get an inline thumbnail image for a file",
        input_schema::<files::ThumbnailArgs>(),
        files::get_thumbnail,
    );
    r.register(
        "create_shared_link",
        "Create a shared link for a file or folder",
        input_schema::<files::PathArgs>(),
        sharing::create_shared_link,
    );
    r.register(
        "list_shared_links",
        "List shared links, optionally scoped to one path",
        input_schema::<sharing::ListSharedLinksArgs>(),
        sharing::list_shared_links,
    );
    r.register(
        "batch_delete",
        "Delete many files or folders in one batch operation",
        input_schema::<batch::BatchDeleteArgs>(),
        batch::batch_delete,
    );
    r.register(
        "batch_move",
        "Move many files or folders in one batch operation",
        input_schema::<batch::BatchRelocateArgs>(),
        batch::batch_move,
    );
    r.register(
        "batch_copy",
        "Copy many files or folders in one batch operation",
        input_schema::<batch::BatchRelocateArgs>(),
        batch::batch_copy,
    );
    r.register(
        "check_batch_job_status",
        "Check the status of an async batch job by its job id",
        input_schema::<batch::CheckBatchJobArgs>(),
        batch::check_batch_job_status,
    );
    r
}

/// Maps a vendor failure to a normal tool result with remediation text.
/// `isError` stays unset: from the transport's point of view this is an
/// ordinary answer for the LLM caller to act on.
pub(crate) fn vendor_error(action: &str, err: &DropboxError) -> CallToolResult {
    let text = match err {
        DropboxError::Api {
            status, summary, ..
        } => format!(
            "Error {status}: could not {action} ({summary}). {}",
            status_guidance(*status)
        ),
        DropboxError::Transport(e) => format!(
            "Error: could not reach Dropbox to {action}: {e}. Check connectivity and retry."
        ),
    };
    CallToolResult::text(text)
}

fn status_guidance(status: u16) -> &'static str {
    match status {
        400 => "The request was malformed; double-check the argument values.",
        401 => "The access token is invalid or expired; provide a fresh token.",
        403 => "Permission denied; this account cannot access that path.",
        404 => "Not found; check that the path exists and is spelled correctly.",
        409 => "Conflict; the path may not exist, already exist, or be locked. \
                Verify the path, or retry with autorename or a different name.",
        429 => "Rate limited; back off and retry after a short delay.",
        s if s >= 500 => "Dropbox is having trouble; retry later.",
        _ => "Unexpected response; inspect the error summary above.",
    }
}

/// One line of human-readable metadata for a file/folder entry.
pub(crate) fn describe_entry(entry: &Value) -> String {
    let kind = entry[".tag"].as_str().unwrap_or("item");
    let path = entry["path_display"]
        .as_str()
        .or_else(|| entry["name"].as_str())
        .unwrap_or("(unnamed)");
    match kind {
        "folder" => format!("[folder] {path}"),
        "file" => {
            let size = entry["size"].as_u64().unwrap_or(0);
            let modified = entry["server_modified"].as_str().unwrap_or("unknown");
            format!("[file] {path} ({size} bytes, modified {modified})")
        }
        "deleted" => format!("[deleted] {path}"),
        other => format!("[{other}] {path}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lists_the_full_tool_surface() {
        let r = registry();
        for name in [
            "list_folder",
            "get_metadata",
            "create_folder",
            "delete_item",
            "move_item",
            "copy_item",
            "search_files",
            "upload_file",
            "download_file",
            "get_temporary_link",
            "get_thumbnail",
            "create_shared_link",
            "list_shared_links",
            "batch_delete",
            "batch_move",
            "batch_copy",
            "check_batch_job_status",
        ] {
            assert!(r.contains(name), "missing tool {name}");
        }
        assert_eq!(r.len(), 17);
    }

    #[test]
    fn vendor_error_carries_status_and_guidance() {
        let err = DropboxError::Api {
            status: 429,
            summary: "too_many_requests/..".into(),
            body: Value::Null,
        };
        let result = vendor_error("list the folder", &err);
        assert!(result.is_error.is_none());
        let toolgate::Content::Text { text } = &result.content[0] else {
            panic!("expected text content");
        };
        assert!(text.contains("Error 429"));
        assert!(text.contains("back off"));
    }

    #[test]
    fn describe_entry_formats_files_and_folders() {
        let file = serde_json::json!({
            ".tag": "file",
            "name": "a.txt",
            "path_display": "/docs/a.txt",
            "size": 12,
            "server_modified": "2026-01-02T03:04:05Z",
        });
        assert_eq!(
            describe_entry(&file),
            "[file] /docs/a.txt (12 bytes, modified 2026-01-02T03:04:05Z)"
        );

        let folder = serde_json::json!({".tag": "folder", "path_display": "/docs"});
        assert_eq!(describe_entry(&folder), "[folder] /docs");
    }
}
