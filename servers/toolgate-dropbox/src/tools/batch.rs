//! Batch operations and async-job status checking.
//!
//! A batch launch returns either a completed result or an opaque
//! `async_job_id`. This layer never polls on an interval; the caller
//! re-invokes `check_batch_job_status` until it reports complete or failed.
//!
//! Dropbox does not namespace job ids by operation, so the status tool has
//! to probe the copy, move, and delete check endpoints in turn until one
//! recognizes the id. That order is load-bearing for compatibility and the
//! probing itself is a vendor contract gap, not a designed protocol.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};
use toolgate::{CallToolResult, ErrorData, context, parse_args};

use super::vendor_error;
use crate::client::{DropboxClient, DropboxError};

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct BatchDeleteArgs {
    /// Paths of the files or folders to delete.
    pub paths: Vec<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct RelocationEntry {
    /// Current path.
    pub from_path: String,
    /// Destination path.
    pub to_path: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct BatchRelocateArgs {
    /// The files or folders to relocate.
    pub entries: Vec<RelocationEntry>,
    /// Rename on conflict instead of failing the entry.
    #[serde(default)]
    pub autorename: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct CheckBatchJobArgs {
    /// The async_job_id reported by a batch launch.
    pub async_job_id: String,
}

fn relocation_entries(entries: &[RelocationEntry]) -> Vec<Value> {
    entries
        .iter()
        .map(|e| json!({"from_path": e.from_path, "to_path": e.to_path}))
        .collect()
}

pub(crate) async fn batch_delete(args: Option<Value>) -> Result<CallToolResult, ErrorData> {
    let args: BatchDeleteArgs = parse_args("batch_delete", args)?;
    if args.paths.is_empty() {
        return Err(ErrorData::invalid_params(
            "invalid arguments for batch_delete: paths must not be empty",
        ));
    }
    let client = context::current::<DropboxClient>();
    match client.delete_batch(&args.paths).await {
        Ok(body) => Ok(CallToolResult::text(summarize_launch("delete", &body))),
        Err(e) => Ok(vendor_error("start the batch delete", &e)),
    }
}

pub(crate) async fn batch_move(args: Option<Value>) -> Result<CallToolResult, ErrorData> {
    let args: BatchRelocateArgs = parse_args("batch_move", args)?;
    if args.entries.is_empty() {
        return Err(ErrorData::invalid_params(
            "invalid arguments for batch_move: entries must not be empty",
        ));
    }
    let client = context::current::<DropboxClient>();
    match client
        .move_batch(relocation_entries(&args.entries), args.autorename)
        .await
    {
        Ok(body) => Ok(CallToolResult::text(summarize_launch("move", &body))),
        Err(e) => Ok(vendor_error("start the batch move", &e)),
    }
}

pub(crate) async fn batch_copy(args: Option<Value>) -> Result<CallToolResult, ErrorData> {
    let args: BatchRelocateArgs = parse_args("batch_copy", args)?;
    if args.entries.is_empty() {
        return Err(ErrorData::invalid_params(
            "invalid arguments for batch_copy: entries must not be empty",
        ));
    }
    let client = context::current::<DropboxClient>();
    match client
        .copy_batch(relocation_entries(&args.entries), args.autorename)
        .await
    {
        Ok(body) => Ok(CallToolResult::text(summarize_launch("copy", &body))),
        Err(e) => Ok(vendor_error("start the batch copy", &e)),
    }
}

pub(crate) async fn check_batch_job_status(
    args: Option<Value>,
) -> Result<CallToolResult, ErrorData> {
    let args: CheckBatchJobArgs = parse_args("check_batch_job_status", args)?;
    let client = context::current::<DropboxClient>();

    // Probe order: copy, then move, then delete. A 409 means "not my job
    // id" and moves on to the next endpoint; any other failure is real.
    for kind in ["copy", "move", "delete"] {
        let result = match kind {
            "copy" => client.copy_batch_check(&args.async_job_id).await,
            "move" => client.move_batch_check(&args.async_job_id).await,
            _ => client.delete_batch_check(&args.async_job_id).await,
        };
        match result {
            Ok(body) => return Ok(CallToolResult::text(summarize_check(kind, &body))),
            Err(DropboxError::Api { status: 409, .. }) => continue,
            Err(e) => return Ok(vendor_error("check the batch job", &e)),
        }
    }
    Ok(CallToolResult::text(format!(
        "No batch operation recognizes job id \"{}\". The id may be expired or mistyped; \
         re-run the batch tool and use the id it reports.",
        args.async_job_id
    )))
}

/// Formats a batch launch response: either the operation completed
/// synchronously, or it handed back an async job id to poll.
fn summarize_launch(op: &str, body: &Value) -> String {
    match body[".tag"].as_str() {
        Some("complete") => format!(
            "Batch {op} complete. {}",
            summarize_entries(&body["entries"])
        ),
        Some("async_job_id") => format!(
            "Batch {op} accepted as async job {}. Call check_batch_job_status with this id to track it.",
            body["async_job_id"].as_str().unwrap_or("(missing id)")
        ),
        _ => format!("Batch {op} returned an unrecognized response: {body}"),
    }
}

/// Formats a job-status response. Pure function of the vendor body: once
/// Dropbox reports complete the summary can never regress to in_progress.
fn summarize_check(kind: &str, body: &Value) -> String {
    match body[".tag"].as_str() {
        Some("in_progress") => format!(
            "in_progress: the {kind} batch job is still running. Check again shortly."
        ),
        Some("complete") => format!(
            "complete: the {kind} batch job finished. {}",
            summarize_entries(&body["entries"])
        ),
        Some("failed") => format!(
            "failed: the {kind} batch job failed ({}).",
            body["failed"][".tag"].as_str().unwrap_or("unknown reason")
        ),
        _ => format!("The {kind} batch job returned an unrecognized status: {body}"),
    }
}

/// Per-entry success/failure breakdown for a completed batch.
fn summarize_entries(entries: &Value) -> String {
    let Some(entries) = entries.as_array() else {
        return "No per-entry results were reported.".to_owned();
    };
    let mut succeeded = 0usize;
    let mut failures: Vec<String> = Vec::new();
    for entry in entries {
        match entry[".tag"].as_str() {
            Some("success") => succeeded += 1,
            Some("failure") => failures.push(
                entry["failure"][".tag"]
                    .as_str()
                    .unwrap_or("unknown")
                    .to_owned(),
            ),
            _ => failures.push("unrecognized entry".to_owned()),
        }
    }
    if failures.is_empty() {
        format!("{succeeded} of {} entries succeeded.", entries.len())
    } else {
        format!(
            "{succeeded} of {} entries succeeded; failures: {}.",
            entries.len(),
            failures.join(", ")
        )
    }
}
