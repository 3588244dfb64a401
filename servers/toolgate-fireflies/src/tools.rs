//! The Fireflies tool surface.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use toolgate::{CallToolResult, ErrorData, ToolRegistry, context, input_schema, parse_args};

use crate::client::{FirefliesClient, FirefliesError};

pub fn registry() -> ToolRegistry {
    let mut r = ToolRegistry::new();
    r.register(
        "fireflies_get_user",
        "Get the authenticated user's profile and usage",
        input_schema::<NoArgs>(),
        get_user,
    );
    r.register(
        "fireflies_list_transcripts",
        "List recent meeting transcripts",
        input_schema::<ListTranscriptsArgs>(),
        list_transcripts,
    );
    r.register(
        "fireflies_get_transcript",
        "Get a transcript with its full sentence-by-sentence text",
        input_schema::<TranscriptArgs>(),
        get_transcript,
    );
    r.register(
        "fireflies_get_summary",
        "Get the AI summary of a meeting: overview, keywords, action items",
        input_schema::<TranscriptArgs>(),
        get_summary,
    );
    r.register(
        "fireflies_search_transcripts",
        "Search transcripts by meeting title",
        input_schema::<SearchArgs>(),
        search_transcripts,
    );
    r
}

#[derive(Debug, Deserialize, JsonSchema)]
struct NoArgs {}

#[derive(Debug, Deserialize, JsonSchema)]
struct ListTranscriptsArgs {
    /// Maximum number of transcripts to return (default 10).
    #[serde(default)]
    limit: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct TranscriptArgs {
    /// The transcript id from fireflies_list_transcripts.
    transcript_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SearchArgs {
    /// Meeting title to search for.
    title: String,
    #[serde(default)]
    limit: Option<u32>,
}

fn vendor_error(action: &str, err: &FirefliesError) -> CallToolResult {
    let text = match err {
        FirefliesError::Api {
            status,
            code,
            message,
        } => format!(
            "Error {status} ({code}): could not {action} ({message}). {}",
            code_guidance(code, *status)
        ),
        FirefliesError::Transport(e) => format!(
            "Error: could not reach Fireflies to {action}: {e}. Check connectivity and retry."
        ),
    };
    CallToolResult::text(text)
}

/// GraphQL errors carry a code string; fall back to the HTTP status when
/// the code is unrecognized.
fn code_guidance(code: &str, status: u16) -> &'static str {
    match code {
        "invalid_api_key" | "auth_error" => {
            "The API key is invalid or expired; provide a fresh key."
        }
        "forbidden" | "paid_required" => {
            "Permission denied; the account's plan does not allow this operation."
        }
        "object_not_found" => "Not found; check the transcript id.",
        "too_many_requests" => "Rate limited; back off and retry after a short delay.",
        "invalid_arguments" | "args_required" => {
            "The request was malformed; double-check the argument values."
        }
        _ => match status {
            401 => "The API key is invalid or expired; provide a fresh key.",
            403 => "Permission denied; the account's plan does not allow this operation.",
            404 => "Not found; check the transcript id.",
            429 => "Rate limited; back off and retry after a short delay.",
            s if s >= 500 => "Fireflies is having trouble; retry later.",
            _ => "Unexpected response; inspect the message above.",
        },
    }
}

fn describe_transcript(t: &Value) -> String {
    let minutes = t["duration"].as_f64().map(|d| d.round() as i64);
    let mut line = format!(
        "{} (id {})",
        t["title"].as_str().unwrap_or("(untitled)"),
        t["id"].as_str().unwrap_or("?"),
    );
    if let Some(date) = t["date"].as_str() {
        line.push_str(&format!(", {date}"));
    }
    if let Some(minutes) = minutes {
        line.push_str(&format!(", {minutes} min"));
    }
    if let Some(organizer) = t["organizer_email"].as_str() {
        line.push_str(&format!(", organized by {organizer}"));
    }
    line
}

async fn get_user(args: Option<Value>) -> Result<CallToolResult, ErrorData> {
    let _: NoArgs = parse_args("fireflies_get_user", args)?;
    let client = context::current::<FirefliesClient>();
    match client.get_user().await {
        Ok(data) => {
            let user = &data["user"];
            Ok(CallToolResult::text(format!(
                "{} <{}> (user_id {}): {} transcripts, {} minutes consumed",
                user["name"].as_str().unwrap_or("(unknown)"),
                user["email"].as_str().unwrap_or("?"),
                user["user_id"].as_str().unwrap_or("?"),
                user["num_transcripts"].as_i64().unwrap_or(0),
                user["minutes_consumed"].as_f64().unwrap_or(0.0).round(),
            )))
        }
        Err(e) => Ok(vendor_error("fetch the user profile", &e)),
    }
}

async fn list_transcripts(args: Option<Value>) -> Result<CallToolResult, ErrorData> {
    let args: ListTranscriptsArgs = parse_args("fireflies_list_transcripts", args)?;
    let client = context::current::<FirefliesClient>();
    match client.list_transcripts(args.limit.unwrap_or(10)).await {
        Ok(data) => {
            let transcripts = data["transcripts"].as_array().cloned().unwrap_or_default();
            if transcripts.is_empty() {
                return Ok(CallToolResult::text("No transcripts found."));
            }
            let mut lines = vec![format!("{} transcripts:", transcripts.len())];
            lines.extend(transcripts.iter().map(describe_transcript));
            Ok(CallToolResult::text(lines.join("\n")))
        }
        Err(e) => Ok(vendor_error("list transcripts", &e)),
    }
}

async fn get_transcript(args: Option<Value>) -> Result<CallToolResult, ErrorData> {
    let args: TranscriptArgs = parse_args("fireflies_get_transcript", args)?;
    let client = context::current::<FirefliesClient>();
    match client.get_transcript(&args.transcript_id).await {
        Ok(data) => {
            let transcript = &data["transcript"];
            if transcript.is_null() {
                return Ok(CallToolResult::text(format!(
                    "No transcript with id {}. Use fireflies_list_transcripts to find valid ids.",
                    args.transcript_id
                )));
            }
            let mut lines = vec![describe_transcript(transcript)];
            if let Some(participants) = transcript["participants"].as_array() {
                let names: Vec<&str> =
                    participants.iter().filter_map(Value::as_str).collect();
                if !names.is_empty() {
                    lines.push(format!("Participants: {}", names.join(", ")));
                }
            }
            if let Some(sentences) = transcript["sentences"].as_array() {
                lines.push(String::new());
                for sentence in sentences {
                    lines.push(format!(
                        "{}: {}",
                        sentence["speaker_name"].as_str().unwrap_or("?"),
                        sentence["text"].as_str().unwrap_or(""),
                    ));
                }
            }
            Ok(CallToolResult::text(lines.join("\n")))
        }
        Err(e) => Ok(vendor_error("fetch the transcript", &e)),
    }
}

async fn get_summary(args: Option<Value>) -> Result<CallToolResult, ErrorData> {
    let args: TranscriptArgs = parse_args("fireflies_get_summary", args)?;
    let client = context::current::<FirefliesClient>();
    match client.get_summary(&args.transcript_id).await {
        Ok(data) => {
            let transcript = &data["transcript"];
            if transcript.is_null() {
                return Ok(CallToolResult::text(format!(
                    "No transcript with id {}. Use fireflies_list_transcripts to find valid ids.",
                    args.transcript_id
                )));
            }
            let summary = &transcript["summary"];
            let mut lines = vec![format!(
                "Summary of {}:",
                transcript["title"].as_str().unwrap_or("(untitled)")
            )];
            if let Some(overview) = summary["overview"].as_str() {
                lines.push(format!("Overview: {overview}"));
            }
            if let Some(keywords) = summary["keywords"].as_array() {
                let words: Vec<&str> = keywords.iter().filter_map(Value::as_str).collect();
                if !words.is_empty() {
                    lines.push(format!("Keywords: {}", words.join(", ")));
                }
            }
            if let Some(action_items) = summary["action_items"].as_str() {
                if !action_items.is_empty() {
                    lines.push(format!("Action items:\n{action_items}"));
                }
            }
            if let Some(outline) = summary["outline"].as_str() {
                if !outline.is_empty() {
                    lines.push(format!("Outline:\n{outline}"));
                }
            }
            if lines.len() == 1 {
                lines.push("No summary is available for this meeting yet.".to_owned());
            }
            Ok(CallToolResult::text(lines.join("\n")))
        }
        Err(e) => Ok(vendor_error("fetch the summary", &e)),
    }
}

async fn search_transcripts(args: Option<Value>) -> Result<CallToolResult, ErrorData> {
    let args: SearchArgs = parse_args("fireflies_search_transcripts", args)?;
    if args.title.trim().is_empty() {
        return Err(ErrorData::invalid_params(
            "invalid arguments for fireflies_search_transcripts: title must not be empty",
        ));
    }
    let client = context::current::<FirefliesClient>();
    match client
        .search_transcripts(&args.title, args.limit.unwrap_or(10))
        .await
    {
        Ok(data) => {
            let transcripts = data["transcripts"].as_array().cloned().unwrap_or_default();
            if transcripts.is_empty() {
                return Ok(CallToolResult::text(format!(
                    "No transcripts matched \"{}\".",
                    args.title
                )));
            }
            let mut lines = vec![format!(
                "{} transcripts matching \"{}\":",
                transcripts.len(),
                args.title
            )];
            lines.extend(transcripts.iter().map(describe_transcript));
            Ok(CallToolResult::text(lines.join("\n")))
        }
        Err(e) => Ok(vendor_error("search transcripts", &e)),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn registry_lists_the_full_tool_surface() {
        let r = registry();
        assert_eq!(r.len(), 5);
        assert!(r.contains("fireflies_get_user"));
        assert!(r.contains("fireflies_get_transcript"));
        assert!(r.contains("fireflies_search_transcripts"));
    }

    #[tokio::test]
    async fn validation_failure_never_touches_the_client() {
        // No context bound: reaching the client would panic.
        let err = get_transcript(Some(json!({}))).await.unwrap_err();
        assert!(err.message.contains("transcript_id"));

        let err = search_transcripts(Some(json!({"title": "  "})))
            .await
            .unwrap_err();
        assert!(err.message.contains("title must not be empty"));
    }

    #[test]
    fn graphql_codes_take_precedence_over_http_status() {
        // An in-band error under HTTP 200 still maps to real guidance.
        let result = vendor_error(
            "fetch the transcript",
            &FirefliesError::Api {
                status: 200,
                code: "object_not_found".into(),
                message: "Transcript not found".into(),
            },
        );
        let text = match &result.content[0] {
            toolgate::Content::Text { text } => text.clone(),
            _ => panic!("expected text"),
        };
        assert!(text.contains("Error 200 (object_not_found)"));
        assert!(text.contains("check the transcript id"));
        assert!(result.is_error.is_none());
    }

    #[test]
    fn describe_transcript_includes_duration_and_organizer() {
        let t = json!({
            "id": "tx1",
            "title": "Weekly sync",
            "date": "2025-06-02T10:00:00.000Z",
            "duration": 32.4,
            "organizer_email": "pat@example.com",
        });
        assert_eq!(
            describe_transcript(&t),
            "Weekly sync (id tx1), 2025-06-02T10:00:00.000Z, 32 min, organized by pat@example.com"
        );
    }
}
