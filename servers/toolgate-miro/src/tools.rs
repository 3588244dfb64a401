//! The Miro tool surface.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use toolgate::{CallToolResult, ErrorData, ToolRegistry, context, input_schema, parse_args};

use crate::client::{MiroClient, MiroError};

pub fn registry() -> ToolRegistry {
    let mut r = ToolRegistry::new();
    r.register(
        "miro_list_boards",
        "List boards the token's account can access",
        input_schema::<ListBoardsArgs>(),
        list_boards,
    );
    r.register(
        "miro_create_board",
        "Create a new board",
        input_schema::<CreateBoardArgs>(),
        create_board,
    );
    r.register(
        "miro_get_board",
        "Get a board's details",
        input_schema::<BoardArgs>(),
        get_board,
    );
    r.register(
        "miro_update_board",
        "Rename a board or change its description",
        input_schema::<UpdateBoardArgs>(),
        update_board,
    );
    r.register(
        "miro_delete_board",
        "Delete a board permanently",
        input_schema::<BoardArgs>(),
        delete_board,
    );
    r.register(
        "miro_list_items",
        "List items on a board, optionally filtered by type",
        input_schema::<ListItemsArgs>(),
        list_items,
    );
    r.register(
        "miro_create_sticky_note",
        "Add a sticky note to a board",
        input_schema::<CreateStickyNoteArgs>(),
        create_sticky_note,
    );
    r.register(
        "miro_create_shape",
        "Add a shape to a board",
        input_schema::<CreateShapeArgs>(),
        create_shape,
    );
    r.register(
        "miro_create_card",
        "Add a card to a board",
        input_schema::<CreateCardArgs>(),
        create_card,
    );
    r.register(
        "miro_delete_item",
        "Delete an item from a board",
        input_schema::<DeleteItemArgs>(),
        delete_item,
    );
    r
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ListBoardsArgs {
    /// Maximum number of boards to return (default 20).
    #[serde(default)]
    limit: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct BoardArgs {
    /// The board id, e.g. "uXjVN0a1b2c=".
    board_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CreateBoardArgs {
    /// Name of the new board.
    name: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct UpdateBoardArgs {
    board_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ListItemsArgs {
    board_id: String,
    /// Filter by item type: "sticky_note", "shape", "card", "text", "frame".
    #[serde(default)]
    item_type: Option<String>,
    #[serde(default)]
    limit: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CreateStickyNoteArgs {
    board_id: String,
    /// Text content of the note.
    content: String,
    /// Fill color name, e.g. "yellow", "light_green".
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CreateShapeArgs {
    board_id: String,
    /// Shape name, e.g. "rectangle", "circle", "triangle".
    shape: String,
    /// Optional text inside the shape.
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CreateCardArgs {
    board_id: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct DeleteItemArgs {
    board_id: String,
    item_id: String,
}

fn vendor_error(action: &str, err: &MiroError) -> CallToolResult {
    let text = match err {
        MiroError::Api {
            status, message, ..
        } => format!(
            "Error {status}: could not {action} ({message}). {}",
            status_guidance(*status)
        ),
        MiroError::Transport(e) => {
            format!("Error: could not reach Miro to {action}: {e}. Check connectivity and retry.")
        }
    };
    CallToolResult::text(text)
}

fn status_guidance(status: u16) -> &'static str {
    match status {
        400 => "The request was malformed; double-check the argument values.",
        401 => "The access token is invalid or expired; provide a fresh token.",
        403 => "Permission denied; the token's account lacks access to this board.",
        404 => "Not found; check the board or item id.",
        409 => "Conflict; the resource may already exist or be locked. Retry with different values.",
        429 => "Rate limited; back off and retry after a short delay.",
        s if s >= 500 => "Miro is having trouble; retry later.",
        _ => "Unexpected response; inspect the message above.",
    }
}

fn describe_board(board: &Value) -> String {
    format!(
        "{} (id {}) {}",
        board["name"].as_str().unwrap_or("(unnamed)"),
        board["id"].as_str().unwrap_or("?"),
        board["viewLink"]
            .as_str()
            .or_else(|| board["links"]["self"].as_str())
            .unwrap_or("")
    )
    .trim_end()
    .to_owned()
}

fn describe_item(item: &Value) -> String {
    let kind = item["type"].as_str().unwrap_or("item");
    let id = item["id"].as_str().unwrap_or("?");
    let text = item["data"]["content"]
        .as_str()
        .or_else(|| item["data"]["title"].as_str())
        .unwrap_or("");
    if text.is_empty() {
        format!("[{kind}] id {id}")
    } else {
        format!("[{kind}] id {id}: {text}")
    }
}

async fn list_boards(args: Option<Value>) -> Result<CallToolResult, ErrorData> {
    let args: ListBoardsArgs = parse_args("miro_list_boards", args)?;
    let client = context::current::<MiroClient>();
    match client.list_boards(args.limit).await {
        Ok(body) => {
            let boards = body["data"].as_array().cloned().unwrap_or_default();
            if boards.is_empty() {
                return Ok(CallToolResult::text("No boards found."));
            }
            let mut lines = vec![format!("{} boards:", boards.len())];
            lines.extend(boards.iter().map(describe_board));
            Ok(CallToolResult::text(lines.join("\n")))
        }
        Err(e) => Ok(vendor_error("list boards", &e)),
    }
}

async fn create_board(args: Option<Value>) -> Result<CallToolResult, ErrorData> {
    let args: CreateBoardArgs = parse_args("miro_create_board", args)?;
    let client = context::current::<MiroClient>();
    match client
        .create_board(&args.name, args.description.as_deref())
        .await
    {
        Ok(body) => Ok(CallToolResult::text(format!(
            "Created board {}",
            describe_board(&body)
        ))),
        Err(e) => Ok(vendor_error("create the board", &e)),
    }
}

async fn get_board(args: Option<Value>) -> Result<CallToolResult, ErrorData> {
    let args: BoardArgs = parse_args("miro_get_board", args)?;
    let client = context::current::<MiroClient>();
    match client.get_board(&args.board_id).await {
        Ok(body) => {
            let mut text = describe_board(&body);
            if let Some(description) = body["description"].as_str() {
                if !description.is_empty() {
                    text.push_str(&format!("\nDescription: {description}"));
                }
            }
            Ok(CallToolResult::text(text))
        }
        Err(e) => Ok(vendor_error("get the board", &e)),
    }
}

async fn update_board(args: Option<Value>) -> Result<CallToolResult, ErrorData> {
    let args: UpdateBoardArgs = parse_args("miro_update_board", args)?;
    if args.name.is_none() && args.description.is_none() {
        return Err(ErrorData::invalid_params(
            "invalid arguments for miro_update_board: provide name and/or description",
        ));
    }
    let client = context::current::<MiroClient>();
    match client
        .update_board(&args.board_id, args.name.as_deref(), args.description.as_deref())
        .await
    {
        Ok(body) => Ok(CallToolResult::text(format!(
            "Updated board {}",
            describe_board(&body)
        ))),
        Err(e) => Ok(vendor_error("update the board", &e)),
    }
}

async fn delete_board(args: Option<Value>) -> Result<CallToolResult, ErrorData> {
    let args: BoardArgs = parse_args("miro_delete_board", args)?;
    let client = context::current::<MiroClient>();
    match client.delete_board(&args.board_id).await {
        Ok(_) => Ok(CallToolResult::text(format!(
            "Deleted board {}",
            args.board_id
        ))),
        Err(e) => Ok(vendor_error("delete the board", &e)),
    }
}

async fn list_items(args: Option<Value>) -> Result<CallToolResult, ErrorData> {
    let args: ListItemsArgs = parse_args("miro_list_items", args)?;
    let client = context::current::<MiroClient>();
    match client
        .list_items(&args.board_id, args.item_type.as_deref(), args.limit)
        .await
    {
        Ok(body) => {
            let items = body["data"].as_array().cloned().unwrap_or_default();
            if items.is_empty() {
                return Ok(CallToolResult::text("No items found on this board."));
            }
            let mut lines = vec![format!("{} items:", items.len())];
            lines.extend(items.iter().map(describe_item));
            Ok(CallToolResult::text(lines.join("\n")))
        }
        Err(e) => Ok(vendor_error("list board items", &e)),
    }
}

async fn create_sticky_note(args: Option<Value>) -> Result<CallToolResult, ErrorData> {
    let args: CreateStickyNoteArgs = parse_args("miro_create_sticky_note", args)?;
    let client = context::current::<MiroClient>();
    match client
        .create_sticky_note(&args.board_id, &args.content, args.color.as_deref(), args.x, args.y)
        .await
    {
        Ok(body) => Ok(CallToolResult::text(format!(
            "Created sticky note {}",
            describe_item(&body)
        ))),
        Err(e) => Ok(vendor_error("create the sticky note", &e)),
    }
}

async fn create_shape(args: Option<Value>) -> Result<CallToolResult, ErrorData> {
    let args: CreateShapeArgs = parse_args("miro_create_shape", args)?;
    let client = context::current::<MiroClient>();
    match client
        .create_shape(&args.board_id, &args.shape, args.content.as_deref(), args.x, args.y)
        .await
    {
        Ok(body) => Ok(CallToolResult::text(format!(
            "Created shape {}",
            describe_item(&body)
        ))),
        Err(e) => Ok(vendor_error("create the shape", &e)),
    }
}

async fn create_card(args: Option<Value>) -> Result<CallToolResult, ErrorData> {
    let args: CreateCardArgs = parse_args("miro_create_card", args)?;
    let client = context::current::<MiroClient>();
    match client
        .create_card(&args.board_id, &args.title, args.description.as_deref(), args.x, args.y)
        .await
    {
        Ok(body) => Ok(CallToolResult::text(format!(
            "Created card {}",
            describe_item(&body)
        ))),
        Err(e) => Ok(vendor_error("create the card", &e)),
    }
}

async fn delete_item(args: Option<Value>) -> Result<CallToolResult, ErrorData> {
    let args: DeleteItemArgs = parse_args("miro_delete_item", args)?;
    let client = context::current::<MiroClient>();
    match client.delete_item(&args.board_id, &args.item_id).await {
        Ok(_) => Ok(CallToolResult::text(format!(
            "Deleted item {} from board {}",
            args.item_id, args.board_id
        ))),
        Err(e) => Ok(vendor_error("delete the item", &e)),
    }
}
