//! The MCP server object: dispatches decoded protocol messages into the
//! tool registry. One instance is constructed explicitly at startup and
//! shared by both transports.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    model::{
        CallToolResult, ClientMessage, ErrorData, InitializeResult, JsonRpcRequest,
        ListToolsResult, PROTOCOL_VERSION, ServerCapabilities, ServerInfo, ServerMessage,
    },
    registry::ToolRegistry,
};

pub struct McpServer {
    info: ServerInfo,
    instructions: Option<String>,
    registry: ToolRegistry,
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

impl McpServer {
    pub fn new(name: impl Into<String>, version: impl Into<String>, registry: ToolRegistry) -> Self {
        Self {
            info: ServerInfo {
                name: name.into(),
                version: version.into(),
            },
            instructions: None,
            registry,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Handles one decoded message. Requests produce a reply; notifications
    /// produce none.
    pub async fn handle(&self, message: ClientMessage) -> Option<ServerMessage> {
        match message {
            ClientMessage::Request(request) => Some(self.handle_request(request).await),
            ClientMessage::Notification(notification) => {
                tracing::trace!(method = %notification.method, "notification");
                None
            }
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> ServerMessage {
        tracing::debug!(method = %request.method, "request");
        let result = match request.method.as_str() {
            "initialize" => serialize(self.initialize_result()),
            "ping" => Ok(json!({})),
            "tools/list" => serialize(ListToolsResult {
                tools: self.registry.tools(),
            }),
            "tools/call" => match self.call_tool(request.params).await {
                Ok(result) => serialize(result),
                Err(e) => Err(e),
            },
            other => Err(ErrorData::method_not_found(other)),
        };
        match result {
            Ok(value) => ServerMessage::response(request.id, value),
            Err(error) => ServerMessage::error(Some(request.id), error),
        }
    }

    /// Errors returned by a handler (schema validation, uncaught internal
    /// failures) become ordinary results flagged `isError: true`; only a
    /// malformed `tools/call` envelope or an unknown tool name surfaces as a
    /// protocol-level error.
    async fn call_tool(&self, params: Option<Value>) -> Result<CallToolResult, ErrorData> {
        let params: CallToolParams = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| ErrorData::invalid_params(format!("invalid tools/call params: {e}")))?
            .ok_or_else(|| ErrorData::invalid_params("missing tools/call params"))?;

        let handler = self
            .registry
            .handler(&params.name)
            .ok_or_else(|| ErrorData::invalid_params(format!("unknown tool: {}", params.name)))?;

        match handler(params.arguments).await {
            Ok(result) => Ok(result),
            Err(error) => {
                tracing::warn!(tool = %params.name, %error, "tool call failed");
                Ok(CallToolResult::error(error.to_string()))
            }
        }
    }

    fn initialize_result(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities::default(),
            server_info: self.info.clone(),
            instructions: self.instructions.clone(),
        }
    }
}

fn serialize<T: serde::Serialize>(value: T) -> Result<Value, ErrorData> {
    serde_json::to_value(value)
        .map_err(|e| ErrorData::internal_error(format!("failed to serialize response: {e}")))
}
