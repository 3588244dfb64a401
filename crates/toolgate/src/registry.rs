//! Tool registry: a mapping from tool name to schema + handler, built once
//! at startup. Listing and dispatch both read the same table, so the
//! advertised surface can never drift from what is actually callable.

use std::{borrow::Cow, collections::HashMap, sync::Arc};

use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::model::{CallToolResult, ErrorData, Tool};

pub type ToolHandler =
    Arc<dyn Fn(Option<Value>) -> BoxFuture<'static, Result<CallToolResult, ErrorData>> + Send + Sync>;

struct ToolEntry {
    tool: Tool,
    handler: ToolHandler,
}

/// An immutable-after-construction set of tools. Registration order is
/// preserved in `tools/list` output.
#[derive(Default)]
pub struct ToolRegistry {
    entries: Vec<ToolEntry>,
    index: HashMap<Cow<'static, str>, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool.
    ///
    /// # Panics
    ///
    /// Panics on a duplicate name: two tools with the same name is a startup
    /// bug, not a runtime condition.
    pub fn register<F, Fut>(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        description: impl Into<Cow<'static, str>>,
        input_schema: Value,
        handler: F,
    ) where
        F: Fn(Option<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CallToolResult, ErrorData>> + Send + 'static,
    {
        let name = name.into();
        if self.index.contains_key(&name) {
            panic!("duplicate tool registration: {name}");
        }
        let entry = ToolEntry {
            tool: Tool {
                name: name.clone(),
                description: description.into(),
                input_schema,
            },
            handler: Arc::new(move |args| Box::pin(handler(args))),
        };
        self.index.insert(name, self.entries.len());
        self.entries.push(entry);
    }

    pub fn tools(&self) -> Vec<Tool> {
        self.entries.iter().map(|e| e.tool.clone()).collect()
    }

    pub fn handler(&self, name: &str) -> Option<ToolHandler> {
        self.index
            .get(name)
            .map(|&i| Arc::clone(&self.entries[i].handler))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Deserializes a tool's argument object, turning serde's field-naming
/// error text into an `INVALID_PARAMS` error. A missing argument object is
/// treated as `{}` so tools without required fields accept bare calls.
pub fn parse_args<T: DeserializeOwned>(tool: &str, args: Option<Value>) -> Result<T, ErrorData> {
    let value = args.unwrap_or_else(|| Value::Object(Default::default()));
    serde_json::from_value(value)
        .map_err(|e| ErrorData::invalid_params(format!("invalid arguments for {tool}: {e}")))
}

/// Generates the JSON schema object for a tool's argument type.
pub fn input_schema<T: JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(T))
        .unwrap_or_else(|_| serde_json::json!({"type": "object"}))
}

#[cfg(test)]
mod tests {
    use schemars::JsonSchema;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct EchoArgs {
        message: String,
    }

    fn sample_registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(
            "echo",
            "Echo a message back",
            input_schema::<EchoArgs>(),
            |args| async move {
                let args: EchoArgs = parse_args("echo", args)?;
                Ok(CallToolResult::text(args.message))
            },
        );
        registry
    }

    #[tokio::test]
    async fn registered_tool_is_listed_and_callable() {
        let registry = sample_registry();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.tools()[0].name, "echo");

        let handler = registry.handler("echo").unwrap();
        let result = handler(Some(json!({"message": "hi"})))
            .await
            .unwrap();
        assert_eq!(result.content[0], crate::model::Content::text("hi"));
    }

    #[tokio::test]
    async fn invalid_arguments_name_the_tool_and_field() {
        let registry = sample_registry();
        let handler = registry.handler("echo").unwrap();
        let err = handler(Some(json!({"wrong": 1}))).await.unwrap_err();
        assert_eq!(err.code, crate::model::ErrorCode::INVALID_PARAMS);
        assert!(err.message.contains("echo"));
        assert!(err.message.contains("message"));
    }

    #[test]
    fn unknown_tool_has_no_handler() {
        assert!(sample_registry().handler("nope").is_none());
    }

    #[test]
    #[should_panic(expected = "duplicate tool registration")]
    fn duplicate_registration_panics() {
        let mut registry = sample_registry();
        registry.register("echo", "again", json!({"type": "object"}), |_| async {
            Ok(CallToolResult::text(""))
        });
    }

    #[test]
    fn input_schema_is_an_object_schema() {
        let schema = input_schema::<EchoArgs>();
        assert_eq!(schema["type"], "object");
        assert!(schema["properties"]["message"].is_object());
    }
}
