//! Mock tool source for tests: fixed tool list, fixed call result.
//!
//! Useful for testing ActNode without a real MCP server or connector.

use async_trait::async_trait;

use crate::tool_source::{ToolCallContent, ToolCallContext, ToolSource, ToolSourceError, ToolSpec};

/// Tool source that returns a fixed list of tools and a fixed call result regardless
/// of which tool is called or what arguments are passed.
///
/// # Examples
///
/// ```
/// use loom::{MockToolSource, ToolSource};
/// use serde_json::json;
///
/// # #[tokio::main]
/// # async fn main() {
/// let source = MockToolSource::get_time_example();
/// let result = source.call_tool("get_time", json!({})).await.unwrap();
/// assert_eq!(result.text, "2025-01-29 12:00:00");
/// # }
/// ```
pub struct MockToolSource {
    tools: Vec<ToolSpec>,
    call_result: String,
}

impl MockToolSource {
    /// Creates a mock tool source with the given tools and fixed call result.
    pub fn new(tools: Vec<ToolSpec>, call_result: String) -> Self {
        Self { tools, call_result }
    }

    /// Creates a mock tool source with a single `get_time` tool and a fixed
    /// timestamp result, for use in tests that do not care about real tool execution.
    pub fn get_time_example() -> Self {
        Self {
            tools: vec![ToolSpec {
                name: "get_time".to_string(),
                description: Some("Get current time.".to_string()),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {}
                }),
            }],
            call_result: "2025-01-29 12:00:00".to_string(),
        }
    }

    /// Returns a copy of this mock source with a different fixed call result.
    pub fn with_call_result(mut self, call_result: String) -> Self {
        self.call_result = call_result;
        self
    }
}

#[async_trait]
impl ToolSource for MockToolSource {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError> {
        Ok(self.tools.clone())
    }

    async fn call_tool(
        &self,
        _name: &str,
        _arguments: serde_json::Value,
    ) -> Result<ToolCallContent, ToolSourceError> {
        Ok(ToolCallContent {
            text: self.call_result.clone(),
        })
    }

    async fn call_tool_with_context(
        &self,
        name: &str,
        arguments: serde_json::Value,
        _ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError> {
        self.call_tool(name, arguments).await
    }
}
