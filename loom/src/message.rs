//! Message types for agent state.
//!
//! Tagged variants: `System`, `User`, `Assistant` (optional text plus any tool
//! calls the model requested), `ToolResponse` (the structured result of one
//! tool call, keyed by id/name so it can be correlated back to the request),
//! and `AgentInstruction` (a distinguished system-authored directive injected
//! mid-conversation, e.g. an `outputSchema` reminder — kept separate from
//! `System` so Think can find and replace it idempotently).
//! Used by `AgentState::messages` and by agents that read/append messages in `Agent::run`.

use crate::state::ToolCall;

/// A single message in the conversation.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Message {
    /// System prompt; typically placed first in the message list.
    System(String),
    /// User input.
    User(String),
    /// Model/agent reply. `text` is absent when the model replies with only
    /// tool calls; `tool_calls` is empty for a plain text reply.
    Assistant {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    /// Result of one executed tool call, tagged with the call id (when known)
    /// and tool name so Observe's merge doesn't lose structure the way
    /// flattening into a `User` string would.
    ToolResponse {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        name: String,
        content: String,
    },
    /// A system-authored instruction injected into the conversation outside
    /// the initial system prompt (e.g. an `outputSchema` reminder appended by
    /// Think). Distinct from `System` so it can be found and replaced rather
    /// than appended again on every Model Node step.
    AgentInstruction(String),
}

impl Message {
    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::System(content.into())
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::User(content.into())
    }

    /// Creates a plain-text assistant message with no tool calls.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            text: Some(content.into()),
            tool_calls: vec![],
        }
    }

    /// Creates an assistant message carrying tool calls, with optional text.
    pub fn assistant_with_tool_calls(text: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self::Assistant { text, tool_calls }
    }

    /// Creates a tool response message.
    pub fn tool_response(
        id: Option<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::ToolResponse {
            id,
            name: name.into(),
            content: content.into(),
        }
    }

    /// Creates an agent-instruction message.
    pub fn agent_instruction(content: impl Into<String>) -> Self {
        Self::AgentInstruction(content.into())
    }

    /// Returns this message's tool calls, if it's an `Assistant` message that has any.
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Self::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    /// Flattens this message to a display/compaction-friendly string: the
    /// underlying text for `System`/`User`/`AgentInstruction`/`ToolResponse`,
    /// or the assistant's text (empty string when it only carries tool calls).
    pub fn text_content(&self) -> String {
        match self {
            Self::System(s) | Self::User(s) | Self::AgentInstruction(s) => s.clone(),
            Self::Assistant { text, .. } => text.clone().unwrap_or_default(),
            Self::ToolResponse { content, .. } => content.clone(),
        }
    }
}
