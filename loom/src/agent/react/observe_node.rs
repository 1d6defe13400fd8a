//! Observe node: read tool_results, merge into state (e.g. messages), clear tool_calls and tool_results.

use async_trait::async_trait;

use crate::error::AgentError;
use crate::graph::Next;
use crate::message::Message;
use crate::state::ReActState;
use crate::Node;

/// Maximum number of ReAct loop rounds (observe passes) before forcing End.
pub const MAX_REACT_TURNS: u32 = 10;

pub struct ObserveNode {
    enable_loop: bool,
    /// When set, a loop-ending decision routes here instead of `Next::End` —
    /// used by the hook composer to route into an `AFTER_AGENT` hook chain
    /// rather than terminating the graph immediately.
    exit_override: Option<String>,
}

impl ObserveNode {
    pub fn new() -> Self {
        Self {
            enable_loop: false,
            exit_override: None,
        }
    }

    pub fn with_loop() -> Self {
        Self {
            enable_loop: true,
            exit_override: None,
        }
    }

    /// Routes loop-ending decisions to `node_id` instead of `Next::End`.
    pub fn with_exit_override(mut self, node_id: impl Into<String>) -> Self {
        self.exit_override = Some(node_id.into());
        self
    }

    fn end_or_override(&self) -> Next {
        match &self.exit_override {
            Some(id) => Next::Node(id.clone()),
            None => Next::End,
        }
    }
}

impl Default for ObserveNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node<ReActState> for ObserveNode {
    fn id(&self) -> &str {
        "observe"
    }

    async fn run(&self, state: ReActState) -> Result<(ReActState, Next), AgentError> {
        let had_tool_calls = !state.tool_calls.is_empty();
        let mut messages = state.messages;
        for tr in &state.tool_results {
            let name = tr
                .name
                .clone()
                .or_else(|| tr.call_id.clone())
                .unwrap_or_else(|| "tool".to_string());
            messages.push(Message::tool_response(
                tr.call_id.clone(),
                name,
                tr.content.clone(),
            ));
        }
        let return_direct = state.return_direct;
        let next_turn = state.turn_count.saturating_add(1);
        let new_state = ReActState {
            messages,
            tool_calls: vec![],
            tool_results: vec![],
            turn_count: next_turn,
            approval_result: state.approval_result,
            usage: state.usage,
            total_usage: state.total_usage,
            message_count_after_last_think: state.message_count_after_last_think,
            return_direct: false,
        };
        let next = if return_direct {
            self.end_or_override()
        } else if self.enable_loop && next_turn >= MAX_REACT_TURNS {
            self.end_or_override()
        } else if self.enable_loop && had_tool_calls {
            Next::Continue
        } else if self.enable_loop && !had_tool_calls {
            self.end_or_override()
        } else {
            Next::Continue
        };
        Ok((new_state, next))
    }
}
