//! A [`SubAgent`] is one unit a flow composer chains, fans out to, or routes
//! to — a sub-graph exposed behind a single "take the conversation, produce
//! a reply" interface (SPEC_FULL §4.J: "each `Sᵢ` is itself a sub-agent
//! exposed as a sub-graph").

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AgentError;
use crate::graph::{CompiledStateGraph, Next, Node};
use crate::message::Message;
use crate::state::ReActState;

use super::state::FlowState;

/// One composable unit in a flow graph: runs to completion on the messages
/// handed to it and returns its final reply.
#[async_trait]
pub trait SubAgent: Send + Sync {
    /// Key this sub-agent's output is recorded under in `FlowState::outputs`.
    /// Must be unique within a single `Parallel` flow.
    fn output_key(&self) -> &str;

    /// Runs the sub-agent on `messages`, returning its final reply.
    async fn invoke(&self, messages: Vec<Message>) -> Result<Message, AgentError>;
}

/// A [`SubAgent`] backed by a compiled ReAct graph: `messages` becomes the
/// initial `ReActState`, and the reply is the last assistant message the
/// compiled graph produces.
pub struct ReactSubAgent {
    output_key: String,
    graph: Arc<CompiledStateGraph<ReActState>>,
}

impl ReactSubAgent {
    pub fn new(output_key: impl Into<String>, graph: CompiledStateGraph<ReActState>) -> Self {
        Self {
            output_key: output_key.into(),
            graph: Arc::new(graph),
        }
    }
}

#[async_trait]
impl SubAgent for ReactSubAgent {
    fn output_key(&self) -> &str {
        &self.output_key
    }

    async fn invoke(&self, messages: Vec<Message>) -> Result<Message, AgentError> {
        let state = ReActState {
            messages,
            ..ReActState::default()
        };
        let result = self.graph.invoke(state, None).await?;
        let reply = result.last_assistant_reply().unwrap_or_default();
        Ok(Message::assistant(reply))
    }
}

fn message_text(message: &Message) -> String {
    message.text_content()
}

/// Graph node wrapping one [`SubAgent`]: invokes it on the incoming
/// `messages`, appends its reply to `messages`, and records the reply under
/// its `output_key` in `outputs`.
pub(crate) struct SubAgentNode {
    id: String,
    agent: Arc<dyn SubAgent>,
}

impl SubAgentNode {
    pub(crate) fn new(id: impl Into<String>, agent: Arc<dyn SubAgent>) -> Self {
        Self {
            id: id.into(),
            agent,
        }
    }
}

impl Debug for SubAgentNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubAgentNode").field("id", &self.id).finish()
    }
}

#[async_trait]
impl Node<FlowState> for SubAgentNode {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(&self, state: FlowState) -> Result<(FlowState, Next), AgentError> {
        let reply = self.agent.invoke(state.messages.clone()).await?;
        let mut messages = state.messages;
        let mut outputs = state.outputs;
        outputs.push((
            self.agent.output_key().to_string(),
            Value::String(message_text(&reply)),
        ));
        messages.push(reply);
        Ok((
            FlowState {
                messages,
                outputs,
                route_label: state.route_label,
            },
            Next::Continue,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo {
        output_key: String,
    }

    #[async_trait]
    impl SubAgent for Echo {
        fn output_key(&self) -> &str {
            &self.output_key
        }

        async fn invoke(&self, messages: Vec<Message>) -> Result<Message, AgentError> {
            let last = messages
                .last()
                .map(message_text)
                .unwrap_or_default();
            Ok(Message::assistant(format!("echo:{}", last)))
        }
    }

    #[tokio::test]
    async fn sub_agent_node_records_output_and_appends_reply() {
        let node = SubAgentNode::new(
            "echo",
            Arc::new(Echo {
                output_key: "echo_out".to_string(),
            }),
        );
        let state = FlowState::with_messages(vec![Message::user("hi")]);
        let (new_state, next) = node.run(state).await.unwrap();
        assert!(matches!(next, Next::Continue));
        assert_eq!(new_state.messages.len(), 2);
        assert_eq!(
            new_state.output("echo_out"),
            Some(&Value::String("echo:hi".to_string()))
        );
    }
}
