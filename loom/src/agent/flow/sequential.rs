//! Sequential flow: `S0 -> S1 -> ... -> Sn`, state flowing left to right
//! (SPEC_FULL §4.J).

use std::sync::Arc;

use crate::graph::{StateGraph, END, START};

use super::error::FlowError;
use super::state::FlowState;
use super::sub_agent::{SubAgent, SubAgentNode};

/// Builds a `StateGraph<FlowState>` chaining `sub_agents` left to right:
/// `START -> sub_agents[0] -> ... -> sub_agents[n-1] -> END`. Each sub-agent
/// sees the conversation so far, including every earlier sub-agent's reply.
pub fn compose_sequential_flow(
    sub_agents: Vec<Arc<dyn SubAgent>>,
) -> Result<StateGraph<FlowState>, FlowError> {
    let mut graph = StateGraph::<FlowState>::new();
    let ids: Vec<String> = sub_agents
        .iter()
        .enumerate()
        .map(|(i, _)| format!("seq_{}", i))
        .collect();

    for (id, agent) in ids.iter().zip(sub_agents.into_iter()) {
        graph.add_node(id.clone(), Arc::new(SubAgentNode::new(id.clone(), agent)));
    }

    let mut cursor = START.to_string();
    for id in &ids {
        graph.add_edge(cursor.clone(), id.clone());
        cursor = id.clone();
    }
    graph.add_edge(cursor, END);

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use crate::message::Message;
    use async_trait::async_trait;

    struct Upper;

    #[async_trait]
    impl SubAgent for Upper {
        fn output_key(&self) -> &str {
            "upper"
        }

        async fn invoke(&self, messages: Vec<Message>) -> Result<Message, AgentError> {
            let last = messages.last().cloned().unwrap_or(Message::user(""));
            let text = last.text_content();
            Ok(Message::assistant(text.to_uppercase()))
        }
    }

    struct Suffix(&'static str);

    #[async_trait]
    impl SubAgent for Suffix {
        fn output_key(&self) -> &str {
            "suffix"
        }

        async fn invoke(&self, messages: Vec<Message>) -> Result<Message, AgentError> {
            let last = messages.last().cloned().unwrap_or(Message::user(""));
            let text = last.text_content();
            Ok(Message::assistant(format!("{}{}", text, self.0)))
        }
    }

    #[tokio::test]
    async fn sequential_flow_threads_state_left_to_right() {
        let graph = compose_sequential_flow(vec![Arc::new(Upper), Arc::new(Suffix("!"))]).unwrap();
        let compiled = graph.compile().unwrap();
        let result = compiled
            .invoke(FlowState::with_messages(vec![Message::user("hi")]), None)
            .await
            .unwrap();
        assert_eq!(result.output("upper"), Some(&serde_json::Value::String("HI".into())));
        assert_eq!(
            result.output("suffix"),
            Some(&serde_json::Value::String("HI!".into()))
        );
        assert_eq!(result.messages.len(), 3);
    }
}
