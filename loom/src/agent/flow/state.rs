//! Graph state shared by the Sequential/Parallel/Routing flow composers.

use crate::message::Message;
use serde_json::Value;

/// State threaded through flow-composer graphs.
///
/// Distinct from [`ReActState`](crate::state::ReActState): a flow composes
/// whole sub-agents (each internally driving its own ReAct loop), not
/// individual model/tool turns, so its state only needs the conversation
/// so far, each sub-agent's recorded output, and (for `Routing`) the
/// classifier's decision label.
#[derive(Debug, Clone, Default)]
pub struct FlowState {
    /// Conversation history, extended by each sub-agent's reply in `Sequential`
    /// flows; read-only input to every sub-agent in `Parallel`/`Routing` flows.
    pub messages: Vec<Message>,
    /// Each sub-agent's output, in the order its node ran — the source data
    /// for `MergeStrategy`. Keyed by `SubAgent::output_key`.
    pub outputs: Vec<(String, Value)>,
    /// Decision label written by a `Routing` flow's classifier node.
    pub route_label: Option<String>,
}

impl FlowState {
    /// Starts a flow with the given input messages and no recorded outputs.
    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            outputs: Vec::new(),
            route_label: None,
        }
    }

    /// Looks up one sub-agent's recorded output by key.
    pub fn output(&self, key: &str) -> Option<&Value> {
        self.outputs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_finds_matching_key() {
        let mut state = FlowState::with_messages(vec![]);
        state.outputs.push(("a".to_string(), Value::String("x".into())));
        state.outputs.push(("b".to_string(), Value::String("y".into())));
        assert_eq!(state.output("b"), Some(&Value::String("y".into())));
        assert_eq!(state.output("c"), None);
    }
}
