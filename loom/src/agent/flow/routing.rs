//! Routing flow: an LLM classifier node writes a decision label into state;
//! a conditional edge maps that label to one of the declared sub-agents
//! (SPEC_FULL §4.J).

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::graph::{Next, Node, StateGraph, END, START};
use crate::llm::LlmClient;
use crate::message::Message;

use super::error::FlowError;
use super::state::FlowState;
use super::sub_agent::{SubAgent, SubAgentNode};

/// One labeled route: if the classifier picks `label`, `agent` runs.
pub struct Route {
    pub label: String,
    pub agent: Arc<dyn SubAgent>,
}

impl Route {
    pub fn new(label: impl Into<String>, agent: Arc<dyn SubAgent>) -> Self {
        Self {
            label: label.into(),
            agent,
        }
    }
}

/// Classifier node: asks `classifier` to pick one of `labels` for the
/// conversation so far, and records the pick in `FlowState::route_label`.
///
/// The classifier is prompted with the candidate labels and asked to answer
/// with exactly one of them; the first label appearing verbatim in its reply
/// wins. If none match, the first declared label is used as a conservative
/// default rather than failing the run outright.
struct ClassifierNode {
    labels: Vec<String>,
    classifier: Arc<dyn LlmClient>,
}

impl Debug for ClassifierNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierNode")
            .field("labels", &self.labels)
            .finish()
    }
}

impl ClassifierNode {
    fn prompt(&self, messages: &[Message]) -> Vec<Message> {
        let mut prompt = messages.to_vec();
        prompt.push(Message::system(format!(
            "Classify the conversation into exactly one of the following labels: {}. \
             Reply with only the label text, nothing else.",
            self.labels.join(", ")
        )));
        prompt
    }

    fn pick_label(&self, reply: &str) -> String {
        self.labels
            .iter()
            .find(|label| reply.contains(label.as_str()))
            .cloned()
            .unwrap_or_else(|| self.labels[0].clone())
    }
}

#[async_trait]
impl Node<FlowState> for ClassifierNode {
    fn id(&self) -> &str {
        "classify"
    }

    async fn run(&self, state: FlowState) -> Result<(FlowState, Next), AgentError> {
        let response = self.classifier.invoke(&self.prompt(&state.messages)).await?;
        let label = self.pick_label(&response.content);
        Ok((
            FlowState {
                route_label: Some(label),
                ..state
            },
            Next::Continue,
        ))
    }
}

/// Builds a `StateGraph<FlowState>` whose entry node is an LLM classifier:
/// `START -> classify -> {route.agent for the picked label} -> END`.
///
/// Requires at least one route; duplicate labels are allowed but only the
/// first sub-agent registered under a label is reachable, since the path map
/// is keyed by label.
pub fn compose_routing_flow(
    classifier: Arc<dyn LlmClient>,
    routes: Vec<Route>,
) -> Result<StateGraph<FlowState>, FlowError> {
    if routes.is_empty() {
        return Err(FlowError::NoRoutes);
    }

    let labels: Vec<String> = routes.iter().map(|r| r.label.clone()).collect();
    let mut graph = StateGraph::<FlowState>::new();
    graph.add_node(
        "classify",
        Arc::new(ClassifierNode {
            labels: labels.clone(),
            classifier,
        }),
    );
    graph.add_edge(START, "classify");

    let mut path_map = HashMap::new();
    for (i, route) in routes.into_iter().enumerate() {
        let id = format!("route_{}", i);
        graph.add_node(id.clone(), Arc::new(SubAgentNode::new(id.clone(), route.agent)));
        graph.add_edge(id.clone(), END);
        path_map.insert(route.label, id);
    }

    graph.add_conditional_edges(
        "classify",
        Arc::new(|s: &FlowState| s.route_label.clone().unwrap_or_default()),
        Some(path_map),
    );

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;

    struct Echo(&'static str);

    #[async_trait]
    impl SubAgent for Echo {
        fn output_key(&self) -> &str {
            self.0
        }

        async fn invoke(&self, _messages: Vec<Message>) -> Result<Message, AgentError> {
            Ok(Message::assistant(format!("handled by {}", self.0)))
        }
    }

    #[test]
    fn rejects_empty_routes() {
        let err =
            compose_routing_flow(Arc::new(MockLlm::with_no_tool_calls("x")), vec![]).unwrap_err();
        assert!(matches!(err, FlowError::NoRoutes));
    }

    #[tokio::test]
    async fn routes_to_the_label_the_classifier_picks() {
        let classifier = Arc::new(MockLlm::with_no_tool_calls("billing"));
        let routes = vec![
            Route::new("billing", Arc::new(Echo("billing"))),
            Route::new("support", Arc::new(Echo("support"))),
        ];
        let graph = compose_routing_flow(classifier, routes).unwrap();
        let compiled = graph.compile().unwrap();
        let result = compiled
            .invoke(
                FlowState::with_messages(vec![Message::user("refund please")]),
                None,
            )
            .await
            .unwrap();
        assert_eq!(result.route_label, Some("billing".to_string()));
        assert_eq!(
            result.messages.last().map(Message::text_content),
            Some("handled by billing".to_string())
        );
    }

    #[tokio::test]
    async fn falls_back_to_first_label_when_classifier_reply_matches_none() {
        let classifier = Arc::new(MockLlm::with_no_tool_calls("unrelated answer"));
        let routes = vec![
            Route::new("billing", Arc::new(Echo("billing"))),
            Route::new("support", Arc::new(Echo("support"))),
        ];
        let graph = compose_routing_flow(classifier, routes).unwrap();
        let compiled = graph.compile().unwrap();
        let result = compiled
            .invoke(FlowState::with_messages(vec![Message::user("hi")]), None)
            .await
            .unwrap();
        assert_eq!(result.route_label, Some("billing".to_string()));
    }
}
