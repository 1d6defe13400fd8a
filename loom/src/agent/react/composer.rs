//! Builds a ReAct graph from a set of declared [`Hook`]s, generalizing
//! `ReactRunner::new`'s fixed think→act→observe→compress loop with the
//! entry/loop-entry/loop-exit/exit derivation in [`derive_topology`].
//!
//! With no hooks at all, [`compose_react_graph`] wires exactly the topology
//! `ReactRunner::new` builds by hand: `START -> think`, `think` conditionally
//! to `act` or `END`, `act -> observe -> compress -> think`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::compress::{build_graph, CompactionConfig, CompressionGraphNode};
use crate::graph::{CompilationError, StateGraph, END, START};
use crate::helve::ApprovalPolicy;
use crate::memory::Store;
use crate::state::ReActState;
use crate::tool_source::ToolSource;
use crate::{LlmClient, Node};

use super::act_node::{ActNode, HandleToolErrors};
use super::hook::{derive_topology, Hook, HookNode};
use super::observe_node::ObserveNode;
use super::think_node::ThinkNode;
use super::tools_condition;

const MODEL_NODE_ID: &str = "think";
const TOOL_NODE_ID: &str = "act";

/// Wires `chain[0] -> chain[1] -> … -> chain[n-1] -> tail`. A caller wires the
/// edge *into* `chain[0]` separately (it's always the externally-visible
/// entry/loop-entry/exit id already); a no-op when `chain` is empty.
fn wire_segment(graph: &mut StateGraph<ReActState>, chain: &[String], tail: &str) {
    for pair in chain.windows(2) {
        graph.add_edge(&pair[0], &pair[1]);
    }
    if let Some(last) = chain.last() {
        graph.add_edge(last, tail);
    }
}

/// Builds a `StateGraph<ReActState>` implementing the ReAct composer's
/// hook-derived topology (SPEC_FULL §4.I). Returns the graph unwired to a
/// checkpointer/store; callers compile it the same way `ReactRunner::new`
/// compiles its graph.
pub fn compose_react_graph(
    llm: Arc<dyn LlmClient>,
    tool_source: Box<dyn ToolSource>,
    store: Option<Arc<dyn Store>>,
    approval_policy: Option<ApprovalPolicy>,
    compaction_config: Option<CompactionConfig>,
    hooks: Vec<Arc<dyn Hook>>,
) -> Result<StateGraph<ReActState>, CompilationError> {
    let topology = derive_topology(&hooks, MODEL_NODE_ID, END);

    let think = ThinkNode::new(Arc::clone(&llm));
    let act = ActNode::new(tool_source)
        .with_handle_tool_errors(HandleToolErrors::Always(None))
        .with_approval_policy(approval_policy);
    let observe =
        ObserveNode::with_loop().with_exit_override(topology.after_agent_entry_id.clone());

    let compaction_cfg = compaction_config.unwrap_or_default();
    let compression_graph = build_graph(compaction_cfg, Arc::clone(&llm))?;
    let compress_node = Arc::new(CompressionGraphNode::new(compression_graph));

    let mut graph = StateGraph::<ReActState>::new();
    if let Some(s) = store {
        graph = graph.with_store(s);
    }

    graph
        .add_node(MODEL_NODE_ID, Arc::new(think))
        .add_node(TOOL_NODE_ID, Arc::new(act))
        .add_node("observe", Arc::new(observe))
        .add_node("compress", compress_node);

    for hook in &hooks {
        for position in hook.positions() {
            let node = HookNode::new(
                Arc::clone(hook),
                *position,
                MODEL_NODE_ID.to_string(),
                TOOL_NODE_ID.to_string(),
            );
            let id = node.id().to_string();
            graph.add_node(id, Arc::new(node));
        }
    }

    graph.add_edge(START, &topology.entry_id);
    wire_segment(&mut graph, &topology.before_agent_chain, &topology.loop_entry_id);
    wire_segment(&mut graph, &topology.before_model_chain, MODEL_NODE_ID);

    if topology.after_model_chain.is_empty() {
        // loop_exit_id == MODEL_NODE_ID; the conditional edge below attaches directly to it.
    } else {
        graph.add_edge(MODEL_NODE_ID, &topology.after_model_chain[0]);
        for pair in topology.after_model_chain.windows(2) {
            graph.add_edge(&pair[0], &pair[1]);
        }
        // the chain's last element IS loop_exit_id; its outgoing edge is the
        // conditional edge attached below, not a plain `add_edge`.
    }

    let model_to_tool_path_map: HashMap<String, String> = [
        ("tools".to_string(), TOOL_NODE_ID.to_string()),
        (END.to_string(), topology.after_agent_entry_id.clone()),
    ]
    .into_iter()
    .collect();
    graph.add_conditional_edges(
        &topology.loop_exit_id,
        Arc::new(|state: &ReActState| tools_condition(state).as_str().to_string()),
        Some(model_to_tool_path_map),
    );

    graph.add_edge(TOOL_NODE_ID, "observe");
    graph.add_edge("observe", "compress");
    graph.add_edge("compress", &topology.loop_entry_id);

    wire_segment(&mut graph, &topology.after_agent_chain, END);

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::hook::{HookPosition, JumpTarget};
    use crate::error::AgentError;
    use crate::graph::RunContext;
    use crate::message::Message;
    use crate::tools::MockToolSource;
    use crate::MockLlm;
    use async_trait::async_trait;

    struct CountingHook {
        name: String,
        positions: Vec<HookPosition>,
        calls: Arc<std::sync::atomic::AtomicU32>,
    }

    #[async_trait]
    impl Hook for CountingHook {
        fn name(&self) -> &str {
            &self.name
        }
        fn positions(&self) -> &[HookPosition] {
            &self.positions
        }
        async fn run(
            &self,
            _position: HookPosition,
            state: ReActState,
            _ctx: &RunContext<ReActState>,
        ) -> Result<(ReActState, Option<JumpTarget>), AgentError> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok((state, None))
        }
    }

    fn fresh_state(text: &str) -> ReActState {
        ReActState {
            messages: vec![Message::user(text)],
            tool_calls: vec![],
            tool_results: vec![],
            turn_count: 0,
            approval_result: None,
            usage: None,
            total_usage: None,
            message_count_after_last_think: None,
            return_direct: false,
        }
    }

    /// **Scenario**: composing with zero hooks yields a graph that compiles
    /// and runs, matching `ReactRunner::new`'s plain topology.
    #[tokio::test]
    async fn compose_with_no_hooks_compiles_and_runs() {
        let llm: Arc<dyn LlmClient> = Arc::new(MockLlm::first_tools_then_end());
        let tools = Box::new(MockToolSource::get_time_example());
        let graph = compose_react_graph(llm, tools, None, None, None, vec![]).unwrap();
        let compiled = graph.compile().unwrap();
        let result = compiled
            .invoke(fresh_state("what time is it?"), None)
            .await
            .unwrap();
        assert!(!result.messages.is_empty());
    }

    /// **Scenario**: a BEFORE_AGENT hook runs exactly once, before the loop starts.
    #[tokio::test]
    async fn before_agent_hook_runs_once() {
        let calls = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let hook: Arc<dyn Hook> = Arc::new(CountingHook {
            name: "setup".into(),
            positions: vec![HookPosition::BeforeAgent],
            calls: calls.clone(),
        });
        let llm: Arc<dyn LlmClient> = Arc::new(MockLlm::first_tools_then_end());
        let tools = Box::new(MockToolSource::get_time_example());
        let graph = compose_react_graph(llm, tools, None, None, None, vec![hook]).unwrap();
        let compiled = graph.compile().unwrap();
        compiled.invoke(fresh_state("hi"), None).await.unwrap();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    /// **Scenario**: an AFTER_AGENT hook runs once the loop decides to end.
    #[tokio::test]
    async fn after_agent_hook_runs_on_loop_exit() {
        let calls = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let hook: Arc<dyn Hook> = Arc::new(CountingHook {
            name: "teardown".into(),
            positions: vec![HookPosition::AfterAgent],
            calls: calls.clone(),
        });
        let llm: Arc<dyn LlmClient> = Arc::new(MockLlm::first_tools_then_end());
        let tools = Box::new(MockToolSource::get_time_example());
        let graph = compose_react_graph(llm, tools, None, None, None, vec![hook]).unwrap();
        let compiled = graph.compile().unwrap();
        compiled.invoke(fresh_state("hi"), None).await.unwrap();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
