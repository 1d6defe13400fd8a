//! Parallel flow: one fan-out edge to `2..=10` sub-agents, merged by the
//! caller's [`MergeStrategy`] (SPEC_FULL §4.J). Built directly on 4.D's
//! parallel-fan-out synthesis (`StateGraph::compile`'s `synthesize_parallel_fanouts`
//! pass): `START` edges unconditionally to every sub-agent node, each of which
//! edges to `END`, which is exactly the shape that pass collapses into one
//! synthesized `ParallelNode` at compile time.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;

use crate::channels::FieldBasedUpdater;
use crate::graph::{StateGraph, END, START};

use super::error::FlowError;
use super::state::FlowState;
use super::sub_agent::{SubAgent, SubAgentNode};

const MIN_SUB_AGENTS: usize = 2;
const MAX_SUB_AGENTS: usize = 10;

/// How a `Parallel` flow's sub-agent outputs are combined into one value.
#[derive(Debug, Clone)]
pub enum MergeStrategy {
    /// `{output_key: value, ...}` — a JSON object keyed by output key.
    Map,
    /// `[value, ...]` — an ordered list of values, in sub-agent declaration order.
    List,
    /// A single string, each sub-agent's output joined by `sep`, in declaration order.
    Concat(String),
}

impl MergeStrategy {
    /// Combines the final `FlowState::outputs` (already in declaration order,
    /// per `compose_parallel_flow`'s branch ordering) per this strategy.
    pub fn merge(&self, outputs: &[(String, Value)]) -> Value {
        match self {
            MergeStrategy::Map => {
                Value::Object(outputs.iter().cloned().collect())
            }
            MergeStrategy::List => Value::Array(outputs.iter().map(|(_, v)| v.clone()).collect()),
            MergeStrategy::Concat(sep) => {
                let joined = outputs
                    .iter()
                    .map(|(_, v)| value_as_str(v))
                    .collect::<Vec<_>>()
                    .join(sep);
                Value::String(joined)
            }
        }
    }
}

fn value_as_str(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Builds a `StateGraph<FlowState>` fanning out to `sub_agents` concurrently
/// from `START`, each converging on `END`. `2..=10` sub-agents are required
/// and every `SubAgent::output_key` must be unique (SPEC_FULL §4.J
/// validation rules).
///
/// The returned graph merges branch outputs via a [`FieldBasedUpdater`] that
/// appends each branch's single recorded output and its single appended
/// message, in `ParallelNode`'s edge-declaration run order — callers then
/// apply `merge_strategy.merge(&result.outputs)` to combine them.
pub fn compose_parallel_flow(
    sub_agents: Vec<Arc<dyn SubAgent>>,
) -> Result<StateGraph<FlowState>, FlowError> {
    if sub_agents.len() < MIN_SUB_AGENTS || sub_agents.len() > MAX_SUB_AGENTS {
        return Err(FlowError::InvalidSubAgentCount(sub_agents.len()));
    }
    let mut seen = HashSet::new();
    for agent in &sub_agents {
        if !seen.insert(agent.output_key().to_string()) {
            return Err(FlowError::DuplicateOutputKey(agent.output_key().to_string()));
        }
    }

    let mut graph = StateGraph::<FlowState>::new();
    for (i, agent) in sub_agents.into_iter().enumerate() {
        let id = format!("par_{}", i);
        graph.add_node(id.clone(), Arc::new(SubAgentNode::new(id.clone(), agent)));
        graph.add_edge(START, id.clone());
        graph.add_edge(id, END);
    }

    let updater = FieldBasedUpdater::new(|current: &mut FlowState, update: &FlowState| {
        if let Some(reply) = update.messages.last() {
            current.messages.push(reply.clone());
        }
        current.outputs.extend(update.outputs.iter().cloned());
    });
    Ok(graph.with_state_updater(Arc::new(updater)))
}
