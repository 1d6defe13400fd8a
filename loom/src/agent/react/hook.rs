//! ReAct composer hooks: lifecycle extension points around the model/tool loop,
//! wired into the graph by [`compose_react_graph`].
//!
//! A [`Hook`] runs at one or more [`HookPosition`]s (`BeforeAgent`, `AfterAgent`,
//! `BeforeModel`, `AfterModel`) and may redirect control flow with a
//! [`JumpTarget`], consulted instead of the derived static edge for that
//! position. This generalizes the plain model↔tool loop `ReactRunner::new`
//! builds directly, the way `helve::ApprovalPolicy` generalizes a single
//! approval check into a hook-shaped extension point.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::graph::{Next, Node, RunContext};
use crate::memory::RunnableConfig;
use crate::state::ReActState;

/// Where in the ReAct loop a [`Hook`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPosition {
    /// Before the loop's first model call (agent-level setup).
    BeforeAgent,
    /// After the loop has exited (agent-level teardown).
    AfterAgent,
    /// Before each model call, inside the loop.
    BeforeModel,
    /// After each model call, inside the loop.
    AfterModel,
}

impl HookPosition {
    fn as_str(&self) -> &'static str {
        match self {
            HookPosition::BeforeAgent => "before_agent",
            HookPosition::AfterAgent => "after_agent",
            HookPosition::BeforeModel => "before_model",
            HookPosition::AfterModel => "after_model",
        }
    }
}

/// A node a [`Hook`] may redirect control flow to, instead of falling through
/// to the statically-derived next node for its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpTarget {
    Model,
    Tool,
    End,
}

/// One lifecycle extension point in the ReAct composer.
///
/// Implementations declare the [`HookPosition`]s they run at via `positions()`
/// and may return a [`JumpTarget`] from `run()` to override the statically
/// derived next node for that position; returning `None` falls through to the
/// static edge (entry/loop-entry/loop-exit/exit, or the next chained hook).
#[async_trait]
pub trait Hook: Send + Sync {
    /// Unique name, used to derive this hook's node id per position.
    fn name(&self) -> &str;

    /// Positions this hook is wired at. A hook registered at more than one
    /// position gets one graph node per position, sharing the same `run`
    /// implementation (dispatched on the `position` argument).
    fn positions(&self) -> &[HookPosition];

    /// Runs the hook's action for `position`, returning the updated state and
    /// an optional jump target overriding the statically derived next node.
    async fn run(
        &self,
        position: HookPosition,
        state: ReActState,
        ctx: &RunContext<ReActState>,
    ) -> Result<(ReActState, Option<JumpTarget>), AgentError>;
}

/// Node id for `hook` at `position`: `"{name}::{position}"`.
pub fn hook_node_id(hook: &dyn Hook, position: HookPosition) -> String {
    format!("{}::{}", hook.name(), position.as_str())
}

/// Wraps one `(Hook, HookPosition)` pair as a graph [`Node`]. `model_node_id`/
/// `tool_node_id` resolve `JumpTarget::Model`/`Tool` to the actual node ids the
/// composer wired `model`/`tool` under (normally `"think"`/`"act"`).
pub(crate) struct HookNode {
    hook: Arc<dyn Hook>,
    position: HookPosition,
    id: String,
    model_node_id: String,
    tool_node_id: String,
}

impl HookNode {
    pub(crate) fn new(
        hook: Arc<dyn Hook>,
        position: HookPosition,
        model_node_id: String,
        tool_node_id: String,
    ) -> Self {
        let id = hook_node_id(hook.as_ref(), position);
        Self {
            hook,
            position,
            id,
            model_node_id,
            tool_node_id,
        }
    }
}

#[async_trait]
impl Node<ReActState> for HookNode {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(&self, state: ReActState) -> Result<(ReActState, Next), AgentError> {
        let ctx = RunContext::new(RunnableConfig::default());
        self.run_with_context(state, &ctx).await
    }

    async fn run_with_context(
        &self,
        state: ReActState,
        ctx: &RunContext<ReActState>,
    ) -> Result<(ReActState, Next), AgentError> {
        let (new_state, jump) = self.hook.run(self.position, state, ctx).await?;
        let next = match jump {
            Some(JumpTarget::Model) => Next::Node(self.model_node_id.clone()),
            Some(JumpTarget::Tool) => Next::Node(self.tool_node_id.clone()),
            Some(JumpTarget::End) => Next::End,
            None => Next::Continue,
        };
        Ok((new_state, next))
    }
}

/// Entry/loop-entry/loop-exit/exit node ids derived from a hook list, plus the
/// per-position hook id chains in wiring order.
///
/// **Open Question decision** (recorded in DESIGN.md): both BEFORE and AFTER
/// hook chains wire in declared order (`hooks[0] -> hooks[1] -> … -> model`
/// for BEFORE, `model -> hooks[0] -> … -> hooks[n-1]` for AFTER). This keeps
/// "first"/"last" in the entry/loop-exit rules literally equal to the
/// declared list's first/last index on both sides of the loop.
pub(crate) struct HookTopology {
    pub entry_id: String,
    pub loop_entry_id: String,
    pub loop_exit_id: String,
    /// Tail of the AFTER_AGENT chain (last AFTER_AGENT hook, else the
    /// terminal sentinel) — the node whose own edge reaches the sentinel.
    /// Named exactly as SPEC_FULL §4.I's "exit node".
    pub exit_id: String,
    /// Head of the AFTER_AGENT chain (first AFTER_AGENT hook, else the
    /// terminal sentinel) — the actual routing target used by `makeModelToTool`'s
    /// "exit" branch and by `ObserveNode`'s return-direct/loop-limit exit, since
    /// routing into a chain must land on its head, not its tail.
    pub after_agent_entry_id: String,
    pub before_agent_chain: Vec<String>,
    pub before_model_chain: Vec<String>,
    pub after_model_chain: Vec<String>,
    pub after_agent_chain: Vec<String>,
}

fn chain_ids(hooks: &[Arc<dyn Hook>], position: HookPosition) -> Vec<String> {
    hooks
        .iter()
        .filter(|h| h.positions().contains(&position))
        .map(|h| hook_node_id(h.as_ref(), position))
        .collect()
}

/// Derives entry/loop-entry/loop-exit/exit node ids and per-position hook
/// chains from `hooks`, given the underlying model/tool node ids (normally
/// `"think"`/`"act"`) and the graph's terminal sentinel.
pub(crate) fn derive_topology(
    hooks: &[Arc<dyn Hook>],
    model_node_id: &str,
    end_id: &str,
) -> HookTopology {
    let before_agent_chain = chain_ids(hooks, HookPosition::BeforeAgent);
    let before_model_chain = chain_ids(hooks, HookPosition::BeforeModel);
    let after_model_chain = chain_ids(hooks, HookPosition::AfterModel);
    let after_agent_chain = chain_ids(hooks, HookPosition::AfterAgent);

    let loop_entry_id = before_model_chain
        .first()
        .cloned()
        .unwrap_or_else(|| model_node_id.to_string());
    let entry_id = before_agent_chain
        .first()
        .cloned()
        .unwrap_or_else(|| loop_entry_id.clone());
    let loop_exit_id = after_model_chain
        .last()
        .cloned()
        .unwrap_or_else(|| model_node_id.to_string());
    let exit_id = after_agent_chain
        .last()
        .cloned()
        .unwrap_or_else(|| end_id.to_string());
    let after_agent_entry_id = after_agent_chain
        .first()
        .cloned()
        .unwrap_or_else(|| end_id.to_string());

    HookTopology {
        entry_id,
        loop_entry_id,
        loop_exit_id,
        exit_id,
        after_agent_entry_id,
        before_agent_chain,
        before_model_chain,
        after_model_chain,
        after_agent_chain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NamedHook {
        name: String,
        positions: Vec<HookPosition>,
    }

    #[async_trait]
    impl Hook for NamedHook {
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
            Ok((state, None))
        }
    }

    fn hook(name: &str, positions: &[HookPosition]) -> Arc<dyn Hook> {
        Arc::new(NamedHook {
            name: name.to_string(),
            positions: positions.to_vec(),
        })
    }

    /// **Scenario**: no hooks at all — everything falls back to model/END.
    #[test]
    fn derive_topology_with_no_hooks_falls_back_to_model_and_end() {
        let topology = derive_topology(&[], "think", "__end__");
        assert_eq!(topology.entry_id, "think");
        assert_eq!(topology.loop_entry_id, "think");
        assert_eq!(topology.loop_exit_id, "think");
        assert_eq!(topology.exit_id, "__end__");
    }

    /// **Scenario**: one hook at each position resolves entry/exit to that hook's id.
    #[test]
    fn derive_topology_with_one_hook_per_position() {
        let hooks = vec![
            hook("audit", &[HookPosition::BeforeAgent]),
            hook("summarize", &[HookPosition::AfterAgent]),
            hook("guard", &[HookPosition::BeforeModel]),
            hook("log", &[HookPosition::AfterModel]),
        ];
        let topology = derive_topology(&hooks, "think", "__end__");
        assert_eq!(topology.entry_id, "audit::before_agent");
        assert_eq!(topology.loop_entry_id, "guard::before_model");
        assert_eq!(topology.loop_exit_id, "log::after_model");
        assert_eq!(topology.exit_id, "summarize::after_agent");
    }

    /// **Scenario**: multiple hooks at the same position chain in declared order,
    /// and entry/loop-exit resolve to first/last of that chain respectively.
    #[test]
    fn derive_topology_chains_multiple_hooks_in_declared_order() {
        let hooks = vec![
            hook("h1", &[HookPosition::BeforeModel]),
            hook("h2", &[HookPosition::BeforeModel]),
            hook("a1", &[HookPosition::AfterModel]),
            hook("a2", &[HookPosition::AfterModel]),
        ];
        let topology = derive_topology(&hooks, "think", "__end__");
        assert_eq!(
            topology.before_model_chain,
            vec!["h1::before_model".to_string(), "h2::before_model".to_string()]
        );
        assert_eq!(topology.loop_entry_id, "h1::before_model");
        assert_eq!(
            topology.after_model_chain,
            vec!["a1::after_model".to_string(), "a2::after_model".to_string()]
        );
        assert_eq!(topology.loop_exit_id, "a2::after_model");
    }

    /// **Scenario**: a hook registered at multiple positions gets one id per position.
    #[test]
    fn hook_node_id_is_scoped_per_position() {
        let h = hook(
            "both",
            &[HookPosition::BeforeAgent, HookPosition::AfterAgent],
        );
        assert_eq!(
            hook_node_id(h.as_ref(), HookPosition::BeforeAgent),
            "both::before_agent"
        );
        assert_eq!(
            hook_node_id(h.as_ref(), HookPosition::AfterAgent),
            "both::after_agent"
        );
    }
}
