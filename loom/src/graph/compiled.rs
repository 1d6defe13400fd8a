//! Compiled state graph: immutable, supports invoke and stream.
//!
//! Built by `StateGraph::compile` or `compile_with_checkpointer`. Holds nodes and
//! edge order (derived from explicit edges at compile time), optional checkpointer.
//! When checkpointer is set and config.thread_id is provided, final state is saved after invoke.

use std::collections::HashSet;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::channels::BoxedStateUpdater;
use crate::error::AgentError;
use crate::memory::{
    Checkpoint, CheckpointSource, Checkpointer, RunnableConfig, Store, DEFAULT_RECURSION_LIMIT,
};
use crate::stream::{CheckpointEvent, StreamEvent, StreamMode};

use super::interrupt::{GraphInterrupt, Interrupt, InterruptHandler};
use super::logging::{
    log_graph_complete, log_graph_error, log_graph_start, log_node_complete, log_node_start,
    log_state_update,
};
use super::node_middleware::NodeMiddleware;
use super::retry::RetryPolicy;
use super::state_graph::END;
use super::{Next, NextEntry, Node, RunContext};

/// Compiled graph: immutable structure, supports invoke and stream.
///
/// Created by `StateGraph::compile()` or `compile_with_checkpointer()`. Runs from first node;
/// uses each node's returned `Next` or conditional router (when present) to choose next node.
/// When checkpointer is set, invoke(state, config) saves the final state for config.thread_id.
/// When store is set (via `with_store` before compile), nodes can use it for long-term memory.
#[derive(Clone)]
pub struct CompiledStateGraph<S> {
    pub(super) nodes: HashMap<String, Arc<dyn Node<S>>>,
    /// First node to run (from START). Used when no next_map or for initial step.
    pub(super) first_node_id: String,
    /// Linear order of nodes (used for Next::Continue when no conditional). Empty when graph has conditional edges.
    pub(super) edge_order: Vec<String>,
    /// Map from node id to how to get next: Unconditional(to_id) or Conditional(router). Used for routing after each node.
    pub(super) next_map: HashMap<String, NextEntry<S>>,
    pub(super) checkpointer: Option<Arc<dyn Checkpointer<S>>>,
    /// Optional long-term store; set when graph was built with `with_store`. Nodes use it via config or construction.
    pub(super) store: Option<Arc<dyn Store>>,
    /// Optional node middleware; set when built with `compile_with_middleware` or `compile_with_checkpointer_and_middleware`.
    pub(super) middleware: Option<Arc<dyn NodeMiddleware<S>>>,
    /// State updater that controls how node outputs are merged into state.
    /// Default is `ReplaceUpdater` which fully replaces the state.
    pub(super) state_updater: BoxedStateUpdater<S>,
    /// Retry policy for node execution. Default is `RetryPolicy::None`.
    pub(super) retry_policy: RetryPolicy,
    /// Optional interrupt handler for human-in-the-loop scenarios.
    pub(super) interrupt_handler: Option<Arc<dyn InterruptHandler>>,
    /// Node ids that raise a declarative interrupt before they run.
    /// Validated at compile time (`CompilationError::InterruptTargetMissing`).
    pub(super) interrupt_before: HashSet<String>,
    /// Node ids that raise a declarative interrupt after they run, once their
    /// outgoing edge has been resolved but before the engine advances to it.
    pub(super) interrupt_after: HashSet<String>,
}

impl<S> CompiledStateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Execute a node with retry logic.
    async fn execute_node_with_retry(
        &self,
        node: Arc<dyn Node<S>>,
        state: S,
        run_ctx: Option<&RunContext<S>>,
    ) -> Result<(S, Next), AgentError> {
        let mut attempt = 0;
        loop {
            let current_state = state.clone();
            let result = if let Some(middleware) = &self.middleware {
                let node_id = node.id().to_string();
                let run_ctx_owned = run_ctx.cloned();
                let node_clone = node.clone();
                middleware
                    .around_run(
                        &node_id,
                        current_state,
                        Box::new(move |s| {
                            let node = node_clone.clone();
                            let run_ctx_inner = run_ctx_owned.clone();
                            Box::pin(async move {
                                if let Some(ctx) = run_ctx_inner.as_ref() {
                                    node.run_with_context(s, ctx).await
                                } else {
                                    node.run(s).await
                                }
                            })
                        }),
                    )
                    .await
            } else if let Some(ctx) = run_ctx {
                node.run_with_context(current_state, ctx).await
            } else {
                node.run(current_state).await
            };

            match result {
                Ok(output) => return Ok(output),
                Err(e) => {
                    if self.retry_policy.should_retry(attempt) {
                        let delay = self.retry_policy.delay(attempt);
                        if delay > std::time::Duration::ZERO {
                            tokio::time::sleep(delay).await;
                        }
                        attempt += 1;
                        continue;
                    }
                    return Err(e);
                }
            }
        }
    }

    async fn save_checkpoint(
        &self,
        state: &S,
        config: &Option<RunnableConfig>,
        run_ctx: Option<&RunContext<S>>,
    ) {
        let (Some(cp), Some(cfg)) = (&self.checkpointer, config) else {
            return;
        };
        if cfg.thread_id.is_none() {
            return;
        }
        let checkpoint = Checkpoint::from_state(state.clone(), CheckpointSource::Loop, 0);
        // Each step's checkpoint is a fresh append, never a replace of whatever
        // checkpoint_id the caller's config happened to carry (e.g. a time-travel
        // resume point) — only `update_state` replaces an existing checkpoint in
        // place, and it does so through its own config with checkpoint_id set.
        let mut put_cfg = cfg.clone();
        put_cfg.checkpoint_id = None;
        let _ = cp.put(&put_cfg, &checkpoint).await;

        if let Some(ctx) = run_ctx {
            if let Some(tx) = &ctx.stream_tx {
                if ctx.stream_mode.contains(&StreamMode::Checkpoints)
                    || ctx.stream_mode.contains(&StreamMode::Debug)
                {
                    let checkpoint_ns = if cfg.checkpoint_ns.is_empty() {
                        None
                    } else {
                        Some(cfg.checkpoint_ns.clone())
                    };
                    let _ = tx
                        .send(StreamEvent::Checkpoint(CheckpointEvent {
                            checkpoint_id: checkpoint.id.clone(),
                            timestamp: checkpoint.ts.clone(),
                            step: checkpoint.metadata.step,
                            state: state.clone(),
                            thread_id: cfg.thread_id.clone(),
                            checkpoint_ns,
                        }))
                        .await;
                }
            }
        }
    }

    /// Raises a declarative (`interrupt_before`/`interrupt_after`) interrupt: saves a
    /// checkpoint of the current state, runs the configured `InterruptHandler` (if any),
    /// emits a `TaskEnd` stream event, and returns `AgentError::Interrupted`.
    ///
    /// `resume_at` is carried in the interrupt's JSON payload under `"resume_at"` — the
    /// caller reads it back and sets it as `RunnableConfig::resume_from_node_id` on the
    /// next `invoke`/`stream` call. For `interrupt_before`, `resume_at == node_id` (the
    /// node never ran, so resuming re-enters it); for `interrupt_after`, `resume_at` is
    /// the already-resolved outgoing edge target (the node already ran, so resuming
    /// continues past it) — this is the `advance` step 2 "resume marker" the distilled
    /// spec calls for, layered on the existing error-based interrupt mechanism rather
    /// than a second parallel one.
    async fn raise_declarative_interrupt(
        &self,
        state: &S,
        config: &Option<RunnableConfig>,
        run_ctx: Option<&RunContext<S>>,
        node_id: &str,
        resume_at: String,
    ) -> Result<(), AgentError> {
        self.save_checkpoint(state, config, run_ctx).await;

        let interrupt = Interrupt::with_id(
            serde_json::json!({ "node_id": node_id, "resume_at": resume_at }),
            node_id.to_string(),
        );

        if let Some(handler) = &self.interrupt_handler {
            let _ = handler.handle_interrupt(&interrupt);
        }

        if let Some(ctx) = run_ctx {
            if let Some(tx) = &ctx.stream_tx {
                if ctx.stream_mode.contains(&StreamMode::Tasks)
                    || ctx.stream_mode.contains(&StreamMode::Debug)
                {
                    let _ = tx
                        .send(StreamEvent::TaskEnd {
                            node_id: node_id.to_string(),
                            result: Err(format!("interrupted: {:?}", interrupt.value)),
                        })
                        .await;
                }
            }
        }

        let graph_interrupt = GraphInterrupt(interrupt);
        log_graph_error(&AgentError::Interrupted(graph_interrupt.clone()));
        Err(AgentError::Interrupted(graph_interrupt))
    }

    /// Shared run loop used by invoke() and stream(): steps through nodes until completion.
    async fn run_loop_inner(
        &self,
        state: &mut S,
        config: &Option<RunnableConfig>,
        current_id: &mut String,
        run_ctx: Option<&RunContext<S>>,
    ) -> Result<(), AgentError> {
        log_graph_start();

        let recursion_limit = config
            .as_ref()
            .and_then(|c| c.recursion_limit)
            .unwrap_or(DEFAULT_RECURSION_LIMIT);
        let mut first_pass = true;
        let mut steps: usize = 0;

        loop {
            steps += 1;
            if steps > recursion_limit {
                let err = AgentError::RecursionLimit(recursion_limit);
                log_graph_error(&err);
                return Err(err);
            }

            let is_resume_reentry = first_pass
                && config
                    .as_ref()
                    .and_then(|c| c.resume_from_node_id.as_deref())
                    == Some(current_id.as_str());
            first_pass = false;

            if !is_resume_reentry && self.interrupt_before.contains(current_id.as_str()) {
                return self
                    .raise_declarative_interrupt(
                        state,
                        config,
                        run_ctx,
                        current_id,
                        current_id.clone(),
                    )
                    .await;
            }

            let node = self
                .nodes
                .get(current_id)
                .expect("compiled graph has all nodes")
                .clone();
            let current_state = state.clone();

            log_node_start(current_id);

            if let Some(ctx) = run_ctx {
                if let Some(tx) = &ctx.stream_tx {
                    if ctx.stream_mode.contains(&StreamMode::Tasks)
                        || ctx.stream_mode.contains(&StreamMode::Debug)
                    {
                        let _ = tx
                            .send(StreamEvent::TaskStart {
                                node_id: current_id.clone(),
                            })
                            .await;
                    }
                }
            }

            let result = self
                .execute_node_with_retry(node, current_state, run_ctx)
                .await;

            let (new_state, next) = match result {
                Ok(output) => output,
                Err(AgentError::Interrupted(ref interrupt)) => {
                    self.save_checkpoint(state, config, run_ctx).await;

                    if let Some(handler) = &self.interrupt_handler {
                        let _ = handler.handle_interrupt(&interrupt.0);
                    }

                    if let Some(ctx) = run_ctx {
                        if let Some(tx) = &ctx.stream_tx {
                            if ctx.stream_mode.contains(&StreamMode::Tasks)
                                || ctx.stream_mode.contains(&StreamMode::Debug)
                            {
                                let _ = tx
                                    .send(StreamEvent::TaskEnd {
                                        node_id: current_id.clone(),
                                        result: Err(format!(
                                            "interrupted: {:?}",
                                            interrupt.0.value
                                        )),
                                    })
                                    .await;
                            }
                        }
                    }

                    log_graph_error(&AgentError::Interrupted(interrupt.clone()));
                    return Err(AgentError::Interrupted(interrupt.clone()));
                }
                Err(e) => {
                    if let Some(ctx) = run_ctx {
                        if let Some(tx) = &ctx.stream_tx {
                            if ctx.stream_mode.contains(&StreamMode::Tasks)
                                || ctx.stream_mode.contains(&StreamMode::Debug)
                            {
                                let _ = tx
                                    .send(StreamEvent::TaskEnd {
                                        node_id: current_id.clone(),
                                        result: Err(e.to_string()),
                                    })
                                    .await;
                            }
                        }
                    }
                    log_graph_error(&e);
                    return Err(e);
                }
            };

            if let Some(ctx) = run_ctx {
                if let Some(tx) = &ctx.stream_tx {
                    if ctx.stream_mode.contains(&StreamMode::Tasks)
                        || ctx.stream_mode.contains(&StreamMode::Debug)
                    {
                        let _ = tx
                            .send(StreamEvent::TaskEnd {
                                node_id: current_id.clone(),
                                result: Ok(()),
                            })
                            .await;
                    }
                }
            }

            log_node_complete(current_id, &next);

            self.state_updater.apply_update(state, &new_state);

            log_state_update(current_id);

            if let Some(ctx) = run_ctx {
                if let Some(tx) = &ctx.stream_tx {
                    if ctx.stream_mode.contains(&StreamMode::Values) {
                        let _ = tx.send(StreamEvent::Values(state.clone())).await;
                    }
                    if ctx.stream_mode.contains(&StreamMode::Updates) {
                        let _ = tx
                            .send(StreamEvent::Updates {
                                node_id: current_id.clone(),
                                state: state.clone(),
                            })
                            .await;
                    }
                }
            }

            let next_id: Option<String> =
                if let Some(NextEntry::Conditional(router)) = self.next_map.get(current_id) {
                    let target = router.resolve_next(state);
                    tracing::debug!(from = %current_id, to = %target, "conditional routing");
                    Some(target)
                } else {
                    match next {
                        Next::End => None,
                        Next::Node(id) => Some(id),
                        Next::Continue => self
                            .next_map
                            .get(current_id)
                            .and_then(|e| {
                                if let NextEntry::Unconditional(id) = e {
                                    Some(id.clone())
                                } else {
                                    None
                                }
                            })
                            .or_else(|| {
                                let pos = self.edge_order.iter().position(|x| x == current_id)?;
                                self.edge_order.get(pos + 1).cloned()
                            }),
                    }
                };

            if self.interrupt_after.contains(current_id.as_str()) {
                let resume_at = next_id.clone().unwrap_or_else(|| END.to_string());
                return self
                    .raise_declarative_interrupt(state, config, run_ctx, current_id, resume_at)
                    .await;
            }

            let should_end = next_id.is_none() || next_id.as_deref() == Some(END);
            if should_end {
                self.save_checkpoint(state, config, run_ctx).await;
                log_graph_complete();
                return Ok(());
            }
            if let Some(id) = next_id {
                *current_id = id;
            }
        }
    }

    /// Runs the graph with the given state. Starts at the first node in edge order;
    /// after each node, uses returned `Next` to continue linear order, jump to a node, or end.
    ///
    /// When `config` has `thread_id` and the graph was compiled with a checkpointer,
    /// the final state is saved after the run. Pass `None` for config to keep current behavior (no persistence).
    /// If `config.resume_from_node_id` is set (and names a node in this graph), the run
    /// starts there instead of at the first node — used to resume after an interrupt.
    pub async fn invoke(&self, state: S, config: Option<RunnableConfig>) -> Result<S, AgentError> {
        if self.nodes.is_empty() || !self.nodes.contains_key(&self.first_node_id) {
            return Err(AgentError::ExecutionFailed("empty graph".into()));
        }
        let config = config.unwrap_or_default();
        let run_ctx = RunContext::new(config.clone());
        let mut state = state;
        let mut current_id = run_ctx
            .config
            .resume_from_node_id
            .as_ref()
            .filter(|id| self.nodes.contains_key(id.as_str()))
            .cloned()
            .unwrap_or_else(|| self.first_node_id.clone());

        self.run_loop_inner(&mut state, &Some(config), &mut current_id, Some(&run_ctx))
            .await?;

        Ok(state)
    }

    /// Runs the graph with a fully configured RunContext (custom store, previous state,
    /// runtime context data).
    pub async fn invoke_with_context(
        &self,
        state: S,
        run_ctx: RunContext<S>,
    ) -> Result<S, AgentError> {
        let mut state = state;
        let mut current_id = run_ctx
            .config
            .resume_from_node_id
            .as_ref()
            .filter(|id| self.nodes.contains_key(id.as_str()))
            .cloned()
            .unwrap_or_else(|| self.first_node_id.clone());

        let config = Some(run_ctx.config.clone());
        self.run_loop_inner(&mut state, &config, &mut current_id, Some(&run_ctx))
            .await?;

        Ok(state)
    }

    /// Streams graph execution, emitting events via channel-backed Stream.
    pub fn stream(
        &self,
        state: S,
        config: Option<RunnableConfig>,
        stream_mode: impl Into<HashSet<StreamMode>>,
    ) -> ReceiverStream<StreamEvent<S>> {
        let (tx, rx) = mpsc::channel(128);
        let graph = self.clone();
        let mode_set: HashSet<StreamMode> = stream_mode.into();

        tokio::spawn(async move {
            let mut run_ctx = RunContext::new(config.clone().unwrap_or_default());
            let mut current_id = run_ctx
                .config
                .resume_from_node_id
                .as_ref()
                .filter(|id| graph.nodes.contains_key(id.as_str()))
                .cloned()
                .unwrap_or_else(|| graph.first_node_id.clone());
            let mut state = state;
            run_ctx.stream_tx = Some(tx);
            run_ctx.stream_mode = mode_set;

            let _ = graph
                .run_loop_inner(&mut state, &config, &mut current_id, Some(&run_ctx))
                .await;
        });

        ReceiverStream::new(rx)
    }

    /// Returns the long-term store if the graph was compiled with `with_store(store)`.
    pub fn store(&self) -> Option<&Arc<dyn Store>> {
        self.store.as_ref()
    }

    /// Engine API `updateState`: loads the checkpoint named by `config` (the latest
    /// one for the thread when `config.checkpoint_id` is unset), merges `delta` into
    /// its state via the graph's configured state updater, and replaces that same
    /// checkpoint in place — `Checkpointer::put` sees a `Checkpoint` whose `id`
    /// matches an existing entry, which both reference backends (`MemorySaver`,
    /// `SqliteSaver`) treat as an overwrite rather than a new append.
    ///
    /// `as_node` is recorded as `resume_from_node_id` on the returned config, so a
    /// caller doing `graph.invoke(state, Some(graph.update_state(...).await?))`
    /// resumes at that node rather than the graph's first node.
    ///
    /// Fails with `ExecutionFailed` when the graph has no checkpointer configured
    /// or when `config` names no existing checkpoint.
    pub async fn update_state(
        &self,
        config: &RunnableConfig,
        delta: &S,
        as_node: Option<String>,
    ) -> Result<RunnableConfig, AgentError> {
        let checkpointer = self.checkpointer.as_ref().ok_or_else(|| {
            AgentError::ExecutionFailed("update_state requires a checkpointer".into())
        })?;

        let (mut checkpoint, _metadata) = checkpointer
            .get_tuple(config)
            .await
            .map_err(|e| AgentError::ExecutionFailed(e.to_string()))?
            .ok_or_else(|| AgentError::ExecutionFailed("no checkpoint to update".into()))?;

        self.state_updater
            .apply_update(&mut checkpoint.channel_values, delta);
        checkpoint.metadata.source = CheckpointSource::Update;

        let mut put_cfg = config.clone();
        put_cfg.checkpoint_id = Some(checkpoint.id.clone());
        let saved_id = checkpointer
            .put(&put_cfg, &checkpoint)
            .await
            .map_err(|e| AgentError::ExecutionFailed(e.to_string()))?;

        Ok(RunnableConfig {
            checkpoint_id: Some(saved_id),
            resume_from_node_id: as_node,
            ..config.clone()
        })
    }

    /// Clears all persisted checkpoints for `config.thread_id`, when a checkpointer is set.
    ///
    /// Returns `Ok(false)` with no checkpointer configured or no `thread_id` in `config`.
    pub async fn clear_checkpoints(
        &self,
        config: &RunnableConfig,
    ) -> Result<bool, crate::memory::CheckpointError> {
        match (&self.checkpointer, &config.thread_id) {
            (Some(cp), Some(_)) => cp.clear(config).await,
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio_stream::StreamExt;

    use crate::graph::{CompilationError, Next, Node, StateGraph, END, START};
    use crate::memory::{MemorySaver, RunnableConfig};
    use crate::stream::{StreamEvent, StreamMode};

    /// **Scenario**: When edge_order is empty, invoke returns ExecutionFailed("empty graph").
    #[tokio::test]
    async fn invoke_empty_graph_returns_execution_failed() {
        let graph = CompiledStateGraph::<i32> {
            nodes: HashMap::new(),
            first_node_id: String::new(),
            edge_order: vec![],
            next_map: HashMap::new(),
            checkpointer: None,
            store: None,
            middleware: None,
            state_updater: Arc::new(crate::channels::ReplaceUpdater),
            retry_policy: RetryPolicy::None,
            interrupt_handler: None,
            interrupt_before: HashSet::new(),
            interrupt_after: HashSet::new(),
        };
        let result = graph.invoke(0, None).await;
        match &result {
            Err(AgentError::ExecutionFailed(msg)) => {
                assert!(msg.contains("empty graph"), "{}", msg)
            }
            _ => panic!("expected ExecutionFailed(\"empty graph\"), got {:?}", result),
        }
    }

    #[derive(Clone)]
    struct AddNode {
        id: &'static str,
        delta: i32,
    }

    #[async_trait]
    impl Node<i32> for AddNode {
        fn id(&self) -> &str {
            self.id
        }

        async fn run(&self, state: i32) -> Result<(i32, Next), AgentError> {
            Ok((state + self.delta, Next::Continue))
        }
    }

    fn build_linear_graph() -> CompiledStateGraph<i32> {
        let mut graph = StateGraph::<i32>::new();
        graph.add_node("a", Arc::new(AddNode { id: "a", delta: 1 }));
        graph.add_node("b", Arc::new(AddNode { id: "b", delta: 10 }));
        graph.add_edge(START, "a");
        graph.add_edge("a", "b");
        graph.add_edge("b", END);
        graph.compile().expect("graph compiles")
    }

    /// **Scenario**: A simple linear graph runs both nodes in edge order and sums deltas.
    #[tokio::test]
    async fn invoke_linear_graph_runs_in_order() {
        let graph = build_linear_graph();
        let result = graph.invoke(0, None).await.unwrap();
        assert_eq!(result, 11);
    }

    #[derive(Clone)]
    struct SelfLoopNode;

    #[async_trait]
    impl Node<i32> for SelfLoopNode {
        fn id(&self) -> &str {
            "loop"
        }

        async fn run(&self, state: i32) -> Result<(i32, Next), AgentError> {
            Ok((state + 1, Next::Node("loop".to_string())))
        }
    }

    fn build_cyclic_graph() -> CompiledStateGraph<i32> {
        let mut graph = StateGraph::<i32>::new();
        graph.add_node("loop", Arc::new(SelfLoopNode));
        graph.add_edge(START, "loop");
        graph.compile().expect("graph compiles")
    }

    /// **Scenario**: A node that always routes back to itself never reaches END;
    /// the run aborts with `RecursionLimit` once the configured step ceiling is hit.
    #[tokio::test]
    async fn invoke_cyclic_graph_aborts_at_recursion_limit() {
        let graph = build_cyclic_graph();
        let config = RunnableConfig {
            recursion_limit: Some(5),
            ..Default::default()
        };
        let result = graph.invoke(0, Some(config)).await;
        match result {
            Err(AgentError::RecursionLimit(limit)) => assert_eq!(limit, 5),
            other => panic!("expected RecursionLimit(5), got {:?}", other),
        }
    }

    /// **Scenario**: With no `recursion_limit` configured, `DEFAULT_RECURSION_LIMIT` applies.
    #[tokio::test]
    async fn invoke_cyclic_graph_uses_default_recursion_limit() {
        let graph = build_cyclic_graph();
        let result = graph.invoke(0, None).await;
        match result {
            Err(AgentError::RecursionLimit(limit)) => {
                assert_eq!(limit, crate::memory::DEFAULT_RECURSION_LIMIT)
            }
            other => panic!("expected RecursionLimit, got {:?}", other),
        }
    }

    /// **Scenario**: Conditional edges route dynamically based on state.
    #[tokio::test]
    async fn invoke_conditional_edge_routes_based_on_state() {
        let mut graph = StateGraph::<i32>::new();
        graph.add_node("start", Arc::new(AddNode { id: "start", delta: 0 }));
        graph.add_node("small", Arc::new(AddNode { id: "small", delta: 1 }));
        graph.add_node("large", Arc::new(AddNode { id: "large", delta: 100 }));
        graph.add_edge(START, "start");
        graph.add_edge("small", END);
        graph.add_edge("large", END);
        graph.add_conditional_edges(
            "start",
            Arc::new(|s: &i32| if *s < 5 { "small".into() } else { "large".into() }),
            None,
        );
        let compiled = graph.compile().expect("graph compiles");

        assert_eq!(compiled.invoke(1, None).await.unwrap(), 2);
        assert_eq!(compiled.invoke(10, None).await.unwrap(), 110);
    }

    /// **Scenario**: Checkpointer persists final state when thread_id is set, retrievable via get_tuple.
    #[tokio::test]
    async fn invoke_with_checkpointer_saves_final_state() {
        let mut graph = StateGraph::<i32>::new();
        graph.add_node("a", Arc::new(AddNode { id: "a", delta: 5 }));
        graph.add_edge(START, "a");
        graph.add_edge("a", END);
        let saver = Arc::new(MemorySaver::new());
        let compiled = graph
            .compile_with_checkpointer(saver.clone())
            .expect("graph compiles");

        let config = RunnableConfig {
            thread_id: Some("t1".into()),
            ..Default::default()
        };
        let result = compiled.invoke(0, Some(config.clone())).await.unwrap();
        assert_eq!(result, 5);

        let tuple = saver.get_tuple(&config).await.unwrap().expect("checkpoint saved");
        assert_eq!(tuple.0.channel_values, 5);
    }

    /// **Scenario**: clear_checkpoints removes all checkpoints for a thread.
    #[tokio::test]
    async fn clear_checkpoints_removes_saved_state() {
        let mut graph = StateGraph::<i32>::new();
        graph.add_node("a", Arc::new(AddNode { id: "a", delta: 1 }));
        graph.add_edge(START, "a");
        graph.add_edge("a", END);
        let saver = Arc::new(MemorySaver::new());
        let compiled = graph
            .compile_with_checkpointer(saver.clone())
            .expect("graph compiles");

        let config = RunnableConfig {
            thread_id: Some("t1".into()),
            ..Default::default()
        };
        compiled.invoke(0, Some(config.clone())).await.unwrap();
        assert!(saver.get_tuple(&config).await.unwrap().is_some());

        let cleared = compiled.clear_checkpoints(&config).await.unwrap();
        assert!(cleared);
        assert!(saver.get_tuple(&config).await.unwrap().is_none());
    }

    /// **Scenario**: stream() emits Values events for each node and completes.
    #[tokio::test]
    async fn stream_emits_values_for_each_node() {
        let graph = build_linear_graph();
        let mut rx = graph.stream(0, None, HashSet::from([StreamMode::Values]));
        let mut values = vec![];
        while let Some(event) = rx.next().await {
            if let StreamEvent::Values(v) = event {
                values.push(v);
            }
        }
        assert_eq!(values, vec![1, 11]);
    }

    /// **Scenario**: A node that returns Next::End stops the run immediately, skipping
    /// any further edges, and still checkpoints.
    #[derive(Clone)]
    struct EndAfterNode {
        id: &'static str,
        delta: i32,
    }

    #[async_trait]
    impl Node<i32> for EndAfterNode {
        fn id(&self) -> &str {
            self.id
        }
        async fn run(&self, state: i32) -> Result<(i32, Next), AgentError> {
            Ok((state + self.delta, Next::End))
        }
    }

    #[tokio::test]
    async fn invoke_next_end_stops_before_remaining_edges() {
        let mut graph = StateGraph::<i32>::new();
        graph.add_node("a", Arc::new(EndAfterNode { id: "a", delta: 1 }));
        graph.add_node("b", Arc::new(AddNode { id: "b", delta: 100 }));
        graph.add_edge(START, "a");
        graph.add_edge("a", "b");
        graph.add_edge("b", END);
        let compiled = graph.compile().expect("graph compiles");
        let result = compiled.invoke(0, None).await.unwrap();
        assert_eq!(result, 1, "Next::End must bypass edge 'a'->'b'");
    }

    /// **Scenario**: resume_from_node_id starts execution at that node instead of first_node_id.
    #[tokio::test]
    async fn invoke_resumes_from_configured_node() {
        let graph = build_linear_graph();
        let config = RunnableConfig {
            resume_from_node_id: Some("b".into()),
            ..Default::default()
        };
        let result = graph.invoke(5, Some(config)).await.unwrap();
        assert_eq!(result, 15, "should skip node 'a' and only run 'b'");
    }

    /// **Scenario**: a node declared via `with_interrupt_before` suspends the run
    /// before it executes; the interrupt's payload names the node itself as the
    /// resume point, and resuming with that `resume_from_node_id` completes the run.
    #[tokio::test]
    async fn interrupt_before_suspends_then_resumes_into_same_node() {
        let mut graph = StateGraph::<i32>::new();
        graph.add_node("a", Arc::new(AddNode { id: "a", delta: 1 }));
        graph.add_node("b", Arc::new(AddNode { id: "b", delta: 10 }));
        graph.add_edge(START, "a");
        graph.add_edge("a", "b");
        graph.add_edge("b", END);
        let compiled = graph
            .with_interrupt_before(["b"])
            .compile()
            .expect("graph compiles");

        let err = compiled.invoke(0, None).await.unwrap_err();
        let resume_at = match err {
            AgentError::Interrupted(GraphInterrupt(interrupt)) => {
                assert_eq!(interrupt.id.as_deref(), Some("b"));
                interrupt.value["resume_at"].as_str().unwrap().to_string()
            }
            other => panic!("expected Interrupted, got {other:?}"),
        };
        assert_eq!(resume_at, "b");

        let resumed = compiled
            .invoke(
                1,
                Some(RunnableConfig {
                    resume_from_node_id: Some(resume_at),
                    ..Default::default()
                }),
            )
            .await
            .unwrap();
        assert_eq!(resumed, 11, "resumed run must still execute node 'b'");
    }

    /// **Scenario**: a node declared via `with_interrupt_after` suspends once its
    /// edge is resolved; the interrupt names the *next* node as the resume point,
    /// so resuming skips re-running the interrupted node.
    #[tokio::test]
    async fn interrupt_after_suspends_then_resumes_at_next_node() {
        let mut graph = StateGraph::<i32>::new();
        graph.add_node("a", Arc::new(AddNode { id: "a", delta: 1 }));
        graph.add_node("b", Arc::new(AddNode { id: "b", delta: 10 }));
        graph.add_edge(START, "a");
        graph.add_edge("a", "b");
        graph.add_edge("b", END);
        let compiled = graph
            .with_interrupt_after(["a"])
            .compile()
            .expect("graph compiles");

        let err = compiled.invoke(0, None).await.unwrap_err();
        let resume_at = match err {
            AgentError::Interrupted(GraphInterrupt(interrupt)) => {
                interrupt.value["resume_at"].as_str().unwrap().to_string()
            }
            other => panic!("expected Interrupted, got {other:?}"),
        };
        assert_eq!(resume_at, "b", "resume point must be the already-resolved edge target");

        let resumed = compiled
            .invoke(
                1,
                Some(RunnableConfig {
                    resume_from_node_id: Some(resume_at),
                    ..Default::default()
                }),
            )
            .await
            .unwrap();
        assert_eq!(resumed, 11, "node 'a' must not re-run on resume");
    }

    /// **Scenario**: a node registered in both `interrupt_before` and
    /// `interrupt_after` suspends before running on the first pass; resuming into
    /// that same node skips the before-check (resume re-entry), runs the node, then
    /// the after-check fires with the freshly recomputed next node.
    #[tokio::test]
    async fn interrupt_before_and_after_on_same_node_fire_in_sequence() {
        let mut graph = StateGraph::<i32>::new();
        graph.add_node("a", Arc::new(AddNode { id: "a", delta: 1 }));
        graph.add_node("b", Arc::new(AddNode { id: "b", delta: 10 }));
        graph.add_edge(START, "a");
        graph.add_edge("a", "b");
        graph.add_edge("b", END);
        let compiled = graph
            .with_interrupt_before(["a"])
            .with_interrupt_after(["a"])
            .compile()
            .expect("graph compiles");

        let first = compiled.invoke(0, None).await.unwrap_err();
        let resume_at = match first {
            AgentError::Interrupted(GraphInterrupt(interrupt)) => {
                assert_eq!(interrupt.id.as_deref(), Some("a"));
                interrupt.value["resume_at"].as_str().unwrap().to_string()
            }
            other => panic!("expected Interrupted (before), got {other:?}"),
        };
        assert_eq!(resume_at, "a", "before-interrupt resumes into the node itself");

        let second_err = compiled
            .invoke(
                1,
                Some(RunnableConfig {
                    resume_from_node_id: Some(resume_at),
                    ..Default::default()
                }),
            )
            .await
            .unwrap_err();
        let resume_at_2 = match second_err {
            AgentError::Interrupted(GraphInterrupt(interrupt)) => {
                interrupt.value["resume_at"].as_str().unwrap().to_string()
            }
            other => panic!("expected Interrupted (after), got {other:?}"),
        };
        assert_eq!(resume_at_2, "b", "after-interrupt resumes at the recomputed next node");

        let resumed = compiled
            .invoke(
                2,
                Some(RunnableConfig {
                    resume_from_node_id: Some(resume_at_2),
                    ..Default::default()
                }),
            )
            .await
            .unwrap();
        assert_eq!(resumed, 12, "final resume only runs 'b'");
    }

    /// **Scenario**: an interrupt name that doesn't resolve to any node after
    /// compilation is rejected at compile time, not discovered at run time.
    #[test]
    fn compile_rejects_unknown_interrupt_target() {
        let mut graph = StateGraph::<i32>::new();
        graph.add_node("a", Arc::new(AddNode { id: "a", delta: 1 }));
        graph.add_edge(START, "a");
        graph.add_edge("a", END);
        let result = graph.with_interrupt_before(["nope"]).compile();
        assert!(matches!(
            result,
            Err(CompilationError::InterruptTargetMissing(name)) if name == "nope"
        ));
    }

    /// **Scenario**: `update_state` loads the latest checkpoint, merges the given
    /// delta via the graph's state updater, and replaces that same checkpoint in
    /// place — history length is unchanged and a later `get_tuple` for the same
    /// checkpoint id returns the overridden value.
    #[tokio::test]
    async fn update_state_replaces_checkpoint_in_place() {
        let saver = Arc::new(MemorySaver::new());
        let mut g = StateGraph::<i32>::new();
        g.add_node("a", Arc::new(AddNode { id: "a", delta: 1 }));
        g.add_node("b", Arc::new(AddNode { id: "b", delta: 10 }));
        g.add_edge(START, "a");
        g.add_edge("a", "b");
        g.add_edge("b", END);
        let compiled = g
            .compile_with_checkpointer(saver.clone())
            .expect("graph compiles");

        let config = RunnableConfig {
            thread_id: Some("t1".into()),
            ..Default::default()
        };
        compiled.invoke(0, Some(config.clone())).await.unwrap();

        let before = saver.list(&config, None, None, None).await.unwrap();
        assert_eq!(before.len(), 1);

        let updated_config = compiled
            .update_state(&config, &999, None)
            .await
            .expect("update_state succeeds");

        let after = saver.list(&config, None, None, None).await.unwrap();
        assert_eq!(after.len(), 1, "history length must be unchanged");

        let (loaded, _meta) = saver
            .get_tuple(&updated_config)
            .await
            .unwrap()
            .expect("checkpoint still present");
        assert_eq!(loaded.channel_values, 999);
    }
}
