//! State graph: nodes + explicit edges (from → to) and optional conditional edges.
//!
//! Add nodes with `add_node`, define the chain with `add_edge(from, to)` using
//! `START` and `END` for graph entry/exit. Use `add_conditional_edges` to route
//! to the next node based on state. Then `compile`
//! or `compile_with_checkpointer` to get a `CompiledStateGraph`.
//!
//! # Conditional edges
//!
//! From a source node, a routing function `(state) -> key` is called; the key is
//! used as the next node id, or looked up in an optional path map. A node must have
//! either one outgoing `add_edge` or `add_conditional_edges`, not both.
//!
//! # State Updates
//!
//! By default, nodes return a new state that completely replaces the previous state.
//! To customize this behavior (e.g., append to lists, aggregate values), use
//! `with_state_updater` to provide a custom `StateUpdater` implementation.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::Arc;

use crate::channels::{BoxedStateUpdater, ReplaceUpdater};
use crate::graph::compile_error::CompilationError;
use crate::graph::compiled::CompiledStateGraph;
use crate::graph::conditional::{ConditionalRouter, ConditionalRouterFn, NextEntry};
use crate::graph::interrupt::InterruptHandler;
use crate::graph::node::Node;
use crate::graph::node_middleware::NodeMiddleware;
use crate::graph::parallel_node::ParallelNode;
use crate::graph::retry::RetryPolicy;
use crate::memory::{Checkpointer, Store};

/// Sentinel for graph entry: use as `from_id` in `add_edge(START, first_node_id)`.
pub const START: &str = "__start__";

/// Sentinel for graph exit: use as `to_id` in `add_edge(last_node_id, END)`.
pub const END: &str = "__end__";

/// State graph: nodes plus explicit edges and optional conditional edges.
///
/// Generic over state type `S`. Build with `add_node` / `add_edge(from, to)` (use
/// `START` and `END` for entry/exit), and optionally `add_conditional_edges` for
/// state-based routing. Then `compile()` or `compile_with_middleware()` to obtain
/// an executable graph.
///
/// **Interaction**: Accepts `Arc<dyn Node<S>>`; produces `CompiledStateGraph<S>`.
/// Middleware can be set via `with_middleware` for fluent API or passed to `compile_with_middleware`.
/// External crates can extend the chain via extension traits (methods that take `self` and return `Self`).
///
/// **State Updates**: By default, node outputs replace the entire state. Use `with_state_updater`
/// to customize how updates are merged (e.g., append to lists, aggregate values).
pub struct StateGraph<S> {
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    /// Edges (from_id, to_id). A node may have one outgoing edge or conditional_edges, not both.
    edges: Vec<(String, String)>,
    /// Conditional edges: source node id -> (router, path_map). Next node is resolved from state at runtime.
    conditional_edges: HashMap<String, ConditionalRouter<S>>,
    /// Optional long-term store; when set, compiled graph holds it for nodes (e.g. via config or node construction).
    store: Option<Arc<dyn Store>>,
    /// Optional node middleware; when set, `compile()` uses it (fluent API). See `with_middleware`.
    middleware: Option<Arc<dyn NodeMiddleware<S>>>,
    /// Optional state updater; when set, controls how node outputs are merged into state.
    /// Default is `ReplaceUpdater` which fully replaces the state.
    state_updater: Option<BoxedStateUpdater<S>>,
    /// Retry policy for node execution. Default is `RetryPolicy::None`.
    retry_policy: RetryPolicy,
    /// Optional interrupt handler for human-in-the-loop scenarios.
    interrupt_handler: Option<Arc<dyn InterruptHandler>>,
    /// Node ids that must raise an interrupt before they run. Checked at compile
    /// time (`CompilationError::InterruptTargetMissing`) and enforced by the
    /// compiled graph's run loop.
    interrupt_before: HashSet<String>,
    /// Node ids that must raise an interrupt after they run (edge already resolved,
    /// not yet crossed). Same compile-time validation as `interrupt_before`.
    interrupt_after: HashSet<String>,
}

impl<S> Default for StateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> StateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: Vec::new(),
            conditional_edges: HashMap::new(),
            store: None,
            middleware: None,
            state_updater: None,
            retry_policy: RetryPolicy::None,
            interrupt_handler: None,
            interrupt_before: HashSet::new(),
            interrupt_after: HashSet::new(),
        }
    }

    /// Attaches a long-term store to the graph. When compiled, the graph holds `Option<Arc<dyn Store>>`;
    /// nodes can use it for cross-thread memory (e.g. namespace from `RunnableConfig::user_id`).
    pub fn with_store(self, store: Arc<dyn Store>) -> Self {
        Self {
            store: Some(store),
            ..self
        }
    }

    /// Attaches node middleware for fluent API. When set, `compile()` will use it.
    /// Chain with `compile()`: `graph.with_middleware(m).compile()?`.
    pub fn with_middleware(self, middleware: Arc<dyn NodeMiddleware<S>>) -> Self {
        Self {
            middleware: Some(middleware),
            ..self
        }
    }

    /// Attaches a custom state updater to the graph.
    ///
    /// The state updater controls how node outputs are merged into the current state.
    /// By default (`ReplaceUpdater`), the node's output completely replaces the state.
    ///
    /// Use `FieldBasedUpdater` for custom per-field update logic (e.g., append to lists).
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use loom::graph::StateGraph;
    /// use loom::channels::FieldBasedUpdater;
    /// use std::sync::Arc;
    ///
    /// #[derive(Clone, Debug)]
    /// struct MyState { messages: Vec<String>, count: i32 }
    ///
    /// let updater = FieldBasedUpdater::new(|current: &mut MyState, update: &MyState| {
    ///     current.messages.extend(update.messages.iter().cloned());
    ///     current.count = update.count;
    /// });
    ///
    /// let graph = StateGraph::<MyState>::new()
    ///     .with_state_updater(Arc::new(updater));
    /// ```
    pub fn with_state_updater(self, updater: BoxedStateUpdater<S>) -> Self {
        Self {
            state_updater: Some(updater),
            ..self
        }
    }

    /// Attaches a retry policy for node execution.
    ///
    /// When a node execution fails, the retry policy determines if and how
    /// the execution should be retried. Default is `RetryPolicy::None` (no retries).
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use loom::graph::{StateGraph, RetryPolicy};
    /// use std::time::Duration;
    ///
    /// let graph = StateGraph::<String>::new()
    ///     .with_retry_policy(RetryPolicy::exponential(
    ///         3,
    ///         Duration::from_millis(100),
    ///         Duration::from_secs(5),
    ///         2.0,
    ///     ));
    /// ```
    pub fn with_retry_policy(self, retry_policy: RetryPolicy) -> Self {
        Self {
            retry_policy,
            ..self
        }
    }

    /// Attaches an interrupt handler for human-in-the-loop scenarios.
    ///
    /// The interrupt handler is called when a node raises an interrupt.
    /// This is useful for scenarios where execution needs to pause for
    /// user input or approval.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use loom::graph::{StateGraph, DefaultInterruptHandler};
    /// use std::sync::Arc;
    ///
    /// let graph = StateGraph::<String>::new()
    ///     .with_interrupt_handler(Arc::new(DefaultInterruptHandler));
    /// ```
    pub fn with_interrupt_handler(self, handler: Arc<dyn InterruptHandler>) -> Self {
        Self {
            interrupt_handler: Some(handler),
            ..self
        }
    }

    /// Declares node ids that must interrupt execution before they run.
    ///
    /// Each name is validated at `compile()` time against the node map after
    /// sub-graph flattening and parallel fan-out synthesis — an unknown name
    /// fails compilation with `CompilationError::InterruptTargetMissing`, never
    /// silently ignored at runtime.
    pub fn with_interrupt_before(
        self,
        names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            interrupt_before: names.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    /// Declares node ids that must interrupt execution after they run (their
    /// outgoing edge already resolved, not yet crossed). Same validation as
    /// `with_interrupt_before`.
    pub fn with_interrupt_after(self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            interrupt_after: names.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    /// Adds a node; id must be unique. Replaces if same id.
    ///
    /// Returns `&mut Self` for method chaining. The node is stored as
    /// `Arc<dyn Node<S>>`; use `add_edge` to include it in the chain.
    pub fn add_node(&mut self, id: impl Into<String>, node: Arc<dyn Node<S>>) -> &mut Self {
        self.nodes.insert(id.into(), node);
        self
    }

    /// Adds an edge from `from_id` to `to_id`.
    ///
    /// Use `START` for graph entry and `END` for graph exit. Both ids (except
    /// START/END) must be registered via `add_node` before `compile()`.
    /// A node may have either one outgoing edge or `add_conditional_edges`, not both.
    /// With conditional edges, the graph may branch; otherwise edges form a single linear chain.
    pub fn add_edge(&mut self, from_id: impl Into<String>, to_id: impl Into<String>) -> &mut Self {
        self.edges.push((from_id.into(), to_id.into()));
        self
    }

    /// Flattens `inner` into this graph at `outer_node_id`, instead of nesting it behind
    /// a `Node` impl that delegates to `inner.invoke`.
    ///
    /// Every node id from `inner` is copied in with the prefix `"{outer_node_id}."`
    /// (so an inner node `"x"` becomes `"{outer_node_id}.x"` in this graph). Inner edges
    /// that don't touch `inner`'s own START/END are copied verbatim (with both endpoints
    /// prefixed); inner conditional edges are copied the same way, and any `path_map`
    /// target of exactly `END` is left pointing at this graph's own `END` (an embedded
    /// subgraph's `path_map` can end the whole run, not just itself). A `path_map`-less
    /// router (`path_map: None`) is copied as-is: its closure is responsible for
    /// returning ids already prefixed with `"{outer_node_id}."`, since there is no static
    /// map to rewrite.
    ///
    /// Returns `(entry_id, exit_id)`: the prefixed id of `inner`'s single START target and
    /// the prefixed id of `inner`'s single node with an edge to END. Wire these into the
    /// surrounding graph with ordinary `add_edge` calls, e.g.
    /// `outer.add_edge("chat", entry_id); outer.add_edge(exit_id, "respond");`.
    ///
    /// # Panics
    ///
    /// Panics if `inner` does not have exactly one edge from START or exactly one edge
    /// to END — both are required of any graph that reaches `compile()` successfully, so
    /// build and validate `inner` (or `inner.clone().compile()`, discarding the result)
    /// before flattening it.
    pub fn add_subgraph(
        &mut self,
        outer_node_id: impl Into<String>,
        inner: StateGraph<S>,
    ) -> (String, String) {
        let prefix = outer_node_id.into();

        for (id, node) in inner.nodes {
            self.nodes.insert(format!("{prefix}.{id}"), node);
        }

        let mut entry = None;
        let mut exit = None;
        for (from, to) in inner.edges {
            if from == START {
                entry = Some(format!("{prefix}.{to}"));
                continue;
            }
            if to == END {
                exit = Some(format!("{prefix}.{from}"));
                continue;
            }
            self.edges
                .push((format!("{prefix}.{from}"), format!("{prefix}.{to}")));
        }

        for (source, router) in inner.conditional_edges {
            let new_source = format!("{prefix}.{source}");
            let new_path_map = router.path_map.map(|map| {
                map.into_iter()
                    .map(|(key, target)| {
                        let target = if target == END {
                            END.to_string()
                        } else {
                            format!("{prefix}.{target}")
                        };
                        (key, target)
                    })
                    .collect()
            });
            self.conditional_edges.insert(
                new_source,
                ConditionalRouter::new(router.path, new_path_map),
            );
        }

        let entry = entry.expect("subgraph must have exactly one edge from START");
        let exit = exit.expect("subgraph must have exactly one edge to END");

        for name in inner.interrupt_before {
            self.interrupt_before.insert(format!("{prefix}.{name}"));
        }
        for name in inner.interrupt_after {
            self.interrupt_after.insert(format!("{prefix}.{name}"));
        }

        // An outer interruption name that pointed at the sub-graph node id itself
        // (set before flattening, naming `outer_node_id`) is rewritten to point at
        // the sub-graph's first real node instead — the sub-graph id never becomes
        // an actual node in the flattened graph.
        if self.interrupt_before.remove(&prefix) {
            self.interrupt_before.insert(entry.clone());
        }
        if self.interrupt_after.remove(&prefix) {
            self.interrupt_after.insert(exit.clone());
        }

        (entry, exit)
    }

    /// Adds conditional edges from `source` node: next node is determined by `path(state)`.
    ///
    /// Adds conditional edges: `add_conditional_edges(source, path, path_map)`.
    /// After the source node runs, `path` is called with the updated state; its return value
    /// is used as the next node id, or looked up in `path_map` when provided.
    ///
    /// - When `path_map` is `None`, the return value of `path` is the next node id (or END).
    /// - When `path_map` is `Some(map)`, the return value is the key; next node is
    ///   `map[key]` if present, otherwise the key itself.
    ///
    /// The source node must not have an outgoing `add_edge`; it must have either
    /// one edge or conditional edges. All path_map values (and direct keys when no map)
    /// must be valid node ids or `END`.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use loom::graph::{StateGraph, END};
    /// use std::collections::HashMap;
    /// use std::sync::Arc;
    ///
    /// let mut graph = StateGraph::<MyState>::new();
    /// graph.add_node("think", think_node);
    /// graph.add_node("act", act_node);
    /// graph.add_edge(START, "think");
    /// graph.add_edge("act", END);
    /// graph.add_conditional_edges(
    ///     "think",
    ///     Arc::new(|s| if s.has_tool_calls() { "tools".into() } else { END.into() }),
    ///     Some([("tools".into(), "act".into()), (END.into(), END.into())].into_iter().collect()),
    /// );
    /// ```
    pub fn add_conditional_edges(
        &mut self,
        source: impl Into<String>,
        path: ConditionalRouterFn<S>,
        path_map: Option<HashMap<String, String>>,
    ) -> &mut Self {
        self.conditional_edges
            .insert(source.into(), ConditionalRouter::new(path, path_map));
        self
    }

    /// Builds the executable graph: validates that all edge node ids exist and
    /// edges form a single linear chain from START to END.
    /// If middleware was set via `with_middleware`, it is used; otherwise no middleware.
    ///
    /// Returns `CompilationError` if any edge references an unknown node or
    /// the chain is invalid. On success, the graph is immutable and ready for `invoke`.
    pub fn compile(self) -> Result<CompiledStateGraph<S>, CompilationError> {
        let middleware = self.middleware.clone();
        self.compile_internal(None, middleware)
    }

    /// Builds the executable graph with a checkpointer for persistence (thread_id in config).
    ///
    /// Compiles with optional checkpointer. When `invoke(state, config)`
    /// is called with `config.thread_id`, the final state is saved after the run.
    pub fn compile_with_checkpointer(
        self,
        checkpointer: Arc<dyn Checkpointer<S>>,
    ) -> Result<CompiledStateGraph<S>, CompilationError> {
        self.compile_internal(Some(checkpointer), None)
    }

    /// Builds the executable graph with node middleware. The middleware wraps each node.run in invoke.
    pub fn compile_with_middleware(
        self,
        middleware: Arc<dyn NodeMiddleware<S>>,
    ) -> Result<CompiledStateGraph<S>, CompilationError> {
        self.compile_internal(None, Some(middleware))
    }

    /// Builds the executable graph with both checkpointer and node middleware.
    pub fn compile_with_checkpointer_and_middleware(
        self,
        checkpointer: Arc<dyn Checkpointer<S>>,
        middleware: Arc<dyn NodeMiddleware<S>>,
    ) -> Result<CompiledStateGraph<S>, CompilationError> {
        self.compile_internal(Some(checkpointer), Some(middleware))
    }

    /// Collapses every source with more than one unconditional outgoing edge into a
    /// single synthetic `ParallelNode`, provided all of that source's branches converge
    /// on one common downstream node (or END). Mutates `self.edges` and `self.nodes` in
    /// place so the rest of `compile_internal` sees an ordinary single-target edge from
    /// `source` and never has to know parallel branches existed.
    fn synthesize_parallel_fanouts(&mut self) -> Result<(), CompilationError>
    where
        S: Clone + Send + Sync + Debug + 'static,
    {
        let mut targets_by_source: HashMap<String, Vec<String>> = HashMap::new();
        for (from, to) in &self.edges {
            if from != START {
                targets_by_source
                    .entry(from.clone())
                    .or_default()
                    .push(to.clone());
            }
        }

        let fan_out_sources: Vec<String> = targets_by_source
            .into_iter()
            .filter(|(_, targets)| targets.len() > 1)
            .map(|(source, _)| source)
            .collect();

        for source in fan_out_sources {
            if self.conditional_edges.contains_key(&source) {
                return Err(CompilationError::NodeHasBothEdgeAndConditional(source));
            }

            let targets: Vec<String> = self
                .edges
                .iter()
                .filter(|(from, _)| from == &source)
                .map(|(_, to)| to.clone())
                .collect();

            let mut downstream: Option<String> = None;
            for target in &targets {
                if target == END {
                    return Err(CompilationError::IllegalParallelBranching(format!(
                        "branch '{source}' -> END cannot be a parallel branch; branches must converge on a common downstream node"
                    )));
                }
                if self.conditional_edges.contains_key(target) {
                    return Err(CompilationError::IllegalParallelBranching(format!(
                        "parallel branch '{target}' cannot itself have conditional edges"
                    )));
                }
                let outgoing: Vec<&String> = self
                    .edges
                    .iter()
                    .filter(|(from, _)| from == target)
                    .map(|(_, to)| to)
                    .collect();
                if outgoing.len() != 1 {
                    return Err(CompilationError::IllegalParallelBranching(format!(
                        "parallel branch '{target}' must have exactly one outgoing edge to converge on"
                    )));
                }
                let out = outgoing[0].clone();
                match &downstream {
                    None => downstream = Some(out),
                    Some(d) if *d == out => {}
                    Some(_) => {
                        return Err(CompilationError::IllegalParallelBranching(format!(
                            "parallel branches from '{source}' do not converge on a common downstream node"
                        )));
                    }
                }
            }
            let downstream = downstream.expect("fan-out source has at least one target");

            let children: Vec<Arc<dyn Node<S>>> = targets
                .iter()
                .map(|t| {
                    self.nodes
                        .get(t)
                        .cloned()
                        .ok_or_else(|| CompilationError::NodeNotFound(t.clone()))
                })
                .collect::<Result<_, _>>()?;

            let parallel_id = format!("__parallel__{source}");
            let state_updater = self
                .state_updater
                .clone()
                .unwrap_or_else(|| Arc::new(ReplaceUpdater) as BoxedStateUpdater<S>);
            let parallel_node: Arc<dyn Node<S>> = Arc::new(ParallelNode::new(
                parallel_id.clone(),
                children,
                state_updater,
            ));
            self.nodes.insert(parallel_id.clone(), parallel_node);

            self.edges.retain(|(from, to)| {
                !((from == &source && targets.contains(to))
                    || (targets.contains(from) && to == &downstream))
            });
            self.edges.push((source, parallel_id.clone()));
            self.edges.push((parallel_id, downstream));
        }

        Ok(())
    }

    fn compile_internal(
        mut self,
        checkpointer: Option<Arc<dyn Checkpointer<S>>>,
        middleware: Option<Arc<dyn NodeMiddleware<S>>>,
    ) -> Result<CompiledStateGraph<S>, CompilationError> {
        for (from, to) in &self.edges {
            if from != START && !self.nodes.contains_key(from) {
                return Err(CompilationError::NodeNotFound(from.clone()));
            }
            if to != END && !self.nodes.contains_key(to) {
                return Err(CompilationError::NodeNotFound(to.clone()));
            }
        }
        for (source, router) in &self.conditional_edges {
            if !self.nodes.contains_key(source) {
                return Err(CompilationError::NodeNotFound(source.clone()));
            }
            if let Some(ref path_map) = router.path_map {
                for (_, target) in path_map {
                    if target != END && !self.nodes.contains_key(target) {
                        return Err(CompilationError::InvalidConditionalPathMap(target.clone()));
                    }
                }
            }
        }

        self.synthesize_parallel_fanouts()?;

        for name in self.interrupt_before.iter().chain(self.interrupt_after.iter()) {
            if !self.nodes.contains_key(name) {
                return Err(CompilationError::InterruptTargetMissing(name.clone()));
            }
        }

        let start_edges: Vec<_> = self
            .edges
            .iter()
            .filter(|(f, _)| f == START)
            .map(|(_, t)| t.clone())
            .collect();
        let first = match start_edges.len() {
            0 => return Err(CompilationError::MissingStart),
            1 => start_edges.into_iter().next().unwrap(),
            _ => {
                return Err(CompilationError::InvalidChain(
                    "multiple edges from START (branch)".into(),
                ))
            }
        };

        let has_end = self.edges.iter().any(|(_, t)| t == END)
            || self.conditional_edges.values().any(|r| {
                r.path_map
                    .as_ref()
                    .map_or(true, |m| m.values().any(|v| v == END))
            });
        if !has_end {
            return Err(CompilationError::MissingEnd);
        }

        let edge_froms: HashSet<_> = self
            .edges
            .iter()
            .filter(|(f, _)| f.as_str() != START)
            .map(|(f, _)| f.clone())
            .collect();
        if edge_froms.len()
            != self
                .edges
                .iter()
                .filter(|(f, _)| f.as_str() != START)
                .count()
        {
            return Err(CompilationError::InvalidChain(
                "duplicate from (branch)".into(),
            ));
        }
        for source in self.conditional_edges.keys() {
            if edge_froms.contains(source) {
                return Err(CompilationError::NodeHasBothEdgeAndConditional(
                    source.clone(),
                ));
            }
        }

        let mut next_map: HashMap<String, NextEntry<S>> = self
            .edges
            .iter()
            .filter(|(f, _)| f.as_str() != START)
            .map(|(f, t)| (f.clone(), NextEntry::Unconditional(t.clone())))
            .collect();
        for (source, router) in &self.conditional_edges {
            next_map.insert(source.clone(), NextEntry::Conditional(router.clone()));
        }

        let mut edge_order = vec![first.clone()];
        if self.conditional_edges.is_empty() {
            let linear_next: HashMap<String, String> = self
                .edges
                .iter()
                .filter(|(f, _)| f.as_str() != START)
                .map(|(f, t)| (f.clone(), t.clone()))
                .collect();
            let mut current = first.clone();
            let mut visited = HashSet::new();
            visited.insert(current.clone());
            loop {
                let next = match linear_next.get(&current) {
                    Some(n) => n.clone(),
                    None => break,
                };
                if next == END {
                    break;
                }
                if visited.contains(&next) {
                    return Err(CompilationError::InvalidChain("cycle detected".into()));
                }
                visited.insert(next.clone());
                edge_order.push(next.clone());
                current = next;
            }
        }

        let state_updater = self
            .state_updater
            .unwrap_or_else(|| Arc::new(ReplaceUpdater));

        Ok(CompiledStateGraph {
            nodes: self.nodes,
            first_node_id: first,
            edge_order,
            next_map,
            checkpointer,
            store: self.store,
            middleware,
            state_updater,
            retry_policy: self.retry_policy,
            interrupt_handler: self.interrupt_handler,
            interrupt_before: self.interrupt_before,
            interrupt_after: self.interrupt_after,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::graph::Node;

    #[derive(Clone, Debug)]
    #[allow(dead_code)]
    struct DummyState(i32);

    #[derive(Clone)]
    struct DummyNode(&'static str);

    #[async_trait]
    impl Node<DummyState> for DummyNode {
        fn id(&self) -> &str {
            self.0
        }
        async fn run(
            &self,
            state: DummyState,
        ) -> Result<(DummyState, crate::graph::Next), crate::error::AgentError> {
            Ok((state, crate::graph::Next::Continue))
        }
    }

    /// **Scenario**: Compile fails when a node has both an outgoing edge and conditional edges.
    #[test]
    fn compile_fails_when_node_has_both_edge_and_conditional() {
        let mut graph = StateGraph::<DummyState>::new();
        graph.add_node("a", Arc::new(DummyNode("a")));
        graph.add_node("b", Arc::new(DummyNode("b")));
        graph.add_edge(START, "a");
        graph.add_edge("a", "b");
        graph.add_edge("b", END);
        graph.add_conditional_edges(
            "a",
            Arc::new(|_| "b".to_string()),
            Some([("b".to_string(), "b".to_string())].into_iter().collect()),
        );
        let result = graph.compile();
        match result {
            Err(CompilationError::NodeHasBothEdgeAndConditional(id)) => assert_eq!(id, "a"),
            Err(e) => panic!("expected NodeHasBothEdgeAndConditional(a), got {:?}", e),
            Ok(_) => panic!("expected compile error"),
        }
    }

    /// **Scenario**: Compile fails when conditional path_map references a non-existent node.
    #[test]
    fn compile_fails_when_conditional_path_map_has_invalid_target() {
        let mut graph = StateGraph::<DummyState>::new();
        graph.add_node("a", Arc::new(DummyNode("a")));
        graph.add_edge(START, "a");
        graph.add_conditional_edges(
            "a",
            Arc::new(|_| "x".to_string()),
            Some(
                [("x".to_string(), "nonexistent".to_string())]
                    .into_iter()
                    .collect(),
            ),
        );
        let result = graph.compile();
        match result {
            Err(CompilationError::InvalidConditionalPathMap(id)) => assert_eq!(id, "nonexistent"),
            Err(e) => panic!(
                "expected InvalidConditionalPathMap(nonexistent), got {:?}",
                e
            ),
            Ok(_) => panic!("expected compile error"),
        }
    }

    #[derive(Clone)]
    struct SetFieldNode {
        id: &'static str,
        set: fn(&mut Fields),
    }

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Fields {
        a: i32,
        b: i32,
        c: i32,
    }

    #[async_trait]
    impl Node<Fields> for SetFieldNode {
        fn id(&self) -> &str {
            self.id
        }
        async fn run(
            &self,
            mut state: Fields,
        ) -> Result<(Fields, crate::graph::Next), crate::error::AgentError> {
            (self.set)(&mut state);
            Ok((state, crate::graph::Next::Continue))
        }
    }

    /// **Scenario**: Two unconditional edges from one source that converge on the same
    /// downstream node compile successfully and both branches' writes are merged.
    #[tokio::test]
    async fn compile_accepts_parallel_fanout_converging_on_one_node() {
        let mut graph = StateGraph::<Fields>::new();
        graph.add_node(
            "fork",
            Arc::new(SetFieldNode {
                id: "fork",
                set: |_| {},
            }),
        );
        graph.add_node(
            "left",
            Arc::new(SetFieldNode {
                id: "left",
                set: |f| f.a = 1,
            }),
        );
        graph.add_node(
            "right",
            Arc::new(SetFieldNode {
                id: "right",
                set: |f| f.b = 2,
            }),
        );
        graph.add_node(
            "join",
            Arc::new(SetFieldNode {
                id: "join",
                set: |f| f.c = 3,
            }),
        );
        graph.add_edge(START, "fork");
        graph.add_edge("fork", "left");
        graph.add_edge("fork", "right");
        graph.add_edge("left", "join");
        graph.add_edge("right", "join");
        graph.add_edge("join", END);

        let compiled = graph.compile().expect("parallel fan-out must compile");
        let result = compiled.invoke(Fields::default(), None).await.unwrap();
        assert_eq!(result, Fields { a: 1, b: 2, c: 3 });
    }

    /// **Scenario**: Branches from a fan-out that land on different downstream nodes
    /// are rejected as illegal parallel branching.
    #[test]
    fn compile_rejects_parallel_fanout_that_does_not_converge() {
        let mut graph = StateGraph::<DummyState>::new();
        graph.add_node("fork", Arc::new(DummyNode("fork")));
        graph.add_node("left", Arc::new(DummyNode("left")));
        graph.add_node("right", Arc::new(DummyNode("right")));
        graph.add_node("join_left", Arc::new(DummyNode("join_left")));
        graph.add_node("join_right", Arc::new(DummyNode("join_right")));
        graph.add_edge(START, "fork");
        graph.add_edge("fork", "left");
        graph.add_edge("fork", "right");
        graph.add_edge("left", "join_left");
        graph.add_edge("right", "join_right");
        graph.add_edge("join_left", END);
        graph.add_edge("join_right", END);

        let result = graph.compile();
        assert!(matches!(
            result,
            Err(CompilationError::IllegalParallelBranching(_))
        ));
    }

    /// **Scenario**: A conditional edge with more than one reachable target is still
    /// rejected; only unconditional fan-out is legal.
    #[test]
    fn compile_still_rejects_node_with_edge_and_conditional_when_fanning_out() {
        let mut graph = StateGraph::<DummyState>::new();
        graph.add_node("fork", Arc::new(DummyNode("fork")));
        graph.add_node("left", Arc::new(DummyNode("left")));
        graph.add_node("right", Arc::new(DummyNode("right")));
        graph.add_edge(START, "fork");
        graph.add_edge("fork", "left");
        graph.add_edge("fork", "right");
        graph.add_edge("left", END);
        graph.add_edge("right", END);
        graph.add_conditional_edges("fork", Arc::new(|_| "left".to_string()), None);

        let result = graph.compile();
        match result {
            Err(CompilationError::NodeHasBothEdgeAndConditional(id)) => assert_eq!(id, "fork"),
            other => panic!("expected NodeHasBothEdgeAndConditional(fork), got {:?}", other),
        }
    }

    /// **Scenario**: add_subgraph flattens an inner graph's nodes under a prefix and
    /// returns the prefixed entry/exit ids for the caller to wire into the outer graph,
    /// matching the `"sub.x"` / `"sub.y"` flattening shape.
    #[tokio::test]
    async fn add_subgraph_flattens_and_prefixes_inner_nodes() {
        let mut inner = StateGraph::<Fields>::new();
        inner.add_node(
            "x",
            Arc::new(SetFieldNode {
                id: "x",
                set: |f| f.a = 1,
            }),
        );
        inner.add_node(
            "y",
            Arc::new(SetFieldNode {
                id: "y",
                set: |f| f.b = 2,
            }),
        );
        inner.add_edge(START, "x");
        inner.add_edge("x", "y");
        inner.add_edge("y", END);

        let mut outer = StateGraph::<Fields>::new();
        outer.add_node(
            "before",
            Arc::new(SetFieldNode {
                id: "before",
                set: |_| {},
            }),
        );
        let (entry, exit) = outer.add_subgraph("sub", inner);
        assert_eq!(entry, "sub.x");
        assert_eq!(exit, "sub.y");

        outer.add_edge(START, "before");
        outer.add_edge("before", &entry);
        outer.add_edge(&exit, END);

        let compiled = outer.compile().expect("flattened graph compiles");
        let result = compiled.invoke(Fields::default(), None).await.unwrap();
        assert_eq!(result, Fields { a: 1, b: 2, c: 0 });
    }
}
