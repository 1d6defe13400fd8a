//! Internal node synthesized by `StateGraph::compile` for parallel fan-out.
//!
//! When a source node has more than one unconditional outgoing edge and all
//! branches converge on the same downstream node (or END), `compile_internal`
//! collapses the fan-out into a single `ParallelNode` so the run loop only
//! ever deals with one next-node at a time. Branches run concurrently against
//! clones of the incoming state; their outputs are folded back together with
//! the graph's configured `StateUpdater`, in edge-declaration order.

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

use crate::channels::BoxedStateUpdater;
use crate::error::AgentError;

use super::run_context::RunContext;
use super::{Next, Node};

/// Synthetic node that runs its children concurrently and merges their outputs.
///
/// Never constructed directly by graph authors; `StateGraph::compile` inserts
/// one per detected parallel fan-out, under a generated id.
pub(crate) struct ParallelNode<S> {
    id: String,
    children: Vec<Arc<dyn Node<S>>>,
    state_updater: BoxedStateUpdater<S>,
}

impl<S> ParallelNode<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    pub(crate) fn new(
        id: String,
        children: Vec<Arc<dyn Node<S>>>,
        state_updater: BoxedStateUpdater<S>,
    ) -> Self {
        Self {
            id,
            children,
            state_updater,
        }
    }

    fn merge(&self, base: &S, branch_outputs: Vec<S>) -> S {
        let mut merged = base.clone();
        for branch in &branch_outputs {
            self.state_updater.apply_update(&mut merged, branch);
        }
        merged
    }
}

#[async_trait]
impl<S> Node<S> for ParallelNode<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(&self, state: S) -> Result<(S, Next), AgentError> {
        let futures = self.children.iter().map(|child| {
            let child = child.clone();
            let branch_state = state.clone();
            async move { child.run(branch_state).await }
        });
        let results = futures::future::join_all(futures).await;
        let mut branch_outputs = Vec::with_capacity(results.len());
        for result in results {
            let (branch_state, _next) = result?;
            branch_outputs.push(branch_state);
        }
        Ok((self.merge(&state, branch_outputs), Next::Continue))
    }

    async fn run_with_context(
        &self,
        state: S,
        ctx: &RunContext<S>,
    ) -> Result<(S, Next), AgentError> {
        let futures = self.children.iter().map(|child| {
            let child = child.clone();
            let branch_state = state.clone();
            async move { child.run_with_context(branch_state, ctx).await }
        });
        let results = futures::future::join_all(futures).await;
        let mut branch_outputs = Vec::with_capacity(results.len());
        for result in results {
            let (branch_state, _next) = result?;
            branch_outputs.push(branch_state);
        }
        Ok((self.merge(&state, branch_outputs), Next::Continue))
    }
}
