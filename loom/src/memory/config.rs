//! Invoke config: thread_id, checkpoint_id, checkpoint_ns, user_id.
//!
//! config["configurable"]. Used by CompiledStateGraph::invoke
//! and Checkpointer.

use crate::hil::InterruptionMetadata;

/// Config for a single invoke. Identifies the thread and optional checkpoint.
///
/// config["configurable"] (thread_id, checkpoint_id, checkpoint_ns).
/// When using a checkpointer, invoke must provide at least thread_id.
///
/// **Interaction**: Passed to `CompiledStateGraph::invoke(state, config)` and
/// `Checkpointer::put` / `get_tuple` / `list`.
#[derive(Debug, Clone, Default)]
pub struct RunnableConfig {
    /// Unique id for this conversation/thread. Required when using a checkpointer.
    pub thread_id: Option<String>,
    /// If set, load state from this checkpoint instead of the latest (time travel / branch).
    pub checkpoint_id: Option<String>,
    /// Optional namespace for checkpoints (e.g. subgraph). Default is empty.
    pub checkpoint_ns: String,
    /// Optional user id; used by Store for cross-thread memory (namespace).
    pub user_id: Option<String>,
    /// When set, the graph starts from this node instead of the first (e.g. resume after Interrupt at "act").
    /// Used when resuming after an approval_required interrupt: load checkpoint state, set state.approval_result, set this to "act".
    pub resume_from_node_id: Option<String>,
    /// Resolution for a pending tool-call approval interrupt, supplied by the
    /// caller on resume. Takes precedence over `ReActState::approval_result`
    /// when present; see `ActNode`'s approval handling. Cleared by nothing
    /// automatically — set it only on the single resume call it resolves.
    pub human_feedback: Option<InterruptionMetadata>,
    /// Maximum number of graph steps before the run aborts with
    /// `AgentError::RecursionLimit`. `None` uses `DEFAULT_RECURSION_LIMIT`.
    pub recursion_limit: Option<usize>,
    /// The `_stream_` configurable: whether the Model Node should stream its
    /// response when the run's `StreamMode`/sender would otherwise allow it.
    /// `None` behaves as `Some(true)` — setting `Some(false)` forces the
    /// non-streaming call path regardless of stream mode.
    pub stream: Option<bool>,
}

/// Step ceiling applied when `RunnableConfig::recursion_limit` is unset.
pub const DEFAULT_RECURSION_LIMIT: usize = 25;

impl RunnableConfig {
    /// Resolves the `_stream_` configurable, defaulting to `true` when unset.
    pub fn stream_enabled(&self) -> bool {
        self.stream.unwrap_or(true)
    }
}
