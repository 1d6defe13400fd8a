//! Top-level execution error type returned by compiled graph runs and agent nodes.

use thiserror::Error;

use crate::graph::GraphInterrupt;

/// Graph/agent execution error.
///
/// Returned by `CompiledStateGraph::invoke`/`stream` and by individual `Node::run`
/// implementations when a step fails.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Execution failed with a message (e.g. LLM call failed, tool error).
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// Graph execution was interrupted.
    ///
    /// Raised when a node requests an interrupt for human-in-the-loop scenarios. The
    /// executor catches this, persists a checkpoint, and later resumes with user input.
    #[error("graph interrupted: {0}")]
    Interrupted(GraphInterrupt),

    /// The run exceeded its configured step limit (`RunnableConfig::recursion_limit`).
    ///
    /// Guards against graphs with genuine cycles (e.g. the ReAct loop) never
    /// reaching `END` because a node keeps returning `Next::Continue`.
    #[error("recursion limit of {0} steps exceeded")]
    RecursionLimit(usize),

    /// A node's precondition on its input state was not met (e.g. the Model
    /// Node's non-empty `messages` requirement).
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl From<GraphInterrupt> for AgentError {
    fn from(interrupt: GraphInterrupt) -> Self {
        AgentError::Interrupted(interrupt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_error_display_execution_failed() {
        let err = AgentError::ExecutionFailed("msg".to_string());
        let s = err.to_string();
        assert!(s.contains("execution failed"));
        assert!(s.contains("msg"));
    }

    #[test]
    fn agent_error_display_recursion_limit() {
        let err = AgentError::RecursionLimit(25);
        let s = err.to_string();
        assert!(s.contains("recursion limit"));
        assert!(s.contains("25"));
    }

    #[test]
    fn agent_error_debug_format() {
        let err = AgentError::ExecutionFailed("test".to_string());
        let s = format!("{:?}", err);
        assert!(s.contains("ExecutionFailed"));
        assert!(s.contains("test"));
    }
}
