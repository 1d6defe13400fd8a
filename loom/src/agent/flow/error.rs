//! Flow composer validation errors.

use thiserror::Error;

use crate::graph::CompilationError;

/// Error building a flow composer graph, before or instead of graph compilation.
#[derive(Debug, Error)]
pub enum FlowError {
    /// A `Parallel` flow was given fewer than 2 or more than 10 sub-agents.
    #[error("parallel flow requires 2-10 sub-agents, got {0}")]
    InvalidSubAgentCount(usize),

    /// Two or more sub-agents in a `Parallel` flow declared the same `output_key`.
    #[error("duplicate output_key in parallel flow: {0}")]
    DuplicateOutputKey(String),

    /// A `Routing` flow declared no label-to-sub-agent mapping.
    #[error("routing flow requires at least one labeled sub-agent")]
    NoRoutes,

    /// Underlying graph compilation failed.
    #[error(transparent)]
    Compilation(#[from] CompilationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_sub_agent_count_message_includes_count() {
        let err = FlowError::InvalidSubAgentCount(1);
        assert!(err.to_string().contains('1'));
    }

    #[test]
    fn duplicate_output_key_message_includes_key() {
        let err = FlowError::DuplicateOutputKey("summary".into());
        assert!(err.to_string().contains("summary"));
    }
}
