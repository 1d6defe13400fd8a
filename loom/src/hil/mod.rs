//! Human-in-the-loop feedback: generalizes [`helve::ApprovalPolicy`](crate::helve::ApprovalPolicy)'s
//! plain `Option<bool>` resume value into a three-way APPROVED / EDITED / REJECTED
//! resolution, with room for edited arguments and a rejection reason.
//!
//! `ActNode` still honors the original `ReActState::approval_result: Option<bool>`
//! path unchanged (existing callers keep working); when a [`RunnableConfig`](crate::memory::RunnableConfig)
//! carries `human_feedback` for the pending call, that takes precedence.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::ToolCall;

/// How a human resolved one pending tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackResolution {
    /// Run the tool call as originally proposed.
    Approved,
    /// Run the tool call, but with `ToolFeedback::edited_arguments` substituted in.
    Edited,
    /// Don't run the tool call; synthesize an error result instead.
    Rejected,
}

/// A human's resolution of one interrupted tool call, supplied by the caller when
/// resuming a graph that raised an [`Interrupt`](crate::graph::Interrupt) for approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolFeedback {
    pub resolution: FeedbackResolution,
    /// Replacement arguments when `resolution == Edited`. Ignored otherwise.
    #[serde(default)]
    pub edited_arguments: Option<Value>,
    /// Human-readable reason surfaced in the synthesized tool result when
    /// `resolution == Rejected`. Defaults to "User rejected." when absent.
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

/// Carries one [`ToolFeedback`] back into the graph on resume, addressed to the
/// specific pending call it resolves.
///
/// **Interaction**: set on [`RunnableConfig::human_feedback`](crate::memory::RunnableConfig::human_feedback)
/// before calling `invoke`/`stream` again after an approval interrupt. `ActNode`
/// matches it against the pending `ToolCall` by `call_id`, falling back to `name`
/// — the same matching order `covered_call_ids`/`is_covered` already use for
/// partial re-entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterruptionMetadata {
    pub call_id: Option<String>,
    pub tool_name: String,
    pub feedback: ToolFeedback,
}

impl InterruptionMetadata {
    /// Whether this metadata resolves `tc`: matches by `call_id` when both sides
    /// have one, otherwise falls back to tool name.
    pub fn matches(&self, tc: &ToolCall) -> bool {
        match (&self.call_id, &tc.id) {
            (Some(a), Some(b)) => a == b,
            _ => self.tool_name == tc.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tc(name: &str, id: Option<&str>) -> ToolCall {
        ToolCall {
            name: name.to_string(),
            arguments: "{}".to_string(),
            id: id.map(|s| s.to_string()),
        }
    }

    /// **Scenario**: metadata with a call_id matches only the same call_id.
    #[test]
    fn matches_by_call_id_when_both_present() {
        let meta = InterruptionMetadata {
            call_id: Some("c1".into()),
            tool_name: "search".into(),
            feedback: ToolFeedback {
                resolution: FeedbackResolution::Approved,
                edited_arguments: None,
                rejection_reason: None,
            },
        };
        assert!(meta.matches(&tc("search", Some("c1"))));
        assert!(!meta.matches(&tc("search", Some("c2"))));
    }

    /// **Scenario**: metadata with no call_id falls back to name matching.
    #[test]
    fn matches_by_name_when_call_id_absent() {
        let meta = InterruptionMetadata {
            call_id: None,
            tool_name: "search".into(),
            feedback: ToolFeedback {
                resolution: FeedbackResolution::Rejected,
                edited_arguments: None,
                rejection_reason: Some("not now".into()),
            },
        };
        assert!(meta.matches(&tc("search", None)));
        assert!(!meta.matches(&tc("other", None)));
    }
}
