//! Integration test: human-in-the-loop rejection of an approval-gated tool call.
//!
//! First run suspends with an `approval_required` interrupt before the tool runs;
//! resuming with a `Rejected` resolution synthesizes an error tool result instead
//! of executing the tool, and the run completes without calling the tool source.

mod init_logging;

use std::sync::Arc;

use loom::AgentError;
use loom::{
    ActNode, ApprovalPolicy, CompiledStateGraph, FeedbackResolution, GraphInterrupt,
    InterruptionMetadata, LlmClient, Message, MockLlm, MockToolSource, ObserveNode, ReActState,
    RunnableConfig, StateGraph, ThinkNode, ToolCall, ToolFeedback, ToolSpec, END, START,
};

fn build_graph(llm: Arc<dyn LlmClient>) -> CompiledStateGraph<ReActState> {
    let tool_source = MockToolSource::new(
        vec![ToolSpec {
            name: "delete_file".to_string(),
            description: Some("Delete a file.".to_string()),
            input_schema: serde_json::json!({"type": "object", "properties": {}}),
        }],
        "deleted".to_string(),
    );
    let mut graph = StateGraph::<ReActState>::new();
    graph
        .add_node("think", Arc::new(ThinkNode::new(llm)))
        .add_node(
            "act",
            Arc::new(
                ActNode::new(Box::new(tool_source))
                    .with_approval_policy(Some(ApprovalPolicy::DestructiveOnly)),
            ),
        )
        .add_node("observe", Arc::new(ObserveNode::new()))
        .add_edge(START, "think")
        .add_edge("think", "act")
        .add_edge("act", "observe")
        .add_edge("observe", END);
    graph.compile().expect("valid graph")
}

fn pending_delete_call() -> ToolCall {
    ToolCall {
        name: "delete_file".to_string(),
        arguments: "{}".to_string(),
        id: Some("t1".to_string()),
    }
}

#[tokio::test]
async fn hil_rejection_synthesizes_error_result_and_skips_tool() {
    let llm: Arc<dyn LlmClient> = Arc::new(MockLlm::new(
        "I'll delete it.".to_string(),
        vec![pending_delete_call()],
    ));
    let compiled = build_graph(llm);

    let state = ReActState {
        messages: vec![Message::user("delete scratch.txt")],
        ..Default::default()
    };

    // First run: think proposes delete_file, act suspends before executing it.
    let err = compiled.invoke(state, None).await.unwrap_err();
    match err {
        AgentError::Interrupted(GraphInterrupt(interrupt)) => {
            assert_eq!(interrupt.value["tool_name"], "delete_file");
        }
        other => panic!("expected Interrupted, got {other:?}"),
    }

    // Resume at 'act' with the pending call already populated (as a caller would
    // reconstruct from the checkpointed state) and a Rejected resolution for it.
    let resume_state = ReActState {
        messages: vec![
            Message::user("delete scratch.txt"),
            Message::assistant("I'll delete it."),
        ],
        tool_calls: vec![pending_delete_call()],
        ..Default::default()
    };

    let config = RunnableConfig {
        resume_from_node_id: Some("act".to_string()),
        human_feedback: Some(InterruptionMetadata {
            call_id: Some("t1".to_string()),
            tool_name: "delete_file".to_string(),
            feedback: ToolFeedback {
                resolution: FeedbackResolution::Rejected,
                edited_arguments: None,
                rejection_reason: Some(
                    "Tool call request for delete_file has been rejected.".to_string(),
                ),
            },
        }),
        ..Default::default()
    };

    let out = compiled.invoke(resume_state, Some(config)).await.unwrap();
    assert!(
        out.tool_results.is_empty(),
        "observe merges and clears tool_results"
    );
    assert!(out
        .messages
        .iter()
        .any(|m| m.text_content().contains("rejected")));
}
