//! Integration test: checkpoint replacement via `update_state`.
//!
//! After a run, updating the checkpointed state in place must not grow the
//! thread's checkpoint history, and a subsequent load must see the override.

mod init_logging;

use std::sync::Arc;

use async_trait::async_trait;
use loom::{AgentError, MemorySaver, Message, Next, Node, ReActState, RunnableConfig, StateGraph};

struct EchoNode;

#[async_trait]
impl Node<ReActState> for EchoNode {
    fn id(&self) -> &str {
        "echo"
    }

    async fn run(&self, state: ReActState) -> Result<(ReActState, Next), AgentError> {
        Ok((state, Next::Continue))
    }
}

/// **Scenario 6**: `updateState` on a checkpoint id loaded after a run replaces
/// that checkpoint's state in place; `getState` for the same id then reflects the
/// override and the thread's checkpoint history length is unchanged.
#[tokio::test]
async fn update_state_overrides_last_message_without_growing_history() {
    let mut graph = StateGraph::<ReActState>::new();
    graph.add_node("echo", Arc::new(EchoNode));
    graph.add_edge(loom::START, "echo");
    graph.add_edge("echo", loom::END);

    let saver = Arc::new(MemorySaver::new());
    let compiled = graph
        .compile_with_checkpointer(saver.clone())
        .expect("graph compiles");

    let config = RunnableConfig {
        thread_id: Some("thread-1".into()),
        ..Default::default()
    };
    let state = ReActState {
        messages: vec![Message::user("hi")],
        ..Default::default()
    };
    compiled.invoke(state, Some(config.clone())).await.unwrap();

    let history_before = saver.list(&config, None, None, None).await.unwrap();
    assert_eq!(history_before.len(), 1);

    let override_state = ReActState {
        messages: vec![Message::assistant("override")],
        ..Default::default()
    };
    let updated_config = compiled
        .update_state(&config, &override_state, None)
        .await
        .expect("update_state succeeds");

    let history_after = saver.list(&config, None, None, None).await.unwrap();
    assert_eq!(
        history_after.len(),
        1,
        "update_state must replace, not append"
    );

    let (loaded, _meta) = saver
        .get_tuple(&updated_config)
        .await
        .unwrap()
        .expect("checkpoint still present");
    assert_eq!(
        loaded.channel_values.messages.last().map(Message::text_content),
        Some("override".to_string())
    );
}
