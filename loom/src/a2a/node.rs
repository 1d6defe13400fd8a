//! `A2aRemoteAgentNode`: splices a remote A2A agent into a graph as an
//! ordinary `Node<S>`, the way any model or tool node runs (SPEC_FULL §6).

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::graph::{Next, Node};

use super::client::A2aClient;

/// One step that sends `input(&state)` to a remote A2A agent and folds the
/// reply back into state via `apply_reply`.
///
/// Generic over `S` rather than tied to `ReActState`/`FlowState` so the same
/// node type works in a ReAct graph, a flow-composer graph, or any custom
/// `StateGraph<S>` — the caller supplies the two closures that bridge its
/// state shape to plain text.
pub struct A2aRemoteAgentNode<S> {
    id: String,
    client: Arc<A2aClient>,
    thread_id: Option<String>,
    user_id: Option<String>,
    streaming: bool,
    input: Arc<dyn Fn(&S) -> String + Send + Sync>,
    apply_reply: Arc<dyn Fn(S, String) -> S + Send + Sync>,
}

impl<S> A2aRemoteAgentNode<S> {
    /// Builds a node that extracts the outgoing text via `input`, calls
    /// `message/send` on the remote agent, and threads the reply back into
    /// state via `apply_reply`.
    pub fn new(
        id: impl Into<String>,
        client: Arc<A2aClient>,
        input: impl Fn(&S) -> String + Send + Sync + 'static,
        apply_reply: impl Fn(S, String) -> S + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            client,
            thread_id: None,
            user_id: None,
            streaming: false,
            input: Arc::new(input),
            apply_reply: Arc::new(apply_reply),
        }
    }

    /// Scopes every call through this node under `thread_id` (A2A `metadata.threadId`).
    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    /// Attaches `user_id` (A2A `metadata.userId`) to every call through this node.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Uses `message/stream` instead of `message/send`; the reply passed to
    /// `apply_reply` is every streamed chunk concatenated in arrival order.
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }
}

impl<S> Debug for A2aRemoteAgentNode<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("A2aRemoteAgentNode")
            .field("id", &self.id)
            .field("streaming", &self.streaming)
            .finish()
    }
}

#[async_trait]
impl<S> Node<S> for A2aRemoteAgentNode<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(&self, state: S) -> Result<(S, Next), AgentError> {
        let text = (self.input)(&state);
        let reply = if self.streaming {
            let chunks = self
                .client
                .stream(&text, self.thread_id.as_deref(), self.user_id.as_deref())
                .await
                .map_err(|e| AgentError::ExecutionFailed(e.to_string()))?;
            chunks.join("")
        } else {
            self.client
                .send(&text, self.thread_id.as_deref(), self.user_id.as_deref())
                .await
                .map_err(|e| AgentError::ExecutionFailed(e.to_string()))?
        };
        Ok(((self.apply_reply)(state, reply), Next::Continue))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default)]
    struct Scratch {
        outgoing: String,
        reply: String,
    }

    #[test]
    fn node_id_and_debug_do_not_panic() {
        let client = Arc::new(A2aClient::new("http://example.invalid"));
        let node = A2aRemoteAgentNode::<Scratch>::new(
            "remote",
            client,
            |s: &Scratch| s.outgoing.clone(),
            |s: Scratch, reply: String| Scratch { reply, ..s },
        );
        assert_eq!(node.id(), "remote");
        assert!(format!("{:?}", node).contains("A2aRemoteAgentNode"));
    }
}
