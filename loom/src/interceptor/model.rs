//! Model interceptor: wraps one `LlmClient::invoke` request/response pair.
//!
//! Narrower than [`NodeMiddleware`](crate::graph::NodeMiddleware), which wraps a
//! whole node's `run`. A `ModelInterceptor` only sees the request going into the
//! model and the response coming back, matching ThinkNode's actual unit of work.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::llm::LlmResponse;
use crate::message::Message;

/// Request passed into a model call: the full message history for this turn.
#[derive(Clone, Debug)]
pub struct ModelRequest {
    pub messages: Vec<Message>,
}

/// Response from a model call. Alias of [`LlmResponse`] — the interceptor chain
/// doesn't need a distinct shape, just a named seam to hang interceptors on.
pub type ModelResponse = LlmResponse;

/// Continuation passed to a `ModelInterceptor`: call it to invoke the next
/// interceptor in the chain, or the terminal LLM call at the end.
pub type ModelNext = Box<
    dyn FnOnce(ModelRequest) -> Pin<Box<dyn Future<Output = Result<ModelResponse, AgentError>> + Send>>
        + Send,
>;

/// Wraps a model request/response pair.
///
/// Implementations call `next(request)` to continue the chain (possibly after
/// modifying the request), and may inspect or modify the response before
/// returning it.
#[async_trait]
pub trait ModelInterceptor: Send + Sync {
    async fn around_model(
        &self,
        request: ModelRequest,
        next: ModelNext,
    ) -> Result<ModelResponse, AgentError>;
}

fn chain_from(
    interceptors: Vec<Arc<dyn ModelInterceptor>>,
    idx: usize,
    request: ModelRequest,
    terminal: Arc<dyn Fn(ModelRequest) -> Pin<Box<dyn Future<Output = Result<ModelResponse, AgentError>> + Send>> + Send + Sync>,
) -> Pin<Box<dyn Future<Output = Result<ModelResponse, AgentError>> + Send>> {
    Box::pin(async move {
        if idx >= interceptors.len() {
            terminal(request).await
        } else {
            let interceptor = interceptors[idx].clone();
            let rest = interceptors.clone();
            let terminal2 = terminal.clone();
            let next: ModelNext =
                Box::new(move |req| chain_from(rest, idx + 1, req, terminal2));
            interceptor.around_model(request, next).await
        }
    })
}

/// Runs `request` through `interceptors` in declaration order (`i0` sees the
/// outer-most wrap: `i0(req, i1(req, … terminal))`), finishing with `terminal`.
pub fn run_model_chain(
    interceptors: Vec<Arc<dyn ModelInterceptor>>,
    request: ModelRequest,
    terminal: Arc<
        dyn Fn(ModelRequest) -> Pin<Box<dyn Future<Output = Result<ModelResponse, AgentError>> + Send>>
            + Send
            + Sync,
    >,
) -> Pin<Box<dyn Future<Output = Result<ModelResponse, AgentError>> + Send>> {
    chain_from(interceptors, 0, request, terminal)
}

/// Reference logging interceptor, the `ModelInterceptor` analogue of the
/// teacher's `LoggingNodeMiddleware` — uses `tracing` rather than `eprintln!`
/// since it sits closer to the model boundary than node-level lifecycle logs.
pub struct LoggingModelInterceptor;

#[async_trait]
impl ModelInterceptor for LoggingModelInterceptor {
    async fn around_model(
        &self,
        request: ModelRequest,
        next: ModelNext,
    ) -> Result<ModelResponse, AgentError> {
        tracing::debug!(message_count = request.messages.len(), "model request");
        let result = next(request).await;
        match &result {
            Ok(resp) => tracing::debug!(
                content_len = resp.content.len(),
                tool_calls = resp.tool_calls.len(),
                "model response"
            ),
            Err(e) => tracing::warn!(error = %e, "model request failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PrefixInterceptor;

    #[async_trait]
    impl ModelInterceptor for PrefixInterceptor {
        async fn around_model(
            &self,
            mut request: ModelRequest,
            next: ModelNext,
        ) -> Result<ModelResponse, AgentError> {
            request.messages.push(Message::System("injected".into()));
            next(request).await
        }
    }

    fn terminal_echo() -> Arc<
        dyn Fn(ModelRequest) -> Pin<Box<dyn Future<Output = Result<ModelResponse, AgentError>> + Send>>
            + Send
            + Sync,
    > {
        Arc::new(|req: ModelRequest| {
            Box::pin(async move {
                Ok(LlmResponse {
                    content: format!("saw {} messages", req.messages.len()),
                    tool_calls: vec![],
                    usage: None,
                })
            })
        })
    }

    /// **Scenario**: single interceptor mutates the request before the terminal call.
    #[tokio::test]
    async fn single_interceptor_mutates_request() {
        let request = ModelRequest {
            messages: vec![Message::user("hi")],
        };
        let chain: Vec<Arc<dyn ModelInterceptor>> = vec![Arc::new(PrefixInterceptor)];
        let response = run_model_chain(chain, request, terminal_echo()).await.unwrap();
        assert_eq!(response.content, "saw 2 messages");
    }

    /// **Scenario**: empty chain calls the terminal handler directly.
    #[tokio::test]
    async fn empty_chain_calls_terminal() {
        let request = ModelRequest {
            messages: vec![Message::user("hi")],
        };
        let response = run_model_chain(vec![], request, terminal_echo()).await.unwrap();
        assert_eq!(response.content, "saw 1 messages");
    }
}
