//! Tool interceptor: wraps one `ToolSource::call_tool_with_context` request/response pair.
//!
//! Narrower than [`NodeMiddleware`](crate::graph::NodeMiddleware), which wraps
//! a whole node's `run`. A `ToolInterceptor` only sees one tool call at a time,
//! matching ActNode's per-call unit of work — this is where a retry policy for
//! `TOOL_EXECUTION_ERROR` belongs, since the engine itself never retries.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::tool_source::{ToolCallContent, ToolSource, ToolSourceError};

/// One outgoing tool call: name, arguments, and the call id (if any) used to
/// correlate with the eventual `ToolResult`.
#[derive(Clone, Debug)]
pub struct ToolCallRequest {
    pub name: String,
    pub arguments: Value,
    pub call_id: Option<String>,
}

/// Result of a tool call. Alias of [`ToolCallContent`] — same reasoning as
/// `ModelResponse`: a named seam, not a new shape.
pub type ToolCallResponse = ToolCallContent;

/// Continuation passed to a `ToolInterceptor`: call it to invoke the next
/// interceptor in the chain, or the terminal tool call at the end.
pub type ToolNext = Box<
    dyn FnOnce(ToolCallRequest) -> Pin<Box<dyn Future<Output = Result<ToolCallResponse, ToolSourceError>> + Send>>
        + Send,
>;

/// Wraps a tool call request/response pair.
///
/// Implementations call `next(request)` to continue the chain (possibly after
/// modifying arguments), and may inspect, retry, or replace the response —
/// e.g. catching a `ToolSourceError` and synthesizing a fallback result.
#[async_trait]
pub trait ToolInterceptor: Send + Sync {
    async fn around_tool_call(
        &self,
        request: ToolCallRequest,
        next: ToolNext,
    ) -> Result<ToolCallResponse, ToolSourceError>;
}

fn chain_from(
    interceptors: Vec<Arc<dyn ToolInterceptor>>,
    idx: usize,
    request: ToolCallRequest,
    tools: Arc<dyn ToolSource>,
) -> Pin<Box<dyn Future<Output = Result<ToolCallResponse, ToolSourceError>> + Send>> {
    Box::pin(async move {
        if idx >= interceptors.len() {
            tools
                .call_tool_with_context(&request.name, request.arguments, None)
                .await
        } else {
            let interceptor = interceptors[idx].clone();
            let rest = interceptors.clone();
            let tools2 = tools.clone();
            let next: ToolNext = Box::new(move |req| chain_from(rest, idx + 1, req, tools2));
            interceptor.around_tool_call(request, next).await
        }
    })
}

/// Runs `request` through `interceptors` in declaration order, finishing with
/// `tools.call_tool_with_context`.
pub fn run_tool_chain(
    interceptors: Vec<Arc<dyn ToolInterceptor>>,
    request: ToolCallRequest,
    tools: Arc<dyn ToolSource>,
) -> Pin<Box<dyn Future<Output = Result<ToolCallResponse, ToolSourceError>> + Send>> {
    chain_from(interceptors, 0, request, tools)
}

/// Reference logging interceptor, the `ToolInterceptor` analogue of the
/// teacher's `LoggingNodeMiddleware`.
pub struct LoggingToolInterceptor;

#[async_trait]
impl ToolInterceptor for LoggingToolInterceptor {
    async fn around_tool_call(
        &self,
        request: ToolCallRequest,
        next: ToolNext,
    ) -> Result<ToolCallResponse, ToolSourceError> {
        tracing::debug!(tool = %request.name, "tool call");
        let result = next(request).await;
        match &result {
            Ok(resp) => tracing::debug!(result_len = resp.text.len(), "tool call returned"),
            Err(e) => tracing::warn!(error = %e, "tool call failed"),
        }
        result
    }
}
