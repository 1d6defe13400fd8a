//! Think node: read messages, call LLM, write assistant message and optional tool_calls.

use std::sync::Arc;

use async_trait::async_trait;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::AgentError;
use crate::graph::{Next, RunContext};
use crate::interceptor::{run_model_chain, ModelInterceptor, ModelRequest, ModelResponse};
use crate::llm::{LlmClient, ToolCallDelta};
use crate::message::Message;
use crate::state::{ReActState, ToolCall};
use crate::stream::{ChunkToStreamSender, MessageChunk, StreamEvent, StreamMetadata, StreamMode};
use crate::Node;

/// Renders `{{dotted.path}}` placeholders in `text` against a JSON object,
/// leaving a placeholder untouched when its path isn't found. Only object-key
/// traversal is supported (no array indexing) — enough for the flat
/// key/value `runtime_context` bags this crate's builders construct.
fn render_template(text: &str, data: &Value) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        let Some(end) = rest[start..].find("}}") else {
            out.push_str(rest);
            return out;
        };
        out.push_str(&rest[..start]);
        let path = rest[start + 2..start + end].trim();
        let resolved = path
            .split('.')
            .try_fold(data, |v, key| v.get(key))
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
        match resolved {
            Some(s) => out.push_str(&s),
            None => out.push_str(&rest[start..start + end + 2]),
        }
        rest = &rest[start + end + 2..];
    }
    out.push_str(rest);
    out
}

/// Substring marker used to detect an already-appended `outputSchema`
/// instruction, so Think only appends it once per conversation.
const OUTPUT_SCHEMA_MARKER: &str = "Respond using this JSON schema";

fn format_output_schema_instruction(schema: &str) -> String {
    format!("Respond using this JSON schema:\n{}", schema)
}

pub struct ThinkNode {
    llm: Arc<dyn LlmClient>,
    model_interceptors: Vec<Arc<dyn ModelInterceptor>>,
    output_schema: Option<String>,
}

impl ThinkNode {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            model_interceptors: Vec::new(),
            output_schema: None,
        }
    }

    /// Requires model replies to conform to `schema` (a JSON Schema, stringified).
    /// Appended as an `AgentInstruction` message once per conversation — idempotent
    /// across ReAct rounds rather than re-appended on every Think invocation.
    pub fn with_output_schema(mut self, schema: impl Into<String>) -> Self {
        self.output_schema = Some(schema.into());
        self
    }

    /// Appends the outputSchema instruction to `messages` unless one is already present.
    fn ensure_output_schema_message(&self, messages: &mut Vec<Message>) {
        if let Some(schema) = &self.output_schema {
            let already_present = messages.iter().any(|m| {
                matches!(m, Message::AgentInstruction(s) if s.contains(OUTPUT_SCHEMA_MARKER))
            });
            if !already_present {
                messages.push(Message::agent_instruction(format_output_schema_instruction(
                    schema,
                )));
            }
        }
    }

    /// Builds the message list actually sent to the model: renders any
    /// `AgentInstruction` template placeholders against `data`, leaving every
    /// other variant (and the persisted `messages` this was derived from)
    /// untouched.
    fn render_for_request(messages: &[Message], data: Option<&Value>) -> Vec<Message> {
        let Some(data) = data else {
            return messages.to_vec();
        };
        messages
            .iter()
            .map(|m| match m {
                Message::AgentInstruction(text) => {
                    Message::AgentInstruction(render_template(text, data))
                }
                other => other.clone(),
            })
            .collect()
    }

    /// Installs a chain of `ModelInterceptor`s wrapping every LLM call this node
    /// makes through the non-streaming path. Declaration order is outer-to-inner:
    /// `interceptors[0]` sees the request first. Empty by default — the direct
    /// `LlmClient::invoke` call path is unaffected when no interceptors are
    /// installed.
    ///
    /// **Known limitation**: applies only to the non-streaming `invoke` path.
    /// The streaming path (`invoke_stream_with_tool_delta`) calls the model
    /// directly — `ModelRequest`/`ModelResponse` are single-shot shapes and
    /// don't carry a token-stream seam to wrap.
    pub fn with_model_interceptors(mut self, interceptors: Vec<Arc<dyn ModelInterceptor>>) -> Self {
        self.model_interceptors = interceptors;
        self
    }

    /// Invokes the LLM, routing through the interceptor chain when any are installed.
    async fn call_model(&self, messages: &[Message]) -> Result<ModelResponse, AgentError> {
        if self.model_interceptors.is_empty() {
            self.llm.invoke(messages).await
        } else {
            let request = ModelRequest {
                messages: messages.to_vec(),
            };
            let llm = self.llm.clone();
            let terminal: Arc<
                dyn Fn(
                        ModelRequest,
                    ) -> std::pin::Pin<
                        Box<dyn std::future::Future<Output = Result<ModelResponse, AgentError>> + Send>,
                    > + Send
                    + Sync,
            > = Arc::new(move |req: ModelRequest| {
                let llm = llm.clone();
                Box::pin(async move { llm.invoke(&req.messages).await })
            });
            run_model_chain(self.model_interceptors.clone(), request, terminal).await
        }
    }
}

fn compute_usage(
    state: &ReActState,
    response_usage: &Option<crate::llm::LlmUsage>,
) -> (Option<crate::llm::LlmUsage>, Option<crate::llm::LlmUsage>) {
    match (&state.total_usage, response_usage) {
        (Some(t), Some(u)) => (
            response_usage.clone(),
            Some(crate::llm::LlmUsage {
                prompt_tokens: t.prompt_tokens + u.prompt_tokens,
                completion_tokens: t.completion_tokens + u.completion_tokens,
                total_tokens: t.total_tokens + u.total_tokens,
            }),
        ),
        (None, Some(u)) => (response_usage.clone(), Some(u.clone())),
        (Some(t), None) => (None, Some(t.clone())),
        (None, None) => (None, None),
    }
}

fn apply_think_response(
    state: ReActState,
    content: String,
    tool_calls: Vec<ToolCall>,
    response_usage: Option<crate::llm::LlmUsage>,
) -> ReActState {
    let (usage, total_usage) = compute_usage(&state, &response_usage);
    let mut messages = state.messages;
    let text = if content.is_empty() {
        None
    } else {
        Some(content)
    };
    messages.push(Message::assistant_with_tool_calls(text, tool_calls.clone()));
    let message_count_after_last_think = Some(messages.len());
    ReActState {
        messages,
        tool_calls,
        tool_results: state.tool_results,
        turn_count: state.turn_count,
        approval_result: state.approval_result,
        usage,
        total_usage,
        message_count_after_last_think,
        return_direct: false,
    }
}

#[async_trait]
impl Node<ReActState> for ThinkNode {
    fn id(&self) -> &str {
        "think"
    }

    async fn run(&self, mut state: ReActState) -> Result<(ReActState, Next), AgentError> {
        if state.messages.is_empty() {
            return Err(AgentError::InvalidState(
                "think requires at least one message".to_string(),
            ));
        }
        self.ensure_output_schema_message(&mut state.messages);
        let request_messages = Self::render_for_request(&state.messages, None);
        let response = self.call_model(&request_messages).await?;
        let new_state =
            apply_think_response(state, response.content, response.tool_calls, response.usage);
        Ok((new_state, Next::Continue))
    }

    async fn run_with_context(
        &self,
        mut state: ReActState,
        ctx: &RunContext<ReActState>,
    ) -> Result<(ReActState, Next), AgentError> {
        if state.messages.is_empty() {
            return Err(AgentError::InvalidState(
                "think requires at least one message".to_string(),
            ));
        }
        self.ensure_output_schema_message(&mut state.messages);
        let request_messages = Self::render_for_request(&state.messages, ctx.runtime_context());
        ctx.next_model_iteration();

        let stream_enabled = ctx.config.stream_enabled();
        let should_stream = stream_enabled
            && ctx.stream_mode.contains(&StreamMode::Messages)
            && ctx.stream_tx.is_some();
        let should_stream_tools = stream_enabled
            && (ctx.stream_mode.contains(&StreamMode::Tools)
                || ctx.stream_mode.contains(&StreamMode::Debug))
            && ctx.stream_tx.is_some();

        let (response, streamed_chunks) = if should_stream || should_stream_tools {
            let stream_tx = ctx.stream_tx.clone().unwrap();

            let (chunk_tx, chunk_rx) = if should_stream {
                let adapter = ChunkToStreamSender::new(stream_tx.clone(), self.id());
                let (tx, rx) = adapter.channel();
                (Some(tx), Some((adapter, rx)))
            } else {
                (None, None)
            };

            let (tool_delta_tx, tool_delta_rx) = if should_stream_tools {
                let (tx, rx) = mpsc::channel::<ToolCallDelta>(64);
                (Some(tx), Some(rx))
            } else {
                (None, None)
            };

            let tool_forward = async {
                if let Some(mut rx) = tool_delta_rx {
                    while let Some(delta) = rx.recv().await {
                        let _ = stream_tx
                            .send(StreamEvent::ToolCallChunk {
                                call_id: delta.call_id,
                                name: delta.name,
                                arguments_delta: delta.arguments_delta,
                            })
                            .await;
                    }
                }
            };

            let msg_forward = async {
                if let Some((adapter, rx)) = chunk_rx {
                    adapter.forward(rx).await
                } else {
                    0
                }
            };

            let (result, forwarded_chunks, _) = tokio::join!(
                self.llm
                    .invoke_stream_with_tool_delta(&request_messages, chunk_tx, tool_delta_tx,),
                msg_forward,
                tool_forward,
            );
            (result?, forwarded_chunks)
        } else {
            (self.call_model(&request_messages).await?, 0)
        };

        let used_fallback = response.content.is_empty() && response.tool_calls.is_empty();
        let content = if used_fallback {
            "No text response from the model. Please try again or check the API.".to_string()
        } else {
            response.content
        };

        if used_fallback && ctx.stream_tx.is_some() {
            let fallback_chunk = MessageChunk {
                content: content.clone(),
            };
            let _ = ctx
                .stream_tx
                .as_ref()
                .unwrap()
                .send(StreamEvent::Messages {
                    chunk: fallback_chunk,
                    metadata: StreamMetadata {
                        loom_node: self.id().to_string(),
                    },
                })
                .await;
        }

        if should_stream && !used_fallback && !content.is_empty() && streamed_chunks == 0 {
            let _ = ctx
                .stream_tx
                .as_ref()
                .unwrap()
                .send(StreamEvent::Messages {
                    chunk: MessageChunk {
                        content: content.clone(),
                    },
                    metadata: StreamMetadata {
                        loom_node: self.id().to_string(),
                    },
                })
                .await;
        }

        // Emit complete tool_call events before applying state
        if should_stream_tools && !response.tool_calls.is_empty() {
            let tx = ctx.stream_tx.as_ref().unwrap();
            for tc in &response.tool_calls {
                let args: Value = serde_json::from_str(&tc.arguments)
                    .unwrap_or_else(|_| Value::String(tc.arguments.clone()));
                let _ = tx
                    .send(StreamEvent::ToolCall {
                        call_id: tc.id.clone(),
                        name: tc.name.clone(),
                        arguments: args,
                    })
                    .await;
            }
        }

        let new_state =
            apply_think_response(state, content, response.tool_calls, response.usage.clone());

        if let (Some(ref tx), Some(ref u)) = (ctx.stream_tx.as_ref(), response.usage.as_ref()) {
            let _ = tx
                .send(StreamEvent::Usage {
                    prompt_tokens: u.prompt_tokens,
                    completion_tokens: u.completion_tokens,
                    total_tokens: u.total_tokens,
                })
                .await;
        }

        Ok((new_state, Next::Continue))
    }
}
