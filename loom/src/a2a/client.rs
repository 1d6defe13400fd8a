//! JSON-RPC-over-HTTP client for the A2A remote-agent wire format (SPEC_FULL §6).
//!
//! Mirrors `tool_source::mcp::session_http`'s reqwest-based JSON-RPC session:
//! POST a JSON-RPC envelope, parse either a single `application/json` body or
//! a `text/event-stream` body of `data: <json>\n` lines.

use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

/// Errors from talking to a remote A2A agent.
#[derive(Debug, Error)]
pub enum A2aError {
    #[error("A2A transport error: {0}")]
    Transport(String),
    #[error("A2A JSON-RPC error {code}: {message}")]
    JsonRpc { code: i64, message: String },
    #[error("A2A response had neither result nor error")]
    EmptyResponse,
}

#[derive(Serialize)]
struct JsonRpcEnvelope {
    jsonrpc: &'static str,
    id: String,
    method: &'static str,
    params: Value,
}

struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<(i64, String)>,
}

fn parse_json_rpc_response(value: &Value) -> JsonRpcResponse {
    let error = value.get("error").map(|e| {
        let code = e.get("code").and_then(|c| c.as_i64()).unwrap_or(-1);
        let message = e
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown error")
            .to_string();
        (code, message)
    });
    JsonRpcResponse {
        result: value.get("result").cloned(),
        error,
    }
}

/// Extracts display text from one of the four result shapes SPEC_FULL §6
/// documents: `status-update`, `artifact-update`, bare `parts`, or a `message`
/// wrapper. Empty text is legal for intermediate status updates.
fn extract_text(result: &Value) -> String {
    if let Some(parts) = result
        .get("status")
        .and_then(|s| s.get("message"))
        .and_then(|m| m.get("parts"))
    {
        return parts_text(parts);
    }
    if let Some(parts) = result.get("artifact").and_then(|a| a.get("parts")) {
        return parts_text(parts);
    }
    if let Some(parts) = result.get("parts") {
        return parts_text(parts);
    }
    if let Some(parts) = result.get("message").and_then(|m| m.get("parts")) {
        return parts_text(parts);
    }
    String::new()
}

fn parts_text(parts: &Value) -> String {
    parts
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

fn message_params(text: &str, thread_id: Option<&str>, user_id: Option<&str>) -> Value {
    let mut metadata = serde_json::Map::new();
    if let Some(tid) = thread_id {
        metadata.insert("threadId".to_string(), Value::String(tid.to_string()));
    }
    if let Some(uid) = user_id {
        metadata.insert("userId".to_string(), Value::String(uid.to_string()));
    }
    json!({
        "message": {
            "kind": "message",
            "messageId": Uuid::new_v4().to_string(),
            "parts": [{ "kind": "text", "text": text }],
            "role": "user",
        },
        "metadata": Value::Object(metadata),
    })
}

/// Client for one remote A2A agent endpoint.
///
/// Uses the crate's existing `reqwest` dependency; no new HTTP stack.
pub struct A2aClient {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl A2aClient {
    /// Creates a client targeting `url` (the agent's JSON-RPC endpoint).
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    fn request_id(&self) -> String {
        format!("a2a-{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Non-streaming `message/send`: returns the extracted text from whichever
    /// result shape the remote agent replied with.
    pub async fn send(
        &self,
        text: &str,
        thread_id: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<String, A2aError> {
        let envelope = JsonRpcEnvelope {
            jsonrpc: "2.0",
            id: self.request_id(),
            method: "message/send",
            params: message_params(text, thread_id, user_id),
        };
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&envelope)
            .send()
            .await
            .map_err(|e| A2aError::Transport(e.to_string()))?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| A2aError::Transport(format!("response body: {}", e)))?;
        if !status.is_success() {
            return Err(A2aError::Transport(format!("HTTP {}: {}", status, body)));
        }
        let parsed = parse_json_rpc_response(&body);
        if let Some((code, message)) = parsed.error {
            return Err(A2aError::JsonRpc { code, message });
        }
        let result = parsed.result.ok_or(A2aError::EmptyResponse)?;
        Ok(extract_text(&result))
    }

    /// Streaming `message/stream`: POSTs the same envelope with
    /// `method: "message/stream"`, reads the full SSE body (`data: <json>\n`
    /// lines terminated by `data: [DONE]`), and returns the text chunks in
    /// arrival order.
    ///
    /// The remote agent's connection is expected to close once `[DONE]` is
    /// sent, so the whole body is buffered and parsed the same way
    /// `tool_source::mcp::session_http` handles an SSE MCP response.
    pub async fn stream(
        &self,
        text: &str,
        thread_id: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<Vec<String>, A2aError> {
        let envelope = JsonRpcEnvelope {
            jsonrpc: "2.0",
            id: self.request_id(),
            method: "message/stream",
            params: message_params(text, thread_id, user_id),
        };
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&envelope)
            .send()
            .await
            .map_err(|e| A2aError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| A2aError::Transport(format!("response body: {}", e)))?;
        if !status.is_success() {
            return Err(A2aError::Transport(format!("HTTP {}: {}", status, body)));
        }
        parse_sse_chunks(&body)
    }
}

/// Parses an SSE body of `data: <json>\n` lines terminated by `data: [DONE]`
/// into the ordered list of non-empty extracted text chunks.
fn parse_sse_chunks(body: &str) -> Result<Vec<String>, A2aError> {
    let mut chunks = Vec::new();
    for line in body.lines() {
        let Some(data) = line.strip_prefix("data: ") else {
            continue;
        };
        if data == "[DONE]" {
            break;
        }
        let value: Value = serde_json::from_str(data)
            .map_err(|e| A2aError::Transport(format!("SSE chunk json: {}", e)))?;
        let parsed = parse_json_rpc_response(&value);
        if let Some((code, message)) = parsed.error {
            return Err(A2aError::JsonRpc { code, message });
        }
        if let Some(result) = parsed.result {
            chunks.push(extract_text(&result));
        }
    }
    Ok(chunks)
}
