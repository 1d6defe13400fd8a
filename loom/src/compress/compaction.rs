//! Conversation compaction: prune old tool results and compact history via LLM summarization.
//!
//! Capabilities:
//! - **prune**: Replace old tool results beyond a token limit with a placeholder to control context length.
//! - **compact**: Summarize earlier messages into one System message via LLM and keep the most recent N as-is.

use crate::error::AgentError;
use crate::llm::LlmClient;
use crate::message::Message;

use super::config::CompactionConfig;
use super::context_window::estimate_tokens;

/// Placeholder text used to replace pruned tool results in messages.
pub const PRUNE_PLACEHOLDER: &str = "[Old tool result cleared]";

/// Returns true if the message is a tool response.
fn is_tool_result_message(m: &Message) -> bool {
    matches!(m, Message::ToolResponse { .. })
}

/// Replace old tool results beyond the keep-token limit with a placeholder.
///
/// Traverses messages from newest to oldest, accumulating tokens for tool-result messages only.
/// Results that push the total over `prune_keep_tokens` are marked for pruning. If the total
/// prunable tokens would be less than `prune_minimum`, no change is made.
pub fn prune(messages: Vec<Message>, config: &CompactionConfig) -> Vec<Message> {
    if !config.prune || config.prune_keep_tokens == 0 {
        return messages;
    }
    let min = config.prune_minimum.unwrap_or(20_000);

    let mut total: u32 = 0;
    let mut pruned: u32 = 0;
    let mut to_prune = Vec::new();

    for (i, m) in messages.iter().enumerate().rev() {
        if is_tool_result_message(m) {
            let tok = estimate_tokens(std::slice::from_ref(m));
            total += tok;
            if total > config.prune_keep_tokens {
                pruned += tok;
                to_prune.push(i);
            }
        }
    }

    if pruned < min {
        return messages;
    }

    let mut out = messages;
    for i in to_prune {
        if let Some(Message::ToolResponse { name, id, .. }) = out.get(i).cloned() {
            out[i] = Message::tool_response(id, name, PRUNE_PLACEHOLDER);
        }
    }
    out
}

/// Summarize earlier messages into one System message via LLM and keep the most recent N as-is.
///
/// Output is `[one summary System message] + [last compact_keep_recent original messages]`.
pub async fn compact(
    messages: &[Message],
    llm: &dyn LlmClient,
    config: &CompactionConfig,
) -> Result<Vec<Message>, AgentError> {
    let keep = config.compact_keep_recent;
    if messages.len() <= keep {
        return Ok(messages.to_vec());
    }
    let split = messages.len().saturating_sub(keep);
    let (to_summarize, recent) = messages.split_at(split);

    let prompt = build_summary_prompt(to_summarize);
    let summary_msgs = vec![Message::User(prompt)];
    let response = llm.invoke(&summary_msgs).await?;
    let content = response.content;

    let summary = Message::System(format!("[Summary of earlier conversation]: {}", content));
    let mut out = vec![summary];
    out.extend(recent.iter().cloned());
    Ok(out)
}

/// Build the prompt sent to the LLM: instructions on what to summarize, then the message list.
fn build_summary_prompt(msgs: &[Message]) -> String {
    let mut parts = vec![
        "Summarize the following conversation. Focus on:".to_string(),
        "- What was done".to_string(),
        "- What is being worked on".to_string(),
        "- Which files are involved".to_string(),
        "- What needs to be done next".to_string(),
        "".to_string(),
    ];
    for m in msgs {
        match m {
            Message::System(s) => parts.push(format!("System: {}", s)),
            Message::User(s) => parts.push(format!("User: {}", s)),
            Message::Assistant { text, .. } => {
                parts.push(format!("Assistant: {}", text.as_deref().unwrap_or("")))
            }
            Message::ToolResponse { name, content, .. } => {
                parts.push(format!("Tool {} returned: {}", name, content))
            }
            Message::AgentInstruction(s) => parts.push(format!("Instruction: {}", s)),
        }
    }
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use crate::message::Message;

    use super::*;

    fn tool_result_msg(name: &str, content: &str) -> Message {
        Message::tool_response(None, name, content)
    }

    #[test]
    fn prune_disabled_returns_unchanged() {
        let config = CompactionConfig {
            prune: false,
            prune_keep_tokens: 1000,
            ..Default::default()
        };
        let msgs = vec![
            Message::User("hi".to_string()),
            tool_result_msg("a", "data"),
        ];
        let out = prune(msgs.clone(), &config);
        assert_eq!(out.len(), msgs.len());
        assert!(matches!(&out[0], Message::User(s) if s == "hi"));
        assert!(matches!(&out[1], Message::ToolResponse { name, .. } if name == "a"));
    }

    #[test]
    fn prune_keep_tokens_zero_returns_unchanged() {
        let config = CompactionConfig {
            prune: true,
            prune_keep_tokens: 0,
            ..Default::default()
        };
        let msgs = vec![tool_result_msg("a", "x")];
        let out = prune(msgs.clone(), &config);
        assert_eq!(out.len(), 1);
        assert!(matches!(&out[0], Message::ToolResponse { name, .. } if name == "a"));
    }

    #[test]
    fn prune_no_tool_results_returns_unchanged() {
        let config = CompactionConfig {
            prune: true,
            prune_keep_tokens: 100,
            prune_minimum: Some(0),
            ..Default::default()
        };
        let msgs = vec![Message::User("hi".to_string()), Message::assistant("hello")];
        let out = prune(msgs.clone(), &config);
        assert_eq!(out.len(), 2);
        assert!(matches!(&out[0], Message::User(s) if s == "hi"));
        assert_eq!(out[1].text_content(), "hello");
    }

    #[test]
    fn prune_replaces_old_tool_results_beyond_keep() {
        let config = CompactionConfig {
            prune: true,
            prune_keep_tokens: 15,
            prune_minimum: Some(0),
            ..Default::default()
        };
        let msgs = vec![
            Message::User("user".to_string()),
            tool_result_msg("old", "12345678901234567890"),
            tool_result_msg("new", "abcdefghijabcdefghij"),
        ];
        let out = prune(msgs, &config);
        assert_eq!(out.len(), 3);
        assert!(matches!(&out[0], Message::User(s) if s == "user"));
        assert!(
            matches!(&out[1], Message::ToolResponse { name, content, .. } if name == "old" && content == PRUNE_PLACEHOLDER)
        );
        assert!(matches!(&out[2], Message::ToolResponse { name, .. } if name == "new"));
    }

    #[test]
    fn prune_below_minimum_returns_unchanged() {
        let config = CompactionConfig {
            prune: true,
            prune_keep_tokens: 1,
            prune_minimum: Some(100_000),
            ..Default::default()
        };
        let msgs = vec![
            Message::User("x".to_string()),
            tool_result_msg("a", &"y".repeat(400)),
        ];
        let out = prune(msgs.clone(), &config);
        assert_eq!(out.len(), 2);
        assert!(matches!(&out[0], Message::User(s) if s == "x"));
        assert!(matches!(&out[1], Message::ToolResponse { name, .. } if name == "a"));
    }
}
