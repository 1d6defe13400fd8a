//! A2A (Agent2Agent) remote-agent wire format: JSON-RPC over HTTP for
//! `message/send`, and Server-Sent Events for `message/stream` (SPEC_FULL §6).
//!
//! The core engine treats remote agents as an external collaborator; this
//! module is the thin client plus a [`Node`](crate::graph::Node) adapter so a
//! remote agent can be spliced into any `StateGraph<S>` like a model or tool
//! node.

mod client;
mod node;

pub use client::{A2aClient, A2aError};
pub use node::A2aRemoteAgentNode;
