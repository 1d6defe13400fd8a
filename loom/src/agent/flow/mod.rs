//! Flow composers: Sequential, Parallel, and Routing graph builders over
//! declared sub-agents (SPEC_FULL §4.J).
//!
//! Each composer builds an ordinary `StateGraph<FlowState>` from a list of
//! [`SubAgent`]s, the same way [`super::react::compose_react_graph`] builds a
//! `StateGraph<ReActState>` from a list of hooks — compile and run it exactly
//! like any other graph in this crate.

mod error;
mod parallel;
mod routing;
mod sequential;
mod state;
mod sub_agent;

pub use error::FlowError;
pub use parallel::{compose_parallel_flow, MergeStrategy};
pub use routing::compose_routing_flow;
pub use sequential::compose_sequential_flow;
pub use state::FlowState;
pub use sub_agent::{ReactSubAgent, SubAgent};
