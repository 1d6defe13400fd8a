//! ReAct graph runner: encapsulates graph build, initial state, invoke and stream.

mod error;
mod initial_state;
mod options;
mod runner;

pub use error::RunError;
pub use initial_state::build_react_initial_state;
pub use options::AgentOptions;
pub use runner::{run_agent, run_react_graph_stream, ReactRunner};
