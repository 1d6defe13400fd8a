//! Channels for state management with different update strategies.
//!
//! Channels provide different ways to aggregate and manage state updates in a graph.
//! Each channel type implements a specific update strategy:
//!
//! - `LastValue`: Keeps only the last written value (the `Replace` reduction strategy)
//! - `Topic`: Accumulates values into a list (the `Append` reduction strategy)
//! - `EphemeralValue`: Value is cleared after reading
//! - `BinaryOperatorAggregate`: Aggregates values using a binary operator
//! - `NamedBarrierValue`: Waits until all named values are received
//!
//! Additionally, `StateUpdater` provides a way to customize how node outputs are
//! merged into the graph state:
//!
//! - `ReplaceUpdater`: Default, replaces entire state
//! - `FieldBasedUpdater`: Custom per-field update logic

mod binop;
mod ephemeral_value;
mod error;
mod last_value;
mod named_barrier;
mod topic;
mod updater;

pub use binop::BinaryOperatorAggregate;
pub use ephemeral_value::EphemeralValue;
pub use error::ChannelError;
pub use last_value::LastValue;
pub use named_barrier::{NamedBarrierUpdate, NamedBarrierValue};
pub use topic::{Topic, TopicSingleWrite};
pub use updater::{
    boxed_updater, BoxedStateUpdater, FieldBasedUpdater, ReplaceUpdater, StateUpdater,
};

use std::fmt::Debug;

/// Channel trait for state management with different update strategies.
///
/// Channels are used to manage how state values are updated when multiple nodes
/// write to the same state field. Each channel type implements a specific aggregation strategy.
/// `LastValue` and `Topic` are the two reduction strategies a state key can declare;
/// the rest are extension points not required by any reduction strategy.
pub trait Channel<T>: Send + Sync + Debug
where
    T: Clone + Send + Sync + Debug + 'static,
{
    /// Read the current value from the channel.
    ///
    /// Returns `None` if the channel has no value.
    fn read(&self) -> Option<T>;

    /// Write a new value to the channel.
    fn write(&mut self, value: T);

    /// Update the channel with multiple values.
    fn update(&mut self, updates: Vec<T>) -> Result<(), ChannelError>;

    /// Get the channel type name for debugging and introspection.
    fn channel_type(&self) -> &'static str;
}
