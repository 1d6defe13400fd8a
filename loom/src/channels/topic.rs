//! Topic channel for message list accumulation. The `Append` reduction strategy.
//!
//! # Features
//!
//! - Accumulates values into a vector
//! - Optional accumulation across steps (if `accumulate` is false, clears on each step)
//! - Supports both single values and lists as updates — matching the distinction between
//!   appending a scalar (push) and appending a sequence (concat)
//!
//! # Example
//!
//! ```rust
//! use loom::channels::{Topic, TopicSingleWrite, Channel};
//!
//! let mut topic: Topic<String> = Topic::new(true);
//!
//! topic.write_single("message1".to_string());
//! topic.write_single("message2".to_string());
//!
//! assert_eq!(topic.read(), Some(vec!["message1".to_string(), "message2".to_string()]));
//! ```

use super::{Channel, ChannelError};
use std::fmt::Debug;

/// A configurable PubSub Topic channel that accumulates values into a list.
///
/// # Behavior
///
/// - When `accumulate` is `true`: values persist across update cycles
/// - When `accumulate` is `false`: values are cleared at the start of each update cycle
#[derive(Debug, Clone)]
pub struct Topic<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    /// The accumulated values in the topic.
    values: Vec<T>,
    /// Whether to accumulate values across steps.
    accumulate: bool,
}

impl<T> Topic<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    /// Creates a new Topic channel.
    pub fn new(accumulate: bool) -> Self {
        Self {
            values: Vec::new(),
            accumulate,
        }
    }

    /// Equivalent to `Topic::new(true)`.
    pub fn accumulating() -> Self {
        Self::new(true)
    }

    /// Equivalent to `Topic::new(false)`. Values are cleared at the start of each update cycle.
    pub fn ephemeral() -> Self {
        Self::new(false)
    }

    /// Returns whether this topic accumulates values across steps.
    pub fn is_accumulating(&self) -> bool {
        self.accumulate
    }

    /// Returns the number of values in the topic.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns whether the topic is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Clears all values from the topic.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Extends the topic with values from an iterator.
    pub fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.values.extend(iter);
    }

    /// Creates a checkpoint of the current values.
    pub fn checkpoint(&self) -> Vec<T> {
        self.values.clone()
    }

    /// Restores the topic from a checkpoint.
    pub fn from_checkpoint(checkpoint: Vec<T>, accumulate: bool) -> Self {
        Self {
            values: checkpoint,
            accumulate,
        }
    }
}

impl<T> Default for Topic<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn default() -> Self {
        Self::accumulating()
    }
}

impl<T> Channel<Vec<T>> for Topic<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    /// Reads all accumulated values from the topic. `None` if empty — appending `null`
    /// to an absent sequence is a no-op, matching the state model's `Append(null)` rule.
    fn read(&self) -> Option<Vec<T>> {
        if self.values.is_empty() {
            None
        } else {
            Some(self.values.clone())
        }
    }

    /// Writes a sequence of values, concatenating onto the existing sequence. For a
    /// single scalar append use `write_single` (`TopicSingleWrite`).
    fn write(&mut self, value: Vec<T>) {
        self.values.extend(value);
    }

    /// If `accumulate` is `false`, clears existing values before adding new ones.
    fn update(&mut self, updates: Vec<Vec<T>>) -> Result<(), ChannelError> {
        if !self.accumulate {
            self.values.clear();
        }
        for batch in updates {
            self.values.extend(batch);
        }
        Ok(())
    }

    fn channel_type(&self) -> &'static str {
        "Topic"
    }
}

/// Extension trait distinguishing a single scalar append from a sequence-concat write.
pub trait TopicSingleWrite<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    /// Pushes a single value to the topic (scalar append, not sequence concat).
    fn write_single(&mut self, value: T);
}

impl<T> TopicSingleWrite<T> for Topic<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn write_single(&mut self, value: T) {
        self.values.push(value);
    }
}
