//! Binary operator aggregate channel: combines values with a user-supplied reducer.
//!
//! Not one of the two reduction strategies a state key can declare directly, but an
//! extension point for custom aggregation (e.g. sum, max, set-union) built on the same
//! `Channel` trait as `LastValue` and `Topic`.

use super::{Channel, ChannelError};
use std::fmt::Debug;

/// Aggregates values using a binary operator supplied at construction time.
///
/// # Example
///
/// ```rust
/// use loom::channels::{BinaryOperatorAggregate, Channel};
///
/// let mut channel = BinaryOperatorAggregate::new(|a: i32, b: i32| a + b);
/// channel.write(1);
/// channel.write(2);
/// channel.write(3);
///
/// assert_eq!(channel.read(), Some(6));
/// ```
pub struct BinaryOperatorAggregate<T, F>
where
    T: Clone + Send + Sync + Debug + 'static,
    F: Fn(T, T) -> T + Send + Sync + 'static,
{
    value: Option<T>,
    reducer: F,
}

impl<T, F> BinaryOperatorAggregate<T, F>
where
    T: Clone + Send + Sync + Debug + 'static,
    F: Fn(T, T) -> T + Send + Sync + 'static,
{
    /// Creates a new aggregate channel with no initial value.
    pub fn new(reducer: F) -> Self {
        Self {
            value: None,
            reducer,
        }
    }

    /// Creates a new aggregate channel seeded with an initial value.
    pub fn with_value(value: T, reducer: F) -> Self {
        Self {
            value: Some(value),
            reducer,
        }
    }
}

impl<T, F> Debug for BinaryOperatorAggregate<T, F>
where
    T: Clone + Send + Sync + Debug + 'static,
    F: Fn(T, T) -> T + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryOperatorAggregate")
            .field("value", &self.value)
            .finish()
    }
}

impl<T, F> Channel<T> for BinaryOperatorAggregate<T, F>
where
    T: Clone + Send + Sync + Debug + 'static,
    F: Fn(T, T) -> T + Send + Sync + 'static,
{
    fn read(&self) -> Option<T> {
        self.value.clone()
    }

    fn write(&mut self, value: T) {
        self.value = Some(match self.value.take() {
            Some(current) => (self.reducer)(current, value),
            None => value,
        });
    }

    fn update(&mut self, updates: Vec<T>) -> Result<(), ChannelError> {
        for update in updates {
            self.write(update);
        }
        Ok(())
    }

    fn channel_type(&self) -> &'static str {
        "BinaryOperatorAggregate"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binop_sum() {
        let mut channel = BinaryOperatorAggregate::new(|a: i32, b: i32| a + b);
        channel.write(1);
        channel.write(2);
        channel.write(3);
        assert_eq!(channel.read(), Some(6));
    }

    #[test]
    fn test_binop_max() {
        let mut channel = BinaryOperatorAggregate::new(|a: i32, b: i32| a.max(b));
        channel.write(3);
        channel.write(7);
        channel.write(2);
        assert_eq!(channel.read(), Some(7));
    }

    #[test]
    fn test_binop_empty_read() {
        let channel: BinaryOperatorAggregate<i32, _> = BinaryOperatorAggregate::new(|a, b| a + b);
        assert_eq!(channel.read(), None);
    }

    #[test]
    fn test_binop_with_initial_value() {
        let mut channel = BinaryOperatorAggregate::with_value(10, |a: i32, b: i32| a + b);
        channel.write(5);
        assert_eq!(channel.read(), Some(15));
    }

    #[test]
    fn test_binop_update_batch() {
        let mut channel = BinaryOperatorAggregate::new(|a: i32, b: i32| a + b);
        channel.update(vec![1, 2, 3, 4]).unwrap();
        assert_eq!(channel.read(), Some(10));
    }

    #[test]
    fn test_binop_channel_type() {
        let channel = BinaryOperatorAggregate::new(|a: i32, b: i32| a + b);
        assert_eq!(channel.channel_type(), "BinaryOperatorAggregate");
    }

    #[test]
    fn test_binop_trait_object() {
        let mut channel: Box<dyn Channel<i32>> =
            Box::new(BinaryOperatorAggregate::new(|a: i32, b: i32| a + b));
        channel.write(1);
        channel.write(2);
        assert_eq!(channel.read(), Some(3));
    }
}
