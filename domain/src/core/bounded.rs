//! Fixed-capacity FIFO buffer.
//!
//! [`BoundedBuffer`] backs every bounded list in the pipeline: the usage
//! tracker's context history, per-tool failure reasons, failure-pattern
//! examples, the evaluation log and the recommendation feedback history.
//! Pushing into a full buffer evicts the oldest entry and hands it back to
//! the caller so secondary indexes can be kept in sync.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A FIFO buffer that never holds more than `capacity` items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BufferRepr<T>")]
pub struct BoundedBuffer<T> {
    capacity: usize,
    items: VecDeque<T>,
}

#[derive(Deserialize)]
struct BufferRepr<T> {
    capacity: usize,
    items: VecDeque<T>,
}

impl<T> From<BufferRepr<T>> for BoundedBuffer<T> {
    fn from(repr: BufferRepr<T>) -> Self {
        let mut buffer = Self {
            capacity: repr.capacity,
            items: repr.items,
        };
        buffer.enforce_capacity();
        buffer
    }
}

impl<T> BoundedBuffer<T> {
    /// Create an empty buffer holding at most `capacity` items.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    /// Append an item, returning the evicted oldest item when full.
    ///
    /// A zero-capacity buffer stores nothing and returns the pushed item.
    pub fn push(&mut self, item: T) -> Option<T> {
        if self.capacity == 0 {
            return Some(item);
        }
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    /// Change the capacity, evicting the oldest items if it shrinks.
    pub fn set_capacity(&mut self, capacity: usize) -> Vec<T> {
        self.capacity = capacity;
        self.enforce_capacity()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Iterate oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }

    /// Iterate newest first.
    pub fn iter_recent(&self) -> impl Iterator<Item = &T> {
        self.items.iter().rev()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }

    pub fn oldest(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn newest(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    fn enforce_capacity(&mut self) -> Vec<T> {
        let overflow = self.items.len().saturating_sub(self.capacity);
        self.items.drain(..overflow).collect()
    }
}

impl<T: Clone> BoundedBuffer<T> {
    /// Copy the contents out, oldest first.
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

impl<T> Default for BoundedBuffer<T> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<T> Extend<T> for BoundedBuffer<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.push(item);
        }
    }
}

impl<'a, T> IntoIterator for &'a BoundedBuffer<T> {
    type Item = &'a T;
    type IntoIter = std::collections::vec_deque::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn push_within_capacity_keeps_everything() {
        let mut buffer = BoundedBuffer::new(3);
        assert_eq!(buffer.push(1), None);
        assert_eq!(buffer.push(2), None);
        assert_eq!(buffer.to_vec(), vec![1, 2]);
        assert!(!buffer.is_full());
    }

    #[test]
    fn push_evicts_oldest_first() {
        let mut buffer = BoundedBuffer::new(2);
        buffer.push("a");
        buffer.push("b");
        assert_eq!(buffer.push("c"), Some("a"));
        assert_eq!(buffer.to_vec(), vec!["b", "c"]);
        assert_eq!(buffer.oldest(), Some(&"b"));
        assert_eq!(buffer.newest(), Some(&"c"));
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let mut buffer = BoundedBuffer::new(0);
        assert_eq!(buffer.push(7), Some(7));
        assert!(buffer.is_empty());
    }

    #[test]
    fn iter_recent_is_newest_first() {
        let mut buffer = BoundedBuffer::new(5);
        buffer.extend([1, 2, 3]);
        let recent: Vec<_> = buffer.iter_recent().copied().collect();
        assert_eq!(recent, vec![3, 2, 1]);
    }

    #[test]
    fn shrinking_capacity_returns_evicted() {
        let mut buffer = BoundedBuffer::new(5);
        buffer.extend([1, 2, 3, 4]);
        let evicted = buffer.set_capacity(2);
        assert_eq!(evicted, vec![1, 2]);
        assert_eq!(buffer.to_vec(), vec![3, 4]);
    }

    #[test]
    fn deserialize_enforces_capacity() {
        let json = r#"{"capacity":2,"items":[1,2,3,4]}"#;
        let buffer: BoundedBuffer<i32> = serde_json::from_str(json).unwrap();
        assert_eq!(buffer.to_vec(), vec![3, 4]);
    }

    proptest! {
        #[test]
        fn never_exceeds_capacity_and_keeps_newest(
            capacity in 1usize..16,
            items in proptest::collection::vec(any::<u16>(), 0..64),
        ) {
            let mut buffer = BoundedBuffer::new(capacity);
            buffer.extend(items.iter().copied());
            prop_assert!(buffer.len() <= capacity);
            let start = items.len().saturating_sub(capacity);
            prop_assert_eq!(buffer.to_vec(), items[start..].to_vec());
        }
    }
}
