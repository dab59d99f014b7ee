//! # Append-only chunked list.
//!
//! Grows by whole chunks, never moves stored elements and never shrinks. The serializing
//! adapter queues notifications here while another thread is emitting.
//!
//! ```text
//!  chunk 0 [a b c d] ─► chunk 1 [e f g h] ─► chunk 2 [i _ _ _]
//!  ▲ set_first overwrites slot 0                  ▲ push appends here
//! ```

use crate::notification::Notification;
use crate::observers::Observer;

/// Append-only list stored as fixed-capacity chunks.
#[derive(Debug)]
pub struct AppendOnlyList<T> {
    capacity: usize,
    chunks: Vec<Vec<T>>,
}

impl<T> AppendOnlyList<T> {
    /// Creates an empty list whose chunks hold `capacity` items (min 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            chunks: vec![Vec::with_capacity(capacity)],
        }
    }

    /// Appends `value` at the tail, opening a new chunk when the current one is full.
    pub fn push(&mut self, value: T) {
        let needs_chunk = self
            .chunks
            .last()
            .is_none_or(|tail| tail.len() == self.capacity);
        if needs_chunk {
            self.chunks.push(Vec::with_capacity(self.capacity));
        }
        if let Some(tail) = self.chunks.last_mut() {
            tail.push(value);
        }
    }

    /// Overwrites the first element (or stores it, if the list is empty).
    pub fn set_first(&mut self, value: T) {
        match self.chunks.first_mut() {
            Some(head) if !head.is_empty() => head[0] = value,
            _ => self.push(value),
        }
    }

    /// Number of stored elements.
    pub fn len(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    /// Whether no element was stored yet.
    pub fn is_empty(&self) -> bool {
        self.chunks.iter().all(Vec::is_empty)
    }

    /// Iterates the elements in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.chunks.iter().flatten()
    }
}

impl<T> AppendOnlyList<Notification<T>> {
    /// Delivers every queued notification in order, stopping at the first terminal one.
    ///
    /// Returns true if a terminal notification was delivered.
    pub fn accept_all<O>(self, observer: &mut O) -> bool
    where
        O: Observer<T> + ?Sized,
    {
        for n in self {
            if n.accept(observer) {
                return true;
            }
        }
        false
    }
}

impl<T> IntoIterator for AppendOnlyList<T> {
    type Item = T;
    type IntoIter = std::iter::Flatten<std::vec::IntoIter<Vec<T>>>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.into_iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RxError;
    use crate::test_support::Recorder;
    use proptest::prelude::*;

    #[test]
    fn set_first_overwrites_head() {
        let mut list = AppendOnlyList::new(2);
        list.set_first(9);
        list.push(1);
        list.push(2);
        list.set_first(0);
        assert_eq!(list.into_iter().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn accept_all_stops_at_the_first_terminal() {
        let mut list = AppendOnlyList::new(4);
        list.push(Notification::Next(1));
        list.push(Notification::Next(2));
        list.push(Notification::Error(RxError::illegal_state("stop")));
        list.push(Notification::Next(3));

        let rec = Recorder::<i32>::new();
        let mut obs = rec.observer();
        assert!(list.accept_all(&mut obs));
        assert_eq!(rec.values(), vec![1, 2]);
        assert!(rec.error().is_some());
    }

    proptest! {
        #[test]
        fn preserves_insertion_order(capacity in 1usize..9, items in proptest::collection::vec(any::<u32>(), 0..64)) {
            let mut list = AppendOnlyList::new(capacity);
            for v in &items {
                list.push(*v);
            }
            prop_assert_eq!(list.len(), items.len());
            prop_assert_eq!(list.is_empty(), items.is_empty());
            prop_assert!(list.iter().copied().eq(items.iter().copied()));
            prop_assert_eq!(list.into_iter().collect::<Vec<_>>(), items);
        }
    }
}
