//! Insertion-ordered set of unacknowledged items.

use indexmap::IndexMap;

use crate::envelope::Tracked;
use crate::ulid::Ulid;

/// Unacknowledged items keyed by id, iterated in insertion order.
///
/// Removal keeps the relative order of the remaining entries, so a replay
/// after reconnect always sends the oldest pending item first.
pub struct SendBuffer<T> {
    entries: IndexMap<Ulid, T>,
    capacity: Option<usize>,
}

impl<T: Tracked> SendBuffer<T> {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            capacity: None,
        }
    }

    /// A buffer that evicts its oldest entry once `capacity` items are held.
    pub fn bounded(capacity: usize) -> Self {
        Self {
            entries: IndexMap::new(),
            capacity: Some(capacity.max(1)),
        }
    }

    /// Append an item at the back. Returns the evicted oldest entry when the
    /// buffer was already at capacity.
    pub fn append(&mut self, item: T) -> Option<T> {
        let evicted = match self.capacity {
            Some(cap) if self.entries.len() >= cap => {
                self.entries.shift_remove_index(0).map(|(_, v)| v)
            }
            _ => None,
        };
        self.entries.insert(item.ulid(), item);
        evicted
    }

    /// Remove an acknowledged item. Unknown ids are ignored.
    pub fn remove(&mut self, id: &Ulid) -> Option<T> {
        self.entries.shift_remove(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    pub fn ids(&self) -> Vec<Ulid> {
        self.entries.keys().copied().collect()
    }

    pub fn contains(&self, id: &Ulid) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Tracked> Default for SendBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Item(Ulid);

    impl Tracked for Item {
        fn ulid(&self) -> Ulid {
            self.0
        }
    }

    fn item(n: u64) -> Item {
        Item(Ulid::from_parts(n, 0))
    }

    #[test]
    fn remove_keeps_remaining_order() {
        let mut buffer = SendBuffer::new();
        for n in 1..=4 {
            buffer.append(item(n));
        }

        buffer.remove(&item(2).0);
        assert!(buffer.remove(&item(99).0).is_none());

        let order: Vec<_> = buffer.iter().map(|i| i.0.timestamp_ms()).collect();
        assert_eq!(order, vec![1, 3, 4]);
    }

    #[test]
    fn bounded_buffer_evicts_oldest() {
        let mut buffer = SendBuffer::bounded(2);
        assert!(buffer.append(item(1)).is_none());
        assert!(buffer.append(item(2)).is_none());
        assert_eq!(buffer.append(item(3)), Some(item(1)));
        assert_eq!(buffer.ids(), vec![item(2).0, item(3).0]);
    }

    proptest! {
        #[test]
        fn iteration_matches_insertion_minus_removed(
            count in 1usize..64,
            removals in proptest::collection::vec(any::<prop::sample::Index>(), 0..32),
        ) {
            let mut buffer = SendBuffer::new();
            let mut expected: Vec<Ulid> = Vec::new();
            for n in 0..count {
                // Insertion order deliberately differs from numeric order.
                let id = Ulid::from_parts((count - n) as u64, n as u128);
                buffer.append(Item(id));
                expected.push(id);
            }

            for index in removals {
                if expected.is_empty() {
                    break;
                }
                let id = expected.remove(index.index(expected.len()));
                prop_assert!(buffer.remove(&id).is_some());
            }

            prop_assert_eq!(buffer.ids(), expected.clone());
            prop_assert_eq!(buffer.len(), expected.len());
        }
    }
}
