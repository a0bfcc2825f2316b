use thiserror::Error;

use critail_types::IndexItem;

/// Upper bound on slots reserved up front; the rest grow on demand
const INITIAL_RESERVE: usize = 1024;

/// Returned when a ring index is asked for a capacity it cannot hold
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("invalid capacity: {0}")]
pub struct InvalidCapacity(pub i64);

/// Fixed-capacity ring of the most recently added items
///
/// Once full, every `add` overwrites the oldest item. Iteration always runs
/// oldest to newest.
#[derive(Clone, Debug)]
pub struct RingIndex<T = IndexItem> {
    /// Slots; grows until it reaches `capacity`, then is overwritten in place
    slots: Vec<T>,

    /// Maximum number of items kept
    capacity: usize,

    /// Slot holding the oldest item
    head: usize,
}

impl<T> RingIndex<T> {
    /// Create an empty ring that keeps at most `capacity` items
    pub fn new(capacity: i64) -> Result<Self, InvalidCapacity> {
        let capacity = usize::try_from(capacity).map_err(|_| InvalidCapacity(capacity))?;
        Ok(Self {
            slots: Vec::with_capacity(capacity.min(INITIAL_RESERVE)),
            capacity,
            head: 0,
        })
    }

    /// Add an item, evicting the oldest if at capacity
    pub fn add(&mut self, item: T) {
        if self.capacity == 0 {
            return;
        }

        if self.slots.len() < self.capacity {
            // head stays 0 until the first wrap, so the next free slot is the end
            self.slots.push(item);
            return;
        }

        self.slots[self.head] = item;
        self.head = (self.head + 1) % self.capacity;
    }

    /// Number of items currently held
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Call `visitor` on every item, oldest first, stopping at the first error
    pub fn visit_all<E, F>(&self, mut visitor: F) -> Result<(), E>
    where
        F: FnMut(&T) -> Result<(), E>,
    {
        self.iter().try_for_each(|item| visitor(item))
    }

    /// Iterate items oldest first
    pub fn iter(&self) -> Iter<'_, T> {
        let (newer, older) = self.slots.split_at(self.head);
        Iter {
            inner: older.iter().chain(newer.iter()),
        }
    }
}

impl<'a, T> IntoIterator for &'a RingIndex<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Oldest-first iterator over a [`RingIndex`]
pub struct Iter<'a, T> {
    inner: std::iter::Chain<std::slice::Iter<'a, T>, std::slice::Iter<'a, T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
