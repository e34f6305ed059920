use std::collections::VecDeque;

use super::{MemoContext, MemoEntry, Memoizer};
use crate::context::Key;

/// A small memo cache holding the most recently used entries.
///
/// Entries are kept in recency order, oldest first. A hit moves the entry
/// to the back; inserting into a full cache evicts the front.
pub struct MemoCache<V, C> {
    entries: VecDeque<MemoEntry<V, C>>,
    capacity: usize,
    unit_sensitive: bool,
}

impl<V, C: MemoContext> MemoCache<V, C> {
    pub fn new(capacity: usize, unit_sensitive: bool) -> Self {
        assert!(capacity > 0, "memo cache capacity must be positive");
        Self { entries: VecDeque::with_capacity(capacity), capacity, unit_sensitive }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<V, C: MemoContext> Memoizer<V, C> for MemoCache<V, C> {
    fn memoize(&mut self, entry: MemoEntry<V, C>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    fn get(&mut self, unit: Key, pos: usize, ctx: &C) -> Option<MemoEntry<V, C>> {
        let index = self.entries.iter().rposition(|e| {
            e.start == pos && e.ctx == *ctx && (!self.unit_sensitive || e.unit == unit)
        })?;
        let entry = self.entries.remove(index)?;
        self.entries.push_back(entry.clone());
        Some(entry)
    }
}
