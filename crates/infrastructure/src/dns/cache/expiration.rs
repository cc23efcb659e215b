//! Expiration index: a min-heap of entry handles ordered by `valid_until`.
//!
//! Entries live in the cache's arena; the heap stores only handles into it.
//! Every structural move (insert, remove, swap) writes the affected entries'
//! `heap_pos` back through the arena, so the back-references are maintained
//! here and nowhere else.

use generational_arena::{Arena, Index};

use super::entry::CacheEntry;

#[derive(Debug, Default)]
pub(crate) struct ExpirationIndex {
    heap: Vec<Index>,
}

impl ExpirationIndex {
    pub(crate) fn new() -> Self {
        Self { heap: Vec::new() }
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    /// Handle of the earliest-expiring entry, if any.
    pub(crate) fn peek(&self) -> Option<Index> {
        self.heap.first().copied()
    }

    pub(crate) fn push(&mut self, entries: &mut Arena<CacheEntry>, handle: Index) {
        let pos = self.heap.len();
        self.heap.push(handle);
        entries[handle].set_heap_pos(Some(pos));
        self.sift_up(entries, pos);
    }

    /// Remove and return the earliest-expiring entry's handle.
    pub(crate) fn pop_min(&mut self, entries: &mut Arena<CacheEntry>) -> Option<Index> {
        if self.heap.is_empty() {
            None
        } else {
            self.remove_at(entries, 0)
        }
    }

    /// Reposition `handle` after its `valid_until` changed in place. No-op if
    /// the entry is not index-resident.
    pub(crate) fn fix(&mut self, entries: &mut Arena<CacheEntry>, handle: Index) {
        let Some(pos) = entries[handle].heap_pos() else {
            return;
        };
        if !self.sift_down(entries, pos) {
            self.sift_up(entries, pos);
        }
    }

    /// Remove an arbitrary entry using its stored position; no linear scan.
    /// No-op if the entry is not index-resident.
    pub(crate) fn remove(&mut self, entries: &mut Arena<CacheEntry>, handle: Index) {
        if let Some(pos) = entries[handle].heap_pos() {
            self.remove_at(entries, pos);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.heap.clear();
    }

    fn remove_at(&mut self, entries: &mut Arena<CacheEntry>, pos: usize) -> Option<Index> {
        let last = self.heap.len() - 1;
        if pos != last {
            self.swap(entries, pos, last);
        }
        let handle = self.heap.pop()?;
        entries[handle].set_heap_pos(None);

        if pos < self.heap.len() && !self.sift_down(entries, pos) {
            self.sift_up(entries, pos);
        }
        Some(handle)
    }

    fn less(&self, entries: &Arena<CacheEntry>, a: usize, b: usize) -> bool {
        entries[self.heap[a]].valid_until() < entries[self.heap[b]].valid_until()
    }

    fn swap(&mut self, entries: &mut Arena<CacheEntry>, a: usize, b: usize) {
        self.heap.swap(a, b);
        entries[self.heap[a]].set_heap_pos(Some(a));
        entries[self.heap[b]].set_heap_pos(Some(b));
    }

    fn sift_up(&mut self, entries: &mut Arena<CacheEntry>, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if !self.less(entries, pos, parent) {
                break;
            }
            self.swap(entries, pos, parent);
            pos = parent;
        }
    }

    /// Returns whether the node moved.
    fn sift_down(&mut self, entries: &mut Arena<CacheEntry>, mut pos: usize) -> bool {
        let start = pos;
        loop {
            let left = 2 * pos + 1;
            if left >= self.heap.len() {
                break;
            }
            let mut child = left;
            let right = left + 1;
            if right < self.heap.len() && self.less(entries, right, left) {
                child = right;
            }
            if !self.less(entries, child, pos) {
                break;
            }
            self.swap(entries, pos, child);
            pos = child;
        }
        pos != start
    }

    /// Min-heap property plus back-reference consistency, for tests.
    #[cfg(test)]
    pub(crate) fn is_consistent(&self, entries: &Arena<CacheEntry>) -> bool {
        for (pos, &handle) in self.heap.iter().enumerate() {
            if entries[handle].heap_pos() != Some(pos) {
                return false;
            }
            let left = 2 * pos + 1;
            let right = left + 1;
            if left < self.heap.len() && self.less(entries, left, pos) {
                return false;
            }
            if right < self.heap.len() && self.less(entries, right, pos) {
                return false;
            }
        }
        true
    }
}
