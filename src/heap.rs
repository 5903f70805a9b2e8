//! Fixed-capacity binary heap used for top-k selection.
//!
//! The comparator orders items best-first, the way a sort would. The heap keeps
//! the *worst* item at its root so it can be evicted cheaply: with a capacity of
//! `k + 1`, inserting a newcomer and then extracting the root leaves the best
//! `k` items seen so far.

use std::cmp::Ordering;

const fn parent(idx: usize) -> usize {
    (idx - 1) / 2
}

const fn left(idx: usize) -> usize {
    2 * idx + 1
}

const fn right(idx: usize) -> usize {
    2 * idx + 2
}

/// Array-backed bounded heap.
pub struct Heap<T, F>
where
    F: Fn(&T, &T) -> Ordering,
{
    entries: Vec<T>,
    capacity: usize,
    comparator: F,
}

impl<T, F> Heap<T, F>
where
    F: Fn(&T, &T) -> Ordering,
{
    /// Creates an empty heap that holds at most `capacity` items
    pub fn new(capacity: usize, comparator: F) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
            comparator,
        }
    }

    /// Number of items held
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the heap is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of items
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Adds `value`, unless the heap is full in which case the value is
    /// dropped and `false` returned.
    pub fn insert(&mut self, value: T) -> bool {
        if self.entries.len() == self.capacity {
            return false;
        }

        self.entries.push(value);
        let mut idx = self.entries.len() - 1;
        while idx > 0 {
            let parent_idx = parent(idx);
            if self.ordered(parent_idx, idx) {
                break;
            }
            self.entries.swap(idx, parent_idx);
            idx = parent_idx;
        }
        true
    }

    /// The worst item, without removing it
    pub fn peek(&self) -> Option<&T> {
        self.entries.first()
    }

    /// Removes and returns the worst item
    pub fn extract(&mut self) -> Option<T> {
        if self.entries.is_empty() {
            return None;
        }
        let extracted = self.entries.swap_remove(0);
        self.heapify(0);
        Some(extracted)
    }

    /// Consumes the heap, returning its items in no particular order
    pub fn into_vec(self) -> Vec<T> {
        self.entries
    }

    /// Restores the heap property below `idx`.
    fn heapify(&mut self, mut idx: usize) {
        let count = self.entries.len();
        loop {
            let left_idx = left(idx);
            let right_idx = right(idx);
            let mut worst = idx;
            if left_idx < count && !self.ordered(worst, left_idx) {
                worst = left_idx;
            }
            if right_idx < count && !self.ordered(worst, right_idx) {
                worst = right_idx;
            }
            if worst == idx {
                return;
            }
            self.entries.swap(idx, worst);
            idx = worst;
        }
    }

    /// Whether the item at `parent_idx` may sit above the one at `child_idx`,
    /// i.e. it does not rank strictly better.
    #[inline]
    fn ordered(&self, parent_idx: usize, child_idx: usize) -> bool {
        (self.comparator)(&self.entries[parent_idx], &self.entries[child_idx]) != Ordering::Less
    }
}

#[cfg(test)]
#[cfg_attr(coverage, coverage(off))]
mod tests {
    use super::*;

    fn by_score_desc(a: &u32, b: &u32) -> Ordering {
        b.cmp(a)
    }

    #[test]
    fn test_extract_order() {
        let mut heap = Heap::new(16, by_score_desc);
        for value in [5, 1, 9, 3, 7, 2, 8] {
            assert!(heap.insert(value));
        }
        assert_eq!(heap.len(), 7);
        assert_eq!(heap.peek(), Some(&1));

        let mut drained = Vec::new();
        while let Some(value) = heap.extract() {
            drained.push(value);
        }
        assert_eq!(drained, vec![1, 2, 3, 5, 7, 8, 9]);
        assert!(heap.is_empty());
        assert_eq!(heap.extract(), None);
    }

    #[test]
    fn test_insert_at_capacity_is_noop() {
        let mut heap = Heap::new(2, by_score_desc);
        assert!(heap.insert(4));
        assert!(heap.insert(6));
        assert!(!heap.insert(10));
        assert_eq!(heap.len(), 2);
        assert_eq!(heap.capacity(), 2);
        let mut items = heap.into_vec();
        items.sort();
        assert_eq!(items, vec![4, 6]);
    }

    #[test]
    fn test_top_k_selection() {
        let limit = 3;
        let mut heap = Heap::new(limit + 1, by_score_desc);
        for value in [4, 8, 1, 9, 3, 8, 7, 2, 10, 0] {
            if heap.len() == limit {
                if value >= *heap.peek().unwrap() {
                    heap.insert(value);
                    heap.extract();
                }
            } else {
                heap.insert(value);
            }
            assert!(heap.len() <= limit);
        }
        let mut items = heap.into_vec();
        items.sort_by(by_score_desc);
        assert_eq!(items, vec![10, 9, 8]);
    }

    #[test]
    fn test_duplicates() {
        let mut heap = Heap::new(8, by_score_desc);
        for value in [3, 3, 1, 1, 2, 2] {
            heap.insert(value);
        }
        let drained: Vec<u32> = std::iter::from_fn(|| heap.extract()).collect();
        assert_eq!(drained, vec![1, 1, 2, 2, 3, 3]);
    }

    #[test]
    fn test_zero_capacity() {
        let mut heap = Heap::new(0, by_score_desc);
        assert!(!heap.insert(1));
        assert_eq!(heap.peek(), None);
    }
}
