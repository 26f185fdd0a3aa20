/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Array-backed binary min-heap ordered by a caller-supplied comparator.
//!
//! The heap never looks inside its entries.  Ordering comes from the
//! comparator passed to [`Heap::new`]; removal by key goes through a match
//! predicate passed to [`Heap::remove_matching`].  The entry at the root is
//! the one that compares [`Ordering::Less`] than (or equal to) every other.
//!
//! # Invariant
//! For every index `i > 0` with parent `p = (i - 1) / 2`:
//! `compare(&entries[p], &entries[i]) != Ordering::Greater`.
//!
//! Equal keys carry no stability guarantee; swaps may reorder them.

use std::cmp::Ordering;
use std::collections::TryReserveError;
use std::fmt;

use thiserror::Error;

/// Slots reserved up front so the first few pushes never reallocate.
const INITIAL_CAPACITY: usize = 2;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Returned by [`Heap::push`] when the backing storage cannot grow.
///
/// The rejected entry is handed back untouched; the heap is unchanged.
#[derive(Error)]
#[error("heap storage could not grow to hold another entry")]
pub struct CapacityError<T> {
    item: T,
    #[source]
    source: TryReserveError,
}

impl<T> CapacityError<T> {
    /// Recover the entry that could not be inserted.
    pub fn into_inner(self) -> T {
        self.item
    }

    /// The allocation failure that rejected the entry.
    pub fn reserve_error(&self) -> &TryReserveError {
        &self.source
    }
}

impl<T> fmt::Debug for CapacityError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapacityError")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

// ── Heap ──────────────────────────────────────────────────────────────────────

/// Binary min-heap over `T`, ordered by `F`.
pub struct Heap<T, F> {
    entries: Vec<T>,
    compare: F,
}

impl<T, F> Heap<T, F>
where
    F: Fn(&T, &T) -> Ordering,
{
    /// Create an empty heap that orders entries with `compare`.
    ///
    /// `compare(a, b)` returns `Less` when `a` has priority over `b`.
    pub fn new(compare: F) -> Self {
        Self {
            entries: Vec::with_capacity(INITIAL_CAPACITY),
            compare,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert `item`, sifting it up to its place.  Amortised `O(log n)`.
    ///
    /// # Errors
    /// Returns [`CapacityError`] (holding `item`) if the backing storage
    /// cannot grow.  The heap is left unchanged.
    pub fn push(&mut self, item: T) -> Result<(), CapacityError<T>> {
        if let Err(source) = self.entries.try_reserve(1) {
            return Err(CapacityError { item, source });
        }
        self.entries.push(item);
        self.sift_up(self.entries.len() - 1);
        Ok(())
    }

    /// Remove and return the root entry, or `None` if the heap is empty.
    pub fn pop(&mut self) -> Option<T> {
        if self.entries.is_empty() {
            return None;
        }
        // swap_remove moves the last entry into the vacated root slot
        let root = self.entries.swap_remove(0);
        self.sift_down(0);
        Some(root)
    }

    /// Borrow the root entry without removing it.
    pub fn peek(&self) -> Option<&T> {
        self.entries.first()
    }

    /// Remove the first entry (in storage order) for which
    /// `matches(key, entry)` holds.  `O(n)`.
    ///
    /// The last entry is moved into the vacated slot and then sifted in both
    /// directions: down, because it came from a leaf and may be larger than
    /// its new children; up, because it came from another subtree and may be
    /// smaller than its new parent.  If the matched entry *was* the last one
    /// there is nothing to re-heapify.
    pub fn remove_matching<K, P>(&mut self, key: &K, matches: P) -> Option<T>
    where
        K: ?Sized,
        P: Fn(&K, &T) -> bool,
    {
        let index = self.entries.iter().position(|entry| matches(key, entry))?;
        let removed = self.entries.swap_remove(index);
        if index < self.entries.len() {
            self.sift_down(index);
            self.sift_up(index);
        }
        Some(removed)
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    /// `true` if the entry at `parent` must move below the one at `child`.
    fn out_of_order(&self, parent: usize, child: usize) -> bool {
        (self.compare)(&self.entries[parent], &self.entries[child]) == Ordering::Greater
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if !self.out_of_order(parent, index) {
                break;
            }
            self.entries.swap(parent, index);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.entries.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut above = index;

            if left < len && self.out_of_order(above, left) {
                above = left;
            }
            if right < len && self.out_of_order(above, right) {
                above = right;
            }
            if above == index {
                break;
            }
            self.entries.swap(index, above);
            index = above;
        }
    }
}

impl<T: fmt::Debug, F> fmt::Debug for Heap<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heap")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    type IntHeap = Heap<i32, fn(&i32, &i32) -> Ordering>;

    fn int_heap() -> IntHeap {
        let compare: fn(&i32, &i32) -> Ordering = |a, b| a.cmp(b);
        Heap::new(compare)
    }

    fn heap_property_holds<T, F>(heap: &Heap<T, F>) -> bool
    where
        F: Fn(&T, &T) -> Ordering,
    {
        (1..heap.entries.len()).all(|i| !heap.out_of_order((i - 1) / 2, i))
    }

    fn drain_sorted(heap: &mut IntHeap) -> Vec<i32> {
        std::iter::from_fn(|| heap.pop()).collect()
    }

    // ── Basic behaviour ───────────────────────────────────────────────────────

    #[test]
    fn empty_heap_has_no_root() {
        let mut heap = int_heap();
        assert!(heap.is_empty());
        assert_eq!(heap.len(), 0);
        assert_eq!(heap.peek(), None);
        assert_eq!(heap.pop(), None);
    }

    #[test]
    fn peek_returns_smallest_without_removing() {
        let mut heap = int_heap();
        for v in [5, 3, 8, 1, 9] {
            heap.push(v).unwrap();
        }
        assert_eq!(heap.peek(), Some(&1));
        assert_eq!(heap.len(), 5);
    }

    #[test]
    fn pops_in_ascending_order() {
        let mut heap = int_heap();
        for v in [7, 2, 9, 4, 4, 1, 6] {
            heap.push(v).unwrap();
        }
        assert_eq!(drain_sorted(&mut heap), vec![1, 2, 4, 4, 6, 7, 9]);
        assert!(heap.is_empty());
    }

    #[test]
    fn comparator_defines_the_root() {
        // Reversed comparator turns it into a max-heap.
        let mut heap = Heap::new(|a: &i32, b: &i32| b.cmp(a));
        for v in [3, 10, 1] {
            heap.push(v).unwrap();
        }
        assert_eq!(heap.pop(), Some(10));
        assert_eq!(heap.pop(), Some(3));
    }

    // ── remove_matching ───────────────────────────────────────────────────────

    #[test]
    fn remove_missing_key_returns_none() {
        let mut heap = int_heap();
        for v in [4, 2, 6] {
            heap.push(v).unwrap();
        }
        assert_eq!(heap.remove_matching(&42, |k, e| k == e), None);
        assert_eq!(heap.len(), 3);
        assert!(heap_property_holds(&heap));
    }

    #[test]
    fn remove_last_slot_needs_no_reheapify() {
        let mut heap = int_heap();
        for v in [1, 2, 3] {
            heap.push(v).unwrap();
        }
        // storage is [1, 2, 3]; 3 is in the last slot
        assert_eq!(heap.remove_matching(&3, |k, e| k == e), Some(3));
        assert_eq!(drain_sorted(&mut heap), vec![1, 2]);
    }

    #[test]
    fn remove_requires_upward_sift() {
        // Storage after pushes: [0, 10, 1, 11, 12, 2, 3]
        // Removing 11 (index 3) pulls 3 from the end under parent 10,
        // which only an upward sift can repair.
        let mut heap = int_heap();
        for v in [0, 10, 1, 11, 12, 2, 3] {
            heap.push(v).unwrap();
        }
        assert_eq!(heap.entries, vec![0, 10, 1, 11, 12, 2, 3]);

        assert_eq!(heap.remove_matching(&11, |k, e| k == e), Some(11));
        assert!(heap_property_holds(&heap));
        assert_eq!(drain_sorted(&mut heap), vec![0, 1, 2, 3, 10, 12]);
    }

    #[test]
    fn remove_requires_downward_sift() {
        let mut heap = int_heap();
        for v in [0, 1, 5, 2, 3, 6, 7, 4] {
            heap.push(v).unwrap();
        }
        assert_eq!(heap.remove_matching(&1, |k, e| k == e), Some(1));
        assert!(heap_property_holds(&heap));
        assert_eq!(drain_sorted(&mut heap), vec![0, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn remove_from_single_entry_heap() {
        let mut heap = int_heap();
        heap.push(9).unwrap();
        assert_eq!(heap.remove_matching(&9, |k, e| k == e), Some(9));
        assert!(heap.is_empty());
    }

    // ── Properties ────────────────────────────────────────────────────────────

    #[derive(Debug, Clone)]
    enum Op {
        Push(i32),
        Pop,
        Remove(i32),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => (-50i32..50).prop_map(Op::Push),
            1 => Just(Op::Pop),
            2 => (-50i32..50).prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn invariant_survives_any_operation_sequence(
            ops in prop::collection::vec(op_strategy(), 0..200)
        ) {
            let mut heap = int_heap();
            let mut model: Vec<i32> = Vec::new();

            for op in ops {
                match op {
                    Op::Push(v) => {
                        heap.push(v).unwrap();
                        model.push(v);
                    }
                    Op::Pop => {
                        let expected = model.iter().copied().min();
                        if let Some(min) = expected {
                            let pos = model.iter().position(|&x| x == min).unwrap();
                            model.swap_remove(pos);
                        }
                        prop_assert_eq!(heap.pop(), expected);
                    }
                    Op::Remove(v) => {
                        let expected = model.iter().position(|&x| x == v);
                        if let Some(pos) = expected {
                            model.swap_remove(pos);
                        }
                        prop_assert_eq!(
                            heap.remove_matching(&v, |k, e| k == e).is_some(),
                            expected.is_some()
                        );
                    }
                }
                prop_assert!(heap_property_holds(&heap));
                prop_assert_eq!(heap.len(), model.len());
            }
        }

        #[test]
        fn push_then_pop_yields_non_decreasing_order(
            values in prop::collection::vec(any::<i32>(), 0..100)
        ) {
            let mut heap = int_heap();
            for &v in &values {
                heap.push(v).unwrap();
            }
            let mut expected = values.clone();
            expected.sort_unstable();
            prop_assert_eq!(drain_sorted(&mut heap), expected);
        }

        #[test]
        fn removing_absent_key_changes_nothing(
            values in prop::collection::vec(0i32..1000, 0..64)
        ) {
            let mut heap = int_heap();
            for &v in &values {
                heap.push(v).unwrap();
            }
            let before = heap.entries.clone();
            prop_assert!(heap.remove_matching(&-1, |k, e| k == e).is_none());
            prop_assert_eq!(&heap.entries, &before);
        }

        #[test]
        fn removing_the_minimum_matches_pop(
            values in prop::collection::vec(any::<i32>(), 1..64)
        ) {
            let mut by_remove = int_heap();
            let mut by_pop = int_heap();
            for &v in &values {
                by_remove.push(v).unwrap();
                by_pop.push(v).unwrap();
            }
            let min = *by_remove.peek().unwrap();
            prop_assert_eq!(by_remove.remove_matching(&min, |k, e| k == e), by_pop.pop());
            prop_assert_eq!(drain_sorted(&mut by_remove), drain_sorted(&mut by_pop));
        }

        /// Every storage position, including the last slot and slots whose
        /// sibling or parent is the last slot, can be removed cleanly.
        #[test]
        fn removal_at_every_index_keeps_invariant(
            values in prop::collection::vec(any::<i32>(), 1..40)
        ) {
            let mut template = Heap::new(|a: &(i32, usize), b: &(i32, usize)| a.0.cmp(&b.0));
            for (seq, &v) in values.iter().enumerate() {
                template.push((v, seq)).unwrap();
            }
            let snapshot = template.entries.clone();

            for index in 0..snapshot.len() {
                let mut heap = Heap::new(|a: &(i32, usize), b: &(i32, usize)| a.0.cmp(&b.0));
                heap.entries = snapshot.clone();
                let target = snapshot[index].1;

                let removed = heap.remove_matching(&target, |k, e| e.1 == *k);
                prop_assert_eq!(removed.map(|e| e.1), Some(target));
                prop_assert!(heap_property_holds(&heap));
                prop_assert_eq!(heap.len(), snapshot.len() - 1);
            }
        }
    }
}
