/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Priority-ordered queue: a thin vocabulary layer over [`Heap`].

use std::cmp::Ordering;

use crate::heap::{CapacityError, Heap};

/// Queue that always dequeues the entry with the highest priority, as
/// defined by the comparator (`Less` = dequeued first).
pub struct PriorityQueue<T, F> {
    heap: Heap<T, F>,
}

impl<T, F> PriorityQueue<T, F>
where
    F: Fn(&T, &T) -> Ordering,
{
    pub fn new(priority: F) -> Self {
        Self {
            heap: Heap::new(priority),
        }
    }

    /// # Errors
    /// Hands `item` back inside [`CapacityError`] if storage cannot grow.
    pub fn enqueue(&mut self, item: T) -> Result<(), CapacityError<T>> {
        self.heap.push(item)
    }

    pub fn dequeue(&mut self) -> Option<T> {
        self.heap.pop()
    }

    pub fn peek(&self) -> Option<&T> {
        self.heap.peek()
    }

    /// Remove the first queued entry for which `matches(key, entry)` holds.
    pub fn erase<K, P>(&mut self, key: &K, matches: P) -> Option<T>
    where
        K: ?Sized,
        P: Fn(&K, &T) -> bool,
    {
        self.heap.remove_matching(key, matches)
    }

    /// Dequeue and drop every entry, highest priority first.
    pub fn clear(&mut self) {
        while self.dequeue().is_some() {}
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
