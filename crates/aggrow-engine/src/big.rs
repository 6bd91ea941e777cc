// crates/aggrow-engine/src/big.rs

//! Secondary queues for the big-glyph optimization.
//!
//! Merge candidates involving a tracked ("big") glyph are kept out of the
//! primary queue. Each big glyph owns a queue of uncertain merges keyed by
//! a lower bound on the real merge time; entries are revalidated lazily
//! when their bound comes due and either promoted to the primary queue
//! with their actual time or re-inserted with a refreshed bound.

use aggrow_core::GlyphId;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// A still-pending merge with one big participant.
#[derive(Clone, Copy, Debug)]
pub struct UncertainMerge {
    /// Lower bound on the merge time; the queue key.
    pub lb: f64,
    /// Cached actual intersection time at creation.
    pub at: f64,
    pub a: GlyphId,
    pub b: GlyphId,
    pub seq: u64,
}

impl PartialEq for UncertainMerge {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for UncertainMerge {}

impl PartialOrd for UncertainMerge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for UncertainMerge {
    fn cmp(&self, other: &Self) -> Ordering {
        self.lb
            .total_cmp(&other.lb)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Per-big-glyph min-heap of uncertain merges, keyed by lower bound.
#[derive(Clone, Debug, Default)]
pub struct UncertainQueue {
    heap: BinaryHeap<Reverse<UncertainMerge>>,
}

impl UncertainQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: UncertainMerge) {
        debug_assert!(entry.lb.is_finite() && entry.lb <= entry.at);
        self.heap.push(Reverse(entry));
    }

    /// Smallest lower bound currently queued.
    #[must_use]
    pub fn peek_lb(&self) -> Option<f64> {
        self.heap.peek().map(|Reverse(e)| e.lb)
    }

    /// Pop the head entry if its bound is at or below `bound`.
    pub fn pop_if_due(&mut self, bound: f64) -> Option<UncertainMerge> {
        if self.peek_lb()? <= bound {
            self.heap.pop().map(|Reverse(e)| e)
        } else {
            None
        }
    }

    /// Take over all entries of another queue (used when a big glyph is
    /// absorbed into a composite that stays tracked).
    pub fn absorb(&mut self, other: Self) {
        for Reverse(e) in other.heap {
            self.heap.push(Reverse(e));
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
