// crates/aggrow-engine/src/queue.rs

//! The global event queue: a binary min-heap keyed by `(at, kind, seq)`.
//!
//! There is no decrease-key; obsolete events stay in the heap and are
//! filtered by the engine when popped.

use crate::event::{Event, EventKind};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Min-heap of events with automatic creation-sequence numbering.
#[derive(Clone, Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<Event>>,
    next_seq: u64,
}

impl EventQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an event; `at` must be finite (impossible times are the
    /// caller's job to drop).
    pub fn push(&mut self, at: f64, kind: EventKind) {
        debug_assert!(at.is_finite(), "queue only holds events that occur");
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Event { at, seq, kind }));
    }

    /// Pop the chronologically next event.
    pub fn pop(&mut self) -> Option<Event> {
        self.heap.pop().map(|Reverse(e)| e)
    }

    #[must_use]
    pub fn peek(&self) -> Option<&Event> {
        self.heap.peek().map(|Reverse(e)| e)
    }

    /// Time of the next event, if any.
    #[must_use]
    pub fn next_at(&self) -> Option<f64> {
        self.peek().map(|e| e.at)
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
