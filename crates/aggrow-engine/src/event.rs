// crates/aggrow-engine/src/event.rs

//! Timestamped geometric events.
//!
//! Events are immutable snapshots of what was known when they were
//! created; obsolete ones are filtered lazily when popped. The total
//! order is `(at, kind, seq)`: ascending time, merges before
//! out-of-cells on ties, then creation sequence so replays are
//! deterministic.

use aggrow_core::{CellId, GlyphId, Side};
use std::cmp::Ordering;

/// What happens, and to whom.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// Two glyph boundaries touch.
    Merge { a: GlyphId, b: GlyphId },
    /// A glyph's shape crosses one side of a cell it is enrolled in.
    OutOfCell {
        glyph: GlyphId,
        cell: CellId,
        side: Side,
    },
}

impl EventKind {
    /// Tie-break rank: merges win simultaneous pops.
    #[inline]
    #[must_use]
    pub const fn priority(&self) -> u8 {
        match self {
            Self::Merge { .. } => 0,
            Self::OutOfCell { .. } => 1,
        }
    }
}

/// An event with its predicted time and creation sequence number.
#[derive(Clone, Copy, Debug)]
pub struct Event {
    pub at: f64,
    pub seq: u64,
    pub kind: EventKind,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at
            .total_cmp(&other.at)
            .then_with(|| self.kind.priority().cmp(&other.kind.priority()))
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merge(at: f64, seq: u64) -> Event {
        Event {
            at,
            seq,
            kind: EventKind::Merge {
                a: GlyphId(0),
                b: GlyphId(1),
            },
        }
    }

    fn out_of_cell(at: f64, seq: u64) -> Event {
        Event {
            at,
            seq,
            kind: EventKind::OutOfCell {
                glyph: GlyphId(0),
                cell: CellId(0),
                side: Side::Top,
            },
        }
    }

    #[test]
    fn earlier_time_wins() {
        assert!(merge(1.0, 5) < merge(2.0, 0));
    }

    #[test]
    fn merge_beats_out_of_cell_on_equal_time() {
        assert!(merge(1.0, 9) < out_of_cell(1.0, 0));
    }

    #[test]
    fn sequence_breaks_exact_ties() {
        assert!(merge(1.0, 0) < merge(1.0, 1));
        assert_eq!(merge(1.0, 3), merge(1.0, 3));
    }
}
