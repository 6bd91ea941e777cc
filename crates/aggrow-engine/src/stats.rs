// crates/aggrow-engine/src/stats.rs

//! Counters the engine fills while clustering.
//!
//! A plain struct rather than a global sink: the core is single-threaded
//! and the counters are read after `cluster()` returns.

use std::fmt;

/// Event and merge bookkeeping for one clustering run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub events_pushed: u64,
    pub events_popped: u64,
    pub merges: u64,
    /// Merge events dropped because a participant was already dead.
    pub merges_discarded: u64,
    pub out_of_cell_handled: u64,
    /// Out-of-cell events dropped as stale (dead glyph, retired or split
    /// cell, membership gone).
    pub out_of_cell_discarded: u64,
    pub uncertain_recorded: u64,
    pub uncertain_promoted: u64,
    pub uncertain_reinserted: u64,
    pub uncertain_dropped: u64,
    pub peak_queue_len: usize,
}

impl fmt::Display for EngineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} merges ({} stale), {} out-of-cells ({} stale), {}/{} events popped/pushed, \
             uncertain {}+{}r/{}p/{}d, peak queue {}",
            self.merges,
            self.merges_discarded,
            self.out_of_cell_handled,
            self.out_of_cell_discarded,
            self.events_popped,
            self.events_pushed,
            self.uncertain_recorded,
            self.uncertain_reinserted,
            self.uncertain_promoted,
            self.uncertain_dropped,
            self.peak_queue_len
        )
    }
}
