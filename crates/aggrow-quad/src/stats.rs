// crates/aggrow-quad/src/stats.rs

//! Aggregate quadtree statistics, for inspection and the CLI `stats`
//! subcommand.

use std::fmt;

/// Snapshot of tree shape and bookkeeping counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Cells ever allocated (live + retired).
    pub cells: usize,
    pub leaves: usize,
    pub internal: usize,
    pub retired: usize,
    pub max_depth: usize,
    /// Total leaf-membership entries over all leaves.
    pub glyph_links: usize,
    pub splits: u64,
    pub joins: u64,
}

impl fmt::Display for TreeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} leaves, {} internal, {} retired (depth {}, {} glyph links, {} splits, {} joins)",
            self.leaves,
            self.internal,
            self.retired,
            self.max_depth,
            self.glyph_links,
            self.splits,
            self.joins
        )
    }
}
