// crates/aggrow-core/src/compress.rs

//! Compression thresholds.
//!
//! A sorted set of `(threshold, factor)` pairs with factors in `(0, 1]`.
//! A glyph with weight `n` uses the factor of the greatest threshold `≤ n`
//! (1.0 when none applies); the matched entry's 1-based position is the
//! compression level, which determines the extra shape border `2·level`.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// One compression step.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct CompressionEntry {
    /// Weight at which this entry starts applying.
    pub threshold: u64,
    /// Factor in `(0, 1]` multiplied into the effective growth rate.
    pub factor: f64,
}

/// Ordered compression schedule.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct CompressionSchedule {
    entries: Vec<CompressionEntry>,
}

impl CompressionSchedule {
    /// Build a schedule, sorting by threshold.
    ///
    /// Rejects factors outside `(0, 1]` and duplicate thresholds.
    pub fn new(mut entries: Vec<CompressionEntry>) -> Result<Self> {
        for e in &entries {
            ensure!(
                e.factor > 0.0 && e.factor <= 1.0,
                "compression factor {} for threshold {} not in (0, 1]",
                e.factor,
                e.threshold
            );
        }
        entries.sort_by_key(|e| e.threshold);
        ensure!(
            entries.windows(2).all(|w| w[0].threshold < w[1].threshold),
            "duplicate compression threshold"
        );
        Ok(Self { entries })
    }

    /// Schedule with no entries; every glyph stays uncompressed.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[CompressionEntry] {
        &self.entries
    }

    /// `(level, factor)` applicable to weight `n`; `(0, 1.0)` when no
    /// threshold is reached.
    #[must_use]
    pub fn level_for(&self, n: u64) -> (u32, f64) {
        let applicable = self.entries.partition_point(|e| e.threshold <= n);
        if applicable == 0 {
            (0, 1.0)
        } else {
            let level = u32::try_from(applicable).unwrap_or(u32::MAX);
            (level, self.entries[applicable - 1].factor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule() -> CompressionSchedule {
        CompressionSchedule::new(vec![
            CompressionEntry {
                threshold: 1000,
                factor: 0.5,
            },
            CompressionEntry {
                threshold: 10_000,
                factor: 0.25,
            },
        ])
        .unwrap()
    }

    #[test]
    fn greatest_threshold_wins() {
        let s = schedule();
        assert_eq!(s.level_for(1), (0, 1.0));
        assert_eq!(s.level_for(999), (0, 1.0));
        assert_eq!(s.level_for(1000), (1, 0.5));
        assert_eq!(s.level_for(9999), (1, 0.5));
        assert_eq!(s.level_for(10_000), (2, 0.25));
        assert_eq!(s.level_for(u64::MAX), (2, 0.25));
    }

    #[test]
    fn rejects_bad_factor() {
        assert!(CompressionSchedule::new(vec![CompressionEntry {
            threshold: 10,
            factor: 0.0,
        }])
        .is_err());
        assert!(CompressionSchedule::new(vec![CompressionEntry {
            threshold: 10,
            factor: 1.5,
        }])
        .is_err());
    }

    #[test]
    fn rejects_duplicate_thresholds() {
        assert!(CompressionSchedule::new(vec![
            CompressionEntry {
                threshold: 10,
                factor: 0.5,
            },
            CompressionEntry {
                threshold: 10,
                factor: 0.25,
            },
        ])
        .is_err());
    }

    #[test]
    fn unsorted_input_is_sorted() {
        let s = CompressionSchedule::new(vec![
            CompressionEntry {
                threshold: 100,
                factor: 0.5,
            },
            CompressionEntry {
                threshold: 10,
                factor: 0.9,
            },
        ])
        .unwrap();
        assert_eq!(s.level_for(50), (1, 0.9));
        assert_eq!(s.level_for(100), (2, 0.5));
    }
}
