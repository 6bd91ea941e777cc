// crates/aggrow-core/src/config.rs

//! Engine tunables.

use crate::compress::CompressionSchedule;
use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// Tunable constants of the clustering engine.
///
/// Serde-derived so runs are reproducible from a JSON config file.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Leaf capacity before a split is attempted. Large runtime impact.
    pub max_glyphs_per_cell: usize,
    /// Minimum leaf side length; smaller leaves never split.
    pub min_cell_size: f64,
    /// Target radius of the heaviest glyph under the logarithmic speed.
    pub max_radius: f64,
    /// Weight at which the big-glyph optimization starts tracking a glyph.
    pub big_glyph_threshold: u64,
    /// Tolerance for same-time comparisons.
    pub double_epsilon: f64,
    /// Compression thresholds (applied when the compression option is on).
    pub compression: CompressionSchedule,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_glyphs_per_cell: 10,
            min_cell_size: 0.001,
            max_radius: 256.0,
            big_glyph_threshold: 100,
            double_epsilon: 1e-7,
            compression: CompressionSchedule::empty(),
        }
    }
}

impl EngineConfig {
    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.max_glyphs_per_cell >= 1, "leaf capacity must be >= 1");
        ensure!(
            self.min_cell_size > 0.0 && self.min_cell_size.is_finite(),
            "min_cell_size must be positive and finite"
        );
        ensure!(
            self.max_radius > 0.0 && self.max_radius.is_finite(),
            "max_radius must be positive and finite"
        );
        ensure!(
            self.double_epsilon >= 0.0 && self.double_epsilon.is_finite(),
            "double_epsilon must be non-negative and finite"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_capacity_rejected() {
        let cfg = EngineConfig {
            max_glyphs_per_cell: 0,
            ..EngineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn config_roundtrips_through_json() {
        let cfg = EngineConfig::default();
        let s = serde_json::to_string(&cfg).unwrap();
        let back: EngineConfig = serde_json::from_str(&s).unwrap();
        assert_eq!(cfg, back);
    }
}
