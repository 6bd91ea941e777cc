// crates/aggrow-points/src/format.rs

//! The weighted-point record and input-contract helpers.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One input point: a center and an integer weight.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct WeightedPoint {
    pub x: f64,
    pub y: f64,
    /// Weight; defaults to 1 in textual formats.
    #[serde(default = "default_weight")]
    pub n: u64,
}

const fn default_weight() -> u64 {
    1
}

impl WeightedPoint {
    #[must_use]
    pub const fn new(x: f64, y: f64, n: u64) -> Self {
        Self { x, y, n }
    }
}

/// Check the engine's input contract: finite coordinates, positive
/// weights, pairwise distinct centers.
pub fn validate(points: &[WeightedPoint]) -> Result<()> {
    let mut seen = HashMap::new();
    for (i, p) in points.iter().enumerate() {
        ensure!(
            p.x.is_finite() && p.y.is_finite(),
            "point {i}: non-finite coordinate ({}, {})",
            p.x,
            p.y
        );
        ensure!(p.n >= 1, "point {i}: weight must be >= 1");
        if let Some(first) = seen.insert((p.x.to_bits(), p.y.to_bits()), i) {
            anyhow::bail!(
                "points {first} and {i} share the center ({}, {}); pre-sum duplicates",
                p.x,
                p.y
            );
        }
    }
    Ok(())
}

/// Merge points with identical centers by summing their weights,
/// keeping first-seen order. This is the pre-summing the engine's input
/// contract asks the caller for.
#[must_use]
pub fn sum_duplicates(points: Vec<WeightedPoint>) -> Vec<WeightedPoint> {
    let mut index: HashMap<(u64, u64), usize> = HashMap::new();
    let mut out: Vec<WeightedPoint> = Vec::with_capacity(points.len());
    for p in points {
        match index.entry((p.x.to_bits(), p.y.to_bits())) {
            std::collections::hash_map::Entry::Occupied(e) => {
                out[*e.get()].n += p.n;
            }
            std::collections::hash_map::Entry::Vacant(e) => {
                e.insert(out.len());
                out.push(p);
            }
        }
    }
    out
}
