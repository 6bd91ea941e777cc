// crates/aggrow-core/src/tree.rs

//! The merge tree: the binary hierarchical clustering output.
//!
//! Leaves are the original input points; every internal node records the
//! time a merge was accepted, the weighted-midpoint position of the new
//! glyph and its summed weight.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// One node of the merge tree.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MergeNode {
    /// Merge time; 0 for input leaves.
    pub at: f64,
    pub x: f64,
    pub y: f64,
    /// Summed weight of the subtree.
    pub n: u64,
    /// Empty for leaves, exactly two children for internal nodes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MergeNode>,
}

impl MergeNode {
    /// Leaf for an original input point.
    #[must_use]
    pub const fn leaf(x: f64, y: f64, n: u64) -> Self {
        Self {
            at: 0.0,
            x,
            y,
            n,
            children: Vec::new(),
        }
    }

    /// Internal node for an accepted merge.
    #[must_use]
    pub fn merged(at: f64, x: f64, y: f64, n: u64, left: Self, right: Self) -> Self {
        Self {
            at,
            x,
            y,
            n,
            children: vec![left, right],
        }
    }

    #[inline]
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    #[must_use]
    pub fn leaf_count(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            self.children.iter().map(Self::leaf_count).sum()
        }
    }

    #[must_use]
    pub fn internal_count(&self) -> usize {
        if self.is_leaf() {
            0
        } else {
            1 + self
                .children
                .iter()
                .map(Self::internal_count)
                .sum::<usize>()
        }
    }

    /// Visit every internal node, parents before children.
    pub fn visit_internal(&self, f: &mut impl FnMut(&Self)) {
        if !self.is_leaf() {
            f(self);
            for c in &self.children {
                c.visit_internal(f);
            }
        }
    }

    /// Check the structural merge-tree invariants within `eps`:
    /// binary nodes, summed weights, weighted-midpoint positions and
    /// merge times that never decrease toward the root.
    pub fn validate(&self, eps: f64) -> Result<()> {
        if self.is_leaf() {
            return Ok(());
        }
        ensure!(
            self.children.len() == 2,
            "internal node must have exactly 2 children, has {}",
            self.children.len()
        );
        let (l, r) = (&self.children[0], &self.children[1]);
        ensure!(
            self.n == l.n + r.n,
            "weight {} is not the sum of children ({} + {})",
            self.n,
            l.n,
            r.n
        );
        #[allow(clippy::cast_precision_loss)]
        let (ln, rn, n) = (l.n as f64, r.n as f64, self.n as f64);
        let mx = (l.x * ln + r.x * rn) / n;
        let my = (l.y * ln + r.y * rn) / n;
        ensure!(
            (self.x - mx).abs() <= eps && (self.y - my).abs() <= eps,
            "position ({}, {}) is not the weighted midpoint ({mx}, {my})",
            self.x,
            self.y
        );
        for c in &self.children {
            ensure!(
                c.at <= self.at + eps,
                "child merge time {} after parent {}",
                c.at,
                self.at
            );
            c.validate(eps)?;
        }
        Ok(())
    }
}

/// Clustering output: a single root after a complete run, several roots
/// only when the run was cancelled early.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct MergeTree {
    pub roots: Vec<MergeNode>,
}

impl MergeTree {
    #[must_use]
    pub fn root(&self) -> Option<&MergeNode> {
        if self.roots.len() == 1 {
            self.roots.first()
        } else {
            None
        }
    }

    /// `true` when clustering ran to completion (or had at most one input).
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.roots.len() <= 1
    }

    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.roots.iter().map(MergeNode::leaf_count).sum()
    }

    #[must_use]
    pub fn internal_count(&self) -> usize {
        self.roots.iter().map(MergeNode::internal_count).sum()
    }

    /// `(at, n, x, y)` of every internal node, sorted; the comparison key
    /// for equivalence of two runs up to tie-breaking.
    #[must_use]
    pub fn merge_records(&self) -> Vec<(f64, u64, f64, f64)> {
        let mut out = Vec::with_capacity(self.internal_count());
        for r in &self.roots {
            r.visit_internal(&mut |node| out.push((node.at, node.n, node.x, node.y)));
        }
        out.sort_by(|a, b| {
            a.0.total_cmp(&b.0)
                .then(a.1.cmp(&b.1))
                .then(a.2.total_cmp(&b.2))
                .then(a.3.total_cmp(&b.3))
        });
        out
    }

    /// Validate every root (see [`MergeNode::validate`]).
    pub fn validate(&self, eps: f64) -> Result<()> {
        for r in &self.roots {
            r.validate(eps)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_leaf_tree() -> MergeTree {
        let l = MergeNode::leaf(-1.0, 0.0, 1);
        let r = MergeNode::leaf(1.0, 0.0, 1);
        MergeTree {
            roots: vec![MergeNode::merged(1.0, 0.0, 0.0, 2, l, r)],
        }
    }

    #[test]
    fn counts_and_completeness() {
        let t = two_leaf_tree();
        assert!(t.is_complete());
        assert_eq!(t.leaf_count(), 2);
        assert_eq!(t.internal_count(), 1);
        assert_eq!(t.root().unwrap().n, 2);
    }

    #[test]
    fn validate_accepts_well_formed_tree() {
        two_leaf_tree().validate(1e-9).unwrap();
    }

    #[test]
    fn validate_rejects_bad_weight() {
        let mut t = two_leaf_tree();
        t.roots[0].n = 3;
        assert!(t.validate(1e-9).is_err());
    }

    #[test]
    fn validate_rejects_off_midpoint() {
        let mut t = two_leaf_tree();
        t.roots[0].x = 0.5;
        assert!(t.validate(1e-9).is_err());
    }

    #[test]
    fn merge_records_are_sorted() {
        let a = MergeNode::merged(
            2.0,
            0.0,
            0.0,
            2,
            MergeNode::leaf(-2.0, 0.0, 1),
            MergeNode::leaf(2.0, 0.0, 1),
        );
        let b = MergeNode::merged(
            1.0,
            5.0,
            0.0,
            2,
            MergeNode::leaf(4.0, 0.0, 1),
            MergeNode::leaf(6.0, 0.0, 1),
        );
        let t = MergeTree { roots: vec![a, b] };
        let recs = t.merge_records();
        assert_eq!(recs.len(), 2);
        assert!(recs[0].0 <= recs[1].0);
    }
}
