// crates/aggrow-engine/src/naive.rs

//! Naive quadratic clusterer, kept for cross-validation.
//!
//! Same grow-function and compression semantics as the engine, but no
//! spatial index and no event pruning beyond liveness: every pair gets a
//! candidate, the earliest valid one merges, and the composite is paired
//! against every survivor. Slow and obviously correct.

use aggrow_core::error::invalid_input;
use aggrow_core::{EngineConfig, Glyph, GlyphArena, GlyphId, GrowFunction, MergeNode, MergeTree};
use anyhow::Result;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};

#[derive(Clone, Copy, Debug)]
struct Candidate {
    at: f64,
    seq: u64,
    a: GlyphId,
    b: GlyphId,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at
            .total_cmp(&other.at)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Cluster weighted points by exhaustive pairwise prediction.
pub fn cluster(
    points: &[(f64, f64, u64)],
    mut grow: GrowFunction,
    cfg: &EngineConfig,
    compression: bool,
) -> Result<MergeTree> {
    cfg.validate()?;
    let mut centers = HashSet::new();
    for &(x, y, n) in points {
        if !x.is_finite() || !y.is_finite() {
            return Err(invalid_input(format!("non-finite coordinate ({x}, {y})")));
        }
        if n == 0 {
            return Err(invalid_input(format!("weight of ({x}, {y}) must be >= 1")));
        }
        if !centers.insert((x.to_bits(), y.to_bits())) {
            return Err(invalid_input(format!(
                "duplicate center ({x}, {y}); pre-sum duplicate points"
            )));
        }
    }
    if points.is_empty() {
        return Ok(MergeTree::default());
    }

    let total: u64 = points.iter().map(|&(_, _, n)| n).sum();
    grow.calibrate(total, cfg.max_radius);

    let mut arena = GlyphArena::new();
    let mut roots: HashMap<GlyphId, MergeNode> = HashMap::new();
    let mut alive: Vec<GlyphId> = Vec::with_capacity(points.len());
    for &(x, y, n) in points {
        let mut g = Glyph::new(x, y, n);
        if compression {
            let (level, factor) = cfg.compression.level_for(n);
            g.level = level;
            g.factor = factor;
        }
        let id = arena.alloc(g);
        roots.insert(id, MergeNode::leaf(x, y, n));
        alive.push(id);
    }

    let mut heap: BinaryHeap<Reverse<Candidate>> = BinaryHeap::new();
    let mut seq = 0u64;
    let push = |heap: &mut BinaryHeap<Reverse<Candidate>>,
                    arena: &GlyphArena,
                    seq: &mut u64,
                    now: f64,
                    a: GlyphId,
                    b: GlyphId| {
        let at = grow.intersect_at(&arena[a], &arena[b]);
        if at.is_finite() {
            heap.push(Reverse(Candidate {
                at: at.max(now),
                seq: *seq,
                a,
                b,
            }));
            *seq += 1;
        }
    };

    for (i, &a) in alive.iter().enumerate() {
        for &b in &alive[i + 1..] {
            push(&mut heap, &arena, &mut seq, 0.0, a, b);
        }
    }

    let mut live = alive.len();
    let mut now = 0.0f64;
    while live >= 2 {
        let Some(Reverse(c)) = heap.pop() else {
            break;
        };
        if !arena[c.a].alive || !arena[c.b].alive {
            continue;
        }
        now = now.max(c.at);

        let (ax, ay, an) = (arena[c.a].x, arena[c.a].y, arena[c.a].n);
        let (bx, by, bn) = (arena[c.b].x, arena[c.b].y, arena[c.b].n);
        let n = an + bn;
        #[allow(clippy::cast_precision_loss)]
        let (anf, bnf, nf) = (an as f64, bn as f64, n as f64);
        let mut g = Glyph::new((ax * anf + bx * bnf) / nf, (ay * anf + by * bnf) / nf, n);
        if compression {
            let (level, factor) = cfg.compression.level_for(n);
            g.level = level;
            g.factor = factor;
        }
        let m = arena.alloc(g);

        let left = roots.remove(&c.a).expect("live glyph has a root");
        let right = roots.remove(&c.b).expect("live glyph has a root");
        let node = MergeNode::merged(c.at, arena[m].x, arena[m].y, n, left, right);
        roots.insert(m, node);

        arena[c.a].alive = false;
        arena[c.b].alive = false;
        alive.retain(|&id| arena[id].alive);
        for &h in &alive {
            push(&mut heap, &arena, &mut seq, now, m, h);
        }
        alive.push(m);
        live -= 1;
    }

    let mut out: Vec<MergeNode> = roots.drain().map(|(_, node)| node).collect();
    out.sort_by(|a, b| {
        b.n.cmp(&a.n)
            .then_with(|| a.x.total_cmp(&b.x))
            .then_with(|| a.y.total_cmp(&b.y))
    });
    Ok(MergeTree { roots: out })
}
