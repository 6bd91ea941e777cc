// crates/aggrow-engine/src/engine.rs

//! The clustering engine: seeding, the chronological event loop, and the
//! per-event handlers.
//!
//! The main-loop invariant: the queue always contains at least one event
//! for the next-occurring interaction between currently-live glyphs, plus
//! possibly stale events, which are discarded on pop. Event times are
//! clamped to the current simulation time so popped times never decrease.

use crate::big::{UncertainMerge, UncertainQueue};
use crate::event::{Event, EventKind};
use crate::queue::EventQueue;
use crate::stats::EngineStats;
use aggrow_core::error::{internal_invariant, invalid_input};
use aggrow_core::{
    CellId, EngineConfig, Glyph, GlyphArena, GlyphId, GrowFunction, MergeNode, MergeTree, Rect,
    Side,
};
use aggrow_quad::QuadTree;
use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Per-run switches of [`Engine::cluster`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClusterOptions {
    /// Track glyphs into neighboring cells as they grow. Disabling this
    /// restricts merges to cell-sharing glyphs (debugging switch).
    pub include_out_of_cell: bool,
    /// Call the step hook between events.
    pub step: bool,
    /// Enable the big-glyph secondary queues.
    pub big_glyphs: bool,
    /// Apply the configured compression thresholds.
    pub compression: bool,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            include_out_of_cell: true,
            step: false,
            big_glyphs: false,
            compression: false,
        }
    }
}

type StepHook = Box<dyn FnMut(&Event)>;

/// Event-driven agglomerative clustering over growing glyphs.
pub struct Engine {
    grow: GrowFunction,
    cfg: EngineConfig,
    arena: GlyphArena,
    tree: QuadTree,
    queue: EventQueue,
    uncertain: HashMap<GlyphId, UncertainQueue>,
    roots: HashMap<GlyphId, MergeNode>,
    stats: EngineStats,
    centers: HashSet<(u64, u64)>,
    now: f64,
    live: usize,
    uncertain_seq: u64,
    done: bool,
    cancel: Option<Arc<AtomicBool>>,
    step_hook: Option<StepHook>,
}

impl Engine {
    /// New engine over the given world with the given grow function.
    pub fn new(bounds: Rect, grow: GrowFunction, cfg: EngineConfig) -> Result<Self> {
        cfg.validate()?;
        let tree = QuadTree::new(bounds, cfg.max_glyphs_per_cell, cfg.min_cell_size);
        Ok(Self {
            grow,
            cfg,
            arena: GlyphArena::new(),
            tree,
            queue: EventQueue::new(),
            uncertain: HashMap::new(),
            roots: HashMap::new(),
            stats: EngineStats::default(),
            centers: HashSet::new(),
            now: 0.0,
            live: 0,
            uncertain_seq: 0,
            done: false,
            cancel: None,
            step_hook: None,
        })
    }

    /// Seed one weighted point. Only valid before [`Self::cluster`].
    pub fn insert_point(&mut self, x: f64, y: f64, n: u64) -> Result<GlyphId> {
        if self.done {
            return Err(invalid_input("cannot seed points after cluster() ran"));
        }
        if !x.is_finite() || !y.is_finite() {
            return Err(invalid_input(format!("non-finite coordinate ({x}, {y})")));
        }
        if n == 0 {
            return Err(invalid_input(format!("weight of ({x}, {y}) must be >= 1")));
        }
        if !self.tree.bounds().contains(x, y) {
            return Err(invalid_input(format!(
                "point ({x}, {y}) outside the world {}",
                self.tree.bounds()
            )));
        }
        if !self.centers.insert((x.to_bits(), y.to_bits())) {
            return Err(invalid_input(format!(
                "duplicate center ({x}, {y}); pre-sum duplicate points"
            )));
        }

        let id = self.arena.alloc(Glyph::new(x, y, n));
        self.tree.insert_center_of(&mut self.arena, id)?;
        self.live += 1;
        Ok(id)
    }

    /// The quadtree, for statistics.
    #[must_use]
    pub fn tree(&self) -> &QuadTree {
        &self.tree
    }

    #[must_use]
    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Flag checked between event pops; setting it ends the run early
    /// with a partial but structurally valid forest.
    pub fn set_cancel_flag(&mut self, flag: Arc<AtomicBool>) {
        self.cancel = Some(flag);
    }

    /// Hook called between events when the `step` option is on.
    pub fn set_step_hook(&mut self, hook: impl FnMut(&Event) + 'static) {
        self.step_hook = Some(Box::new(hook));
    }

    /// Run the clustering to completion and return the merge tree.
    pub fn cluster(&mut self, opts: &ClusterOptions) -> Result<MergeTree> {
        if self.done {
            return Err(invalid_input("cluster() already ran on this engine"));
        }
        self.done = true;

        let ids: Vec<GlyphId> = self.arena.live_ids().collect();
        if ids.is_empty() {
            return Ok(MergeTree::default());
        }
        let total: u64 = ids.iter().map(|&id| self.arena[id].n).sum();
        self.grow.calibrate(total, self.cfg.max_radius);

        for &id in &ids {
            let n = self.arena[id].n;
            let (level, factor) = if opts.compression {
                self.cfg.compression.level_for(n)
            } else {
                (0, 1.0)
            };
            let g = &mut self.arena[id];
            g.level = level;
            g.factor = factor;
            g.track = opts.big_glyphs && n >= self.cfg.big_glyph_threshold;
            self.roots.insert(id, MergeNode::leaf(g.x, g.y, n));
        }

        self.seed_events(opts);
        debug!(
            glyphs = self.live,
            total_weight = total,
            events = self.queue.len(),
            "seeded event queue"
        );

        while self.live >= 2 {
            if self.cancelled() {
                debug!(live = self.live, "clustering cancelled");
                break;
            }
            self.promote_uncertain();
            self.stats.peak_queue_len = self.stats.peak_queue_len.max(self.queue.len());

            let Some(event) = self.queue.pop() else {
                if opts.include_out_of_cell {
                    return Err(internal_invariant(
                        "event queue drained with >= 2 live glyphs",
                    ));
                }
                break;
            };
            self.stats.events_popped += 1;
            if event.at + self.cfg.double_epsilon < self.now {
                return Err(internal_invariant(format!(
                    "event time {} before current time {}",
                    event.at, self.now
                )));
            }
            self.now = self.now.max(event.at);

            if opts.step {
                if let Some(hook) = self.step_hook.as_mut() {
                    hook(&event);
                }
            }

            match event.kind {
                EventKind::Merge { a, b } => self.handle_merge(event.at, a, b, opts)?,
                EventKind::OutOfCell { glyph, cell, side } => {
                    self.handle_out_of_cell(event.at, glyph, cell, side, opts)?;
                }
            }
        }

        debug!(merges = self.stats.merges, "clustering finished");
        let mut roots: Vec<MergeNode> = self.roots.drain().map(|(_, node)| node).collect();
        roots.sort_by(|a, b| {
            b.n.cmp(&a.n)
                .then_with(|| a.x.total_cmp(&b.x))
                .then_with(|| a.y.total_cmp(&b.y))
        });
        Ok(MergeTree { roots })
    }

    // ---- seeding ----

    /// Initial events: out-of-cell times for every glyph against every
    /// side of its leaf, and a merge candidate per cell-sharing pair.
    fn seed_events(&mut self, opts: &ClusterOptions) {
        let leaves: Vec<CellId> = self.tree.leaves().collect();
        for leaf in leaves {
            let glyphs: Vec<GlyphId> = self.tree.leaf_glyphs(leaf).to_vec();
            if opts.include_out_of_cell {
                for &g in &glyphs {
                    for side in Side::ALL {
                        self.push_out_of_cell(g, leaf, side);
                    }
                }
            }
            for (i, &a) in glyphs.iter().enumerate() {
                for &b in &glyphs[i + 1..] {
                    self.record_candidate(a, b, opts);
                }
            }
        }
    }

    // ---- event generation ----

    fn push_out_of_cell(&mut self, g: GlyphId, cell: CellId, side: Side) {
        let rect = self.tree.rect(cell);
        let t = self.grow.exit_at(&self.arena[g], &rect, side);
        if t.is_finite() {
            self.queue
                .push(t.max(self.now), EventKind::OutOfCell { glyph: g, cell, side });
            self.stats.events_pushed += 1;
        }
    }

    /// Record a merge candidate: into the primary queue, or into the big
    /// participant's uncertain queue when the optimization tracks one.
    fn record_candidate(&mut self, a: GlyphId, b: GlyphId, opts: &ClusterOptions) {
        let t = self.grow.intersect_at(&self.arena[a], &self.arena[b]);
        if !t.is_finite() {
            return;
        }
        let t = t.max(self.now);

        if opts.big_glyphs && (self.arena[a].track || self.arena[b].track) {
            let key = match (self.arena[a].track, self.arena[b].track) {
                (true, false) => a,
                (false, true) => b,
                // Both big: file under the heavier one.
                _ => {
                    if self.arena[a].n >= self.arena[b].n {
                        a
                    } else {
                        b
                    }
                }
            };
            let lb = t * self.damping(a, b);
            let seq = self.uncertain_seq;
            self.uncertain_seq += 1;
            self.uncertain
                .entry(key)
                .or_default()
                .push(UncertainMerge { lb, at: t, a, b, seq });
            self.stats.uncertain_recorded += 1;
        } else {
            self.queue.push(t, EventKind::Merge { a, b });
            self.stats.events_pushed += 1;
        }
    }

    /// Damping factor turning a cached merge time into a lower bound that
    /// survives further growth of the big participant.
    fn damping(&self, a: GlyphId, b: GlyphId) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let (na, nb) = (self.arena[a].n as f64, self.arena[b].n as f64);
        let frac = na.max(nb) / (na + nb);
        frac * frac
    }

    /// Move every uncertain merge whose lower bound comes due before the
    /// next primary event into the primary queue (revalidated), or back
    /// into its queue with a refreshed bound.
    fn promote_uncertain(&mut self) {
        if self.uncertain.is_empty() {
            return;
        }
        let eps = self.cfg.double_epsilon;
        let mut horizon = self.queue.next_at().unwrap_or(f64::INFINITY);
        let keys: Vec<GlyphId> = self.uncertain.keys().copied().collect();

        for key in keys {
            let mut due = Vec::new();
            if let Some(q) = self.uncertain.get_mut(&key) {
                while let Some(entry) = q.pop_if_due(horizon + eps) {
                    due.push(entry);
                }
            }

            let mut keep = Vec::new();
            for entry in due {
                let a = self.arena.composite_root(entry.a);
                let b = self.arena.composite_root(entry.b);
                if a == b || !self.arena.alive(a) || !self.arena.alive(b) {
                    self.stats.uncertain_dropped += 1;
                    continue;
                }
                // Only recompute when a participant changed; the cached
                // time still refers to a real intersection otherwise.
                let at = if a == entry.a && b == entry.b {
                    entry.at
                } else {
                    self.grow.intersect_at(&self.arena[a], &self.arena[b])
                };
                if !at.is_finite() {
                    self.stats.uncertain_dropped += 1;
                    continue;
                }
                if at <= horizon + eps {
                    let at = at.max(self.now);
                    self.queue.push(at, EventKind::Merge { a, b });
                    self.stats.events_pushed += 1;
                    self.stats.uncertain_promoted += 1;
                    horizon = horizon.min(at);
                } else {
                    keep.push(UncertainMerge {
                        lb: at * self.damping(a, b),
                        at,
                        a,
                        b,
                        seq: entry.seq,
                    });
                    self.stats.uncertain_reinserted += 1;
                }
            }
            if let Some(q) = self.uncertain.get_mut(&key) {
                for entry in keep {
                    q.push(entry);
                }
            }
        }
    }

    // ---- handlers ----

    fn handle_merge(&mut self, at: f64, a: GlyphId, b: GlyphId, opts: &ClusterOptions) -> Result<()> {
        if !self.arena[a].alive || !self.arena[b].alive {
            self.stats.merges_discarded += 1;
            return Ok(());
        }
        if a == b {
            return Err(internal_invariant(format!("self-merge of {a}")));
        }

        let (ax, ay, an) = (self.arena[a].x, self.arena[a].y, self.arena[a].n);
        let (bx, by, bn) = (self.arena[b].x, self.arena[b].y, self.arena[b].n);
        let n = an + bn;
        #[allow(clippy::cast_precision_loss)]
        let (anf, bnf, nf) = (an as f64, bn as f64, n as f64);
        let cx = (ax * anf + bx * bnf) / nf;
        let cy = (ay * anf + by * bnf) / nf;
        trace!(%a, %b, at, x = cx, y = cy, n, "merge");

        let left = self
            .roots
            .remove(&a)
            .ok_or_else(|| internal_invariant(format!("no merge-tree root for live glyph {a}")))?;
        let right = self
            .roots
            .remove(&b)
            .ok_or_else(|| internal_invariant(format!("no merge-tree root for live glyph {b}")))?;

        let mut glyph = Glyph::new(cx, cy, n);
        let (level, factor) = if opts.compression {
            self.cfg.compression.level_for(n)
        } else {
            (0, 1.0)
        };
        glyph.level = level;
        glyph.factor = factor;
        glyph.track = opts.big_glyphs && n >= self.cfg.big_glyph_threshold;
        let m = self.arena.alloc(glyph);
        self.roots
            .insert(m, MergeNode::merged(at, cx, cy, n, left, right));

        if opts.big_glyphs {
            let qa = self.uncertain.remove(&a);
            let qb = self.uncertain.remove(&b);
            if self.arena[m].track {
                let mut q = qa.unwrap_or_default();
                if let Some(other) = qb {
                    q.absorb(other);
                }
                self.uncertain.insert(m, q);
            } else {
                // Tracking is monotone in weight; an untracked composite
                // cannot descend from a tracked glyph.
                debug_assert!(qa.is_none() && qb.is_none());
            }
            self.arena[a].parent = Some(m);
            self.arena[b].parent = Some(m);
        }

        self.arena[a].alive = false;
        self.arena[b].alive = false;
        let mut joined = self.tree.remove(&mut self.arena, a);
        joined.extend(self.tree.remove(&mut self.arena, b));
        self.live -= 1;
        self.stats.merges += 1;

        let created = self.tree.insert_center_of(&mut self.arena, m)?;

        // Splits invalidated the split cells' events; re-arm their glyphs.
        if opts.include_out_of_cell {
            for leaf in created {
                for g in self.tree.leaf_glyphs(leaf).to_vec() {
                    for side in Side::ALL {
                        self.push_out_of_cell(g, leaf, side);
                    }
                }
            }
        }

        // Joined leaves hold glyphs that may never have shared a cell.
        for leaf in joined {
            if !self.tree.is_live_leaf(leaf) {
                continue;
            }
            let glyphs: Vec<GlyphId> = self.tree.leaf_glyphs(leaf).to_vec();
            if opts.include_out_of_cell {
                for &g in &glyphs {
                    for side in Side::ALL {
                        self.push_out_of_cell(g, leaf, side);
                    }
                }
            }
            for (i, &p) in glyphs.iter().enumerate() {
                for &q in &glyphs[i + 1..] {
                    self.record_candidate(p, q, opts);
                }
            }
        }

        // Follow-ups for the composite in every leaf it landed in.
        let cells = self.arena[m].cells.clone();
        let mut seen: HashSet<GlyphId> = HashSet::new();
        for cell in cells {
            if opts.include_out_of_cell {
                for side in Side::ALL {
                    self.push_out_of_cell(m, cell, side);
                }
            }
            for h in self.tree.leaf_glyphs(cell).to_vec() {
                if h != m && self.arena[h].alive && seen.insert(h) {
                    self.record_candidate(m, h, opts);
                }
            }
        }
        Ok(())
    }

    fn handle_out_of_cell(
        &mut self,
        at: f64,
        g: GlyphId,
        cell: CellId,
        side: Side,
        opts: &ClusterOptions,
    ) -> Result<()> {
        if !self.arena[g].alive || !self.tree.is_live_leaf(cell) || !self.arena[g].in_cell(cell) {
            self.stats.out_of_cell_discarded += 1;
            return Ok(());
        }
        self.stats.out_of_cell_handled += 1;

        let mut neighbors = Vec::new();
        self.tree.neighbors(cell, side, &mut neighbors);
        trace!(%g, %cell, %side, at, neighbors = neighbors.len(), "out of cell");

        let eps = self.cfg.double_epsilon;
        let mut next_at = f64::INFINITY;
        let mut recorded: HashSet<GlyphId> = HashSet::new();
        for leaf in neighbors {
            if self.arena[g].in_cell(leaf) {
                continue;
            }
            let rect = self.tree.rect(leaf);
            let enter = self.grow.enter_at(&self.arena[g], &rect);
            if enter <= at + eps {
                self.tree.register(&mut self.arena, g, leaf)?;
                for s in Side::ALL {
                    if s != side.opposite() {
                        self.push_out_of_cell(g, leaf, s);
                    }
                }
                for h in self.tree.leaf_glyphs(leaf).to_vec() {
                    if h != g && self.arena[h].alive && recorded.insert(h) {
                        self.record_candidate(g, h, opts);
                    }
                }
            } else {
                // Crossed the side line but not this neighbor yet; come
                // back when the first untouched neighbor is reached.
                next_at = next_at.min(enter);
            }
        }
        if next_at.is_finite() {
            self.queue
                .push(next_at.max(self.now), EventKind::OutOfCell { glyph: g, cell, side });
            self.stats.events_pushed += 1;
        }
        Ok(())
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}
