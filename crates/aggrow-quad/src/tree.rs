// crates/aggrow-quad/src/tree.rs

//! The quadtree proper: insert-by-center with adaptive splits, growth
//! registration, removal with cascading joins, and side-wise neighbor
//! enumeration.
//!
//! Membership is a many-to-many relation kept in sync on both sides: each
//! leaf owns a small vector of glyph ids and each glyph owns the vector of
//! leaf ids it is enrolled in. There are no child-to-parent pointers; the
//! parent chain is recomputed by a root descent where a join needs it.

use aggrow_core::error::{internal_invariant, invalid_input};
use aggrow_core::{CellId, GlyphArena, GlyphId, Quadrant, Rect, Side};
use anyhow::Result;

use crate::stats::TreeStats;

const ROOT: CellId = CellId(0);

#[derive(Clone, Debug)]
enum CellState {
    Leaf { glyphs: Vec<GlyphId> },
    Internal { children: [CellId; 4] },
    /// Removed by a join; the id is tombstoned, never reused.
    Retired,
}

#[derive(Clone, Debug)]
struct Cell {
    rect: Rect,
    state: CellState,
}

/// Adaptive region quadtree over a fixed world.
#[derive(Clone, Debug)]
pub struct QuadTree {
    cells: Vec<Cell>,
    capacity: usize,
    min_side: f64,
    splits: u64,
    joins: u64,
}

impl QuadTree {
    /// Empty tree: a single leaf covering `bounds`.
    #[must_use]
    pub fn new(bounds: Rect, capacity: usize, min_side: f64) -> Self {
        Self {
            cells: vec![Cell {
                rect: bounds,
                state: CellState::Leaf { glyphs: Vec::new() },
            }],
            capacity: capacity.max(1),
            min_side,
            splits: 0,
            joins: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.cells[ROOT.index()].rect
    }

    #[inline]
    #[must_use]
    pub fn rect(&self, cell: CellId) -> Rect {
        self.cells[cell.index()].rect
    }

    #[inline]
    #[must_use]
    pub fn is_live_leaf(&self, cell: CellId) -> bool {
        matches!(self.cells[cell.index()].state, CellState::Leaf { .. })
    }

    /// Glyphs enrolled in a leaf; empty for internal or retired cells.
    #[must_use]
    pub fn leaf_glyphs(&self, cell: CellId) -> &[GlyphId] {
        match &self.cells[cell.index()].state {
            CellState::Leaf { glyphs } => glyphs,
            _ => &[],
        }
    }

    /// Ids of all current leaves.
    pub fn leaves(&self) -> impl Iterator<Item = CellId> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c.state, CellState::Leaf { .. }))
            .map(|(i, _)| CellId(i as u32))
    }

    /// Distinct glyphs currently enrolled in any leaf. Leaves only ever
    /// hold live glyphs, so this is the live population.
    #[must_use]
    pub fn live_glyphs(&self) -> Vec<GlyphId> {
        let mut out: Vec<GlyphId> = self
            .cells
            .iter()
            .filter_map(|c| match &c.state {
                CellState::Leaf { glyphs } => Some(glyphs.iter().copied()),
                _ => None,
            })
            .flatten()
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    #[must_use]
    pub const fn split_count(&self) -> u64 {
        self.splits
    }

    #[must_use]
    pub const fn join_count(&self) -> u64 {
        self.joins
    }

    /// Insert a glyph into the leaf containing its center, splitting full
    /// leaves on the way down while their side is at least the minimum.
    ///
    /// Returns the leaves created by splits during this insertion, so the
    /// caller can refresh events that referenced the split cells.
    pub fn insert_center_of(
        &mut self,
        arena: &mut GlyphArena,
        id: GlyphId,
    ) -> Result<Vec<CellId>> {
        let (x, y) = (arena[id].x, arena[id].y);
        if !self.bounds().contains(x, y) {
            return Err(invalid_input(format!(
                "glyph center ({x}, {y}) outside the world {}",
                self.bounds()
            )));
        }

        let mut created = Vec::new();
        let mut cur = ROOT;
        loop {
            match &self.cells[cur.index()].state {
                CellState::Internal { children } => {
                    let q = self.cells[cur.index()].rect.quadrant_of(x, y);
                    cur = children[q.index()];
                }
                CellState::Leaf { glyphs } => {
                    let full = glyphs.len() >= self.capacity;
                    let splittable = self.cells[cur.index()].rect.width() >= self.min_side;
                    if full && splittable {
                        self.split(arena, cur, &mut created);
                        // Now internal; descend again.
                        continue;
                    }
                    self.attach(arena, id, cur);
                    return Ok(created);
                }
                CellState::Retired => {
                    return Err(internal_invariant(format!(
                        "descent reached retired cell {cur}"
                    )))
                }
            }
        }
    }

    /// Enroll a glyph into a leaf its growing shape has reached.
    ///
    /// Unlike [`Self::insert_center_of`] this never splits: the capacity
    /// rule governs insertion by center only.
    pub fn register(&mut self, arena: &mut GlyphArena, id: GlyphId, cell: CellId) -> Result<()> {
        if !self.is_live_leaf(cell) {
            return Err(internal_invariant(format!(
                "registering {id} into non-leaf cell {cell}"
            )));
        }
        if !arena[id].in_cell(cell) {
            self.attach(arena, id, cell);
        }
        Ok(())
    }

    /// Remove a glyph from every cell it is enrolled in, then propagate
    /// join checks upward from each affected cell.
    ///
    /// Returns the leaves produced by joins (only those still live after
    /// the whole cascade), so the caller can re-seed their events.
    pub fn remove(&mut self, arena: &mut GlyphArena, id: GlyphId) -> Vec<CellId> {
        let cells = std::mem::take(&mut arena[id].cells);
        for &cid in &cells {
            if let CellState::Leaf { glyphs } = &mut self.cells[cid.index()].state {
                glyphs.retain(|&g| g != id);
            }
        }

        let mut joined = Vec::new();
        for &cid in &cells {
            let Some(path) = self.path_to(cid) else {
                // Already joined away by an earlier cascade step.
                continue;
            };
            // Walk parents from the nearest upward; joins cascade.
            for idx in (0..path.len().saturating_sub(1)).rev() {
                if self.try_join(arena, path[idx]) {
                    joined.push(path[idx]);
                } else {
                    break;
                }
            }
        }
        joined.retain(|&c| self.is_live_leaf(c));
        joined.sort_unstable();
        joined.dedup();
        joined
    }

    /// All leaves adjacent to `cell` on the given side, including
    /// descendants of larger neighbors.
    pub fn neighbors(&self, cell: CellId, side: Side, out: &mut Vec<CellId>) {
        let r = self.rect(cell);
        let coord = r.side_coord(side);
        let mut stack = vec![ROOT];
        while let Some(cur) = stack.pop() {
            let c = &self.cells[cur.index()];
            if !band_overlaps(&c.rect, &r, side, coord) {
                continue;
            }
            match &c.state {
                CellState::Internal { children } => stack.extend(children.iter().copied()),
                CellState::Leaf { .. } => {
                    if cur != cell && on_outside(&c.rect, side, coord) {
                        out.push(cur);
                    }
                }
                CellState::Retired => {}
            }
        }
    }

    /// Aggregate statistics over the current tree.
    #[must_use]
    pub fn stats(&self) -> TreeStats {
        let mut s = TreeStats {
            cells: self.cells.len(),
            splits: self.splits,
            joins: self.joins,
            ..TreeStats::default()
        };
        let mut stack = vec![(ROOT, 0usize)];
        while let Some((cur, depth)) = stack.pop() {
            s.max_depth = s.max_depth.max(depth);
            match &self.cells[cur.index()].state {
                CellState::Leaf { glyphs } => {
                    s.leaves += 1;
                    s.glyph_links += glyphs.len();
                }
                CellState::Internal { children } => {
                    s.internal += 1;
                    stack.extend(children.iter().map(|&c| (c, depth + 1)));
                }
                CellState::Retired => {}
            }
        }
        s.retired = self.cells.len() - s.leaves - s.internal;
        s
    }

    // ---- internals ----

    /// Add the membership on both sides of the relation.
    fn attach(&mut self, arena: &mut GlyphArena, id: GlyphId, cell: CellId) {
        if let CellState::Leaf { glyphs } = &mut self.cells[cell.index()].state {
            glyphs.push(id);
            arena[id].cells.push(cell);
        }
    }

    /// Split a full leaf into four children and redistribute its glyphs
    /// by center. New child ids are appended to `created`.
    fn split(&mut self, arena: &mut GlyphArena, cell: CellId, created: &mut Vec<CellId>) {
        let rect = self.cells[cell.index()].rect;
        let glyphs = match &mut self.cells[cell.index()].state {
            CellState::Leaf { glyphs } => std::mem::take(glyphs),
            _ => return,
        };

        let mut children = [ROOT; 4];
        for q in Quadrant::ALL {
            #[allow(clippy::cast_possible_truncation)]
            let id = CellId(self.cells.len() as u32);
            self.cells.push(Cell {
                rect: rect.child(q),
                state: CellState::Leaf { glyphs: Vec::new() },
            });
            children[q.index()] = id;
        }
        self.cells[cell.index()].state = CellState::Internal { children };

        for gid in glyphs {
            let q = rect.quadrant_of(arena[gid].x, arena[gid].y);
            let child = children[q.index()];
            if let CellState::Leaf { glyphs } = &mut self.cells[child.index()].state {
                glyphs.push(gid);
            }
            // Swap the old membership entry for the child's.
            let cells = &mut arena[gid].cells;
            if let Some(slot) = cells.iter_mut().find(|c| **c == cell) {
                *slot = child;
            } else {
                cells.push(child);
            }
        }

        self.splits += 1;
        created.extend_from_slice(&children);
    }

    /// Collapse `parent` back into a leaf when all four children are
    /// leaves and their combined glyphs fit the capacity.
    fn try_join(&mut self, arena: &mut GlyphArena, parent: CellId) -> bool {
        let children = match &self.cells[parent.index()].state {
            CellState::Internal { children } => *children,
            _ => return false,
        };

        let mut union: Vec<GlyphId> = Vec::new();
        for &c in &children {
            match &self.cells[c.index()].state {
                CellState::Leaf { glyphs } => {
                    for &g in glyphs {
                        if !union.contains(&g) {
                            union.push(g);
                        }
                    }
                }
                _ => return false,
            }
        }
        if union.len() > self.capacity {
            return false;
        }

        for &g in &union {
            let cells = &mut arena[g].cells;
            cells.retain(|c| !children.contains(c));
            cells.push(parent);
        }
        for &c in &children {
            self.cells[c.index()].state = CellState::Retired;
        }
        self.cells[parent.index()].state = CellState::Leaf { glyphs: union };
        self.joins += 1;
        true
    }

    /// Root-to-cell descent path, or `None` when the cell is no longer
    /// reachable (retired).
    fn path_to(&self, cell: CellId) -> Option<Vec<CellId>> {
        let target = self.cells[cell.index()].rect;
        let (tx, ty) = (target.center_x(), target.center_y());
        let mut path = vec![ROOT];
        let mut cur = ROOT;
        loop {
            if cur == cell {
                return Some(path);
            }
            match &self.cells[cur.index()].state {
                CellState::Internal { children } => {
                    let q = self.cells[cur.index()].rect.quadrant_of(tx, ty);
                    cur = children[q.index()];
                    path.push(cur);
                }
                _ => return None,
            }
        }
    }
}

/// Could this subtree contain leaves adjacent to `cell_rect` on `side`?
fn band_overlaps(candidate: &Rect, cell_rect: &Rect, side: Side, coord: f64) -> bool {
    if side.is_vertical() {
        candidate.x0 <= coord
            && coord <= candidate.x1
            && candidate.y0 < cell_rect.y1
            && candidate.y1 > cell_rect.y0
    } else {
        candidate.y0 <= coord
            && coord <= candidate.y1
            && candidate.x0 < cell_rect.x1
            && candidate.x1 > cell_rect.x0
    }
}

/// Is this leaf on the far side of the boundary line?
fn on_outside(leaf: &Rect, side: Side, coord: f64) -> bool {
    match side {
        Side::Right => leaf.x0 == coord,
        Side::Left => leaf.x1 == coord,
        Side::Bottom => leaf.y0 == coord,
        Side::Top => leaf.y1 == coord,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aggrow_core::Glyph;

    fn world() -> Rect {
        Rect::new(0.0, 0.0, 16.0, 16.0)
    }

    fn seed(tree: &mut QuadTree, arena: &mut GlyphArena, pts: &[(f64, f64)]) -> Vec<GlyphId> {
        pts.iter()
            .map(|&(x, y)| {
                let id = arena.alloc(Glyph::new(x, y, 1));
                tree.insert_center_of(arena, id).unwrap();
                id
            })
            .collect()
    }

    #[test]
    fn insert_without_split_keeps_one_leaf() {
        let mut tree = QuadTree::new(world(), 4, 0.001);
        let mut arena = GlyphArena::new();
        let ids = seed(&mut tree, &mut arena, &[(1.0, 1.0), (9.0, 9.0)]);
        assert_eq!(tree.leaves().count(), 1);
        for id in ids {
            assert_eq!(arena[id].cells.len(), 1);
            assert!(tree.leaf_glyphs(arena[id].cells[0]).contains(&id));
        }
    }

    #[test]
    fn overflow_splits_and_redistributes_by_center() {
        let mut tree = QuadTree::new(world(), 2, 0.001);
        let mut arena = GlyphArena::new();
        let ids = seed(
            &mut tree,
            &mut arena,
            &[(1.0, 1.0), (9.0, 1.0), (1.0, 9.0)],
        );
        assert_eq!(tree.split_count(), 1);
        assert_eq!(tree.leaves().count(), 4);
        for id in ids {
            let cells = &arena[id].cells;
            assert_eq!(cells.len(), 1);
            let r = tree.rect(cells[0]);
            assert!(r.contains(arena[id].x, arena[id].y));
        }
    }

    #[test]
    fn min_cell_size_stops_splitting() {
        let mut tree = QuadTree::new(world(), 1, 32.0);
        let mut arena = GlyphArena::new();
        seed(&mut tree, &mut arena, &[(1.0, 1.0), (1.5, 1.0), (2.0, 1.0)]);
        // Root side below the floor: never splits, the leaf overfills.
        assert_eq!(tree.split_count(), 0);
        assert_eq!(tree.leaves().count(), 1);
        assert_eq!(tree.leaf_glyphs(ROOT).len(), 3);
    }

    #[test]
    fn remove_joins_back_to_a_single_leaf() {
        let mut tree = QuadTree::new(world(), 2, 0.001);
        let mut arena = GlyphArena::new();
        let ids = seed(
            &mut tree,
            &mut arena,
            &[(1.0, 1.0), (9.0, 1.0), (1.0, 9.0)],
        );
        assert_eq!(tree.leaves().count(), 4);
        let joined = tree.remove(&mut arena, ids[2]);
        assert_eq!(joined, vec![ROOT]);
        assert_eq!(tree.leaves().count(), 1);
        assert!(arena[ids[2]].cells.is_empty());
        // Survivors were re-homed into the joined leaf.
        for &id in &ids[..2] {
            assert_eq!(arena[id].cells, vec![ROOT]);
        }
    }

    #[test]
    fn live_glyphs_deduplicates_multi_cell_members() {
        let mut tree = QuadTree::new(world(), 1, 0.001);
        let mut arena = GlyphArena::new();
        let ids = seed(&mut tree, &mut arena, &[(1.0, 1.0), (9.0, 9.0)]);
        let target = arena[ids[1]].cells[0];
        tree.register(&mut arena, ids[0], target).unwrap();
        assert_eq!(tree.live_glyphs(), ids);
    }

    #[test]
    fn register_enrolls_without_splitting() {
        let mut tree = QuadTree::new(world(), 1, 0.001);
        let mut arena = GlyphArena::new();
        let ids = seed(&mut tree, &mut arena, &[(1.0, 1.0), (9.0, 9.0)]);
        let target = arena[ids[1]].cells[0];
        tree.register(&mut arena, ids[0], target).unwrap();
        assert!(arena[ids[0]].in_cell(target));
        assert_eq!(tree.leaf_glyphs(target).len(), 2);
        // Idempotent.
        tree.register(&mut arena, ids[0], target).unwrap();
        assert_eq!(tree.leaf_glyphs(target).len(), 2);
    }

    #[test]
    fn neighbors_cross_subdivision_levels() {
        let mut tree = QuadTree::new(world(), 1, 0.001);
        let mut arena = GlyphArena::new();
        // (1,1) and (7,7) subdivide the top-left quadrant twice; (12,4)
        // keeps the top-right quadrant a single 8×8 leaf.
        let ids = seed(&mut tree, &mut arena, &[(1.0, 1.0), (7.0, 7.0), (12.0, 4.0)]);
        let deep = arena[ids[1]].cells[0]; // 4×4 leaf at (4,4)
        let big = arena[ids[2]].cells[0]; // 8×8 leaf at (8,0)

        let mut out = Vec::new();
        tree.neighbors(big, Side::Left, &mut out);
        // Both 4×4 leaves on the top-left quadrant's right edge.
        assert_eq!(out.len(), 2, "large cell sees the small ones: {out:?}");
        assert!(out.contains(&deep));

        out.clear();
        tree.neighbors(deep, Side::Right, &mut out);
        assert_eq!(out, vec![big], "small cell sees the big neighbor");

        out.clear();
        tree.neighbors(big, Side::Right, &mut out);
        assert!(out.is_empty(), "world boundary has no neighbors");
    }

    #[test]
    fn stats_reflect_structure() {
        let mut tree = QuadTree::new(world(), 2, 0.001);
        let mut arena = GlyphArena::new();
        seed(&mut tree, &mut arena, &[(1.0, 1.0), (9.0, 1.0), (1.0, 9.0)]);
        let s = tree.stats();
        assert_eq!(s.leaves, 4);
        assert_eq!(s.internal, 1);
        assert_eq!(s.max_depth, 1);
        assert_eq!(s.glyph_links, 3);
        assert_eq!(s.splits, 1);
    }
}
