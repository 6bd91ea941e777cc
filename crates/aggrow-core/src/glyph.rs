// crates/aggrow-core/src/glyph.rs

//! Glyphs and the arena that owns them.
//!
//! A glyph is the mutable particle of the simulation: a weighted center
//! that is born at seeding time or at a merge event and dies at the merge
//! that consumes it. Glyph and cell ids are plain arena indices; ids stay
//! stable for the whole clustering run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// Stable handle into the glyph arena.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlyphId(pub u32);

impl GlyphId {
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for GlyphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Stable handle into the quadtree cell arena.
///
/// Cells retired by a join keep their id forever (ids are never reused),
/// so a stale event can never alias a newer cell.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(pub u32);

impl CellId {
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// A growing glyph.
#[derive(Clone, Debug)]
pub struct Glyph {
    pub x: f64,
    pub y: f64,
    /// Accumulated integer weight.
    pub n: u64,
    pub alive: bool,
    /// Leaves this glyph is currently enrolled in (the other half of the
    /// many-to-many relation lives in the quadtree leaves).
    pub cells: Vec<CellId>,
    /// Adoptive parent set when this glyph is absorbed into a composite;
    /// follow with [`GlyphArena::composite_root`].
    pub parent: Option<GlyphId>,
    /// Flagged when the big-glyph optimization tracks this glyph.
    pub track: bool,
    /// Compression level (0 when uncompressed); the shape border is `2·level`.
    pub level: u32,
    /// Compression factor in `(0, 1]` applied to the growth rate.
    pub factor: f64,
}

impl Glyph {
    #[must_use]
    pub fn new(x: f64, y: f64, n: u64) -> Self {
        Self {
            x,
            y,
            n,
            alive: true,
            cells: Vec::new(),
            parent: None,
            track: false,
            level: 0,
            factor: 1.0,
        }
    }

    /// Extra border added around the shape by compression.
    #[inline]
    #[must_use]
    pub fn border(&self) -> f64 {
        2.0 * f64::from(self.level)
    }

    #[inline]
    #[must_use]
    pub fn in_cell(&self, cell: CellId) -> bool {
        self.cells.contains(&cell)
    }
}

/// Arena owning every glyph for the lifetime of a clustering run.
#[derive(Clone, Debug, Default)]
pub struct GlyphArena {
    glyphs: Vec<Glyph>,
}

impl GlyphArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, glyph: Glyph) -> GlyphId {
        let id = GlyphId(u32::try_from(self.glyphs.len()).unwrap_or(u32::MAX));
        self.glyphs.push(glyph);
        id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn alive(&self, id: GlyphId) -> bool {
        self.glyphs[id.index()].alive
    }

    /// All ids ever allocated, dead or alive.
    pub fn ids(&self) -> impl Iterator<Item = GlyphId> + '_ {
        (0..self.glyphs.len()).map(|i| GlyphId(i as u32))
    }

    /// Ids of live glyphs.
    pub fn live_ids(&self) -> impl Iterator<Item = GlyphId> + '_ {
        self.ids().filter(|id| self.glyphs[id.index()].alive)
    }

    /// Follow the adoptive-parent chain to the current composite root,
    /// compressing the path on the way back.
    pub fn composite_root(&mut self, id: GlyphId) -> GlyphId {
        let mut root = id;
        while let Some(p) = self.glyphs[root.index()].parent {
            root = p;
        }
        let mut cur = id;
        while let Some(p) = self.glyphs[cur.index()].parent {
            self.glyphs[cur.index()].parent = Some(root);
            cur = p;
        }
        root
    }
}

impl Index<GlyphId> for GlyphArena {
    type Output = Glyph;

    #[inline]
    fn index(&self, id: GlyphId) -> &Glyph {
        &self.glyphs[id.index()]
    }
}

impl IndexMut<GlyphId> for GlyphArena {
    #[inline]
    fn index_mut(&mut self, id: GlyphId) -> &mut Glyph {
        &mut self.glyphs[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_allocates_stable_ids() {
        let mut arena = GlyphArena::new();
        let a = arena.alloc(Glyph::new(0.0, 0.0, 1));
        let b = arena.alloc(Glyph::new(1.0, 0.0, 2));
        assert_ne!(a, b);
        assert_eq!(arena[b].n, 2);
        arena[a].alive = false;
        assert_eq!(arena.live_ids().collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    fn composite_root_compresses_paths() {
        let mut arena = GlyphArena::new();
        let a = arena.alloc(Glyph::new(0.0, 0.0, 1));
        let b = arena.alloc(Glyph::new(1.0, 0.0, 1));
        let c = arena.alloc(Glyph::new(2.0, 0.0, 2));
        arena[a].parent = Some(b);
        arena[b].parent = Some(c);
        assert_eq!(arena.composite_root(a), c);
        // Path compressed: a now points straight at the root.
        assert_eq!(arena[a].parent, Some(c));
        assert_eq!(arena.composite_root(c), c);
    }

    #[test]
    fn border_grows_with_level() {
        let mut g = Glyph::new(0.0, 0.0, 1);
        assert_eq!(g.border(), 0.0);
        g.level = 2;
        assert_eq!(g.border(), 4.0);
    }
}
