// crates/aggrow-quad/src/lib.rs

//! Adaptive region quadtree over a fixed world rectangle.
//!
//! Leaves carry the live glyphs intersecting them; cells live in an arena
//! indexed by [`aggrow_core::CellId`] and ids are never reused, so stale
//! event references can always be detected.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod stats;
pub mod tree;

pub use stats::TreeStats;
pub use tree::QuadTree;
