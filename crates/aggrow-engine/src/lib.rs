// crates/aggrow-engine/src/lib.rs

//! Event-driven agglomerative clustering of growing glyphs.
//!
//! The engine seeds a quadtree with weighted points, predicts pairwise
//! merge times and cell-boundary crossings analytically, and consumes a
//! global priority queue of those events in chronological order until a
//! single glyph remains. The output is a binary merge tree.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod big;
pub mod engine;
pub mod event;
pub mod naive;
pub mod queue;
pub mod stats;

pub use engine::{ClusterOptions, Engine};
pub use event::{Event, EventKind};
pub use queue::EventQueue;
pub use stats::EngineStats;
