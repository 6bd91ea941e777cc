// crates/aggrow-points/src/lib.rs

//! Weighted-point input: text/JSON/CBOR formats, parsers and a seeded
//! synthetic generator.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod format;
pub mod generator;
pub mod io;
pub mod parse;

pub use format::WeightedPoint;
