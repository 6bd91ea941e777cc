// crates/aggrow-core/src/error.rs

//! Error kinds surfaced to callers.
//!
//! Recoverable conditions (stale events, no-op out-of-cells, impossible
//! intersection times) are handled locally and never become errors. The
//! kinds below are carried inside `anyhow::Error` and can be recovered
//! with `err.downcast_ref::<Error>()`.

use std::error::Error as StdError;
use std::fmt;

/// Fatal error kinds of the clustering core.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Caller handed the engine unusable input (non-finite coordinate,
    /// zero weight, duplicate center, point outside the world).
    InvalidInput(String),
    /// Engine bookkeeping contradicted itself; indicates a bug.
    InternalInvariant(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::InternalInvariant(msg) => write!(f, "internal invariant violated: {msg}"),
        }
    }
}

impl StdError for Error {}

/// Shorthand for an `InvalidInput` wrapped in `anyhow::Error`.
pub fn invalid_input(msg: impl Into<String>) -> anyhow::Error {
    anyhow::Error::new(Error::InvalidInput(msg.into()))
}

/// Shorthand for an `InternalInvariant` wrapped in `anyhow::Error`.
pub fn internal_invariant(msg: impl Into<String>) -> anyhow::Error {
    anyhow::Error::new(Error::InternalInvariant(msg.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_survive_anyhow_roundtrip() {
        let err = invalid_input("weight is zero");
        match err.downcast_ref::<Error>() {
            Some(Error::InvalidInput(msg)) => assert!(msg.contains("zero")),
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn display_names_the_kind() {
        let err = internal_invariant("dead glyph in leaf");
        assert!(err.to_string().starts_with("internal invariant"));
    }
}
