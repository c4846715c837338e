//! Shared utilities.
//!
//! - [`BitSet`] and [`BitMatrix`] - dense per-instruction fact storage
//! - [`escape_dot`] - label escaping for Graphviz output

mod bitset;
mod dot;

pub use bitset::{BitMatrix, BitSet, BitSetIter};
pub use dot::escape_dot;
