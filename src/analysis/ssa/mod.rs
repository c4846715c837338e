//! Static Single Assignment (SSA) conversion.
//!
//! SSA form gives every variable exactly one definition. Where control flow merges values from
//! different definitions, a phi function at the join label selects the value matching the
//! predecessor block control arrived from.
//!
//! # Architecture
//!
//! - [`PhiPlacement`] - Iterated dominance frontier phi placement
//! - [`SsaConverter`] - Phi materialization and dominator-tree renaming
//! - [`verify_ssa`] - Single-definition, dominance and phi arity checks
//!
//! # Representation
//!
//! Phis are ordinary instructions with the `phi` opcode. They are inserted directly after the
//! label of their block, one per variable, and carry the incoming block ids in the same order
//! as [`Cfg::block_predecessors`](crate::analysis::Cfg::block_predecessors):
//!
//! ```text
//!   10: label L4
//!   11:     v0.4 = phi [L2: v0.2, L3: v0.3]
//!   12:     v1.1 = v0.4
//! ```

mod builder;
mod phi;
mod verify;

pub use builder::SsaConverter;
pub use phi::PhiPlacement;
pub use verify::verify_ssa;
