//! Program analysis over three-address instruction streams.
//!
//! This module derives every fact the later stages of a backend need from a single
//! instruction stream.
//!
//! # Architecture
//!
//! The analyses are organized into focused sub-modules, each consuming the results of the
//! previous ones:
//!
//! - [`Cfg`] - Block partitioning and block/instruction-level control flow
//! - [`Dominance`] - Dominator sets, immediate dominators and dominance frontiers
//! - [`DefUse`] - Per-instruction and per-variable definitions and uses
//! - [`PhiPlacement`], [`SsaConverter`] - Conversion of a raw stream to SSA form
//! - [`Liveness`] - Backward liveness dataflow
//!
//! [`AnalysisContext`] ties a stream to its [`Cfg`], [`DefUse`] and [`Dominance`]. Contexts are
//! immutable; rewriting a stream always yields a new, independently analysed context.
//!
//! # Usage
//!
//! ```rust
//! use tacscope::{analysis::{AnalysisContext, SsaConverter}, ir::*};
//!
//! let stream = InstructionStream::new(vec![
//!     Instruction::label(0),
//!     Instruction::assign(Var::logical(0), Var::constant(7)),
//!     Instruction::ret(Var::logical(0)),
//! ]);
//!
//! let raw = AnalysisContext::analyze(Pass::Raw, stream)?;
//! let ssa = SsaConverter::convert(&raw)?;
//! let liveness = ssa.liveness();
//!
//! assert!(liveness.is_live_out(1, LogicalVar::new(0).with_ssa(1)));
//! # Ok::<(), tacscope::Error>(())
//! ```

mod cfg;
mod context;
mod defuse;
mod dominance;
mod liveness;
mod ssa;

pub use cfg::Cfg;
pub use context::AnalysisContext;
pub use defuse::DefUse;
pub use dominance::Dominance;
pub use liveness::Liveness;
pub use ssa::{verify_ssa, PhiPlacement, SsaConverter};
