//! Built-in stream passes.

mod dce;
mod lowering;

pub use dce::DeadDefinitionElimination;
pub use lowering::{LoweringPass, StrengthReduction};
