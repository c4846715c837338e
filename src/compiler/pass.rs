//! Stream pass traits.
//!
//! A [`StreamPass`] reads one analysed stream and may return a rewritten one. Passes never
//! mutate their input; the scheduler analyses every rewritten stream from scratch before the
//! next pass sees it.

use crate::{
    analysis::AnalysisContext,
    ir::{Instruction, InstructionStream},
    Result,
};

/// A transformation over a whole instruction stream.
///
/// Implementations must be `Send + Sync` so one compiler can serve many methods in parallel.
pub trait StreamPass: Send + Sync {
    /// Returns the unique name of this pass, used in logs.
    fn name(&self) -> &'static str;

    /// Returns a short description of what this pass does.
    fn description(&self) -> &'static str {
        ""
    }

    /// Runs the pass.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The analysed stream to transform
    ///
    /// # Returns
    ///
    /// `Some(stream)` if the pass changed anything, `None` otherwise.
    ///
    /// # Errors
    ///
    /// Returns a fatal error if the pass cannot continue. Recoverable conditions are handled
    /// inside the pass.
    fn run(&self, ctx: &AnalysisContext) -> Result<Option<InstructionStream>>;
}

/// Per-instruction lowering, applied by [`LoweringPass`](crate::compiler::LoweringPass).
pub trait Lower: Send + Sync {
    /// Returns the name of this lowering, used in logs.
    fn name(&self) -> &'static str;

    /// Lowers the instruction at `index`.
    ///
    /// # Returns
    ///
    /// `Some(replacement)` to replace the instruction with zero or more instructions, or `None`
    /// to keep it as is.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`](crate::Error::TypeMismatch) if an operand cannot be classified.
    /// The pass keeps the instruction unmodified in that case. Any other error is fatal.
    fn lower(&self, index: usize, instr: &Instruction) -> Result<Option<Vec<Instruction>>>;
}
