//! Dead definition elimination.
//!
//! Removes instructions whose only effect is defining a variable that is not live afterwards.
//! Instructions with side effects (branches, calls, stores through pointers, traps) are always
//! kept, as are labels. Removing one definition can make the definitions feeding it dead, which
//! the scheduler picks up in its next round.

use tracing::debug;

use crate::{
    analysis::{AnalysisContext, Liveness},
    compiler::StreamPass,
    ir::{Instruction, InstructionStream},
    Result,
};

/// Removes side-effect-free definitions of dead variables.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeadDefinitionElimination;

impl DeadDefinitionElimination {
    /// Creates a new dead definition elimination pass.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn is_dead(ctx: &AnalysisContext, liveness: &Liveness, index: usize, instr: &Instruction) -> bool {
        if instr.has_side_effects() || instr.is_label() {
            return false;
        }

        let defs = ctx.defuse().defs_at(index);
        !defs.is_empty() && defs.iter().all(|&var| !liveness.is_live_out(index, var))
    }
}

impl StreamPass for DeadDefinitionElimination {
    fn name(&self) -> &'static str {
        "dead-definition-elimination"
    }

    fn description(&self) -> &'static str {
        "Remove pure instructions whose result is never read"
    }

    fn run(&self, ctx: &AnalysisContext) -> Result<Option<InstructionStream>> {
        let liveness = ctx.liveness();
        let stream = ctx.stream();

        let kept: InstructionStream = stream
            .iter()
            .enumerate()
            .filter(|(index, instr)| !Self::is_dead(ctx, &liveness, *index, instr))
            .map(|(_, instr)| instr.clone())
            .collect();

        let removed = stream.len() - kept.len();
        if removed == 0 {
            return Ok(None);
        }

        debug!(pass = self.name(), removed, "removed dead definitions");
        Ok(Some(kept))
    }
}
