//! Pass scheduler for the optimized stream.
//!
//! The `PassScheduler` runs its stream passes in order, re-analysing the stream after every
//! pass that changes it, and repeats the whole sequence until a round changes nothing or the
//! round limit is reached.

use tracing::debug;

use crate::{
    analysis::AnalysisContext,
    compiler::{DeadDefinitionElimination, LoweringPass, StreamPass, StrengthReduction},
    Result,
};

/// Runs stream passes to a fixed point.
pub struct PassScheduler {
    /// Maximum rounds over all passes.
    max_rounds: usize,
    passes: Vec<Box<dyn StreamPass>>,
}

impl PassScheduler {
    /// Creates a scheduler without passes.
    ///
    /// # Arguments
    ///
    /// * `max_rounds` - Maximum rounds over all passes before stopping.
    ///
    /// # Returns
    ///
    /// A new `PassScheduler`.
    #[must_use]
    pub fn new(max_rounds: usize) -> Self {
        Self {
            max_rounds,
            passes: Vec::new(),
        }
    }

    /// Creates a scheduler with the built-in passes: dead definition elimination followed by
    /// strength reduction.
    #[must_use]
    pub fn with_defaults(max_rounds: usize) -> Self {
        let mut scheduler = Self::new(max_rounds);
        scheduler.add(Box::new(DeadDefinitionElimination::new()));
        scheduler.add(Box::new(LoweringPass::new(StrengthReduction)));
        scheduler
    }

    /// Appends a pass. Passes run in insertion order.
    pub fn add(&mut self, pass: Box<dyn StreamPass>) {
        self.passes.push(pass);
    }

    /// Returns the names of the scheduled passes, in order.
    #[must_use]
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Runs all passes until a round changes nothing.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The analysed stream to start from. Its pass identity is kept for every
    ///   rewritten stream.
    ///
    /// # Returns
    ///
    /// The final context and the number of rounds that ran.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error raised by a pass or by re-analysing its output.
    pub fn run(&self, ctx: AnalysisContext) -> Result<(AnalysisContext, usize)> {
        let mut current = ctx;
        let mut rounds = 0;

        for round in 0..self.max_rounds {
            rounds = round + 1;
            let mut changed = false;

            for pass in &self.passes {
                if let Some(stream) = pass.run(&current)? {
                    debug!(
                        pass = pass.name(),
                        round,
                        instructions = stream.len(),
                        "pass changed stream"
                    );
                    current = AnalysisContext::analyze(current.pass(), stream)?;
                    changed = true;
                }
            }

            if !changed {
                break;
            }
        }

        Ok((current, rounds))
    }
}

impl Default for PassScheduler {
    fn default() -> Self {
        Self::with_defaults(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ir::{Instruction, InstructionStream, Opcode, Pass, Var},
        test::straight_line,
    };

    fn optimized(stream: InstructionStream) -> AnalysisContext {
        AnalysisContext::analyze(Pass::Optimized, stream).unwrap()
    }

    #[test]
    fn test_runs_to_fixed_point() {
        // a = 1; b = a + 1; c = b * 4; ret
        let ctx = optimized(InstructionStream::new(vec![
            Instruction::label(0),
            Instruction::assign(Var::logical(0), Var::constant(1)),
            Instruction::binary(Opcode::Add, Var::logical(1), Var::logical(0), Var::constant(1)),
            Instruction::binary(Opcode::Mul, Var::logical(2), Var::logical(1), Var::constant(4)),
            Instruction::ret(Var::Null),
        ]));
        let (result, rounds) = PassScheduler::default().run(ctx).unwrap();

        assert_eq!(result.pass(), Pass::Optimized);
        // One link of the dead chain per round, plus the quiet round
        assert_eq!(result.stream().len(), 2);
        assert_eq!(rounds, 4);
    }

    #[test]
    fn test_round_limit() {
        let ctx = optimized(InstructionStream::new(vec![
            Instruction::label(0),
            Instruction::assign(Var::logical(0), Var::constant(1)),
            Instruction::binary(Opcode::Add, Var::logical(1), Var::logical(0), Var::constant(1)),
            Instruction::ret(Var::Null),
        ]));
        let (result, rounds) = PassScheduler::with_defaults(1).run(ctx).unwrap();

        // Only the tail of the dead chain went in one round
        assert_eq!(rounds, 1);
        assert_eq!(result.stream().len(), 3);
    }

    #[test]
    fn test_unchanged_stream() {
        let (result, rounds) = PassScheduler::default().run(optimized(straight_line())).unwrap();
        assert_eq!(result.stream(), &straight_line());
        assert_eq!(rounds, 1);
    }

    #[test]
    fn test_empty_scheduler() {
        let scheduler = PassScheduler::new(4);
        assert!(scheduler.pass_names().is_empty());
        let (_, rounds) = scheduler.run(optimized(straight_line())).unwrap();
        assert_eq!(rounds, 1);
    }

    #[test]
    fn test_default_pass_order() {
        assert_eq!(
            PassScheduler::default().pass_names(),
            vec!["dead-definition-elimination", "strength-reduction"]
        );
    }
}
