//! Per-stage analysis contexts.
//!
//! An [`AnalysisContext`] bundles one instruction stream with every fact derived from it. It is
//! built in one step and never modified afterwards: a stage that rewrites the stream produces a
//! new context instead of patching the old one, so facts for one pass cannot leak into another.

use tracing::debug;

use crate::{
    analysis::{Cfg, DefUse, Dominance, Liveness},
    ir::{InstructionStream, Pass},
    Result,
};

/// An instruction stream together with its control flow, def/use and dominance facts.
///
/// # Examples
///
/// ```rust
/// use tacscope::{analysis::AnalysisContext, ir::*};
///
/// let stream = InstructionStream::new(vec![
///     Instruction::label(0),
///     Instruction::assign(Var::logical(0), Var::constant(1)),
///     Instruction::ret(Var::logical(0)),
/// ]);
/// let ctx = AnalysisContext::analyze(Pass::Raw, stream)?;
///
/// assert_eq!(ctx.pass(), Pass::Raw);
/// assert_eq!(ctx.cfg().block_count(), 1);
/// assert!(ctx.dominance().dominates(0, 2));
/// assert_eq!(ctx.defuse().def_sites(LogicalVar::new(0)), &[1]);
/// # Ok::<(), tacscope::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    pass: Pass,
    stream: InstructionStream,
    cfg: Cfg,
    defuse: DefUse,
    dominance: Dominance,
}

impl AnalysisContext {
    /// Analyses `stream` from scratch, rooting dominance at its first instruction.
    ///
    /// # Arguments
    ///
    /// * `pass` - The identity of the stream
    /// * `stream` - The instructions to analyse
    ///
    /// # Errors
    ///
    /// Returns any error raised while building the control flow graph or computing dominance.
    /// The control flow graph is always built first, so a malformed stream is rejected before
    /// dominance runs.
    pub fn analyze(pass: Pass, stream: InstructionStream) -> Result<Self> {
        let cfg = Cfg::build(&stream)?;
        let defuse = DefUse::compute(&stream);
        let dominance = Dominance::compute(&cfg, 0)?;

        debug!(
            %pass,
            instructions = stream.len(),
            blocks = cfg.block_count(),
            "analysed stream"
        );

        Ok(AnalysisContext {
            pass,
            stream,
            cfg,
            defuse,
            dominance,
        })
    }

    /// Returns the identity of the analysed stream.
    #[must_use]
    pub const fn pass(&self) -> Pass {
        self.pass
    }

    /// Returns the analysed stream.
    #[must_use]
    pub const fn stream(&self) -> &InstructionStream {
        &self.stream
    }

    /// Returns the control flow graph.
    #[must_use]
    pub const fn cfg(&self) -> &Cfg {
        &self.cfg
    }

    /// Returns definitions and uses.
    #[must_use]
    pub const fn defuse(&self) -> &DefUse {
        &self.defuse
    }

    /// Returns the dominance facts.
    #[must_use]
    pub const fn dominance(&self) -> &Dominance {
        &self.dominance
    }

    /// Solves liveness for this stream.
    #[must_use]
    pub fn liveness(&self) -> Liveness {
        Liveness::solve(self)
    }

    /// Consumes the context and returns the stream.
    #[must_use]
    pub fn into_stream(self) -> InstructionStream {
        self.stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ir::{Instruction, Var},
        test::diamond,
        Error,
    };

    #[test]
    fn test_analyze_diamond() {
        let ctx = AnalysisContext::analyze(Pass::Raw, diamond()).unwrap();

        assert_eq!(ctx.stream().len(), 13);
        assert_eq!(ctx.cfg().len(), 13);
        assert_eq!(ctx.defuse().len(), 13);
        assert_eq!(ctx.dominance().len(), 13);
        assert_eq!(ctx.liveness().pass(), Pass::Raw);
    }

    #[test]
    fn test_malformed_stream_fails_before_dominance() {
        let stream = InstructionStream::new(vec![Instruction::label(0), Instruction::br(3)]);
        assert!(matches!(
            AnalysisContext::analyze(Pass::Raw, stream),
            Err(Error::UnlabeledBranchTarget { index: 1, block: 3 })
        ));
    }

    #[test]
    fn test_into_stream_round_trip() {
        let stream = InstructionStream::new(vec![Instruction::label(0), Instruction::ret(Var::Null)]);
        let ctx = AnalysisContext::analyze(Pass::Optimized, stream.clone()).unwrap();
        assert_eq!(ctx.into_stream(), stream);
    }
}
