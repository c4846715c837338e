//! Live variable analysis.
//!
//! A variable is *live* at a program point if some path from that point reaches a use of the
//! variable without passing through a definition of it. Register allocation reads these facts
//! to decide which values interfere, and dead definition elimination uses them to find
//! results nobody reads.
//!
//! # Algorithm
//!
//! This is a backward dataflow problem over the instruction-level CFG:
//!
//! - `OUT[n]` = ∪{IN[s] | s is a successor of n}
//! - `IN[n]` = USE[n] ∪ (OUT[n] - DEF[n])
//!
//! Full sweeps visit instructions in reverse stream order, which matches the direction the
//! facts flow in, and stop after the first sweep that changes nothing.
//!
//! Phi operands are uses of the phi itself. This keeps every incoming value live into the join
//! block, which is conservative but sufficient for interference.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::{
    analysis::AnalysisContext,
    ir::{LogicalVar, Pass},
    utils::BitSet,
};

/// Per-instruction live-in and live-out sets of one instruction stream.
///
/// # Example
///
/// ```rust
/// use tacscope::{analysis::{AnalysisContext, Liveness}, ir::*};
///
/// let x = Var::logical(0);
/// let stream = InstructionStream::new(vec![
///     Instruction::label(0),
///     Instruction::assign(x.clone(), Var::constant(1)),
///     Instruction::ret(x),
/// ]);
/// let ctx = AnalysisContext::analyze(Pass::Raw, stream)?;
/// let liveness = Liveness::solve(&ctx);
///
/// let v = LogicalVar::new(0);
/// assert!(liveness.is_live_out(1, v));
/// assert!(!liveness.is_live_in(1, v));
/// assert!(liveness.is_fixed_point(&ctx));
/// # Ok::<(), tacscope::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Liveness {
    pass: Pass,
    variables: Vec<LogicalVar>,
    index: FxHashMap<LogicalVar, usize>,
    defs: Vec<BitSet>,
    uses: Vec<BitSet>,
    live_in: Vec<BitSet>,
    live_out: Vec<BitSet>,
    sweeps: usize,
}

impl Liveness {
    /// Solves liveness for the stream of `ctx`.
    ///
    /// Only the facts of `ctx` are read, so solving for one pass never sees another pass's
    /// stream.
    #[must_use]
    pub fn solve(ctx: &AnalysisContext) -> Self {
        let defuse = ctx.defuse();
        let variables = defuse.variables();
        let index: FxHashMap<LogicalVar, usize> = variables
            .iter()
            .enumerate()
            .map(|(i, &var)| (var, i))
            .collect();

        let width = variables.len();
        let to_set = |vars: &[LogicalVar]| {
            let mut set = BitSet::new(width);
            for var in vars {
                if let Some(&i) = index.get(var) {
                    set.insert(i);
                }
            }
            set
        };

        let len = ctx.stream().len();
        let defs: Vec<BitSet> = (0..len).map(|n| to_set(defuse.defs_at(n))).collect();
        let uses: Vec<BitSet> = (0..len).map(|n| to_set(defuse.uses_at(n))).collect();

        let mut liveness = Liveness {
            pass: ctx.pass(),
            variables,
            index,
            defs,
            uses,
            live_in: vec![BitSet::new(width); len],
            live_out: vec![BitSet::new(width); len],
            sweeps: 0,
        };

        loop {
            liveness.sweeps += 1;
            if !liveness.sweep(ctx) {
                break;
            }
        }

        debug!(
            pass = %liveness.pass,
            instructions = len,
            variables = width,
            sweeps = liveness.sweeps,
            "solved liveness"
        );

        liveness
    }

    /// Runs one reverse sweep. Returns `true` if any set changed.
    fn sweep(&mut self, ctx: &AnalysisContext) -> bool {
        let cfg = ctx.cfg();
        let width = self.variables.len();
        let mut changed = false;

        for n in (0..self.live_in.len()).rev() {
            let mut out = BitSet::new(width);
            for &succ in cfg.successors(n) {
                out.union_with(&self.live_in[succ]);
            }

            let mut live_in = out.clone();
            live_in.difference_with(&self.defs[n]);
            live_in.union_with(&self.uses[n]);

            if out != self.live_out[n] {
                self.live_out[n] = out;
                changed = true;
            }
            if live_in != self.live_in[n] {
                self.live_in[n] = live_in;
                changed = true;
            }
        }

        changed
    }

    /// Returns `true` if one more sweep over `ctx` would change nothing.
    ///
    /// `ctx` must be the context this result was solved from.
    #[must_use]
    pub fn is_fixed_point(&self, ctx: &AnalysisContext) -> bool {
        let mut probe = self.clone();
        !probe.sweep(ctx)
    }

    /// Returns the pass this result was solved for.
    #[must_use]
    pub const fn pass(&self) -> Pass {
        self.pass
    }

    /// Returns the number of sweeps until the fixed point, including the final quiet sweep.
    #[must_use]
    pub const fn sweeps(&self) -> usize {
        self.sweeps
    }

    /// Returns every variable tracked, ascending.
    #[must_use]
    pub fn variables(&self) -> &[LogicalVar] {
        &self.variables
    }

    /// Returns the variables live on entry to instruction `n`, ascending.
    #[must_use]
    pub fn live_in(&self, n: usize) -> Vec<LogicalVar> {
        self.collect(self.live_in.get(n))
    }

    /// Returns the variables live on exit from instruction `n`, ascending.
    #[must_use]
    pub fn live_out(&self, n: usize) -> Vec<LogicalVar> {
        self.collect(self.live_out.get(n))
    }

    /// Returns `true` if `var` is live on entry to instruction `n`.
    #[must_use]
    pub fn is_live_in(&self, n: usize, var: LogicalVar) -> bool {
        Self::member(&self.index, self.live_in.get(n), var)
    }

    /// Returns `true` if `var` is live on exit from instruction `n`.
    #[must_use]
    pub fn is_live_out(&self, n: usize, var: LogicalVar) -> bool {
        Self::member(&self.index, self.live_out.get(n), var)
    }

    /// Returns the largest number of variables simultaneously live into any instruction.
    #[must_use]
    pub fn max_pressure(&self) -> usize {
        self.live_in.iter().map(BitSet::count).max().unwrap_or(0)
    }

    fn collect(&self, set: Option<&BitSet>) -> Vec<LogicalVar> {
        set.map(|s| s.iter().map(|i| self.variables[i]).collect())
            .unwrap_or_default()
    }

    fn member(index: &FxHashMap<LogicalVar, usize>, set: Option<&BitSet>, var: LogicalVar) -> bool {
        match (set, index.get(&var)) {
            (Some(set), Some(&i)) => set.contains(i),
            _ => false,
        }
    }
}
