//! SSA construction algorithm (Cytron et al.).
//!
//! This module implements the classic SSA construction algorithm from:
//!
//! > Cytron et al., "Efficiently Computing Static Single Assignment Form and the
//! > Control Dependence Graph", ACM TOPLAS 1991
//!
//! # Algorithm Overview
//!
//! SSA conversion of a raw stream proceeds in three phases:
//!
//! 1. **Phi Placement**: Find the labels on the iterated dominance frontier of every
//!    variable's definitions ([`PhiPlacement`])
//! 2. **Materialization**: Build a new stream with one phi per variable inserted directly
//!    after each such label, and analyse it from scratch since indices have shifted
//! 3. **Variable Renaming**: Walk the dominator tree of the new stream with one stack of
//!    visible subscripts per variable, giving every definition a fresh subscript and every
//!    use the subscript on top of its stack
//!
//! Subscripts start at `1`. A use that no definition reaches keeps subscript `0`, which
//! denotes the value the variable holds on entry to the method.
//!
//! # Usage
//!
//! ```rust
//! use tacscope::{analysis::{AnalysisContext, SsaConverter}, ir::*};
//!
//! let x = Var::logical(0);
//! let stream = InstructionStream::new(vec![
//!     Instruction::label(0),
//!     Instruction::assign(x.clone(), Var::constant(1)),
//!     Instruction::binary(Opcode::Add, x.clone(), x.clone(), Var::constant(1)),
//!     Instruction::ret(x),
//! ]);
//! let raw = AnalysisContext::analyze(Pass::Raw, stream)?;
//! let ssa = SsaConverter::convert(&raw)?;
//!
//! assert_eq!(ssa.stream()[2].to_string(), "v0.2 = add v0.1, $1");
//! assert_eq!(ssa.stream()[3].to_string(), "ret v0.2");
//! # Ok::<(), tacscope::Error>(())
//! ```

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::{
    analysis::{ssa::PhiPlacement, AnalysisContext},
    ir::{Instruction, InstructionStream, OpcodeFlags, Pass, Var},
    Error, Result,
};

/// Converts a raw stream into SSA form.
pub struct SsaConverter;

impl SsaConverter {
    /// Converts the stream of `ctx` to SSA form and returns the fully analysed SSA context.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Analysis context of the raw stream
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedPass`] if `ctx` is not a [`Pass::Raw`] context
    /// - [`Error::PhiAtNonLabel`] if a phi is required away from a block entry
    /// - [`Error::MissingBlock`] if an instruction outside any block flows into a phi
    /// - [`Error::MalformedCfg`] if a phi is required at the start label, or if one block
    ///   reaches a phi's label from two exits that see different values of its variable
    /// - Any error from re-analysing the rewritten stream
    pub fn convert(ctx: &AnalysisContext) -> Result<AnalysisContext> {
        if ctx.pass() != Pass::Raw {
            return Err(Error::UnsupportedPass {
                pass: ctx.pass().to_string(),
                operation: "ssa conversion",
            });
        }

        let placement =
            PhiPlacement::compute(ctx.stream(), ctx.cfg(), ctx.defuse(), ctx.dominance())?;
        let with_phis = Self::materialize(ctx, &placement)?;
        let staged = AnalysisContext::analyze(Pass::Ssa, with_phis)?;
        let renamed = Renamer::new(&staged).run()?;

        debug!(
            instructions = renamed.len(),
            phis = placement.count(),
            "converted stream to ssa"
        );

        AnalysisContext::analyze(Pass::Ssa, renamed)
    }

    /// Copies the stream, inserting the placed phis right after their labels.
    fn materialize(ctx: &AnalysisContext, placement: &PhiPlacement) -> Result<InstructionStream> {
        let stream = ctx.stream();
        let mut instructions = Vec::with_capacity(stream.len() + placement.count());

        for (index, instr) in stream.iter().enumerate() {
            instructions.push(instr.clone());

            let vars = placement.at(index);
            if vars.is_empty() {
                continue;
            }

            let block = instr.label_block().ok_or(Error::PhiAtNonLabel {
                index,
                var: vars[0],
                block: ctx.cfg().block_of(index),
            })?;
            let incoming: Vec<_> = ctx
                .cfg()
                .block_predecessors(block)
                .map(|preds| preds.iter().copied().collect())
                .unwrap_or_default();

            for &var in vars {
                instructions.push(Instruction::phi(var, incoming.clone()));
            }
        }

        Ok(InstructionStream::new(instructions))
    }
}

enum Visit {
    Enter(usize),
    /// Logical ids whose stacks were pushed while visiting the node.
    Exit(Vec<u32>),
}

/// Renames one stream along its dominator tree.
struct Renamer<'a> {
    ctx: &'a AnalysisContext,
    instructions: Vec<Instruction>,
    stacks: FxHashMap<u32, Vec<u32>>,
    counters: FxHashMap<u32, u32>,
    /// `(phi index, slot)` to the exit that filled the slot and the subscript it stored.
    filled: FxHashMap<(usize, usize), (usize, u32)>,
}

impl<'a> Renamer<'a> {
    fn new(ctx: &'a AnalysisContext) -> Self {
        Self {
            ctx,
            instructions: ctx.stream().instructions().to_vec(),
            stacks: FxHashMap::default(),
            counters: FxHashMap::default(),
            filled: FxHashMap::default(),
        }
    }

    /// Walks the dominator tree with an explicit stack; the instruction-level tree is as deep
    /// as the longest straight-line run.
    fn run(mut self) -> Result<InstructionStream> {
        let ctx = self.ctx;
        let dominance = ctx.dominance();
        let Some(start) = dominance.start() else {
            return Ok(InstructionStream::new(self.instructions));
        };

        let mut stack = vec![Visit::Enter(start)];
        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(node) => {
                    let pushed = self.rename_instruction(node);
                    self.fill_successor_phis(node)?;

                    stack.push(Visit::Exit(pushed));
                    for &child in dominance.children(node).iter().rev() {
                        stack.push(Visit::Enter(child));
                    }
                }
                Visit::Exit(pushed) => {
                    for id in pushed {
                        if let Some(versions) = self.stacks.get_mut(&id) {
                            versions.pop();
                        }
                    }
                }
            }
        }

        Ok(InstructionStream::new(self.instructions))
    }

    fn top(stacks: &FxHashMap<u32, Vec<u32>>, id: u32) -> u32 {
        stacks.get(&id).and_then(|s| s.last()).copied().unwrap_or(0)
    }

    fn rename_use(stacks: &FxHashMap<u32, Vec<u32>>, operand: &mut Var) {
        if let Some(var) = operand.referenced() {
            *operand = operand.with_ssa(Self::top(stacks, var.id));
        }
    }

    /// Rewrites the uses of instruction `node`, then gives its definition a fresh subscript.
    /// Returns the ids whose stacks were pushed.
    fn rename_instruction(&mut self, node: usize) -> Vec<u32> {
        let stacks = &mut self.stacks;
        let instr = &mut self.instructions[node];

        // Phi operands are filled from the predecessors instead
        if !instr.is_phi() {
            Self::rename_use(stacks, &mut instr.op1);
            Self::rename_use(stacks, &mut instr.op2);
            if instr.flags().contains(OpcodeFlags::CALL_LIKE) {
                for arg in &mut instr.extra {
                    Self::rename_use(stacks, arg);
                }
            }
            if matches!(instr.result, Var::ContentsOf { .. }) {
                Self::rename_use(stacks, &mut instr.result);
            }
        }

        let mut pushed = Vec::new();
        if let Var::Logical(var) = instr.result {
            let counter = self.counters.entry(var.id).or_insert(0);
            *counter += 1;
            let subscript = *counter;

            instr.result = Var::Logical(var.with_ssa(subscript));
            stacks.entry(var.id).or_default().push(subscript);
            pushed.push(var.id);
        }
        pushed
    }

    /// Fills the operand slot for `node`'s block in every phi of every label `node` can jump or
    /// fall into.
    ///
    /// A block has one slot per phi, so every exit of the block that reaches the label must
    /// carry the same subscript.
    fn fill_successor_phis(&mut self, node: usize) -> Result<()> {
        let ctx = self.ctx;
        let cfg = ctx.cfg();
        let len = self.instructions.len();

        for &succ in cfg.successors(node) {
            if !self.instructions[succ].is_label() {
                continue;
            }

            let mut index = succ + 1;
            while index < len && self.instructions[index].is_phi() {
                let from = cfg.block_of(node).ok_or(Error::MissingBlock { index: node })?;
                let phi = &mut self.instructions[index];

                let slot = phi.incoming.iter().position(|&block| block == from);
                if let (Some(slot), Some(var)) = (slot, phi.phi_var()) {
                    let subscript = Self::top(&self.stacks, var.id);
                    if let Some(&(exit, previous)) = self.filled.get(&(index, slot)) {
                        if previous != subscript {
                            return Err(malformed_cfg!(
                                "block {} reaches the label at {} from both {} and {} with different values of {}",
                                from,
                                succ,
                                exit,
                                node,
                                var
                            ));
                        }
                    }
                    self.filled.insert((index, slot), (node, subscript));
                    phi.extra[slot] = Var::Logical(var.with_ssa(subscript));
                }
                index += 1;
            }
        }

        Ok(())
    }
}
