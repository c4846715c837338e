//! Instruction lowering.
//!
//! [`LoweringPass`] applies a [`Lower`] implementation to every instruction of a stream. A
//! lowering that cannot classify an operand reports
//! [`Error::TypeMismatch`](crate::Error::TypeMismatch); the pass logs it, keeps the
//! instruction unmodified and moves on, so the failure surfaces in a later stage instead of
//! aborting the method here.
//!
//! [`StrengthReduction`] is the built-in lowering:
//!
//! - `x mul 2^k` / `2^k mul x` → `x shl k`
//! - `x mul 1` / `1 mul x` → `x`
//! - `x mul 0` / `0 mul x` → `0`

use tracing::warn;

use crate::{
    analysis::AnalysisContext,
    compiler::{Lower, StreamPass},
    ir::{Instruction, InstructionStream, Opcode, Var},
    Error, Result,
};

/// Applies a [`Lower`] implementation to every instruction.
#[derive(Debug, Default, Clone)]
pub struct LoweringPass<L: Lower> {
    lower: L,
}

impl<L: Lower> LoweringPass<L> {
    /// Creates a lowering pass around `lower`.
    #[must_use]
    pub const fn new(lower: L) -> Self {
        Self { lower }
    }
}

impl<L: Lower> StreamPass for LoweringPass<L> {
    fn name(&self) -> &'static str {
        self.lower.name()
    }

    fn description(&self) -> &'static str {
        "Apply a per-instruction lowering"
    }

    fn run(&self, ctx: &AnalysisContext) -> Result<Option<InstructionStream>> {
        let stream = ctx.stream();
        let mut instructions = Vec::with_capacity(stream.len());
        let mut changed = false;

        for (index, instr) in stream.iter().enumerate() {
            match self.lower.lower(index, instr) {
                Ok(Some(replacement)) => {
                    instructions.extend(replacement);
                    changed = true;
                }
                Ok(None) => instructions.push(instr.clone()),
                Err(error) if error.is_recoverable() => {
                    warn!(
                        pass = self.lower.name(),
                        index,
                        %error,
                        "lowering skipped, instruction kept"
                    );
                    instructions.push(instr.clone());
                }
                Err(error) => return Err(error),
            }
        }

        Ok(changed.then(|| InstructionStream::new(instructions)))
    }
}

/// Replaces multiplications by constants with cheaper operations.
#[derive(Debug, Default, Clone, Copy)]
pub struct StrengthReduction;

impl StrengthReduction {
    fn integer(index: usize, operand: &Var) -> Result<Option<i64>> {
        match operand {
            Var::Const(value) => Ok(Some(*value)),
            Var::Logical(_) | Var::ContentsOf { .. } | Var::Machine(_) => Ok(None),
            Var::Null | Var::Label(_) | Var::AddressOf { .. } => Err(Error::TypeMismatch {
                index,
                message: format!("operand {operand} is not an integer"),
            }),
        }
    }
}

impl Lower for StrengthReduction {
    fn name(&self) -> &'static str {
        "strength-reduction"
    }

    fn lower(&self, index: usize, instr: &Instruction) -> Result<Option<Vec<Instruction>>> {
        if instr.opcode() != Opcode::Mul {
            return Ok(None);
        }

        let lhs = Self::integer(index, instr.op1())?;
        let rhs = Self::integer(index, instr.op2())?;
        let (value, constant) = match (lhs, rhs) {
            (None, Some(c)) => (instr.op1(), c),
            (Some(c), None) => (instr.op2(), c),
            _ => return Ok(None),
        };

        let dst = instr.result().clone();
        let lowered = match constant {
            0 => Instruction::assign(dst, Var::constant(0)),
            1 => Instruction::assign(dst, value.clone()),
            c if c > 0 && c.count_ones() == 1 => Instruction::binary(
                Opcode::Shl,
                dst,
                value.clone(),
                Var::constant(i64::from(c.trailing_zeros())),
            ),
            _ => return Ok(None),
        };
        Ok(Some(vec![lowered]))
    }
}
