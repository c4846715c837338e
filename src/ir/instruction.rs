//! Three-address instructions and the opcode capability table.
//!
//! An [`Instruction`] has an [`Opcode`], a result operand, up to two source operands and,
//! for call-like and phi-like opcodes, an ordered list of extra operands. Control flow is
//! expressed with two kinds of markers:
//!
//! - `label` instructions open a block and carry its [`BlockId`]
//! - `br`/`brif` instructions carry the [`BlockId`] they transfer control to
//!
//! Everything the analyses need to know about an opcode is looked up through
//! [`Opcode::flags`], a single explicit table instead of per-call-site matching.

use std::fmt;

use bitflags::bitflags;
use strum::{Display, EnumIter};

use crate::ir::{LogicalVar, Var};

/// Identifier of a block, carried by the label that opens it.
pub type BlockId = u32;

bitflags! {
    /// Capabilities of an opcode, as seen by the control-flow and dataflow analyses.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpcodeFlags: u8 {
        /// Opens a block; the instruction carries the block id.
        const LABEL = 0x01;
        /// Transfers control to the block named by the instruction.
        const BRANCH = 0x02;
        /// Control never continues with the next instruction.
        const NO_FALLTHROUGH = 0x04;
        /// The extra operand list holds call arguments.
        const CALL_LIKE = 0x08;
        /// The extra operand list holds one incoming value per predecessor block.
        const PHI_LIKE = 0x10;
        /// Must not be removed even if its result is dead.
        const SIDE_EFFECTS = 0x20;
    }
}

/// Opcode tag of a three-address instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Opcode {
    /// No operation.
    Nop,
    /// Block entry marker.
    Label,
    /// `result = op1`
    Assign,
    /// `result = op1 + op2`
    Add,
    /// `result = op1 - op2`
    Sub,
    /// `result = op1 * op2`
    Mul,
    /// `result = op1 / op2`
    Div,
    /// `result = op1 % op2`
    Rem,
    /// `result = op1 & op2`
    And,
    /// `result = op1 | op2`
    Or,
    /// `result = op1 ^ op2`
    Xor,
    /// `result = op1 << op2`
    Shl,
    /// `result = op1 >> op2`
    Shr,
    /// `result = -op1`
    Neg,
    /// `result = !op1`
    Not,
    /// `result = compare(op1, op2)`
    Cmp,
    /// Unconditional branch.
    Br,
    /// Conditional branch on `op1`; falls through when not taken.
    BrIf,
    /// Call of `op1` with the extra operands as arguments.
    Call,
    /// Return `op1` (which may be empty).
    Ret,
    /// Throw `op1`.
    Throw,
    /// SSA phi function.
    Phi,
}

impl Opcode {
    /// Returns the capability flags of this opcode.
    #[must_use]
    pub const fn flags(self) -> OpcodeFlags {
        match self {
            Opcode::Label => OpcodeFlags::LABEL,
            Opcode::Br => OpcodeFlags::BRANCH
                .union(OpcodeFlags::NO_FALLTHROUGH)
                .union(OpcodeFlags::SIDE_EFFECTS),
            Opcode::BrIf => OpcodeFlags::BRANCH.union(OpcodeFlags::SIDE_EFFECTS),
            Opcode::Ret | Opcode::Throw => {
                OpcodeFlags::NO_FALLTHROUGH.union(OpcodeFlags::SIDE_EFFECTS)
            }
            Opcode::Call => OpcodeFlags::CALL_LIKE.union(OpcodeFlags::SIDE_EFFECTS),
            Opcode::Phi => OpcodeFlags::PHI_LIKE,
            // Division can trap
            Opcode::Div | Opcode::Rem => OpcodeFlags::SIDE_EFFECTS,
            Opcode::Nop
            | Opcode::Assign
            | Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::And
            | Opcode::Or
            | Opcode::Xor
            | Opcode::Shl
            | Opcode::Shr
            | Opcode::Neg
            | Opcode::Not
            | Opcode::Cmp => OpcodeFlags::empty(),
        }
    }
}

/// A single three-address instruction.
///
/// Instructions are values: once placed in an [`InstructionStream`](crate::ir::InstructionStream)
/// they are never mutated. Rewrites such as SSA conversion build a new stream. Derived facts
/// (block membership, defs and uses) live in the analysis results for that stream.
///
/// # Examples
///
/// ```rust
/// use tacscope::ir::{Instruction, Opcode, Var};
///
/// let add = Instruction::binary(Opcode::Add, Var::logical(0), Var::logical(1), Var::constant(2));
/// assert_eq!(add.to_string(), "v0 = add v1, $2");
/// assert!(add.falls_through());
///
/// let br = Instruction::br(4);
/// assert_eq!(br.target(), Some(4));
/// assert!(!br.falls_through());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub(crate) opcode: Opcode,
    pub(crate) result: Var,
    pub(crate) op1: Var,
    pub(crate) op2: Var,
    pub(crate) extra: Vec<Var>,
    /// Block opened by a label, or targeted by a branch.
    pub(crate) block: Option<BlockId>,
    /// Incoming blocks of a phi, parallel to `extra`.
    pub(crate) incoming: Vec<BlockId>,
}

impl Instruction {
    fn new(opcode: Opcode, result: Var, op1: Var, op2: Var) -> Self {
        Self {
            opcode,
            result,
            op1,
            op2,
            extra: Vec::new(),
            block: None,
            incoming: Vec::new(),
        }
    }

    /// Creates a `nop`.
    #[must_use]
    pub fn nop() -> Self {
        Self::new(Opcode::Nop, Var::Null, Var::Null, Var::Null)
    }

    /// Creates a label opening `block`.
    #[must_use]
    pub fn label(block: BlockId) -> Self {
        let mut instr = Self::new(Opcode::Label, Var::Null, Var::Null, Var::Null);
        instr.block = Some(block);
        instr
    }

    /// Creates an unconditional branch to `target`.
    #[must_use]
    pub fn br(target: BlockId) -> Self {
        let mut instr = Self::new(Opcode::Br, Var::Null, Var::Null, Var::Null);
        instr.block = Some(target);
        instr
    }

    /// Creates a conditional branch to `target`, taken when `cond` is non-zero.
    #[must_use]
    pub fn br_if(cond: Var, target: BlockId) -> Self {
        let mut instr = Self::new(Opcode::BrIf, Var::Null, cond, Var::Null);
        instr.block = Some(target);
        instr
    }

    /// Creates `dst = src`.
    #[must_use]
    pub fn assign(dst: Var, src: Var) -> Self {
        Self::new(Opcode::Assign, dst, src, Var::Null)
    }

    /// Creates `dst = op lhs, rhs`.
    #[must_use]
    pub fn binary(op: Opcode, dst: Var, lhs: Var, rhs: Var) -> Self {
        Self::new(op, dst, lhs, rhs)
    }

    /// Creates `dst = op src`.
    #[must_use]
    pub fn unary(op: Opcode, dst: Var, src: Var) -> Self {
        Self::new(op, dst, src, Var::Null)
    }

    /// Creates `dst = call target(args...)`. `dst` may be [`Var::Null`].
    #[must_use]
    pub fn call(dst: Var, target: Var, args: Vec<Var>) -> Self {
        let mut instr = Self::new(Opcode::Call, dst, target, Var::Null);
        instr.extra = args;
        instr
    }

    /// Creates `ret value`. `value` may be [`Var::Null`].
    #[must_use]
    pub fn ret(value: Var) -> Self {
        Self::new(Opcode::Ret, Var::Null, value, Var::Null)
    }

    /// Creates `throw value`.
    #[must_use]
    pub fn throw(value: Var) -> Self {
        Self::new(Opcode::Throw, Var::Null, value, Var::Null)
    }

    /// Creates an unrenamed phi for `var` with one operand slot per incoming block.
    ///
    /// Every slot initially refers to `var` itself; renaming fills in the reaching subscripts.
    #[must_use]
    pub fn phi(var: LogicalVar, incoming: Vec<BlockId>) -> Self {
        let var = var.base();
        let mut instr = Self::new(Opcode::Phi, Var::Logical(var), Var::Null, Var::Null);
        instr.extra = vec![Var::Logical(var); incoming.len()];
        instr.incoming = incoming;
        instr
    }

    /// Returns the opcode.
    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Returns the capability flags of the opcode.
    #[must_use]
    pub const fn flags(&self) -> OpcodeFlags {
        self.opcode.flags()
    }

    /// Returns the result operand.
    #[must_use]
    pub const fn result(&self) -> &Var {
        &self.result
    }

    /// Returns the first source operand.
    #[must_use]
    pub const fn op1(&self) -> &Var {
        &self.op1
    }

    /// Returns the second source operand.
    #[must_use]
    pub const fn op2(&self) -> &Var {
        &self.op2
    }

    /// Returns the extra operands (call arguments or phi operands).
    #[must_use]
    pub fn extra(&self) -> &[Var] {
        &self.extra
    }

    /// Returns the incoming blocks of a phi, in operand order.
    #[must_use]
    pub fn incoming(&self) -> &[BlockId] {
        &self.incoming
    }

    /// Returns the block opened by this instruction if it is a label.
    #[must_use]
    pub fn label_block(&self) -> Option<BlockId> {
        if self.is_label() {
            self.block
        } else {
            None
        }
    }

    /// Returns the branch target if this instruction is a branch.
    #[must_use]
    pub fn target(&self) -> Option<BlockId> {
        if self.is_branch() {
            self.block
        } else {
            None
        }
    }

    /// Returns the variable a phi merges.
    #[must_use]
    pub fn phi_var(&self) -> Option<LogicalVar> {
        if self.is_phi() {
            self.result.referenced().map(LogicalVar::base)
        } else {
            None
        }
    }

    /// Returns `true` if this instruction opens a block.
    #[must_use]
    pub const fn is_label(&self) -> bool {
        self.flags().contains(OpcodeFlags::LABEL)
    }

    /// Returns `true` if this instruction transfers control to a named block.
    #[must_use]
    pub const fn is_branch(&self) -> bool {
        self.flags().contains(OpcodeFlags::BRANCH)
    }

    /// Returns `true` if this is a phi function.
    #[must_use]
    pub const fn is_phi(&self) -> bool {
        self.flags().contains(OpcodeFlags::PHI_LIKE)
    }

    /// Returns `true` unless control never continues with the next instruction.
    #[must_use]
    pub const fn falls_through(&self) -> bool {
        !self.flags().contains(OpcodeFlags::NO_FALLTHROUGH)
    }

    /// Returns `true` if the instruction has effects beyond defining its result.
    #[must_use]
    pub const fn has_side_effects(&self) -> bool {
        self.flags().contains(OpcodeFlags::SIDE_EFFECTS)
            || matches!(self.result, Var::ContentsOf { .. } | Var::Machine(_))
    }

    /// Returns the source operands: `op1`, `op2`, and the extra operands for call-like and
    /// phi-like opcodes.
    pub fn sources(&self) -> impl Iterator<Item = &Var> + '_ {
        let extra: &[Var] = if self
            .flags()
            .intersects(OpcodeFlags::CALL_LIKE | OpcodeFlags::PHI_LIKE)
        {
            &self.extra
        } else {
            &[]
        };
        [&self.op1, &self.op2]
            .into_iter()
            .chain(extra.iter())
            .filter(|v| !v.is_null())
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.opcode {
            Opcode::Label => write!(f, "label L{}", self.block.unwrap_or_default()),
            Opcode::Br => write!(f, "br L{}", self.block.unwrap_or_default()),
            Opcode::BrIf => write!(f, "brif {}, L{}", self.op1, self.block.unwrap_or_default()),
            Opcode::Nop => write!(f, "nop"),
            Opcode::Ret | Opcode::Throw if self.op1.is_null() => write!(f, "{}", self.opcode),
            Opcode::Ret | Opcode::Throw => write!(f, "{} {}", self.opcode, self.op1),
            Opcode::Assign => write!(f, "{} = {}", self.result, self.op1),
            Opcode::Phi => {
                write!(f, "{} = phi [", self.result)?;
                for (i, (block, value)) in self.incoming.iter().zip(&self.extra).enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "L{block}: {value}")?;
                }
                write!(f, "]")
            }
            Opcode::Call => {
                if !self.result.is_null() {
                    write!(f, "{} = ", self.result)?;
                }
                write!(f, "call {}(", self.op1)?;
                for (i, arg) in self.extra.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            _ if self.op2.is_null() => write!(f, "{} = {} {}", self.result, self.opcode, self.op1),
            _ => write!(
                f,
                "{} = {} {}, {}",
                self.result, self.opcode, self.op1, self.op2
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_control_flow_classification() {
        assert!(Instruction::label(1).is_label());
        assert_eq!(Instruction::label(1).label_block(), Some(1));
        assert_eq!(Instruction::label(1).target(), None);

        let br = Instruction::br(2);
        assert!(br.is_branch());
        assert!(!br.falls_through());

        let br_if = Instruction::br_if(Var::logical(0), 3);
        assert!(br_if.is_branch());
        assert!(br_if.falls_through());
        assert_eq!(br_if.target(), Some(3));

        assert!(!Instruction::ret(Var::Null).falls_through());
        assert!(!Instruction::throw(Var::logical(1)).falls_through());
    }

    #[test]
    fn test_flags_are_consistent() {
        for opcode in Opcode::iter() {
            let flags = opcode.flags();
            if flags.contains(OpcodeFlags::BRANCH) || flags.contains(OpcodeFlags::NO_FALLTHROUGH)
            {
                assert!(
                    flags.contains(OpcodeFlags::SIDE_EFFECTS),
                    "{opcode} transfers control but is removable"
                );
            }
            assert!(
                !(flags.contains(OpcodeFlags::LABEL) && flags.contains(OpcodeFlags::BRANCH)),
                "{opcode} cannot both open and leave a block"
            );
        }
    }

    #[test]
    fn test_sources_include_call_arguments() {
        let call = Instruction::call(
            Var::logical(0),
            Var::Label("f".into()),
            vec![Var::logical(1), Var::constant(2)],
        );
        let sources: Vec<_> = call.sources().cloned().collect();
        assert_eq!(
            sources,
            vec![Var::Label("f".into()), Var::logical(1), Var::constant(2)]
        );

        // Extra operands of ordinary opcodes are not sources
        let mut add = Instruction::binary(
            Opcode::Add,
            Var::logical(0),
            Var::logical(1),
            Var::logical(2),
        );
        add.extra.push(Var::logical(9));
        assert_eq!(add.sources().count(), 2);
    }

    #[test]
    fn test_phi_construction() {
        let phi = Instruction::phi(LogicalVar::new(3).with_ssa(4), vec![2, 5]);
        assert!(phi.is_phi());
        assert_eq!(phi.phi_var(), Some(LogicalVar::new(3)));
        assert_eq!(phi.extra().len(), 2);
        assert_eq!(phi.incoming(), &[2, 5]);
        assert_eq!(phi.to_string(), "v3 = phi [L2: v3, L5: v3]");
    }

    #[test]
    fn test_display() {
        assert_eq!(Instruction::label(0).to_string(), "label L0");
        assert_eq!(
            Instruction::br_if(Var::logical(1), 2).to_string(),
            "brif v1, L2"
        );
        assert_eq!(Instruction::ret(Var::Null).to_string(), "ret");
        assert_eq!(
            Instruction::unary(Opcode::Neg, Var::logical(0), Var::logical(1)).to_string(),
            "v0 = neg v1"
        );
        assert_eq!(
            Instruction::call(Var::Null, Var::Label("g".into()), vec![Var::logical(1)])
                .to_string(),
            "call @g(v1)"
        );
    }

    #[test]
    fn test_store_through_pointer_has_side_effects() {
        let store = Instruction::assign(
            Var::ContentsOf {
                base: LogicalVar::new(0),
                offset: 0,
            },
            Var::constant(1),
        );
        assert!(store.has_side_effects());
        assert!(!Instruction::assign(Var::logical(0), Var::constant(1)).has_side_effects());
    }
}
