//! Def/use extraction for an instruction stream.
//!
//! This module provides [`DefUse`], the per-instruction and per-variable index of definitions
//! and uses that SSA conversion, liveness and the stream passes share.
//!
//! # Rules
//!
//! - An instruction **defines** its result operand if the result is a plain logical variable.
//!   Stores through a pointer (`[p] = ...`), machine locations and constants define nothing.
//! - An instruction **uses** every source operand that refers to a logical variable, including
//!   the base of address-of and contents-of operands. For call-like and phi-like opcodes the
//!   extra operands are sources as well.
//! - A store through a pointer uses the pointer: the base of a contents-of result is a use.
//!
//! Variables are keyed by their full identity, SSA subscript included, so the same index serves
//! both raw and SSA streams.
//!
//! # Usage
//!
//! ```rust
//! use tacscope::{analysis::DefUse, ir::{Instruction, InstructionStream, LogicalVar, Opcode, Var}};
//!
//! let stream = InstructionStream::new(vec![
//!     Instruction::assign(Var::logical(0), Var::constant(1)),
//!     Instruction::binary(Opcode::Add, Var::logical(1), Var::logical(0), Var::logical(0)),
//! ]);
//! let index = DefUse::compute(&stream);
//!
//! let x = LogicalVar::new(0);
//! assert_eq!(index.def_sites(x), &[0]);
//! assert_eq!(index.uses_of(x), &[1]);
//! assert_eq!(index.uses_at(1), &[x]);
//! assert!(index.is_unused(LogicalVar::new(1)));
//! ```

use std::collections::{BTreeMap, BTreeSet};

use crate::ir::{Instruction, InstructionStream, LogicalVar, Var};

/// Definitions and uses of logical variables, by instruction and by variable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefUse {
    defs: Vec<Vec<LogicalVar>>,
    uses: Vec<Vec<LogicalVar>>,
    def_sites: BTreeMap<LogicalVar, Vec<usize>>,
    use_sites: BTreeMap<LogicalVar, Vec<usize>>,
}

impl DefUse {
    /// Extracts definitions and uses from every instruction of `stream`.
    #[must_use]
    pub fn compute(stream: &InstructionStream) -> Self {
        let mut index = DefUse {
            defs: Vec::with_capacity(stream.len()),
            uses: Vec::with_capacity(stream.len()),
            ..DefUse::default()
        };

        for (position, instr) in stream.iter().enumerate() {
            let defs = Self::defs_of(instr);
            let uses = Self::uses_of_instruction(instr);

            for &var in &defs {
                index.def_sites.entry(var).or_default().push(position);
            }
            for &var in &uses {
                index.use_sites.entry(var).or_default().push(position);
            }

            index.defs.push(defs);
            index.uses.push(uses);
        }

        index
    }

    fn defs_of(instr: &Instruction) -> Vec<LogicalVar> {
        instr.result().as_logical().into_iter().collect()
    }

    fn uses_of_instruction(instr: &Instruction) -> Vec<LogicalVar> {
        let mut uses = Vec::new();
        let store_base = match instr.result() {
            Var::ContentsOf { base, .. } => Some(*base),
            _ => None,
        };

        for var in instr
            .sources()
            .filter_map(Var::referenced)
            .chain(store_base)
        {
            if !uses.contains(&var) {
                uses.push(var);
            }
        }
        uses
    }

    /// Returns the number of instructions indexed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Returns `true` if no instruction was indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Returns the variables defined by instruction `index`.
    #[must_use]
    pub fn defs_at(&self, index: usize) -> &[LogicalVar] {
        self.defs.get(index).map_or(&[], Vec::as_slice)
    }

    /// Returns the variables used by instruction `index`, in operand order without duplicates.
    #[must_use]
    pub fn uses_at(&self, index: usize) -> &[LogicalVar] {
        self.uses.get(index).map_or(&[], Vec::as_slice)
    }

    /// Returns the instructions defining `var`, ascending.
    #[must_use]
    pub fn def_sites(&self, var: LogicalVar) -> &[usize] {
        self.def_sites.get(&var).map_or(&[], Vec::as_slice)
    }

    /// Returns the instructions using `var`, ascending.
    #[must_use]
    pub fn uses_of(&self, var: LogicalVar) -> &[usize] {
        self.use_sites.get(&var).map_or(&[], Vec::as_slice)
    }

    /// Returns the number of instructions using `var`.
    #[must_use]
    pub fn use_count(&self, var: LogicalVar) -> usize {
        self.uses_of(var).len()
    }

    /// Returns `true` if `var` is defined somewhere but never used.
    #[must_use]
    pub fn is_unused(&self, var: LogicalVar) -> bool {
        self.def_sites.contains_key(&var) && !self.use_sites.contains_key(&var)
    }

    /// Returns every variable that is defined or used, ascending.
    #[must_use]
    pub fn variables(&self) -> Vec<LogicalVar> {
        self.def_sites
            .keys()
            .chain(self.use_sites.keys())
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Returns the defined variables together with their defining instructions.
    pub fn definitions(&self) -> impl Iterator<Item = (LogicalVar, &[usize])> + '_ {
        self.def_sites
            .iter()
            .map(|(&var, sites)| (var, sites.as_slice()))
    }

    /// Groups definitions by logical id, ignoring SSA subscripts.
    ///
    /// The keys are base variables (subscript `0`).
    #[must_use]
    pub fn definitions_by_variable(&self) -> BTreeMap<LogicalVar, BTreeSet<usize>> {
        let mut grouped: BTreeMap<LogicalVar, BTreeSet<usize>> = BTreeMap::new();
        for (var, sites) in self.definitions() {
            grouped
                .entry(var.base())
                .or_default()
                .extend(sites.iter().copied());
        }
        grouped
    }
}
