//! Instruction streams and pass identities.

use std::{fmt, ops::Index, str::FromStr};

use strum::{Display, EnumIter, EnumString};

use crate::{ir::Instruction, Error, Result};

/// Identity of one of the three instruction streams a method has over its lifetime.
///
/// Each stream is an independent analysis universe: facts computed for one pass are never
/// consulted while analysing another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Pass {
    /// The stream as produced by the bytecode translator.
    Raw,
    /// The stream after SSA conversion.
    Ssa,
    /// The stream after optimization and lowering.
    Optimized,
}

impl Pass {
    /// Parses a pass name, rejecting unknown stream identities.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPass`] if `name` is not one of `raw`, `ssa` or `optimized`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tacscope::ir::Pass;
    ///
    /// assert_eq!(Pass::parse("ssa")?, Pass::Ssa);
    /// assert!(Pass::parse("final").is_err());
    /// # Ok::<(), tacscope::Error>(())
    /// ```
    pub fn parse(name: &str) -> Result<Self> {
        Pass::from_str(name).map_err(|_| Error::UnsupportedPass {
            pass: name.to_string(),
            operation: "parse",
        })
    }
}

/// An ordered, 0-indexed sequence of instructions.
///
/// The index of an instruction is its identifier within the stream. Streams are never edited
/// in place; every rewrite produces a new stream with its own analysis facts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstructionStream {
    instructions: Vec<Instruction>,
}

impl InstructionStream {
    /// Creates a stream from a list of instructions.
    #[must_use]
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    /// Returns the number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns `true` if the stream holds no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Returns the instruction at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    /// Returns all instructions as a slice.
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Returns an iterator over the instructions.
    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    /// Consumes the stream and returns its instructions.
    #[must_use]
    pub fn into_instructions(self) -> Vec<Instruction> {
        self.instructions
    }
}

impl Index<usize> for InstructionStream {
    type Output = Instruction;

    fn index(&self, index: usize) -> &Self::Output {
        &self.instructions[index]
    }
}

impl FromIterator<Instruction> for InstructionStream {
    fn from_iter<T: IntoIterator<Item = Instruction>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a InstructionStream {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}

impl fmt::Display for InstructionStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, instr) in self.instructions.iter().enumerate() {
            if instr.is_label() {
                writeln!(f, "{index:4}: {instr}")?;
            } else {
                writeln!(f, "{index:4}:     {instr}")?;
            }
        }
        Ok(())
    }
}
