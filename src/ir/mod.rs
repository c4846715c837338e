//! Instruction and variable model shared by every analysis.
//!
//! - [`Var`] and [`LogicalVar`] - operands and variable identity
//! - [`Instruction`], [`Opcode`] and [`OpcodeFlags`] - three-address code and its capability table
//! - [`InstructionStream`] and [`Pass`] - ordered instruction sequences and their identities

mod instruction;
mod stream;
mod var;

pub use instruction::{BlockId, Instruction, Opcode, OpcodeFlags};
pub use stream::{InstructionStream, Pass};
pub use var::{LogicalVar, Var};
