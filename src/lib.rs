// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::module_name_repetitions)]

//! # tacscope
//!
//! Control-flow, dominance, SSA and liveness analysis over per-method three-address code.
//!
//! `tacscope` is the middle-end of a bytecode-to-native backend. It takes the flat instruction
//! stream an upstream translator produces for one method and derives the facts that register
//! allocation and code emission need: a control flow graph, the dominance relation with its
//! frontiers, a static single-assignment form of the stream and per-instruction liveness.
//!
//! # Architecture
//!
//! The crate is organized in three layers:
//!
//! - [`ir`] - Instructions, operands, instruction streams and pass identities
//! - [`analysis`] - CFG construction, dominance, def/use extraction, SSA conversion and liveness
//! - [`compiler`] - The per-method pipeline that chains the analyses over the raw, SSA and
//!   optimized streams, plus the stream passes that produce the optimized stream
//!
//! Every analysis result is immutable and belongs to exactly one stream. A rewrite (SSA
//! conversion, dead definition elimination, lowering) produces a new stream, which is analysed
//! from scratch into a new [`analysis::AnalysisContext`].
//!
//! # Quick Start
//!
//! ```rust
//! use tacscope::prelude::*;
//!
//! // label 0: x = 1; brif c, L2; br L3
//! // label 2: x = 2; br L4
//! // label 3: x = 3; br L4
//! // label 4: y = x; ret y
//! let (x, y, c) = (Var::logical(0), Var::logical(1), Var::logical(2));
//! let stream = InstructionStream::new(vec![
//!     Instruction::label(0),
//!     Instruction::assign(x.clone(), Var::constant(1)),
//!     Instruction::br_if(c, 2),
//!     Instruction::br(3),
//!     Instruction::label(2),
//!     Instruction::assign(x.clone(), Var::constant(2)),
//!     Instruction::br(4),
//!     Instruction::label(3),
//!     Instruction::assign(x.clone(), Var::constant(3)),
//!     Instruction::br(4),
//!     Instruction::label(4),
//!     Instruction::assign(y.clone(), x),
//!     Instruction::ret(y),
//! ]);
//!
//! let compiler = MethodCompiler::new(PipelineConfig::default());
//! let compiled = compiler.compile(&Method::new("diamond", stream))?;
//!
//! let ssa = compiled.context(Pass::Ssa)?;
//! let phis = ssa.stream().iter().filter(|i| i.is_phi()).count();
//! assert_eq!(phis, 1);
//! # Ok::<(), tacscope::Error>(())
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T>`]. A fatal [`Error`] aborts the analysis of one
//! method only; [`compiler::MethodCompiler::compile_all`] reports it for that method and keeps
//! compiling the others.
//!
//! # Logging
//!
//! The crate emits [`tracing`](https://docs.rs/tracing) events at stage boundaries. It never
//! installs a subscriber; that is left to the embedding application.

#[macro_use]
pub(crate) mod error;

#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
///
/// ```rust
/// use tacscope::prelude::*;
///
/// let stream = InstructionStream::new(vec![Instruction::label(0), Instruction::ret(Var::Null)]);
/// let ctx = AnalysisContext::analyze(Pass::Raw, stream)?;
/// assert_eq!(ctx.cfg().block_count(), 1);
/// # Ok::<(), tacscope::Error>(())
/// ```
pub mod prelude;

/// Instruction and operand model.
///
/// Three-address instructions, their operands, instruction streams and the identities of the
/// streams a method goes through.
pub mod ir;

/// Control-flow and dataflow analyses over a single instruction stream.
pub mod analysis;

/// Per-method compilation pipeline and stream passes.
pub mod compiler;

/// Shared helpers: dense bit sets and DOT escaping.
pub mod utils;

/// `tacscope` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always
/// [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `tacscope` Error type
///
/// The main error type for all operations in this crate. See the variants for the individual
/// failure categories.
pub use error::Error;
