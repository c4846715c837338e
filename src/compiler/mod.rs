//! Per-method compilation pipeline.
//!
//! This module chains the analyses of [`crate::analysis`] over the three streams a method goes
//! through:
//!
//! - **raw** - the stream produced by the bytecode translator
//! - **ssa** - the raw stream converted to SSA form
//! - **optimized** - the SSA stream (or the raw stream, without SSA) after the stream passes
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Compiler Pipeline                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  MethodCompiler           Per-method driver                 │
//! │    ├─ compile()            One method, errors wrapped       │
//! │    └─ compile_all()        Independent methods in parallel  │
//! │                                                             │
//! │  PipelineConfig           Stage selection and limits        │
//! │                                                             │
//! │  PassScheduler            Fixed-point pass execution        │
//! │                                                             │
//! │  StreamPass trait         Interface for stream rewrites     │
//! │    ├─ DeadDefinitionElimination                             │
//! │    └─ LoweringPass<L: Lower>                                │
//! │         └─ StrengthReduction                                │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod method;
mod pass;
mod passes;
mod scheduler;

pub use config::PipelineConfig;
pub use method::{CompiledMethod, Method, MethodCompiler};
pub use pass::{Lower, StreamPass};
pub use passes::{DeadDefinitionElimination, LoweringPass, StrengthReduction};
pub use scheduler::PassScheduler;
