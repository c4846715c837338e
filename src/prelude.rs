//! # tacscope Prelude
//!
//! This module re-exports the types needed for the common workflow: build an instruction
//! stream, analyse it, convert it to SSA and query liveness.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all tacscope operations
pub use crate::Error;

/// The result type used throughout tacscope
pub use crate::Result;

// ================================================================================================
// Instruction Model
// ================================================================================================

pub use crate::ir::{
    BlockId, Instruction, InstructionStream, LogicalVar, Opcode, OpcodeFlags, Pass, Var,
};

// ================================================================================================
// Analyses
// ================================================================================================

pub use crate::analysis::{
    verify_ssa, AnalysisContext, Cfg, DefUse, Dominance, Liveness, PhiPlacement, SsaConverter,
};

// ================================================================================================
// Pipeline
// ================================================================================================

pub use crate::compiler::{
    CompiledMethod, DeadDefinitionElimination, Lower, LoweringPass, Method, MethodCompiler,
    PipelineConfig, StreamPass, StrengthReduction,
};
