//! Configuration for the per-method compilation pipeline.
//!
//! This module provides [`PipelineConfig`], which selects the stages a
//! [`MethodCompiler`](crate::compiler::MethodCompiler) runs and bounds the optimization loop.

use crate::ir::Pass;

/// Configuration for the per-method pipeline.
///
/// The raw stream is always analysed. Every later stage can be switched off independently;
/// a disabled stage simply produces no stream for its pass.
///
/// # Examples
///
/// ```rust
/// use tacscope::{compiler::PipelineConfig, ir::Pass};
///
/// let config = PipelineConfig::default()
///     .with_optimization(false)
///     .with_final_pass(Pass::Ssa);
/// assert!(config.convert_to_ssa);
/// assert!(!config.optimize);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Convert the raw stream to SSA form (default: true).
    pub convert_to_ssa: bool,

    /// Run the stream passes to produce the optimized stream (default: true).
    pub optimize: bool,

    /// Solve liveness for every produced stream (default: true).
    pub compute_liveness: bool,

    /// Check the SSA stream with [`verify_ssa`](crate::analysis::verify_ssa) after conversion
    /// (default: on in debug builds).
    pub verify_ssa: bool,

    /// Maximum rounds over all stream passes before the optimized stream is accepted as is
    /// (default: 8).
    pub max_optimization_rounds: usize,

    /// The pass whose stream is handed to code emission (default: [`Pass::Optimized`]).
    ///
    /// If that pass is not produced, the latest produced pass is used instead.
    pub final_pass: Pass,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            convert_to_ssa: true,
            optimize: true,
            compute_liveness: true,
            verify_ssa: cfg!(debug_assertions),
            max_optimization_rounds: 8,
            final_pass: Pass::Optimized,
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration that only analyses the raw stream.
    #[must_use]
    pub fn analysis_only() -> Self {
        Self {
            convert_to_ssa: false,
            optimize: false,
            final_pass: Pass::Raw,
            ..Self::default()
        }
    }

    /// Enables or disables SSA conversion.
    #[must_use]
    pub fn with_ssa(mut self, enabled: bool) -> Self {
        self.convert_to_ssa = enabled;
        self
    }

    /// Enables or disables the optimization stage.
    #[must_use]
    pub fn with_optimization(mut self, enabled: bool) -> Self {
        self.optimize = enabled;
        self
    }

    /// Enables or disables liveness for every produced stream.
    #[must_use]
    pub fn with_liveness(mut self, enabled: bool) -> Self {
        self.compute_liveness = enabled;
        self
    }

    /// Enables or disables SSA verification.
    #[must_use]
    pub fn with_verification(mut self, enabled: bool) -> Self {
        self.verify_ssa = enabled;
        self
    }

    /// Sets the maximum number of optimization rounds.
    ///
    /// # Arguments
    ///
    /// * `rounds` - The maximum number of rounds over all stream passes.
    ///
    /// # Returns
    ///
    /// The modified configuration (builder pattern).
    #[must_use]
    pub fn with_max_optimization_rounds(mut self, rounds: usize) -> Self {
        self.max_optimization_rounds = rounds;
        self
    }

    /// Sets the pass whose stream is handed to code emission.
    #[must_use]
    pub fn with_final_pass(mut self, pass: Pass) -> Self {
        self.final_pass = pass;
        self
    }
}
