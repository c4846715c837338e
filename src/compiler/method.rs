//! Per-method compilation.
//!
//! A [`MethodCompiler`] takes the raw stream of one method through every stage enabled in its
//! [`PipelineConfig`]:
//!
//! ```text
//!  raw ──► analyse ──► SSA conversion ──► verify ──► stream passes ──► optimized
//!              │               │                            │
//!              └── liveness    └── liveness                 └── liveness
//! ```
//!
//! Each method is compiled with its own analysis state, so [`MethodCompiler::compile_all`]
//! compiles methods in parallel and a failing method never affects the others.

use rayon::prelude::*;
use tracing::debug;

use crate::{
    analysis::{verify_ssa, AnalysisContext, Liveness, SsaConverter},
    compiler::{PassScheduler, PipelineConfig, StreamPass},
    ir::{InstructionStream, Pass},
    Error, Result,
};

/// A method to compile: its name and raw instruction stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    name: String,
    stream: InstructionStream,
}

impl Method {
    /// Creates a method from its name (or signature) and raw stream.
    #[must_use]
    pub fn new(name: impl Into<String>, stream: InstructionStream) -> Self {
        Self {
            name: name.into(),
            stream,
        }
    }

    /// Returns the name of the method.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the raw instruction stream.
    #[must_use]
    pub const fn stream(&self) -> &InstructionStream {
        &self.stream
    }
}

/// The result of compiling one method: an analysis context, and optionally liveness, for each
/// produced pass.
#[derive(Debug)]
pub struct CompiledMethod {
    name: String,
    raw: AnalysisContext,
    ssa: Option<AnalysisContext>,
    optimized: Option<AnalysisContext>,
    liveness: Vec<Liveness>,
    final_pass: Pass,
    optimization_rounds: usize,
}

impl CompiledMethod {
    /// Returns the name of the method.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the passes that were produced, in pipeline order.
    #[must_use]
    pub fn passes(&self) -> Vec<Pass> {
        let mut passes = vec![Pass::Raw];
        if self.ssa.is_some() {
            passes.push(Pass::Ssa);
        }
        if self.optimized.is_some() {
            passes.push(Pass::Optimized);
        }
        passes
    }

    /// Returns the analysis context of `pass`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPass`] if `pass` was not produced.
    pub fn context(&self, pass: Pass) -> Result<&AnalysisContext> {
        let ctx = match pass {
            Pass::Raw => Some(&self.raw),
            Pass::Ssa => self.ssa.as_ref(),
            Pass::Optimized => self.optimized.as_ref(),
        };
        ctx.ok_or_else(|| Error::UnsupportedPass {
            pass: pass.to_string(),
            operation: "context",
        })
    }

    /// Returns the liveness of `pass`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPass`] if `pass` was not produced or liveness was disabled.
    pub fn liveness(&self, pass: Pass) -> Result<&Liveness> {
        self.liveness
            .iter()
            .find(|l| l.pass() == pass)
            .ok_or_else(|| Error::UnsupportedPass {
                pass: pass.to_string(),
                operation: "liveness",
            })
    }

    /// Returns the pass whose stream is handed to code emission.
    #[must_use]
    pub const fn final_pass(&self) -> Pass {
        self.final_pass
    }

    /// Returns the context of [`CompiledMethod::final_pass`].
    #[must_use]
    pub fn final_context(&self) -> &AnalysisContext {
        let ctx = match self.final_pass {
            Pass::Raw => None,
            Pass::Ssa => self.ssa.as_ref(),
            Pass::Optimized => self.optimized.as_ref(),
        };
        ctx.unwrap_or(&self.raw)
    }

    /// Returns the number of optimization rounds that ran, `0` if optimization was disabled.
    #[must_use]
    pub const fn optimization_rounds(&self) -> usize {
        self.optimization_rounds
    }
}

/// Compiles methods through the configured pipeline.
///
/// # Examples
///
/// ```rust
/// use tacscope::prelude::*;
///
/// let methods = vec![
///     Method::new("ok", InstructionStream::new(vec![Instruction::label(0), Instruction::ret(Var::Null)])),
///     Method::new("broken", InstructionStream::new(vec![Instruction::label(0), Instruction::br(5)])),
/// ];
/// let results = MethodCompiler::new(PipelineConfig::default()).compile_all(&methods);
///
/// assert!(results[0].is_ok());
/// assert!(matches!(&results[1], Err(Error::MethodFailed { method, .. }) if method == "broken"));
/// ```
pub struct MethodCompiler {
    config: PipelineConfig,
    scheduler: PassScheduler,
}

impl MethodCompiler {
    /// Creates a compiler with the built-in stream passes.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        let scheduler = PassScheduler::with_defaults(config.max_optimization_rounds);
        Self { config, scheduler }
    }

    /// Creates a compiler that runs `passes`, in order, to produce the optimized stream.
    #[must_use]
    pub fn with_passes(config: PipelineConfig, passes: Vec<Box<dyn StreamPass>>) -> Self {
        let mut scheduler = PassScheduler::new(config.max_optimization_rounds);
        for pass in passes {
            scheduler.add(pass);
        }
        Self { config, scheduler }
    }

    /// Returns the pipeline configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Compiles one method.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MethodFailed`] wrapping the first fatal error of any stage.
    pub fn compile(&self, method: &Method) -> Result<CompiledMethod> {
        self.run_pipeline(method).map_err(|source| Error::MethodFailed {
            method: method.name().to_string(),
            source: Box::new(source),
        })
    }

    /// Compiles independent methods in parallel.
    ///
    /// Results are returned in input order. A failure is reported for its method only.
    #[must_use]
    pub fn compile_all(&self, methods: &[Method]) -> Vec<Result<CompiledMethod>> {
        methods.par_iter().map(|method| self.compile(method)).collect()
    }

    fn run_pipeline(&self, method: &Method) -> Result<CompiledMethod> {
        debug!(
            method = method.name(),
            instructions = method.stream().len(),
            "compiling method"
        );

        let raw = AnalysisContext::analyze(Pass::Raw, method.stream().clone())?;

        let ssa = if self.config.convert_to_ssa {
            let ssa = SsaConverter::convert(&raw)?;
            if self.config.verify_ssa {
                verify_ssa(&ssa)?;
            }
            Some(ssa)
        } else {
            None
        };

        let mut optimization_rounds = 0;
        let optimized = if self.config.optimize {
            let source = ssa.as_ref().unwrap_or(&raw).stream().clone();
            let start = AnalysisContext::analyze(Pass::Optimized, source)?;
            let (optimized, rounds) = self.scheduler.run(start)?;
            optimization_rounds = rounds;
            Some(optimized)
        } else {
            None
        };

        let liveness = if self.config.compute_liveness {
            [Some(&raw), ssa.as_ref(), optimized.as_ref()]
                .into_iter()
                .flatten()
                .map(AnalysisContext::liveness)
                .collect()
        } else {
            Vec::new()
        };

        let final_pass = match self.config.final_pass {
            Pass::Optimized if optimized.is_some() => Pass::Optimized,
            Pass::Optimized | Pass::Ssa if ssa.is_some() => Pass::Ssa,
            _ => Pass::Raw,
        };

        debug!(
            method = method.name(),
            %final_pass,
            optimization_rounds,
            "compiled method"
        );

        Ok(CompiledMethod {
            name: method.name().to_string(),
            raw,
            ssa,
            optimized,
            liveness,
            final_pass,
            optimization_rounds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{diamond, nested_loops};

    #[test]
    fn test_full_pipeline() {
        let compiled = MethodCompiler::new(PipelineConfig::default())
            .compile(&Method::new("diamond", diamond()))
            .unwrap();

        assert_eq!(compiled.name(), "diamond");
        assert_eq!(compiled.passes(), vec![Pass::Raw, Pass::Ssa, Pass::Optimized]);
        assert_eq!(compiled.final_pass(), Pass::Optimized);
        assert_eq!(compiled.final_context().pass(), Pass::Optimized);
        assert!(compiled.optimization_rounds() >= 1);

        for pass in compiled.passes() {
            assert_eq!(compiled.liveness(pass).unwrap().pass(), pass);
            assert_eq!(compiled.context(pass).unwrap().pass(), pass);
        }

        // x = 1 is dead in the optimized stream
        let raw_len = compiled.context(Pass::Raw).unwrap().stream().len();
        let ssa_len = compiled.context(Pass::Ssa).unwrap().stream().len();
        let opt_len = compiled.context(Pass::Optimized).unwrap().stream().len();
        assert_eq!(ssa_len, raw_len + 1);
        assert_eq!(opt_len, ssa_len - 1);
    }

    #[test]
    fn test_analysis_only_falls_back_to_raw() {
        let compiled = MethodCompiler::new(PipelineConfig::analysis_only().with_final_pass(Pass::Optimized))
            .compile(&Method::new("loops", nested_loops()))
            .unwrap();

        assert_eq!(compiled.passes(), vec![Pass::Raw]);
        assert_eq!(compiled.final_pass(), Pass::Raw);
        assert_eq!(compiled.optimization_rounds(), 0);
        assert!(matches!(
            compiled.liveness(Pass::Ssa),
            Err(Error::UnsupportedPass { operation: "liveness", .. })
        ));
        assert!(matches!(
            compiled.context(Pass::Optimized),
            Err(Error::UnsupportedPass { operation: "context", .. })
        ));
    }

    #[test]
    fn test_final_pass_falls_back_to_ssa() {
        let config = PipelineConfig::default().with_optimization(false);
        let compiled = MethodCompiler::new(config)
            .compile(&Method::new("diamond", diamond()))
            .unwrap();
        assert_eq!(compiled.final_pass(), Pass::Ssa);
    }

    #[test]
    fn test_liveness_can_be_disabled() {
        let config = PipelineConfig::default().with_liveness(false);
        let compiled = MethodCompiler::new(config)
            .compile(&Method::new("diamond", diamond()))
            .unwrap();
        assert!(compiled.liveness(Pass::Raw).is_err());
    }

    #[test]
    fn test_failure_names_method() {
        let broken = Method::new(
            "Program::Main()",
            InstructionStream::new(vec![
                crate::ir::Instruction::label(0),
                crate::ir::Instruction::br(1),
            ]),
        );
        match MethodCompiler::new(PipelineConfig::default()).compile(&broken) {
            Err(Error::MethodFailed { method, source }) => {
                assert_eq!(method, "Program::Main()");
                assert!(matches!(*source, Error::UnlabeledBranchTarget { index: 1, block: 1 }));
            }
            other => panic!("expected MethodFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_custom_passes() {
        let compiled = MethodCompiler::with_passes(PipelineConfig::default(), Vec::new())
            .compile(&Method::new("diamond", diamond()))
            .unwrap();

        let ssa = compiled.context(Pass::Ssa).unwrap().stream();
        let optimized = compiled.context(Pass::Optimized).unwrap().stream();
        assert_eq!(ssa, optimized);
    }
}
