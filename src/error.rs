use thiserror::Error;

use crate::ir::{BlockId, LogicalVar};

macro_rules! malformed_cfg {
    // Single string version
    ($msg:expr) => {
        crate::Error::MalformedCfg {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::MalformedCfg {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every fatal variant aborts the analysis of a single method only. Nothing in this crate keeps
/// shared state between methods, so an error never leaves another method's analysis in a broken
/// state.
///
/// # Error Categories
///
/// ## Malformed control flow (fatal)
/// - [`Error::UnlabeledBranchTarget`] - A branch names a block that was never labeled
/// - [`Error::PhiAtNonLabel`] - Phi placement selected an instruction that does not start a block
/// - [`Error::MissingBlock`] - An instruction appears before the first label
/// - [`Error::MalformedCfg`] - Any other structural inconsistency
///
/// ## Caller errors (fatal)
/// - [`Error::UnsupportedPass`] - An operation was requested against a stream it cannot run on
///
/// ## Lowering (recoverable)
/// - [`Error::TypeMismatch`] - An operand could not be classified for lowering. The lowering pass
///   absorbs this error and leaves the instruction untouched.
///
/// ## Verification
/// - [`Error::SsaViolation`] - The SSA stream broke the single-definition or phi arity rules
///
/// # Examples
///
/// ```rust
/// use tacscope::{Error, ir::{Instruction, InstructionStream}, analysis::Cfg};
///
/// let stream = InstructionStream::new(vec![Instruction::label(0), Instruction::br(7)]);
/// match Cfg::build(&stream) {
///     Err(Error::UnlabeledBranchTarget { index, block }) => {
///         assert_eq!((index, block), (1, 7));
///     }
///     other => panic!("unexpected result: {other:?}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A branch instruction targets a block id that no label in the stream declares.
    #[error("Branch at instruction {index} targets block {block}, which is never labeled")]
    UnlabeledBranchTarget {
        /// Index of the offending branch instruction
        index: usize,
        /// The undeclared target block
        block: BlockId,
    },

    /// The iterated dominance frontier asked for a phi at an instruction which is not a label.
    ///
    /// Phis only make sense at join points that line up with block boundaries.
    #[error("Phi for {var} required at instruction {index} (block {block:?}), which is not a label")]
    PhiAtNonLabel {
        /// Index of the instruction that would have received the phi
        index: usize,
        /// The variable whose phi could not be placed
        var: LogicalVar,
        /// Block containing the instruction, if any
        block: Option<BlockId>,
    },

    /// An instruction was found before the first label of the stream.
    #[error("Instruction {index} does not belong to any block")]
    MissingBlock {
        /// Index of the instruction without a block
        index: usize,
    },

    /// The control flow graph is structurally broken.
    ///
    /// The error includes the source location where the malformation was detected.
    #[error("Malformed CFG - {file}:{line}: {message}")]
    MalformedCfg {
        /// The message to be printed for the MalformedCfg error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An operation was requested against a stream identity that it does not support.
    ///
    /// This is a programming error in the caller, e.g. requesting liveness for a pass that was
    /// never produced or converting an already converted stream to SSA.
    #[error("Operation '{operation}' is not supported for pass '{pass}'")]
    UnsupportedPass {
        /// Name of the requested pass
        pass: String,
        /// The operation that was requested
        operation: &'static str,
    },

    /// An operand could not be classified during lowering.
    ///
    /// This is recoverable: the lowering pass keeps the instruction unmodified and defers the
    /// failure to a later stage.
    #[error("Type mismatch at instruction {index}: {message}")]
    TypeMismatch {
        /// Index of the instruction that could not be lowered
        index: usize,
        /// Description of the mismatch
        message: String,
    },

    /// The SSA stream violates the single-assignment or phi arity rules.
    #[error("SSA violation - {0}")]
    SsaViolation(String),

    /// Compilation of a single method failed.
    ///
    /// Wraps the underlying fatal error together with the method it belongs to, so callers can
    /// report the failure and continue with other methods.
    #[error("Compilation of '{method}' failed: {source}")]
    MethodFailed {
        /// Name or signature of the failing method
        method: String,
        /// The error that aborted the method's compilation
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Returns `true` if this error is recoverable and should be absorbed locally.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::TypeMismatch { .. })
    }
}
