//! Operand and variable identity.
//!
//! Every operand of a three-address instruction is a [`Var`]. Only the
//! [`Var::Logical`], [`Var::AddressOf`] and [`Var::ContentsOf`] variants refer to a
//! [`LogicalVar`] and therefore take part in dataflow; labels, constants and machine
//! locations are opaque to the analyses in this crate.
//!
//! A [`LogicalVar`] pairs the logical id assigned by the bytecode translator with an
//! SSA subscript. Subscript `0` means the variable has not been renamed yet. Inside an
//! SSA stream, subscript `0` on a use denotes the value the variable holds on entry to
//! the method (an argument or an uninitialised local).

use std::fmt;

/// A logical variable together with its SSA subscript.
///
/// Two logical variables are equal iff both the id and the subscript match.
///
/// # Examples
///
/// ```rust
/// use tacscope::ir::LogicalVar;
///
/// let x = LogicalVar::new(3);
/// assert_eq!(x.ssa, 0);
///
/// let x2 = x.with_ssa(2);
/// assert_ne!(x, x2);
/// assert!(x.same_variable(x2));
/// assert_eq!(x2.to_string(), "v3.2");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogicalVar {
    /// Logical id assigned by the bytecode translator.
    pub id: u32,
    /// SSA subscript, `0` before renaming.
    pub ssa: u32,
}

impl LogicalVar {
    /// Creates a logical variable that is not yet in SSA form.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self { id, ssa: 0 }
    }

    /// Returns the same variable with another SSA subscript.
    #[must_use]
    pub const fn with_ssa(self, ssa: u32) -> Self {
        Self { id: self.id, ssa }
    }

    /// Returns the variable with its SSA subscript cleared.
    #[must_use]
    pub const fn base(self) -> Self {
        Self::new(self.id)
    }

    /// Returns `true` if both values name the same logical variable, ignoring subscripts.
    #[must_use]
    pub const fn same_variable(self, other: Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for LogicalVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogicalVar({}.{})", self.id, self.ssa)
    }
}

impl fmt::Display for LogicalVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ssa == 0 {
            write!(f, "v{}", self.id)
        } else {
            write!(f, "v{}.{}", self.id, self.ssa)
        }
    }
}

/// An instruction operand.
///
/// Equality is structural: kind, logical id, SSA subscript and any offset or constant
/// payload must all match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Var {
    /// No operand in this slot.
    #[default]
    Null,
    /// A plain logical variable.
    Logical(LogicalVar),
    /// The address of a logical variable, plus a constant byte offset.
    AddressOf {
        /// The variable whose address is taken
        base: LogicalVar,
        /// Constant offset added to the address
        offset: i32,
    },
    /// The memory pointed to by a logical variable, plus a constant byte offset.
    ContentsOf {
        /// The variable holding the pointer
        base: LogicalVar,
        /// Constant offset added before dereferencing
        offset: i32,
    },
    /// A symbolic label, e.g. a function or data symbol.
    Label(String),
    /// An integer constant.
    Const(i64),
    /// A fixed machine location (register number), assigned outside this crate.
    Machine(u16),
}

impl Var {
    /// Shorthand for a plain logical variable with subscript `0`.
    #[must_use]
    pub const fn logical(id: u32) -> Self {
        Var::Logical(LogicalVar::new(id))
    }

    /// Shorthand for an integer constant.
    #[must_use]
    pub const fn constant(value: i64) -> Self {
        Var::Const(value)
    }

    /// Returns `true` if this slot is empty.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Var::Null)
    }

    /// Returns the variable this operand is defined as, if it is a plain logical variable.
    ///
    /// Only plain logical variables can be defined by an instruction result.
    #[must_use]
    pub const fn as_logical(&self) -> Option<LogicalVar> {
        match self {
            Var::Logical(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the logical variable this operand refers to, including the base variable of
    /// address-of and contents-of operands.
    #[must_use]
    pub const fn referenced(&self) -> Option<LogicalVar> {
        match self {
            Var::Logical(v) | Var::AddressOf { base: v, .. } | Var::ContentsOf { base: v, .. } => {
                Some(*v)
            }
            _ => None,
        }
    }

    /// Returns a copy of this operand whose referenced logical variable carries `ssa`.
    ///
    /// Operands without a logical variable are returned unchanged.
    #[must_use]
    pub fn with_ssa(&self, ssa: u32) -> Self {
        match self {
            Var::Logical(v) => Var::Logical(v.with_ssa(ssa)),
            Var::AddressOf { base, offset } => Var::AddressOf {
                base: base.with_ssa(ssa),
                offset: *offset,
            },
            Var::ContentsOf { base, offset } => Var::ContentsOf {
                base: base.with_ssa(ssa),
                offset: *offset,
            },
            other => other.clone(),
        }
    }
}

impl From<LogicalVar> for Var {
    fn from(v: LogicalVar) -> Self {
        Var::Logical(v)
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Var::Null => write!(f, "_"),
            Var::Logical(v) => write!(f, "{v}"),
            Var::AddressOf { base, offset: 0 } => write!(f, "&{base}"),
            Var::AddressOf { base, offset } => write!(f, "&{base}{offset:+}"),
            Var::ContentsOf { base, offset: 0 } => write!(f, "[{base}]"),
            Var::ContentsOf { base, offset } => write!(f, "[{base}{offset:+}]"),
            Var::Label(name) => write!(f, "@{name}"),
            Var::Const(value) => write!(f, "${value}"),
            Var::Machine(reg) => write!(f, "%r{reg}"),
        }
    }
}
