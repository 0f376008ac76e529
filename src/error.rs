use std::fmt;

/// Reason a bytecode block failed stack-balance verification.
///
/// A verification failure always indicates a defect in the assembler or
/// an optimizer pass, never bad user input: valid expression trees
/// compile to balanced code by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyFailure {
    /// An instruction would pop more values than the stack holds.
    /// Carries the offending instruction index.
    StackUnderflow { at: usize },
    /// The final stack depth was nonzero: some pushed value was never
    /// consumed by a `Store` or a later operator.
    UnbalancedStack { depth: usize },
}

impl fmt::Display for VerifyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyFailure::StackUnderflow { at } => {
                write!(f, "stack underflow at instruction {}", at)
            }
            VerifyFailure::UnbalancedStack { depth } => {
                write!(f, "final stack depth is {} (expected 0)", depth)
            }
        }
    }
}

/// Errors raised during translation, compilation or optimization.
///
/// None of these are ever raised during interpretation: the interpreter
/// assumes previously verified bytecode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprError {
    /// An external engine tree node or function identity is not part of
    /// the supported expression language. Carries a description of the
    /// offending construct. Fatal to that expression's compilation.
    Translation(String),

    /// A symbol has no entry in the symbol table. Carries the symbol's
    /// display name. Fatal to that expression's compilation.
    UnresolvedSymbol(String),

    /// Stack-balance verification failed; see [`VerifyFailure`].
    Verification(VerifyFailure),

    /// Compilation would exceed the maximum operand stack depth.
    StackDepthExceeded { depth: usize, limit: usize },
}

impl ExprError {
    /// Create a translation error from anything describable.
    pub fn translation(desc: impl Into<String>) -> Self {
        ExprError::Translation(desc.into())
    }

    /// Create an unresolved-symbol error naming the symbol.
    pub fn unresolved(name: impl Into<String>) -> Self {
        ExprError::UnresolvedSymbol(name.into())
    }
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprError::Translation(desc) => {
                write!(f, "Cannot translate expression construct: {}", desc)
            }
            ExprError::UnresolvedSymbol(name) => {
                write!(f, "Symbol '{}' is not defined in the symbol table", name)
            }
            ExprError::Verification(failure) => {
                write!(f, "Bytecode verification failed: {}", failure)
            }
            ExprError::StackDepthExceeded { depth, limit } => {
                write!(
                    f,
                    "Expression requires stack depth {} exceeding limit {}",
                    depth, limit
                )
            }
        }
    }
}

impl std::error::Error for ExprError {}

impl From<VerifyFailure> for ExprError {
    fn from(failure: VerifyFailure) -> Self {
        ExprError::Verification(failure)
    }
}
