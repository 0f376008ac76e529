//! Bytecode compiler and stack machine for symbolic arithmetic.
//!
//! Compiles symbolic expression trees into flat, loop-free bytecode and
//! evaluates it repeatedly without tree traversal. Built for the inner
//! loop of kinetic-network simulation, where the same rate expressions
//! run once per integration step across many state vectors.
//!
//! # Features
//! - Self-contained expression IR with reference-counted sub-tree sharing
//! - One-function adapter boundary to an external symbolic-math engine
//! - Stack-balance verification with a proven minimum stack capacity
//! - Peephole optimizer: immediate commuting, folding, identity elimination
//! - Interpreter generic over the scalar type (`f64` and `Complex64`)
//! - Bytecode-to-dependency-tree decompilation for formula recovery
//!
//! # Usage
//! ```
//! use kinevm::{Expr, OptLevel, Symbol, SymbolTable};
//!
//! let x = Symbol::new("x");
//! let expr = Expr::add(
//!     Expr::mul(Expr::symbol(&x), Expr::integer(2)),
//!     Expr::integer(3),
//! );
//!
//! let table = SymbolTable::from_ordered([&x]);
//! let mut code = kinevm::compile(&expr, &table).expect("compile");
//! kinevm::optimize(&mut code, OptLevel::Full).expect("optimize");
//!
//! let output = kinevm::interpret::<f64>(&code, &[5.0]);
//! assert!((output[0] - 13.0).abs() < 1e-10);
//! ```

mod ast;
mod display;
mod error;
mod symbol;
mod translate;
pub mod traits;
pub mod vm;

#[cfg(feature = "parallel")]
pub mod parallel;

#[cfg(test)]
mod tests;

// Re-export key types for easier usage
pub use ast::{Expr, ExprKind};
pub use error::{ExprError, VerifyFailure};
pub use symbol::{Symbol, SymbolTable};
pub use translate::{EngineExpr, EngineNode, translate};
pub use vm::{
    Code, Compiler, DependencyNode, DependencyTree, Instruction, Interpreter, Layout,
    MAX_STACK_DEPTH, OptLevel, Opcode, Value, optimize,
};

use traits::Scalar;

/// Compile a single expression into verified bytecode.
///
/// The result stores into output slot 0. For vectors or matrices of
/// expressions, use [`Compiler`] directly.
///
/// # Errors
///
/// Returns a symbol-resolution error if the expression references a
/// symbol absent from `table`.
pub fn compile(expr: &Expr, table: &SymbolTable) -> Result<Code, ExprError> {
    let mut compiler = Compiler::new(table);
    compiler.compile_expression(expr, 0)?;
    compiler.finish()
}

/// Execute verified bytecode against one input vector, returning a
/// freshly allocated output vector sized to the highest `Store` slot.
///
/// For repeated evaluation, construct an [`Interpreter`] once and call
/// [`Interpreter::run`] with a reused output buffer instead.
///
/// # Panics
///
/// Panics if `code` is not verified, or if a `Load` slot is out of
/// bounds for `input`.
#[must_use]
pub fn interpret<T: Scalar>(code: &Code, input: &[T]) -> Vec<T> {
    let slots = code
        .iter()
        .filter_map(|instr| match instr {
            Instruction::Store(slot) => Some(slot + 1),
            _ => None,
        })
        .max()
        .unwrap_or(0);
    let mut output = vec![T::zero(); slots];
    Interpreter::new(code).run(code, input, &mut output);
    output
}

/// Decompile bytecode into its dependency trees.
///
/// # Errors
///
/// Returns a verification failure for a block that underflows its
/// stack during replay.
pub fn reconstruct(code: &Code) -> Result<DependencyTree, ExprError> {
    DependencyTree::reconstruct(code)
}
