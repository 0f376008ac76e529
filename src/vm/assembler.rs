//! Tree-to-bytecode assembly.
//!
//! [`assemble`] linearizes one expression: children are emitted
//! strictly left-to-right before the node's own instruction, symbols
//! resolve to `Load(slot)` through the caller's symbol table, constants
//! become `Push`. The [`Compiler`] orchestrates whole compilation
//! units: one `Store` per expression, vectors stored element-by-slot,
//! matrices flattened row- or column-major.

use crate::ast::{Expr, ExprKind};
use crate::error::ExprError;
use crate::symbol::SymbolTable;
use crate::vm::code::Code;
use crate::vm::instruction::{Instruction, Value};

/// Flattening rule for two-dimensional compilation units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Element (r, c) of an `rows x cols` matrix stores to slot
    /// `r * cols + c`.
    RowMajor,
    /// Element (r, c) stores to slot `c * rows + r`.
    ColumnMajor,
}

/// Emit bytecode for one expression into `code`.
///
/// On success the emitted instructions leave exactly one value on the
/// stack. On failure nothing is appended: the buffer is restored to its
/// previous length, so a failed expression never leaves partial code
/// behind.
///
/// # Errors
///
/// [`ExprError::UnresolvedSymbol`] if a symbol is absent from `table`.
pub fn assemble(expr: &Expr, table: &SymbolTable, code: &mut Code) -> Result<(), ExprError> {
    let mark = code.len();
    emit(expr, table, code).inspect_err(|_| {
        code.instructions_mut().truncate(mark);
    })
}

fn emit(expr: &Expr, table: &SymbolTable, code: &mut Code) -> Result<(), ExprError> {
    match &expr.kind {
        ExprKind::Symbol(sym) => match table.resolve(sym) {
            Some(slot) => code.push(Instruction::Load(slot)),
            None => return Err(ExprError::unresolved(sym.name())),
        },
        ExprKind::Integer(n) => code.push(Instruction::push(*n as f64)),
        ExprKind::Real(x) => code.push(Instruction::push(*x)),
        ExprKind::Complex(re, im) => code.push(Instruction::Push(Value::new(*re, *im))),
        ExprKind::Neg(inner) => {
            // Compiled as inner * -1; the fold pass turns this into a
            // multiply-immediate.
            emit(inner, table, code)?;
            code.push(Instruction::push(-1.0));
            code.push(Instruction::Mul(None));
        }
        ExprKind::Exp(arg) => {
            emit(arg, table, code)?;
            code.push(Instruction::Exp);
        }
        ExprKind::Log(arg) => {
            emit(arg, table, code)?;
            code.push(Instruction::Ln);
        }
        ExprKind::Add(lhs, rhs) => {
            emit(lhs, table, code)?;
            emit(rhs, table, code)?;
            code.push(Instruction::Add(None));
        }
        ExprKind::Sub(lhs, rhs) => {
            emit(lhs, table, code)?;
            emit(rhs, table, code)?;
            code.push(Instruction::Sub(None));
        }
        ExprKind::Mul(lhs, rhs) => {
            emit(lhs, table, code)?;
            emit(rhs, table, code)?;
            code.push(Instruction::Mul(None));
        }
        ExprKind::Div(lhs, rhs) => {
            emit(lhs, table, code)?;
            emit(rhs, table, code)?;
            code.push(Instruction::Div(None));
        }
        ExprKind::Pow(base, exponent) => {
            emit(base, table, code)?;
            emit(exponent, table, code)?;
            code.push(Instruction::Pow(None));
        }
    }
    Ok(())
}

/// Compiles expressions against one symbol table into a single code
/// block, appending a `Store` per expression.
///
/// The compiler holds no state across calls beyond the accumulated
/// buffer; [`Compiler::finish`] verifies the block and hands it over.
pub struct Compiler<'t> {
    table: &'t SymbolTable,
    code: Code,
}

impl<'t> Compiler<'t> {
    /// Create a compiler over the given symbol table.
    pub fn new(table: &'t SymbolTable) -> Self {
        Compiler {
            table,
            code: Code::new(),
        }
    }

    /// Compile one expression and store its value at `out_slot`.
    ///
    /// On failure the buffer is left exactly as it was, so the caller
    /// may skip the offending expression and continue.
    pub fn compile_expression(&mut self, expr: &Expr, out_slot: usize) -> Result<(), ExprError> {
        assemble(expr, self.table, &mut self.code)?;
        self.code.push(Instruction::Store(out_slot));
        Ok(())
    }

    /// Compile an ordered collection; element *i* stores to slot *i*.
    pub fn compile_vector(&mut self, exprs: &[Expr]) -> Result<(), ExprError> {
        for (slot, expr) in exprs.iter().enumerate() {
            self.compile_expression(expr, slot)?;
        }
        Ok(())
    }

    /// Compile a `rows x cols` matrix given in row-major element order;
    /// `layout` selects the output slot of each element.
    pub fn compile_matrix(
        &mut self,
        exprs: &[Expr],
        rows: usize,
        cols: usize,
        layout: Layout,
    ) -> Result<(), ExprError> {
        debug_assert_eq!(exprs.len(), rows * cols);
        for (i, expr) in exprs.iter().enumerate() {
            let (r, c) = (i / cols, i % cols);
            let slot = match layout {
                Layout::RowMajor => r * cols + c,
                Layout::ColumnMajor => c * rows + r,
            };
            self.compile_expression(expr, slot)?;
        }
        Ok(())
    }

    /// Verify the accumulated block and return it.
    ///
    /// Verification always succeeds for code produced solely through
    /// this compiler; a failure here is a defect in the assembler.
    pub fn finish(mut self) -> Result<Code, ExprError> {
        self.code.verify()?;
        Ok(self.code)
    }
}
