//! Peephole optimization passes over the linear instruction stream.
//!
//! A fixed, ordered pipeline; each pass rewrites adjacent instructions
//! in place and never revisits the source tree:
//!
//! 1. **Commute to RHS** — for a commutative `Add`/`Mul`, a constant
//!    pushed as the pending LHS operand is swapped past a simple
//!    one-instruction RHS operand so it becomes foldable.
//! 2. **Immediate folding** — `Push(v)` directly followed by a binary
//!    instruction collapses into the binary's immediate form, saving
//!    one instruction and one stack cell.
//! 3. **Identity elimination** — a binary-with-immediate whose
//!    immediate is the operator's identity element disappears
//!    entirely (`+0`, `-0`, `*1`, `/1`, `^1`).
//!
//! Every pass preserves the program's evaluated result; only the
//! instruction count and the stack traffic change. The pipeline ends by
//! re-verifying the block, so the cached stack capacity is fresh when
//! `optimize` returns.

use crate::error::ExprError;
use crate::vm::code::Code;
use crate::vm::instruction::{Instruction, Value};

/// How much of the pipeline to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OptLevel {
    /// Verify only; leave the instruction stream untouched.
    None,
    /// Commute and fold immediates (passes 1 and 2).
    Fold,
    /// The full pipeline including identity elimination.
    Full,
}

/// Run the peephole pipeline at the given level, then re-verify.
///
/// Safe to run any number of times: the pipeline is idempotent once a
/// fixed point is reached.
///
/// # Errors
///
/// Propagates verification failure, which would indicate a defect in a
/// pass (never valid input); treat it as fatal.
pub fn optimize(code: &mut Code, level: OptLevel) -> Result<(), ExprError> {
    if level >= OptLevel::Fold {
        commute_immediates(code.instructions_mut());
        fold_immediates(code.instructions_mut());
    }
    if level >= OptLevel::Full {
        remove_units(code.instructions_mut());
    }
    code.verify()
}

/// True if `v` is the real number `x` (no imaginary part).
fn is_re(v: Value, x: f64) -> bool {
    v.im == 0.0 && (v.re - x).abs() < f64::EPSILON
}

/// Pass 1: `[Push(c), op, Add|Mul]` becomes `[op, Push(c), Add|Mul]`
/// when `op` is a single instruction producing one value from none
/// (a `Load`). The swap moves the constant into the RHS role next to
/// the operator, where pass 2 can fold it; commutativity makes the
/// role exchange value-preserving.
fn commute_immediates(instructions: &mut Vec<Instruction>) {
    for i in 2..instructions.len() {
        if instructions[i].is_commutative()
            && matches!(instructions[i - 1], Instruction::Load(_))
            && matches!(instructions[i - 2], Instruction::Push(_))
        {
            instructions.swap(i - 2, i - 1);
        }
    }
}

/// Pass 2: `[Push(v), binary]` becomes `[binary(imm = v)]`. The pushed
/// value was the RHS operand (pushed last, popped first), so carrying
/// it as the immediate preserves operand roles exactly; `Pow` keeps the
/// immediate in the exponent position.
fn fold_immediates(instructions: &mut Vec<Instruction>) {
    let mut i = 0;
    while i + 1 < instructions.len() {
        if let Instruction::Push(v) = instructions[i]
            && let Some(folded) = instructions[i + 1].with_immediate(v)
        {
            instructions[i] = folded;
            instructions.remove(i + 1);
            continue;
        }
        i += 1;
    }
}

/// Pass 3: drop a binary-with-immediate whose immediate is the
/// operator's identity element, leaving the other operand untouched on
/// the stack. `Mul 0` and `Pow 0` are deliberately not handled here:
/// they change the value and belong to constant folding, which this
/// pipeline does not do.
fn remove_units(instructions: &mut Vec<Instruction>) {
    instructions.retain(|instr| match instr {
        Instruction::Add(Some(v)) | Instruction::Sub(Some(v)) => !is_re(*v, 0.0),
        Instruction::Mul(Some(v)) | Instruction::Div(Some(v)) | Instruction::Pow(Some(v)) => {
            !is_re(*v, 1.0)
        }
        _ => true,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;
    use crate::symbol::{Symbol, SymbolTable};
    use crate::vm::assembler::Compiler;

    fn compile_one(expr: &Expr, syms: &[&Symbol]) -> Code {
        let table = SymbolTable::from_ordered(syms.iter().copied());
        let mut compiler = Compiler::new(&table);
        compiler.compile_expression(expr, 0).expect("compiles");
        compiler.finish().expect("verifies")
    }

    #[test]
    fn test_fold_reference_scenario() {
        let x = Symbol::new("x");
        // x*2 + 3 -> [Load(0), Mul(imm=2), Add(imm=3), Store(0)]
        let expr = Expr::add(
            Expr::mul(Expr::symbol(&x), Expr::integer(2)),
            Expr::integer(3),
        );
        let mut code = compile_one(&expr, &[&x]);
        optimize(&mut code, OptLevel::Fold).expect("optimizes");
        assert_eq!(
            code.as_slice(),
            &[
                Instruction::Load(0),
                Instruction::Mul(Some(Value::new(2.0, 0.0))),
                Instruction::Add(Some(Value::new(3.0, 0.0))),
                Instruction::Store(0),
            ]
        );
        assert_eq!(code.min_stack_size(), 1);
    }

    #[test]
    fn test_commute_makes_constant_lhs_foldable() {
        let x = Symbol::new("x");
        // 2 + x compiles constant-first; the commute pass must still
        // let folding reach one instruction.
        let expr = Expr::add(Expr::integer(2), Expr::symbol(&x));
        let mut code = compile_one(&expr, &[&x]);
        optimize(&mut code, OptLevel::Fold).expect("optimizes");
        assert_eq!(
            code.as_slice(),
            &[
                Instruction::Load(0),
                Instruction::Add(Some(Value::new(2.0, 0.0))),
                Instruction::Store(0),
            ]
        );
    }

    #[test]
    fn test_noncommutative_constant_lhs_is_left_alone() {
        let x = Symbol::new("x");
        // 2 - x must NOT be rewritten into x - 2.
        let expr = Expr::sub(Expr::integer(2), Expr::symbol(&x));
        let mut code = compile_one(&expr, &[&x]);
        optimize(&mut code, OptLevel::Full).expect("optimizes");
        assert_eq!(
            code.as_slice(),
            &[
                Instruction::push(2.0),
                Instruction::Load(0),
                Instruction::Sub(None),
                Instruction::Store(0),
            ]
        );
    }

    #[test]
    fn test_remove_units() {
        let x = Symbol::new("x");
        // (x + 0) * 1 shrinks to a bare load/store.
        let expr = Expr::mul(
            Expr::add(Expr::symbol(&x), Expr::integer(0)),
            Expr::integer(1),
        );
        let mut code = compile_one(&expr, &[&x]);
        optimize(&mut code, OptLevel::Full).expect("optimizes");
        assert_eq!(
            code.as_slice(),
            &[Instruction::Load(0), Instruction::Store(0)]
        );
        assert_eq!(code.min_stack_size(), 1);
    }

    #[test]
    fn test_pow_identity_exponent_removed() {
        let x = Symbol::new("x");
        let expr = Expr::pow(Expr::symbol(&x), Expr::integer(1));
        let mut code = compile_one(&expr, &[&x]);
        optimize(&mut code, OptLevel::Full).expect("optimizes");
        assert_eq!(
            code.as_slice(),
            &[Instruction::Load(0), Instruction::Store(0)]
        );
    }

    #[test]
    fn test_mul_zero_is_not_eliminated() {
        let x = Symbol::new("x");
        let expr = Expr::mul(Expr::symbol(&x), Expr::integer(0));
        let mut code = compile_one(&expr, &[&x]);
        optimize(&mut code, OptLevel::Full).expect("optimizes");
        // Folded, but not deleted: x*0 still multiplies.
        assert_eq!(
            code.as_slice(),
            &[
                Instruction::Load(0),
                Instruction::Mul(Some(Value::new(0.0, 0.0))),
                Instruction::Store(0),
            ]
        );
    }

    #[test]
    fn test_pipeline_is_idempotent() {
        let x = Symbol::new("x");
        let y = Symbol::new("y");
        let expr = Expr::add(
            Expr::mul(Expr::integer(4), Expr::symbol(&x)),
            Expr::pow(Expr::symbol(&y), Expr::integer(1)),
        );
        let mut code = compile_one(&expr, &[&x, &y]);
        optimize(&mut code, OptLevel::Full).expect("first run");
        let once = code.clone();
        optimize(&mut code, OptLevel::Full).expect("second run");
        assert_eq!(code, once);
    }

    #[test]
    fn test_level_none_only_verifies() {
        let x = Symbol::new("x");
        let expr = Expr::mul(Expr::symbol(&x), Expr::integer(2));
        let mut code = compile_one(&expr, &[&x]);
        let before = code.clone();
        optimize(&mut code, OptLevel::None).expect("verifies");
        assert_eq!(code.as_slice(), before.as_slice());
    }

    #[test]
    fn test_fold_never_increases_count() {
        let x = Symbol::new("x");
        let exprs = [
            Expr::add(Expr::symbol(&x), Expr::integer(7)),
            Expr::div(Expr::symbol(&x), Expr::real(2.5)),
            Expr::pow(Expr::symbol(&x), Expr::integer(3)),
            Expr::neg(Expr::symbol(&x)),
        ];
        for expr in &exprs {
            let mut code = compile_one(expr, &[&x]);
            let before = code.len();
            optimize(&mut code, OptLevel::Full).expect("optimizes");
            assert!(code.len() <= before);
        }
    }
}
