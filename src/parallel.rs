//! Parallel batch evaluation using Rayon
//!
//! Verified bytecode is immutable, so one compiled block can be shared
//! read-only across worker threads; each worker owns its interpreter
//! stack and its output row. This is the ensemble-simulation pattern:
//! one formula, many input vectors per step.
//!
//! Enable with the `parallel` feature:
//! ```toml
//! kinevm = { version = "0.1", features = ["parallel"] }
//! ```

use crate::traits::Scalar;
use crate::vm::code::Code;
use crate::vm::interpreter::Interpreter;
use rayon::prelude::*;

/// Execute `code` once per input row, in parallel.
///
/// `inputs` and `outputs` are row-major: one row per run. Every input
/// row must cover the block's `Load` slots and every output row its
/// `Store` slots, exactly as for a single [`Interpreter::run`].
///
/// Each worker thread builds its own interpreter and reuses it across
/// the rows of its chunk, so per-row allocation is amortized away.
///
/// # Panics
///
/// Panics if `code` is not verified, if `inputs` and `outputs` differ
/// in length, or if a slot is out of bounds for its row.
pub fn run_batch<T, I, O>(code: &Code, inputs: &[I], outputs: &mut [O])
where
    T: Scalar + Send + Sync,
    I: AsRef<[T]> + Sync,
    O: AsMut<[T]> + Send,
{
    assert_eq!(
        inputs.len(),
        outputs.len(),
        "one output row per input row"
    );

    outputs
        .par_iter_mut()
        .zip(inputs.par_iter())
        .for_each_init(
            || Interpreter::new(code),
            |vm, (output, input)| {
                vm.run(code, input.as_ref(), output.as_mut());
            },
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;
    use crate::symbol::{Symbol, SymbolTable};
    use crate::traits::FLOAT_TOLERANCE;
    use crate::vm::assembler::Compiler;

    #[test]
    fn test_batch_matches_sequential() {
        let x = Symbol::new("x");
        let expr = Expr::add(
            Expr::mul(Expr::symbol(&x), Expr::symbol(&x)),
            Expr::integer(1),
        );
        let table = SymbolTable::from_ordered([&x]);
        let mut compiler = Compiler::new(&table);
        compiler.compile_expression(&expr, 0).expect("compiles");
        let code = compiler.finish().expect("verifies");

        let inputs: Vec<[f64; 1]> = (0..256).map(|i| [f64::from(i) * 0.25]).collect();
        let mut outputs = vec![[0.0_f64; 1]; inputs.len()];
        run_batch(&code, &inputs, &mut outputs);

        let mut vm = Interpreter::new(&code);
        for (input, output) in inputs.iter().zip(&outputs) {
            let mut expected = [0.0];
            vm.run(&code, input, &mut expected);
            assert!((output[0] - expected[0]).abs() < FLOAT_TOLERANCE);
        }
    }

    #[test]
    #[should_panic(expected = "one output row per input row")]
    fn test_mismatched_rows_panic() {
        let code = Code::new();
        let inputs = [[0.0_f64; 1]; 2];
        let mut outputs = [[0.0_f64; 1]; 1];
        run_batch(&code, &inputs, &mut outputs);
    }
}
