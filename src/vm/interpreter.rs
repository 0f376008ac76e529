//! Stack-machine execution of verified bytecode.
//!
//! Execution is a single forward scan: no branches, no loops, one step
//! per instruction. The element type is generic over [`Scalar`], so the
//! same bytecode runs over real and complex values with identical
//! control flow.
//!
//! The interpreter owns its operand stack and is intended to be reused:
//! construct once per thread, then call [`Interpreter::run`] once per
//! input vector. Bytecode is never mutated here and may be shared
//! read-only across any number of concurrently running interpreters.

use crate::traits::Scalar;
use crate::vm::code::Code;
use crate::vm::instruction::Instruction;

/// Pop the operand stack without a bounds check.
///
/// # Safety
///
/// The stack must be non-empty. Verification proves this for every pop
/// a verified block performs.
#[inline]
unsafe fn pop<T: Copy>(stack: &mut Vec<T>) -> T {
    let len = stack.len() - 1;
    // SAFETY: len is in bounds by the caller's contract. The read must
    // precede the truncation: after set_len the index is past the end.
    unsafe {
        let v = *stack.get_unchecked(len);
        stack.set_len(len);
        v
    }
}

/// Replace the top of the stack with `f(top, rhs)` where `rhs` is
/// popped first (it was pushed last).
///
/// # Safety
///
/// The stack must hold at least two values.
#[inline]
unsafe fn binop<T: Copy>(stack: &mut Vec<T>, f: impl FnOnce(T, T) -> T) {
    // SAFETY: depth >= 2 by the caller's contract.
    unsafe {
        let rhs = pop(stack);
        let top = top_mut(stack);
        *top = f(*top, rhs);
    }
}

/// Mutable access to the top of the stack without a bounds check.
///
/// # Safety
///
/// The stack must be non-empty.
#[inline]
unsafe fn top_mut<T>(stack: &mut Vec<T>) -> &mut T {
    let len = stack.len();
    // SAFETY: len >= 1 by the caller's contract.
    unsafe { stack.get_unchecked_mut(len - 1) }
}

/// A reusable stack machine bound to one scalar type.
///
/// Holds only the operand stack; input and output vectors are supplied
/// per run, so one interpreter can serve many bindings.
#[derive(Debug, Clone)]
pub struct Interpreter<T: Scalar> {
    stack: Vec<T>,
}

impl<T: Scalar> Interpreter<T> {
    /// Create an interpreter with a stack pre-sized to `code`'s
    /// verified minimum capacity. The stack never reallocates while
    /// running that block, or any block with an equal or smaller
    /// capacity.
    #[must_use]
    pub fn new(code: &Code) -> Self {
        Self {
            stack: Vec::with_capacity(code.min_stack_size()),
        }
    }

    /// Execute `code`, reading `Load` slots from `input` and writing
    /// `Store` slots into `output`.
    ///
    /// The operand stack is accessed without bounds checks; that is
    /// sound because only verified blocks are accepted, checked once
    /// per call. Slot indices address the supplied vectors directly,
    /// so `input`/`output` must cover every slot the block names.
    ///
    /// # Panics
    ///
    /// Panics if `code` is not verified, or if a `Load` or `Store`
    /// slot is out of bounds for the supplied vectors.
    pub fn run(&mut self, code: &Code, input: &[T], output: &mut [T]) {
        assert!(
            code.is_verified(),
            "run requires verified bytecode; call Code::verify first"
        );
        self.stack.clear();
        self.stack.reserve(code.min_stack_size());
        let stack = &mut self.stack;

        for instr in code {
            match *instr {
                Instruction::Load(slot) => stack.push(input[slot]),
                Instruction::Push(v) => stack.push(T::from_imm(v)),
                // SAFETY: verification bounds every pop below.
                Instruction::Add(None) => unsafe { binop(stack, |a, b| a + b) },
                Instruction::Sub(None) => unsafe { binop(stack, |a, b| a - b) },
                Instruction::Mul(None) => unsafe { binop(stack, |a, b| a * b) },
                Instruction::Div(None) => unsafe { binop(stack, |a, b| a / b) },
                Instruction::Pow(None) => unsafe { binop(stack, T::pow) },
                Instruction::Add(Some(v)) => unsafe {
                    let top = top_mut(stack);
                    *top = *top + T::from_imm(v);
                },
                Instruction::Sub(Some(v)) => unsafe {
                    let top = top_mut(stack);
                    *top = *top - T::from_imm(v);
                },
                Instruction::Mul(Some(v)) => unsafe {
                    let top = top_mut(stack);
                    *top = *top * T::from_imm(v);
                },
                Instruction::Div(Some(v)) => unsafe {
                    let top = top_mut(stack);
                    *top = *top / T::from_imm(v);
                },
                Instruction::Pow(Some(v)) => unsafe {
                    let top = top_mut(stack);
                    *top = top.pow(T::from_imm(v));
                },
                Instruction::Exp => unsafe {
                    let top = top_mut(stack);
                    *top = top.exp();
                },
                Instruction::Ln => unsafe {
                    let top = top_mut(stack);
                    *top = top.ln();
                },
                Instruction::Store(slot) => {
                    // SAFETY: verification bounds this pop.
                    output[slot] = unsafe { pop(stack) };
                }
            }
        }
    }
}
