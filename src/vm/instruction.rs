//! Bytecode instruction definitions.
//!
//! Instructions are an enum with data: the immediate operand lives in
//! the variant itself, so an ill-formed combination (a `Load` without a
//! slot, a `Push` without a value) is unrepresentable. Arithmetic
//! opcodes optionally carry an immediate that plays the RHS operand
//! role; `Load`/`Store` carry a slot index; `Push` carries a value.
//!
//! Immediates are stored as complex doubles so that one code block
//! serves both the real and the complex interpreter instantiation.

use num_complex::Complex64;

/// The immediate value representation embedded in instructions.
pub type Value = Complex64;

/// Operation selector, without payload. Useful for dispatch tables and
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Exp,
    Ln,
    Load,
    Store,
    Push,
}

/// A single bytecode instruction. Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Instruction {
    /// Pop rhs then lhs, push `lhs + rhs`; with an immediate, pop lhs
    /// only and use the immediate as rhs.
    Add(Option<Value>),
    /// Pop rhs then lhs, push `lhs - rhs`; immediate form as `Add`.
    Sub(Option<Value>),
    /// Pop rhs then lhs, push `lhs * rhs`; immediate form as `Add`.
    Mul(Option<Value>),
    /// Pop rhs then lhs, push `lhs / rhs`; immediate form as `Add`.
    Div(Option<Value>),
    /// Pop exponent then base, push `base ^ exponent`; with an
    /// immediate the immediate is the exponent.
    Pow(Option<Value>),
    /// Pop one value, push its natural exponential.
    Exp,
    /// Pop one value, push its natural logarithm.
    Ln,
    /// Push the input-vector element at the given slot.
    Load(usize),
    /// Pop one value into the output-vector element at the given slot.
    Store(usize),
    /// Push a constant.
    Push(Value),
}

impl Instruction {
    /// Convenience constructor for `Push` from anything convertible to
    /// a value (plain `f64` included).
    pub fn push(v: impl Into<Value>) -> Self {
        Instruction::Push(v.into())
    }

    /// The operation selector of this instruction.
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Add(_) => Opcode::Add,
            Instruction::Sub(_) => Opcode::Sub,
            Instruction::Mul(_) => Opcode::Mul,
            Instruction::Div(_) => Opcode::Div,
            Instruction::Pow(_) => Opcode::Pow,
            Instruction::Exp => Opcode::Exp,
            Instruction::Ln => Opcode::Ln,
            Instruction::Load(_) => Opcode::Load,
            Instruction::Store(_) => Opcode::Store,
            Instruction::Push(_) => Opcode::Push,
        }
    }

    /// The immediate operand, if this is an arithmetic instruction in
    /// immediate form.
    pub fn immediate(&self) -> Option<Value> {
        match self {
            Instruction::Add(imm)
            | Instruction::Sub(imm)
            | Instruction::Mul(imm)
            | Instruction::Div(imm)
            | Instruction::Pow(imm) => *imm,
            _ => None,
        }
    }

    /// Number of values this instruction pops.
    pub fn pops(&self) -> usize {
        match self {
            Instruction::Push(_) | Instruction::Load(_) => 0,
            Instruction::Store(_) | Instruction::Exp | Instruction::Ln => 1,
            Instruction::Add(imm)
            | Instruction::Sub(imm)
            | Instruction::Mul(imm)
            | Instruction::Div(imm)
            | Instruction::Pow(imm) => {
                if imm.is_some() { 1 } else { 2 }
            }
        }
    }

    /// Number of values this instruction pushes.
    pub fn pushes(&self) -> usize {
        match self {
            Instruction::Store(_) => 0,
            _ => 1,
        }
    }

    /// True for `Add`/`Mul` without an immediate: the two stack
    /// operands may swap roles without changing the result.
    pub fn is_commutative(&self) -> bool {
        matches!(self, Instruction::Add(None) | Instruction::Mul(None))
    }

    /// Rewrite an immediate-free arithmetic instruction into its
    /// immediate form. Returns `None` for any other instruction.
    pub(crate) fn with_immediate(&self, v: Value) -> Option<Instruction> {
        match self {
            Instruction::Add(None) => Some(Instruction::Add(Some(v))),
            Instruction::Sub(None) => Some(Instruction::Sub(Some(v))),
            Instruction::Mul(None) => Some(Instruction::Mul(Some(v))),
            Instruction::Div(None) => Some(Instruction::Div(Some(v))),
            Instruction::Pow(None) => Some(Instruction::Pow(Some(v))),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_effects_match_table() {
        assert_eq!(Instruction::push(1.0).pops(), 0);
        assert_eq!(Instruction::push(1.0).pushes(), 1);
        assert_eq!(Instruction::Load(0).pops(), 0);
        assert_eq!(Instruction::Load(0).pushes(), 1);
        assert_eq!(Instruction::Store(0).pops(), 1);
        assert_eq!(Instruction::Store(0).pushes(), 0);
        assert_eq!(Instruction::Add(None).pops(), 2);
        assert_eq!(Instruction::Add(None).pushes(), 1);
        assert_eq!(Instruction::Add(Some(Value::new(2.0, 0.0))).pops(), 1);
        assert_eq!(Instruction::Exp.pops(), 1);
        assert_eq!(Instruction::Ln.pushes(), 1);
    }

    #[test]
    fn test_commutativity() {
        assert!(Instruction::Add(None).is_commutative());
        assert!(Instruction::Mul(None).is_commutative());
        assert!(!Instruction::Sub(None).is_commutative());
        assert!(!Instruction::Mul(Some(Value::new(1.0, 0.0))).is_commutative());
    }

    #[test]
    fn test_with_immediate() {
        let v = Value::new(3.0, 0.0);
        assert_eq!(
            Instruction::Mul(None).with_immediate(v),
            Some(Instruction::Mul(Some(v)))
        );
        assert_eq!(Instruction::Load(0).with_immediate(v), None);
        assert_eq!(Instruction::Mul(Some(v)).with_immediate(v), None);
    }
}
