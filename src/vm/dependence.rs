//! Dependency-tree reconstruction from bytecode.
//!
//! Replays a block with the interpreter's exact control flow, but over
//! a symbolic stack whose elements are owned tree nodes instead of
//! numbers. The result describes, for each stored output, which input
//! slots, constants, and operations it transitively depends on.
//!
//! Used to recover a readable formula from compiled code and to check
//! that optimizer passes preserved an expression's structure.

use crate::error::{ExprError, VerifyFailure};
use crate::vm::code::Code;
use crate::vm::instruction::{Instruction, Value};

/// One node of a reconstructed dependency tree.
///
/// Mirrors the expression kinds the assembler can lower, plus the
/// [`Input`](DependencyNode::Input) leaf produced by `Load`, which has
/// no counterpart in the source tree. Unlike the source IR this is a
/// strict tree: replay never shares a node between parents.
#[derive(Debug, Clone, PartialEq)]
pub enum DependencyNode {
    Add(Box<DependencyNode>, Box<DependencyNode>),
    Sub(Box<DependencyNode>, Box<DependencyNode>),
    Mul(Box<DependencyNode>, Box<DependencyNode>),
    Div(Box<DependencyNode>, Box<DependencyNode>),
    Pow(Box<DependencyNode>, Box<DependencyNode>),
    Exp(Box<DependencyNode>),
    Ln(Box<DependencyNode>),
    /// A value read from the input vector at the given slot.
    Input(usize),
    /// A constant, from a `Push` or a folded immediate.
    Constant(Value),
}

impl DependencyNode {
    /// Number of nodes in this subtree, itself included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        match self {
            Self::Add(l, r)
            | Self::Sub(l, r)
            | Self::Mul(l, r)
            | Self::Div(l, r)
            | Self::Pow(l, r) => 1 + l.node_count() + r.node_count(),
            Self::Exp(arg) | Self::Ln(arg) => 1 + arg.node_count(),
            Self::Input(_) | Self::Constant(_) => 1,
        }
    }

    /// Input slots this subtree reads, in first-use order, deduplicated.
    #[must_use]
    pub fn input_slots(&self) -> Vec<usize> {
        let mut slots = Vec::new();
        self.collect_slots(&mut slots);
        slots
    }

    fn collect_slots(&self, slots: &mut Vec<usize>) {
        match self {
            Self::Add(l, r)
            | Self::Sub(l, r)
            | Self::Mul(l, r)
            | Self::Div(l, r)
            | Self::Pow(l, r) => {
                l.collect_slots(slots);
                r.collect_slots(slots);
            }
            Self::Exp(arg) | Self::Ln(arg) => arg.collect_slots(slots),
            Self::Input(slot) => {
                if !slots.contains(slot) {
                    slots.push(*slot);
                }
            }
            Self::Constant(_) => {}
        }
    }

    /// Emit the instruction sequence that recomputes this subtree,
    /// leaving one value on the stack.
    fn emit(&self, code: &mut Code) {
        match self {
            Self::Add(l, r) => {
                l.emit(code);
                r.emit(code);
                code.push(Instruction::Add(None));
            }
            Self::Sub(l, r) => {
                l.emit(code);
                r.emit(code);
                code.push(Instruction::Sub(None));
            }
            Self::Mul(l, r) => {
                l.emit(code);
                r.emit(code);
                code.push(Instruction::Mul(None));
            }
            Self::Div(l, r) => {
                l.emit(code);
                r.emit(code);
                code.push(Instruction::Div(None));
            }
            Self::Pow(l, r) => {
                l.emit(code);
                r.emit(code);
                code.push(Instruction::Pow(None));
            }
            Self::Exp(arg) => {
                arg.emit(code);
                code.push(Instruction::Exp);
            }
            Self::Ln(arg) => {
                arg.emit(code);
                code.push(Instruction::Ln);
            }
            Self::Input(slot) => code.push(Instruction::Load(*slot)),
            Self::Constant(v) => code.push(Instruction::Push(*v)),
        }
    }
}

/// The root set recovered from one bytecode block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DependencyTree {
    stored: Vec<(usize, DependencyNode)>,
    unreferenced: Vec<DependencyNode>,
}

impl DependencyTree {
    /// Replay `code` symbolically and collect its roots.
    ///
    /// Each `Store` becomes a root tagged by its output slot, in
    /// execution order. Values still on the symbolic stack after the
    /// replay are collected in reverse order as unreferenced roots;
    /// a store-less block is therefore not an error.
    ///
    /// # Errors
    ///
    /// Returns a verification failure if the block underflows its
    /// stack during replay, which verified bytecode never does.
    pub fn reconstruct(code: &Code) -> Result<Self, ExprError> {
        let mut stack: Vec<DependencyNode> = Vec::with_capacity(code.min_stack_size());
        let mut stored = Vec::new();

        for (at, instr) in code.iter().enumerate() {
            let underflow = || ExprError::from(VerifyFailure::StackUnderflow { at });
            match *instr {
                Instruction::Load(slot) => stack.push(DependencyNode::Input(slot)),
                Instruction::Push(v) => stack.push(DependencyNode::Constant(v)),
                Instruction::Add(imm) => binary(&mut stack, imm, DependencyNode::Add, underflow)?,
                Instruction::Sub(imm) => binary(&mut stack, imm, DependencyNode::Sub, underflow)?,
                Instruction::Mul(imm) => binary(&mut stack, imm, DependencyNode::Mul, underflow)?,
                Instruction::Div(imm) => binary(&mut stack, imm, DependencyNode::Div, underflow)?,
                Instruction::Pow(imm) => binary(&mut stack, imm, DependencyNode::Pow, underflow)?,
                Instruction::Exp => {
                    let arg = stack.pop().ok_or_else(underflow)?;
                    stack.push(DependencyNode::Exp(Box::new(arg)));
                }
                Instruction::Ln => {
                    let arg = stack.pop().ok_or_else(underflow)?;
                    stack.push(DependencyNode::Ln(Box::new(arg)));
                }
                Instruction::Store(slot) => {
                    let node = stack.pop().ok_or_else(underflow)?;
                    stored.push((slot, node));
                }
            }
        }

        stack.reverse();
        Ok(Self {
            stored,
            unreferenced: stack,
        })
    }

    /// Roots recorded by `Store`, as `(output slot, tree)` pairs in
    /// execution order.
    #[must_use]
    pub fn stored(&self) -> &[(usize, DependencyNode)] {
        &self.stored
    }

    /// Roots left on the symbolic stack after replay, topmost first.
    #[must_use]
    pub fn unreferenced(&self) -> &[DependencyNode] {
        &self.unreferenced
    }

    /// Total number of roots of both kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stored.len() + self.unreferenced.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stored.is_empty() && self.unreferenced.is_empty()
    }

    /// Re-emit bytecode computing every stored root into its original
    /// output slot. Unreferenced roots are not re-emitted; they have no
    /// slot to land in.
    ///
    /// # Errors
    ///
    /// Propagates verification failure, which re-emission of a
    /// well-formed tree never produces.
    pub fn compile(&self) -> Result<Code, ExprError> {
        let mut code = Code::new();
        for (slot, node) in &self.stored {
            node.emit(&mut code);
            code.push(Instruction::Store(*slot));
        }
        code.verify()?;
        Ok(code)
    }
}

/// Pop the operands of a binary instruction, synthesizing a constant
/// leaf for an immediate, and push the combined node.
fn binary(
    stack: &mut Vec<DependencyNode>,
    imm: Option<Value>,
    make: fn(Box<DependencyNode>, Box<DependencyNode>) -> DependencyNode,
    underflow: impl Fn() -> ExprError,
) -> Result<(), ExprError> {
    let rhs = match imm {
        Some(v) => DependencyNode::Constant(v),
        None => stack.pop().ok_or_else(&underflow)?,
    };
    let lhs = stack.pop().ok_or_else(&underflow)?;
    stack.push(make(Box::new(lhs), Box::new(rhs)));
    Ok(())
}
