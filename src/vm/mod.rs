//! Bytecode compilation and execution.
//!
//! This module lowers expression trees into flat bytecode that a stack
//! machine executes without tree traversal. Verified bytecode is
//! immutable and thread-safe, so one compiled block can be evaluated in
//! parallel across worker threads.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐    ┌───────────┐    ┌───────────┐    ┌─────────────┐
//! │    Expr     │ -> │ Assembler │ -> │ Optimizer │ -> │ Interpreter │
//! │ (AST tree)  │    │ (Bytecode)│    │ (peephole)│    │(stack mach.)│
//! └─────────────┘    └───────────┘    └───────────┘    └─────────────┘
//!                                           │
//!                                           ▼
//!                                    ┌─────────────┐
//!                                    │ Dependence  │
//!                                    │ (decompile) │
//!                                    └─────────────┘
//! ```
//!
//! # Safety Model
//!
//! The interpreter accesses its operand stack without bounds checks.
//! Safety is guaranteed by [`Code::verify`], which proves every pop is
//! preceded by enough pushes and computes the stack capacity the
//! interpreter pre-allocates. Structural edits clear the verified
//! flag, and [`Interpreter::run`] refuses unverified blocks with one
//! check per call, so the unchecked path is unreachable from safe
//! code.
//!
//! # Modules
//!
//! - [`instruction`]: bytecode instruction definitions
//! - [`code`]: instruction sequences and stack-balance verification
//! - [`assembler`]: expression-to-bytecode lowering
//! - [`optimizer`]: peephole rewriting passes
//! - [`interpreter`]: generic stack-machine execution
//! - [`dependence`]: bytecode-to-dependency-tree reconstruction

#![allow(
    unsafe_code,
    reason = "Stack accesses are validated by bytecode verification"
)]

pub mod assembler;
pub mod code;
pub mod dependence;
pub mod instruction;
pub mod interpreter;
pub mod optimizer;

pub use assembler::{Compiler, Layout, assemble};
pub use code::{Code, MAX_STACK_DEPTH};
pub use dependence::{DependencyNode, DependencyTree};
pub use instruction::{Instruction, Opcode, Value};
pub use interpreter::Interpreter;
pub use optimizer::{OptLevel, optimize};
