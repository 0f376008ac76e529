//! The linear bytecode container and its stack-balance verifier.

use crate::error::{ExprError, VerifyFailure};
use crate::vm::instruction::Instruction;

/// Maximum operand stack depth a program may require. Realistic rate
/// expressions stay well under 100; the limit bounds stack
/// pre-allocation for pathological inputs.
pub const MAX_STACK_DEPTH: usize = 1024;

/// An ordered, append-only sequence of instructions plus the cached
/// minimum operand-stack capacity needed to run it.
///
/// The cached capacity is only meaningful after [`Code::verify`] has
/// succeeded. Structural edits (appending, concatenation, optimizer
/// rewrites) do **not** re-verify; they clear the verified flag, and
/// the interpreter refuses to run a block until [`Code::verify`] has
/// been called again.
///
/// Once verified, a `Code` block is immutable in practice and may be
/// shared read-only across any number of interpreter instances.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Code {
    instructions: Vec<Instruction>,
    min_stack_size: usize,
    verified: bool,
}

impl Code {
    /// Create an empty code block.
    pub fn new() -> Self {
        Code {
            instructions: Vec::with_capacity(64),
            min_stack_size: 0,
            verified: false,
        }
    }

    /// Append one instruction. Invalidates verification.
    #[inline]
    pub fn push(&mut self, instr: Instruction) {
        self.instructions.push(instr);
        self.verified = false;
    }

    /// Append another block's instructions. The cached capacity becomes
    /// the maximum of the two blocks' cached values; the result is not
    /// re-verified.
    pub fn append(&mut self, other: &Code) {
        self.instructions.extend_from_slice(&other.instructions);
        self.min_stack_size = self.min_stack_size.max(other.min_stack_size);
        self.verified = false;
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// True if the block holds no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The instructions as a slice.
    pub fn as_slice(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Minimum operand-stack capacity. Trustworthy only while
    /// [`Code::is_verified`] holds.
    pub fn min_stack_size(&self) -> usize {
        self.min_stack_size
    }

    /// True if [`Code::verify`] has succeeded and no structural edit
    /// happened since. The interpreter refuses to run a block for
    /// which this is false.
    pub fn is_verified(&self) -> bool {
        self.verified
    }

    /// Mutable access for optimizer passes. Invalidates verification.
    pub(crate) fn instructions_mut(&mut self) -> &mut Vec<Instruction> {
        self.verified = false;
        &mut self.instructions
    }

    /// Stack-balance verification.
    ///
    /// One forward pass over the instructions tracks the running stack
    /// depth and its maximum. An instruction that would pop more values
    /// than are present fails immediately (malformed code, caught
    /// before anything executes); a nonzero final depth fails as
    /// unbalanced. On success the running maximum is cached as the
    /// minimum stack capacity.
    pub fn verify(&mut self) -> Result<(), ExprError> {
        self.verified = false;
        let mut depth: usize = 0;
        let mut max_depth: usize = 0;

        for (at, instr) in self.instructions.iter().enumerate() {
            let pops = instr.pops();
            if pops > depth {
                return Err(VerifyFailure::StackUnderflow { at }.into());
            }
            depth = depth - pops + instr.pushes();
            if depth > MAX_STACK_DEPTH {
                return Err(ExprError::StackDepthExceeded {
                    depth,
                    limit: MAX_STACK_DEPTH,
                });
            }
            max_depth = max_depth.max(depth);
        }

        if depth != 0 {
            return Err(VerifyFailure::UnbalancedStack { depth }.into());
        }

        self.min_stack_size = max_depth;
        self.verified = true;
        Ok(())
    }
}

impl std::ops::Deref for Code {
    type Target = [Instruction];

    fn deref(&self) -> &Self::Target {
        &self.instructions
    }
}

impl<'a> IntoIterator for &'a Code {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}

impl Extend<Instruction> for Code {
    fn extend<T: IntoIterator<Item = Instruction>>(&mut self, iter: T) {
        self.instructions.extend(iter);
        self.verified = false;
    }
}
