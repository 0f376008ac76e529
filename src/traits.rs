//! The numeric element type abstraction for the interpreter.
//!
//! Bytecode is compiled once and carries its immediates as complex
//! doubles; the interpreter is generic over any [`Scalar`], so the same
//! code block runs over plain `f64` (the canonical instantiation, used
//! on every integration step) or over `Complex64` (used e.g. for
//! spectral analysis), with identical control flow.

use std::fmt::Debug;
use std::ops::{Add, Div, Mul, Neg, Sub};

use num_complex::Complex64;
use num_traits::{One, Zero};

/// Tolerance for floating-point comparisons in tests and identity checks.
pub(crate) const FLOAT_TOLERANCE: f64 = 1e-10;

/// A value type the stack machine can compute over.
///
/// Everything the instruction set needs: field arithmetic, `pow`, and
/// the two elementary functions, plus conversion from the immediate
/// representation stored in bytecode.
pub trait Scalar:
    Zero
    + One
    + Copy
    + Clone
    + Debug
    + PartialEq
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + 'static
{
    /// Convert a bytecode immediate into this element type.
    fn from_imm(v: Complex64) -> Self;

    /// Raise `self` to the power `exponent`.
    fn pow(self, exponent: Self) -> Self;

    /// Natural exponential.
    fn exp(self) -> Self;

    /// Natural logarithm.
    fn ln(self) -> Self;
}

impl Scalar for f64 {
    /// The canonical real instantiation. Code compiled from real-valued
    /// expressions never carries a nonzero imaginary part, so taking
    /// the real part is lossless there.
    #[inline]
    fn from_imm(v: Complex64) -> Self {
        v.re
    }

    #[inline]
    fn pow(self, exponent: Self) -> Self {
        self.powf(exponent)
    }

    #[inline]
    fn exp(self) -> Self {
        f64::exp(self)
    }

    #[inline]
    fn ln(self) -> Self {
        f64::ln(self)
    }
}

impl Scalar for Complex64 {
    #[inline]
    fn from_imm(v: Complex64) -> Self {
        v
    }

    #[inline]
    fn pow(self, exponent: Self) -> Self {
        self.powc(exponent)
    }

    #[inline]
    fn exp(self) -> Self {
        Complex64::exp(self)
    }

    #[inline]
    fn ln(self) -> Self {
        Complex64::ln(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f64_from_imm_takes_real_part() {
        assert_eq!(f64::from_imm(Complex64::new(2.5, 0.0)), 2.5);
    }

    #[test]
    fn test_complex_pow_matches_real_pow_on_real_axis() {
        let c = Complex64::new(3.0, 0.0).pow(Complex64::new(2.0, 0.0));
        assert!((c.re - 9.0).abs() < FLOAT_TOLERANCE);
        assert!(c.im.abs() < FLOAT_TOLERANCE);
    }
}
