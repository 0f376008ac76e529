//! Expression IR for rate expressions.
//!
//! A tagged tree representing arithmetic over named variables, numeric
//! constants, and the two elementary functions the rate laws need
//! (`exp`, `log`). The IR is engine-independent: it is what the
//! [translation layer](crate::translate) produces from an external
//! symbolic-math tree and what the [assembler](crate::vm) consumes.
//!
//! Children are `Arc`-shared, so a sub-expression may appear under
//! multiple parents without deep copies (the structure is a DAG, not
//! necessarily a tree). Nodes are immutable after construction; the
//! only way to build them is through the factory constructors.

use std::sync::Arc;

use num_complex::Complex64;
use rustc_hash::FxHashMap;

use crate::symbol::Symbol;

/// An immutable expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
}

impl std::ops::Deref for Expr {
    type Target = ExprKind;

    fn deref(&self) -> &Self::Target {
        &self.kind
    }
}

/// The node tag. Arity is fixed by the tag: binary operators own
/// exactly two children, `Neg`/`Exp`/`Log` exactly one, leaves none.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Binary addition
    Add(Arc<Expr>, Arc<Expr>),
    /// Binary subtraction
    Sub(Arc<Expr>, Arc<Expr>),
    /// Binary multiplication
    Mul(Arc<Expr>, Arc<Expr>),
    /// Binary division
    Div(Arc<Expr>, Arc<Expr>),
    /// Exponentiation: base, exponent
    Pow(Arc<Expr>, Arc<Expr>),
    /// Arithmetic negation
    Neg(Arc<Expr>),
    /// Natural exponential function
    Exp(Arc<Expr>),
    /// Natural logarithm
    Log(Arc<Expr>),
    /// Reference to a domain-model variable
    Symbol(Symbol),
    /// Exact integer constant
    Integer(i64),
    /// Exact non-integer real constant
    Real(f64),
    /// Complex constant (real part, imaginary part)
    Complex(f64, f64),
}

impl Expr {
    fn new(kind: ExprKind) -> Self {
        Expr { kind }
    }

    // Factory constructors

    /// Create an addition node.
    pub fn add(lhs: Expr, rhs: Expr) -> Self {
        Expr::new(ExprKind::Add(Arc::new(lhs), Arc::new(rhs)))
    }

    /// Create a subtraction node.
    pub fn sub(lhs: Expr, rhs: Expr) -> Self {
        Expr::new(ExprKind::Sub(Arc::new(lhs), Arc::new(rhs)))
    }

    /// Create a multiplication node.
    pub fn mul(lhs: Expr, rhs: Expr) -> Self {
        Expr::new(ExprKind::Mul(Arc::new(lhs), Arc::new(rhs)))
    }

    /// Create a division node.
    pub fn div(lhs: Expr, rhs: Expr) -> Self {
        Expr::new(ExprKind::Div(Arc::new(lhs), Arc::new(rhs)))
    }

    /// Create a power node: `base ^ exponent`.
    pub fn pow(base: Expr, exponent: Expr) -> Self {
        Expr::new(ExprKind::Pow(Arc::new(base), Arc::new(exponent)))
    }

    /// Create a negation node.
    pub fn neg(inner: Expr) -> Self {
        Expr::new(ExprKind::Neg(Arc::new(inner)))
    }

    /// Create an `exp` function node.
    pub fn exp(arg: Expr) -> Self {
        Expr::new(ExprKind::Exp(Arc::new(arg)))
    }

    /// Create a `log` function node.
    pub fn log(arg: Expr) -> Self {
        Expr::new(ExprKind::Log(Arc::new(arg)))
    }

    /// Create a symbol reference node.
    pub fn symbol(sym: &Symbol) -> Self {
        Expr::new(ExprKind::Symbol(sym.clone()))
    }

    /// Create an integer constant node.
    pub fn integer(n: i64) -> Self {
        Expr::new(ExprKind::Integer(n))
    }

    /// Create a real constant node.
    pub fn real(x: f64) -> Self {
        Expr::new(ExprKind::Real(x))
    }

    /// Create a complex constant node from real and imaginary parts.
    pub fn complex(re: f64, im: f64) -> Self {
        Expr::new(ExprKind::Complex(re, im))
    }

    /// Create an addition node from already-shared children.
    ///
    /// Both handles land in the tree as-is, so a sub-expression held by
    /// several parents is one allocation, never a deep copy.
    pub fn add_shared(lhs: Arc<Expr>, rhs: Arc<Expr>) -> Self {
        Expr::new(ExprKind::Add(lhs, rhs))
    }

    /// Create a multiplication node from already-shared children.
    /// See [`Expr::add_shared`].
    pub fn mul_shared(lhs: Arc<Expr>, rhs: Arc<Expr>) -> Self {
        Expr::new(ExprKind::Mul(lhs, rhs))
    }

    // Type predicates

    /// True for `Add` nodes.
    pub fn is_add(&self) -> bool {
        matches!(self.kind, ExprKind::Add(..))
    }

    /// True for `Sub` nodes.
    pub fn is_sub(&self) -> bool {
        matches!(self.kind, ExprKind::Sub(..))
    }

    /// True for `Mul` nodes.
    pub fn is_mul(&self) -> bool {
        matches!(self.kind, ExprKind::Mul(..))
    }

    /// True for `Div` nodes.
    pub fn is_div(&self) -> bool {
        matches!(self.kind, ExprKind::Div(..))
    }

    /// True for `Pow` nodes.
    pub fn is_pow(&self) -> bool {
        matches!(self.kind, ExprKind::Pow(..))
    }

    /// True for `Neg` nodes.
    pub fn is_neg(&self) -> bool {
        matches!(self.kind, ExprKind::Neg(_))
    }

    /// True for `Exp` function nodes.
    pub fn is_exp(&self) -> bool {
        matches!(self.kind, ExprKind::Exp(_))
    }

    /// True for `Log` function nodes.
    pub fn is_log(&self) -> bool {
        matches!(self.kind, ExprKind::Log(_))
    }

    /// True for symbol references.
    pub fn is_symbol(&self) -> bool {
        matches!(self.kind, ExprKind::Symbol(_))
    }

    /// True for integer constants.
    pub fn is_integer(&self) -> bool {
        matches!(self.kind, ExprKind::Integer(_))
    }

    /// True for any constant leaf (integer, real or complex).
    pub fn is_constant(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Integer(_) | ExprKind::Real(_) | ExprKind::Complex(..)
        )
    }

    // Accessors

    /// Left operand of a binary node (base for `Pow`).
    pub fn lhs(&self) -> Option<&Expr> {
        match &self.kind {
            ExprKind::Add(l, _)
            | ExprKind::Sub(l, _)
            | ExprKind::Mul(l, _)
            | ExprKind::Div(l, _)
            | ExprKind::Pow(l, _) => Some(l),
            _ => None,
        }
    }

    /// Right operand of a binary node (exponent for `Pow`).
    pub fn rhs(&self) -> Option<&Expr> {
        match &self.kind {
            ExprKind::Add(_, r)
            | ExprKind::Sub(_, r)
            | ExprKind::Mul(_, r)
            | ExprKind::Div(_, r)
            | ExprKind::Pow(_, r) => Some(r),
            _ => None,
        }
    }

    /// Argument of a unary node (`Neg`, `Exp`, `Log`).
    pub fn arg(&self) -> Option<&Expr> {
        match &self.kind {
            ExprKind::Neg(a) | ExprKind::Exp(a) | ExprKind::Log(a) => Some(a),
            _ => None,
        }
    }

    /// The symbol of a `Symbol` node.
    pub fn as_symbol(&self) -> Option<&Symbol> {
        match &self.kind {
            ExprKind::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric value of a constant leaf, widened to complex.
    pub fn as_constant(&self) -> Option<Complex64> {
        match self.kind {
            ExprKind::Integer(n) => Some(Complex64::new(n as f64, 0.0)),
            ExprKind::Real(x) => Some(Complex64::new(x, 0.0)),
            ExprKind::Complex(re, im) => Some(Complex64::new(re, im)),
            _ => None,
        }
    }

    // Analysis

    /// Count of nodes in the tree (shared children counted per use).
    pub fn node_count(&self) -> usize {
        match &self.kind {
            ExprKind::Symbol(_)
            | ExprKind::Integer(_)
            | ExprKind::Real(_)
            | ExprKind::Complex(..) => 1,
            ExprKind::Neg(a) | ExprKind::Exp(a) | ExprKind::Log(a) => 1 + a.node_count(),
            ExprKind::Add(l, r)
            | ExprKind::Sub(l, r)
            | ExprKind::Mul(l, r)
            | ExprKind::Div(l, r)
            | ExprKind::Pow(l, r) => 1 + l.node_count() + r.node_count(),
        }
    }

    /// Maximum nesting depth.
    pub fn depth(&self) -> usize {
        match &self.kind {
            ExprKind::Symbol(_)
            | ExprKind::Integer(_)
            | ExprKind::Real(_)
            | ExprKind::Complex(..) => 1,
            ExprKind::Neg(a) | ExprKind::Exp(a) | ExprKind::Log(a) => 1 + a.depth(),
            ExprKind::Add(l, r)
            | ExprKind::Sub(l, r)
            | ExprKind::Mul(l, r)
            | ExprKind::Div(l, r)
            | ExprKind::Pow(l, r) => 1 + l.depth().max(r.depth()),
        }
    }

    /// Collect the symbols referenced by this expression.
    pub fn variables(&self) -> Vec<Symbol> {
        let mut seen = FxHashMap::default();
        let mut out = Vec::new();
        self.collect_variables(&mut seen, &mut out);
        out
    }

    fn collect_variables(&self, seen: &mut FxHashMap<u64, ()>, out: &mut Vec<Symbol>) {
        match &self.kind {
            ExprKind::Symbol(s) => {
                if seen.insert(s.id(), ()).is_none() {
                    out.push(s.clone());
                }
            }
            ExprKind::Integer(_) | ExprKind::Real(_) | ExprKind::Complex(..) => {}
            ExprKind::Neg(a) | ExprKind::Exp(a) | ExprKind::Log(a) => {
                a.collect_variables(seen, out);
            }
            ExprKind::Add(l, r)
            | ExprKind::Sub(l, r)
            | ExprKind::Mul(l, r)
            | ExprKind::Div(l, r)
            | ExprKind::Pow(l, r) => {
                l.collect_variables(seen, out);
                r.collect_variables(seen, out);
            }
        }
    }

    /// Evaluate the tree directly against per-symbol bindings.
    ///
    /// Reference implementation used by the equivalence tests: the
    /// compiled bytecode must agree with this within floating-point
    /// tolerance. Returns `None` if any symbol is unbound.
    pub fn eval(&self, bindings: &FxHashMap<u64, f64>) -> Option<f64> {
        match &self.kind {
            ExprKind::Symbol(s) => bindings.get(&s.id()).copied(),
            ExprKind::Integer(n) => Some(*n as f64),
            ExprKind::Real(x) => Some(*x),
            ExprKind::Complex(re, _) => Some(*re),
            ExprKind::Neg(a) => Some(-a.eval(bindings)?),
            ExprKind::Exp(a) => Some(a.eval(bindings)?.exp()),
            ExprKind::Log(a) => Some(a.eval(bindings)?.ln()),
            ExprKind::Add(l, r) => Some(l.eval(bindings)? + r.eval(bindings)?),
            ExprKind::Sub(l, r) => Some(l.eval(bindings)? - r.eval(bindings)?),
            ExprKind::Mul(l, r) => Some(l.eval(bindings)? * r.eval(bindings)?),
            ExprKind::Div(l, r) => Some(l.eval(bindings)? / r.eval(bindings)?),
            ExprKind::Pow(l, r) => Some(l.eval(bindings)?.powf(r.eval(bindings)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_and_predicates() {
        let x = Symbol::new("x");
        let e = Expr::add(Expr::symbol(&x), Expr::integer(1));
        assert!(e.is_add());
        assert!(e.lhs().is_some_and(Expr::is_symbol));
        assert!(e.rhs().is_some_and(Expr::is_integer));
        assert!(e.arg().is_none());
    }

    #[test]
    fn test_arity_by_tag() {
        let x = Symbol::new("x");
        let f = Expr::exp(Expr::symbol(&x));
        assert!(f.is_exp());
        assert!(f.arg().is_some());
        assert!(f.lhs().is_none() && f.rhs().is_none());
    }

    #[test]
    fn test_shared_children() {
        let a = Symbol::new("a");
        let leaf = Arc::new(Expr::symbol(&a));
        let e = Expr::add_shared(Arc::clone(&leaf), Arc::clone(&leaf));
        // Both children are the same allocation.
        let (l, r) = match &e.kind {
            ExprKind::Add(l, r) => (l, r),
            _ => unreachable!(),
        };
        assert!(Arc::ptr_eq(l, &leaf));
        assert!(Arc::ptr_eq(r, &leaf));
        assert_eq!(e.node_count(), 3);

        let m = Expr::mul_shared(Arc::clone(&leaf), Arc::new(Expr::integer(2)));
        assert!(m.is_mul());
        assert!(m.lhs().is_some_and(Expr::is_symbol));
    }

    #[test]
    fn test_eval_matches_hand_computation() {
        let x = Symbol::new("x");
        // x * 2 + 3 at x = 5
        let e = Expr::add(
            Expr::mul(Expr::symbol(&x), Expr::integer(2)),
            Expr::integer(3),
        );
        let mut bindings = FxHashMap::default();
        bindings.insert(x.id(), 5.0);
        assert_eq!(e.eval(&bindings), Some(13.0));
    }

    #[test]
    fn test_eval_unbound_symbol_is_none() {
        let y = Symbol::new("y");
        let e = Expr::log(Expr::symbol(&y));
        assert_eq!(e.eval(&FxHashMap::default()), None);
    }

    #[test]
    fn test_variables_deduplicated_in_first_use_order() {
        let a = Symbol::new("a");
        let b = Symbol::new("b");
        let e = Expr::mul(
            Expr::add(Expr::symbol(&b), Expr::symbol(&a)),
            Expr::symbol(&b),
        );
        let vars = e.variables();
        assert_eq!(vars, vec![b, a]);
    }
}
