//! Translation from an external symbolic-engine tree into the IR.
//!
//! The engine's tree is a closed type set we do not control; the
//! [`EngineExpr`] trait is the adapter boundary, and one recursive
//! pattern match does the whole translation. Per-engine code lives
//! entirely in that trait implementation.

use crate::ast::Expr;
use crate::error::ExprError;
use crate::symbol::Symbol;

/// The shape of one external tree node, as reported by its engine.
///
/// N-ary sums and products carry their ordered operand lists; exactness
/// of numeric literals is preserved through the three constant kinds.
/// Anything the compiler cannot lower is reported as
/// [`Other`](EngineNode::Other) with a description for the error
/// message.
pub enum EngineNode<'a, E> {
    /// Ordered n-ary sum.
    Sum(Vec<&'a E>),
    /// Ordered n-ary product.
    Product(Vec<&'a E>),
    Sub(&'a E, &'a E),
    Div(&'a E, &'a E),
    /// Base and exponent.
    Power(&'a E, &'a E),
    Neg(&'a E),
    /// A function call with its identity token and single argument.
    Function { name: &'a str, arg: &'a E },
    Symbol(&'a Symbol),
    Integer(i64),
    Real(f64),
    Complex(f64, f64),
    /// A node kind the compiler does not understand.
    Other(String),
}

/// Adapter implemented once per external symbolic-math engine.
pub trait EngineExpr: Sized {
    /// Classify this node into the closed set the translator handles.
    fn classify(&self) -> EngineNode<'_, Self>;
}

/// Walk an external tree and build the equivalent IR tree.
///
/// N-ary sums and products fold left, so `a + b + c` becomes
/// `(a + b) + c`. Of the engine's functions only `exp` and `log` are
/// lowered; anything else fails the whole translation.
///
/// # Errors
///
/// Returns a translation error describing the offending construct for
/// unknown node kinds, unknown functions, and empty operand lists.
pub fn translate<E: EngineExpr>(node: &E) -> Result<Expr, ExprError> {
    match node.classify() {
        EngineNode::Sum(terms) => fold_nary(&terms, "sum", Expr::add),
        EngineNode::Product(factors) => fold_nary(&factors, "product", Expr::mul),
        EngineNode::Sub(lhs, rhs) => Ok(Expr::sub(translate(lhs)?, translate(rhs)?)),
        EngineNode::Div(num, den) => Ok(Expr::div(translate(num)?, translate(den)?)),
        EngineNode::Power(base, exponent) => {
            Ok(Expr::pow(translate(base)?, translate(exponent)?))
        }
        EngineNode::Neg(inner) => Ok(Expr::neg(translate(inner)?)),
        EngineNode::Function { name, arg } => match name {
            "exp" => Ok(Expr::exp(translate(arg)?)),
            "log" => Ok(Expr::log(translate(arg)?)),
            other => Err(ExprError::translation(format!(
                "unsupported function '{other}'"
            ))),
        },
        EngineNode::Symbol(sym) => Ok(Expr::symbol(sym)),
        EngineNode::Integer(n) => Ok(Expr::integer(n)),
        EngineNode::Real(x) => Ok(Expr::real(x)),
        EngineNode::Complex(re, im) => Ok(Expr::complex(re, im)),
        EngineNode::Other(desc) => Err(ExprError::translation(format!(
            "unsupported expression node: {desc}"
        ))),
    }
}

fn fold_nary<E: EngineExpr>(
    operands: &[&E],
    kind: &str,
    combine: fn(Expr, Expr) -> Expr,
) -> Result<Expr, ExprError> {
    let (first, rest) = operands
        .split_first()
        .ok_or_else(|| ExprError::translation(format!("empty {kind}")))?;
    let mut acc = translate(*first)?;
    for operand in rest {
        acc = combine(acc, translate(*operand)?);
    }
    Ok(acc)
}
