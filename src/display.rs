// Display formatting for expressions, instructions, and dependency trees
use crate::ast::{Expr, ExprKind};
use crate::vm::code::Code;
use crate::vm::dependence::DependencyNode;
use crate::vm::instruction::{Instruction, Value};
use std::fmt;

/// Format a numeric payload, dropping the fractional part when it is
/// integer-valued and small enough to print exactly.
fn fmt_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.fract() == 0.0 && n.abs() < 1e10 {
        write!(f, "{}", n as i64)
    } else {
        write!(f, "{n}")
    }
}

struct Num(f64);

impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_number(f, self.0)
    }
}

struct Imm(Value);

impl fmt::Display for Imm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.im == 0.0 {
            fmt_number(f, self.0.re)
        } else {
            write!(f, "({} + {}i)", Num(self.0.re), Num(self.0.im))
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Add(u, v) => write!(f, "{u} + {v}"),
            ExprKind::Sub(u, v) => {
                // Parenthesize the RHS when it is an addition or
                // subtraction to preserve grouping: `a - (b + c)`.
                match v.kind {
                    ExprKind::Add(..) | ExprKind::Sub(..) => write!(f, "{u} - ({v})"),
                    _ => write!(f, "{u} - {v}"),
                }
            }
            ExprKind::Mul(u, v) => write!(f, "{} * {}", Factor(u), Factor(v)),
            ExprKind::Div(u, v) => write!(f, "{} / {}", Factor(u), Tight(v)),
            ExprKind::Pow(u, v) => write!(f, "{}^{}", Tight(u), Tight(v)),
            ExprKind::Neg(u) => write!(f, "-{}", Tight(u)),
            ExprKind::Exp(u) => write!(f, "exp({u})"),
            ExprKind::Log(u) => write!(f, "log({u})"),
            ExprKind::Symbol(s) => write!(f, "{s}"),
            ExprKind::Integer(n) => write!(f, "{n}"),
            ExprKind::Real(x) => fmt_number(f, *x),
            ExprKind::Complex(re, im) => write!(f, "({} + {}i)", Num(*re), Num(*im)),
        }
    }
}

/// A multiplication operand: sums and differences get parentheses.
struct Factor<'a>(&'a Expr);

impl fmt::Display for Factor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.kind {
            ExprKind::Add(..) | ExprKind::Sub(..) => write!(f, "({})", self.0),
            _ => write!(f, "{}", self.0),
        }
    }
}

/// An operand in a binding-tight position (power base/exponent,
/// negation, divisor): anything compound gets parentheses.
struct Tight<'a>(&'a Expr);

impl fmt::Display for Tight<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.kind {
            ExprKind::Symbol(_)
            | ExprKind::Integer(_)
            | ExprKind::Real(_)
            | ExprKind::Complex(..)
            | ExprKind::Exp(_)
            | ExprKind::Log(_) => write!(f, "{}", self.0),
            _ => write!(f, "({})", self.0),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Add(None) => write!(f, "add"),
            Instruction::Sub(None) => write!(f, "sub"),
            Instruction::Mul(None) => write!(f, "mul"),
            Instruction::Div(None) => write!(f, "div"),
            Instruction::Pow(None) => write!(f, "pow"),
            Instruction::Add(Some(v)) => write!(f, "add {}", Imm(*v)),
            Instruction::Sub(Some(v)) => write!(f, "sub {}", Imm(*v)),
            Instruction::Mul(Some(v)) => write!(f, "mul {}", Imm(*v)),
            Instruction::Div(Some(v)) => write!(f, "div {}", Imm(*v)),
            Instruction::Pow(Some(v)) => write!(f, "pow {}", Imm(*v)),
            Instruction::Exp => write!(f, "exp"),
            Instruction::Ln => write!(f, "ln"),
            Instruction::Load(slot) => write!(f, "load [{slot}]"),
            Instruction::Store(slot) => write!(f, "store [{slot}]"),
            Instruction::Push(v) => write!(f, "push {}", Imm(*v)),
        }
    }
}

/// One instruction per line, prefixed by its index.
impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, instr) in self.iter().enumerate() {
            writeln!(f, "{i:4}: {instr}")?;
        }
        Ok(())
    }
}

impl fmt::Display for DependencyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyNode::Add(l, r) => write!(f, "({l} + {r})"),
            DependencyNode::Sub(l, r) => write!(f, "({l} - {r})"),
            DependencyNode::Mul(l, r) => write!(f, "({l} * {r})"),
            DependencyNode::Div(l, r) => write!(f, "({l} / {r})"),
            DependencyNode::Pow(l, r) => write!(f, "({l}^{r})"),
            DependencyNode::Exp(arg) => write!(f, "exp({arg})"),
            DependencyNode::Ln(arg) => write!(f, "ln({arg})"),
            DependencyNode::Input(slot) => write!(f, "in[{slot}]"),
            DependencyNode::Constant(v) => write!(f, "{}", Imm(*v)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Symbol;

    #[test]
    fn test_expression_formatting() {
        let x = Symbol::new("x");
        let expr = Expr::add(
            Expr::mul(Expr::symbol(&x), Expr::integer(2)),
            Expr::integer(3),
        );
        assert_eq!(expr.to_string(), "x * 2 + 3");
    }

    #[test]
    fn test_grouping_parentheses() {
        let x = Symbol::new("x");
        let y = Symbol::new("y");
        let sum = || Expr::add(Expr::symbol(&x), Expr::symbol(&y));

        assert_eq!(
            Expr::mul(sum(), Expr::integer(2)).to_string(),
            "(x + y) * 2"
        );
        assert_eq!(
            Expr::sub(Expr::symbol(&x), sum()).to_string(),
            "x - (x + y)"
        );
        assert_eq!(Expr::pow(sum(), Expr::integer(2)).to_string(), "(x + y)^2");
        assert_eq!(Expr::neg(sum()).to_string(), "-(x + y)");
    }

    #[test]
    fn test_integer_valued_reals_print_without_fraction() {
        assert_eq!(Expr::real(2.0).to_string(), "2");
        assert_eq!(Expr::real(2.5).to_string(), "2.5");
        assert_eq!(Expr::complex(1.0, -2.0).to_string(), "(1 + -2i)");
    }

    #[test]
    fn test_instruction_formatting() {
        assert_eq!(Instruction::Load(3).to_string(), "load [3]");
        assert_eq!(Instruction::push(2.0).to_string(), "push 2");
        assert_eq!(Instruction::Mul(None).to_string(), "mul");
        assert_eq!(
            Instruction::Add(Some(Value::new(3.0, 0.0))).to_string(),
            "add 3"
        );
    }

    #[test]
    fn test_code_listing() {
        let mut code = Code::new();
        code.push(Instruction::Load(0));
        code.push(Instruction::push(2.0));
        code.push(Instruction::Mul(None));
        code.push(Instruction::Store(0));
        let listing = code.to_string();
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].ends_with("load [0]"));
        assert!(lines[2].ends_with("mul"));
    }

    #[test]
    fn test_dependency_node_formatting() {
        let node = DependencyNode::Add(
            Box::new(DependencyNode::Mul(
                Box::new(DependencyNode::Input(0)),
                Box::new(DependencyNode::Constant(Value::new(2.0, 0.0))),
            )),
            Box::new(DependencyNode::Constant(Value::new(3.0, 0.0))),
        );
        assert_eq!(node.to_string(), "((in[0] * 2) + 3)");
    }
}
