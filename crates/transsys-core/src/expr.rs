//! Expression trees evaluated against GRN state contexts.
//!
//! Expressions appear in factor definitions (decay, diffusibility,
//! synthesis), promoter elements, rule conditions and rule assignments. All
//! identifiers are already resolved to a `(context, factor)` pair: context 0
//! is the default state (the instance being updated, or the first symbol of
//! a rule's left hand side), higher contexts are the other matched symbols.

use crate::instance::TranssysInstance;
use crate::rng::RngContext;
use crate::types::FactorIndex;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Binary operators. Relational and logical operators yield `1.0` or `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
    Log,
    Atan,
    Sqrt,
}

/// A resolved expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Literal value.
    Value(f64),
    /// Concentration of `factor` in the state at position `context`.
    Identifier { context: usize, factor: FactorIndex },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// Uniform draw between two evaluated bounds.
    Random { min: Box<Expr>, max: Box<Expr> },
    /// Normal draw with evaluated mean and standard deviation.
    Gauss { mean: Box<Expr>, stddev: Box<Expr> },
}

fn truth(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

impl Expr {
    pub fn value(v: f64) -> Self {
        Expr::Value(v)
    }

    /// Identifier in the default context.
    pub fn factor(factor: FactorIndex) -> Self {
        Expr::Identifier { context: 0, factor }
    }

    pub fn identifier(context: usize, factor: FactorIndex) -> Self {
        Expr::Identifier { context, factor }
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn random(min: Expr, max: Expr) -> Self {
        Expr::Random {
            min: Box::new(min),
            max: Box::new(max),
        }
    }

    pub fn gauss(mean: Expr, stddev: Expr) -> Self {
        Expr::Gauss {
            mean: Box::new(mean),
            stddev: Box::new(stddev),
        }
    }

    /// Evaluate against an ordered list of contexts.
    ///
    /// Operands are evaluated left then right, always both, so the number and
    /// order of random draws does not depend on intermediate values. IEEE
    /// semantics apply unchanged: `1 / 0` is `inf`, `log(-1)` is `NaN`.
    pub fn evaluate(&self, contexts: &[&TranssysInstance], rng: &mut RngContext) -> f64 {
        match self {
            Expr::Value(v) => *v,
            Expr::Identifier { context, factor } => lookup(contexts, *context, *factor),
            Expr::Binary { op, lhs, rhs } => {
                let a = lhs.evaluate(contexts, rng);
                let b = rhs.evaluate(contexts, rng);
                match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    BinaryOp::Pow => a.powf(b),
                    BinaryOp::Lt => truth(a < b),
                    BinaryOp::Le => truth(a <= b),
                    BinaryOp::Gt => truth(a > b),
                    BinaryOp::Ge => truth(a >= b),
                    BinaryOp::Eq => truth(a == b),
                    BinaryOp::Ne => truth(a != b),
                    BinaryOp::And => truth(a != 0.0 && b != 0.0),
                    BinaryOp::Or => truth(a != 0.0 || b != 0.0),
                }
            }
            Expr::Unary { op, operand } => {
                let x = operand.evaluate(contexts, rng);
                match op {
                    UnaryOp::Not => truth(x == 0.0),
                    UnaryOp::Neg => -x,
                    UnaryOp::Log => x.ln(),
                    UnaryOp::Atan => x.atan(),
                    UnaryOp::Sqrt => x.sqrt(),
                }
            }
            Expr::Random { min, max } => {
                let lo = min.evaluate(contexts, rng);
                let hi = max.evaluate(contexts, rng);
                rng.uniform(lo, hi)
            }
            Expr::Gauss { mean, stddev } => {
                let mu = mean.evaluate(contexts, rng);
                let sigma = stddev.evaluate(contexts, rng);
                rng.gaussian(mu, sigma)
            }
        }
    }

    /// Evaluate and interpret the result as a condition.
    pub fn is_true(&self, contexts: &[&TranssysInstance], rng: &mut RngContext) -> bool {
        self.evaluate(contexts, rng) != 0.0
    }

    /// Largest context index referenced anywhere in the tree.
    pub fn max_context(&self) -> Option<usize> {
        match self {
            Expr::Value(_) => None,
            Expr::Identifier { context, .. } => Some(*context),
            Expr::Unary { operand, .. } => operand.max_context(),
            Expr::Binary { lhs: a, rhs: b, .. }
            | Expr::Random { min: a, max: b }
            | Expr::Gauss {
                mean: a,
                stddev: b,
            } => match (a.max_context(), b.max_context()) {
                (Some(x), Some(y)) => Some(x.max(y)),
                (x, y) => x.or(y),
            },
        }
    }
}

fn lookup(contexts: &[&TranssysInstance], context: usize, factor: FactorIndex) -> f64 {
    let Some(instance) = contexts.get(context) else {
        warn!(context, num_contexts = contexts.len(), "identifier refers to a missing context");
        return 0.0;
    };
    match instance.concentration(factor) {
        Some(c) => c,
        None => {
            warn!(
                context,
                factor,
                num_factors = instance.num_factors(),
                "identifier refers to a factor outside the concentration vector"
            );
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{Factor, TranssysProgramBuilder};
    use std::sync::Arc;

    fn two_factor_instance(a: f64, b: f64) -> TranssysInstance {
        let mut builder = TranssysProgramBuilder::new("p");
        builder.add_factor(Factor::new("a", 0));
        builder.add_factor(Factor::new("b", 1));
        let program = Arc::new(builder.freeze().unwrap());
        let mut instance = TranssysInstance::new(program);
        instance.set_concentration(0, a).unwrap();
        instance.set_concentration(1, b).unwrap();
        instance
    }

    #[test]
    fn arithmetic_and_relational() {
        let mut rng = RngContext::new(1);
        let e = Expr::binary(
            BinaryOp::Mul,
            Expr::binary(BinaryOp::Add, Expr::value(1.0), Expr::value(2.0)),
            Expr::value(4.0),
        );
        assert_eq!(e.evaluate(&[], &mut rng), 12.0);

        let cmp = Expr::binary(BinaryOp::Ge, Expr::value(3.0), Expr::value(3.0));
        assert_eq!(cmp.evaluate(&[], &mut rng), 1.0);
        let not = Expr::unary(UnaryOp::Not, cmp);
        assert_eq!(not.evaluate(&[], &mut rng), 0.0);
    }

    #[test]
    fn division_by_zero_is_not_guarded() {
        let mut rng = RngContext::new(1);
        let e = Expr::binary(BinaryOp::Div, Expr::value(1.0), Expr::value(0.0));
        assert!(e.evaluate(&[], &mut rng).is_infinite());
        let l = Expr::unary(UnaryOp::Log, Expr::value(-1.0));
        assert!(l.evaluate(&[], &mut rng).is_nan());
    }

    #[test]
    fn identifiers_address_contexts() {
        let mut rng = RngContext::new(1);
        let x = two_factor_instance(2.0, 3.0);
        let y = two_factor_instance(10.0, 20.0);
        let e = Expr::binary(
            BinaryOp::Sub,
            Expr::identifier(1, 1),
            Expr::identifier(0, 0),
        );
        assert_eq!(e.evaluate(&[&x, &y], &mut rng), 18.0);
    }

    #[test]
    fn out_of_range_identifier_is_zero() {
        let mut rng = RngContext::new(1);
        let x = two_factor_instance(2.0, 3.0);
        assert_eq!(Expr::identifier(0, 5).evaluate(&[&x], &mut rng), 0.0);
        assert_eq!(Expr::identifier(3, 0).evaluate(&[&x], &mut rng), 0.0);
    }

    #[test]
    fn logical_operators_evaluate_both_sides() {
        // The right-hand draw must happen even though the left side is false.
        let e = Expr::binary(
            BinaryOp::And,
            Expr::value(0.0),
            Expr::random(Expr::value(0.0), Expr::value(1.0)),
        );
        let mut rng = RngContext::new(5);
        assert_eq!(e.evaluate(&[], &mut rng), 0.0);
        let after = rng.uniform(0.0, 1.0);

        let mut reference = RngContext::new(5);
        reference.uniform(0.0, 1.0);
        assert_eq!(after, reference.uniform(0.0, 1.0));
    }

    #[test]
    fn max_context_walks_tree() {
        let e = Expr::binary(
            BinaryOp::Add,
            Expr::identifier(2, 0),
            Expr::gauss(Expr::identifier(4, 1), Expr::value(1.0)),
        );
        assert_eq!(e.max_context(), Some(4));
        assert_eq!(Expr::value(1.0).max_context(), None);
    }
}
