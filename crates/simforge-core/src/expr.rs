//! Expression trees for conditional probability functions, constraints and
//! reward.
//!
//! Expressions are pure apart from distribution-sampling nodes; branching
//! constructs evaluate lazily so a sample is only drawn on the taken branch.

use std::collections::HashSet;
use std::sync::Arc;

use crate::schema::SchemaId;
use crate::types::{EnumTypeId, ObjectTypeId};
use crate::value::Value;

/// An argument of a variable reference: either a free object parameter bound
/// by an enclosing aggregation or the defining variable's own parameter list,
/// or a concrete object index into the parameter's type domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Param(Arc<str>),
    Object(usize),
}

impl Term {
    pub fn param(name: impl Into<Arc<str>>) -> Self {
        Term::Param(name.into())
    }

    pub fn object(index: usize) -> Self {
        Term::Object(index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Abs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Implies,
    Iff,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Min,
    Max,
}

/// Aggregation quantifier over an object type's domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregator {
    Sum,
    Prod,
    Min,
    Max,
    Forall,
    Exists,
}

/// A distribution-sampling node. The catalog is fixed; each member consumes
/// a fixed number of draws from the trajectory's random source.
#[derive(Debug, Clone, PartialEq)]
pub enum Distribution {
    /// Deterministic pass-through for boolean/int/enum arguments.
    KronDelta(Box<Expr>),
    /// Deterministic pass-through for real arguments.
    DiracDelta(Box<Expr>),
    Bernoulli(Box<Expr>),
    /// Outcome probabilities keyed by label index, exhaustive over the enum.
    Discrete {
        enum_type: EnumTypeId,
        outcomes: Vec<(usize, Expr)>,
    },
    Uniform(Box<Expr>, Box<Expr>),
    Normal {
        mean: Box<Expr>,
        std_dev: Box<Expr>,
    },
}

/// An expression tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// A (possibly primed) variable reference. Primed references name the
    /// next-state value of a state schema.
    Var {
        schema: SchemaId,
        args: Vec<Term>,
        primed: bool,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Aggregate {
        op: Aggregator,
        param: Arc<str>,
        over: ObjectTypeId,
        body: Box<Expr>,
    },
    If {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    /// Switch on an enum-valued scrutinee; cases are keyed by label index
    /// and must cover the enum exhaustively.
    Switch {
        on: Box<Expr>,
        cases: Vec<(usize, Expr)>,
    },
    Random(Distribution),
}

impl Expr {
    // Constructors for common expressions

    pub fn literal(value: Value) -> Self {
        Expr::Literal(value)
    }

    pub fn bool(value: bool) -> Self {
        Expr::Literal(Value::Bool(value))
    }

    pub fn int(value: i64) -> Self {
        Expr::Literal(Value::Int(value))
    }

    pub fn real(value: f64) -> Self {
        Expr::Literal(Value::Real(value))
    }

    pub fn enum_label(enum_type: EnumTypeId, label: usize) -> Self {
        Expr::Literal(Value::Enum(enum_type, label))
    }

    pub fn var(schema: SchemaId, args: Vec<Term>) -> Self {
        Expr::Var {
            schema,
            args,
            primed: false,
        }
    }

    pub fn primed_var(schema: SchemaId, args: Vec<Term>) -> Self {
        Expr::Var {
            schema,
            args,
            primed: true,
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(expr: Expr) -> Self {
        Expr::Unary {
            op: UnaryOp::Not,
            expr: Box::new(expr),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn neg(expr: Expr) -> Self {
        Expr::Unary {
            op: UnaryOp::Neg,
            expr: Box::new(expr),
        }
    }

    pub fn abs(expr: Expr) -> Self {
        Expr::Unary {
            op: UnaryOp::Abs,
            expr: Box::new(expr),
        }
    }

    fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn add(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Add, left, right)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn sub(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Sub, left, right)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn mul(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Mul, left, right)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn div(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Div, left, right)
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::And, left, right)
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Or, left, right)
    }

    pub fn implies(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Implies, left, right)
    }

    pub fn iff(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Iff, left, right)
    }

    pub fn eq(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Eq, left, right)
    }

    pub fn ne(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Ne, left, right)
    }

    pub fn lt(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Lt, left, right)
    }

    pub fn le(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Le, left, right)
    }

    pub fn gt(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Gt, left, right)
    }

    pub fn ge(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Ge, left, right)
    }

    pub fn min(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Min, left, right)
    }

    pub fn max(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Max, left, right)
    }

    fn aggregate(op: Aggregator, param: impl Into<Arc<str>>, over: ObjectTypeId, body: Expr) -> Self {
        Expr::Aggregate {
            op,
            param: param.into(),
            over,
            body: Box::new(body),
        }
    }

    pub fn sum_over(param: impl Into<Arc<str>>, over: ObjectTypeId, body: Expr) -> Self {
        Self::aggregate(Aggregator::Sum, param, over, body)
    }

    pub fn prod_over(param: impl Into<Arc<str>>, over: ObjectTypeId, body: Expr) -> Self {
        Self::aggregate(Aggregator::Prod, param, over, body)
    }

    pub fn min_over(param: impl Into<Arc<str>>, over: ObjectTypeId, body: Expr) -> Self {
        Self::aggregate(Aggregator::Min, param, over, body)
    }

    pub fn max_over(param: impl Into<Arc<str>>, over: ObjectTypeId, body: Expr) -> Self {
        Self::aggregate(Aggregator::Max, param, over, body)
    }

    pub fn forall(param: impl Into<Arc<str>>, over: ObjectTypeId, body: Expr) -> Self {
        Self::aggregate(Aggregator::Forall, param, over, body)
    }

    pub fn exists(param: impl Into<Arc<str>>, over: ObjectTypeId, body: Expr) -> Self {
        Self::aggregate(Aggregator::Exists, param, over, body)
    }

    pub fn if_then_else(cond: Expr, then_expr: Expr, else_expr: Expr) -> Self {
        Expr::If {
            cond: Box::new(cond),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        }
    }

    pub fn switch(on: Expr, cases: Vec<(usize, Expr)>) -> Self {
        Expr::Switch {
            on: Box::new(on),
            cases,
        }
    }

    pub fn kron_delta(expr: Expr) -> Self {
        Expr::Random(Distribution::KronDelta(Box::new(expr)))
    }

    pub fn dirac_delta(expr: Expr) -> Self {
        Expr::Random(Distribution::DiracDelta(Box::new(expr)))
    }

    pub fn bernoulli(p: Expr) -> Self {
        Expr::Random(Distribution::Bernoulli(Box::new(p)))
    }

    pub fn discrete(enum_type: EnumTypeId, outcomes: Vec<(usize, Expr)>) -> Self {
        Expr::Random(Distribution::Discrete {
            enum_type,
            outcomes,
        })
    }

    pub fn uniform(lo: Expr, hi: Expr) -> Self {
        Expr::Random(Distribution::Uniform(Box::new(lo), Box::new(hi)))
    }

    pub fn normal(mean: Expr, std_dev: Expr) -> Self {
        Expr::Random(Distribution::Normal {
            mean: Box::new(mean),
            std_dev: Box::new(std_dev),
        })
    }

    /// Collects every (schema, primed) pair this expression reads.
    ///
    /// The stratifier builds the schema-level dependency graph from this
    /// walk.
    pub fn reads(&self, out: &mut HashSet<(SchemaId, bool)>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Var { schema, primed, .. } => {
                out.insert((*schema, *primed));
            }
            Expr::Unary { expr, .. } => expr.reads(out),
            Expr::Binary { left, right, .. } => {
                left.reads(out);
                right.reads(out);
            }
            Expr::Aggregate { body, .. } => body.reads(out),
            Expr::If {
                cond,
                then_expr,
                else_expr,
            } => {
                cond.reads(out);
                then_expr.reads(out);
                else_expr.reads(out);
            }
            Expr::Switch { on, cases } => {
                on.reads(out);
                for (_, case) in cases {
                    case.reads(out);
                }
            }
            Expr::Random(dist) => match dist {
                Distribution::KronDelta(e) | Distribution::DiracDelta(e) => e.reads(out),
                Distribution::Bernoulli(p) => p.reads(out),
                Distribution::Discrete { outcomes, .. } => {
                    for (_, p) in outcomes {
                        p.reads(out);
                    }
                }
                Distribution::Uniform(lo, hi) => {
                    lo.reads(out);
                    hi.reads(out);
                }
                Distribution::Normal { mean, std_dev } => {
                    mean.reads(out);
                    std_dev.reads(out);
                }
            },
        }
    }

    /// Whether any reachable node draws from the random source.
    ///
    /// KronDelta and DiracDelta are degenerate deterministic cases and do
    /// not count.
    pub fn is_stochastic(&self) -> bool {
        match self {
            Expr::Literal(_) | Expr::Var { .. } => false,
            Expr::Unary { expr, .. } => expr.is_stochastic(),
            Expr::Binary { left, right, .. } => left.is_stochastic() || right.is_stochastic(),
            Expr::Aggregate { body, .. } => body.is_stochastic(),
            Expr::If {
                cond,
                then_expr,
                else_expr,
            } => cond.is_stochastic() || then_expr.is_stochastic() || else_expr.is_stochastic(),
            Expr::Switch { on, cases } => {
                on.is_stochastic() || cases.iter().any(|(_, c)| c.is_stochastic())
            }
            Expr::Random(dist) => match dist {
                Distribution::KronDelta(e) | Distribution::DiracDelta(e) => e.is_stochastic(),
                Distribution::Bernoulli(_)
                | Distribution::Discrete { .. }
                | Distribution::Uniform(..)
                | Distribution::Normal { .. } => true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_collects_primed_and_unprimed() {
        let a = SchemaId(0);
        let b = SchemaId(1);
        let expr = Expr::and(
            Expr::var(a, vec![Term::param("x")]),
            Expr::primed_var(b, vec![Term::param("x")]),
        );
        let mut out = HashSet::new();
        expr.reads(&mut out);
        assert!(out.contains(&(a, false)));
        assert!(out.contains(&(b, true)));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_reads_descends_into_distributions() {
        let a = SchemaId(3);
        let expr = Expr::bernoulli(Expr::var(a, vec![]));
        let mut out = HashSet::new();
        expr.reads(&mut out);
        assert!(out.contains(&(a, false)));
    }

    #[test]
    fn test_is_stochastic() {
        assert!(!Expr::kron_delta(Expr::bool(true)).is_stochastic());
        assert!(!Expr::dirac_delta(Expr::real(0.5)).is_stochastic());
        assert!(Expr::bernoulli(Expr::real(0.5)).is_stochastic());
        assert!(Expr::if_then_else(
            Expr::bool(true),
            Expr::int(1),
            Expr::add(Expr::int(1), Expr::uniform(Expr::real(0.0), Expr::real(1.0))),
        )
        .is_stochastic());
    }
}
