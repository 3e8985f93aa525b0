use std::sync::Arc;

use rand::Rng;
use smallvec::SmallVec;

use simforge_core::{
    Aggregator, BinaryOp, Distribution, Environment, Expr, SchemaId, SimError, SimResult, Term,
    UnaryOp, Value,
};
use simforge_ground::GroundedModel;

use crate::sampler;

/// Parameter bindings in scope during an evaluation.
///
/// A small stack of `(name, object index)` frames; the trajectory driver
/// pushes the defining schema's parameters before evaluating a CPF, and
/// aggregations push their own parameter around each body evaluation.
/// Lookup scans from the top so inner bindings shadow outer ones.
#[derive(Debug, Default)]
pub struct Bindings {
    frames: SmallVec<[(Arc<str>, usize); 8]>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: Arc<str>, object: usize) {
        self.frames.push((name, object));
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.frames
            .iter()
            .rev()
            .find(|(n, _)| n.as_ref() == name)
            .map(|(_, i)| *i)
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

/// A tree interpreter over one grounded model.
///
/// Stateless apart from the model reference and the probability tolerance;
/// the environment and random source are supplied per call.
pub struct Evaluator<'m> {
    model: &'m GroundedModel,
    probability_tolerance: f64,
}

impl<'m> Evaluator<'m> {
    pub fn new(model: &'m GroundedModel) -> Self {
        Self {
            model,
            probability_tolerance: 1e-6,
        }
    }

    /// Overrides the tolerance used when checking that `Discrete` outcome
    /// probabilities sum to 1.
    pub fn with_tolerance(mut self, probability_tolerance: f64) -> Self {
        self.probability_tolerance = probability_tolerance;
        self
    }

    pub fn model(&self) -> &'m GroundedModel {
        self.model
    }

    /// Evaluates `expr` against `env` under the given bindings.
    ///
    /// Both operands of a binary operator and every element of an
    /// aggregation are evaluated, in declared order, even when the result is
    /// already determined; only `if` and `switch` skip branches. This keeps
    /// the number of random draws a function of the taken branches alone, so
    /// seeded runs replay exactly.
    pub fn eval<R: Rng + ?Sized>(
        &self,
        expr: &Expr,
        env: &Environment,
        bindings: &mut Bindings,
        rng: &mut R,
    ) -> SimResult<Value> {
        match expr {
            Expr::Literal(value) => Ok(*value),
            Expr::Var {
                schema,
                args,
                primed,
            } => self.read_var(*schema, args, *primed, env, bindings),
            Expr::Unary { op, expr } => {
                let value = self.eval(expr, env, bindings, rng)?;
                apply_unary(*op, value)
            }
            Expr::Binary { op, left, right } => {
                let l = self.eval(left, env, bindings, rng)?;
                let r = self.eval(right, env, bindings, rng)?;
                apply_binary(*op, l, r)
            }
            Expr::Aggregate {
                op,
                param,
                over,
                body,
            } => self.aggregate(*op, param, *over, body, env, bindings, rng),
            Expr::If {
                cond,
                then_expr,
                else_expr,
            } => {
                let cond = self.eval(cond, env, bindings, rng)?;
                let taken = if bool_operand("if condition", cond)? {
                    then_expr
                } else {
                    else_expr
                };
                self.eval(taken, env, bindings, rng)
            }
            Expr::Switch { on, cases } => {
                let scrutinee = self.eval(on, env, bindings, rng)?;
                let (_, label) = scrutinee.as_enum().ok_or_else(|| {
                    SimError::TypeMismatch(format!("switch on non-enum value {scrutinee}"))
                })?;
                let case = cases.iter().find(|(l, _)| *l == label).ok_or_else(|| {
                    SimError::TypeMismatch(format!("switch has no case for label {label}"))
                })?;
                self.eval(&case.1, env, bindings, rng)
            }
            Expr::Random(dist) => self.sample(dist, env, bindings, rng),
        }
    }

    fn read_var(
        &self,
        schema: SchemaId,
        args: &[Term],
        primed: bool,
        env: &Environment,
        bindings: &Bindings,
    ) -> SimResult<Value> {
        let mut indices: SmallVec<[usize; 4]> = SmallVec::with_capacity(args.len());
        for term in args {
            match term {
                Term::Object(index) => indices.push(*index),
                Term::Param(name) => indices.push(
                    bindings
                        .lookup(name)
                        .ok_or_else(|| SimError::UnboundParameter(name.to_string()))?,
                ),
            }
        }
        let name = &self.model.schema(schema).name;
        let gv = self
            .model
            .layout()
            .ground_var(schema, &indices)
            .ok_or_else(|| {
                SimError::TypeMismatch(format!("arguments out of range for `{name}`"))
            })?;
        if primed {
            env.primed_value(gv).ok_or_else(|| {
                SimError::TypeMismatch(format!("primed read of non-state variable `{name}`"))
            })
        } else {
            Ok(env.value(gv))
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn aggregate<R: Rng + ?Sized>(
        &self,
        op: Aggregator,
        param: &Arc<str>,
        over: simforge_core::ObjectTypeId,
        body: &Expr,
        env: &Environment,
        bindings: &mut Bindings,
        rng: &mut R,
    ) -> SimResult<Value> {
        let size = self.model.registry().domain_size(over);
        match op {
            Aggregator::Forall | Aggregator::Exists => {
                let mut acc = matches!(op, Aggregator::Forall);
                for index in 0..size {
                    bindings.push(param.clone(), index);
                    let value = self.eval(body, env, bindings, rng);
                    bindings.pop();
                    let b = bool_operand("quantifier body", value?)?;
                    acc = match op {
                        Aggregator::Forall => acc && b,
                        _ => acc || b,
                    };
                }
                Ok(Value::Bool(acc))
            }
            Aggregator::Sum | Aggregator::Prod => {
                let (mut acc, combine) = match op {
                    Aggregator::Sum => (Value::Int(0), BinaryOp::Add),
                    _ => (Value::Int(1), BinaryOp::Mul),
                };
                for index in 0..size {
                    bindings.push(param.clone(), index);
                    let value = self.eval(body, env, bindings, rng);
                    bindings.pop();
                    acc = apply_binary(combine, acc, value?)?;
                }
                Ok(acc)
            }
            Aggregator::Min | Aggregator::Max => {
                let combine = match op {
                    Aggregator::Min => BinaryOp::Min,
                    _ => BinaryOp::Max,
                };
                let mut acc: Option<Value> = None;
                for index in 0..size {
                    bindings.push(param.clone(), index);
                    let value = self.eval(body, env, bindings, rng);
                    bindings.pop();
                    let value = value?;
                    acc = Some(match acc {
                        Some(prev) => apply_binary(combine, prev, value)?,
                        None => {
                            if value.to_real().is_none() {
                                return Err(SimError::TypeMismatch(format!(
                                    "extremum over non-numeric value {value}"
                                )));
                            }
                            value
                        }
                    });
                }
                acc.ok_or_else(|| {
                    SimError::EmptyAggregation(format!(
                        "{} over an empty object domain",
                        match op {
                            Aggregator::Min => "min",
                            _ => "max",
                        }
                    ))
                })
            }
        }
    }

    fn sample<R: Rng + ?Sized>(
        &self,
        dist: &Distribution,
        env: &Environment,
        bindings: &mut Bindings,
        rng: &mut R,
    ) -> SimResult<Value> {
        match dist {
            Distribution::KronDelta(inner) | Distribution::DiracDelta(inner) => {
                self.eval(inner, env, bindings, rng)
            }
            Distribution::Bernoulli(p) => {
                let p = real_param("Bernoulli", self.eval(p, env, bindings, rng)?)?;
                sampler::bernoulli(p, rng).map(Value::Bool)
            }
            Distribution::Discrete {
                enum_type,
                outcomes,
            } => {
                let mut probs: SmallVec<[(usize, f64); 8]> =
                    SmallVec::with_capacity(outcomes.len());
                for (label, expr) in outcomes {
                    let p = real_param("Discrete", self.eval(expr, env, bindings, rng)?)?;
                    probs.push((*label, p));
                }
                sampler::discrete(*enum_type, &probs, self.probability_tolerance, rng)
            }
            Distribution::Uniform(lo, hi) => {
                let lo = real_param("Uniform", self.eval(lo, env, bindings, rng)?)?;
                let hi = real_param("Uniform", self.eval(hi, env, bindings, rng)?)?;
                sampler::uniform(lo, hi, rng).map(Value::Real)
            }
            Distribution::Normal { mean, std_dev } => {
                let mean = real_param("Normal", self.eval(mean, env, bindings, rng)?)?;
                let std_dev = real_param("Normal", self.eval(std_dev, env, bindings, rng)?)?;
                sampler::normal(mean, std_dev, rng).map(Value::Real)
            }
        }
    }
}

enum NumPair {
    Int(i64, i64),
    Real(f64, f64),
}

/// Pairs two operands for a numeric operator: integers (with bools as 0/1)
/// when both sides have an integer view, otherwise both promoted to real.
/// Enums have no numeric view.
fn numeric_pair(op: BinaryOp, left: Value, right: Value) -> SimResult<NumPair> {
    match (left.to_int(), right.to_int()) {
        (Some(l), Some(r)) => Ok(NumPair::Int(l, r)),
        _ => match (left.to_real(), right.to_real()) {
            (Some(l), Some(r)) => Ok(NumPair::Real(l, r)),
            _ => Err(SimError::TypeMismatch(format!(
                "numeric operator {op:?} applied to {left} and {right}"
            ))),
        },
    }
}

fn bool_operand(context: &str, value: Value) -> SimResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| SimError::TypeMismatch(format!("{context} is not boolean: {value}")))
}

fn real_param(dist: &str, value: Value) -> SimResult<f64> {
    value
        .to_real()
        .ok_or_else(|| SimError::TypeMismatch(format!("{dist} parameter {value} is not numeric")))
}

fn apply_unary(op: UnaryOp, value: Value) -> SimResult<Value> {
    match op {
        UnaryOp::Not => bool_operand("negation operand", value).map(|b| Value::Bool(!b)),
        UnaryOp::Neg => match value {
            Value::Real(x) => Ok(Value::Real(-x)),
            _ => value.to_int().map(|n| Value::Int(-n)).ok_or_else(|| {
                SimError::TypeMismatch(format!("arithmetic negation of {value}"))
            }),
        },
        UnaryOp::Abs => match value {
            Value::Real(x) => Ok(Value::Real(x.abs())),
            _ => value
                .to_int()
                .map(|n| Value::Int(n.abs()))
                .ok_or_else(|| SimError::TypeMismatch(format!("abs of {value}"))),
        },
    }
}

fn apply_binary(op: BinaryOp, left: Value, right: Value) -> SimResult<Value> {
    match op {
        BinaryOp::And | BinaryOp::Or | BinaryOp::Implies | BinaryOp::Iff => {
            let l = bool_operand("logical operand", left)?;
            let r = bool_operand("logical operand", right)?;
            Ok(Value::Bool(match op {
                BinaryOp::And => l && r,
                BinaryOp::Or => l || r,
                BinaryOp::Implies => !l || r,
                _ => l == r,
            }))
        }
        BinaryOp::Eq
        | BinaryOp::Ne
        | BinaryOp::Lt
        | BinaryOp::Le
        | BinaryOp::Gt
        | BinaryOp::Ge => compare(op, left, right),
        BinaryOp::Add
        | BinaryOp::Sub
        | BinaryOp::Mul
        | BinaryOp::Div
        | BinaryOp::Min
        | BinaryOp::Max => arith(op, left, right),
    }
}

fn compare(op: BinaryOp, left: Value, right: Value) -> SimResult<Value> {
    if let (Some((lt, li)), Some((rt, ri))) = (left.as_enum(), right.as_enum()) {
        if lt != rt {
            return Err(SimError::TypeMismatch(format!(
                "comparison across enum types {} and {}",
                lt.0, rt.0
            )));
        }
        return Ok(Value::Bool(ordered(op, &li, &ri)));
    }
    match numeric_pair(op, left, right)? {
        NumPair::Int(l, r) => Ok(Value::Bool(ordered(op, &l, &r))),
        NumPair::Real(l, r) => Ok(Value::Bool(ordered(op, &l, &r))),
    }
}

fn ordered<T: PartialOrd>(op: BinaryOp, l: &T, r: &T) -> bool {
    match op {
        BinaryOp::Eq => l == r,
        BinaryOp::Ne => l != r,
        BinaryOp::Lt => l < r,
        BinaryOp::Le => l <= r,
        BinaryOp::Gt => l > r,
        _ => l >= r,
    }
}

fn arith(op: BinaryOp, left: Value, right: Value) -> SimResult<Value> {
    match numeric_pair(op, left, right)? {
        NumPair::Int(l, r) => Ok(Value::Int(match op {
            BinaryOp::Add => l + r,
            BinaryOp::Sub => l - r,
            BinaryOp::Mul => l * r,
            BinaryOp::Div => {
                if r == 0 {
                    return Err(SimError::DivisionByZero);
                }
                // Truncates toward zero.
                l / r
            }
            BinaryOp::Min => l.min(r),
            _ => l.max(r),
        })),
        NumPair::Real(l, r) => Ok(Value::Real(match op {
            BinaryOp::Add => l + r,
            BinaryOp::Sub => l - r,
            BinaryOp::Mul => l * r,
            BinaryOp::Div => {
                if r == 0.0 {
                    return Err(SimError::DivisionByZero);
                }
                l / r
            }
            BinaryOp::Min => l.min(r),
            _ => l.max(r),
        })),
    }
}
