//! Static validation of the domain, registry and expressions.

use std::collections::HashSet;
use std::sync::Arc;

use simforge_core::{
    BuildError, BuildResult, Distribution, Domain, Expr, Instance, Layer, NonFluents,
    ObjectTypeId, Term, TypeRegistry, UnaryOp, ValueKind,
};

/// Assembles the final type registry: the domain's types plus object
/// constants contributed by the non-fluents block, then the instance, in
/// declaration order.
pub(crate) fn assemble_registry(
    domain: &Domain,
    non_fluents: Option<&NonFluents>,
    instance: &Instance,
) -> BuildResult<TypeRegistry> {
    let mut registry = domain.types.clone();
    validate_registry(&registry)?;

    let extensions = non_fluents
        .map(|nf| nf.objects.as_slice())
        .unwrap_or_default()
        .iter()
        .chain(instance.objects.iter());
    for (type_name, objects) in extensions {
        let id = registry
            .object_type_id(type_name)
            .ok_or_else(|| BuildError::UnknownIdentifier(format!("object type `{type_name}`")))?;
        for object in objects {
            if registry.object_type(id).object_index(object).is_some() {
                return Err(BuildError::DuplicateDefinition(format!(
                    "object `{object}` of type `{type_name}`"
                )));
            }
            registry.extend_objects(id, [object.clone()]);
        }
    }
    Ok(registry)
}

fn validate_registry(registry: &TypeRegistry) -> BuildResult<()> {
    let mut names: HashSet<&str> = HashSet::new();
    for def in registry.object_types() {
        if !names.insert(def.name.as_ref()) {
            return Err(BuildError::DuplicateDefinition(format!(
                "type `{}`",
                def.name
            )));
        }
        let mut objects: HashSet<&str> = HashSet::new();
        for object in &def.objects {
            if !objects.insert(object.as_ref()) {
                return Err(BuildError::DuplicateDefinition(format!(
                    "object `{}` of type `{}`",
                    object, def.name
                )));
            }
        }
    }
    for def in registry.enum_types() {
        if !names.insert(def.name.as_ref()) {
            return Err(BuildError::DuplicateDefinition(format!(
                "type `{}`",
                def.name
            )));
        }
        let mut labels: HashSet<&str> = HashSet::new();
        for label in &def.labels {
            if !labels.insert(label.as_ref()) {
                return Err(BuildError::DuplicateDefinition(format!(
                    "label `{}` of enum `{}`",
                    label, def.name
                )));
            }
        }
    }
    Ok(())
}

/// Validates schemas, cpfs, constraints, reward and requirements gating.
pub(crate) fn validate_domain(
    domain: &Domain,
    registry: &TypeRegistry,
    instance: &Instance,
) -> BuildResult<()> {
    let mut schema_names: HashSet<&str> = HashSet::new();
    for (id, schema) in domain.schemas.iter() {
        if !schema_names.insert(schema.name.as_ref()) {
            return Err(BuildError::DuplicateDefinition(format!(
                "variable `{}`",
                schema.name
            )));
        }
        if schema.layer.requires_default() {
            match &schema.default {
                None => return Err(BuildError::MissingDefault(schema.name.to_string())),
                Some(default) if !default.matches(schema.kind) => {
                    return Err(BuildError::TypeMismatch {
                        context: format!("default of `{}`", schema.name),
                        expected: schema.kind.to_string(),
                        found: default.kind().to_string(),
                    });
                }
                Some(_) => {}
            }
        } else if schema.default.is_some() {
            return Err(BuildError::UnexpectedDefault(schema.name.to_string()));
        }
        if let Layer::Interm { level } = schema.layer {
            if level == 0 {
                return Err(BuildError::InvalidIntermLevel {
                    name: schema.name.to_string(),
                    level,
                });
            }
        }

        let cpf = domain.cpf(id);
        if schema.layer.has_cpf() {
            let cpf = cpf.ok_or_else(|| BuildError::MissingCpf(schema.name.to_string()))?;
            if cpf.params.len() != schema.arity() {
                return Err(BuildError::ArityMismatch {
                    name: schema.name.to_string(),
                    expected: schema.arity(),
                    found: cpf.params.len(),
                });
            }
            let mut seen: HashSet<&str> = HashSet::new();
            for param in &cpf.params {
                if !seen.insert(param.as_ref()) {
                    return Err(BuildError::DuplicateDefinition(format!(
                        "cpf parameter `{}` of `{}`",
                        param, schema.name
                    )));
                }
            }
        } else if cpf.is_some() {
            return Err(BuildError::UnexpectedCpf(schema.name.to_string()));
        }
    }

    for (id, schema) in domain.schemas.iter() {
        if let Some(cpf) = domain.cpf(id) {
            let ctx = ExprCtx {
                domain,
                registry,
                who: format!("cpf of `{}`", schema.name),
            };
            let mut bound: Vec<(Arc<str>, ObjectTypeId)> = cpf
                .params
                .iter()
                .cloned()
                .zip(schema.params.iter().copied())
                .collect();
            validate_expr(&cpf.body, &ctx, &mut bound)?;
        }
    }
    for (i, constraint) in domain.constraints.iter().enumerate() {
        let ctx = ExprCtx {
            domain,
            registry,
            who: format!("constraint #{i}"),
        };
        validate_expr(constraint, &ctx, &mut Vec::new())?;
    }
    if let Some(reward) = &domain.reward {
        let ctx = ExprCtx {
            domain,
            registry,
            who: "reward".to_string(),
        };
        validate_expr(reward, &ctx, &mut Vec::new())?;
    }

    check_requirements(domain, instance)
}

fn check_requirements(domain: &Domain, instance: &Instance) -> BuildResult<()> {
    let req = &domain.requirements;
    for (id, schema) in domain.schemas.iter() {
        match schema.kind {
            ValueKind::Real if !req.continuous => {
                return Err(BuildError::RequirementViolation(format!(
                    "real-valued variable `{}` requires `continuous`",
                    schema.name
                )));
            }
            ValueKind::Int if !req.integer_valued => {
                return Err(BuildError::RequirementViolation(format!(
                    "integer-valued variable `{}` requires `integer_valued`",
                    schema.name
                )));
            }
            ValueKind::Enum(_) if !req.multivalued => {
                return Err(BuildError::RequirementViolation(format!(
                    "enum-valued variable `{}` requires `multivalued`",
                    schema.name
                )));
            }
            _ => {}
        }
        match schema.layer {
            Layer::Interm { .. } if !req.intermediate_nodes => {
                return Err(BuildError::RequirementViolation(format!(
                    "intermediate variable `{}` requires `intermediate_nodes`",
                    schema.name
                )));
            }
            Layer::Observation if !req.partially_observed => {
                return Err(BuildError::RequirementViolation(format!(
                    "observation variable `{}` requires `partially_observed`",
                    schema.name
                )));
            }
            _ => {}
        }
        if req.cpf_deterministic {
            if let Some(cpf) = domain.cpf(id) {
                if cpf.body.is_stochastic() {
                    return Err(BuildError::RequirementViolation(format!(
                        "stochastic cpf of `{}` forbidden by `cpf_deterministic`",
                        schema.name
                    )));
                }
            }
        }
    }
    if !domain.constraints.is_empty() && !req.state_constraints {
        return Err(BuildError::RequirementViolation(
            "state-action constraints require `state_constraints`".to_string(),
        ));
    }
    if instance.max_nondef_actions > 1 && !req.concurrent_actions {
        return Err(BuildError::RequirementViolation(
            "max_nondef_actions > 1 requires `concurrent_actions`".to_string(),
        ));
    }
    if req.reward_deterministic {
        if let Some(reward) = &domain.reward {
            if reward.is_stochastic() {
                return Err(BuildError::RequirementViolation(
                    "stochastic reward forbidden by `reward_deterministic`".to_string(),
                ));
            }
        }
    }
    Ok(())
}

struct ExprCtx<'a> {
    domain: &'a Domain,
    registry: &'a TypeRegistry,
    who: String,
}

fn validate_expr(
    expr: &Expr,
    ctx: &ExprCtx<'_>,
    bound: &mut Vec<(Arc<str>, ObjectTypeId)>,
) -> BuildResult<()> {
    match expr {
        Expr::Literal(value) => {
            if let Some((enum_type, label)) = value.as_enum() {
                let labels = ctx.registry.enum_type(enum_type).labels.len();
                if label >= labels {
                    return Err(BuildError::UnknownIdentifier(format!(
                        "enum label index {label} in {}",
                        ctx.who
                    )));
                }
            }
            Ok(())
        }

        Expr::Var {
            schema,
            args,
            primed,
        } => {
            let def = ctx.domain.schemas.get(*schema).ok_or_else(|| {
                BuildError::UnknownIdentifier(format!("variable #{} in {}", schema.0, ctx.who))
            })?;
            if args.len() != def.arity() {
                return Err(BuildError::ArityMismatch {
                    name: def.name.to_string(),
                    expected: def.arity(),
                    found: args.len(),
                });
            }
            if *primed && def.layer != Layer::State {
                return Err(BuildError::LevelViolation(format!(
                    "primed reference to {} variable `{}` in {}",
                    def.layer.name(),
                    def.name,
                    ctx.who
                )));
            }
            for (term, &param_type) in args.iter().zip(&def.params) {
                match term {
                    Term::Param(name) => {
                        let bound_type = bound
                            .iter()
                            .rev()
                            .find(|(n, _)| n == name)
                            .map(|(_, ty)| *ty)
                            .ok_or_else(|| {
                                BuildError::UnboundParameter(format!("{name} in {}", ctx.who))
                            })?;
                        if bound_type != param_type {
                            return Err(BuildError::TypeMismatch {
                                context: format!("argument `{}` of `{}`", name, def.name),
                                expected: ctx.registry.object_type(param_type).name.to_string(),
                                found: ctx.registry.object_type(bound_type).name.to_string(),
                            });
                        }
                    }
                    Term::Object(index) => {
                        if *index >= ctx.registry.domain_size(param_type) {
                            return Err(BuildError::UndeclaredGroundVariable(format!(
                                "`{}` argument {index} outside type `{}`",
                                def.name,
                                ctx.registry.object_type(param_type).name
                            )));
                        }
                    }
                }
            }
            Ok(())
        }

        Expr::Unary { expr, .. } => validate_expr(expr, ctx, bound),

        Expr::Binary { left, right, .. } => {
            validate_expr(left, ctx, bound)?;
            validate_expr(right, ctx, bound)
        }

        Expr::Aggregate {
            param, over, body, ..
        } => {
            bound.push((param.clone(), *over));
            let result = validate_expr(body, ctx, bound);
            bound.pop();
            result
        }

        Expr::If {
            cond,
            then_expr,
            else_expr,
        } => {
            validate_expr(cond, ctx, bound)?;
            validate_expr(then_expr, ctx, bound)?;
            validate_expr(else_expr, ctx, bound)
        }

        Expr::Switch { on, cases } => {
            validate_expr(on, ctx, bound)?;
            let enum_type = match infer_kind(on, ctx.domain) {
                Some(ValueKind::Enum(et)) => et,
                other => {
                    return Err(BuildError::TypeMismatch {
                        context: format!("switch scrutinee in {}", ctx.who),
                        expected: "enum".to_string(),
                        found: other.map(|k| k.to_string()).unwrap_or_default(),
                    });
                }
            };
            check_label_coverage(
                cases.iter().map(|(label, _)| *label),
                ctx.registry.enum_type(enum_type).labels.len(),
            )
            .then_some(())
            .ok_or_else(|| BuildError::NonExhaustiveSwitch(ctx.who.clone()))?;
            for (_, case) in cases {
                validate_expr(case, ctx, bound)?;
            }
            Ok(())
        }

        Expr::Random(dist) => match dist {
            Distribution::KronDelta(e) | Distribution::DiracDelta(e) => {
                validate_expr(e, ctx, bound)
            }
            Distribution::Bernoulli(p) => validate_expr(p, ctx, bound),
            Distribution::Discrete {
                enum_type,
                outcomes,
            } => {
                check_label_coverage(
                    outcomes.iter().map(|(label, _)| *label),
                    ctx.registry.enum_type(*enum_type).labels.len(),
                )
                .then_some(())
                .ok_or_else(|| BuildError::NonExhaustiveDiscrete(ctx.who.clone()))?;
                for (_, p) in outcomes {
                    validate_expr(p, ctx, bound)?;
                }
                Ok(())
            }
            Distribution::Uniform(lo, hi) => {
                validate_expr(lo, ctx, bound)?;
                validate_expr(hi, ctx, bound)
            }
            Distribution::Normal { mean, std_dev } => {
                validate_expr(mean, ctx, bound)?;
                validate_expr(std_dev, ctx, bound)
            }
        },
    }
}

/// True when `labels` covers `0..count` exactly once each.
fn check_label_coverage(labels: impl Iterator<Item = usize>, count: usize) -> bool {
    let mut seen = vec![false; count];
    let mut total = 0usize;
    for label in labels {
        if label >= count || seen[label] {
            return false;
        }
        seen[label] = true;
        total += 1;
    }
    total == count
}

fn numeric(kind: Option<ValueKind>) -> Option<ValueKind> {
    match kind? {
        ValueKind::Bool | ValueKind::Int => Some(ValueKind::Int),
        ValueKind::Real => Some(ValueKind::Real),
        ValueKind::Enum(_) => None,
    }
}

/// Best-effort static kind of an expression; used to resolve the enum type
/// a switch scrutinizes. Assumes the expression already validates.
pub(crate) fn infer_kind(expr: &Expr, domain: &Domain) -> Option<ValueKind> {
    match expr {
        Expr::Literal(value) => Some(value.kind()),
        Expr::Var { schema, .. } => domain.schemas.get(*schema).map(|s| s.kind),
        Expr::Unary { op, expr } => match op {
            UnaryOp::Not => Some(ValueKind::Bool),
            UnaryOp::Neg | UnaryOp::Abs => numeric(infer_kind(expr, domain)),
        },
        Expr::Binary { op, left, right } => {
            use simforge_core::BinaryOp::*;
            match op {
                And | Or | Implies | Iff | Eq | Ne | Lt | Le | Gt | Ge => Some(ValueKind::Bool),
                Add | Sub | Mul | Div | Min | Max => {
                    let l = numeric(infer_kind(left, domain))?;
                    let r = numeric(infer_kind(right, domain))?;
                    if l == ValueKind::Real || r == ValueKind::Real {
                        Some(ValueKind::Real)
                    } else {
                        Some(ValueKind::Int)
                    }
                }
            }
        }
        Expr::Aggregate { op, body, .. } => {
            use simforge_core::Aggregator::*;
            match op {
                Forall | Exists => Some(ValueKind::Bool),
                Sum | Prod | Min | Max => numeric(infer_kind(body, domain)),
            }
        }
        Expr::If {
            then_expr,
            else_expr,
            ..
        } => infer_kind(then_expr, domain).or_else(|| infer_kind(else_expr, domain)),
        Expr::Switch { cases, .. } => cases
            .first()
            .and_then(|(_, case)| infer_kind(case, domain)),
        Expr::Random(dist) => match dist {
            Distribution::KronDelta(e) => infer_kind(e, domain),
            Distribution::DiracDelta(_) => Some(ValueKind::Real),
            Distribution::Bernoulli(_) => Some(ValueKind::Bool),
            Distribution::Discrete { enum_type, .. } => Some(ValueKind::Enum(*enum_type)),
            Distribution::Uniform(..) | Distribution::Normal { .. } => Some(ValueKind::Real),
        },
    }
}
