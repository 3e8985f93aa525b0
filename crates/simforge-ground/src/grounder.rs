//! Grounding: expanding schemas over object domains and applying sparse
//! overrides.

use simforge_core::{
    BuildError, BuildResult, Domain, GroundLayout, Instance, Layer, NonFluents, TypeRegistry,
    Value, ValueAssignment,
};
use smallvec::SmallVec;
use tracing::debug;

/// Expands every schema over the Cartesian product of its parameter domains
/// and produces the initial value arena: schema defaults everywhere, then
/// the non-fluents block's overrides, then the instance's initial state.
pub(crate) fn ground(
    domain: &Domain,
    registry: &TypeRegistry,
    non_fluents: Option<&NonFluents>,
    instance: &Instance,
) -> BuildResult<(GroundLayout, Vec<Value>)> {
    let layout = GroundLayout::new(&domain.schemas, registry);

    let mut values = Vec::with_capacity(layout.total());
    for (id, schema) in domain.schemas.iter() {
        let fill = schema
            .default
            .unwrap_or_else(|| Value::zero_of(schema.kind));
        values.extend(std::iter::repeat(fill).take(layout.count(id)));
    }

    if let Some(nf) = non_fluents {
        for assignment in &nf.values {
            apply(domain, registry, &layout, &mut values, assignment, Layer::NonFluent)?;
        }
    }
    for assignment in &instance.init_state {
        apply(domain, registry, &layout, &mut values, assignment, Layer::State)?;
    }

    debug!(
        ground_vars = layout.total(),
        schemas = domain.schemas.len(),
        "grounding complete"
    );
    Ok((layout, values))
}

fn apply(
    domain: &Domain,
    registry: &TypeRegistry,
    layout: &GroundLayout,
    values: &mut [Value],
    assignment: &ValueAssignment,
    expected_layer: Layer,
) -> BuildResult<()> {
    let rendered = || {
        if assignment.args.is_empty() {
            assignment.variable.to_string()
        } else {
            format!(
                "{}({})",
                assignment.variable,
                assignment
                    .args
                    .iter()
                    .map(|a| a.as_ref())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        }
    };

    let id = domain
        .schemas
        .id(&assignment.variable)
        .ok_or_else(|| BuildError::UnknownIdentifier(format!("variable `{}`", assignment.variable)))?;
    let schema = domain.schemas.schema(id);
    if schema.layer != expected_layer {
        return Err(BuildError::UndeclaredGroundVariable(format!(
            "{} is a {} variable, not a {} override target",
            rendered(),
            schema.layer.name(),
            expected_layer.name()
        )));
    }
    if assignment.args.len() != schema.arity() {
        return Err(BuildError::UndeclaredGroundVariable(format!(
            "{} expects {} arguments",
            rendered(),
            schema.arity()
        )));
    }
    let mut args: SmallVec<[usize; 4]> = SmallVec::with_capacity(assignment.args.len());
    for (arg, &param_type) in assignment.args.iter().zip(&schema.params) {
        let index = registry
            .object_type(param_type)
            .object_index(arg)
            .ok_or_else(|| {
                BuildError::UndeclaredGroundVariable(format!(
                    "{}: `{arg}` is not an object of type `{}`",
                    rendered(),
                    registry.object_type(param_type).name
                ))
            })?;
        args.push(index);
    }
    if !assignment.value.matches(schema.kind) {
        return Err(BuildError::TypeMismatch {
            context: format!("override of {}", rendered()),
            expected: schema.kind.to_string(),
            found: assignment.value.kind().to_string(),
        });
    }
    let gv = layout
        .ground_var(id, &args)
        .ok_or_else(|| BuildError::UndeclaredGroundVariable(rendered()))?;
    values[gv.0] = assignment.value;
    Ok(())
}
