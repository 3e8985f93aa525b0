//! The immutable grounded model produced by the build phase.

use std::sync::Arc;

use simforge_core::{
    BuildError, BuildResult, Cpf, Domain, Environment, GroundLayout, GroundVarId, Instance,
    Layer, NonFluents, SchemaId, TypeRegistry, Value, VariableSchema,
};
use smallvec::SmallVec;
use tracing::info;

use crate::grounder;
use crate::stratify::{self, EvalPlan};
use crate::validate;

/// A fully validated, grounded and stratified domain + instance pair.
///
/// Immutable after build; share it across trajectories behind an `Arc` —
/// each trajectory owns its own environment and random source.
#[derive(Debug)]
pub struct GroundedModel {
    domain: Domain,
    registry: TypeRegistry,
    layout: Arc<GroundLayout>,
    initial: Vec<Value>,
    plan: EvalPlan,
    horizon: usize,
    discount: f64,
    max_nondef_actions: usize,
}

/// Builds a [`GroundedModel`] from a domain, an optional non-fluents block
/// and an instance.
pub fn build(
    domain: Domain,
    non_fluents: Option<NonFluents>,
    instance: &Instance,
) -> BuildResult<GroundedModel> {
    if let Some(nf) = &non_fluents {
        if nf.domain != domain.name {
            return Err(BuildError::MismatchedDomain(format!(
                "non-fluents `{}` references domain `{}`, expected `{}`",
                nf.name, nf.domain, domain.name
            )));
        }
        if let Some(expected) = &instance.non_fluents {
            if *expected != nf.name {
                return Err(BuildError::MismatchedDomain(format!(
                    "instance `{}` references non-fluents `{expected}`, got `{}`",
                    instance.name, nf.name
                )));
            }
        }
    } else if let Some(expected) = &instance.non_fluents {
        return Err(BuildError::MismatchedDomain(format!(
            "instance `{}` references non-fluents `{expected}` but none were supplied",
            instance.name
        )));
    }
    if instance.domain != domain.name {
        return Err(BuildError::MismatchedDomain(format!(
            "instance `{}` references domain `{}`, expected `{}`",
            instance.name, instance.domain, domain.name
        )));
    }
    if !(0.0..=1.0).contains(&instance.discount) || !instance.discount.is_finite() {
        return Err(BuildError::InvalidInstance(format!(
            "discount {} outside [0, 1]",
            instance.discount
        )));
    }

    let registry = validate::assemble_registry(&domain, non_fluents.as_ref(), instance)?;
    validate::validate_domain(&domain, &registry, instance)?;
    let (layout, initial) = grounder::ground(&domain, &registry, non_fluents.as_ref(), instance)?;
    let plan = stratify::stratify(&domain)?;

    info!(
        domain = %domain.name,
        instance = %instance.name,
        ground_vars = layout.total(),
        phases = plan.phase_count(),
        horizon = instance.horizon,
        "model built"
    );

    Ok(GroundedModel {
        domain,
        registry,
        layout: Arc::new(layout),
        initial,
        plan,
        horizon: instance.horizon,
        discount: instance.discount,
        max_nondef_actions: instance.max_nondef_actions,
    })
}

impl GroundedModel {
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn layout(&self) -> &GroundLayout {
        &self.layout
    }

    pub fn layout_arc(&self) -> Arc<GroundLayout> {
        self.layout.clone()
    }

    pub fn plan(&self) -> &EvalPlan {
        &self.plan
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn discount(&self) -> f64 {
        self.discount
    }

    pub fn max_nondef_actions(&self) -> usize {
        self.max_nondef_actions
    }

    pub fn schema_id(&self, name: &str) -> Option<SchemaId> {
        self.domain.schemas.id(name)
    }

    pub fn schema(&self, id: SchemaId) -> &VariableSchema {
        self.domain.schemas.schema(id)
    }

    pub fn cpf(&self, id: SchemaId) -> Option<&Cpf> {
        self.domain.cpf(id)
    }

    /// Resolves a variable name plus object names to its ground variable.
    pub fn ground_var(&self, name: &str, objects: &[&str]) -> Option<GroundVarId> {
        let id = self.domain.schemas.id(name)?;
        let schema = self.domain.schemas.schema(id);
        if objects.len() != schema.arity() {
            return None;
        }
        let mut args: SmallVec<[usize; 4]> = SmallVec::with_capacity(objects.len());
        for (object, &param_type) in objects.iter().zip(&schema.params) {
            args.push(self.registry.object_type(param_type).object_index(object)?);
        }
        self.layout.ground_var(id, &args)
    }

    /// Like [`ground_var`](Self::ground_var) but only resolves action
    /// variables.
    pub fn action_var(&self, name: &str, objects: &[&str]) -> Option<GroundVarId> {
        let id = self.domain.schemas.id(name)?;
        if self.domain.schemas.schema(id).layer != Layer::Action {
            return None;
        }
        self.ground_var(name, objects)
    }

    /// Renders a ground variable as `running(c1)`.
    pub fn display(&self, gv: GroundVarId) -> String {
        let (id, args) = self.layout.decode(gv);
        let schema = self.domain.schemas.schema(id);
        if args.is_empty() {
            return schema.name.to_string();
        }
        let objects: Vec<&str> = args
            .iter()
            .zip(&schema.params)
            .map(|(&arg, &ty)| self.registry.object_type(ty).objects[arg].as_ref())
            .collect();
        format!("{}({})", schema.name, objects.join(", "))
    }

    /// A fresh environment holding the grounded non-fluents and initial
    /// state.
    pub fn initial_env(&self) -> Environment {
        Environment::new(self.layout.clone(), self.initial.clone())
    }
}
