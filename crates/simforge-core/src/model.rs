//! Domain, non-fluents and instance definitions.
//!
//! These are the builder-style inputs to the build phase. Adds are
//! infallible; every check (duplicate names, layer/default rules, expression
//! well-formedness, requirements gating) happens in `simforge-ground`.

use std::sync::Arc;

use crate::expr::Expr;
use crate::schema::{SchemaId, SchemaTable, VariableSchema};
use crate::types::{EnumTypeId, ObjectTypeId, TypeRegistry};
use crate::value::Value;

/// Requirements flags gating validation of domain features.
///
/// The first seven gate use of the corresponding feature; the last two are
/// restrictions forbidding stochastic cpfs / stochastic reward when set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Requirements {
    pub continuous: bool,
    pub integer_valued: bool,
    pub multivalued: bool,
    pub intermediate_nodes: bool,
    pub partially_observed: bool,
    pub state_constraints: bool,
    pub concurrent_actions: bool,
    pub cpf_deterministic: bool,
    pub reward_deterministic: bool,
}

impl Requirements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_continuous(mut self) -> Self {
        self.continuous = true;
        self
    }

    pub fn with_integer_valued(mut self) -> Self {
        self.integer_valued = true;
        self
    }

    pub fn with_multivalued(mut self) -> Self {
        self.multivalued = true;
        self
    }

    pub fn with_intermediate_nodes(mut self) -> Self {
        self.intermediate_nodes = true;
        self
    }

    pub fn with_partially_observed(mut self) -> Self {
        self.partially_observed = true;
        self
    }

    pub fn with_state_constraints(mut self) -> Self {
        self.state_constraints = true;
        self
    }

    pub fn with_concurrent_actions(mut self) -> Self {
        self.concurrent_actions = true;
        self
    }

    pub fn with_cpf_deterministic(mut self) -> Self {
        self.cpf_deterministic = true;
        self
    }

    pub fn with_reward_deterministic(mut self) -> Self {
        self.reward_deterministic = true;
        self
    }
}

/// A conditional probability (or deterministic) function defining one
/// schema's value each step. `params` name the defining schema's arguments
/// and bind the body's free object placeholders.
#[derive(Debug, Clone)]
pub struct Cpf {
    pub params: Vec<Arc<str>>,
    pub body: Expr,
}

/// A relational planning domain: types, variable schemas, cpfs, constraints
/// and the reward expression.
#[derive(Debug, Clone)]
pub struct Domain {
    pub name: Arc<str>,
    pub requirements: Requirements,
    pub types: TypeRegistry,
    pub schemas: SchemaTable,
    cpfs: Vec<Option<Cpf>>,
    pub constraints: Vec<Expr>,
    pub reward: Option<Expr>,
}

impl Domain {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            requirements: Requirements::default(),
            types: TypeRegistry::new(),
            schemas: SchemaTable::new(),
            cpfs: Vec::new(),
            constraints: Vec::new(),
            reward: None,
        }
    }

    pub fn with_requirements(mut self, requirements: Requirements) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn add_object_type(
        &mut self,
        name: impl Into<Arc<str>>,
        objects: impl IntoIterator<Item = impl Into<Arc<str>>>,
    ) -> ObjectTypeId {
        self.types.add_object_type(name, objects)
    }

    pub fn add_enum_type(
        &mut self,
        name: impl Into<Arc<str>>,
        labels: impl IntoIterator<Item = impl Into<Arc<str>>>,
    ) -> EnumTypeId {
        self.types.add_enum_type(name, labels)
    }

    pub fn add_variable(&mut self, schema: VariableSchema) -> SchemaId {
        self.cpfs.push(None);
        self.schemas.add(schema)
    }

    /// Attaches the cpf defining `schema`. Parameter names bind the schema's
    /// arguments in order.
    pub fn set_cpf(
        &mut self,
        schema: SchemaId,
        params: impl IntoIterator<Item = impl Into<Arc<str>>>,
        body: Expr,
    ) {
        self.cpfs[schema.0] = Some(Cpf {
            params: params.into_iter().map(Into::into).collect(),
            body,
        });
    }

    pub fn add_constraint(&mut self, constraint: Expr) {
        self.constraints.push(constraint);
    }

    pub fn set_reward(&mut self, reward: Expr) {
        self.reward = Some(reward);
    }

    pub fn cpf(&self, schema: SchemaId) -> Option<&Cpf> {
        self.cpfs.get(schema.0).and_then(|c| c.as_ref())
    }
}

/// A sparse override of one ground variable's value, by name.
#[derive(Debug, Clone)]
pub struct ValueAssignment {
    pub variable: Arc<str>,
    pub args: Vec<Arc<str>>,
    pub value: Value,
}

/// A named non-fluents block: object-set extensions plus sparse non-fluent
/// value overrides, shared between instances of one domain.
#[derive(Debug, Clone)]
pub struct NonFluents {
    pub name: Arc<str>,
    pub domain: Arc<str>,
    pub objects: Vec<(Arc<str>, Vec<Arc<str>>)>,
    pub values: Vec<ValueAssignment>,
}

impl NonFluents {
    pub fn new(name: impl Into<Arc<str>>, domain: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            domain: domain.into(),
            objects: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn extend_objects(
        &mut self,
        object_type: impl Into<Arc<str>>,
        objects: impl IntoIterator<Item = impl Into<Arc<str>>>,
    ) {
        self.objects.push((
            object_type.into(),
            objects.into_iter().map(Into::into).collect(),
        ));
    }

    pub fn set_value(
        &mut self,
        variable: impl Into<Arc<str>>,
        args: impl IntoIterator<Item = impl Into<Arc<str>>>,
        value: Value,
    ) {
        self.values.push(ValueAssignment {
            variable: variable.into(),
            args: args.into_iter().map(Into::into).collect(),
            value,
        });
    }
}

/// A planning instance: optional object extensions, sparse initial-state
/// overrides, horizon, discount and the concurrent-action budget.
#[derive(Debug, Clone)]
pub struct Instance {
    pub name: Arc<str>,
    pub domain: Arc<str>,
    pub non_fluents: Option<Arc<str>>,
    pub objects: Vec<(Arc<str>, Vec<Arc<str>>)>,
    pub init_state: Vec<ValueAssignment>,
    pub max_nondef_actions: usize,
    pub horizon: usize,
    pub discount: f64,
}

impl Instance {
    pub fn new(name: impl Into<Arc<str>>, domain: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            domain: domain.into(),
            non_fluents: None,
            objects: Vec::new(),
            init_state: Vec::new(),
            max_nondef_actions: 1,
            horizon: 0,
            discount: 1.0,
        }
    }

    pub fn with_non_fluents(mut self, name: impl Into<Arc<str>>) -> Self {
        self.non_fluents = Some(name.into());
        self
    }

    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_discount(mut self, discount: f64) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_max_nondef_actions(mut self, max: usize) -> Self {
        self.max_nondef_actions = max;
        self
    }

    pub fn extend_objects(
        &mut self,
        object_type: impl Into<Arc<str>>,
        objects: impl IntoIterator<Item = impl Into<Arc<str>>>,
    ) {
        self.objects.push((
            object_type.into(),
            objects.into_iter().map(Into::into).collect(),
        ));
    }

    pub fn set_init(
        &mut self,
        variable: impl Into<Arc<str>>,
        args: impl IntoIterator<Item = impl Into<Arc<str>>>,
        value: Value,
    ) {
        self.init_state.push(ValueAssignment {
            variable: variable.into(),
            args: args.into_iter().map(Into::into).collect(),
            value,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Term;
    use crate::value::ValueKind;

    #[test]
    fn test_domain_builder() {
        let mut domain = Domain::new("sysadmin")
            .with_requirements(Requirements::new().with_state_constraints());
        let computer = domain.add_object_type("computer", Vec::<&str>::new());
        let running = domain.add_variable(VariableSchema::state(
            "running",
            vec![computer],
            ValueKind::Bool,
            Value::Bool(false),
        ));
        domain.set_cpf(
            running,
            ["x"],
            Expr::var(running, vec![Term::param("x")]),
        );
        assert!(domain.requirements.state_constraints);
        assert!(domain.cpf(running).is_some());
        assert_eq!(domain.cpf(running).unwrap().params.len(), 1);
    }

    #[test]
    fn test_instance_builder() {
        let mut instance = Instance::new("inst", "sysadmin")
            .with_non_fluents("ring8")
            .with_horizon(20)
            .with_discount(0.9)
            .with_max_nondef_actions(2);
        instance.set_init("running", ["c1"], Value::Bool(true));
        assert_eq!(instance.horizon, 20);
        assert_eq!(instance.max_nondef_actions, 2);
        assert_eq!(instance.init_state.len(), 1);
    }
}
