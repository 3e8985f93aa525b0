//! Variable schemas: one entry per parameterized variable.

use std::collections::HashMap;
use std::sync::Arc;

use crate::types::ObjectTypeId;
use crate::value::{Value, ValueKind};

/// Index of a variable schema in the schema table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(pub usize);

/// The evaluation layer a variable belongs to.
///
/// Non-fluents, state and actions are level 0 inputs to a step; intermediate
/// levels evaluate in ascending order; next-state values live in the primed
/// namespace of state schemas; observations are evaluated last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    NonFluent,
    State,
    Action,
    Interm { level: u32 },
    Observation,
}

impl Layer {
    /// Non-fluent, state and action variables carry a default; intermediate
    /// and observation variables are derived every step and must not.
    pub fn requires_default(&self) -> bool {
        matches!(self, Layer::NonFluent | Layer::State | Layer::Action)
    }

    /// Whether a conditional probability function defines this layer.
    pub fn has_cpf(&self) -> bool {
        matches!(self, Layer::State | Layer::Interm { .. } | Layer::Observation)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Layer::NonFluent => "non-fluent",
            Layer::State => "state",
            Layer::Action => "action",
            Layer::Interm { .. } => "interm",
            Layer::Observation => "observation",
        }
    }
}

/// A parameterized variable declaration.
#[derive(Debug, Clone)]
pub struct VariableSchema {
    pub name: Arc<str>,
    pub params: Vec<ObjectTypeId>,
    pub kind: ValueKind,
    pub layer: Layer,
    pub default: Option<Value>,
}

impl VariableSchema {
    pub fn non_fluent(
        name: impl Into<Arc<str>>,
        params: Vec<ObjectTypeId>,
        kind: ValueKind,
        default: Value,
    ) -> Self {
        Self {
            name: name.into(),
            params,
            kind,
            layer: Layer::NonFluent,
            default: Some(default),
        }
    }

    pub fn state(
        name: impl Into<Arc<str>>,
        params: Vec<ObjectTypeId>,
        kind: ValueKind,
        default: Value,
    ) -> Self {
        Self {
            name: name.into(),
            params,
            kind,
            layer: Layer::State,
            default: Some(default),
        }
    }

    pub fn action(
        name: impl Into<Arc<str>>,
        params: Vec<ObjectTypeId>,
        kind: ValueKind,
        default: Value,
    ) -> Self {
        Self {
            name: name.into(),
            params,
            kind,
            layer: Layer::Action,
            default: Some(default),
        }
    }

    pub fn interm(
        name: impl Into<Arc<str>>,
        params: Vec<ObjectTypeId>,
        kind: ValueKind,
        level: u32,
    ) -> Self {
        Self {
            name: name.into(),
            params,
            kind,
            layer: Layer::Interm { level },
            default: None,
        }
    }

    pub fn observation(
        name: impl Into<Arc<str>>,
        params: Vec<ObjectTypeId>,
        kind: ValueKind,
    ) -> Self {
        Self {
            name: name.into(),
            params,
            kind,
            layer: Layer::Observation,
            default: None,
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Table of variable schemas with name lookup.
#[derive(Debug, Clone, Default)]
pub struct SchemaTable {
    schemas: Vec<VariableSchema>,
    indices: HashMap<Arc<str>, usize>,
}

impl SchemaTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, schema: VariableSchema) -> SchemaId {
        let idx = self.schemas.len();
        self.indices.insert(schema.name.clone(), idx);
        self.schemas.push(schema);
        SchemaId(idx)
    }

    pub fn id(&self, name: &str) -> Option<SchemaId> {
        self.indices.get(name).copied().map(SchemaId)
    }

    pub fn schema(&self, id: SchemaId) -> &VariableSchema {
        &self.schemas[id.0]
    }

    pub fn get(&self, id: SchemaId) -> Option<&VariableSchema> {
        self.schemas.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SchemaId, &VariableSchema)> {
        self.schemas
            .iter()
            .enumerate()
            .map(|(i, s)| (SchemaId(i), s))
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_rules() {
        assert!(Layer::State.requires_default());
        assert!(!Layer::Observation.requires_default());
        assert!(Layer::Interm { level: 1 }.has_cpf());
        assert!(!Layer::Action.has_cpf());
    }

    #[test]
    fn test_schema_table_lookup() {
        let mut table = SchemaTable::new();
        let running = table.add(VariableSchema::state(
            "running",
            vec![ObjectTypeId(0)],
            ValueKind::Bool,
            Value::Bool(false),
        ));
        assert_eq!(table.id("running"), Some(running));
        assert_eq!(table.schema(running).arity(), 1);
        assert_eq!(table.schema(running).layer, Layer::State);
    }
}
