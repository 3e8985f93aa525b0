//! Per-trajectory value environment.

use std::sync::Arc;

use crate::ground::{GroundLayout, GroundVarId};
use crate::schema::SchemaId;
use crate::value::Value;

/// The mutable assignment of one timestep: a flat current-value arena plus a
/// compact primed buffer holding next-state values until they are committed.
///
/// Created once per trajectory from the grounded initial assignment and
/// mutated in place every step; the layout it indexes through is shared and
/// immutable.
#[derive(Debug, Clone)]
pub struct Environment {
    layout: Arc<GroundLayout>,
    values: Vec<Value>,
    primed: Vec<Value>,
}

impl Environment {
    pub fn new(layout: Arc<GroundLayout>, values: Vec<Value>) -> Self {
        debug_assert_eq!(values.len(), layout.total());
        let mut primed = Vec::with_capacity(layout.primed_len());
        for (base, count, _) in layout.state_blocks() {
            primed.extend_from_slice(&values[base..base + count]);
        }
        Self {
            layout,
            values,
            primed,
        }
    }

    pub fn value(&self, gv: GroundVarId) -> Value {
        self.values[gv.0]
    }

    pub fn set(&mut self, gv: GroundVarId, value: Value) {
        self.values[gv.0] = value;
    }

    /// The next-state value of a state ground variable; `None` for other
    /// layers.
    pub fn primed_value(&self, gv: GroundVarId) -> Option<Value> {
        self.layout.primed_index(gv).map(|i| self.primed[i])
    }

    pub fn set_primed(&mut self, gv: GroundVarId, value: Value) {
        if let Some(i) = self.layout.primed_index(gv) {
            self.primed[i] = value;
        }
    }

    /// Replaces current state with the primed next-state values.
    pub fn commit_step(&mut self) {
        for (base, count, off) in self.layout.state_blocks() {
            self.values[base..base + count].copy_from_slice(&self.primed[off..off + count]);
        }
    }

    /// Overwrites every ground instance of a schema with one value.
    pub fn fill_schema(&mut self, schema: SchemaId, value: Value) {
        let (base, count) = self.layout.block(schema);
        self.values[base..base + count].fill(value);
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn layout(&self) -> &GroundLayout {
        &self.layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SchemaTable, VariableSchema};
    use crate::types::TypeRegistry;
    use crate::value::ValueKind;

    fn small_env() -> (Environment, SchemaId, SchemaId) {
        let mut registry = TypeRegistry::new();
        let c = registry.add_object_type("computer", ["c1", "c2"]);
        let mut schemas = SchemaTable::new();
        let running = schemas.add(VariableSchema::state(
            "running",
            vec![c],
            ValueKind::Bool,
            Value::Bool(false),
        ));
        let reboot = schemas.add(VariableSchema::action(
            "reboot",
            vec![c],
            ValueKind::Bool,
            Value::Bool(false),
        ));
        let layout = Arc::new(GroundLayout::new(&schemas, &registry));
        let values = vec![Value::Bool(false); layout.total()];
        (Environment::new(layout, values), running, reboot)
    }

    #[test]
    fn test_commit_step_moves_primed_into_state() {
        let (mut env, running, _) = small_env();
        let gv = env.layout().ground_var(running, &[1]).unwrap();
        env.set_primed(gv, Value::Bool(true));
        assert_eq!(env.value(gv), Value::Bool(false));
        env.commit_step();
        assert_eq!(env.value(gv), Value::Bool(true));
    }

    #[test]
    fn test_primed_rejected_for_non_state() {
        let (mut env, _, reboot) = small_env();
        let gv = env.layout().ground_var(reboot, &[0]).unwrap();
        assert_eq!(env.primed_value(gv), None);
        env.set_primed(gv, Value::Bool(true));
        assert_eq!(env.value(gv), Value::Bool(false));
    }

    #[test]
    fn test_fill_schema() {
        let (mut env, _, reboot) = small_env();
        let gv0 = env.layout().ground_var(reboot, &[0]).unwrap();
        let gv1 = env.layout().ground_var(reboot, &[1]).unwrap();
        env.set(gv0, Value::Bool(true));
        env.fill_schema(reboot, Value::Bool(false));
        assert_eq!(env.value(gv0), Value::Bool(false));
        assert_eq!(env.value(gv1), Value::Bool(false));
    }
}
