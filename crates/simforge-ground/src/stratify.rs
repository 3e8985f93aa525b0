//! Dependency stratification.
//!
//! Builds a schema-level dependency graph from the `reads` walk of every
//! cpf and orders the derived layers: intermediate levels ascending, then
//! next-state in topological order over primed-to-primed references, then
//! observations. The resulting plan is reused verbatim every step.

use std::collections::{BTreeMap, HashSet};

use simforge_core::{BuildError, BuildResult, Domain, Layer, SchemaId};
use tracing::debug;

/// The ordered per-step evaluation plan.
///
/// Within a phase, schemas appear in declaration order; ground instances of
/// a schema evaluate in argument-tuple enumeration order.
#[derive(Debug, Clone)]
pub struct EvalPlan {
    /// Intermediate levels, ascending, with the schemas of each level.
    pub interm_levels: Vec<(u32, Vec<SchemaId>)>,
    /// State schemas in an order where every primed reference is evaluated
    /// before its reader.
    pub next_state: Vec<SchemaId>,
    pub observations: Vec<SchemaId>,
}

impl EvalPlan {
    /// Number of evaluation phases in one step.
    pub fn phase_count(&self) -> usize {
        self.interm_levels.len() + 2
    }
}

pub(crate) fn stratify(domain: &Domain) -> BuildResult<EvalPlan> {
    let reads_of = |id: SchemaId| -> HashSet<(SchemaId, bool)> {
        let mut out = HashSet::new();
        if let Some(cpf) = domain.cpf(id) {
            cpf.body.reads(&mut out);
        }
        out
    };

    // Intermediate levels: level L may read level 0 (non-fluent/state/action)
    // and intermediates strictly below L.
    let mut levels: BTreeMap<u32, Vec<SchemaId>> = BTreeMap::new();
    for (id, schema) in domain.schemas.iter() {
        let Layer::Interm { level } = schema.layer else {
            continue;
        };
        for (read, primed) in reads_of(id) {
            let read_schema = domain.schemas.schema(read);
            if primed {
                return Err(BuildError::LevelViolation(format!(
                    "intermediate `{}` reads primed `{}`",
                    schema.name, read_schema.name
                )));
            }
            match read_schema.layer {
                Layer::NonFluent | Layer::State | Layer::Action => {}
                Layer::Interm { level: read_level } if read_level < level => {}
                _ => {
                    return Err(BuildError::LevelViolation(format!(
                        "intermediate `{}` (level {level}) reads `{}` ({})",
                        schema.name,
                        read_schema.name,
                        read_schema.layer.name()
                    )));
                }
            }
        }
        levels.entry(level).or_default().push(id);
    }

    // Next-state: primed-to-primed references are legal when acyclic; Kahn's
    // algorithm in declaration-order rounds keeps the order deterministic.
    let states: Vec<SchemaId> = domain
        .schemas
        .iter()
        .filter(|(_, s)| s.layer == Layer::State)
        .map(|(id, _)| id)
        .collect();
    let mut in_degree: BTreeMap<SchemaId, usize> =
        states.iter().map(|&id| (id, 0)).collect();
    let mut consumers: BTreeMap<SchemaId, Vec<SchemaId>> = BTreeMap::new();
    for &id in &states {
        for (read, primed) in reads_of(id) {
            if primed {
                consumers.entry(read).or_default().push(id);
                if let Some(degree) = in_degree.get_mut(&id) {
                    *degree += 1;
                }
            } else if domain.schemas.schema(read).layer == Layer::Observation {
                // Observations evaluate after next-state, so an unprimed
                // read here would see the previous step's value.
                return Err(BuildError::LevelViolation(format!(
                    "state `{}` reads observation `{}`",
                    domain.schemas.schema(id).name,
                    domain.schemas.schema(read).name
                )));
            }
        }
    }
    let mut next_state = Vec::with_capacity(states.len());
    let mut done: HashSet<SchemaId> = HashSet::new();
    loop {
        let ready: Vec<SchemaId> = states
            .iter()
            .copied()
            .filter(|id| !done.contains(id) && in_degree[id] == 0)
            .collect();
        if ready.is_empty() {
            break;
        }
        for id in ready {
            done.insert(id);
            next_state.push(id);
            if let Some(readers) = consumers.get(&id) {
                for reader in readers.clone() {
                    if let Some(degree) = in_degree.get_mut(&reader) {
                        *degree -= 1;
                    }
                }
            }
        }
    }
    if next_state.len() != states.len() {
        let remaining: Vec<&str> = states
            .iter()
            .filter(|id| !done.contains(id))
            .map(|&id| domain.schemas.schema(id).name.as_ref())
            .collect();
        return Err(BuildError::CyclicDependency(remaining.join(", ")));
    }

    // Observations read anything below plus primed state, never each other.
    let mut observations = Vec::new();
    for (id, schema) in domain.schemas.iter() {
        if schema.layer != Layer::Observation {
            continue;
        }
        for (read, _) in reads_of(id) {
            let read_schema = domain.schemas.schema(read);
            if read_schema.layer == Layer::Observation {
                return Err(BuildError::LevelViolation(format!(
                    "observation `{}` reads observation `{}`",
                    schema.name, read_schema.name
                )));
            }
        }
        observations.push(id);
    }

    let plan = EvalPlan {
        interm_levels: levels.into_iter().collect(),
        next_state,
        observations,
    };
    debug!(
        interm_levels = plan.interm_levels.len(),
        next_state = plan.next_state.len(),
        observations = plan.observations.len(),
        "stratification complete"
    );
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use simforge_core::{Expr, Requirements, Term, Value, ValueKind, VariableSchema};

    fn chain_domain() -> Domain {
        let mut domain = Domain::new("chain").with_requirements(
            Requirements::new()
                .with_intermediate_nodes()
                .with_partially_observed(),
        );
        let load = domain.add_variable(VariableSchema::state(
            "load",
            vec![],
            ValueKind::Bool,
            Value::Bool(false),
        ));
        let level2 = domain.add_variable(VariableSchema::interm(
            "pressure",
            vec![],
            ValueKind::Bool,
            2,
        ));
        let level1 = domain.add_variable(VariableSchema::interm(
            "stress",
            vec![],
            ValueKind::Bool,
            1,
        ));
        let alarm = domain.add_variable(VariableSchema::observation(
            "alarm",
            vec![],
            ValueKind::Bool,
        ));
        domain.set_cpf(level1, Vec::<&str>::new(), Expr::var(load, vec![]));
        domain.set_cpf(level2, Vec::<&str>::new(), Expr::var(level1, vec![]));
        domain.set_cpf(load, Vec::<&str>::new(), Expr::var(level2, vec![]));
        domain.set_cpf(alarm, Vec::<&str>::new(), Expr::primed_var(load, vec![]));
        domain
    }

    #[test]
    fn test_interm_levels_ascend() {
        let domain = chain_domain();
        let plan = stratify(&domain).unwrap();
        let levels: Vec<u32> = plan.interm_levels.iter().map(|(l, _)| *l).collect();
        assert_eq!(levels, vec![1, 2]);
        let level1 = &plan.interm_levels[0].1;
        assert_eq!(level1, &vec![domain.schemas.id("stress").unwrap()]);
        assert_eq!(plan.observations.len(), 1);
    }

    #[test]
    fn test_level_violation_reading_same_level() {
        let mut domain = chain_domain();
        let level1 = domain.schemas.id("stress").unwrap();
        let level2 = domain.schemas.id("pressure").unwrap();
        // level 1 reading level 2 inverts the stratification
        domain.set_cpf(level1, Vec::<&str>::new(), Expr::var(level2, vec![]));
        assert!(matches!(
            stratify(&domain),
            Err(BuildError::LevelViolation(_))
        ));
    }

    #[test]
    fn test_primed_chain_orders_producers_first() {
        let mut domain = Domain::new("primed");
        let a = domain.add_variable(VariableSchema::state(
            "a",
            vec![],
            ValueKind::Bool,
            Value::Bool(false),
        ));
        let b = domain.add_variable(VariableSchema::state(
            "b",
            vec![],
            ValueKind::Bool,
            Value::Bool(false),
        ));
        // b' reads a', so a must be evaluated first despite declaration order
        domain.set_cpf(b, Vec::<&str>::new(), Expr::primed_var(a, vec![]));
        domain.set_cpf(a, Vec::<&str>::new(), Expr::not(Expr::var(a, vec![])));
        let plan = stratify(&domain).unwrap();
        assert_eq!(plan.next_state, vec![a, b]);
    }

    #[test]
    fn test_primed_cycle_is_fatal() {
        let mut domain = Domain::new("cycle");
        let a = domain.add_variable(VariableSchema::state(
            "a",
            vec![],
            ValueKind::Bool,
            Value::Bool(false),
        ));
        let b = domain.add_variable(VariableSchema::state(
            "b",
            vec![],
            ValueKind::Bool,
            Value::Bool(false),
        ));
        domain.set_cpf(a, Vec::<&str>::new(), Expr::primed_var(b, vec![]));
        domain.set_cpf(b, Vec::<&str>::new(), Expr::primed_var(a, vec![]));
        assert!(matches!(
            stratify(&domain),
            Err(BuildError::CyclicDependency(_))
        ));
    }

    #[test]
    fn test_state_reading_observation_rejected() {
        let mut domain = Domain::new("feedback").with_requirements(
            Requirements::new().with_partially_observed(),
        );
        let s = domain.add_variable(VariableSchema::state(
            "s",
            vec![],
            ValueKind::Bool,
            Value::Bool(false),
        ));
        let o = domain.add_variable(VariableSchema::observation("o", vec![], ValueKind::Bool));
        domain.set_cpf(s, Vec::<&str>::new(), Expr::var(o, vec![]));
        domain.set_cpf(o, Vec::<&str>::new(), Expr::primed_var(s, vec![]));
        assert!(matches!(
            stratify(&domain),
            Err(BuildError::LevelViolation(_))
        ));
    }

    #[test]
    fn test_observation_reading_observation_rejected() {
        let mut domain = Domain::new("obs").with_requirements(
            Requirements::new().with_partially_observed(),
        );
        let s = domain.add_variable(VariableSchema::state(
            "s",
            vec![],
            ValueKind::Bool,
            Value::Bool(false),
        ));
        let o1 = domain.add_variable(VariableSchema::observation("o1", vec![], ValueKind::Bool));
        let o2 = domain.add_variable(VariableSchema::observation("o2", vec![], ValueKind::Bool));
        domain.set_cpf(s, Vec::<&str>::new(), Expr::var(s, vec![]));
        domain.set_cpf(o1, Vec::<&str>::new(), Expr::var(s, vec![]));
        domain.set_cpf(o2, Vec::<&str>::new(), Expr::var(o1, vec![]));
        assert!(matches!(
            stratify(&domain),
            Err(BuildError::LevelViolation(_))
        ));
    }

    #[test]
    fn test_parameterized_reads_use_terms() {
        let mut domain = Domain::new("params");
        let c = domain.add_object_type("computer", ["c1", "c2"]);
        let running = domain.add_variable(VariableSchema::state(
            "running",
            vec![c],
            ValueKind::Bool,
            Value::Bool(false),
        ));
        domain.set_cpf(
            running,
            ["x"],
            Expr::var(running, vec![Term::param("x")]),
        );
        let plan = stratify(&domain).unwrap();
        assert_eq!(plan.next_state, vec![running]);
        assert!(plan.interm_levels.is_empty());
    }
}
