use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

use simforge_config::{ConstraintPolicy, SimulationConfig};
use simforge_core::{
    Environment, GroundVarId, Layer, SchemaId, SimError, SimResult, Value,
};
use simforge_eval::{Bindings, ConstraintViolation, Evaluator};
use simforge_ground::GroundedModel;

use crate::action::ActionAssignment;

/// Per-trajectory knobs, usually taken from a [`SimulationConfig`].
#[derive(Debug, Clone)]
pub struct TrajectoryOptions {
    /// Seed for the trajectory's random source; a fresh OS seed when absent.
    pub seed: Option<u64>,
    pub constraint_policy: ConstraintPolicy,
    pub probability_tolerance: f64,
}

impl Default for TrajectoryOptions {
    fn default() -> Self {
        Self {
            seed: None,
            constraint_policy: ConstraintPolicy::Record,
            probability_tolerance: 1e-6,
        }
    }
}

impl From<&SimulationConfig> for TrajectoryOptions {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            seed: config.random_seed,
            constraint_policy: config.constraint_policy,
            probability_tolerance: config.probability_tolerance,
        }
    }
}

/// What one step produced.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub reward: f64,
    /// Running discounted return including this step's reward.
    pub discounted_return: f64,
    /// Observation ground variables with their freshly sampled values, in
    /// enumeration order. Empty for fully observed domains.
    pub observations: Vec<(GroundVarId, Value)>,
    pub violations: Vec<ConstraintViolation>,
    /// Whether this step ended the trajectory (horizon reached, or a
    /// violation under [`ConstraintPolicy::Abort`]).
    pub terminated: bool,
}

/// One rollout through a grounded model.
///
/// Owns its environment and random source; the model is shared. Each call to
/// [`step`](Self::step) runs the full evaluation plan once: intermediates by
/// level, next-state, observations, then reward and constraints against the
/// pre-transition state and the chosen actions.
pub struct Trajectory {
    model: Arc<GroundedModel>,
    env: Environment,
    rng: ChaCha8Rng,
    t: usize,
    discounted_return: f64,
    terminated: bool,
    options: TrajectoryOptions,
}

impl Trajectory {
    pub fn new(model: Arc<GroundedModel>, options: TrajectoryOptions) -> Self {
        let env = model.initial_env();
        let rng = match options.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_os_rng(),
        };
        let terminated = model.horizon() == 0;
        Self {
            model,
            env,
            rng,
            t: 0,
            discounted_return: 0.0,
            terminated,
            options,
        }
    }

    /// Applies `actions` and advances one decision step.
    ///
    /// Action validation happens before any mutation, so a rejected action
    /// set leaves the trajectory untouched and live. An evaluation error
    /// mid-transition poisons the trajectory instead: the environment may
    /// hold a partial update, so it terminates.
    pub fn step(&mut self, actions: &ActionAssignment) -> SimResult<StepOutcome> {
        if self.terminated {
            return Err(SimError::TrajectoryTerminated);
        }
        let model = Arc::clone(&self.model);
        self.validate_actions(&model, actions)?;
        match self.advance(&model, actions) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.terminated = true;
                debug!(t = self.t, error = %err, "trajectory poisoned");
                Err(err)
            }
        }
    }

    fn validate_actions(
        &self,
        model: &GroundedModel,
        actions: &ActionAssignment,
    ) -> SimResult<()> {
        let mut seen: Vec<GroundVarId> = Vec::with_capacity(actions.len());
        let mut non_default = 0usize;
        for (gv, value) in actions.iter() {
            if gv.0 >= model.layout().total() {
                return Err(SimError::NotAnAction(format!("ground variable #{}", gv.0)));
            }
            let schema = model.schema(model.layout().schema_of(gv));
            if schema.layer != Layer::Action {
                return Err(SimError::NotAnAction(model.display(gv)));
            }
            if !value.matches(schema.kind) {
                return Err(SimError::TypeMismatch(format!(
                    "action `{}` takes {}, got {value}",
                    model.display(gv),
                    schema.kind
                )));
            }
            if seen.contains(&gv) {
                return Err(SimError::DuplicateAction(model.display(gv)));
            }
            seen.push(gv);
            if schema.default != Some(value) {
                non_default += 1;
            }
        }
        let max = model.max_nondef_actions();
        if non_default > max {
            return Err(SimError::TooManyConcurrentActions {
                count: non_default,
                max,
            });
        }
        Ok(())
    }

    fn advance(
        &mut self,
        model: &Arc<GroundedModel>,
        actions: &ActionAssignment,
    ) -> SimResult<StepOutcome> {
        for (gv, value) in actions.iter() {
            self.env.set(gv, value);
        }

        let evaluator =
            Evaluator::new(model).with_tolerance(self.options.probability_tolerance);
        let mut bindings = Bindings::new();

        // Intermediates level by level; within a level nothing reads the
        // level itself, so values land directly in the arena.
        for (_, schemas) in &model.plan().interm_levels {
            for &schema in schemas {
                for gv in model.layout().instances(schema) {
                    let value =
                        eval_cpf(&evaluator, model, schema, gv, &self.env, &mut bindings, &mut self.rng)?;
                    self.env.set(gv, value);
                }
            }
        }

        // Next-state values go into the primed buffer; the plan orders
        // schemas so every primed reference is already written when read.
        for &schema in &model.plan().next_state {
            for gv in model.layout().instances(schema) {
                let value =
                    eval_cpf(&evaluator, model, schema, gv, &self.env, &mut bindings, &mut self.rng)?;
                self.env.set_primed(gv, value);
            }
        }

        let mut observations = Vec::new();
        for &schema in &model.plan().observations {
            for gv in model.layout().instances(schema) {
                let value =
                    eval_cpf(&evaluator, model, schema, gv, &self.env, &mut bindings, &mut self.rng)?;
                self.env.set(gv, value);
                observations.push((gv, value));
            }
        }

        // Reward and constraints see the pre-transition state plus actions.
        let reward = evaluator.eval_reward(&self.env, &mut self.rng)?;
        let violations = evaluator.check_constraints(&self.env, &mut self.rng)?;

        self.discounted_return += model.discount().powi(self.t as i32) * reward;
        self.env.commit_step();
        for (id, schema) in model.domain().schemas.iter() {
            if schema.layer == Layer::Action {
                if let Some(default) = schema.default {
                    self.env.fill_schema(id, default);
                }
            }
        }
        self.t += 1;

        if self.t == model.horizon() {
            self.terminated = true;
        }
        if self.options.constraint_policy == ConstraintPolicy::Abort && !violations.is_empty() {
            self.terminated = true;
        }
        trace!(
            t = self.t,
            reward,
            violations = violations.len(),
            terminated = self.terminated,
            "step"
        );
        if self.terminated {
            debug!(
                t = self.t,
                discounted_return = self.discounted_return,
                "trajectory terminated"
            );
        }

        Ok(StepOutcome {
            reward,
            discounted_return: self.discounted_return,
            observations,
            violations,
            terminated: self.terminated,
        })
    }

    /// Rewinds to the initial state with a fresh random stream.
    pub fn reset(&mut self, seed: Option<u64>) {
        self.env = self.model.initial_env();
        self.rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_os_rng(),
        };
        self.t = 0;
        self.discounted_return = 0.0;
        self.terminated = self.model.horizon() == 0;
    }

    pub fn model(&self) -> &Arc<GroundedModel> {
        &self.model
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn t(&self) -> usize {
        self.t
    }

    pub fn horizon(&self) -> usize {
        self.model.horizon()
    }

    pub fn discounted_return(&self) -> f64 {
        self.discounted_return
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn value(&self, gv: GroundVarId) -> Value {
        self.env.value(gv)
    }

    /// The current values of every state ground variable, in enumeration
    /// order.
    pub fn state_snapshot(&self) -> Vec<(GroundVarId, Value)> {
        let mut snapshot = Vec::new();
        for (id, schema) in self.model.domain().schemas.iter() {
            if schema.layer == Layer::State {
                for gv in self.model.layout().instances(id) {
                    snapshot.push((gv, self.env.value(gv)));
                }
            }
        }
        snapshot
    }
}

fn eval_cpf<R: Rng + ?Sized>(
    evaluator: &Evaluator<'_>,
    model: &GroundedModel,
    schema: SchemaId,
    gv: GroundVarId,
    env: &Environment,
    bindings: &mut Bindings,
    rng: &mut R,
) -> SimResult<Value> {
    let def = model.schema(schema);
    let cpf = model
        .cpf(schema)
        .ok_or_else(|| SimError::TypeMismatch(format!("`{}` has no cpf", def.name)))?;
    let (_, args) = model.layout().decode(gv);
    bindings.clear();
    for (name, &index) in cpf.params.iter().zip(args.iter()) {
        bindings.push(name.clone(), index);
    }
    let value = evaluator.eval(&cpf.body, env, bindings, rng)?;
    if !value.matches(def.kind) {
        return Err(SimError::TypeMismatch(format!(
            "cpf for `{}` produced {value}, expected {}",
            def.name, def.kind
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use simforge_core::{Domain, Expr, Instance, Requirements, Term, ValueKind, VariableSchema};
    use simforge_ground::build;
    use simforge_test::{dice, sysadmin};

    use super::*;

    fn ring_trajectory(seed: u64) -> Trajectory {
        let fx = sysadmin::sysadmin_domain();
        let model = build(
            fx.domain,
            Some(sysadmin::ring_non_fluents(8)),
            &sysadmin::ring_instance(8, 20, 0.9),
        )
        .unwrap();
        Trajectory::new(
            Arc::new(model),
            TrajectoryOptions {
                seed: Some(seed),
                ..TrajectoryOptions::default()
            },
        )
    }

    #[test]
    fn test_concurrency_budget_is_enforced_before_mutation() {
        let mut trajectory = ring_trajectory(1);
        let model = Arc::clone(trajectory.model());
        let reboot_c1 = model.action_var("reboot", &["c1"]).unwrap();
        let reboot_c2 = model.action_var("reboot", &["c2"]).unwrap();
        let mut actions = ActionAssignment::new();
        actions.set(reboot_c1, Value::Bool(true));
        actions.set(reboot_c2, Value::Bool(true));

        let err = trajectory.step(&actions);
        assert!(matches!(
            err,
            Err(SimError::TooManyConcurrentActions { count: 2, max: 1 })
        ));
        // Nothing was written and the trajectory is still usable.
        assert_eq!(trajectory.value(reboot_c1), Value::Bool(false));
        assert_eq!(trajectory.t(), 0);
        assert!(trajectory.step(&ActionAssignment::new()).is_ok());
    }

    #[test]
    fn test_default_valued_actions_do_not_count() {
        let mut trajectory = ring_trajectory(1);
        let model = Arc::clone(trajectory.model());
        let reboot_c1 = model.action_var("reboot", &["c1"]).unwrap();
        let reboot_c2 = model.action_var("reboot", &["c2"]).unwrap();
        let mut actions = ActionAssignment::new();
        actions.set(reboot_c1, Value::Bool(true));
        // Explicitly passing the default stays within the budget of 1.
        actions.set(reboot_c2, Value::Bool(false));
        assert!(trajectory.step(&actions).is_ok());
    }

    #[test]
    fn test_non_action_and_duplicate_rejected() {
        let mut trajectory = ring_trajectory(1);
        let model = Arc::clone(trajectory.model());
        let running_c1 = model.ground_var("running", &["c1"]).unwrap();
        let mut actions = ActionAssignment::new();
        actions.set(running_c1, Value::Bool(true));
        assert!(matches!(
            trajectory.step(&actions),
            Err(SimError::NotAnAction(_))
        ));

        let reboot_c1 = model.action_var("reboot", &["c1"]).unwrap();
        let mut actions = ActionAssignment::new();
        actions.set(reboot_c1, Value::Bool(true));
        actions.set(reboot_c1, Value::Bool(true));
        assert!(matches!(
            trajectory.step(&actions),
            Err(SimError::DuplicateAction(_))
        ));

        let mut actions = ActionAssignment::new();
        actions.set(reboot_c1, Value::Int(1));
        assert!(matches!(
            trajectory.step(&actions),
            Err(SimError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_actions_reset_to_defaults_after_step() {
        let mut trajectory = ring_trajectory(1);
        let model = Arc::clone(trajectory.model());
        let reboot_c1 = model.action_var("reboot", &["c1"]).unwrap();
        let mut actions = ActionAssignment::new();
        actions.set(reboot_c1, Value::Bool(true));
        trajectory.step(&actions).unwrap();
        assert_eq!(trajectory.value(reboot_c1), Value::Bool(false));
        // A rebooted computer is up next step, deterministically.
        let running_c1 = model.ground_var("running", &["c1"]).unwrap();
        assert_eq!(trajectory.value(running_c1), Value::Bool(true));
    }

    #[test]
    fn test_horizon_terminates() {
        let fx = dice::quality_domain();
        let model = build(fx.domain, None, &dice::quality_instance(3)).unwrap();
        let mut trajectory = Trajectory::new(
            Arc::new(model),
            TrajectoryOptions {
                seed: Some(4),
                ..TrajectoryOptions::default()
            },
        );
        let actions = ActionAssignment::new();
        for step in 0..3 {
            let outcome = trajectory.step(&actions).unwrap();
            assert_eq!(outcome.terminated, step == 2);
        }
        assert!(trajectory.is_terminated());
        assert!(matches!(
            trajectory.step(&actions),
            Err(SimError::TrajectoryTerminated)
        ));
    }

    #[test]
    fn test_same_seed_same_trajectory() {
        let mut a = ring_trajectory(99);
        let mut b = ring_trajectory(99);
        let actions = ActionAssignment::new();
        for _ in 0..20 {
            let oa = a.step(&actions).unwrap();
            let ob = b.step(&actions).unwrap();
            assert_eq!(oa.reward, ob.reward);
            assert_eq!(a.env().values(), b.env().values());
        }
        assert_eq!(a.discounted_return(), b.discounted_return());
    }

    #[test]
    fn test_reset_replays_the_seed() {
        let mut trajectory = ring_trajectory(7);
        let actions = ActionAssignment::new();
        let mut first = Vec::new();
        for _ in 0..5 {
            first.push(trajectory.step(&actions).unwrap().reward);
        }
        trajectory.reset(Some(7));
        assert_eq!(trajectory.t(), 0);
        assert_eq!(trajectory.discounted_return(), 0.0);
        for reward in first {
            assert_eq!(trajectory.step(&actions).unwrap().reward, reward);
        }
    }

    #[test]
    fn test_abort_policy_terminates_on_violation() {
        let mut fx = sysadmin::sysadmin_domain();
        let (computer, running) = (fx.computer, fx.running);
        // The ring instance starts with computers down, so this fails at once.
        fx.domain.add_constraint(Expr::forall(
            "c",
            computer,
            Expr::var(running, vec![Term::param("c")]),
        ));
        let model = build(
            fx.domain,
            Some(sysadmin::ring_non_fluents(8)),
            &sysadmin::ring_instance(8, 20, 0.9),
        )
        .unwrap();
        let mut trajectory = Trajectory::new(
            Arc::new(model),
            TrajectoryOptions {
                seed: Some(1),
                constraint_policy: ConstraintPolicy::Abort,
                ..TrajectoryOptions::default()
            },
        );
        let outcome = trajectory.step(&ActionAssignment::new()).unwrap();
        assert!(!outcome.violations.is_empty());
        assert!(outcome.terminated);
        assert!(matches!(
            trajectory.step(&ActionAssignment::new()),
            Err(SimError::TrajectoryTerminated)
        ));
    }

    #[test]
    fn test_interm_and_observation_pipeline() {
        let mut domain = Domain::new("chain").with_requirements(
            Requirements::new()
                .with_integer_valued()
                .with_intermediate_nodes()
                .with_partially_observed(),
        );
        let count = domain.add_variable(VariableSchema::state(
            "count",
            vec![],
            ValueKind::Int,
            Value::Int(0),
        ));
        let doubled = domain.add_variable(VariableSchema::interm(
            "doubled",
            vec![],
            ValueKind::Int,
            1,
        ));
        let obs = domain.add_variable(VariableSchema::observation(
            "obs",
            vec![],
            ValueKind::Int,
        ));
        domain.set_cpf(
            count,
            Vec::<&str>::new(),
            Expr::kron_delta(Expr::add(Expr::var(count, vec![]), Expr::int(1))),
        );
        domain.set_cpf(
            doubled,
            Vec::<&str>::new(),
            Expr::mul(Expr::var(count, vec![]), Expr::int(2)),
        );
        // Observations may read intermediates and next-state values.
        domain.set_cpf(
            obs,
            Vec::<&str>::new(),
            Expr::add(Expr::var(doubled, vec![]), Expr::primed_var(count, vec![])),
        );
        domain.set_reward(Expr::var(count, vec![]));

        let model = build(
            domain,
            None,
            &Instance::new("chain_inst", "chain").with_horizon(3),
        )
        .unwrap();
        let obs_gv = model.ground_var("obs", &[]).unwrap();
        let mut trajectory = Trajectory::new(
            Arc::new(model),
            TrajectoryOptions {
                seed: Some(0),
                ..TrajectoryOptions::default()
            },
        );
        let actions = ActionAssignment::new();

        // Step 1: count 0, doubled 0, count' 1, obs 1, reward 0.
        let outcome = trajectory.step(&actions).unwrap();
        assert_eq!(outcome.observations, vec![(obs_gv, Value::Int(1))]);
        assert_eq!(outcome.reward, 0.0);
        // Step 2: count 1, doubled 2, count' 2, obs 4, reward 1.
        let outcome = trajectory.step(&actions).unwrap();
        assert_eq!(outcome.observations, vec![(obs_gv, Value::Int(4))]);
        assert_eq!(outcome.reward, 1.0);
        // Step 3 exhausts the horizon with reward 2, return 0 + 1 + 2.
        let outcome = trajectory.step(&actions).unwrap();
        assert!(outcome.terminated);
        assert_eq!(trajectory.discounted_return(), 3.0);
    }
}
