//! SysAdmin Example
//!
//! A network of computers that crash at random and can be rebooted one at a
//! time. Each computer stays up with a probability that grows with the
//! fraction of its upstream neighbors still running; a reboot brings it up
//! deterministically but costs part of the reward.
//!
//! This example demonstrates how to model and simulate a domain with
//! SimForge: declare the schemas and cpfs, ground against an instance, then
//! roll out trajectories under a simple reactive policy.

use std::sync::Arc;

use rand::prelude::IndexedRandom;
use simforge::prelude::*;
use simforge::{GroundVarId, GroundedModel};

/// Builds the SysAdmin domain: two non-fluents, one state schema, one
/// action schema and a reward trading uptime against reboot cost.
fn sysadmin_domain() -> Domain {
    let mut domain = Domain::new("sysadmin").with_requirements(
        Requirements::new()
            .with_continuous()
            .with_state_constraints(),
    );
    let computer = domain.add_object_type("computer", Vec::<&str>::new());

    let connected = domain.add_variable(VariableSchema::non_fluent(
        "CONNECTED",
        vec![computer, computer],
        ValueKind::Bool,
        Value::Bool(false),
    ));
    let reboot_prob = domain.add_variable(VariableSchema::non_fluent(
        "REBOOT-PROB",
        vec![],
        ValueKind::Real,
        Value::Real(0.05),
    ));
    let running = domain.add_variable(VariableSchema::state(
        "running",
        vec![computer],
        ValueKind::Bool,
        Value::Bool(false),
    ));
    let reboot = domain.add_variable(VariableSchema::action(
        "reboot",
        vec![computer],
        ValueKind::Bool,
        Value::Bool(false),
    ));

    // P(running'(x)) = 0.45 + 0.5 * (1 + #up neighbors) / (1 + #neighbors)
    let up_neighbors = Expr::sum_over(
        "y",
        computer,
        Expr::and(
            Expr::var(connected, vec![Term::param("y"), Term::param("x")]),
            Expr::var(running, vec![Term::param("y")]),
        ),
    );
    let neighbors = Expr::sum_over(
        "y",
        computer,
        Expr::var(connected, vec![Term::param("y"), Term::param("x")]),
    );
    let keep_running = Expr::add(
        Expr::real(0.45),
        Expr::mul(
            Expr::real(0.5),
            Expr::div(
                Expr::add(Expr::real(1.0), up_neighbors),
                Expr::add(Expr::real(1.0), neighbors),
            ),
        ),
    );
    domain.set_cpf(
        running,
        ["x"],
        Expr::if_then_else(
            Expr::var(reboot, vec![Term::param("x")]),
            Expr::kron_delta(Expr::bool(true)),
            Expr::if_then_else(
                Expr::var(running, vec![Term::param("x")]),
                Expr::bernoulli(keep_running),
                Expr::bernoulli(Expr::var(reboot_prob, vec![])),
            ),
        ),
    );

    // reward = #running - 0.75 * #reboots
    domain.set_reward(Expr::sub(
        Expr::sum_over("c", computer, Expr::var(running, vec![Term::param("c")])),
        Expr::mul(
            Expr::real(0.75),
            Expr::sum_over("c", computer, Expr::var(reboot, vec![Term::param("c")])),
        ),
    ));

    domain
}

/// A star topology: every computer feeds the hub, the hub feeds everyone.
fn star_instance(n: usize) -> (NonFluents, Instance) {
    let mut nf = NonFluents::new("star", "sysadmin");
    nf.extend_objects("computer", (1..=n).map(|i| format!("c{i}")));
    for i in 2..=n {
        nf.set_value("CONNECTED", [format!("c{i}"), "c1".to_string()], Value::Bool(true));
        nf.set_value("CONNECTED", ["c1".to_string(), format!("c{i}")], Value::Bool(true));
    }

    let mut instance = Instance::new("star_inst", "sysadmin")
        .with_non_fluents("star")
        .with_horizon(40)
        .with_discount(0.95);
    for i in 1..=n {
        let name = format!("c{i}");
        instance.set_init("running", [name], Value::Bool(true));
    }
    (nf, instance)
}

/// Reboots one crashed computer picked at random, or does nothing when the
/// whole network is up.
fn reactive_policy(
    model: &GroundedModel,
    trajectory: &Trajectory,
    down: &mut Vec<(GroundVarId, GroundVarId)>,
    rng: &mut impl rand::Rng,
) -> ActionAssignment {
    down.clear();
    let running = model.schema_id("running").expect("running is declared");
    let reboot = model.schema_id("reboot").expect("reboot is declared");
    for (state_gv, action_gv) in model
        .layout()
        .instances(running)
        .zip(model.layout().instances(reboot))
    {
        if trajectory.value(state_gv) == Value::Bool(false) {
            down.push((state_gv, action_gv));
        }
    }
    let mut actions = ActionAssignment::new();
    if let Some(&(_, action_gv)) = down.choose(rng) {
        actions.set(action_gv, Value::Bool(true));
    }
    actions
}

fn count_running(model: &GroundedModel, trajectory: &Trajectory) -> usize {
    let running = model.schema_id("running").expect("running is declared");
    model
        .layout()
        .instances(running)
        .filter(|&gv| trajectory.value(gv) == Value::Bool(true))
        .count()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("SimForge SysAdmin Example");
    println!("=========================\n");

    let n = 10;
    let (nf, instance) = star_instance(n);
    let model = Arc::new(build(sysadmin_domain(), Some(nf), &instance).expect("valid domain"));
    println!(
        "Grounded {} variables over {} computers, horizon {}.\n",
        model.layout().total(),
        n,
        model.horizon()
    );

    let mut rng = rand::rng();
    for seed in [1u64, 2, 3] {
        let mut trajectory = Trajectory::new(
            Arc::clone(&model),
            TrajectoryOptions {
                seed: Some(seed),
                ..TrajectoryOptions::default()
            },
        );
        let mut down = Vec::new();
        while !trajectory.is_terminated() {
            let actions = reactive_policy(&model, &trajectory, &mut down, &mut rng);
            let outcome = trajectory.step(&actions).expect("step");
            if trajectory.t() % 10 == 0 || outcome.terminated {
                println!(
                    "  seed {seed} t={:>2}: reward {:>6.2}, {} of {} computers up",
                    trajectory.t(),
                    outcome.reward,
                    count_running(&model, &trajectory),
                    n
                );
            }
        }
        println!(
            "seed {seed}: discounted return {:.3}\n",
            trajectory.discounted_return()
        );
    }
}
