//! SysAdmin fixture: a network of computers that crash and get rebooted.
//!
//! The classic benchmark for this family of description languages. A
//! computer stays up with a probability that grows with the fraction of its
//! upstream neighbors still running; a reboot action brings it up
//! deterministically; crashed computers occasionally reboot on their own.

use simforge_core::{
    Domain, Expr, Instance, NonFluents, ObjectTypeId, Requirements, SchemaId, Term, Value,
    ValueKind, VariableSchema,
};

/// The SysAdmin domain plus the ids tests need to build expressions and
/// action assignments.
pub struct SysAdminFixture {
    pub domain: Domain,
    pub computer: ObjectTypeId,
    pub connected: SchemaId,
    pub reboot_prob: SchemaId,
    pub running: SchemaId,
    pub reboot: SchemaId,
}

/// Builds the SysAdmin domain. Object constants come from the non-fluents
/// block, so the `computer` type starts empty.
pub fn sysadmin_domain() -> SysAdminFixture {
    let mut domain = Domain::new("sysadmin").with_requirements(
        Requirements::new()
            .with_continuous()
            .with_state_constraints()
            .with_concurrent_actions(),
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

    // Fraction of upstream neighbors still running, smoothed by +1 so
    // isolated computers stay well-behaved.
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

    domain.add_constraint(Expr::forall(
        "c",
        computer,
        Expr::or(
            Expr::var(running, vec![Term::param("c")]),
            Expr::not(Expr::var(running, vec![Term::param("c")])),
        ),
    ));

    domain.set_reward(Expr::sub(
        Expr::sum_over("c", computer, Expr::var(running, vec![Term::param("c")])),
        Expr::mul(
            Expr::real(0.75),
            Expr::sum_over("c", computer, Expr::var(reboot, vec![Term::param("c")])),
        ),
    ));

    SysAdminFixture {
        domain,
        computer,
        connected,
        reboot_prob,
        running,
        reboot,
    }
}

/// A ring of `n` computers: `CONNECTED(ci, c(i+1 mod n))`.
pub fn ring_non_fluents(n: usize) -> NonFluents {
    let mut nf = NonFluents::new(format!("ring{n}"), "sysadmin");
    nf.extend_objects("computer", (1..=n).map(|i| format!("c{i}")));
    for i in 1..=n {
        let next = i % n + 1;
        nf.set_value(
            "CONNECTED",
            [format!("c{i}"), format!("c{next}")],
            Value::Bool(true),
        );
    }
    nf
}

/// An instance over [`ring_non_fluents`]: `running(c1)` starts up,
/// `running(c2)` starts down, everything else takes the default.
pub fn ring_instance(n: usize, horizon: usize, discount: f64) -> Instance {
    let mut instance = Instance::new(format!("ring{n}_inst"), "sysadmin")
        .with_non_fluents(format!("ring{n}"))
        .with_horizon(horizon)
        .with_discount(discount);
    instance.set_init("running", ["c1"], Value::Bool(true));
    instance.set_init("running", ["c2"], Value::Bool(false));
    instance
}
