//! Machine-quality fixture: an enum-valued state variable driven by a
//! `Discrete` distribution, with a `switch`-based reward.

use simforge_core::{
    Domain, EnumTypeId, Expr, Instance, Requirements, SchemaId, Value, ValueKind,
    VariableSchema,
};

pub struct QualityFixture {
    pub domain: Domain,
    pub status: EnumTypeId,
    pub condition: SchemaId,
}

/// A machine whose condition each step is drawn from
/// `Discrete(status, poor: 0.1, good: 0.5, excellent: 0.4)` regardless of
/// the previous condition. Reward pays 1 for excellent, 0 otherwise.
pub fn quality_domain() -> QualityFixture {
    let mut domain = Domain::new("quality")
        .with_requirements(Requirements::new().with_multivalued());
    let status = domain.add_enum_type("status", ["poor", "good", "excellent"]);
    let condition = domain.add_variable(VariableSchema::state(
        "condition",
        vec![],
        ValueKind::Enum(status),
        Value::Enum(status, 0),
    ));
    domain.set_cpf(
        condition,
        Vec::<&str>::new(),
        Expr::discrete(
            status,
            vec![
                (0, Expr::real(0.1)),
                (1, Expr::real(0.5)),
                (2, Expr::real(0.4)),
            ],
        ),
    );
    domain.set_reward(Expr::switch(
        Expr::var(condition, vec![]),
        vec![
            (0, Expr::int(0)),
            (1, Expr::int(0)),
            (2, Expr::int(1)),
        ],
    ));
    QualityFixture {
        domain,
        status,
        condition,
    }
}

pub fn quality_instance(horizon: usize) -> Instance {
    Instance::new("quality_inst", "quality")
        .with_horizon(horizon)
        .with_discount(1.0)
}
