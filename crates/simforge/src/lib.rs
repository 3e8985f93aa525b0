//! SimForge - grounded simulation of relational probabilistic planning
//! domains.
//!
//! Describe a domain with typed, parameterized variables and conditional
//! probability functions, pair it with an instance, and [`build`] grounds,
//! validates and stratifies it into an immutable [`GroundedModel`]. A
//! [`Trajectory`] then simulates it step by step.
//!
//! # Example
//!
//! ```rust
//! use simforge::prelude::*;
//!
//! let mut domain = Domain::new("coin");
//! let heads = domain.add_variable(VariableSchema::state(
//!     "heads",
//!     vec![],
//!     ValueKind::Bool,
//!     Value::Bool(false),
//! ));
//! domain.set_cpf(heads, Vec::<&str>::new(), Expr::bernoulli(Expr::real(0.5)));
//!
//! let instance = Instance::new("flip", "coin").with_horizon(10);
//! let model = build(domain, None, &instance).unwrap();
//! let mut trajectory = Trajectory::new(
//!     model.into(),
//!     TrajectoryOptions { seed: Some(0), ..Default::default() },
//! );
//! let outcome = trajectory.step(&ActionAssignment::new()).unwrap();
//! assert!(!outcome.terminated);
//! ```

// Definition model
pub use simforge_core::{
    Aggregator, BinaryOp, Cpf, Distribution, Domain, EnumTypeDef, EnumTypeId, Expr, Instance,
    Layer, NonFluents, ObjectTypeDef, ObjectTypeId, Requirements, SchemaId, SchemaTable, Term,
    TypeRegistry, UnaryOp, ValueAssignment, Value, ValueKind, VariableSchema,
};

// Runtime values and errors
pub use simforge_core::{
    BuildError, BuildResult, Environment, GroundLayout, GroundVarId, SimError, SimResult,
};

// Build phase
pub use simforge_ground::{build, EvalPlan, GroundedModel};

// Evaluation
pub use simforge_eval::{Bindings, ConstraintViolation, Evaluator};

// Simulation driver
pub use simforge_rollout::{ActionAssignment, StepOutcome, Trajectory, TrajectoryOptions};

// Configuration
pub use simforge_config::{ConfigError, ConstraintPolicy, SimulationConfig};

pub mod prelude {
    pub use super::{build, Domain, Expr, Instance, NonFluents, Requirements, Term};
    pub use super::{Value, ValueKind, VariableSchema};
    pub use super::{ActionAssignment, StepOutcome, Trajectory, TrajectoryOptions};
    pub use super::{ConstraintPolicy, SimulationConfig};
}
