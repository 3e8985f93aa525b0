//! Core model types for SimForge.
//!
//! SimForge simulates relational probabilistic planning domains: a domain
//! declares object types, enumerated types, parameterized variables layered
//! into non-fluents, state, actions, intermediates and observations, plus
//! conditional probability functions, constraints and a reward expression.
//! This crate holds the data model those domains are written in; grounding,
//! stratification and simulation live in `simforge-ground`, `simforge-eval`
//! and `simforge-rollout`.

pub mod env;
pub mod error;
pub mod expr;
pub mod ground;
pub mod model;
pub mod schema;
pub mod types;
pub mod value;

pub use env::Environment;
pub use error::{BuildError, BuildResult, SimError, SimResult};
pub use expr::{Aggregator, BinaryOp, Distribution, Expr, Term, UnaryOp};
pub use ground::{GroundLayout, GroundVarId};
pub use model::{Cpf, Domain, Instance, NonFluents, Requirements, ValueAssignment};
pub use schema::{Layer, SchemaId, SchemaTable, VariableSchema};
pub use types::{EnumTypeDef, EnumTypeId, ObjectTypeDef, ObjectTypeId, TypeRegistry};
pub use value::{Value, ValueKind};
