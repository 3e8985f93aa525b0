//! Expression evaluation for SimForge.
//!
//! A typed tree interpreter over the grounded model: logical and arithmetic
//! operators with explicit coercion, object-indexed aggregation, lazy
//! conditionals, enum switches and the fixed distribution catalog. The
//! evaluator is pure apart from draws it takes from the caller's random
//! source; each distribution consumes a fixed number of draws so seeded
//! trajectories replay exactly.

mod constraints;
mod evaluator;
pub mod sampler;

pub use constraints::ConstraintViolation;
pub use evaluator::{Bindings, Evaluator};
