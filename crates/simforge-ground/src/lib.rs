//! Build phase for SimForge.
//!
//! [`build`] turns a domain + non-fluents + instance triple into an
//! immutable [`GroundedModel`]: it assembles the type registry, validates
//! schemas and expressions against the declared requirements, expands every
//! parameterized variable over its object domains, and stratifies the
//! schema-level dependency graph into the per-step evaluation plan. All
//! errors here are fatal and reported before any simulation starts.

mod grounder;
mod model;
mod stratify;
mod validate;

pub use model::{build, GroundedModel};
pub use stratify::EvalPlan;
