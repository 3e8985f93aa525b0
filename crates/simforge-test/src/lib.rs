//! Shared test fixtures for SimForge crates.
//!
//! These build domain/non-fluents/instance triples only; tests ground and
//! simulate them with `simforge-ground` and `simforge-rollout` themselves.

pub mod dice;
pub mod sysadmin;
