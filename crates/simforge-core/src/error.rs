//! Error types for SimForge.
//!
//! Two tiers: [`BuildError`] is fatal and reported once before any
//! simulation; [`SimError`] surfaces per step. Constraint violations and
//! over-budget action assignments are recoverable signals, so the driver
//! returns them without poisoning the trajectory.

use thiserror::Error;

/// Fatal definition errors detected while grounding and stratifying a
/// domain + instance pair.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("duplicate definition: {0}")]
    DuplicateDefinition(String),

    #[error("unknown identifier: {0}")]
    UnknownIdentifier(String),

    #[error("mismatched domain reference: {0}")]
    MismatchedDomain(String),

    #[error("type mismatch in {context}: expected {expected}, found {found}")]
    TypeMismatch {
        context: String,
        expected: String,
        found: String,
    },

    #[error("variable `{0}` requires a default value")]
    MissingDefault(String),

    #[error("variable `{0}` must not declare a default value")]
    UnexpectedDefault(String),

    #[error("intermediate variable `{name}` declares level {level}; levels start at 1")]
    InvalidIntermLevel { name: String, level: u32 },

    #[error("variable `{0}` has no cpf")]
    MissingCpf(String),

    #[error("variable `{0}` must not have a cpf")]
    UnexpectedCpf(String),

    #[error("arity mismatch for `{name}`: expected {expected}, found {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("unbound parameter `{0}`")]
    UnboundParameter(String),

    #[error("undeclared ground variable: {0}")]
    UndeclaredGroundVariable(String),

    #[error("non-exhaustive switch in {0}")]
    NonExhaustiveSwitch(String),

    #[error("non-exhaustive Discrete in {0}")]
    NonExhaustiveDiscrete(String),

    #[error("cyclic dependency among: {0}")]
    CyclicDependency(String),

    #[error("level violation: {0}")]
    LevelViolation(String),

    #[error("requirement violation: {0}")]
    RequirementViolation(String),

    #[error("invalid instance: {0}")]
    InvalidInstance(String),
}

/// Per-step errors. Evaluation errors are definition bugs reachable only at
/// runtime and are fatal to the trajectory; action-validation errors leave
/// the trajectory live and the environment untouched.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("invalid distribution parameter: {0}")]
    InvalidDistributionParameter(String),

    #[error("unbound parameter `{0}` at evaluation")]
    UnboundParameter(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("aggregation over empty object domain: {0}")]
    EmptyAggregation(String),

    #[error("`{0}` is not an action variable")]
    NotAnAction(String),

    #[error("duplicate action assignment for `{0}`")]
    DuplicateAction(String),

    #[error("{count} non-default actions exceed the maximum of {max}")]
    TooManyConcurrentActions { count: usize, max: usize },

    #[error("trajectory already terminated")]
    TrajectoryTerminated,
}

pub type BuildResult<T> = std::result::Result<T, BuildError>;
pub type SimResult<T> = std::result::Result<T, SimError>;
