//! The trajectory driver: applies actions, runs one step of the evaluation
//! plan, accumulates discounted reward and enforces the horizon.

mod action;
mod trajectory;

pub use action::ActionAssignment;
pub use trajectory::{StepOutcome, Trajectory, TrajectoryOptions};
