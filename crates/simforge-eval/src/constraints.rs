use std::fmt;

use rand::Rng;

use simforge_core::{Environment, SimError, SimResult};

use crate::evaluator::{Bindings, Evaluator};

/// A state-action constraint that evaluated to false, identified by its
/// position in the domain's declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstraintViolation {
    pub index: usize,
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "constraint #{} violated", self.index)
    }
}

impl<'m> Evaluator<'m> {
    /// Evaluates every constraint in declaration order and reports the ones
    /// that do not hold. A non-boolean constraint value is an evaluation
    /// error, not a violation.
    pub fn check_constraints<R: Rng + ?Sized>(
        &self,
        env: &Environment,
        rng: &mut R,
    ) -> SimResult<Vec<ConstraintViolation>> {
        let mut violations = Vec::new();
        let mut bindings = Bindings::new();
        for (index, constraint) in self.model().domain().constraints.iter().enumerate() {
            let value = self.eval(constraint, env, &mut bindings, rng)?;
            let holds = value.as_bool().ok_or_else(|| {
                SimError::TypeMismatch(format!("constraint #{index} evaluated to {value}"))
            })?;
            if !holds {
                violations.push(ConstraintViolation { index });
            }
        }
        Ok(violations)
    }

    /// Evaluates the reward expression as a real. A model without a reward
    /// yields 0.
    pub fn eval_reward<R: Rng + ?Sized>(
        &self,
        env: &Environment,
        rng: &mut R,
    ) -> SimResult<f64> {
        let Some(reward) = self.model().domain().reward.as_ref() else {
            return Ok(0.0);
        };
        let mut bindings = Bindings::new();
        let value = self.eval(reward, env, &mut bindings, rng)?;
        value.to_real().ok_or_else(|| {
            SimError::TypeMismatch(format!("reward evaluated to non-numeric {value}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use simforge_core::{Expr, Term};
    use simforge_ground::build;
    use simforge_test::sysadmin;

    use super::*;

    #[test]
    fn test_tautological_constraint_holds() {
        let fx = sysadmin::sysadmin_domain();
        let model = build(
            fx.domain,
            Some(sysadmin::ring_non_fluents(8)),
            &sysadmin::ring_instance(8, 20, 0.9),
        )
        .unwrap();
        let env = model.initial_env();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let violations = Evaluator::new(&model)
            .check_constraints(&env, &mut rng)
            .unwrap();
        assert!(violations.is_empty());
    }

    #[test]
    fn test_violated_constraint_is_reported() {
        let mut fx = sysadmin::sysadmin_domain();
        let (computer, running) = (fx.computer, fx.running);
        // Demands every computer be up, which the ring instance violates.
        fx.domain.add_constraint(Expr::forall(
            "c",
            computer,
            Expr::var(running, vec![Term::param("c")]),
        ));
        let model = build(
            fx.domain,
            Some(sysadmin::ring_non_fluents(8)),
            &sysadmin::ring_instance(8, 20, 0.9),
        )
        .unwrap();
        let env = model.initial_env();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let violations = Evaluator::new(&model)
            .check_constraints(&env, &mut rng)
            .unwrap();
        assert_eq!(violations, vec![ConstraintViolation { index: 1 }]);
    }

    #[test]
    fn test_initial_reward() {
        let fx = sysadmin::sysadmin_domain();
        let model = build(
            fx.domain,
            Some(sysadmin::ring_non_fluents(8)),
            &sysadmin::ring_instance(8, 20, 0.9),
        )
        .unwrap();
        let env = model.initial_env();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        // One computer up, no reboots pending.
        let reward = Evaluator::new(&model).eval_reward(&env, &mut rng).unwrap();
        assert!((reward - 1.0).abs() < 1e-12);
    }
}
