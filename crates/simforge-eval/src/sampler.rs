//! Primitive samplers behind the distribution catalog.
//!
//! Each sampler consumes a fixed number of uniform draws from the caller's
//! random source regardless of its parameters: Bernoulli, Discrete and
//! Uniform take one, Normal always takes two. Keeping the draw count fixed
//! makes a seeded trajectory replay the same outcome sequence even when
//! parameters change between steps.

use rand::Rng;
use simforge_core::{EnumTypeId, SimError, SimResult, Value};

/// One draw; true with probability `p`.
pub fn bernoulli<R: Rng + ?Sized>(p: f64, rng: &mut R) -> SimResult<bool> {
    if !p.is_finite() || !(0.0..=1.0).contains(&p) {
        return Err(SimError::InvalidDistributionParameter(format!(
            "Bernoulli probability {p} outside [0, 1]"
        )));
    }
    Ok(rng.random::<f64>() < p)
}

/// One draw; picks a label by walking the outcomes in declared order.
///
/// Probabilities must be non-negative and sum to 1 within `tolerance`; no
/// normalization is applied, an off-by-more-than-tolerance sum is an error.
pub fn discrete<R: Rng + ?Sized>(
    enum_type: EnumTypeId,
    outcomes: &[(usize, f64)],
    tolerance: f64,
    rng: &mut R,
) -> SimResult<Value> {
    let mut sum = 0.0;
    for &(label, p) in outcomes {
        if !p.is_finite() || p < 0.0 {
            return Err(SimError::InvalidDistributionParameter(format!(
                "Discrete probability {p} for label {label} is negative or not finite"
            )));
        }
        sum += p;
    }
    if (sum - 1.0).abs() > tolerance {
        return Err(SimError::InvalidDistributionParameter(format!(
            "Discrete probabilities sum to {sum}, expected 1 within {tolerance}"
        )));
    }
    let last = outcomes
        .last()
        .ok_or_else(|| {
            SimError::InvalidDistributionParameter("Discrete with no outcomes".into())
        })?
        .0;
    let draw = rng.random::<f64>();
    let mut cumulative = 0.0;
    for &(label, p) in outcomes {
        cumulative += p;
        if draw < cumulative {
            return Ok(Value::Enum(enum_type, label));
        }
    }
    // The draw fell into the tolerance slack past the final cumulative bound.
    Ok(Value::Enum(enum_type, last))
}

/// One draw, scaled into `[lo, hi)`.
pub fn uniform<R: Rng + ?Sized>(lo: f64, hi: f64, rng: &mut R) -> SimResult<f64> {
    if !lo.is_finite() || !hi.is_finite() || lo > hi {
        return Err(SimError::InvalidDistributionParameter(format!(
            "Uniform bounds [{lo}, {hi}] are not a finite, ordered interval"
        )));
    }
    Ok(lo + rng.random::<f64>() * (hi - lo))
}

/// Exactly two draws, combined by the Box-Muller transform.
///
/// Both draws are taken even when `std_dev` is zero so the draw sequence
/// stays aligned across parameterizations.
pub fn normal<R: Rng + ?Sized>(mean: f64, std_dev: f64, rng: &mut R) -> SimResult<f64> {
    if !mean.is_finite() || !std_dev.is_finite() || std_dev < 0.0 {
        return Err(SimError::InvalidDistributionParameter(format!(
            "Normal(mean = {mean}, std_dev = {std_dev}) requires finite mean and std_dev >= 0"
        )));
    }
    let u1 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2 = rng.random::<f64>();
    let radius = (-2.0 * u1.ln()).sqrt();
    Ok(mean + std_dev * radius * (std::f64::consts::TAU * u2).cos())
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn test_bernoulli_rejects_bad_probability() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(bernoulli(1.2, &mut rng).is_err());
        assert!(bernoulli(-0.1, &mut rng).is_err());
        assert!(bernoulli(f64::NAN, &mut rng).is_err());
    }

    #[test]
    fn test_bernoulli_frequency() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let trials = 100_000;
        let mut hits = 0usize;
        for _ in 0..trials {
            if bernoulli(0.3, &mut rng).unwrap() {
                hits += 1;
            }
        }
        let freq = hits as f64 / trials as f64;
        assert!((freq - 0.3).abs() < 0.01, "frequency {freq}");
    }

    #[test]
    fn test_discrete_frequency_and_order() {
        let et = EnumTypeId(0);
        let outcomes = [(0, 0.1), (1, 0.5), (2, 0.4)];
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let trials = 100_000;
        let mut counts = [0usize; 3];
        for _ in 0..trials {
            match discrete(et, &outcomes, 1e-6, &mut rng).unwrap() {
                Value::Enum(_, label) => counts[label] += 1,
                other => panic!("unexpected value {other:?}"),
            }
        }
        for (label, expected) in [(0usize, 0.1), (1, 0.5), (2, 0.4)] {
            let freq = counts[label] as f64 / trials as f64;
            assert!((freq - expected).abs() < 0.01, "label {label}: {freq}");
        }
    }

    #[test]
    fn test_discrete_rejects_bad_sum() {
        let et = EnumTypeId(0);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let err = discrete(et, &[(0, 0.6), (1, 0.43)], 1e-6, &mut rng);
        assert!(matches!(
            err,
            Err(SimError::InvalidDistributionParameter(_))
        ));
        // The same sum passes under a looser tolerance.
        assert!(discrete(et, &[(0, 0.6), (1, 0.43)], 0.05, &mut rng).is_ok());
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = ChaCha8Rng::seed_from_u64(42);
        let mut b = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..64 {
            assert_eq!(
                bernoulli(0.5, &mut a).unwrap(),
                bernoulli(0.5, &mut b).unwrap()
            );
            assert_eq!(
                normal(0.0, 1.0, &mut a).unwrap(),
                normal(0.0, 1.0, &mut b).unwrap()
            );
        }
    }

    #[test]
    fn test_discrete_replays_under_same_seed() {
        let et = EnumTypeId(0);
        let outcomes = [(0usize, 0.1), (1, 0.5), (2, 0.4)];
        let draw_labels = |seed: u64| -> Vec<Value> {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            (0..256)
                .map(|_| discrete(et, &outcomes, 1e-6, &mut rng).unwrap())
                .collect()
        };
        assert_eq!(draw_labels(42), draw_labels(42));
        assert_ne!(draw_labels(42), draw_labels(43));
    }

    #[test]
    fn test_normal_draws_two_even_when_degenerate() {
        let mut a = ChaCha8Rng::seed_from_u64(3);
        let mut b = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(normal(5.0, 0.0, &mut a).unwrap(), 5.0);
        // Consuming two draws manually leaves b aligned with a.
        let _ = b.random::<f64>();
        let _ = b.random::<f64>();
        assert_eq!(a.random::<f64>(), b.random::<f64>());
    }

    #[test]
    fn test_uniform_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..1000 {
            let x = uniform(-2.0, 3.0, &mut rng).unwrap();
            assert!((-2.0..3.0).contains(&x));
        }
        assert!(uniform(3.0, -2.0, &mut rng).is_err());
        // Degenerate interval is allowed.
        assert_eq!(uniform(1.5, 1.5, &mut rng).unwrap(), 1.5);
    }
}
