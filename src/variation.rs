use crate::model::{Genotype, Population};
use anyhow::Result;
use rand::prelude::*;
use rand_distr::{Bernoulli, Uniform};
use serde::{Deserialize, Serialize};

/// Populations smaller than this are not mutated.
pub const MUTATION_MIN_POPULATION: u64 = 100;

/// Individuals moved into the heterozygous bucket by one mutation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mutation {
    pub from: Genotype,
    pub n: u64,
}

/// With probability `prob`, move `max(1, round(rate * total))` individuals from a
/// randomly chosen homozygous bucket into the heterozygous one.
///
/// The channel only ever feeds heterozygotes: loss of homozygosity is the modeled
/// bias, there is no back-mutation. Nothing moves if the chosen bucket does not hold
/// more individuals than would be moved.
pub fn mutate<R: Rng>(
    pop: &mut Population,
    prob: f64,
    rate: f64,
    rng: &mut R,
) -> Result<Option<Mutation>> {
    let trigger = Bernoulli::new(prob)?;
    if !trigger.sample(rng) {
        return Ok(None);
    }

    let total = pop.total();
    if total < MUTATION_MIN_POPULATION {
        return Ok(None);
    }

    let n = ((rate * total as f64).round() as u64).max(1);
    let from = if rng.random_bool(0.5) {
        Genotype::HomozygousDominant
    } else {
        Genotype::HomozygousRecessive
    };
    if pop.count(from) <= n {
        return Ok(None);
    }

    pop.remove(from, n);
    pop.het += n;

    Ok(Some(Mutation { from, n }))
}

/// Drift strength for a population of `total` individuals, if drift applies.
pub fn drift_strength(total: u64) -> Option<f64> {
    match total {
        0..100 => Some(0.10),
        100..300 => Some(0.05),
        _ => None,
    }
}

/// Result of one drift step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drift {
    pub strength: f64,
    /// Individuals that could not be removed because a count would have gone negative.
    pub shortfall: u64,
}

/// Perturb each count by `trunc(count * strength * U(-1, 1))`, floored at zero.
///
/// Returns `None` if the population is large enough to be drift-free. The total is
/// not conserved: drift also models extra sampling loss.
pub fn drift<R: Rng>(pop: &mut Population, rng: &mut R) -> Result<Option<Drift>> {
    let Some(strength) = drift_strength(pop.total()) else {
        return Ok(None);
    };

    let noise = Uniform::new_inclusive(-1.0, 1.0)?;
    let mut shortfall = 0;
    for genotype in Genotype::ALL {
        let count = pop.count(genotype);
        let delta = (count as f64 * strength * noise.sample(rng)).trunc() as i64;
        if delta >= 0 {
            *pop.count_mut(genotype) += delta as u64;
        } else {
            shortfall += pop.remove(genotype, delta.unsigned_abs());
        }
    }

    Ok(Some(Drift {
        strength,
        shortfall,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha12Rng;

    #[test]
    fn mutation_feeds_heterozygotes() {
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        let mut pop = Population::new(400, 200, 400);
        let mutation = mutate(&mut pop, 1.0, 0.005, &mut rng).unwrap().unwrap();
        assert_eq!(mutation.n, 5);
        assert_ne!(mutation.from, Genotype::Heterozygous);
        assert_eq!(pop.het, 205);
        assert_eq!(pop.count(mutation.from), 395);
        assert_eq!(pop.total(), 1000);
    }

    #[test]
    fn mutation_moves_at_least_one() {
        let mut rng = ChaCha12Rng::seed_from_u64(4);
        let mut pop = Population::new(50, 20, 50);
        let mutation = mutate(&mut pop, 1.0, 0.005, &mut rng).unwrap().unwrap();
        assert_eq!(mutation.n, 1);
        assert_eq!(pop.het, 21);
    }

    #[test]
    fn mutation_needs_trigger_and_size() {
        let mut rng = ChaCha12Rng::seed_from_u64(5);
        let mut pop = Population::new(400, 200, 400);
        assert_eq!(mutate(&mut pop, 0.0, 0.005, &mut rng).unwrap(), None);

        let mut pop = Population::new(30, 30, 30);
        assert_eq!(mutate(&mut pop, 1.0, 0.005, &mut rng).unwrap(), None);
        assert_eq!(pop, Population::new(30, 30, 30));
    }

    #[test]
    fn mutation_never_removes_heterozygotes() {
        let mut rng = ChaCha12Rng::seed_from_u64(6);
        let mut pop = Population::new(300, 100, 300);
        for _ in 0..200 {
            let het = pop.het;
            mutate(&mut pop, 1.0, 0.005, &mut rng).unwrap();
            assert!(pop.het >= het);
            assert_eq!(pop.total(), 700);
        }
    }

    #[test]
    fn drift_thresholds() {
        assert_eq!(drift_strength(0), Some(0.10));
        assert_eq!(drift_strength(99), Some(0.10));
        assert_eq!(drift_strength(100), Some(0.05));
        assert_eq!(drift_strength(299), Some(0.05));
        assert_eq!(drift_strength(300), None);
    }

    #[test]
    fn small_populations_diverge() {
        let mut rng_a = ChaCha12Rng::seed_from_u64(1);
        let mut rng_b = ChaCha12Rng::seed_from_u64(2);
        let mut pop_a = Population::new(20, 40, 20);
        let mut pop_b = pop_a;
        for _ in 0..10 {
            drift(&mut pop_a, &mut rng_a).unwrap();
            drift(&mut pop_b, &mut rng_b).unwrap();
        }
        assert_ne!(pop_a, pop_b);
    }

    #[test]
    fn drift_reports_strength_and_shortfall() {
        let mut rng = ChaCha12Rng::seed_from_u64(5);
        let mut pop = Population::new(60, 120, 60);
        let outcome = drift(&mut pop, &mut rng).unwrap().unwrap();
        assert_eq!(outcome.strength, 0.05);
        assert_eq!(outcome.shortfall, 0);

        let mut empty = Population::default();
        let outcome = drift(&mut empty, &mut rng).unwrap().unwrap();
        assert_eq!(outcome.strength, 0.10);
        assert_eq!(outcome.shortfall, 0);
        assert!(empty.is_extinct());
    }

    #[test]
    fn large_populations_do_not_drift() {
        let mut rng_a = ChaCha12Rng::seed_from_u64(1);
        let mut rng_b = ChaCha12Rng::seed_from_u64(2);
        let mut pop_a = Population::new(360, 480, 160);
        let mut pop_b = pop_a;
        assert_eq!(drift(&mut pop_a, &mut rng_a).unwrap(), None);
        assert_eq!(drift(&mut pop_b, &mut rng_b).unwrap(), None);
        assert_eq!(pop_a, pop_b);
        assert_eq!(pop_a, Population::new(360, 480, 160));
    }

    #[test]
    fn drift_is_bounded_and_non_negative() {
        let mut rng = ChaCha12Rng::seed_from_u64(8);
        for _ in 0..500 {
            let before = Population::new(
                rng.random_range(0..100),
                rng.random_range(0..100),
                rng.random_range(0..100),
            );
            let strength = drift_strength(before.total()).unwrap_or(0.0);
            let mut after = before;
            let outcome = drift(&mut after, &mut rng).unwrap();
            assert_eq!(outcome.map_or(0, |d| d.shortfall), 0);
            for genotype in Genotype::ALL {
                let (b, a) = (before.count(genotype) as f64, after.count(genotype) as f64);
                assert!((a - b).abs() <= b * strength);
            }
        }
    }
}
