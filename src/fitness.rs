use crate::model::{Environment, Genotype};
use serde::{Deserialize, Serialize};

/// Lowest fitness any genotype can have.
pub const MIN_FITNESS: f64 = 0.2;

const COLD_LIMIT: f64 = 10.0;
const WARM_LIMIT: f64 = 20.0;
const THERMAL_BONUS: f64 = 1.1;
const HETEROZYGOTE_BONUS: f64 = 1.05;
const OPTIMAL_PH: f64 = 7.0;

/// Relative survival of `genotype` at `temperature` in `env`.
///
/// Dominant homozygotes are cold-adapted, recessive homozygotes warm-adapted, and
/// heterozygotes always carry a small advantage. Food, pollution and pH scale all
/// genotypes equally. The result is never below [`MIN_FITNESS`].
pub fn fitness(genotype: Genotype, temperature: f64, env: &Environment) -> f64 {
    let mut fit = 1.0;

    match genotype {
        Genotype::HomozygousDominant if temperature < COLD_LIMIT => fit *= THERMAL_BONUS,
        Genotype::HomozygousRecessive if temperature > WARM_LIMIT => fit *= THERMAL_BONUS,
        Genotype::Heterozygous => fit *= HETEROZYGOTE_BONUS,
        _ => {}
    }

    fit *= 0.6 + 0.4 * env.food_abundance;
    fit *= 1.0 - 0.2 * env.pollution;
    fit *= (1.0 - 0.1 * (env.ph - OPTIMAL_PH).abs()).max(0.5);

    fit.max(MIN_FITNESS)
}

/// Fitness of every genotype for one season.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitnessTable {
    pub dom: f64,
    pub het: f64,
    pub rec: f64,
}

impl FitnessTable {
    pub fn new(temperature: f64, env: &Environment) -> Self {
        Self {
            dom: fitness(Genotype::HomozygousDominant, temperature, env),
            het: fitness(Genotype::Heterozygous, temperature, env),
            rec: fitness(Genotype::HomozygousRecessive, temperature, env),
        }
    }

    pub fn get(&self, genotype: Genotype) -> f64 {
        match genotype {
            Genotype::HomozygousDominant => self.dom,
            Genotype::Heterozygous => self.het,
            Genotype::HomozygousRecessive => self.rec,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neutral_env() -> Environment {
        Environment {
            food_abundance: 1.0,
            pollution: 0.0,
            ph: 7.0,
            ..Environment::default()
        }
    }

    #[test]
    fn thermal_adaptation() {
        let env = neutral_env();
        let cold = FitnessTable::new(5.0, &env);
        assert!((cold.dom - 1.1).abs() < 1e-12);
        assert!((cold.het - 1.05).abs() < 1e-12);
        assert!((cold.rec - 1.0).abs() < 1e-12);

        let warm = FitnessTable::new(25.0, &env);
        assert!((warm.dom - 1.0).abs() < 1e-12);
        assert!((warm.rec - 1.1).abs() < 1e-12);

        let mild = FitnessTable::new(15.0, &env);
        assert_eq!(mild.dom, mild.rec);
    }

    #[test]
    fn food_and_pollution_scale_fitness() {
        let env = Environment {
            food_abundance: 0.5,
            pollution: 0.5,
            ..neutral_env()
        };
        let expected = 1.05 * (0.6 + 0.4 * 0.5) * (1.0 - 0.2 * 0.5);
        assert!((fitness(Genotype::Heterozygous, 15.0, &env) - expected).abs() < 1e-12);
    }

    #[test]
    fn fitness_is_floored() {
        let env = Environment {
            food_abundance: Environment::FOOD_MIN,
            pollution: 1.0,
            ph: 0.0,
            ..Environment::default()
        };
        for genotype in Genotype::ALL {
            for temp in [-20.0, 0.0, 15.0, 40.0] {
                assert!(fitness(genotype, temp, &env) >= MIN_FITNESS);
            }
        }
    }

    #[test]
    fn acidic_water_lowers_fitness() {
        let acidic = Environment {
            ph: 5.0,
            ..neutral_env()
        };
        let ratio = fitness(Genotype::Heterozygous, 15.0, &acidic)
            / fitness(Genotype::Heterozygous, 15.0, &neutral_env());
        assert!((ratio - 0.8).abs() < 1e-12);
    }
}
