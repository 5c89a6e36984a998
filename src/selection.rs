use crate::fitness::FitnessTable;
use crate::model::{Genotype, Population, Season};
use serde::{Deserialize, Serialize};

/// Populations smaller than this do not reproduce.
pub const MIN_BREEDING_POPULATION: u64 = 10;
/// Smallest population produced by a reproduction.
pub const MIN_OFFSPRING: u64 = 50;
/// Largest population produced by a reproduction, relative to the initial one.
pub const MAX_OFFSPRING_FACTOR: f64 = 1.5;

/// What happened in the reproduction phase of a season.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Reproduction {
    /// Not a breeding season.
    OffSeason,
    /// Breeding season, but too few survivors.
    TooFew,
    /// The population was redrawn at allele frequency `p` with `total` individuals.
    Bred { p: f64, total: u64 },
}

/// Each count becomes `floor(count * fitness)`.
pub fn select(pop: &Population, fit: &FitnessTable) -> Population {
    let mut survivors = Population::default();
    for genotype in Genotype::ALL {
        let count = pop.count(genotype) as f64 * fit.get(genotype);
        *survivors.count_mut(genotype) = count.floor() as u64;
    }
    survivors
}

/// Size of the next generation, `round(total * multiplier)` kept within
/// `[MIN_OFFSPRING, floor(1.5 * initial)]`. The lower bound wins if the two conflict.
pub fn offspring_total(total: u64, multiplier: f64, initial: u64) -> u64 {
    let cap = (MAX_OFFSPRING_FACTOR * initial as f64).floor() as u64;
    let total = (total as f64 * multiplier).round() as u64;
    total.min(cap).max(MIN_OFFSPRING)
}

/// Redraw `pop` from Hardy-Weinberg proportions if `season` allows breeding.
pub fn reproduce(pop: &mut Population, season: Season, initial: u64) -> Reproduction {
    if !season.is_breeding() {
        return Reproduction::OffSeason;
    }
    let total = pop.total();
    if total < MIN_BREEDING_POPULATION {
        return Reproduction::TooFew;
    }
    let Some(freqs) = pop.allele_freqs() else {
        return Reproduction::TooFew;
    };

    let new_total = offspring_total(total, season.reproduction_multiplier(), initial);
    *pop = Population::hardy_weinberg(new_total, freqs.p);

    Reproduction::Bred {
        p: freqs.p,
        total: new_total,
    }
}

/// Apply selection, then reproduction.
///
/// Individuals are never tracked. In a breeding season the population is redrawn from
/// the Hardy-Weinberg distribution implied by the surviving allele frequency.
pub fn select_and_reproduce(
    pop: &mut Population,
    fit: &FitnessTable,
    season: Season,
    initial: u64,
) -> Reproduction {
    *pop = select(pop, fit);
    reproduce(pop, season, initial)
}
