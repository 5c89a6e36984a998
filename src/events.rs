use crate::config::ModelConfig;
use crate::model::{Environment, Genotype, Population, Season};
use anyhow::Result;
use rand::prelude::*;
use rand_distr::{Bernoulli, Uniform};
use serde::{Deserialize, Serialize};
use std::fmt;

const DISEASE_LOSS: (f64, f64) = (0.2, 0.5);
const PREDATION_LOSS: (f64, f64) = (0.15, 0.35);
const CLIMATE_TEMPERATURE_SHIFT: (f64, f64) = (-1.0, 2.0);
const CLIMATE_POLLUTION_RISE: (f64, f64) = (0.02, 0.08);
const HABITAT_LOSS: (f64, f64) = (0.1, 0.3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Disease,
    Predation,
    ClimateShift,
    HabitatLoss,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::Disease,
        EventKind::Predation,
        EventKind::ClimateShift,
        EventKind::HabitatLoss,
    ];
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EventKind::Disease => "disease",
            EventKind::Predation => "predation",
            EventKind::ClimateShift => "climate shift",
            EventKind::HabitatLoss => "habitat loss",
        };
        f.write_str(label)
    }
}

/// A catastrophic event that fired.
///
/// `magnitude` is the loss fraction for disease, predation and habitat loss, and the
/// temperature-mean shift (°C) for a climate shift.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub year: u32,
    pub season: Season,
    pub kind: EventKind,
    pub magnitude: f64,
}

/// Relative predation pressure per genotype. Dominant (colored) individuals lack
/// camouflage and are taken more often.
pub fn predation_factor(genotype: Genotype) -> f64 {
    match genotype {
        Genotype::HomozygousDominant => 1.2,
        Genotype::Heterozygous => 1.0,
        Genotype::HomozygousRecessive => 0.8,
    }
}

/// Remove `trunc(count * loss)` individuals of every genotype.
///
/// Returns the total shortfall, which is zero for any loss in `[0, 1]`.
pub fn apply_uniform_loss(pop: &mut Population, loss: f64) -> u64 {
    Genotype::ALL
        .into_iter()
        .map(|genotype| {
            let n = (pop.count(genotype) as f64 * loss).trunc() as u64;
            pop.remove(genotype, n)
        })
        .sum()
}

/// Remove `trunc(count * loss * predation_factor)` individuals of every genotype.
pub fn apply_predation(pop: &mut Population, loss: f64) -> u64 {
    Genotype::ALL
        .into_iter()
        .map(|genotype| {
            let n = (pop.count(genotype) as f64 * loss * predation_factor(genotype)).trunc();
            pop.remove(genotype, n as u64)
        })
        .sum()
}

/// Outcome of one season's event trials.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EventOutcome {
    pub records: Vec<EventRecord>,
    /// Individuals that could not be removed because a count would have gone negative.
    pub shortfall: u64,
}

/// Run the independent per-season event trials in a fixed order and apply the
/// events that fire. Several events may fire in the same season.
pub fn trigger<R: Rng>(
    pop: &mut Population,
    env: &mut Environment,
    model: &ModelConfig,
    year: u32,
    season: Season,
    rng: &mut R,
) -> Result<EventOutcome> {
    let mut outcome = EventOutcome::default();
    let record = |kind: EventKind, magnitude: f64| {
        log::debug!("year {year} {season:?}: {kind} ({magnitude:.3})");
        EventRecord {
            year,
            season,
            kind,
            magnitude,
        }
    };

    if Bernoulli::new(model.prob_disease)?.sample(rng) {
        let loss = sample_range(DISEASE_LOSS, rng)?;
        outcome.shortfall += apply_uniform_loss(pop, loss);
        outcome.records.push(record(EventKind::Disease, loss));
    }

    if Bernoulli::new(model.prob_predation)?.sample(rng) {
        let loss = sample_range(PREDATION_LOSS, rng)?;
        outcome.shortfall += apply_predation(pop, loss);
        outcome.records.push(record(EventKind::Predation, loss));
    }

    if Bernoulli::new(model.prob_climate_shift)?.sample(rng) {
        let shift = sample_range(CLIMATE_TEMPERATURE_SHIFT, rng)?;
        let rise = sample_range(CLIMATE_POLLUTION_RISE, rng)?;
        env.temperature_mean += shift;
        env.set_pollution(env.pollution + rise);
        outcome.records.push(record(EventKind::ClimateShift, shift));
    }

    if Bernoulli::new(model.prob_habitat_loss)?.sample(rng) {
        let loss = sample_range(HABITAT_LOSS, rng)?;
        outcome.shortfall += apply_uniform_loss(pop, loss);
        env.set_food(env.food_abundance * (1.0 - loss));
        outcome.records.push(record(EventKind::HabitatLoss, loss));
    }

    Ok(outcome)
}

fn sample_range<R: Rng>((low, high): (f64, f64), rng: &mut R) -> Result<f64> {
    Ok(Uniform::new(low, high)?.sample(rng))
}
