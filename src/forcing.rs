use crate::model::{Environment, Season};
use anyhow::Result;
use rand::prelude::*;
use rand_distr::Uniform;
use std::f64::consts::PI;

/// Weight of the previous food abundance in the seasonal smoothing.
const FOOD_MEMORY: f64 = 0.9;

/// Temperature of `season` for the current environment.
pub fn temperature(env: &Environment, season: Season) -> f64 {
    let angle = 2.0 * PI * season.index() as f64 / 4.0;
    env.temperature_mean + env.temperature_amplitude * angle.cos()
}

/// Advance the environment into `season` and return the season's temperature.
///
/// Food relaxes toward the seasonal target and pollution takes a uniform random
/// walk step of half-width `pollution_step`. Both stay within their bounds.
pub fn step<R: Rng>(
    env: &mut Environment,
    season: Season,
    pollution_step: f64,
    rng: &mut R,
) -> Result<f64> {
    let temp = temperature(env, season);

    let food = FOOD_MEMORY * env.food_abundance + (1.0 - FOOD_MEMORY) * season.food_target();
    env.set_food(food);

    let step_dist = Uniform::new_inclusive(-pollution_step, pollution_step)?;
    env.set_pollution(env.pollution + step_dist.sample(rng));

    Ok(temp)
}
