use crate::config::Config;
use crate::events::{self, EventRecord};
use crate::fitness::FitnessTable;
use crate::forcing;
use crate::history::{Recorder, YearSnapshot};
use crate::model::{Clock, Environment, Population, PopulationState, Season};
use crate::selection::{self, Reproduction};
use crate::variation::{self, Mutation};
use anyhow::{Context, Result, bail};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

/// Everything a season step reads and writes, apart from the random source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub population: Population,
    pub environment: Environment,
    pub clock: Clock,
}

impl State {
    /// Hardy-Weinberg population for the configured size and allele frequency,
    /// in the configured environment, at the start of the first spring.
    pub fn initial(cfg: &Config) -> Self {
        Self {
            population: Population::hardy_weinberg(
                cfg.init.population,
                cfg.init.dominant_allele_freq,
            ),
            environment: cfg.env,
            clock: Clock::new(),
        }
    }
}

/// What happened during one season.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonOutcome {
    pub season: Season,
    pub temperature: f64,
    pub fitness: FitnessTable,
    pub events: Vec<EventRecord>,
    pub reproduction: Reproduction,
    pub mutation: Option<Mutation>,
    pub drift_strength: Option<f64>,
    /// Individuals that could not be removed because a count would have gone negative.
    pub shortfall: u64,
    pub year_completed: bool,
}

/// Advance `state` by one season.
///
/// Forcing, events, selection and reproduction, mutation and drift are applied in
/// this order, drawing all randomness from `rng`. The state is only replaced once
/// the whole season has been computed.
pub fn step<R: Rng>(state: &mut State, cfg: &Config, rng: &mut R) -> Result<SeasonOutcome> {
    let mut next = *state;
    let season = next.clock.season();
    let year = next.clock.year_in_progress();

    let temperature = forcing::step(
        &mut next.environment,
        season,
        cfg.model.pollution_step,
        rng,
    )
    .context("failed to apply seasonal forcing")?;

    let event_outcome = events::trigger(
        &mut next.population,
        &mut next.environment,
        &cfg.model,
        year,
        season,
        rng,
    )
    .context("failed to trigger events")?;

    let fitness = FitnessTable::new(temperature, &next.environment);
    let reproduction = selection::select_and_reproduce(
        &mut next.population,
        &fitness,
        season,
        cfg.init.population,
    );

    let mutation = variation::mutate(
        &mut next.population,
        cfg.model.prob_mutation,
        cfg.model.mutation_rate,
        rng,
    )
    .context("failed to apply mutation")?;

    let drift = variation::drift(&mut next.population, rng).context("failed to apply drift")?;

    let year_completed = next.clock.advance();
    *state = next;

    Ok(SeasonOutcome {
        season,
        temperature,
        fitness,
        events: event_outcome.records,
        reproduction,
        mutation,
        drift_strength: drift.map(|drift| drift.strength),
        shortfall: event_outcome.shortfall + drift.map_or(0, |drift| drift.shortfall),
        year_completed,
    })
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalReason {
    /// The population died out.
    Extinction,
    /// The configured number of years was simulated.
    HorizonReached,
}

/// Simulation engine.
///
/// Holds the configuration, current state, history and random number generator,
/// and provides methods to step, run, save, and load simulations.
#[derive(Serialize, Deserialize)]
pub struct Engine {
    cfg: Config,
    seed: u64,
    state: State,
    recorder: Recorder,
    terminal: Option<TerminalReason>,
    n_clamped: u64,
    rng: ChaCha12Rng,
}

impl Engine {
    /// Create a new `Engine` at the initial condition described by `cfg`.
    ///
    /// Without a configured seed, one is drawn from the OS. That run can then only
    /// be reproduced through [`Engine::seed`].
    pub fn new(cfg: Config) -> Result<Self> {
        cfg.validate().context("failed to validate config")?;

        let seed = match cfg.init.seed {
            Some(seed) => seed,
            None => {
                let seed = rand::random();
                log::warn!("no seed configured, using {seed}");
                seed
            }
        };
        let rng = ChaCha12Rng::seed_from_u64(seed);
        let state = State::initial(&cfg);

        Ok(Self {
            cfg,
            seed,
            state,
            recorder: Recorder::new(),
            terminal: None,
            n_clamped: 0,
            rng,
        })
    }

    pub fn cfg(&self) -> &Config {
        &self.cfg
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Advance the simulation by one season.
    ///
    /// Does nothing once the run is terminal.
    pub fn step_season(&mut self) -> Result<()> {
        if self.terminal.is_some() {
            return Ok(());
        }

        let outcome = step(&mut self.state, &self.cfg, &mut self.rng)?;
        self.recorder.note_events(outcome.events);
        if outcome.shortfall > 0 {
            self.note_clamp(outcome.shortfall);
        }

        let extinct = self.state.population.is_extinct();
        if extinct && !outcome.year_completed {
            self.state.clock.close_year();
        }
        if outcome.year_completed || extinct {
            self.recorder.close_year(
                self.state.clock.year(),
                self.state.population,
                outcome.temperature,
                self.state.environment,
            );
        }

        if extinct {
            self.terminal = Some(TerminalReason::Extinction);
            log::info!("population extinct in year {}", self.state.clock.year());
        } else if self.state.clock.year() >= self.cfg.output.year_horizon {
            self.terminal = Some(TerminalReason::HorizonReached);
            log::info!("reached year horizon {}", self.cfg.output.year_horizon);
        }

        Ok(())
    }

    /// Simulate up to `n_years` more years, stopping early if the run terminates.
    pub fn run_years(&mut self, n_years: u32) -> Result<()> {
        let target = self.state.clock.year().saturating_add(n_years);
        while self.terminal.is_none() && self.state.clock.year() < target {
            self.step_season().context("failed to step season")?;
        }
        Ok(())
    }

    /// Simulate until extinction or the year horizon.
    pub fn run_to_horizon(&mut self) -> Result<TerminalReason> {
        loop {
            if let Some(reason) = self.terminal {
                return Ok(reason);
            }
            self.step_season().context("failed to step season")?;
        }
    }

    /// Simulate the next chunk of `years_per_file` years and save the snapshots it
    /// produced to a binary file.
    pub fn perform_simulation<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        let i_first = self.recorder.len();
        for _ in 0..self.cfg.output.years_per_file {
            if self.terminal.is_some() {
                break;
            }
            self.run_years(1).context("failed to run year")?;

            let horizon = self.cfg.output.year_horizon;
            let progress = 100.0 * self.state.clock.year() as f64 / horizon as f64;
            log::info!("completed {progress:06.2}%");
        }

        let chunk = &self.recorder.snapshots()[i_first..];
        encode::write(&mut writer, chunk).context("failed to serialize history")?;

        writer.flush().context("failed to flush writer stream")?;

        Ok(())
    }

    /// Save a checkpoint of the entire engine state.
    ///
    /// Can be used to resume the simulation later.
    pub fn save_checkpoint<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write(&mut writer, &self).context("failed to serialize engine")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }

    /// Load a previously saved engine checkpoint.
    pub fn load_checkpoint<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);
        let engine: Engine =
            decode::from_read(&mut reader).context("failed to deserialize engine")?;
        if engine.state.population.is_extinct() && engine.terminal.is_none() {
            bail!("checkpoint holds an extinct population that is not marked terminal");
        }
        Ok(engine)
    }

    pub fn current_population_state(&self) -> PopulationState {
        self.state.population.into()
    }

    pub fn current_environment_state(&self) -> &Environment {
        &self.state.environment
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn history(&self) -> &[YearSnapshot] {
        self.recorder.snapshots()
    }

    pub fn is_extinct(&self) -> bool {
        self.state.population.is_extinct()
    }

    /// Number of completed years.
    pub fn current_year(&self) -> u32 {
        self.state.clock.year()
    }

    pub fn current_season(&self) -> Season {
        self.state.clock.season()
    }

    pub fn terminal_reason(&self) -> Option<TerminalReason> {
        self.terminal
    }

    /// Number of times a genotype count had to be clamped at zero.
    pub fn n_clamped(&self) -> u64 {
        self.n_clamped
    }

    fn note_clamp(&mut self, shortfall: u64) {
        self.n_clamped += 1;
        let year = self.state.clock.year();
        if self.n_clamped == 1 {
            log::warn!("clamped negative genotype count in year {year} (shortfall {shortfall})");
        } else {
            log::error!(
                "clamped negative genotype count again in year {year} (shortfall {shortfall}, \
                 {} occurrences): loss arithmetic is inconsistent",
                self.n_clamped
            );
        }
    }
}
