use genodrift::engine::{self, State};
use genodrift::model::Population;
use genodrift::{Config, Engine, TerminalReason};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use std::{fs, path::PathBuf};

fn run(cfg: Config) -> Engine {
    let mut engine = Engine::new(cfg).expect("failed to construct engine");
    engine.run_to_horizon().expect("failed to run engine");
    engine
}

fn without_events(mut cfg: Config) -> Config {
    cfg.model.prob_disease = 0.0;
    cfg.model.prob_predation = 0.0;
    cfg.model.prob_climate_shift = 0.0;
    cfg.model.prob_habitat_loss = 0.0;
    cfg.model.prob_mutation = 0.0;
    cfg
}

#[test]
fn identical_seeds_give_identical_histories() {
    let mut cfg = Config::new(400, 0.6, 150).with_seed(2024);
    cfg.model.prob_habitat_loss = 0.02;

    let a = run(cfg.clone());
    let b = run(cfg);

    assert_eq!(a.history(), b.history());
    let bytes_a = rmp_serde::to_vec(a.history()).expect("failed to encode history");
    let bytes_b = rmp_serde::to_vec(b.history()).expect("failed to encode history");
    assert_eq!(bytes_a, bytes_b);
    assert_eq!(a.terminal_reason(), b.terminal_reason());
}

#[test]
fn resumed_checkpoint_matches_uninterrupted_run() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("checkpoint_round_trip");
    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");
    let checkpoint_file = test_dir.join("checkpoint.msgpack");

    let mut cfg = Config::new(250, 0.55, 40).with_seed(77);
    cfg.model.prob_disease = 0.05;
    cfg.model.prob_habitat_loss = 0.02;

    let whole = run(cfg.clone());

    let mut first = Engine::new(cfg).expect("failed to construct engine");
    first.run_years(13).expect("failed to run engine");
    first
        .save_checkpoint(&checkpoint_file)
        .expect("failed to save checkpoint");

    let mut resumed = Engine::load_checkpoint(&checkpoint_file).expect("failed to load checkpoint");
    assert_eq!(resumed.seed(), 77);
    assert_eq!(resumed.current_year(), first.current_year());
    assert_eq!(resumed.history(), first.history());
    resumed.run_to_horizon().expect("failed to run engine");

    assert_eq!(resumed.history(), whole.history());
    assert_eq!(resumed.terminal_reason(), whole.terminal_reason());
    assert_eq!(
        rmp_serde::to_vec(resumed.history()).expect("failed to encode history"),
        rmp_serde::to_vec(whole.history()).expect("failed to encode history")
    );

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn different_seeds_diverge() {
    let a = run(Config::new(400, 0.6, 50).with_seed(1));
    let b = run(Config::new(400, 0.6, 50).with_seed(2));
    assert_ne!(a.history(), b.history());
}

#[test]
fn snapshots_respect_invariants() {
    for seed in 0..8 {
        let mut cfg = Config::new(300, 0.5, 200).with_seed(seed);
        cfg.model.prob_disease = 0.1;
        cfg.model.prob_predation = 0.1;
        cfg.model.prob_climate_shift = 0.05;
        cfg.model.prob_habitat_loss = 0.05;
        let engine = run(cfg);

        assert!(!engine.history().is_empty());
        for (i_year, snapshot) in engine.history().iter().enumerate() {
            assert_eq!(snapshot.year as usize, i_year + 1);

            let pop = &snapshot.population;
            match pop.allele_freqs {
                Some(freqs) => {
                    assert!((0.0..=1.0).contains(&freqs.p));
                    assert!((0.0..=1.0).contains(&freqs.q));
                    assert!((freqs.p + freqs.q - 1.0).abs() < 1e-12);
                }
                None => assert_eq!(pop.counts.total(), 0),
            }

            let env = &snapshot.environment;
            assert!((0.2..=2.0).contains(&env.food_abundance));
            assert!((0.0..=1.0).contains(&env.pollution));

            for event in &snapshot.events {
                assert_eq!(event.year, snapshot.year);
            }
        }
        assert_eq!(engine.n_clamped(), 0);
    }
}

#[test]
fn extinction_is_final() {
    let mut cfg = without_events(Config::new(1, 0.6, 20).with_seed(7));
    cfg.env.pollution = 1.0;
    let mut engine = Engine::new(cfg).expect("failed to construct engine");

    let reason = engine.run_to_horizon().expect("failed to run engine");
    assert_eq!(reason, TerminalReason::Extinction);
    assert!(engine.is_extinct());

    let n_snapshots = engine.history().len();
    for _ in 0..12 {
        engine.step_season().expect("failed to step");
        assert!(engine.is_extinct());
        assert_eq!(engine.current_population_state().counts.total(), 0);
    }
    assert_eq!(engine.history().len(), n_snapshots);
    assert_eq!(engine.terminal_reason(), Some(TerminalReason::Extinction));
}

#[test]
fn horizon_is_reported() {
    let engine = run(Config::new(1000, 0.6, 25).with_seed(99));
    assert_eq!(engine.terminal_reason(), Some(TerminalReason::HorizonReached));
    assert_eq!(engine.current_year(), 25);
    assert_eq!(engine.history().len(), 25);
    assert!(!engine.is_extinct());
}

#[test]
fn small_population_drifts_large_does_not() {
    // Spring and summer breed, the third step (autumn) only selects and drifts.
    let three_seasons = |cfg: &Config, seed: u64, pop: Population| {
        let mut rng = ChaCha12Rng::seed_from_u64(seed);
        let mut state = State {
            population: pop,
            ..State::initial(cfg)
        };
        for _ in 0..2 {
            engine::step(&mut state, cfg, &mut rng).expect("failed to step");
        }
        let outcome = engine::step(&mut state, cfg, &mut rng).expect("failed to step");
        (state.population, outcome.drift_strength)
    };

    let mut cfg = without_events(Config::new(1000, 0.6, 10));
    cfg.model.pollution_step = 0.0;

    let small = Population::new(20, 40, 20);
    let runs: Vec<_> = (0..4).map(|seed| three_seasons(&cfg, seed, small)).collect();
    assert!(runs.iter().all(|(_, strength)| strength.is_some()));
    assert!(runs.iter().any(|(pop, _)| *pop != runs[0].0));

    let large = Population::new(360, 480, 160);
    let (pop_a, strength_a) = three_seasons(&cfg, 1, large);
    let (pop_b, strength_b) = three_seasons(&cfg, 2, large);
    assert_eq!(strength_a, None);
    assert_eq!(strength_b, None);
    assert_eq!(pop_a, pop_b);
}

#[test]
fn counts_never_go_negative_under_pressure() {
    let mut cfg = Config::new(60, 0.5, 100).with_seed(31);
    cfg.model.prob_disease = 0.5;
    cfg.model.prob_predation = 0.5;
    cfg.model.prob_habitat_loss = 0.2;
    let mut engine = Engine::new(cfg).expect("failed to construct engine");

    while engine.terminal_reason().is_none() {
        engine.step_season().expect("failed to step");
        let pop = engine.current_population_state();
        let n_alleles = 2 * pop.counts.dom + pop.counts.het;
        if let Some(freqs) = pop.allele_freqs {
            assert!((freqs.p - n_alleles as f64 / (2 * pop.counts.total()) as f64).abs() < 1e-12);
            assert!((freqs.p + freqs.q - 1.0).abs() < 1e-12);
        }
    }
    assert_eq!(engine.n_clamped(), 0);
}
