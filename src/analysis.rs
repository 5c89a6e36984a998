use crate::engine::TerminalReason;
use crate::events::EventKind;
use crate::history::YearSnapshot;
use crate::stats::{AccumulatorReport, Summary, TimeSeries, TimeSeriesReport};
use anyhow::{Context, Result};
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCount {
    pub kind: EventKind,
    pub n: usize,
}

/// Summary of one run's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub n_years: usize,
    pub terminal: Option<TerminalReason>,

    pub first_p: Option<f64>,
    pub last_p: Option<f64>,
    pub p_change: Option<f64>,

    pub first_total: u64,
    pub last_total: u64,
    /// Relative population change between the first and last snapshot (%).
    pub total_change_pct: f64,

    pub n_events: usize,
    pub events_per_year: f64,
    pub event_counts: Vec<EventCount>,

    pub dom_allele_freq: AccumulatorReport,
    pub heterozygosity: AccumulatorReport,
    pub temperature: AccumulatorReport,
    pub food_abundance: AccumulatorReport,
    pub pollution: AccumulatorReport,
    pub total: TimeSeriesReport,
}

/// Accumulates yearly snapshots of one run.
pub struct Analyzer {
    first: Option<YearSnapshot>,
    last: Option<YearSnapshot>,
    n_years: usize,
    event_counts: Vec<EventCount>,
    dom_allele_freq: Summary,
    heterozygosity: Summary,
    temperature: Summary,
    food_abundance: Summary,
    pollution: Summary,
    total: TimeSeries,
}

impl Analyzer {
    pub fn new() -> Self {
        Self {
            first: None,
            last: None,
            n_years: 0,
            event_counts: EventKind::ALL
                .into_iter()
                .map(|kind| EventCount { kind, n: 0 })
                .collect(),
            dom_allele_freq: Summary::new(),
            heterozygosity: Summary::new(),
            temperature: Summary::new(),
            food_abundance: Summary::new(),
            pollution: Summary::new(),
            total: TimeSeries::new(),
        }
    }

    pub fn add_snapshot(&mut self, snapshot: &YearSnapshot) {
        self.n_years += 1;
        if self.first.is_none() {
            self.first = Some(snapshot.clone());
        }
        self.last = Some(snapshot.clone());

        for event in &snapshot.events {
            if let Some(count) = self.event_counts.iter_mut().find(|c| c.kind == event.kind) {
                count.n += 1;
            }
        }

        let pop = &snapshot.population;
        if let Some(freqs) = pop.allele_freqs {
            self.dom_allele_freq.add(freqs.p);
        }
        if let Some(freqs) = pop.genotype_freqs {
            self.heterozygosity.add(freqs.het);
        }
        self.temperature.add(snapshot.temperature);
        self.food_abundance.add(snapshot.environment.food_abundance);
        self.pollution.add(snapshot.environment.pollution);
        self.total.push(pop.counts.total() as f64);
    }

    /// Add every snapshot of a history file written by the engine.
    pub fn add_file<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);

        let snapshots: Vec<YearSnapshot> =
            decode::from_read(&mut reader).context("failed to deserialize history")?;
        for snapshot in &snapshots {
            self.add_snapshot(snapshot);
        }
        Ok(())
    }

    pub fn report(&self, terminal: Option<TerminalReason>) -> RunReport {
        let p_of = |snapshot: &Option<YearSnapshot>| {
            snapshot
                .as_ref()
                .and_then(|s| s.population.allele_freqs)
                .map(|freqs| freqs.p)
        };
        let total_of = |snapshot: &Option<YearSnapshot>| {
            snapshot
                .as_ref()
                .map_or(0, |s| s.population.counts.total())
        };

        let first_p = p_of(&self.first);
        let last_p = p_of(&self.last);
        let first_total = total_of(&self.first);
        let last_total = total_of(&self.last);

        let n_events = self.event_counts.iter().map(|c| c.n).sum();
        let events_per_year = if self.n_years == 0 {
            f64::NAN
        } else {
            n_events as f64 / self.n_years as f64
        };
        let total_change_pct = if first_total == 0 {
            f64::NAN
        } else {
            100.0 * (last_total as f64 - first_total as f64) / first_total as f64
        };

        RunReport {
            n_years: self.n_years,
            terminal,
            first_p,
            last_p,
            p_change: first_p.zip(last_p).map(|(first, last)| last - first),
            first_total,
            last_total,
            total_change_pct,
            n_events,
            events_per_year,
            event_counts: self.event_counts.clone(),
            dom_allele_freq: self.dom_allele_freq.report(),
            heterozygosity: self.heterozygosity.report(),
            temperature: self.temperature.report(),
            food_abundance: self.food_abundance.report(),
            pollution: self.pollution.report(),
            total: self.total.report(),
        }
    }

    pub fn save_results<P: AsRef<Path>>(
        &self,
        file: P,
        terminal: Option<TerminalReason>,
    ) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        let report = self.report(terminal);
        log::info!(
            "{} years, p {:?} -> {:?}, population {} -> {} ({:+.1}%), {} events",
            report.n_years,
            report.first_p,
            report.last_p,
            report.first_total,
            report.last_total,
            report.total_change_pct,
            report.n_events
        );

        encode::write(&mut writer, &report).context("failed to serialize report")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}
