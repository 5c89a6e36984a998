use crate::events::EventRecord;
use crate::model::{Environment, Population, PopulationState};
use serde::{Deserialize, Serialize};

/// State of the run at the end of a year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearSnapshot {
    /// Number of completed years when the snapshot was taken.
    pub year: u32,
    pub population: PopulationState,
    /// Temperature of the last season of the year.
    pub temperature: f64,
    pub environment: Environment,
    /// Every event that fired during the year, in firing order.
    pub events: Vec<EventRecord>,
}

/// Append-only history of yearly snapshots.
///
/// Events are collected season by season and merged into the snapshot that closes
/// their year.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recorder {
    snapshots: Vec<YearSnapshot>,
    pending: Vec<EventRecord>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn note_events<I>(&mut self, events: I)
    where
        I: IntoIterator<Item = EventRecord>,
    {
        self.pending.extend(events);
    }

    /// Events noted since the last snapshot.
    pub fn pending(&self) -> &[EventRecord] {
        &self.pending
    }

    pub fn close_year(
        &mut self,
        year: u32,
        population: Population,
        temperature: f64,
        environment: Environment,
    ) -> &YearSnapshot {
        let snapshot = YearSnapshot {
            year,
            population: population.into(),
            temperature,
            environment,
            events: std::mem::take(&mut self.pending),
        };
        self.snapshots.push(snapshot);
        &self.snapshots[self.snapshots.len() - 1]
    }

    pub fn snapshots(&self) -> &[YearSnapshot] {
        &self.snapshots
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
