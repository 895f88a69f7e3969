//! Progress tracking for operator visibility.
//!
//! Aggregates per-stage timings, optionally keeps every stage record, and
//! computes an advisory completion estimate. Nothing here feeds back into
//! the search.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::Stage;
use crate::generator::ArtifactSize;

/// Stage-specific result carried by a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StagePayload {
    /// Count stage. `None` when the range is unbounded.
    SeedCount(Option<u64>),
    /// Reduce stage.
    Size(ArtifactSize),
    /// Query stage: whether the property was preserved.
    Preserved(bool),
    /// The oracle failed; the message is kept for the report.
    Failed(String),
}

/// One completed stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub generation: u64,
    /// Seed under trial (reduce and query stages).
    pub seed: Option<u64>,
    pub stage: Stage,
    pub elapsed_secs: f64,
    pub payload: StagePayload,
}

/// Observer interface used by the search driver.
pub trait ProgressReporter {
    fn stage_started(&mut self, _stage: Stage, _generation: u64, _seed: Option<u64>) {}

    fn stage_finished(&mut self, _record: &StageRecord) {}

    fn generation_accepted(&mut self, _generation: u64, _seed: u64, _size: ArtifactSize) {}
}

/// Reporter that ignores everything.
#[derive(Debug, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {}

/// Per-stage aggregate for the run summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageTotals {
    pub runs: u64,
    pub failures: u64,
    pub total_secs: f64,
}

/// Compact summary for the run report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub stages: BTreeMap<Stage, StageTotals>,
    pub seeds_tried: u64,
    pub generations_accepted: u64,
    pub elapsed_secs: f64,
}

/// Tracks the current generation's seed budget and per-stage totals.
///
/// Memory stays constant unless built with `with_records`.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    records: Option<Vec<StageRecord>>,
    stages: BTreeMap<Stage, StageTotals>,
    generation: u64,
    seeds_tried: u64,
    seeds_available: Option<u64>,
    total_seeds_tried: u64,
    accepted: u64,
    start: Instant,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            records: None,
            stages: BTreeMap::new(),
            generation: 0,
            seeds_tried: 0,
            seeds_available: None,
            total_seeds_tried: 0,
            accepted: 0,
            start: Instant::now(),
        }
    }

    /// Tracker that also keeps every stage record.
    pub fn with_records() -> Self {
        Self {
            records: Some(Vec::new()),
            ..Self::new()
        }
    }

    /// Retained stage records; empty unless built with `with_records`.
    pub fn records(&self) -> &[StageRecord] {
        self.records.as_deref().unwrap_or_default()
    }

    /// Current generation under attempt.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn seeds_tried(&self) -> u64 {
        self.seeds_tried
    }

    pub fn seeds_available(&self) -> Option<u64> {
        self.seeds_available
    }

    /// `(generation, seed)` for every reduce attempt, in trial order.
    pub fn seed_trials(&self) -> Vec<(u64, u64)> {
        self.records()
            .iter()
            .filter(|r| r.stage == Stage::Reduce)
            .filter_map(|r| r.seed.map(|s| (r.generation, s)))
            .collect()
    }

    /// Rough fraction of the current generation's seed space explored.
    ///
    /// Log-scaled, since an accepting seed tends to turn up early. Stays in
    /// `[0, 1]` and never decreases within a generation. `None` while the
    /// range is unknown.
    pub fn completion_estimate(&self) -> Option<f64> {
        let available = self.seeds_available?;
        if available == 0 {
            return Some(1.0);
        }
        let x = (1.0 + self.seeds_tried as f64).ln() / (1.0 + available as f64).ln();
        Some(if x.is_finite() { x.clamp(0.0, 1.0) } else { 0.0 })
    }

    pub fn summary(&self) -> ProgressSummary {
        ProgressSummary {
            stages: self.stages.clone(),
            seeds_tried: self.total_seeds_tried,
            generations_accepted: self.accepted,
            elapsed_secs: self.start.elapsed().as_secs_f64(),
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for ProgressTracker {
    fn stage_started(&mut self, stage: Stage, generation: u64, _seed: Option<u64>) {
        if stage == Stage::Count && generation != self.generation {
            self.generation = generation;
            self.seeds_tried = 0;
            self.seeds_available = None;
        }
    }

    fn stage_finished(&mut self, record: &StageRecord) {
        match (&record.stage, &record.payload) {
            (Stage::Count, StagePayload::SeedCount(n)) => self.seeds_available = *n,
            (Stage::Reduce, _) => {
                self.seeds_tried += 1;
                self.total_seeds_tried += 1;
            }
            _ => {}
        }

        let totals = self.stages.entry(record.stage).or_default();
        totals.runs += 1;
        totals.total_secs += record.elapsed_secs;
        if matches!(record.payload, StagePayload::Failed(_)) {
            totals.failures += 1;
        }

        if let Some(records) = &mut self.records {
            records.push(record.clone());
        }
    }

    fn generation_accepted(&mut self, _generation: u64, _seed: u64, _size: ArtifactSize) {
        self.accepted += 1;
    }
}

/// Wall-clock timer for a single stage.
#[derive(Debug)]
pub struct StageTimer {
    start: Instant,
}

impl StageTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}
