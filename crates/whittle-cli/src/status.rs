//! Operator-facing status lines for a running search.

use tracing::{debug, info};
use whittle_core::progress::{ProgressSummary, StagePayload, StageRecord};
use whittle_core::{ArtifactSize, ProgressReporter, ProgressTracker, Stage};

/// Logs a status line per stage on top of a `ProgressTracker`.
pub struct StatusReporter {
    tracker: ProgressTracker,
}

impl StatusReporter {
    pub fn new() -> Self {
        Self {
            tracker: ProgressTracker::new(),
        }
    }

    pub fn into_summary(self) -> ProgressSummary {
        self.tracker.summary()
    }

    fn seeds_label(&self) -> String {
        match self.tracker.seeds_available() {
            Some(n) => format!("{}/{}", self.tracker.seeds_tried(), n),
            None => format!("{}/?", self.tracker.seeds_tried()),
        }
    }
}

impl ProgressReporter for StatusReporter {
    fn stage_started(&mut self, stage: Stage, generation: u64, seed: Option<u64>) {
        self.tracker.stage_started(stage, generation, seed);
        let percent = self
            .tracker
            .completion_estimate()
            .map(|x| format!("{:.0}%", x * 100.0))
            .unwrap_or_else(|| "?".to_string());
        let doing = match stage {
            Stage::Count => "counting",
            Stage::Reduce => "reducing",
            Stage::Query => "querying",
        };
        debug!(
            reduction = generation,
            seed = ?seed,
            seeds = %self.seeds_label(),
            progress = %percent,
            "{doing}"
        );
    }

    fn stage_finished(&mut self, record: &StageRecord) {
        self.tracker.stage_finished(record);
        if let (Stage::Count, StagePayload::SeedCount(Some(n))) = (record.stage, &record.payload) {
            info!(reduction = record.generation, seeds = *n, "seeds available");
        }
    }

    fn generation_accepted(&mut self, generation: u64, seed: u64, size: ArtifactSize) {
        self.tracker.generation_accepted(generation, seed, size);
    }
}
