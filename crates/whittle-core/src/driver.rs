//! The search driver: a ddmin-style loop over artifact generations.
//!
//! Per generation `i`:
//! 1. count seeds against the accepted generation `i - 1`
//! 2. for each seed in order: reduce into candidate `i`, then query it
//! 3. the first seed whose query preserves the reference is accepted
//! 4. no accepting seed -> fixpoint, the search ends
//!
//! Exactly one oracle command runs at a time. Generations are never
//! deleted, and a candidate is never accepted after cancellation.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::WhittleConfig;
use crate::error::{OracleFailure, Stage, WhittleError};
use crate::generator::{ArtifactSize, ReductionGenerator};
use crate::limits::{SearchLimits, StopReason};
use crate::naming::ArtifactNamer;
use crate::oracle::Oracle;
use crate::order::SeedOrder;
use crate::progress::{ProgressReporter, StagePayload, StageRecord, StageTimer};

/// Shared cancellation flag, checked before every oracle command.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One accepted step of the reduction chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptedGeneration {
    pub generation: u64,
    pub seed: u64,
    pub size: ArtifactSize,
}

/// Result of a completed or interrupted search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub stop_reason: StopReason,
    /// Last accepted generation; 0 when nothing was accepted.
    pub current_generation: u64,
    pub accepted: Vec<AcceptedGeneration>,
    /// Artifact of the last accepted generation.
    pub last_accepted: PathBuf,
    /// Persisted minimal artifact, if the run completed with a reduction.
    pub final_artifact: Option<PathBuf>,
    /// RNG seed of a randomized run, for replay.
    pub rng_seed: Option<u64>,
}

enum LevelResult {
    Accepted { seed: u64, size: ArtifactSize },
    Exhausted,
    SeedLimit,
    Interrupted,
}

pub struct SearchDriver<O: Oracle> {
    generator: ReductionGenerator<O>,
    order: SeedOrder,
    limits: SearchLimits,
    cancel: CancelToken,
    current: u64,
    accepted: Vec<AcceptedGeneration>,
}

impl<O: Oracle> SearchDriver<O> {
    pub fn new(generator: ReductionGenerator<O>, order: SeedOrder, limits: SearchLimits) -> Self {
        Self {
            generator,
            order,
            limits,
            cancel: CancelToken::new(),
            current: 0,
            accepted: Vec::new(),
        }
    }

    /// Driver over `namer`'s run directory, wired from a validated config.
    pub fn from_config(namer: ArtifactNamer, oracle: O, config: &WhittleConfig) -> Self {
        let order = SeedOrder::from_config(config);
        let generator = ReductionGenerator::new(namer, oracle, config);
        Self::new(generator, order, config.limits.clone())
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the search to fixpoint, limit or interruption.
    ///
    /// Errors only when the reference query or a count fails, or when the
    /// final artifact cannot be written. A failure caused by cancellation
    /// is reported as an interrupted outcome instead.
    pub fn run(&mut self, reporter: &mut dyn ProgressReporter) -> Result<SearchOutcome, WhittleError> {
        if self.order.is_randomized() {
            tracing::info!(rng_seed = self.order.rng_seed(), "randomized seed order");
        }
        if self.cancel.is_cancelled() {
            return self.finish(StopReason::Interrupted);
        }

        if let Err(e) = self.establish_reference(reporter) {
            if self.cancel.is_cancelled() {
                return self.finish(StopReason::Interrupted);
            }
            return Err(e);
        }

        let stop = loop {
            if self.limits.generations_exhausted(self.accepted.len() as u64) {
                break StopReason::GenerationLimit;
            }
            if self.cancel.is_cancelled() {
                break StopReason::Interrupted;
            }

            let index = self.current + 1;
            let count = match self.count_seeds(index, reporter) {
                Ok(count) => count,
                Err(_) if self.cancel.is_cancelled() => break StopReason::Interrupted,
                Err(e) => {
                    tracing::error!(
                        last_accepted = %self.generator.namer().candidate(self.current).display(),
                        "cannot determine seed range"
                    );
                    return Err(e);
                }
            };
            let last_seed = self.accepted.last().map(|a| a.seed);

            match self.search_level(index, count, last_seed, reporter) {
                LevelResult::Accepted { seed, size } => {
                    tracing::info!(generation = index, seed, %size, "candidate accepted");
                    self.current = index;
                    self.accepted.push(AcceptedGeneration {
                        generation: index,
                        seed,
                        size,
                    });
                    reporter.generation_accepted(index, seed, size);
                }
                LevelResult::Exhausted => break StopReason::Fixpoint,
                LevelResult::SeedLimit => break StopReason::SeedLimit,
                LevelResult::Interrupted => break StopReason::Interrupted,
            }
        };

        self.finish(stop)
    }

    fn establish_reference(&mut self, reporter: &mut dyn ProgressReporter) -> Result<(), WhittleError> {
        reporter.stage_started(Stage::Query, 0, None);
        let timer = StageTimer::start();
        let result = self.generator.query(0);
        let payload = match &result {
            Ok(_) => StagePayload::Preserved(true),
            Err(e) => StagePayload::Failed(e.to_string()),
        };
        reporter.stage_finished(&record(Stage::Query, 0, None, &timer, payload));

        result.map(|_| ()).map_err(|source| WhittleError::Oracle {
            stage: Stage::Query,
            generation: 0,
            source,
        })
    }

    /// Count the seeds available against generation `index - 1`.
    fn count_seeds(
        &mut self,
        index: u64,
        reporter: &mut dyn ProgressReporter,
    ) -> Result<Option<u64>, WhittleError> {
        let accepted = index - 1;
        reporter.stage_started(Stage::Count, index, None);
        let timer = StageTimer::start();

        match self.generator.count(accepted) {
            Ok(count) => {
                tracing::debug!(generation = index, ?count, "seeds counted");
                reporter.stage_finished(&record(
                    Stage::Count,
                    index,
                    None,
                    &timer,
                    StagePayload::SeedCount(count),
                ));
                Ok(count)
            }
            Err(source) => {
                reporter.stage_finished(&record(
                    Stage::Count,
                    index,
                    None,
                    &timer,
                    StagePayload::Failed(source.to_string()),
                ));
                Err(WhittleError::Oracle {
                    stage: Stage::Count,
                    generation: accepted,
                    source,
                })
            }
        }
    }

    fn search_level(
        &mut self,
        index: u64,
        count: Option<u64>,
        last_seed: Option<u64>,
        reporter: &mut dyn ProgressReporter,
    ) -> LevelResult {
        let mut tried = 0u64;

        for seed in self.order.seeds(index, count, last_seed) {
            if count.is_none() && self.limits.seeds_exhausted(tried) {
                return LevelResult::SeedLimit;
            }
            if self.cancel.is_cancelled() {
                return LevelResult::Interrupted;
            }
            tried += 1;

            let Some(size) = self.try_reduce(index, seed, reporter) else {
                continue;
            };
            if self.cancel.is_cancelled() {
                return LevelResult::Interrupted;
            }

            let preserved = self.try_query(index, seed, reporter);
            if self.cancel.is_cancelled() {
                return LevelResult::Interrupted;
            }
            if preserved {
                return LevelResult::Accepted { seed, size };
            }
            tracing::debug!(generation = index, seed, "candidate rejected");
        }

        LevelResult::Exhausted
    }

    /// Reduce failures reject the candidate.
    fn try_reduce(
        &mut self,
        index: u64,
        seed: u64,
        reporter: &mut dyn ProgressReporter,
    ) -> Option<ArtifactSize> {
        reporter.stage_started(Stage::Reduce, index, Some(seed));
        let timer = StageTimer::start();
        match self.generator.reduce(index, seed) {
            Ok(size) => {
                reporter.stage_finished(&record(
                    Stage::Reduce,
                    index,
                    Some(seed),
                    &timer,
                    StagePayload::Size(size),
                ));
                Some(size)
            }
            Err(e) => {
                self.reject_on_failure(Stage::Reduce, index, seed, &timer, e, reporter);
                None
            }
        }
    }

    /// Query failures reject the candidate.
    fn try_query(&mut self, index: u64, seed: u64, reporter: &mut dyn ProgressReporter) -> bool {
        reporter.stage_started(Stage::Query, index, Some(seed));
        let timer = StageTimer::start();
        match self.generator.query(index) {
            Ok(preserved) => {
                reporter.stage_finished(&record(
                    Stage::Query,
                    index,
                    Some(seed),
                    &timer,
                    StagePayload::Preserved(preserved),
                ));
                preserved
            }
            Err(e) => {
                self.reject_on_failure(Stage::Query, index, seed, &timer, e, reporter);
                false
            }
        }
    }

    fn reject_on_failure(
        &self,
        stage: Stage,
        index: u64,
        seed: u64,
        timer: &StageTimer,
        error: OracleFailure,
        reporter: &mut dyn ProgressReporter,
    ) {
        tracing::warn!(%stage, generation = index, seed, error = %error, "oracle failed; candidate rejected");
        reporter.stage_finished(&record(
            stage,
            index,
            Some(seed),
            timer,
            StagePayload::Failed(error.to_string()),
        ));
    }

    fn finish(&self, stop: StopReason) -> Result<SearchOutcome, WhittleError> {
        let namer = self.generator.namer();
        let last_accepted = namer.candidate(self.current);

        let final_artifact = if stop.is_completion() && self.current > 0 {
            let target = namer.final_artifact();
            std::fs::copy(&last_accepted, &target).map_err(|e| {
                WhittleError::io(format!("cannot write final artifact {}", target.display()), e)
            })?;
            Some(target)
        } else {
            None
        };

        match &final_artifact {
            Some(path) => tracing::info!(
                reason = %stop,
                generation = self.current,
                final_artifact = %path.display(),
                "search finished"
            ),
            None => tracing::info!(
                reason = %stop,
                generation = self.current,
                last_accepted = %last_accepted.display(),
                "search finished without a final artifact"
            ),
        }

        Ok(SearchOutcome {
            stop_reason: stop,
            current_generation: self.current,
            accepted: self.accepted.clone(),
            last_accepted,
            final_artifact,
            rng_seed: self.order.is_randomized().then(|| self.order.rng_seed()),
        })
    }
}

fn record(
    stage: Stage,
    generation: u64,
    seed: Option<u64>,
    timer: &StageTimer,
    payload: StagePayload,
) -> StageRecord {
    StageRecord {
        generation,
        seed,
        stage,
        elapsed_secs: timer.elapsed_secs(),
        payload,
    }
}
