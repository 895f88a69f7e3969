//! Search limits and stop reasons.
//!
//! Limits are optional user bounds on the search. They are the only way a
//! run without a count command is guaranteed to finish.

use serde::{Deserialize, Serialize};

/// User-supplied bounds on a search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchLimits {
    /// Stop after this many accepted generations.
    pub max_generations: Option<u64>,
    /// Maximum seeds tried per generation when the seed range is unknown.
    /// Ignored when a count command bounds the range.
    pub max_seeds_per_generation: Option<u64>,
}

/// Why a search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// No seed at the current level produced an accepted candidate.
    Fixpoint,
    /// `max_generations` accepted generations were reached.
    GenerationLimit,
    /// An unbounded seed enumeration hit `max_seeds_per_generation`.
    SeedLimit,
    /// User-requested abort.
    Interrupted,
}

impl StopReason {
    /// Whether the run ended on its own terms, so the last accepted
    /// generation may be persisted as the final artifact.
    pub fn is_completion(&self) -> bool {
        !matches!(self, StopReason::Interrupted)
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Fixpoint => write!(f, "fixpoint reached"),
            StopReason::GenerationLimit => write!(f, "generation limit reached"),
            StopReason::SeedLimit => write!(f, "seed limit reached"),
            StopReason::Interrupted => write!(f, "interrupted"),
        }
    }
}

impl SearchLimits {
    /// Check the generation bound against the number of accepted generations.
    pub fn generations_exhausted(&self, accepted: u64) -> bool {
        self.max_generations.is_some_and(|max| accepted >= max)
    }

    /// Check the per-generation seed bound for an unbounded enumeration.
    pub fn seeds_exhausted(&self, tried: u64) -> bool {
        self.max_seeds_per_generation.is_some_and(|max| tried >= max)
    }
}
