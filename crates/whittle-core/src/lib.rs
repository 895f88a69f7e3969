//! Oracle-driven test-case reduction.
//!
//! The user supplies three shell commands: a query that exhibits the
//! property of interest, a reduce that derives a smaller candidate from a
//! seed, and an optional count that bounds the seed range. This crate
//! supplies the search, the artifact naming scheme and the acceptance
//! policy.

pub mod config;
pub mod driver;
pub mod error;
pub mod generator;
pub mod limits;
pub mod naming;
pub mod oracle;
pub mod order;
pub mod progress;
pub mod template;

use std::path::Path;

pub use config::{ConfigWarning, WhittleConfig};
pub use driver::{AcceptedGeneration, CancelToken, SearchDriver, SearchOutcome};
pub use error::{ConfigError, OracleFailure, Stage, WhittleError};
pub use generator::{ArtifactSize, ReductionGenerator};
pub use limits::{SearchLimits, StopReason};
pub use naming::ArtifactNamer;
pub use oracle::{Oracle, ShellOracle};
pub use progress::{NoProgress, ProgressReporter, ProgressTracker};

/// Validate `config`, create the run directory and search to completion.
///
/// Configuration errors are returned before anything is written.
pub fn whittle<O: Oracle>(
    input: &Path,
    config: &WhittleConfig,
    oracle: O,
    cancel: CancelToken,
    reporter: &mut dyn ProgressReporter,
) -> Result<SearchOutcome, WhittleError> {
    for warning in config.validate(input)? {
        tracing::warn!("{warning}");
    }

    let namer = ArtifactNamer::create(&config.output_dir, input)?;
    SearchDriver::from_config(namer, oracle, config)
        .with_cancel(cancel)
        .run(reporter)
}
