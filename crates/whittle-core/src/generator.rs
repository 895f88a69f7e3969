//! The reduction generator: query, reduce and count over artifact generations.
//!
//! Each operation resolves its command template against the namer's paths,
//! hands it to the oracle, and reads the captured file back.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::WhittleConfig;
use crate::error::OracleFailure;
use crate::naming::ArtifactNamer;
use crate::oracle::Oracle;
use crate::template::{resolve, Placeholders};

/// Size of a candidate artifact, for reporting only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSize {
    pub bytes: u64,
    pub lines: u64,
}

impl ArtifactSize {
    pub fn of(content: &[u8]) -> Self {
        let newlines = content.iter().filter(|&&b| b == b'\n').count() as u64;
        let unterminated = content.last().is_some_and(|&b| b != b'\n');
        Self {
            bytes: content.len() as u64,
            lines: newlines + u64::from(unterminated),
        }
    }
}

impl std::fmt::Display for ArtifactSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} lines, {} bytes", self.lines, self.bytes)
    }
}

pub struct ReductionGenerator<O: Oracle> {
    namer: ArtifactNamer,
    oracle: O,
    placeholders: Placeholders,
    query: String,
    reduce: String,
    count: Option<String>,
}

impl<O: Oracle> ReductionGenerator<O> {
    /// Build a generator from a validated configuration.
    pub fn new(namer: ArtifactNamer, oracle: O, config: &WhittleConfig) -> Self {
        Self {
            namer,
            oracle,
            placeholders: Placeholders::new(&config.file_token, &config.seed_token),
            query: config.query_command().to_string(),
            reduce: config.reduce_command().to_string(),
            count: config.count.clone(),
        }
    }

    pub fn namer(&self) -> &ArtifactNamer {
        &self.namer
    }

    /// Whether a count command bounds the seed range.
    pub fn has_count(&self) -> bool {
        self.count.is_some()
    }

    /// Run the query command on `candidate(index)`, capturing `result(index)`.
    ///
    /// Returns true iff the captured output is byte-identical to the
    /// reference `result(0)`. For `index == 0` this establishes the reference.
    pub fn query(&mut self, index: u64) -> Result<bool, OracleFailure> {
        let capture = self.namer.result(index);
        let command = resolve(
            &self.query,
            &self.placeholders,
            &self.namer.candidate(index),
            None,
        );
        self.oracle.run(&command, &capture)?;

        let observed = read_back(&capture)?;
        if index == 0 {
            return Ok(true);
        }
        let reference = read_back(&self.namer.result(0))?;
        Ok(observed == reference)
    }

    /// Run the reduce command on `candidate(index - 1)` with `seed`,
    /// capturing the new candidate to `candidate(index)`.
    pub fn reduce(&mut self, index: u64, seed: u64) -> Result<ArtifactSize, OracleFailure> {
        debug_assert!(index > 0, "generation 0 is the original input");
        let capture = self.namer.candidate(index);
        let command = resolve(
            &self.reduce,
            &self.placeholders,
            &self.namer.candidate(index.saturating_sub(1)),
            Some(seed),
        );
        self.oracle.run(&command, &capture)?;
        Ok(ArtifactSize::of(&read_back(&capture)?))
    }

    /// Run the count command on `candidate(index)`, capturing `seed_count(index)`.
    ///
    /// `Ok(None)` when no count command is configured: the seed range is
    /// unbounded.
    pub fn count(&mut self, index: u64) -> Result<Option<u64>, OracleFailure> {
        let Some(template) = &self.count else {
            return Ok(None);
        };
        let capture = self.namer.seed_count(index);
        let command = resolve(
            template,
            &self.placeholders,
            &self.namer.candidate(index),
            None,
        );
        self.oracle.run(&command, &capture)?;

        let raw = read_back(&capture)?;
        let text = String::from_utf8_lossy(&raw);
        text.trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| OracleFailure::NotAnInteger {
                path: capture,
                content: text.into_owned(),
            })
    }
}

fn read_back(path: &Path) -> Result<Vec<u8>, OracleFailure> {
    std::fs::read(path).map_err(|source| OracleFailure::ReadBack {
        path: path.to_path_buf(),
        source,
    })
}
