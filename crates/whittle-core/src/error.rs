//! Error taxonomy for a whittling run.
//!
//! Configuration problems are fatal and surface before any oracle command
//! runs. Oracle failures carry the stage and generation they happened in so
//! the driver can decide whether to reject the candidate or abort.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The three oracle-backed stages of a generation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Count,
    Reduce,
    Query,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Count => write!(f, "count"),
            Stage::Reduce => write!(f, "reduce"),
            Stage::Query => write!(f, "query"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("must specify a query command")]
    MissingQuery,

    #[error("must specify a reduce command")]
    MissingReduce,

    #[error("count command must not be empty; omit it to run without seed counting")]
    EmptyCount,

    #[error("input file does not exist: {0}")]
    InputNotFound(PathBuf),

    #[error("input is not a regular file: {0}")]
    InputNotAFile(PathBuf),

    #[error("output directory {0} already exists")]
    OutputDirExists(PathBuf),

    #[error("{which} placeholder token must not be empty")]
    EmptyToken { which: &'static str },

    #[error("file and seed placeholder tokens must differ")]
    IdenticalTokens,

    #[error("cannot load config file {path}: {reason}")]
    ConfigFile { path: PathBuf, reason: String },
}

/// An oracle command that did not yield a usable result.
#[derive(Debug, thiserror::Error)]
pub enum OracleFailure {
    #[error("command could not be run: {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot create capture file {path}: {source}")]
    Capture {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read oracle output {path}: {source}")]
    ReadBack {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("count output in {path} is not an integer: {content:?}")]
    NotAnInteger { path: PathBuf, content: String },
}

#[derive(Debug, thiserror::Error)]
pub enum WhittleError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{stage} oracle failed at generation {generation}: {source}")]
    Oracle {
        stage: Stage,
        generation: u64,
        #[source]
        source: OracleFailure,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl WhittleError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        WhittleError::Io {
            context: context.into(),
            source,
        }
    }
}
