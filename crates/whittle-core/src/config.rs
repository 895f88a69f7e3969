//! Run configuration: oracle commands, placeholder tokens, seed order, limits.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::limits::SearchLimits;

pub const DEFAULT_FILE_TOKEN: &str = "@FILE";
pub const DEFAULT_SEED_TOKEN: &str = "@SEED";
pub const DEFAULT_OUTPUT_DIR: &str = "WHITTLED";
pub const DEFAULT_SHELL: &str = "sh";

/// Immutable configuration for one whittling run.
///
/// Built once (from defaults, a config file and command-line overrides)
/// and passed by reference into the namer, generator and driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhittleConfig {
    /// Query command. Its captured stdout is the property under test.
    pub query: Option<String>,
    /// Reduce command. Its captured stdout is the next candidate.
    pub reduce: Option<String>,
    /// Count command. Its captured stdout is the number of seeds.
    pub count: Option<String>,
    /// Placeholder replaced by the artifact path.
    pub file_token: String,
    /// Placeholder replaced by the seed in the reduce command.
    pub seed_token: String,
    /// Shuffle each generation's seed range before trying it.
    pub randomized: bool,
    /// Seed for the shuffle RNG. Fixed value -> identical trial order.
    pub rng_seed: Option<u64>,
    /// Start each generation at the seed that produced the previous one.
    pub resume_seed: bool,
    /// Run-scoped output directory. Must not exist yet.
    pub output_dir: PathBuf,
    /// Shell used to interpret oracle commands (`<shell> -c <command>`).
    pub shell: String,
    pub limits: SearchLimits,
}

impl Default for WhittleConfig {
    fn default() -> Self {
        Self {
            query: None,
            reduce: None,
            count: None,
            file_token: DEFAULT_FILE_TOKEN.to_string(),
            seed_token: DEFAULT_SEED_TOKEN.to_string(),
            randomized: false,
            rng_seed: None,
            resume_seed: false,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            shell: DEFAULT_SHELL.to_string(),
            limits: SearchLimits::default(),
        }
    }
}

/// Non-fatal configuration findings, reported before the run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// Without a count command the seed range is unbounded.
    NoCountCommand,
    /// A shuffle needs a known seed range; ascending order is used instead.
    RandomizedWithoutCount,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::NoCountCommand => {
                write!(f, "termination is not guaranteed without seed counting")
            }
            ConfigWarning::RandomizedWithoutCount => {
                write!(f, "random seed order needs a count command; using ascending order")
            }
        }
    }
}

impl WhittleConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::ConfigFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_json(&text).map_err(|e| ConfigError::ConfigFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The query command. Only valid after `validate` succeeded.
    pub fn query_command(&self) -> &str {
        self.query.as_deref().unwrap_or_default()
    }

    /// The reduce command. Only valid after `validate` succeeded.
    pub fn reduce_command(&self) -> &str {
        self.reduce.as_deref().unwrap_or_default()
    }

    /// Check everything that can be checked before touching the filesystem.
    ///
    /// The output directory check is repeated atomically when the namer
    /// creates it.
    pub fn validate(&self, input: &Path) -> Result<Vec<ConfigWarning>, ConfigError> {
        if !input.exists() {
            return Err(ConfigError::InputNotFound(input.to_path_buf()));
        }
        if !input.is_file() {
            return Err(ConfigError::InputNotAFile(input.to_path_buf()));
        }
        if self.query.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::MissingQuery);
        }
        if self.reduce.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::MissingReduce);
        }
        if self.count.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(ConfigError::EmptyCount);
        }
        if self.file_token.is_empty() {
            return Err(ConfigError::EmptyToken { which: "file" });
        }
        if self.seed_token.is_empty() {
            return Err(ConfigError::EmptyToken { which: "seed" });
        }
        if self.file_token == self.seed_token {
            return Err(ConfigError::IdenticalTokens);
        }
        if self.output_dir.exists() {
            return Err(ConfigError::OutputDirExists(self.output_dir.clone()));
        }

        let mut warnings = Vec::new();
        if self.count.is_none() {
            warnings.push(ConfigWarning::NoCountCommand);
            if self.randomized {
                warnings.push(ConfigWarning::RandomizedWithoutCount);
            }
        }
        Ok(warnings)
    }
}
