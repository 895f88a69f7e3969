//! Command-line arguments.
//!
//! Flags override the values of an optional JSON config file, which in
//! turn override the built-in defaults.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use whittle_core::WhittleConfig;

#[derive(Parser, Debug)]
#[command(
    name = "whittle",
    about = "Shrink a file while an oracle command keeps reporting the same result",
    version
)]
pub struct CliArgs {
    /// The input artifact to whittle.
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// The query command.
    #[arg(short, long, value_name = "CMD")]
    pub query: Option<String>,

    /// The reduce command.
    #[arg(short, long, value_name = "CMD")]
    pub reduce: Option<String>,

    /// The seed-counting command.
    #[arg(short, long, value_name = "CMD")]
    pub count: Option<String>,

    /// File placeholder token (default @FILE).
    #[arg(short = 'f', long = "file-token", value_name = "EXPR")]
    pub file_token: Option<String>,

    /// Seed placeholder token (default @SEED).
    #[arg(short = 's', long = "seed-token", value_name = "EXPR")]
    pub seed_token: Option<String>,

    /// Try seeds in shuffled order.
    #[arg(long = "random-seed", overrides_with = "no_random_seed")]
    pub random_seed: bool,

    /// Try seeds in ascending order.
    #[arg(long = "no-random-seed", overrides_with = "random_seed")]
    pub no_random_seed: bool,

    /// RNG seed for the shuffled order.
    #[arg(long, value_name = "N")]
    pub rng_seed: Option<u64>,

    /// Start each generation at the seed that produced the previous one.
    #[arg(long)]
    pub resume_seed: bool,

    /// Output directory (default ./WHITTLED). Must not exist.
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Stop after this many accepted generations.
    #[arg(long, value_name = "N")]
    pub max_generations: Option<u64>,

    /// Seeds tried per generation when no count command is given.
    #[arg(long = "max-seeds", value_name = "N")]
    pub max_seeds: Option<u64>,

    /// Shell used to run oracle commands.
    #[arg(long, value_name = "SHELL")]
    pub shell: Option<String>,

    /// JSON configuration file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write a JSON run report here.
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Run verbosely.
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub json_logs: bool,
}

impl CliArgs {
    /// Merge the config file (if any) with command-line overrides.
    pub fn to_config(&self) -> Result<WhittleConfig> {
        let mut config = match &self.config {
            Some(path) => WhittleConfig::from_json_file(path)?,
            None => WhittleConfig::default(),
        };

        if let Some(query) = &self.query {
            config.query = Some(query.clone());
        }
        if let Some(reduce) = &self.reduce {
            config.reduce = Some(reduce.clone());
        }
        if let Some(count) = &self.count {
            config.count = Some(count.clone());
        }
        if let Some(token) = &self.file_token {
            config.file_token = token.clone();
        }
        if let Some(token) = &self.seed_token {
            config.seed_token = token.clone();
        }
        if self.random_seed {
            config.randomized = true;
        }
        if self.no_random_seed {
            config.randomized = false;
        }
        if self.rng_seed.is_some() {
            config.rng_seed = self.rng_seed;
        }
        if self.resume_seed {
            config.resume_seed = true;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if self.max_generations.is_some() {
            config.limits.max_generations = self.max_generations;
        }
        if self.max_seeds.is_some() {
            config.limits.max_seeds_per_generation = self.max_seeds;
        }
        if let Some(shell) = &self.shell {
            config.shell = shell.clone();
        }

        Ok(config)
    }
}
