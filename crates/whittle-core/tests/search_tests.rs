use std::path::{Path, PathBuf};

use whittle_core::progress::StagePayload;
use whittle_core::{
    whittle, ArtifactNamer, CancelToken, ConfigError, ConfigWarning, NoProgress, Oracle,
    OracleFailure, ProgressTracker, SearchLimits, Stage, StopReason, WhittleConfig, WhittleError,
};

/// In-memory oracle over character strings.
///
/// Understands three commands:
/// - `count <file>`: number of characters, or `fixed_count` when set
/// - `reduce <file> <seed>`: delete the character at `seed`
/// - `query <file>`: `yes` if the file contains `needle`, else `no`
struct CharOracle {
    needle: char,
    fixed_count: Option<String>,
    /// Out-of-range seeds fail instead of producing an empty candidate.
    fail_out_of_range: bool,
    /// Every query after the first `n` fails.
    failing_query_after: Option<usize>,
    /// Cancel this token once this many commands have run.
    cancel_after: Option<(usize, CancelToken)>,
    log: Vec<String>,
}

impl CharOracle {
    fn new(needle: char) -> Self {
        Self {
            needle,
            fixed_count: None,
            fail_out_of_range: false,
            failing_query_after: None,
            cancel_after: None,
            log: Vec::new(),
        }
    }

    fn commands_starting_with(&self, prefix: &str) -> usize {
        self.log.iter().filter(|c| c.starts_with(prefix)).count()
    }
}

impl Oracle for CharOracle {
    fn run(&mut self, command: &str, capture_to: &Path) -> Result<(), OracleFailure> {
        self.log.push(command.to_string());
        if let Some((after, token)) = &self.cancel_after {
            if self.log.len() >= *after {
                token.cancel();
            }
        }

        let parts: Vec<&str> = command.split_whitespace().collect();
        let read = |p: &str| std::fs::read_to_string(p).unwrap();
        let out = match parts[0] {
            "count" => match &self.fixed_count {
                Some(fixed) => fixed.clone(),
                None => read(parts[1]).chars().count().to_string(),
            },
            "reduce" => {
                let mut chars: Vec<char> = read(parts[1]).chars().collect();
                let seed: usize = parts[2].parse().unwrap();
                if seed < chars.len() {
                    chars.remove(seed);
                    chars.into_iter().collect()
                } else if self.fail_out_of_range {
                    return Err(OracleFailure::Spawn {
                        command: command.to_string(),
                        source: std::io::Error::other("seed out of range"),
                    });
                } else {
                    String::new()
                }
            }
            "query" => {
                let queries = self.commands_starting_with("query");
                if self.failing_query_after.is_some_and(|n| queries > n) {
                    return Err(OracleFailure::ReadBack {
                        path: capture_to.to_path_buf(),
                        source: std::io::Error::other("query crashed"),
                    });
                }
                if read(parts[1]).contains(self.needle) {
                    "yes\n".to_string()
                } else {
                    "no\n".to_string()
                }
            }
            other => panic!("unexpected command {other}"),
        };
        std::fs::write(capture_to, out).unwrap();
        Ok(())
    }
}

fn setup(content: &str) -> (tempfile::TempDir, PathBuf, WhittleConfig) {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.txt");
    std::fs::write(&input, content).unwrap();
    let config = WhittleConfig {
        query: Some("query @FILE".into()),
        reduce: Some("reduce @FILE @SEED".into()),
        count: Some("count @FILE".into()),
        output_dir: dir.path().join("WHITTLED"),
        ..Default::default()
    };
    (dir, input, config)
}

fn namer(input: &Path, config: &WhittleConfig) -> ArtifactNamer {
    ArtifactNamer::new(&config.output_dir, input)
}

#[test]
fn test_deleting_characters_converges_to_single_char() {
    let (_dir, input, config) = setup("aaaa");
    let mut oracle = CharOracle::new('a');
    oracle.fixed_count = Some("4".into());
    let mut tracker = ProgressTracker::new();

    let outcome = whittle(&input, &config, &mut oracle, CancelToken::new(), &mut tracker).unwrap();

    assert_eq!(outcome.stop_reason, StopReason::Fixpoint);
    assert_eq!(outcome.current_generation, 3);
    let final_path = outcome.final_artifact.expect("final artifact written");
    assert_eq!(final_path, namer(&input, &config).final_artifact());
    assert_eq!(std::fs::read_to_string(final_path).unwrap(), "a");
}

#[test]
fn test_generation_zero_is_verbatim_copy() {
    let (_dir, input, config) = setup("aaaa");
    let mut oracle = CharOracle::new('a');
    whittle(&input, &config, &mut oracle, CancelToken::new(), &mut NoProgress).unwrap();

    let names = namer(&input, &config);
    assert_eq!(
        std::fs::read(names.candidate(0)).unwrap(),
        std::fs::read(&input).unwrap()
    );
}

#[test]
fn test_accepted_generations_are_consecutive_and_preserve_reference() {
    let (_dir, input, config) = setup("xaxbxa");
    let mut oracle = CharOracle::new('b');
    let outcome =
        whittle(&input, &config, &mut oracle, CancelToken::new(), &mut ProgressTracker::new()).unwrap();

    let names = namer(&input, &config);
    let reference = std::fs::read(names.result(0)).unwrap();
    for (i, accepted) in outcome.accepted.iter().enumerate() {
        assert_eq!(accepted.generation, i as u64 + 1);
        assert_eq!(std::fs::read(names.result(accepted.generation)).unwrap(), reference);
    }
    assert_eq!(
        std::fs::read_to_string(outcome.final_artifact.unwrap()).unwrap(),
        "b"
    );
}

#[test]
fn test_first_success_wins_in_ascending_order() {
    let (_dir, input, config) = setup("ab");
    let mut oracle = CharOracle::new('b');
    let outcome =
        whittle(&input, &config, &mut oracle, CancelToken::new(), &mut ProgressTracker::new()).unwrap();

    // Deleting index 0 keeps the 'b'; deleting index 1 never gets tried.
    assert_eq!(outcome.accepted.len(), 1);
    assert_eq!(outcome.accepted[0].seed, 0);
    assert_eq!(outcome.accepted[0].size.bytes, 1);
}

#[test]
fn test_zero_count_stops_before_reducing() {
    let (_dir, input, config) = setup("aaaa");
    let mut oracle = CharOracle::new('a');
    oracle.fixed_count = Some("0".into());

    let outcome =
        whittle(&input, &config, &mut oracle, CancelToken::new(), &mut ProgressTracker::new()).unwrap();

    assert_eq!(outcome.stop_reason, StopReason::Fixpoint);
    assert_eq!(outcome.current_generation, 0);
    assert!(outcome.final_artifact.is_none());
    assert_eq!(oracle.commands_starting_with("reduce"), 0);
    assert_eq!(oracle.commands_starting_with("query"), 1);
    assert!(!namer(&input, &config).final_artifact().exists());
}

#[test]
fn test_no_reduction_possible_leaves_no_final_artifact() {
    let (_dir, input, config) = setup("a");
    let mut oracle = CharOracle::new('a');
    let outcome =
        whittle(&input, &config, &mut oracle, CancelToken::new(), &mut ProgressTracker::new()).unwrap();

    assert_eq!(outcome.stop_reason, StopReason::Fixpoint);
    assert_eq!(outcome.current_generation, 0);
    assert!(outcome.final_artifact.is_none());
    assert_eq!(outcome.last_accepted, namer(&input, &config).candidate(0));
}

#[test]
fn test_unbounded_seeds_survive_failing_reduces() {
    let (_dir, input, mut config) = setup("aaaa");
    config.count = None;
    config.limits = SearchLimits {
        max_seeds_per_generation: Some(10),
        ..Default::default()
    };
    assert_eq!(
        config.validate(&input).unwrap(),
        vec![ConfigWarning::NoCountCommand]
    );

    let mut oracle = CharOracle::new('a');
    oracle.fail_out_of_range = true;
    let mut tracker = ProgressTracker::with_records();
    let outcome = whittle(&input, &config, &mut oracle, CancelToken::new(), &mut tracker).unwrap();

    assert_eq!(outcome.stop_reason, StopReason::SeedLimit);
    assert_eq!(oracle.commands_starting_with("count"), 0);
    assert_eq!(
        std::fs::read_to_string(outcome.final_artifact.unwrap()).unwrap(),
        "a"
    );

    let failures = tracker
        .records()
        .iter()
        .filter(|r| r.stage == Stage::Reduce && matches!(r.payload, StagePayload::Failed(_)))
        .count();
    assert_eq!(failures, 9);
}

#[test]
fn test_query_failure_rejects_candidate() {
    let (_dir, input, config) = setup("aaaa");
    let mut oracle = CharOracle::new('a');
    // The reference query and the first candidate query succeed.
    oracle.failing_query_after = Some(2);

    let outcome =
        whittle(&input, &config, &mut oracle, CancelToken::new(), &mut ProgressTracker::new()).unwrap();

    assert_eq!(outcome.stop_reason, StopReason::Fixpoint);
    assert_eq!(outcome.current_generation, 1);
    assert_eq!(
        std::fs::read_to_string(outcome.final_artifact.unwrap()).unwrap(),
        "aaa"
    );
}

#[test]
fn test_unparseable_count_is_fatal() {
    let (_dir, input, config) = setup("aaaa");
    let mut oracle = CharOracle::new('a');
    oracle.fixed_count = Some("lots\n".into());

    let result = whittle(&input, &config, &mut oracle, CancelToken::new(), &mut ProgressTracker::new());
    assert!(matches!(
        result,
        Err(WhittleError::Oracle {
            stage: Stage::Count,
            generation: 0,
            source: OracleFailure::NotAnInteger { .. },
        })
    ));
    assert_eq!(oracle.commands_starting_with("reduce"), 0);
}

#[test]
fn test_empty_count_command_runs_nothing() {
    let (_dir, input, mut config) = setup("aaaa");
    config.count = Some(String::new());

    let mut oracle = CharOracle::new('a');
    let result = whittle(&input, &config, &mut oracle, CancelToken::new(), &mut NoProgress);

    assert!(matches!(
        result,
        Err(WhittleError::Config(ConfigError::EmptyCount))
    ));
    assert!(oracle.log.is_empty());
    assert!(!config.output_dir.exists());
}

#[test]
fn test_existing_output_dir_is_untouched() {
    let (_dir, input, config) = setup("aaaa");
    std::fs::create_dir(&config.output_dir).unwrap();
    std::fs::write(config.output_dir.join("keep.txt"), "mine").unwrap();

    let mut oracle = CharOracle::new('a');
    let result = whittle(&input, &config, &mut oracle, CancelToken::new(), &mut ProgressTracker::new());

    assert!(matches!(
        result,
        Err(WhittleError::Config(ConfigError::OutputDirExists(_)))
    ));
    assert!(oracle.log.is_empty());
    let entries: Vec<_> = std::fs::read_dir(&config.output_dir).unwrap().collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(
        std::fs::read_to_string(config.output_dir.join("keep.txt")).unwrap(),
        "mine"
    );
}

#[test]
fn test_missing_input_creates_nothing() {
    let (dir, _input, config) = setup("aaaa");
    let mut oracle = CharOracle::new('a');
    let result = whittle(
        &dir.path().join("missing.txt"),
        &config,
        &mut oracle,
        CancelToken::new(),
        &mut ProgressTracker::new(),
    );
    assert!(matches!(
        result,
        Err(WhittleError::Config(ConfigError::InputNotFound(_)))
    ));
    assert!(!config.output_dir.exists());
}

#[test]
fn test_interrupt_never_accepts_in_flight_candidate() {
    let (_dir, input, config) = setup("aaaa");
    let cancel = CancelToken::new();
    let mut oracle = CharOracle::new('a');
    // query0, count, reduce, query -> generation 1 accepted;
    // count, reduce, query (cancelled here) -> generation 2 dropped.
    oracle.cancel_after = Some((7, cancel.clone()));

    let outcome = whittle(&input, &config, &mut oracle, cancel, &mut ProgressTracker::new()).unwrap();

    assert_eq!(outcome.stop_reason, StopReason::Interrupted);
    assert_eq!(outcome.current_generation, 1);
    assert!(outcome.final_artifact.is_none());
    assert_eq!(oracle.log.len(), 7);

    let names = namer(&input, &config);
    assert_eq!(outcome.last_accepted, names.candidate(1));
    assert_eq!(std::fs::read_to_string(names.candidate(1)).unwrap(), "aaa");
    assert!(names.candidate(2).exists());
    assert!(!names.final_artifact().exists());
}

#[test]
fn test_generation_limit_persists_final() {
    let (_dir, input, mut config) = setup("aaaaaa");
    config.limits.max_generations = Some(2);
    let mut oracle = CharOracle::new('a');

    let outcome =
        whittle(&input, &config, &mut oracle, CancelToken::new(), &mut ProgressTracker::new()).unwrap();

    assert_eq!(outcome.stop_reason, StopReason::GenerationLimit);
    assert_eq!(outcome.current_generation, 2);
    assert_eq!(
        std::fs::read_to_string(outcome.final_artifact.unwrap()).unwrap(),
        "aaaa"
    );
}

#[test]
fn test_randomized_order_is_reproducible() {
    let run = |rng_seed: u64| {
        let (_dir, input, mut config) = setup("abacadaeaf");
        config.randomized = true;
        config.rng_seed = Some(rng_seed);
        let mut oracle = CharOracle::new('a');
        let mut tracker = ProgressTracker::with_records();
        let outcome = whittle(&input, &config, &mut oracle, CancelToken::new(), &mut tracker).unwrap();
        assert_eq!(outcome.rng_seed, Some(rng_seed));
        assert_eq!(
            std::fs::read_to_string(outcome.final_artifact.unwrap()).unwrap(),
            "a"
        );
        tracker.seed_trials()
    };

    let first = run(99);
    let second = run(99);
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_resume_starts_from_previous_seed() {
    let (_dir, input, mut config) = setup("abbb");
    config.resume_seed = true;
    let mut oracle = CharOracle::new('a');
    let mut tracker = ProgressTracker::with_records();

    let outcome = whittle(&input, &config, &mut oracle, CancelToken::new(), &mut tracker).unwrap();

    // Seed 0 deletes the 'a'; seed 1 is accepted and every later generation
    // starts there. Generation 4 has a single seed, so it restarts at 0.
    assert_eq!(
        tracker.seed_trials(),
        vec![(1, 0), (1, 1), (2, 1), (3, 1), (4, 0)]
    );
    assert_eq!(
        std::fs::read_to_string(outcome.final_artifact.unwrap()).unwrap(),
        "a"
    );
}

#[test]
fn test_count_broken_by_interrupt_is_not_fatal() {
    let (_dir, input, config) = setup("aaaa");
    let cancel = CancelToken::new();
    let mut oracle = CharOracle::new('a');
    // The interrupted count leaves garbage behind.
    oracle.fixed_count = Some(String::new());
    oracle.cancel_after = Some((2, cancel.clone()));

    let outcome = whittle(&input, &config, &mut oracle, cancel, &mut ProgressTracker::new()).unwrap();

    assert_eq!(outcome.stop_reason, StopReason::Interrupted);
    assert_eq!(outcome.current_generation, 0);
    assert_eq!(oracle.log.len(), 2);
}

#[test]
fn test_cancelled_before_start_runs_nothing() {
    let (_dir, input, config) = setup("aaaa");
    let cancel = CancelToken::new();
    cancel.cancel();
    let mut oracle = CharOracle::new('a');

    let outcome = whittle(&input, &config, &mut oracle, cancel, &mut ProgressTracker::new()).unwrap();

    assert_eq!(outcome.stop_reason, StopReason::Interrupted);
    assert!(oracle.log.is_empty());
    assert!(namer(&input, &config).candidate(0).exists());
}
