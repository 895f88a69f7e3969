//! Oracle commands: the trait seam and the shell-backed runner.

use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::OracleFailure;

/// Runs a resolved oracle command with its stdout captured to a file.
///
/// Abstracted behind a trait so the generator can be driven by:
/// - `ShellOracle` for real runs
/// - an in-memory fake in tests
///
/// Success means the capture file was written. The command's exit status
/// is not consulted; only the captured content carries meaning.
pub trait Oracle {
    fn run(&mut self, command: &str, capture_to: &Path) -> Result<(), OracleFailure>;
}

impl<O: Oracle + ?Sized> Oracle for &mut O {
    fn run(&mut self, command: &str, capture_to: &Path) -> Result<(), OracleFailure> {
        (**self).run(command, capture_to)
    }
}

/// Executes commands through `<shell> -c <command>`.
#[derive(Debug, Clone)]
pub struct ShellOracle {
    shell: String,
}

impl ShellOracle {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellOracle {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_SHELL)
    }
}

impl Oracle for ShellOracle {
    fn run(&mut self, command: &str, capture_to: &Path) -> Result<(), OracleFailure> {
        let stdout = File::create(capture_to).map_err(|source| OracleFailure::Capture {
            path: capture_to.to_path_buf(),
            source,
        })?;

        tracing::debug!(%command, capture = %capture_to.display(), "running oracle");
        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| OracleFailure::Spawn {
                command: command.to_string(),
                source,
            })?;

        if !output.stderr.is_empty() {
            tracing::debug!(
                %command,
                stderr = %String::from_utf8_lossy(&output.stderr).trim_end(),
                "oracle stderr"
            );
        }
        if !output.status.success() {
            tracing::trace!(%command, status = %output.status, "oracle exited non-zero");
        }
        Ok(())
    }
}
