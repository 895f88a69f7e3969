//! Artifact naming and versioning.
//!
//! Every generation of the reduction chain gets its own files inside one
//! run-scoped output directory:
//!
//! ```text
//! <dir>/<stem>.<index><ext>      candidate artifact
//! <dir>/<stem>.<index>.out       captured query output
//! <dir>/<stem>.<index>.count     captured count output
//! <dir>/<stem>.whittled<ext>     final minimized artifact
//! ```
//!
//! Paths are a pure function of the index, so any step can be re-run by hand.

use std::path::{Path, PathBuf};

use crate::error::{ConfigError, WhittleError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNamer {
    directory: PathBuf,
    stem: String,
    /// Extension including the leading dot, or empty.
    ext: String,
}

impl ArtifactNamer {
    /// Naming scheme for `original` under `directory`. No filesystem effects.
    pub fn new(directory: impl Into<PathBuf>, original: &Path) -> Self {
        let stem = original
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = original
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        Self {
            directory: directory.into(),
            stem,
            ext,
        }
    }

    /// Create the output directory and seed generation 0 with a verbatim
    /// copy of `original`.
    ///
    /// Fails with `OutputDirExists` if the directory is already there; an
    /// existing run is never overwritten.
    pub fn create(directory: impl Into<PathBuf>, original: &Path) -> Result<Self, WhittleError> {
        let namer = Self::new(directory, original);

        if let Some(parent) = namer.directory.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                WhittleError::io(format!("cannot create {}", parent.display()), e)
            })?;
        }
        match std::fs::create_dir(&namer.directory) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(ConfigError::OutputDirExists(namer.directory.clone()).into());
            }
            Err(e) => {
                return Err(WhittleError::io(
                    format!("cannot create output directory {}", namer.directory.display()),
                    e,
                ));
            }
        }

        std::fs::copy(original, namer.candidate(0)).map_err(|e| {
            WhittleError::io(format!("cannot copy {} into run", original.display()), e)
        })?;
        tracing::debug!(dir = %namer.directory.display(), "output directory created");
        Ok(namer)
    }

    /// Candidate artifact at generation `index`.
    pub fn candidate(&self, index: u64) -> PathBuf {
        self.directory
            .join(format!("{}.{}{}", self.stem, index, self.ext))
    }

    /// Captured query output at generation `index`.
    pub fn result(&self, index: u64) -> PathBuf {
        self.directory.join(format!("{}.{}.out", self.stem, index))
    }

    /// Captured count output at generation `index`.
    pub fn seed_count(&self, index: u64) -> PathBuf {
        self.directory.join(format!("{}.{}.count", self.stem, index))
    }

    /// The persisted minimal artifact.
    pub fn final_artifact(&self) -> PathBuf {
        self.directory
            .join(format!("{}.whittled{}", self.stem, self.ext))
    }
}
