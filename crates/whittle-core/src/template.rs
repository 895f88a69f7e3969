//! Oracle command templates.
//!
//! Resolution is literal string substitution. Paths are inserted without
//! shell escaping, so artifact names must stay free of characters the
//! shell would interpret.

use std::path::Path;

/// Placeholder tokens recognised in command templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholders {
    pub file: String,
    pub seed: String,
}

impl Placeholders {
    pub fn new(file: impl Into<String>, seed: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            seed: seed.into(),
        }
    }
}

impl Default for Placeholders {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_FILE_TOKEN, crate::config::DEFAULT_SEED_TOKEN)
    }
}

/// Substitute every file token with `file` and, when `seed` is given, every
/// seed token with its decimal form.
pub fn resolve(template: &str, placeholders: &Placeholders, file: &Path, seed: Option<u64>) -> String {
    let command = template.replace(&placeholders.file, &file.to_string_lossy());
    match seed {
        Some(seed) => command.replace(&placeholders.seed, &seed.to_string()),
        None => command,
    }
}
