//! Runtime settings resolved from flags, the environment, and `.env`.

use std::env;
use std::path::{Path, PathBuf};

/// Environment variable naming the storage scope directory.
pub const STORE_DIR_VAR: &str = "ANONID_STORE_DIR";
/// Environment variable naming a directory to record cassettes into.
pub const RECORD_VAR: &str = "ANONID_RECORD";
/// Environment variable holding a `tracing` filter directive.
pub const LOG_VAR: &str = "ANONID_LOG";

const DEFAULT_STORE_DIR: &str = ".anonid/store";

/// Resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Directory holding the persistent storage scope.
    pub store_dir: PathBuf,
    /// When set, port interactions are recorded to cassettes under this directory.
    pub record_dir: Option<PathBuf>,
    /// Filter directive for the log subscriber.
    pub log_filter: String,
}

impl Settings {
    /// Loads `.env` (if present) and resolves settings from the process environment.
    ///
    /// `store_override` wins over `ANONID_STORE_DIR`; `verbose` raises the
    /// default log level when `ANONID_LOG` is unset.
    #[must_use]
    pub fn load(store_override: Option<&Path>, verbose: bool) -> Self {
        let _ = dotenvy::dotenv();
        Self::resolve(store_override, verbose, |key| env::var(key).ok())
    }

    /// Resolves settings using `lookup` in place of the process environment.
    #[must_use]
    pub fn resolve(
        store_override: Option<&Path>,
        verbose: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let store_dir = store_override.map_or_else(
            || non_empty(STORE_DIR_VAR).map_or_else(|| PathBuf::from(DEFAULT_STORE_DIR), PathBuf::from),
            Path::to_path_buf,
        );
        let record_dir = non_empty(RECORD_VAR).map(PathBuf::from);
        let log_filter = non_empty(LOG_VAR)
            .unwrap_or_else(|| if verbose { "debug" } else { "warn" }.to_string());

        Self { store_dir, record_dir, log_filter }
    }
}
