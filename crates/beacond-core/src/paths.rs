//! Centralized file and directory names for the beacond data directory.
//!
//! Every on-disk artifact the daemon touches is named here, so hooks,
//! tests, and the daemon agree on a single source of truth.

use std::path::{Path, PathBuf};

/// PID file holding the single-instance lock.
pub const PID_FILE: &str = "beacond.pid";

/// Legacy single-client state file name.
pub const STATE_FILE: &str = "state.json";

/// Configuration file name.
pub const CONFIG_FILE: &str = "config.toml";

/// Subdirectory holding JSONL conversation logs.
pub const CONVERSATIONS_DIR: &str = "conversations";

/// Subdirectory holding per-session liveness markers.
pub const SESSIONS_DIR: &str = "sessions";

/// Extension of per-session liveness marker files.
pub const SESSION_EXT: &str = ".session";

/// Cached pricing data file name.
pub const PRICING_CACHE_FILE: &str = "pricing-cache.json";

/// Cached model tier data file name.
pub const TIERS_CACHE_FILE: &str = "tiers-cache.json";

/// Subdirectory for daemon log files.
pub const LOG_DIR: &str = "logs";

/// Returns the per-client state file name, e.g. `state.claude-code.json`.
pub fn state_file_for_client(client: &str) -> String {
    format!("state.{client}.json")
}

/// Reports whether a file name is a state file (legacy or per-client).
pub fn is_state_file(name: &str) -> bool {
    name == STATE_FILE || (name.starts_with("state.") && name.ends_with(".json"))
}

/// Path construction rooted at a data directory.
///
/// All daemon I/O flows through these helpers so that `--data-dir`
/// relocates everything at once.
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn pid(&self) -> PathBuf {
        self.root.join(PID_FILE)
    }

    pub fn state(&self) -> PathBuf {
        self.root.join(STATE_FILE)
    }

    pub fn state_for_client(&self, client: &str) -> PathBuf {
        self.root.join(state_file_for_client(client))
    }

    pub fn config(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn conversations(&self) -> PathBuf {
        self.root.join(CONVERSATIONS_DIR)
    }

    pub fn sessions(&self) -> PathBuf {
        self.root.join(SESSIONS_DIR)
    }

    pub fn logs(&self) -> PathBuf {
        self.root.join(LOG_DIR)
    }

    pub fn pricing_cache(&self) -> PathBuf {
        self.root.join(PRICING_CACHE_FILE)
    }

    pub fn tiers_cache(&self) -> PathBuf {
        self.root.join(TIERS_CACHE_FILE)
    }
}

/// Returns the platform default data directory, typically `~/.beacond`.
/// Falls back to `./.beacond` when the home directory cannot be determined.
pub fn default_data_dir() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(".beacond"),
        None => Path::new(".").join(".beacond"),
    }
}
