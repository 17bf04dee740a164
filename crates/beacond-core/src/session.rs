//! Session state persistence: reading, writing, migrating, and recovering
//! the per-client JSON state records written by editor hooks.
//!
//! The state file schema is versioned (see [`CURRENT_VERSION`]) and is read
//! through a [`SessionStore`], which owns corruption recovery and
//! future-version normalization. The store never silently drops data: a
//! record that fails to parse is archived with a `.corrupted` suffix, and a
//! record from a newer schema is archived to `.v<N>.bak` before being
//! normalized down.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::atomicfile;
use crate::error::{Error, Result};
use crate::migrate::Registry;

/// Latest state file schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Client identifier written to the state file when the hook does not know
/// which tool it serves.
pub const DEFAULT_CLIENT: &str = "unknown";

// ─────────────────────────────────────────────────────────────────
// State Record
// ─────────────────────────────────────────────────────────────────

/// One tool integration's persisted session snapshot.
///
/// Persisted as JSON on disk and rewritten by hooks whenever the session
/// changes. Missing optional fields deserialize to their zero values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionState {
    /// Schema version, used for migration.
    #[serde(rename = "$version")]
    pub version: u32,
    /// Unique identifier for the session.
    pub session_id: String,
    /// Unix timestamp when the session began.
    pub session_start: i64,
    /// Unix timestamp of the most recent session activity.
    pub last_activity: i64,
    /// Project name derived from the working directory.
    pub project: String,
    /// Current git branch name, or empty outside a git repo.
    pub branch: String,
    /// Absolute path to the session's working directory.
    pub cwd: String,
    /// HTTPS URL of the git remote origin, used for the repo button.
    pub git_remote_url: String,
    /// Which client wrote the state (e.g. "claude-code").
    pub client: String,
    /// Whether the session has ended.
    pub stopped: bool,

    // Tool context
    /// Name of the tool currently in use (e.g. "Bash", "Edit", "Read").
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tool_name: String,
    /// Primary argument of the current tool (file path, command, pattern).
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tool_target: String,
    /// Most recently touched file path from a file-based tool.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub active_file: String,

    // Agent context
    /// Agent phase: "thinking", "tool", "waiting", "idle".
    #[serde(skip_serializing_if = "String::is_empty")]
    pub agent_state: String,
    /// Permission setting (e.g. "plan", "acceptEdits").
    #[serde(skip_serializing_if = "String::is_empty")]
    pub permission_mode: String,
    /// Name of the last hook event that triggered this state update.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hook_event: String,
}

impl SessionState {
    /// A fresh zero-value state at the current schema version.
    pub fn fresh() -> Self {
        Self {
            version: CURRENT_VERSION,
            ..Self::default()
        }
    }
}

/// A successfully loaded state, possibly degraded.
#[derive(Debug)]
pub struct LoadedState {
    pub state: SessionState,
    /// Set when the on-disk record was corrupted and replaced with a fresh
    /// one; holds the error describing the corruption. Callers must treat
    /// this as degraded-but-usable, not a failure.
    pub recovered: Option<Error>,
}

// ─────────────────────────────────────────────────────────────────
// Version Peeking
// ─────────────────────────────────────────────────────────────────

/// Extracts the `$version` field without requiring the rest of the record
/// to deserialize. A missing or zero version normalizes to 1.
pub fn peek_version(data: &[u8]) -> Result<u32> {
    #[derive(Deserialize)]
    struct Partial {
        #[serde(rename = "$version", default)]
        version: u32,
    }
    let partial: Partial = serde_json::from_slice(data)?;
    Ok(if partial.version == 0 {
        1
    } else {
        partial.version
    })
}

// ─────────────────────────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────────────────────────

/// Reads and writes state records, applying migrations and recovery.
///
/// The store's registry defines the schema version monotonically; records
/// ahead of it are normalized down, records behind it are migrated up.
#[derive(Debug)]
pub struct SessionStore {
    registry: Registry,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// A store at [`CURRENT_VERSION`] with no registered migrations.
    pub fn new() -> Self {
        Self {
            registry: Registry::new(CURRENT_VERSION),
        }
    }

    /// A store using the given migration registry. Used by tests to inject
    /// synthetic migrations.
    pub fn with_registry(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn current_version(&self) -> u32 {
        self.registry.current_version
    }

    /// Reads and parses the state file at `path`.
    ///
    /// Corrupted JSON is backed up to `<path>.corrupted` and replaced with a
    /// fresh record; the fresh state is returned together with the
    /// corruption error in [`LoadedState::recovered`]. A record behind the
    /// store's version is migrated (a migration failure fails the read). A
    /// record ahead of the store's version is archived to `<path>.v<N>.bak`
    /// and normalized down, since a newer hook may run against an older
    /// daemon binary.
    pub fn read(&self, path: &Path) -> Result<LoadedState> {
        let data = std::fs::read(path).map_err(|e| Error::StateRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut state: SessionState = match serde_json::from_slice(&data) {
            Ok(state) => state,
            Err(parse_err) => return self.recover_corrupted(path, &data, parse_err),
        };

        if state.version == 0 {
            state.version = 1;
        }

        if !self.registry.is_empty() && state.version < self.registry.current_version {
            let (migrated, new_version) = self.registry.run(&data, state.version)?;
            state = serde_json::from_slice(&migrated)
                .map_err(|e| Error::migration(format!("unmarshal migrated state: {e}")))?;
            state.version = new_version;
        }

        if state.version > self.registry.current_version {
            self.normalize_future_version(&mut state, path, &data);
        }

        Ok(LoadedState {
            state,
            recovered: None,
        })
    }

    /// Backs up a corrupted state file and installs a fresh record.
    fn recover_corrupted(
        &self,
        path: &Path,
        data: &[u8],
        parse_err: serde_json::Error,
    ) -> Result<LoadedState> {
        warn!(path = %path.display(), error = %parse_err, "corrupted state file, backing up");

        let backup = corrupted_backup_path(path);
        if let Err(e) = std::fs::write(&backup, data) {
            warn!(path = %backup.display(), error = %e, "failed to write backup");
        }

        let state = SessionState::fresh();
        if let Err(e) = self.save(path, &state) {
            warn!(path = %path.display(), error = %e, "failed to save fresh state");
        }

        Ok(LoadedState {
            state,
            recovered: Some(Error::CorruptedState {
                backup,
                reason: parse_err.to_string(),
            }),
        })
    }

    /// Backs up a future-version state file and normalizes it to the
    /// store's version. Never fails the read.
    fn normalize_future_version(&self, state: &mut SessionState, path: &Path, data: &[u8]) {
        warn!(
            version = state.version,
            current = self.registry.current_version,
            "future state version detected, normalizing"
        );

        let backup = future_backup_path(path, state.version);
        if let Err(e) = std::fs::write(&backup, data) {
            warn!(path = %backup.display(), error = %e, "failed to write backup");
        }

        state.version = self.registry.current_version;
        if let Err(e) = self.save(path, state) {
            warn!(path = %path.display(), error = %e, "failed to save normalized state");
        }
    }

    /// Serializes `state` as JSON and atomically writes it to `path`.
    pub fn save(&self, path: &Path, state: &SessionState) -> Result<()> {
        let data = serde_json::to_vec(state)?;
        atomicfile::write(path, &data, 0o600)
    }
}

fn corrupted_backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".corrupted");
    PathBuf::from(name)
}

fn future_backup_path(path: &Path, version: u32) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".v{version}.bak"));
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::{Migration, Registry};

    fn write_state(dir: &Path, name: &str, json: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.claude-code.json");

        let store = SessionStore::new();
        let mut state = SessionState::fresh();
        state.session_id = "abc".to_string();
        state.project = "demo".to_string();
        state.last_activity = 1700000000;
        store.save(&path, &state).unwrap();

        let loaded = store.read(&path).unwrap();
        assert!(loaded.recovered.is_none());
        assert_eq!(loaded.state, state);
    }

    #[test]
    fn test_read_missing_optional_fields_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_state(
            dir.path(),
            "state.json",
            r#"{"$version":1,"project":"demo","lastActivity":5}"#,
        );

        let loaded = SessionStore::new().read(&path).unwrap();
        assert_eq!(loaded.state.project, "demo");
        assert_eq!(loaded.state.last_activity, 5);
        assert_eq!(loaded.state.tool_name, "");
        assert!(!loaded.state.stopped);
    }

    #[test]
    fn test_read_corrupted_recovers_with_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_state(dir.path(), "state.json", "{not json");

        let loaded = SessionStore::new().read(&path).unwrap();

        // Fresh state at the current version, flagged as recovered.
        assert!(loaded.recovered.is_some());
        assert_eq!(loaded.state.version, CURRENT_VERSION);
        assert_eq!(loaded.state.project, "");

        // Original bytes are recoverable from the backup.
        let backup = dir.path().join("state.json.corrupted");
        assert_eq!(std::fs::read(&backup).unwrap(), b"{not json");

        // The state file itself was replaced with a parseable record.
        let reread = SessionStore::new().read(&path).unwrap();
        assert!(reread.recovered.is_none());
    }

    #[test]
    fn test_read_zero_version_normalizes_to_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_state(dir.path(), "state.json", r#"{"project":"p"}"#);

        let loaded = SessionStore::new().read(&path).unwrap();
        assert_eq!(loaded.state.version, 1);
    }

    #[test]
    fn test_read_future_version_archives_and_normalizes() {
        let dir = tempfile::tempdir().unwrap();
        let original = r#"{"$version":9,"project":"fromthefuture"}"#;
        let path = write_state(dir.path(), "state.json", original);

        let loaded = SessionStore::new().read(&path).unwrap();
        assert!(loaded.recovered.is_none());
        assert_eq!(loaded.state.version, CURRENT_VERSION);
        assert_eq!(loaded.state.project, "fromthefuture");

        // Original bytes archived under the versioned backup name.
        let backup = dir.path().join("state.json.v9.bak");
        assert_eq!(std::fs::read(&backup).unwrap(), original.as_bytes());

        // On-disk record now carries the current version.
        let on_disk: SessionState =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(on_disk.version, CURRENT_VERSION);
    }

    #[test]
    fn test_read_applies_registered_migrations() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_state(
            dir.path(),
            "state.json",
            r#"{"$version":1,"project":"old-name"}"#,
        );

        let mut registry = Registry::new(2);
        registry.register(Migration::new(2, "rename project", |data| {
            let mut v: serde_json::Value = serde_json::from_slice(data)?;
            v["project"] = serde_json::Value::String("new-name".to_string());
            Ok(serde_json::to_vec(&v)?)
        }));

        let loaded = SessionStore::with_registry(registry).read(&path).unwrap();
        assert_eq!(loaded.state.version, 2);
        assert_eq!(loaded.state.project, "new-name");
    }

    #[test]
    fn test_read_migration_failure_is_fatal_for_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_state(dir.path(), "state.json", r#"{"$version":1}"#);

        let mut registry = Registry::new(2);
        registry.register(Migration::new(2, "always fails", |_| {
            Err(Error::migration("boom"))
        }));

        let err = SessionStore::with_registry(registry).read(&path).unwrap_err();
        assert!(matches!(err, Error::Migration { .. }));
    }

    #[test]
    fn test_read_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SessionStore::new()
            .read(&dir.path().join("absent.json"))
            .unwrap_err();
        assert!(matches!(err, Error::StateRead { .. }));
    }

    #[test]
    fn test_peek_version() {
        assert_eq!(peek_version(br#"{"$version":4}"#).unwrap(), 4);
        assert_eq!(peek_version(br#"{"project":"x"}"#).unwrap(), 1);
        assert!(peek_version(b"garbage").is_err());
    }

    #[test]
    fn test_peek_version_ignores_unparseable_body_fields() {
        // Only the version field matters; extra unknown fields are fine.
        let data = br#"{"$version":2,"whatever":{"deep":[1,2,3]}}"#;
        assert_eq!(peek_version(data).unwrap(), 2);
    }
}
