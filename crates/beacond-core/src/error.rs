//! Application error types with rich context

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // State Store Errors
    // ─────────────────────────────────────────────────────────────
    #[error("corrupted state file (backed up to {}): {reason}", backup.display())]
    CorruptedState { backup: PathBuf, reason: String },

    #[error("state migration failed: {message}")]
    Migration { message: String },

    #[error("reading state file {}: {source}", path.display())]
    StateRead {
        path: PathBuf,
        source: std::io::Error,
    },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("invalid configuration: {message}")]
    ConfigInvalid { message: String },

    // ─────────────────────────────────────────────────────────────
    // Presence / IPC Errors
    // ─────────────────────────────────────────────────────────────
    #[error("presence IPC error: {message}")]
    Ipc { message: String },

    // ─────────────────────────────────────────────────────────────
    // Remote Data Errors
    // ─────────────────────────────────────────────────────────────
    #[error("pricing data unavailable: {message}")]
    Pricing { message: String },

    #[error("tier data unavailable: {message}")]
    Tiers { message: String },

    // ─────────────────────────────────────────────────────────────
    // Daemon Lifecycle Errors
    // ─────────────────────────────────────────────────────────────
    #[error("daemon already running (pid {pid})")]
    AlreadyRunning { pid: u32 },

    #[error("lock error on {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("watcher error: {message}")]
    Watcher { message: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn migration(message: impl Into<String>) -> Self {
        Self::Migration {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            message: message.into(),
        }
    }

    pub fn ipc(message: impl Into<String>) -> Self {
        Self::Ipc {
            message: message.into(),
        }
    }

    pub fn pricing(message: impl Into<String>) -> Self {
        Self::Pricing {
            message: message.into(),
        }
    }

    pub fn tiers(message: impl Into<String>) -> Self {
        Self::Tiers {
            message: message.into(),
        }
    }

    pub fn watcher(message: impl Into<String>) -> Self {
        Self::Watcher {
            message: message.into(),
        }
    }

    /// Check if this error can be recovered from without restarting the daemon
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::CorruptedState { .. }
                | Error::Ipc { .. }
                | Error::Watcher { .. }
                | Error::StateRead { .. }
        )
    }

    /// Check if this error should trigger process exit
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::AlreadyRunning { .. }
                | Error::Lock { .. }
                | Error::ConfigInvalid { .. }
                | Error::Pricing { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = Error::ipc("connection refused");
        assert_eq!(err.to_string(), "presence IPC error: connection refused");

        let err = Error::AlreadyRunning { pid: 42 };
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_is_fatal() {
        assert!(Error::AlreadyRunning { pid: 1 }.is_fatal());
        assert!(Error::config_invalid("bad idle_mode").is_fatal());
        assert!(!Error::ipc("transient").is_fatal());
    }

    #[test]
    fn test_error_is_recoverable() {
        assert!(Error::ipc("write failed").is_recoverable());
        assert!(Error::watcher("notify died").is_recoverable());
        assert!(!Error::AlreadyRunning { pid: 1 }.is_recoverable());
    }
}
