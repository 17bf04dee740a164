//! Single-instance enforcement through a locked PID file.
//!
//! The PID file holds `<pid>:<16-hex-token>` under an OS advisory
//! exclusive lock (flock on Unix, LockFileEx on Windows, via fs2). A
//! failed lock means a live instance holds it; a successful lock over
//! existing content means the previous owner died. The random token proves
//! ownership at removal time, guarding against a second instance that
//! raced past the check and rewrote the file.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use rand::RngCore;
use tracing::debug;

use beacond_core::error::{Error, Result};

/// Holds the lock (and the open handle) for the daemon's lifetime.
#[derive(Debug)]
pub struct PidFile {
    file: File,
    token: String,
    path: PathBuf,
}

/// Generates the random 16-hex-char ownership token.
fn pid_token() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Checks whether another daemon instance is running.
///
/// Attempts the advisory lock; if it fails another instance holds it and
/// the stored PID is returned. If the lock succeeds, any previous owner is
/// dead and the stale file is removed.
pub fn check_stale(path: &Path) -> Option<u32> {
    let file = OpenOptions::new().read(true).write(true).open(path).ok()?;

    if file.try_lock_exclusive().is_err() {
        let pid = std::fs::read_to_string(path)
            .ok()
            .and_then(|content| {
                content
                    .split(':')
                    .next()
                    .and_then(|p| p.trim().parse::<u32>().ok())
            })
            .unwrap_or(0);
        return Some(pid);
    }

    // Lock acquired: the previous instance is dead. Clean up the stale file.
    let _ = fs2::FileExt::unlock(&file);
    drop(file);
    let _ = std::fs::remove_file(path);
    None
}

/// Creates (or opens) the PID file, takes the exclusive non-blocking lock,
/// and overwrites any stale content with `<pid>:<token>`.
pub fn acquire(path: &Path) -> Result<PidFile> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| Error::Lock {
            path: path.to_path_buf(),
            source: e,
        })?;

    file.try_lock_exclusive().map_err(|e| Error::Lock {
        path: path.to_path_buf(),
        source: e,
    })?;

    // Any existing content belonged to a dead process.
    file.set_len(0)?;
    let mut writer = &file;
    writer.seek(SeekFrom::Start(0))?;
    let token = pid_token();
    write!(writer, "{}:{}", std::process::id(), token)?;
    writer.flush()?;

    Ok(PidFile {
        file,
        token,
        path: path.to_path_buf(),
    })
}

impl PidFile {
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Releases the lock and deletes the file, but only when the stored
    /// token still matches what this instance wrote.
    pub fn release(self) {
        let mut content = String::new();
        let mut reader = &self.file;
        let read_ok = reader.seek(SeekFrom::Start(0)).is_ok()
            && reader.read_to_string(&mut content).is_ok();

        let _ = fs2::FileExt::unlock(&self.file);
        drop(self.file);

        if !read_ok {
            return;
        }
        match content.split_once(':') {
            Some((_, token)) if token == self.token => {
                let _ = std::fs::remove_file(&self.path);
            }
            _ => {
                debug!(path = %self.path.display(), "pid file rewritten by another instance, leaving it");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_writes_pid_and_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beacond.pid");

        let pid_file = acquire(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let (pid, token) = content.split_once(':').unwrap();
        assert_eq!(pid.parse::<u32>().unwrap(), std::process::id());
        assert_eq!(token.len(), 16);
        assert_eq!(token, pid_file.token());

        pid_file.release();
        assert!(!path.exists());
    }

    #[test]
    fn test_check_stale_detects_live_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beacond.pid");

        let pid_file = acquire(&path).unwrap();
        // flock treats separate descriptors independently, so a second open
        // in the same process still observes the conflict.
        let live = check_stale(&path);
        assert_eq!(live, Some(std::process::id()));

        pid_file.release();
        assert_eq!(check_stale(&path), None);
    }

    #[test]
    fn test_check_stale_cleans_up_dead_instance_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beacond.pid");

        // Unlocked leftover content from a crashed instance.
        std::fs::write(&path, "12345:deadbeefdeadbeef").unwrap();
        assert_eq!(check_stale(&path), None);
        assert!(!path.exists());
    }

    #[test]
    fn test_check_stale_missing_file_means_no_instance() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(check_stale(&dir.path().join("beacond.pid")), None);
    }

    #[test]
    fn test_release_leaves_file_rewritten_by_other_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beacond.pid");

        let pid_file = acquire(&path).unwrap();
        // Simulate a racing instance that rewrote the file.
        std::fs::write(&path, "999:0123456789abcdef").unwrap();

        pid_file.release();
        assert!(path.exists(), "foreign pid file must not be deleted");
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "999:0123456789abcdef"
        );
    }
}
