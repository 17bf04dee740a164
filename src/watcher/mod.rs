//! State-directory change detection.
//!
//! Watches the data directory for writes to state files (`state.json` or
//! `state.<client>.json`) using native OS notifications, with a stat-based
//! polling fallback when native registration fails or errors at runtime.
//!
//! The event channel holds exactly one slot and writes are send-or-drop,
//! so N rapid mutations coalesce into at most one pending wake-up.
//! Consumers must not assume one signal per mutation.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use beacond_core::paths::is_state_file;

/// Default interval between stat scans in polling mode.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// How often the supervisor thread re-checks the closed flag while the
/// native watcher is healthy.
const SUPERVISE_TICK: Duration = Duration::from_millis(200);

/// Watches a directory for state-file changes.
pub struct StateWatcher {
    events: mpsc::Receiver<()>,
    closed: Arc<AtomicBool>,
    polling: Arc<AtomicBool>,
}

impl StateWatcher {
    /// Starts watching `dir` with the default polling interval.
    pub fn watch_dir(dir: &Path) -> Self {
        Self::with_poll_interval(dir, DEFAULT_POLL_INTERVAL)
    }

    /// Starts watching `dir`, polling at `poll_interval` when degraded.
    ///
    /// Creation never fails: if native registration is unavailable the
    /// watcher starts in polling mode immediately.
    pub fn with_poll_interval(dir: &Path, poll_interval: Duration) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let closed = Arc::new(AtomicBool::new(false));
        let polling = Arc::new(AtomicBool::new(false));

        let supervisor = SupervisorState {
            dir: dir.to_path_buf(),
            tx,
            closed: Arc::clone(&closed),
            polling: Arc::clone(&polling),
            poll_interval,
        };
        tokio::task::spawn_blocking(move || supervise(supervisor));

        Self {
            events: rx,
            closed,
            polling,
        }
    }

    /// Receives the next change signal. Returns `None` once the watcher has
    /// shut down and all pending signals were drained.
    pub async fn recv(&mut self) -> Option<()> {
        self.events.recv().await
    }

    /// Reports whether the watcher is using polling instead of native
    /// notifications.
    pub fn polling(&self) -> bool {
        self.polling.load(Ordering::SeqCst)
    }

    /// Stops the watcher. Idempotent; no new signals are emitted after the
    /// close flag is observed by the background thread.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl Drop for StateWatcher {
    fn drop(&mut self) {
        self.close();
    }
}

struct SupervisorState {
    dir: PathBuf,
    tx: mpsc::Sender<()>,
    closed: Arc<AtomicBool>,
    polling: Arc<AtomicBool>,
    poll_interval: Duration,
}

/// Runs on a blocking thread for the watcher's lifetime: holds the native
/// watcher while it is healthy and switches to the polling loop when it
/// fails. Exits when the closed flag is set, dropping the last sender so
/// the consumer's channel closes.
fn supervise(state: SupervisorState) {
    let degraded = Arc::new(AtomicBool::new(false));

    match register_native(&state, &degraded) {
        Some(watcher) => {
            while !state.closed.load(Ordering::SeqCst) && !degraded.load(Ordering::SeqCst) {
                std::thread::sleep(SUPERVISE_TICK);
            }
            drop(watcher);
            if state.closed.load(Ordering::SeqCst) {
                return;
            }
            info!("native watcher failed, switching to polling");
        }
        None => {
            info!("native notifications unavailable, falling back to polling");
        }
    }

    state.polling.store(true, Ordering::SeqCst);
    poll_loop(&state);
}

/// Registers the native notification watcher. Returns `None` when either
/// creation or directory registration fails.
fn register_native(
    state: &SupervisorState,
    degraded: &Arc<AtomicBool>,
) -> Option<notify::RecommendedWatcher> {
    let tx = state.tx.clone();
    let closed = Arc::clone(&state.closed);
    let degraded_cb = Arc::clone(degraded);

    let handler = move |res: notify::Result<Event>| match res {
        Ok(event) => {
            if closed.load(Ordering::SeqCst) {
                return;
            }
            if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                return;
            }
            if event.paths.iter().any(is_state_path) {
                // Send-or-drop: a pending signal already covers this burst.
                let _ = tx.try_send(());
            }
        }
        Err(e) => {
            warn!("native watcher error: {e}");
            degraded_cb.store(true, Ordering::SeqCst);
        }
    };

    let mut watcher = match notify::recommended_watcher(handler) {
        Ok(w) => w,
        Err(e) => {
            debug!("creating native watcher failed: {e}");
            return None;
        }
    };
    if let Err(e) = watcher.watch(&state.dir, RecursiveMode::NonRecursive) {
        debug!("watching {} failed: {e}", state.dir.display());
        return None;
    }
    Some(watcher)
}

fn is_state_path(path: &PathBuf) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(is_state_file)
}

/// Stat-based fallback: compares the newest modification time among state
/// files against the previously observed value.
fn poll_loop(state: &SupervisorState) {
    let mut last_mod = latest_state_mod(&state.dir);

    loop {
        if state.closed.load(Ordering::SeqCst) {
            return;
        }
        std::thread::sleep(state.poll_interval);
        if state.closed.load(Ordering::SeqCst) {
            return;
        }

        let current = latest_state_mod(&state.dir);
        if current > last_mod {
            last_mod = current;
            let _ = state.tx.try_send(());
        }
    }
}

/// Returns the most recent modification time among state files in `dir`.
fn latest_state_mod(dir: &Path) -> Option<SystemTime> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut latest: Option<SystemTime> = None;
    for entry in entries.flatten() {
        if !entry.file_name().to_str().is_some_and(is_state_file) {
            continue;
        }
        let Ok(meta) = entry.metadata() else { continue };
        if meta.is_dir() {
            continue;
        }
        let Ok(modified) = meta.modified() else { continue };
        if latest.map_or(true, |l| modified > l) {
            latest = Some(modified);
        }
    }
    latest
}
