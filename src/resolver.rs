//! Multi-session resolution: which state record drives the presence.
//!
//! Hooks write one `state.<client>.json` per tool integration. The record
//! with the most recent activity wins; unreadable files are skipped with a
//! diagnostic so one bad integration never blanks the others.

use std::path::Path;

use beacond_core::paths;
use beacond_core::prelude::*;
use beacond_core::session::{SessionState, SessionStore};

/// Reports whether `name` is a per-client state file (legacy `state.json`
/// excluded — it is the fallback, not a scan candidate).
fn is_per_client_state_file(name: &str) -> bool {
    name != paths::STATE_FILE && paths::is_state_file(name)
}

/// Scans `dir` for per-client state files and returns the record with the
/// numerically greatest `lastActivity`.
///
/// Files are visited in lexicographic name order and the comparison is
/// strictly greater, so equal timestamps resolve to the lexicographically
/// smallest client id. Falls back to the legacy `state.json` when no
/// per-client file exists.
pub fn find_latest_state(store: &SessionStore, dir: &Path) -> Result<SessionState> {
    let mut names: Vec<String> = std::fs::read_dir(dir)?
        .flatten()
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .filter(|n| is_per_client_state_file(n))
        .collect();
    names.sort();

    let mut best: Option<SessionState> = None;
    for name in names {
        let path = dir.join(&name);
        let loaded = match store.read(&path) {
            Ok(loaded) => loaded,
            Err(e) => {
                debug!(path = %path.display(), "skipping unreadable state file: {e}");
                continue;
            }
        };
        if let Some(recovery) = &loaded.recovered {
            debug!(path = %path.display(), "state file recovered with warning: {recovery}");
        }
        if best
            .as_ref()
            .map_or(true, |b| loaded.state.last_activity > b.last_activity)
        {
            best = Some(loaded.state);
        }
    }

    if let Some(best) = best {
        return Ok(best);
    }

    // No per-client files: fall back to the legacy single state file.
    let loaded = store.read(&dir.join(paths::STATE_FILE))?;
    if let Some(recovery) = &loaded.recovered {
        debug!("legacy state file recovered with warning: {recovery}");
    }
    Ok(loaded.state)
}
