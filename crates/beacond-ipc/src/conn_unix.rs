//! Discord IPC socket discovery for Unix-like systems (Linux, macOS, BSD).
//!
//! Probes `$XDG_RUNTIME_DIR`, `/tmp`, Snap, and Flatpak socket paths for
//! each Discord variant (stable, Canary, PTB) across slots 0-9, taking the
//! first path that accepts a connection. Dialing a missing path is cheap,
//! so the candidate list is not deduplicated.

use std::path::PathBuf;
use std::time::Duration;

use tokio::net::UnixStream;
use tokio::time::timeout;

use crate::error::IpcError;

/// The connection type used on this platform.
pub type Endpoint = UnixStream;

/// Number of IPC socket slots the service may listen on (0-9).
const MAX_IPC_SLOTS: u32 = 10;

/// Per-path connection attempt budget.
const DIAL_TIMEOUT: Duration = Duration::from_millis(500);

/// Socket name prefixes for Discord variants (stable, Canary, PTB).
const VARIANTS: &[&str] = &["discord-ipc", "discordcanary-ipc", "discordptb-ipc"];

/// Builds the ordered list of candidate socket paths.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // XDG_RUNTIME_DIR is the preferred runtime directory on most systems.
    if let Ok(dir) = std::env::var("XDG_RUNTIME_DIR") {
        if !dir.is_empty() {
            for v in VARIANTS {
                for i in 0..MAX_IPC_SLOTS {
                    paths.push(PathBuf::from(&dir).join(format!("{v}-{i}")));
                }
            }
        }
    }

    // /tmp fallback for systems without XDG_RUNTIME_DIR.
    for v in VARIANTS {
        for i in 0..MAX_IPC_SLOTS {
            paths.push(PathBuf::from("/tmp").join(format!("{v}-{i}")));
        }
    }

    let uid = uid_string();

    // Snap-packaged Discord uses a distinct socket directory.
    for sd in ["snap.discord", "snap.discord-canary", "snap.discord-ptb"] {
        for i in 0..MAX_IPC_SLOTS {
            paths.push(PathBuf::from(format!(
                "/run/user/{uid}/{sd}/discord-ipc-{i}"
            )));
        }
    }

    // Flatpak-packaged Discord uses its own app-scoped directory.
    for app in [
        "com.discordapp.Discord",
        "com.discordapp.DiscordCanary",
        "com.discordapp.DiscordPTB",
    ] {
        for i in 0..MAX_IPC_SLOTS {
            paths.push(PathBuf::from(format!(
                "/run/user/{uid}/app/{app}/discord-ipc-{i}"
            )));
        }
    }

    paths
}

fn uid_string() -> String {
    // SAFETY: getuid has no preconditions and cannot fail.
    let uid = unsafe { libc::getuid() };
    uid.to_string()
}

/// Tries each candidate socket path and returns the first successful
/// connection.
pub async fn connect_endpoint() -> Result<Endpoint, IpcError> {
    for path in candidate_paths() {
        if let Ok(Ok(stream)) = timeout(DIAL_TIMEOUT, UnixStream::connect(&path)).await {
            return Ok(stream);
        }
    }
    Err(IpcError::NotAvailable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_paths_cover_tmp_slots() {
        let paths = candidate_paths();
        for i in 0..MAX_IPC_SLOTS {
            let expected = PathBuf::from(format!("/tmp/discord-ipc-{i}"));
            assert!(paths.contains(&expected), "missing {expected:?}");
        }
    }

    #[test]
    fn test_candidate_paths_include_variants() {
        let paths = candidate_paths();
        let as_strings: Vec<String> = paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        assert!(as_strings.iter().any(|p| p.contains("discordcanary-ipc")));
        assert!(as_strings.iter().any(|p| p.contains("snap.discord")));
        assert!(as_strings.iter().any(|p| p.contains("com.discordapp.Discord")));
    }
}
