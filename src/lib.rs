//! session-beacon - mirrors coding-agent session activity onto Discord
//! Rich Presence over the local IPC channel.
//!
//! This is the orchestration library for the `beacond` binary. The domain
//! engines live in `beacond-core`, the protocol client in `beacond-ipc`;
//! this crate ties them together:
//!
//! - [`watcher`] - state-directory change detection with polling fallback
//! - [`resolver`] - picks the most recently active session record
//! - [`daemon`] - the event loop, single-instance PID lock, and signal
//!   handling

pub mod daemon;
pub mod resolver;
pub mod watcher;

pub use daemon::Daemon;
pub use watcher::StateWatcher;
