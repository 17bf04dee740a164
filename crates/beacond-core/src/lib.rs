//! # beacond-core - Core Domain Types and Engines
//!
//! Foundation crate for beacond. Provides the session state store, the
//! presence engine, configuration, remote pricing/tier data, and the shared
//! error and logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on
//! external crates (serde, chrono, thiserror, regex, tracing, reqwest).
//!
//! ## Public API
//!
//! ### State (`session`)
//! - [`SessionState`] - One tool integration's persisted session snapshot
//! - [`SessionStore`] - Crash-safe reads: corruption recovery, migrations,
//!   future-version normalization
//!
//! ### Presence (`presence`)
//! - [`Presence`] - The payload transmitted to the presence service
//! - [`PresenceConfig`] - Templates, thresholds, idle behavior
//! - [`build_presence()`] - State + config -> payload (or nothing)
//!
//! ### Configuration (`config`)
//! - [`Config`] - TOML-backed daemon configuration with validation
//!
//! ### Remote data (`pricing`, `tiers`)
//! - [`PricingData`] - Per-token model costs with cache fallback
//! - [`TierData`] - Model tier names used for overlay icons
//!
//! ### Support
//! - [`error::Error`] / [`error::Result`] - Error taxonomy with
//!   fatal/recoverable classification
//! - [`atomicfile`] - Write-temp-then-rename file replacement
//! - [`migrate`] - Ordered, pure schema migrations
//! - [`paths`] - Data-directory layout
//! - [`logging`] - Rolling file logs under the data directory
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use beacond_core::prelude::*;
//! ```

pub mod atomicfile;
pub mod config;
pub mod error;
pub mod jsonl;
pub mod logging;
pub mod migrate;
pub mod paths;
pub mod presence;
pub mod pricing;
pub mod session;
pub mod tiers;

/// Prelude for common imports used throughout all beacond crates
pub mod prelude {
    pub use super::error::{Error, Result};
    pub use tracing::{debug, error, info, trace, warn};
}

// Re-export commonly used types at crate root for convenience
pub use config::Config;
pub use error::{Error, Result};
pub use jsonl::{JsonlCache, JsonlData};
pub use paths::DataPaths;
pub use presence::{build_presence, Presence, PresenceConfig};
pub use pricing::PricingData;
pub use session::{SessionState, SessionStore, CURRENT_VERSION};
pub use tiers::TierData;
