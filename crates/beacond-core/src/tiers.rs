//! Model tier data: which overlay icon represents a given model family.
//!
//! Tiers are organized per client: each client tool (claude-code, cursor,
//! ...) carries its own ordered tier set and default icon. Data loads with
//! fallback: remote URL (when configured) -> local cache -> built-in
//! defaults, so a fresh install without network access still shows icons
//! for the stock clients.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::atomicfile;
use crate::error::{Error, Result};
use crate::paths;

// ─────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────

/// Tier configuration for a single client tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientTiers {
    /// Asset key used for unrecognized models within this client.
    /// Empty falls back to the global [`TierData::default_icon`].
    pub default_icon: String,
    /// Ordered tier names matched (by prefix) against stripped model IDs.
    pub tiers: Vec<String>,
}

/// Model tier configuration for all clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TierData {
    /// Asset key used for unrecognized models.
    pub default_icon: String,
    /// Per-client tier configuration keyed by client id.
    pub clients: HashMap<String, ClientTiers>,
}

impl Default for TierData {
    fn default() -> Self {
        Self {
            default_icon: "default".to_string(),
            clients: HashMap::new(),
        }
    }
}

impl TierData {
    /// Built-in tier data covering the stock client integrations. Used when
    /// neither the remote source nor the cache is available.
    pub fn builtin() -> Self {
        let mut clients = HashMap::new();
        clients.insert(
            "claude-code".to_string(),
            ClientTiers {
                default_icon: String::new(),
                tiers: vec![
                    "opus".to_string(),
                    "sonnet".to_string(),
                    "haiku".to_string(),
                ],
            },
        );
        Self {
            default_icon: "default".to_string(),
            clients,
        }
    }

    /// Returns the effective default icon for a client: the client's own
    /// icon when set, otherwise the global one.
    pub fn default_icon_for_client(&self, client: &str) -> String {
        match self.clients.get(client) {
            Some(c) if !c.default_icon.is_empty() => c.default_icon.clone(),
            _ => self.default_icon.clone(),
        }
    }

    /// Returns the tier names for a client, empty when the client is unknown.
    pub fn tier_names_for_client(&self, client: &str) -> Vec<String> {
        self.clients
            .get(client)
            .map(|c| c.tiers.clone())
            .unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────
// Loading
// ─────────────────────────────────────────────────────────────────

/// Loads tier data with fallback: remote (when `url` is non-empty) ->
/// cache -> built-in defaults. Never fails; the built-in set is the floor.
pub async fn load(client: &reqwest::Client, url: &str, data_dir: &Path) -> TierData {
    if url.is_empty() {
        debug!("no remote tier URL configured, using cache or builtin");
    } else {
        match fetch_remote(client, url).await {
            Ok(data) => {
                cache_write(data_dir, &data);
                return data;
            }
            Err(e) => warn!("remote tier fetch failed: {e}"),
        }
    }

    match cache_read(data_dir) {
        Ok(data) => {
            debug!("using cached tier data");
            data
        }
        Err(e) => {
            debug!("no tier cache available ({e}), using builtin tiers");
            TierData::builtin()
        }
    }
}

async fn fetch_remote(client: &reqwest::Client, url: &str) -> Result<TierData> {
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::tiers(format!("GET {url}: {e}")))?;

    if !resp.status().is_success() {
        return Err(Error::tiers(format!(
            "GET {url}: status {}",
            resp.status().as_u16()
        )));
    }

    let body = resp
        .bytes()
        .await
        .map_err(|e| Error::tiers(format!("reading response: {e}")))?;
    if body.len() > 1 << 20 {
        return Err(Error::tiers("tier response exceeds 1 MiB"));
    }

    serde_json::from_slice(&body).map_err(|e| Error::tiers(format!("parsing response: {e}")))
}

fn cache_write(data_dir: &Path, data: &TierData) {
    let path = data_dir.join(paths::TIERS_CACHE_FILE);
    match serde_json::to_vec(data) {
        Ok(bytes) => {
            if let Err(e) = atomicfile::write(&path, &bytes, 0o644) {
                debug!("failed to write tier cache: {e}");
            }
        }
        Err(e) => debug!("failed to marshal tier data for cache: {e}"),
    }
}

fn cache_read(data_dir: &Path) -> Result<TierData> {
    let path = data_dir.join(paths::TIERS_CACHE_FILE);
    let bytes = std::fs::read(&path)
        .map_err(|e| Error::tiers(format!("reading tier cache {}: {e}", path.display())))?;
    serde_json::from_slice(&bytes).map_err(|e| Error::tiers(format!("parsing tier cache: {e}")))
}
