//! The daemon event loop.
//!
//! Owns the process lifecycle after startup: an initial synchronous
//! resolve-and-publish, then a select over the shutdown signal, watcher
//! events, and the poll ticker. Every resolve rebuilds the presence
//! payload and publishes it only when its content hash changed. The ticker
//! arm additionally runs orphan-session cleanup, the daemon-wide idle
//! timeout, and reconnect-with-bounded-retry.

pub mod pidfile;
pub mod signals;

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use beacond_core::config::{self, ClientConfig, Config};
use beacond_core::jsonl::{self, JsonlCache, JsonlData};
use beacond_core::prelude::*;
use beacond_core::presence::{build_presence, Presence, PresenceConfig};
use beacond_core::session::{SessionState, SessionStore};
use beacond_core::tiers::TierData;
use beacond_core::{DataPaths, PricingData};
use beacond_ipc::Client;

use crate::resolver;
use crate::watcher::StateWatcher;

/// Upper bound on connection attempts per retry chain.
const MAX_CONNECT_ATTEMPTS: u32 = 10;

/// How often orphan-session cleanup may actually scan, regardless of tick
/// frequency.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(600);

// ─────────────────────────────────────────────────────────────────
// Loop State
// ─────────────────────────────────────────────────────────────────

/// Mutable state carried across iterations of the event loop. Touched only
/// from the loop's single thread of control.
struct LoopState {
    /// Unix timestamp of daemon startup, used by the "daemon" timestamp
    /// mode so the elapsed timer reflects total uptime.
    daemon_start_unix: i64,
    /// When the most recent non-empty presence was published; drives the
    /// daemon idle timeout.
    last_activity_time: Option<Instant>,
    /// Most recently published payload, retained so the "last_activity"
    /// idle mode can keep showing it after the session goes quiet.
    last_presence: Option<Presence>,
    /// Hash of the last payload sent, for duplicate suppression.
    last_hash: String,
    /// Whether presence has already been cleared for the current idle
    /// period, preventing repeated clear commands.
    idle_cleared: bool,
    /// When orphan cleanup last ran.
    last_cleanup: Option<Instant>,
    /// Client id from the most recently processed state, to detect
    /// switches that may require a different application identity.
    active_client: String,
    /// Application id currently in use on the IPC connection.
    active_app_id: String,
    /// Incremental parser for the active conversation log.
    jsonl_cache: Option<JsonlCache>,
}

impl LoopState {
    fn new(app_id: String) -> Self {
        Self {
            daemon_start_unix: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or_default(),
            last_activity_time: None,
            last_presence: None,
            last_hash: String::new(),
            idle_cleared: false,
            last_cleanup: None,
            active_client: String::new(),
            active_app_id: app_id,
            jsonl_cache: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Config Assembly
// ─────────────────────────────────────────────────────────────────

/// Assembles the flat [`PresenceConfig`] the engine consumes from the
/// loaded config and tier data. `client` selects which client's tier set
/// to use; pass "" at startup (tiers are re-resolved once the active
/// client is known).
pub fn build_presence_config(cfg: &Config, tiers: &TierData, client: &str) -> PresenceConfig {
    PresenceConfig {
        details_format: cfg.display.details.clone(),
        state_format: cfg.display.state.clone(),
        details_no_branch_format: cfg.display.details_no_branch.clone(),
        state_no_cost_format: cfg.display.state_no_cost.clone(),
        cost_format: cfg.display.format.cost_format.clone(),
        token_format: cfg.display.format.token_format.clone(),
        model_format: cfg.display.format.model_name.clone(),
        project_name: String::new(),
        ignored_patterns: cfg.privacy.ignore.clone(),
        large_image: cfg.display.assets.large_image.clone(),
        large_text: cfg.display.assets.large_text.clone(),
        show_model_icon: cfg.display.assets.show_model_icon,
        show_repo_button: cfg.display.buttons.show_repo_button,
        repo_button_label: cfg.display.buttons.repo_button_label.clone(),
        custom_button_label: cfg.display.buttons.custom_button_label.clone(),
        custom_button_url: cfg.display.buttons.custom_button_url.clone(),
        show_cost: cfg.behavior.show_cost,
        show_tokens: cfg.behavior.show_tokens,
        show_branch: cfg.behavior.show_branch,
        timestamp_mode: cfg.display.timestamps.mode.clone(),
        idle_minutes: cfg.behavior.presence_idle_minutes,
        model_tiers: tiers.tier_names_for_client(client),
        default_tier_icon: tiers.default_icon_for_client(client),
        cost_show_threshold: cfg.behavior.cost_show_threshold,
        tokens_show_threshold: cfg.behavior.tokens_show_threshold,
        idle_mode: cfg.behavior.idle_mode.clone(),
        idle_details: cfg.behavior.idle_details.clone(),
        idle_state: cfg.behavior.idle_state.clone(),
    }
}

/// Converts an engine payload into the IPC wire type, omitting empty
/// optional sections.
fn to_wire_activity(p: &Presence) -> beacond_ipc::Activity {
    let mut wire = beacond_ipc::Activity {
        details: p.details.clone(),
        state: p.state.clone(),
        ..beacond_ipc::Activity::default()
    };
    if p.timestamps.start != 0 {
        wire.timestamps = Some(beacond_ipc::Timestamps {
            start: p.timestamps.start,
        });
    }
    let a = &p.assets;
    if !a.large_image.is_empty()
        || !a.large_text.is_empty()
        || !a.small_image.is_empty()
        || !a.small_text.is_empty()
    {
        wire.assets = Some(beacond_ipc::Assets {
            large_image: a.large_image.clone(),
            large_text: a.large_text.clone(),
            small_image: a.small_image.clone(),
            small_text: a.small_text.clone(),
        });
    }
    for b in &p.buttons {
        wire.buttons.push(beacond_ipc::Button {
            label: b.label.clone(),
            url: b.url.clone(),
        });
    }
    wire
}

/// Applies per-client display overrides to the presence config.
fn apply_client_overrides(pcfg: &mut PresenceConfig, cc: &ClientConfig) {
    if !cc.large_image.is_empty() {
        pcfg.large_image = cc.large_image.clone();
    }
    if !cc.large_text.is_empty() {
        pcfg.large_text = cc.large_text.clone();
    }
    if !cc.details.is_empty() {
        pcfg.details_format = cc.details.clone();
    }
    if !cc.state.is_empty() {
        pcfg.state_format = cc.state.clone();
    }
}

/// Applies per-client overrides that must land on the built payload:
/// the engine may have written the small image via the model icon, and the
/// override wins.
fn apply_client_presence_overrides(p: &mut Presence, cc: &ClientConfig) {
    if !cc.small_image.is_empty() {
        p.assets.small_image = cc.small_image.clone();
    }
    if !cc.small_text.is_empty() {
        p.assets.small_text = cc.small_text.clone();
    }
}

// ─────────────────────────────────────────────────────────────────
// Connect with Retry
// ─────────────────────────────────────────────────────────────────

/// Attempts to connect the IPC client up to [`MAX_CONNECT_ATTEMPTS`] times,
/// sleeping `interval` between failures.
pub async fn connect_with_retry(client: &Client, interval: Duration) -> Result<()> {
    for attempt in 1..=MAX_CONNECT_ATTEMPTS {
        match client.connect().await {
            Ok(()) => return Ok(()),
            Err(e) => {
                warn!(attempt, "presence service connect attempt failed: {e}");
                if attempt < MAX_CONNECT_ATTEMPTS {
                    tokio::time::sleep(interval).await;
                }
            }
        }
    }
    Err(Error::ipc(format!(
        "failed to connect after {MAX_CONNECT_ATTEMPTS} attempts"
    )))
}

// ─────────────────────────────────────────────────────────────────
// Daemon
// ─────────────────────────────────────────────────────────────────

/// The daemon: IPC client, configuration, remote data, and loop state.
pub struct Daemon {
    pub client: Client,
    cfg: Config,
    pricing: PricingData,
    tiers: TierData,
    paths: DataPaths,
    store: SessionStore,
    presence_cfg: PresenceConfig,
    reconnect_interval: Duration,
    ls: LoopState,
}

impl Daemon {
    pub fn new(
        client: Client,
        cfg: Config,
        pricing: PricingData,
        tiers: TierData,
        paths: DataPaths,
    ) -> Self {
        let presence_cfg = build_presence_config(&cfg, &tiers, "");
        let reconnect_interval = Duration::from_secs(cfg.behavior.reconnect_interval_seconds);
        let ls = LoopState::new(cfg.discord.app_id.clone());
        Self {
            client,
            cfg,
            pricing,
            tiers,
            paths,
            store: SessionStore::new(),
            presence_cfg,
            reconnect_interval,
            ls,
        }
    }

    /// Runs the event loop until a shutdown signal arrives, the daemon idle
    /// timeout fires, or reconnection fails permanently.
    pub async fn run(
        &mut self,
        watcher: &mut StateWatcher,
        shutdown: &mut mpsc::Receiver<()>,
    ) -> Result<()> {
        let poll_interval = Duration::from_secs(self.cfg.behavior.poll_interval_seconds);
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval() fires immediately; consume that tick so the loop below
        // waits a full period.
        ticker.tick().await;

        self.process_state().await;

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("received shutdown signal");
                    return Ok(());
                }

                event = watcher.recv() => {
                    if event.is_none() {
                        warn!("watcher channel closed");
                        return Ok(());
                    }
                    self.process_state().await;
                }

                _ = ticker.tick() => {
                    self.process_state().await;
                    self.cleanup_orphaned_sessions();
                    if self.daemon_idle_exceeded() {
                        return Ok(());
                    }
                    self.ensure_connected().await?;
                }
            }
        }
    }

    /// Resolves the most recently active session, rebuilds the presence,
    /// and publishes it when the content hash changed. Called on every
    /// watcher event and poll tick.
    async fn process_state(&mut self) {
        let state = match resolver::find_latest_state(&self.store, &self.paths.root) {
            Ok(state) => state,
            Err(e) => {
                debug!("state not readable: {e}");
                return;
            }
        };

        if !self.switch_client_if_needed(&state).await {
            return;
        }

        let mut state = state;
        self.apply_privacy_overrides(&mut state);

        if let Some(cc) = self.cfg.clients.get(&state.client) {
            apply_client_overrides(&mut self.presence_cfg, cc);
        }

        let (cost, total_tokens, model, usage) = self.resolve_token_data();
        let mut presence = build_presence(
            &state,
            &self.presence_cfg,
            cost,
            total_tokens,
            &model,
            usage.as_ref(),
        );

        if let Some(p) = presence.as_mut() {
            if let Some(cc) = self.cfg.clients.get(&state.client) {
                apply_client_presence_overrides(p, cc);
            }
            if self.cfg.display.timestamps.mode == "daemon" {
                p.timestamps.start = self.ls.daemon_start_unix;
            }
        }

        let Some(presence) = self.handle_idle(presence).await else {
            return;
        };

        self.ls.idle_cleared = false;
        self.ls.last_activity_time = Some(Instant::now());
        self.ls.last_presence = Some(presence.clone());

        let hash = presence.hash();
        if hash == self.ls.last_hash {
            return;
        }
        self.ls.last_hash = hash;

        let wire = to_wire_activity(&presence);
        if let Err(e) = self.client.set_activity(Some(&wire)).await {
            warn!("failed to set activity: {e}");
            return;
        }
        debug!(details = %presence.details, state = %presence.state, "presence updated");
    }

    /// Handles a change of active client. A switch that requires a
    /// different application identity tears the client down and reconnects
    /// under the new id. Returns false when the switch failed and this
    /// cycle should be abandoned.
    async fn switch_client_if_needed(&mut self, state: &SessionState) -> bool {
        let new_app_id = self.resolve_app_id(&state.client);

        if self.ls.active_client != state.client
            && !self.ls.active_app_id.is_empty()
            && new_app_id != self.ls.active_app_id
        {
            info!(
                old_client = %self.ls.active_client,
                new_client = %state.client,
                new_app_id = %new_app_id,
                "active client changed, reconnecting with new application id"
            );
            self.client.close().await;
            self.client = Client::new(new_app_id.clone());
            if let Err(e) = connect_with_retry(&self.client, self.reconnect_interval).await {
                error!("reconnect with new application id failed: {e}");
                return false;
            }
            self.ls.last_hash.clear();
        }

        // Per-client tier set and icon follow the active client.
        if self.ls.active_client != state.client {
            self.presence_cfg.model_tiers = self.tiers.tier_names_for_client(&state.client);
            self.presence_cfg.default_tier_icon =
                self.tiers.default_icon_for_client(&state.client);
            self.presence_cfg.large_image = config::client_icon(&state.client);
        }
        self.ls.active_client = state.client.clone();
        self.ls.active_app_id = new_app_id;
        true
    }

    /// Returns the application id for a client: the per-client override
    /// when configured, otherwise the global one.
    fn resolve_app_id(&self, client: &str) -> String {
        match self.cfg.clients.get(client) {
            Some(cc) if !cc.app_id.is_empty() => cc.app_id.clone(),
            _ => self.cfg.discord.app_id.clone(),
        }
    }

    /// Resolves project-name aliases and branch display rules into the
    /// presence config and state before building.
    fn apply_privacy_overrides(&mut self, state: &mut SessionState) {
        let project_name = self.cfg.project_name(&state.project, &state.cwd);
        self.presence_cfg.project_name = if project_name != state.project {
            project_name
        } else {
            String::new()
        };
        let branch = self.cfg.format_branch(&state.branch).to_string();
        state.branch = branch;
    }

    /// Finds and incrementally parses the newest conversation log, returning
    /// the computed dollar cost, total token count, model id, and usage.
    /// Zero values when no log is available.
    fn resolve_token_data(&mut self) -> (f64, i64, String, Option<JsonlData>) {
        let dir = self.paths.conversations();
        let latest = match jsonl::find_latest_jsonl(&dir) {
            Ok(path) => path,
            Err(e) => {
                debug!("no conversation log found: {e}");
                return (0.0, 0, String::new(), None);
            }
        };

        if self
            .ls
            .jsonl_cache
            .as_ref()
            .map_or(true, |c| c.path() != latest)
        {
            self.ls.jsonl_cache = Some(JsonlCache::new(&latest));
        }
        let Some(cache) = self.ls.jsonl_cache.as_ref() else {
            return (0.0, 0, String::new(), None);
        };

        let data = match cache.parse() {
            Ok(data) => data,
            Err(e) => {
                debug!("failed to parse conversation log: {e}");
                return (0.0, 0, String::new(), None);
            }
        };

        let model = data.model.clone();
        let total_tokens = data.total_tokens();
        let cost = if self.cfg.behavior.show_cost && !model.is_empty() {
            self.pricing
                .cost(&model, data.input_tokens, data.output_tokens)
        } else {
            0.0
        };
        (cost, total_tokens, model, Some(data))
    }

    /// Implements idle handling for an empty build result. Under
    /// "last_activity" the cached payload is restored; otherwise the
    /// presence is cleared once per idle period.
    async fn handle_idle(&mut self, presence: Option<Presence>) -> Option<Presence> {
        if presence.is_some() {
            return presence;
        }

        if self.presence_cfg.idle_mode == "last_activity" {
            if let Some(last) = self.ls.last_presence.clone() {
                return Some(last);
            }
        }

        if !self.ls.idle_cleared {
            debug!("clearing presence (idle/stopped)");
            if let Err(e) = self.client.clear_activity().await {
                warn!("failed to clear activity: {e}");
            }
            self.ls.idle_cleared = true;
            self.ls.last_hash.clear();
        }
        None
    }

    /// Removes session marker files older than the configured max age.
    /// Rate-limited internally so calling it on every tick is cheap.
    fn cleanup_orphaned_sessions(&mut self) {
        if self
            .ls
            .last_cleanup
            .is_some_and(|t| t.elapsed() < CLEANUP_INTERVAL)
        {
            return;
        }
        self.ls.last_cleanup = Some(Instant::now());

        let dir = self.paths.sessions();
        let Ok(entries) = std::fs::read_dir(&dir) else {
            return; // directory may not exist yet
        };
        let max_age = Duration::from_secs(self.cfg.behavior.session_cleanup_hours * 3600);
        for entry in entries.flatten() {
            let name = entry.file_name();
            if !name
                .to_str()
                .is_some_and(|n| n.ends_with(beacond_core::paths::SESSION_EXT))
            {
                continue;
            }
            let Ok(meta) = entry.metadata() else { continue };
            if meta.is_dir() {
                continue;
            }
            let Ok(modified) = meta.modified() else { continue };
            let expired = modified
                .elapsed()
                .map_or(false, |age| age > max_age);
            if expired && std::fs::remove_file(entry.path()).is_ok() {
                debug!(file = %name.to_string_lossy(), "removed orphaned session marker");
            }
        }
    }

    /// Reports whether the daemon-wide idle timeout has been exceeded. The
    /// host integration is expected to relaunch the daemon on next activity.
    fn daemon_idle_exceeded(&self) -> bool {
        let minutes = self.cfg.behavior.daemon_idle_minutes;
        if minutes == 0 {
            return false;
        }
        let Some(last) = self.ls.last_activity_time else {
            return false;
        };
        let idle = last.elapsed();
        if idle > Duration::from_secs(minutes * 60) {
            info!(idle_minutes = idle.as_secs() / 60, "daemon idle timeout, exiting");
            return true;
        }
        false
    }

    /// Checks IPC connectivity and reconnects with bounded retry when the
    /// connection dropped. A successful reconnect resets the payload hash
    /// so the next cycle re-publishes.
    async fn ensure_connected(&mut self) -> Result<()> {
        if self.client.connected().await {
            return Ok(());
        }
        warn!("presence service disconnected, attempting reconnect");
        connect_with_retry(&self.client, self.reconnect_interval).await?;
        info!("reconnected to presence service");
        self.ls.last_hash.clear();
        Ok(())
    }
}
