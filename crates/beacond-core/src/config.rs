//! Configuration loading and defaults for the beacond daemon.
//!
//! Configuration is loaded from a TOML file in the user's data directory.
//! The file handles Discord presence settings, display formatting, privacy
//! controls, and daemon behavior; missing fields fall back to defaults so a
//! partial file always loads.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::atomicfile;
use crate::error::{Error, Result};
use crate::migrate::Registry;

/// Current config schema version.
pub const CONFIG_VERSION: u32 = 1;

/// The default Discord application (OAuth2 client) identifier.
pub const DEFAULT_APP_ID: &str = "1472319454909173911";

// ─────────────────────────────────────────────────────────────────
// Known Clients
// ─────────────────────────────────────────────────────────────────

static CLIENT_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z][a-z0-9]*(-[a-z0-9]+)*$").expect("invalid client id regex")
});

/// Reports whether `id` is a valid client identifier
/// (lowercase alphanumeric with hyphens, at most 48 chars).
pub fn validate_client_id(id: &str) -> bool {
    id.len() <= 48 && CLIENT_ID_REGEX.is_match(id)
}

/// Returns the human-readable name for a client ID.
/// Known clients return their registered name; unknown clients get title-cased.
pub fn client_display_name(id: &str) -> String {
    match id {
        "claude-code" => "Claude Code".to_string(),
        _ => id
            .split('-')
            .filter(|p| !p.is_empty())
            .map(|p| {
                let mut chars = p.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// Returns the large image asset key for a client ID.
pub fn client_icon(id: &str) -> String {
    match id {
        "claude-code" => "app_icon_claude_code".to_string(),
        _ => "app_icon".to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────
// Configuration Types
// ─────────────────────────────────────────────────────────────────

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Config schema version used for migrations.
    pub version: u32,
    /// Discord connection settings.
    pub discord: DiscordConfig,
    /// Presence display settings.
    pub display: DisplayConfig,
    /// Privacy and project-hiding settings.
    pub privacy: PrivacyConfig,
    /// Daemon behavior and idle settings.
    pub behavior: BehaviorConfig,
    /// Model pricing data source settings.
    pub pricing: PricingConfig,
    /// Model tier data source settings.
    pub tiers: TiersConfig,
    /// Logging settings.
    pub log: LogConfig,
    /// Per-client overrides keyed by client id (e.g. "cursor").
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub clients: HashMap<String, ClientConfig>,
}

/// Discord connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Discord application ID used for Rich Presence.
    pub app_id: String,
}

/// Presence display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Template for the top line (supports {project}, {branch}, ...).
    pub details: String,
    /// Template for the bottom line (supports {model}, {cost}, {tokens}, ...).
    pub state: String,
    /// Details template used when no git branch is available.
    pub details_no_branch: String,
    /// State template used when cost data is unavailable.
    pub state_no_cost: String,
    /// Image asset settings.
    pub assets: AssetsConfig,
    /// Button settings.
    pub buttons: ButtonsConfig,
    /// Formatting preferences for model names, costs, and branches.
    pub format: FormatConfig,
    /// Elapsed-timer settings.
    pub timestamps: TimestampsConfig,
}

/// Image asset settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Asset key for the large image.
    pub large_image: String,
    /// Tooltip text for the large image.
    pub large_text: String,
    /// Enables the small overlay image showing the active model tier.
    pub show_model_icon: bool,
}

/// Button settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonsConfig {
    /// Enables the auto-detected repository button.
    pub show_repo_button: bool,
    /// Label text for the repository button.
    pub repo_button_label: String,
    /// Label for an optional custom button.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub custom_button_label: String,
    /// URL for the optional custom button.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub custom_button_url: String,
}

/// Formatting preferences for model names, costs, tokens, and branches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    /// Model name formatting: "short", "full", or "raw".
    pub model_name: String,
    /// printf-style format string for cost display (e.g. "%.2f").
    pub cost_format: String,
    /// Token count formatting: "short" or "full".
    pub token_format: String,
    /// Branch display: "show", "hide", or "hide_default".
    pub branch: String,
    /// Branches hidden when `branch` is "hide_default".
    pub default_branches: Vec<String>,
}

/// Elapsed-timer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimestampsConfig {
    /// Timer origin: "session" (session start) or "daemon" (daemon start).
    pub mode: String,
}

/// Per-project privacy rules matched by glob pattern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacyOverride {
    /// Glob pattern matched against the session working directory.
    pub pattern: String,
    /// Replaces the project name with `hidden_text` when true.
    pub hide_project_name: bool,
    /// Replacement text shown when `hide_project_name` is true.
    pub hidden_text: String,
}

/// Privacy settings for hiding project names and suppressing presence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacyConfig {
    /// Replaces all project names with `hidden_project_text`.
    pub hide_project_name: bool,
    /// Generic text shown when `hide_project_name` is true.
    pub hidden_project_text: String,
    /// Glob patterns for directories where presence is suppressed.
    pub ignore: Vec<String>,
    /// Per-project privacy settings matched by glob pattern.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<PrivacyOverride>,
}

/// Daemon behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Enables cost display in the state line.
    pub show_cost: bool,
    /// Enables token count display.
    pub show_tokens: bool,
    /// Enables git branch display in the details line.
    pub show_branch: bool,
    /// Minimum cost value before cost is displayed (0 = always).
    pub cost_show_threshold: f64,
    /// Minimum token count before tokens are displayed (0 = always).
    pub tokens_show_threshold: i64,
    /// Idle behavior: "clear", "idle_text", or "last_activity".
    pub idle_mode: String,
    /// Details line shown in "idle_text" mode.
    pub idle_details: String,
    /// State line shown in "idle_text" mode.
    pub idle_state: String,
    /// Inactivity minutes before presence is hidden (0 disables).
    pub presence_idle_minutes: u64,
    /// Inactivity minutes before the daemon exits (0 disables).
    pub daemon_idle_minutes: u64,
    /// Fallback polling interval for state changes, in seconds.
    pub poll_interval_seconds: u64,
    /// Discord reconnect interval, in seconds.
    pub reconnect_interval_seconds: u64,
    /// Hours a session marker may age before orphan cleanup removes it.
    pub session_cleanup_hours: u64,
}

/// Settings for where and how pricing data is loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Pricing data source: "url", "file", or "static".
    pub source: String,
    /// Response parser: "openrouter", "litellm", or "beacond".
    pub format: String,
    /// Custom pricing endpoint (overrides the format's default URL).
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
    /// Local file path for source "file".
    #[serde(skip_serializing_if = "String::is_empty")]
    pub file: String,
    /// Inline per-model pricing for source "static".
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub models: HashMap<String, PricingModelConfig>,
}

/// Per-token pricing for a model in static config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingModelConfig {
    /// Cost per input token in USD.
    pub input_per_token: f64,
    /// Cost per output token in USD.
    pub output_per_token: f64,
}

/// Settings for where model tier data is loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TiersConfig {
    /// Remote tier data URL. Empty skips the remote fetch and uses the
    /// cache or built-in defaults.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Minimum log level (trace, debug, info, warn, error).
    pub level: String,
}

/// Per-client display overrides (e.g. for Cursor or Windsurf).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Overrides the large image asset key for this client.
    pub large_image: String,
    /// Overrides the large image tooltip for this client.
    pub large_text: String,
    /// Overrides the Discord application ID for this client.
    pub app_id: String,
    /// Overrides the details template for this client.
    pub details: String,
    /// Overrides the state template for this client.
    pub state: String,
    /// Overrides the small image asset key for this client.
    pub small_image: String,
    /// Overrides the small image tooltip for this client.
    pub small_text: String,
}

// ─────────────────────────────────────────────────────────────────
// Defaults
// ─────────────────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            discord: DiscordConfig::default(),
            display: DisplayConfig::default(),
            privacy: PrivacyConfig::default(),
            behavior: BehaviorConfig::default(),
            pricing: PricingConfig::default(),
            tiers: TiersConfig::default(),
            log: LogConfig::default(),
            clients: HashMap::new(),
        }
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            app_id: DEFAULT_APP_ID.to_string(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            details: "Working on: {project} ({branch})".to_string(),
            state: "{model} · ~{cost} API value".to_string(),
            details_no_branch: "Working on: {project}".to_string(),
            state_no_cost: "{model} · {tokens} tokens".to_string(),
            assets: AssetsConfig::default(),
            buttons: ButtonsConfig::default(),
            format: FormatConfig::default(),
            timestamps: TimestampsConfig::default(),
        }
    }
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            large_image: "app_icon".to_string(),
            large_text: "beacond".to_string(),
            show_model_icon: true,
        }
    }
}

impl Default for ButtonsConfig {
    fn default() -> Self {
        Self {
            show_repo_button: true,
            repo_button_label: "View Repository".to_string(),
            custom_button_label: String::new(),
            custom_button_url: String::new(),
        }
    }
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            model_name: "short".to_string(),
            cost_format: "%.2f".to_string(),
            token_format: "short".to_string(),
            branch: "show".to_string(),
            default_branches: vec!["main".to_string(), "master".to_string()],
        }
    }
}

impl Default for TimestampsConfig {
    fn default() -> Self {
        Self {
            mode: "session".to_string(),
        }
    }
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            hide_project_name: false,
            hidden_project_text: "a project".to_string(),
            ignore: Vec::new(),
            overrides: Vec::new(),
        }
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            show_cost: true,
            show_tokens: false,
            show_branch: true,
            cost_show_threshold: 0.0,
            tokens_show_threshold: 0,
            idle_mode: "clear".to_string(),
            idle_details: String::new(),
            idle_state: "Idle".to_string(),
            presence_idle_minutes: 5,
            daemon_idle_minutes: 30,
            poll_interval_seconds: 5,
            reconnect_interval_seconds: 15,
            session_cleanup_hours: 24,
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            source: "url".to_string(),
            format: "openrouter".to_string(),
            url: String::new(),
            file: String::new(),
            models: HashMap::new(),
        }
    }
}

impl Default for TiersConfig {
    fn default() -> Self {
        Self { url: String::new() }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Loading and Saving
// ─────────────────────────────────────────────────────────────────

/// Reads just the version field from raw TOML bytes.
/// Returns 1 if the field is missing, zero, or unparseable.
pub fn peek_version(data: &str) -> u32 {
    #[derive(Deserialize)]
    struct Partial {
        #[serde(default)]
        version: u32,
    }
    match toml::from_str::<Partial>(data) {
        Ok(p) if p.version > 0 => p.version,
        _ => 1,
    }
}

impl Config {
    /// Reads and parses the configuration file at `path`.
    /// A missing file yields the defaults; a present file merges over them.
    pub fn load(path: &Path) -> Result<Self> {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::config(format!("read {}: {e}", path.display()))),
        };

        let registry = config_registry();
        let version = peek_version(&data);

        // Apply migrations if needed, backing up the original first.
        let mut migrated = false;
        let data = if registry.needs_migration(version) {
            if let Err(e) = std::fs::write(path.with_extension("toml.bak"), &data) {
                warn!("failed to write config backup: {e}");
            }
            let (bytes, _) = registry.run(data.as_bytes(), version)?;
            migrated = true;
            String::from_utf8(bytes)
                .map_err(|e| Error::migration(format!("migrated config is not UTF-8: {e}")))?
        } else {
            data
        };

        let mut cfg: Config = toml::from_str(&data)
            .map_err(|e| Error::config(format!("parse {}: {e}", path.display())))?;
        cfg.version = registry.current_version;

        cfg.validate()?;

        // Re-save after migration so the file reflects the current schema.
        if migrated {
            if let Err(e) = cfg.save(path) {
                warn!("failed to save migrated config: {e}");
            }
        }

        Ok(cfg)
    }

    /// Writes the config to disk as TOML using an atomic file write.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("encode config: {e}")))?;
        atomicfile::write(path, text.as_bytes(), 0o644)
    }
}

/// Returns the migration registry for config.toml files.
///
/// No config migrations exist yet; the registry still drives version
/// normalization so future migrations slot in without load-path changes.
fn config_registry() -> Registry {
    Registry::new(CONFIG_VERSION)
}

// ─────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────

static COST_FORMAT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^%]*%[0-9.]*[fFeEgG][^%]*$").expect("invalid cost format regex")
});

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Checks that all configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<()> {
        match self.behavior.idle_mode.as_str() {
            "clear" | "idle_text" | "last_activity" => {}
            other => {
                return Err(Error::config_invalid(format!(
                    "invalid idle_mode {other:?}: must be clear, idle_text, or last_activity"
                )))
            }
        }

        match self.display.timestamps.mode.as_str() {
            "session" | "daemon" => {}
            other => {
                return Err(Error::config_invalid(format!(
                    "invalid timestamps.mode {other:?}: must be session or daemon"
                )))
            }
        }

        if !VALID_LOG_LEVELS.contains(&self.log.level.to_lowercase().as_str()) {
            return Err(Error::config_invalid(format!(
                "invalid log.level {:?}: must be trace, debug, info, warn, or error",
                self.log.level
            )));
        }

        if self.behavior.poll_interval_seconds == 0 {
            return Err(Error::config_invalid("poll_interval_seconds must be > 0"));
        }

        if self.behavior.reconnect_interval_seconds == 0 {
            return Err(Error::config_invalid(
                "reconnect_interval_seconds must be > 0",
            ));
        }

        if self.behavior.session_cleanup_hours == 0 {
            return Err(Error::config_invalid("session_cleanup_hours must be > 0"));
        }

        match self.pricing.source.as_str() {
            "url" | "file" | "static" => {}
            other => {
                return Err(Error::config_invalid(format!(
                    "invalid pricing.source {other:?}: must be url, file, or static"
                )))
            }
        }

        match self.pricing.format.as_str() {
            "openrouter" | "litellm" | "beacond" => {}
            other => {
                return Err(Error::config_invalid(format!(
                    "invalid pricing.format {other:?}: must be openrouter, litellm, or beacond"
                )))
            }
        }

        match self.display.format.branch.as_str() {
            "show" | "hide" | "hide_default" => {}
            other => {
                return Err(Error::config_invalid(format!(
                    "invalid format.branch {other:?}: must be show, hide, or hide_default"
                )))
            }
        }

        match self.display.format.model_name.as_str() {
            "short" | "full" | "raw" => {}
            other => {
                return Err(Error::config_invalid(format!(
                    "invalid format.model_name {other:?}: must be short, full, or raw"
                )))
            }
        }

        match self.display.format.token_format.as_str() {
            "short" | "full" => {}
            other => {
                return Err(Error::config_invalid(format!(
                    "invalid format.token_format {other:?}: must be short or full"
                )))
            }
        }

        if !COST_FORMAT_REGEX.is_match(&self.display.format.cost_format) {
            return Err(Error::config_invalid(format!(
                "invalid cost_format {:?}: must contain exactly one float format verb (%f, %e, %g)",
                self.display.format.cost_format
            )));
        }

        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────
// Formatting Helpers
// ─────────────────────────────────────────────────────────────────

/// Formats a number in abbreviated form: 1M, 1.5M, 234K, 500.
/// Exact multiples omit the decimal: 1000 -> "1K", 2000000 -> "2M".
pub fn format_short(n: i64) -> String {
    if n >= 1_000_000 {
        let val = n as f64 / 1_000_000.0;
        if val == val.trunc() {
            format!("{}M", val as i64)
        } else {
            format!("{val:.1}M")
        }
    } else if n >= 1_000 {
        let val = n as f64 / 1_000.0;
        if val == val.trunc() {
            format!("{}K", val as i64)
        } else {
            format!("{val:.1}K")
        }
    } else {
        n.to_string()
    }
}

/// Formats a number with comma separators: 1,500,000.
pub fn format_with_commas(n: i64) -> String {
    if n < 0 {
        return format!("-{}", format_with_commas(-n));
    }
    let s = n.to_string();
    if s.len() <= 3 {
        return s;
    }
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// Formats a float using a printf-style format string containing a single
/// float verb (e.g. "%.2f"), with literal text around the verb preserved.
pub fn format_float(val: f64, spec: &str) -> String {
    let Some(pos) = spec.find('%') else {
        return format!("{val:.2}");
    };
    let prefix = &spec[..pos];
    let rest = &spec[pos + 1..];

    let mut verb = 'f';
    let mut flags_end = rest.len();
    for (i, c) in rest.char_indices() {
        if c.is_ascii_digit() || c == '.' {
            continue;
        }
        verb = c;
        flags_end = i;
        break;
    }
    let flags = &rest[..flags_end];
    let suffix = &rest[(flags_end + verb.len_utf8()).min(rest.len())..];

    let precision = flags
        .split_once('.')
        .and_then(|(_, p)| p.parse::<usize>().ok());

    let body = match verb {
        'e' | 'E' => format!("{:.*e}", precision.unwrap_or(6), val),
        'g' | 'G' => format!("{val}"),
        _ => format!("{:.*}", precision.unwrap_or(6), val),
    };
    format!("{prefix}{body}{suffix}")
}

/// Known model family prefixes stripped before tier matching and short names.
pub const MODEL_PREFIXES: &[&str] = &["claude-", "gpt-", "gemini-", "o1-", "o3-"];

/// Formats a model ID according to the given style: "raw", "full", or "short".
pub fn format_model_name(model_id: &str, format: &str) -> String {
    match format {
        "raw" => model_id.to_string(),
        "full" => title_case_model(model_id),
        _ => {
            let mut name = model_id;
            for prefix in MODEL_PREFIXES {
                if let Some(stripped) = model_id.strip_prefix(prefix) {
                    name = stripped;
                    break;
                }
            }
            title_case_model(name)
        }
    }
}

/// Converts a hyphenated model ID into a display name.
/// Hyphens between digits become dots (version separator), others become spaces.
/// "claude-opus-4-6" -> "Claude Opus 4.6"
fn title_case_model(s: &str) -> String {
    let parts: Vec<&str> = s.split('-').filter(|p| !p.is_empty()).collect();
    let mut result: Vec<String> = Vec::with_capacity(parts.len());
    for (i, p) in parts.iter().enumerate() {
        if i > 0 && is_numeric(parts[i - 1]) && is_numeric(p) {
            if let Some(last) = result.last_mut() {
                last.push('.');
                last.push_str(p);
                continue;
            }
        }
        let mut chars = p.chars();
        match chars.next() {
            Some(first) => {
                result.push(first.to_uppercase().collect::<String>() + chars.as_str())
            }
            None => continue,
        }
    }
    result.join(" ")
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|c| c.is_ascii_digit())
}

// ─────────────────────────────────────────────────────────────────
// Glob Matching
// ─────────────────────────────────────────────────────────────────

/// Matches a path against a glob pattern.
///
/// `*` matches any run of characters except `/`, `?` matches a single
/// non-`/` character, and `**` matches anything including separators.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    glob_match_inner(&p, &t)
}

fn glob_match_inner(p: &[char], t: &[char]) -> bool {
    if p.is_empty() {
        return t.is_empty();
    }
    if p[0] == '*' {
        let double = p.len() > 1 && p[1] == '*';
        let rest = if double { &p[2..] } else { &p[1..] };
        let mut i = 0;
        loop {
            if glob_match_inner(rest, &t[i..]) {
                return true;
            }
            if i >= t.len() {
                return false;
            }
            if !double && t[i] == '/' {
                return false;
            }
            i += 1;
        }
    }
    if t.is_empty() {
        return false;
    }
    match p[0] {
        '?' => t[0] != '/' && glob_match_inner(&p[1..], &t[1..]),
        c => c == t[0] && glob_match_inner(&p[1..], &t[1..]),
    }
}

// ─────────────────────────────────────────────────────────────────
// Privacy Helpers
// ─────────────────────────────────────────────────────────────────

impl Config {
    /// Reports whether `cwd` matches any of the configured ignore patterns.
    pub fn is_ignored(&self, cwd: &str) -> bool {
        self.privacy.ignore.iter().any(|p| glob_match(p, cwd))
    }

    /// Returns the display name for a project, respecting privacy settings.
    /// Per-project overrides are checked first, then the global setting.
    pub fn project_name(&self, real_name: &str, cwd: &str) -> String {
        for o in &self.privacy.overrides {
            if o.hide_project_name && glob_match(&o.pattern, cwd) {
                return o.hidden_text.clone();
            }
        }
        if self.privacy.hide_project_name {
            return self.privacy.hidden_project_text.clone();
        }
        real_name.to_string()
    }

    /// Applies the configured branch display format.
    /// Returns an empty string when the branch should be hidden, which in
    /// turn selects the no-branch details template.
    pub fn format_branch<'a>(&self, branch: &'a str) -> &'a str {
        match self.display.format.branch.as_str() {
            "hide" => "",
            "hide_default" => {
                if self
                    .display
                    .format
                    .default_branches
                    .iter()
                    .any(|d| d == branch)
                {
                    ""
                } else {
                    branch
                }
            }
            _ => branch,
        }
    }
}
