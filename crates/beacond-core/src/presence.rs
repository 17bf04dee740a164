//! Presence construction: converting a session state record plus display
//! configuration into the payload transmitted to the presence service.
//!
//! [`build_presence`] owns idle detection, ignore patterns, display
//! thresholds, and the small `{var}` / `{var:format}` template language.
//! Payloads are rebuilt from scratch on every resolve cycle and compared by
//! content hash so duplicate sends are suppressed upstream.

use std::path::Path;
use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};

use regex::{Captures, Regex};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::config;
use crate::jsonl::{format_token_count, JsonlData};
use crate::session::SessionState;

/// Maximum character length the presence service accepts for the details
/// and state lines. Longer lines are truncated with an ellipsis.
pub const MAX_LINE_LEN: usize = 128;

// ─────────────────────────────────────────────────────────────────
// Payload Types
// ─────────────────────────────────────────────────────────────────

/// The built presentation payload, ready for transmission.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Presence {
    /// Top line of text (e.g. "Working on beacond").
    pub details: String,
    /// Second line of text (e.g. "Cost: $0.42").
    pub state: String,
    /// Elapsed-time origin.
    pub timestamps: Timestamps,
    /// Image keys and hover text.
    pub assets: Assets,
    /// Clickable buttons (the service caps these at two).
    pub buttons: Vec<PresenceButton>,
}

/// Start time for the elapsed-time display.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Timestamps {
    /// Unix timestamp from which the service renders "elapsed".
    pub start: i64,
}

/// Image and tooltip assets.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Assets {
    /// Asset key for the large (main) image.
    pub large_image: String,
    /// Tooltip shown when hovering over the large image.
    pub large_text: String,
    /// Asset key for the small overlay image (model tier icon).
    pub small_image: String,
    /// Tooltip shown when hovering over the small image.
    pub small_text: String,
}

/// A clickable button on the presence payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PresenceButton {
    pub label: String,
    pub url: String,
}

impl Presence {
    /// Returns a SHA-256 hex digest of the payload for dedup comparison.
    pub fn hash(&self) -> String {
        match serde_json::to_vec(self) {
            Ok(data) => format!("{:x}", Sha256::digest(&data)),
            Err(e) => {
                warn!("failed to hash presence payload: {e}");
                String::new()
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Engine Configuration
// ─────────────────────────────────────────────────────────────────

/// The display configuration consumed by [`build_presence`]. Assembled from
/// the loaded [`config::Config`] plus tier data; flat so per-client
/// overrides can be merged in place.
#[derive(Debug, Clone, Default)]
pub struct PresenceConfig {
    /// Template for the details line.
    pub details_format: String,
    /// Template for the state line.
    pub state_format: String,
    /// Details template used when branch info is unavailable.
    pub details_no_branch_format: String,
    /// State template used when cost display is disabled or zero.
    pub state_no_cost_format: String,

    /// printf-style verb for cost values (e.g. "%.2f").
    pub cost_format: String,
    /// Token count display: "short" or "full".
    pub token_format: String,
    /// Model name display: "short", "full", or "raw".
    pub model_format: String,

    /// Overrides the project name derived from the working directory.
    pub project_name: String,
    /// Glob patterns; a matching session CWD suppresses presence entirely.
    pub ignored_patterns: Vec<String>,

    /// Asset key for the large image.
    pub large_image: String,
    /// Hover text for the large image.
    pub large_text: String,
    /// Enables the small overlay showing the model tier icon.
    pub show_model_icon: bool,

    /// Enables a button linking to the git remote URL.
    pub show_repo_button: bool,
    /// Text displayed on the repository button.
    pub repo_button_label: String,
    /// Text for an optional user-defined button.
    pub custom_button_label: String,
    /// URL for the custom button.
    pub custom_button_url: String,

    /// Enables cost display in the state line.
    pub show_cost: bool,
    /// Enables token count display.
    pub show_tokens: bool,
    /// Enables branch name in the details line.
    pub show_branch: bool,

    /// Elapsed timer origin: "session" or "daemon".
    pub timestamp_mode: String,
    /// Minutes without activity before the session counts as idle.
    /// Zero disables idle detection.
    pub idle_minutes: u64,

    /// Ordered tier names (e.g. ["opus", "sonnet", "haiku"]) matched
    /// against stripped model IDs to pick the overlay icon.
    pub model_tiers: Vec<String>,
    /// Fallback asset key when the model matches no tier.
    pub default_tier_icon: String,

    /// Minimum cost before it appears; lower values render as zero.
    pub cost_show_threshold: f64,
    /// Minimum token count before it appears; lower values render as zero.
    pub tokens_show_threshold: i64,

    /// Idle behavior: "clear" removes presence, "idle_text" shows the idle
    /// strings, "last_activity" keeps the previous payload.
    pub idle_mode: String,
    /// Details line shown when idle_mode is "idle_text".
    pub idle_details: String,
    /// State line shown when idle_mode is "idle_text".
    pub idle_state: String,
}

// ─────────────────────────────────────────────────────────────────
// Template Variables
// ─────────────────────────────────────────────────────────────────

/// All variables available for template rendering. Each field maps to a
/// `{name}` placeholder in format strings.
#[derive(Debug, Clone, Default)]
struct TemplateVars {
    project: String,
    branch: String,
    model: String,
    cost: f64,
    tokens: i64,

    // Agentic context
    tool: String,
    tool_target: String,
    file: String,
    agent_state: String,
    permission: String,
    client: String,

    // Extended token data
    input_tokens: i64,
    output_tokens: i64,
    cache_tokens: i64,
    turns: i64,

    // Git extended
    git_owner: String,
    git_repo: String,

    // Defaults for bare {var} placeholders
    default_model_format: String,
    default_cost_format: String,
    default_token_format: String,
}

// ─────────────────────────────────────────────────────────────────
// Presence Building
// ─────────────────────────────────────────────────────────────────

/// Constructs a presence payload from state and config.
///
/// Returns `None` when the state is stopped, the CWD matches an ignore
/// pattern, or the session is idle. Under the "idle_text" idle mode a
/// static idle payload is returned instead; under "last_activity" the
/// caller is expected to keep showing its previously cached payload.
pub fn build_presence(
    state: &SessionState,
    cfg: &PresenceConfig,
    cost: f64,
    total_tokens: i64,
    model: &str,
    usage: Option<&JsonlData>,
) -> Option<Presence> {
    if state.stopped {
        return None;
    }

    if cfg
        .ignored_patterns
        .iter()
        .any(|p| config::glob_match(p, &state.cwd))
    {
        return None;
    }

    if is_idle(cfg, state.last_activity) {
        return build_idle_presence(state, cfg);
    }

    let vars = build_template_vars(state, cfg, cost, total_tokens, model, usage);
    let details = resolve_details(cfg, &vars);
    let state_line = resolve_state(cfg, &vars);

    let mut presence = Presence {
        details,
        state: state_line,
        timestamps: Timestamps {
            start: state.session_start,
        },
        assets: Assets {
            large_image: cfg.large_image.clone(),
            large_text: cfg.large_text.clone(),
            ..Assets::default()
        },
        buttons: build_buttons(cfg, &state.git_remote_url),
    };

    apply_model_icon(&mut presence, cfg, model);
    Some(presence)
}

/// Reports whether the session has been idle longer than `idle_minutes`.
/// Always false when idle detection is disabled (`idle_minutes == 0`).
fn is_idle(cfg: &PresenceConfig, last_activity: i64) -> bool {
    cfg.idle_minutes > 0 && unix_now() - last_activity > cfg.idle_minutes as i64 * 60
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Returns the idle payload for the configured idle mode. "idle_text"
/// produces a static payload preserving the session start; "last_activity"
/// and "clear" return `None` — the caller either restores its cached
/// payload or clears the presence.
fn build_idle_presence(state: &SessionState, cfg: &PresenceConfig) -> Option<Presence> {
    match cfg.idle_mode.as_str() {
        "idle_text" => Some(Presence {
            details: cfg.idle_details.clone(),
            state: cfg.idle_state.clone(),
            timestamps: Timestamps {
                start: state.session_start,
            },
            assets: Assets {
                large_image: cfg.large_image.clone(),
                large_text: cfg.large_text.clone(),
                ..Assets::default()
            },
            buttons: Vec::new(),
        }),
        _ => None,
    }
}

/// Prepares template variables, applying display thresholds. Cost and token
/// values below their thresholds are zeroed so templates render cleanly and
/// the no-cost variant gets selected.
fn build_template_vars(
    state: &SessionState,
    cfg: &PresenceConfig,
    mut cost: f64,
    mut total_tokens: i64,
    model: &str,
    usage: Option<&JsonlData>,
) -> TemplateVars {
    let project = if cfg.project_name.is_empty() {
        state.project.clone()
    } else {
        cfg.project_name.clone()
    };

    if cfg.cost_show_threshold > 0.0 && cost < cfg.cost_show_threshold {
        cost = 0.0;
    }
    if cfg.tokens_show_threshold > 0 && total_tokens < cfg.tokens_show_threshold {
        total_tokens = 0;
    }

    let (git_owner, git_repo) = parse_git_remote(&state.git_remote_url);

    TemplateVars {
        project,
        branch: state.branch.clone(),
        model: model.to_string(),
        cost,
        tokens: total_tokens,
        tool: state.tool_name.clone(),
        tool_target: state.tool_target.clone(),
        file: state.active_file.clone(),
        agent_state: state.agent_state.clone(),
        permission: state.permission_mode.clone(),
        client: config::client_display_name(&state.client),
        input_tokens: usage.map_or(0, |u| u.input_tokens),
        output_tokens: usage.map_or(0, |u| u.output_tokens),
        cache_tokens: usage.map_or(0, |u| u.cache_tokens()),
        turns: usage.map_or(0, |u| u.turn_count),
        git_owner,
        git_repo,
        default_model_format: cfg.model_format.clone(),
        default_cost_format: cfg.cost_format.clone(),
        default_token_format: cfg.token_format.clone(),
    }
}

/// Selects and renders the details template: the no-branch variant when the
/// branch is empty or branch display is disabled, the full one otherwise.
fn resolve_details(cfg: &PresenceConfig, vars: &TemplateVars) -> String {
    if vars.branch.is_empty() || !cfg.show_branch {
        apply_template(&cfg.details_no_branch_format, vars)
    } else {
        apply_template(&cfg.details_format, vars)
    }
}

/// Selects and renders the state template: the no-cost variant when cost
/// display is disabled or the cost is zero, the full one otherwise.
fn resolve_state(cfg: &PresenceConfig, vars: &TemplateVars) -> String {
    if !cfg.show_cost || vars.cost == 0.0 {
        apply_template(&cfg.state_no_cost_format, vars)
    } else {
        apply_template(&cfg.state_format, vars)
    }
}

/// Sets the small overlay image and tooltip when model icons are enabled
/// and a model is known.
fn apply_model_icon(presence: &mut Presence, cfg: &PresenceConfig, model: &str) {
    if !cfg.show_model_icon || model.is_empty() {
        return;
    }
    presence.assets.small_image =
        extract_model_tier(model, &cfg.model_tiers, &cfg.default_tier_icon);
    presence.assets.small_text = config::format_model_name(model, &cfg.model_format);
}

/// Builds the button list: the repo link when enabled and a remote URL is
/// known, plus an optional custom button. At most two.
fn build_buttons(cfg: &PresenceConfig, remote_url: &str) -> Vec<PresenceButton> {
    let mut buttons = Vec::new();
    if cfg.show_repo_button && !remote_url.is_empty() {
        buttons.push(PresenceButton {
            label: cfg.repo_button_label.clone(),
            url: remote_url.to_string(),
        });
    }
    if !cfg.custom_button_label.is_empty() && !cfg.custom_button_url.is_empty() {
        buttons.push(PresenceButton {
            label: cfg.custom_button_label.clone(),
            url: cfg.custom_button_url.clone(),
        });
    }
    buttons
}

// ─────────────────────────────────────────────────────────────────
// Template Engine
// ─────────────────────────────────────────────────────────────────

static FORMAT_VAR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+):([^}]+)\}").expect("invalid template regex"));

/// Renders a template by replacing variable placeholders with formatted
/// values. Two passes: `{var:format}` patterns first (explicit format),
/// then bare `{var}` patterns with the config's default formats. The result
/// is truncated to [`MAX_LINE_LEN`] characters.
fn apply_template(template: &str, vars: &TemplateVars) -> String {
    // First pass: explicit {var:format} placeholders.
    let mut s = FORMAT_VAR_REGEX
        .replace_all(template, |caps: &Captures| {
            resolve_var(&caps[1], &caps[2], vars)
        })
        .into_owned();

    // Second pass: bare {var} placeholders with default formats.
    let bare: &[(&str, String)] = &[
        ("{model}", resolve_var("model", &vars.default_model_format, vars)),
        ("{cost}", resolve_var("cost", &vars.default_cost_format, vars)),
        ("{tokens}", resolve_var("tokens", &vars.default_token_format, vars)),
        ("{project}", vars.project.clone()),
        ("{branch}", vars.branch.clone()),
        ("{tool}", vars.tool.clone()),
        ("{tool_target}", vars.tool_target.clone()),
        ("{file}", resolve_var("file", "", vars)),
        ("{agent_state}", vars.agent_state.clone()),
        ("{permission}", vars.permission.clone()),
        ("{client}", vars.client.clone()),
        (
            "{input_tokens}",
            resolve_var("input_tokens", &vars.default_token_format, vars),
        ),
        (
            "{output_tokens}",
            resolve_var("output_tokens", &vars.default_token_format, vars),
        ),
        (
            "{cache_tokens}",
            resolve_var("cache_tokens", &vars.default_token_format, vars),
        ),
        ("{turns}", vars.turns.to_string()),
        ("{git_owner}", vars.git_owner.clone()),
        ("{git_repo}", vars.git_repo.clone()),
    ];
    for (placeholder, value) in bare {
        if s.contains(placeholder) {
            s = s.replace(placeholder, value);
        }
    }

    truncate_line(&s)
}

/// Resolves a single template variable by name and format string.
/// Unknown names render as the literal `{name}` placeholder.
fn resolve_var(name: &str, format: &str, vars: &TemplateVars) -> String {
    match name {
        "model" => {
            if vars.model.is_empty() {
                String::new()
            } else {
                config::format_model_name(&vars.model, format)
            }
        }
        "cost" => {
            let format = if format.is_empty() { "%.2f" } else { format };
            format!("${}", config::format_float(vars.cost, format))
        }
        "tokens" => format_token_count(vars.tokens, format),
        "input_tokens" => format_token_count(vars.input_tokens, format),
        "output_tokens" => format_token_count(vars.output_tokens, format),
        "cache_tokens" => format_token_count(vars.cache_tokens, format),
        "project" => vars.project.clone(),
        "branch" => vars.branch.clone(),
        "tool" => vars.tool.clone(),
        "tool_target" => format_path(&vars.tool_target, format),
        "file" => format_path(&vars.file, format),
        "agent_state" => vars.agent_state.clone(),
        "permission" => vars.permission.clone(),
        "client" => vars.client.clone(),
        "git_owner" => vars.git_owner.clone(),
        "git_repo" => vars.git_repo.clone(),
        "turns" => vars.turns.to_string(),
        _ => format!("{{{name}}}"),
    }
}

/// Formats a file path. Supported formats: "basename", "dir", "ext";
/// anything else yields the full path.
fn format_path(path: &str, format: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    let p = Path::new(path);
    match format {
        "basename" => p
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string()),
        "dir" => p
            .parent()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string()),
        "ext" => p
            .extension()
            .map(|n| format!(".{}", n.to_string_lossy()))
            .unwrap_or_default(),
        _ => path.to_string(),
    }
}

/// Truncates a rendered line to [`MAX_LINE_LEN`] characters, replacing the
/// tail with an ellipsis when truncation occurs.
fn truncate_line(s: &str) -> String {
    if s.chars().count() <= MAX_LINE_LEN {
        return s.to_string();
    }
    let mut out: String = s.chars().take(MAX_LINE_LEN - 1).collect();
    out.push('…');
    out
}

static GIT_REMOTE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"github\.com[:/]([^/]+)/([^/.]+)").expect("invalid git remote regex")
});

/// Extracts the owner and repo name from a git remote URL.
/// Returns empty strings if the URL doesn't match a recognized pattern.
fn parse_git_remote(url: &str) -> (String, String) {
    match GIT_REMOTE_REGEX.captures(url) {
        Some(caps) => (caps[1].to_string(), caps[2].to_string()),
        None => (String::new(), String::new()),
    }
}

// ─────────────────────────────────────────────────────────────────
// Model Tiers
// ─────────────────────────────────────────────────────────────────

/// Derives the tier asset key from a model ID by stripping known family
/// prefixes and prefix-matching against the ordered tier list:
///
///   "claude-opus-4-6"            -> "opus"
///   "claude-sonnet-4-5-20250929" -> "sonnet"
///
/// No match falls back to `default_icon`, or "default" as a last resort.
pub fn extract_model_tier(model: &str, tier_list: &[String], default_icon: &str) -> String {
    let mut stripped = model;
    for prefix in config::MODEL_PREFIXES {
        if let Some(rest) = model.strip_prefix(prefix) {
            stripped = rest;
            break;
        }
    }
    for tier in tier_list {
        if stripped.starts_with(tier.as_str()) {
            return tier.clone();
        }
    }
    if default_icon.is_empty() {
        "default".to_string()
    } else {
        default_icon.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> PresenceConfig {
        PresenceConfig {
            details_format: "Working on: {project} ({branch})".to_string(),
            state_format: "{model} · ~{cost} API value".to_string(),
            details_no_branch_format: "Working on: {project}".to_string(),
            state_no_cost_format: "{model} · {tokens} tokens".to_string(),
            cost_format: "%.2f".to_string(),
            token_format: "short".to_string(),
            model_format: "short".to_string(),
            large_image: "app_icon".to_string(),
            large_text: "beacond".to_string(),
            show_model_icon: true,
            show_repo_button: true,
            repo_button_label: "View Repository".to_string(),
            show_cost: true,
            show_tokens: true,
            show_branch: true,
            timestamp_mode: "session".to_string(),
            idle_minutes: 5,
            model_tiers: vec!["opus".to_string(), "sonnet".to_string(), "haiku".to_string()],
            default_tier_icon: "default".to_string(),
            idle_mode: "clear".to_string(),
            idle_state: "Idle".to_string(),
            ..PresenceConfig::default()
        }
    }

    fn active_state() -> SessionState {
        SessionState {
            version: 1,
            session_id: "s1".to_string(),
            session_start: unix_now() - 300,
            last_activity: unix_now(),
            project: "demo".to_string(),
            branch: "main".to_string(),
            cwd: "/work/demo".to_string(),
            git_remote_url: "https://github.com/acme/demo".to_string(),
            client: "claude-code".to_string(),
            ..SessionState::default()
        }
    }

    #[test]
    fn test_build_basic_presence() {
        let state = active_state();
        let p = build_presence(&state, &test_config(), 1.2345, 5000, "claude-opus-4-6", None)
            .unwrap();

        assert_eq!(p.details, "Working on: demo (main)");
        assert_eq!(p.state, "Opus 4.6 · ~$1.23 API value");
        assert_eq!(p.timestamps.start, state.session_start);
        assert_eq!(p.assets.small_image, "opus");
        assert_eq!(p.buttons.len(), 1);
        assert_eq!(p.buttons[0].url, "https://github.com/acme/demo");
    }

    #[test]
    fn test_stopped_state_returns_none() {
        let mut state = active_state();
        state.stopped = true;
        assert!(build_presence(&state, &test_config(), 0.0, 0, "", None).is_none());
    }

    #[test]
    fn test_ignored_cwd_returns_none() {
        let state = active_state();
        let mut cfg = test_config();
        cfg.ignored_patterns = vec!["/work/*".to_string()];
        assert!(build_presence(&state, &cfg, 0.0, 0, "", None).is_none());
    }

    #[test]
    fn test_idle_clear_returns_none() {
        let mut state = active_state();
        state.last_activity = unix_now() - 600;
        assert!(build_presence(&state, &test_config(), 0.0, 0, "", None).is_none());
    }

    #[test]
    fn test_recent_state_is_never_idle() {
        let state = active_state();
        assert!(build_presence(&state, &test_config(), 0.0, 0, "", None).is_some());
    }

    #[test]
    fn test_idle_disabled_when_zero_minutes() {
        let mut state = active_state();
        state.last_activity = unix_now() - 86_400;
        let mut cfg = test_config();
        cfg.idle_minutes = 0;
        assert!(build_presence(&state, &cfg, 0.0, 0, "", None).is_some());
    }

    #[test]
    fn test_idle_text_mode_returns_static_payload() {
        let mut state = active_state();
        state.last_activity = unix_now() - 600;
        let mut cfg = test_config();
        cfg.idle_mode = "idle_text".to_string();
        cfg.idle_details = "Away".to_string();

        let p = build_presence(&state, &cfg, 0.0, 0, "", None).unwrap();
        assert_eq!(p.details, "Away");
        assert_eq!(p.state, "Idle");
        // Original session-start timestamp is preserved.
        assert_eq!(p.timestamps.start, state.session_start);
    }

    #[test]
    fn test_idle_last_activity_mode_returns_none() {
        let mut state = active_state();
        state.last_activity = unix_now() - 600;
        let mut cfg = test_config();
        cfg.idle_mode = "last_activity".to_string();
        assert!(build_presence(&state, &cfg, 0.0, 0, "", None).is_none());
    }

    #[test]
    fn test_cost_below_threshold_selects_no_cost_variant() {
        let state = active_state();
        let mut cfg = test_config();
        cfg.cost_show_threshold = 0.10;

        let p = build_presence(&state, &cfg, 0.05, 2000, "claude-opus-4-6", None).unwrap();
        assert_eq!(p.state, "Opus 4.6 · 2K tokens");
    }

    #[test]
    fn test_no_branch_selects_no_branch_variant() {
        let mut state = active_state();
        state.branch = String::new();
        let p = build_presence(&state, &test_config(), 0.0, 0, "", None).unwrap();
        assert_eq!(p.details, "Working on: demo");

        let mut cfg = test_config();
        cfg.show_branch = false;
        let state = active_state();
        let p = build_presence(&state, &cfg, 0.0, 0, "", None).unwrap();
        assert_eq!(p.details, "Working on: demo");
    }

    #[test]
    fn test_explicit_format_placeholders() {
        let state = active_state();
        let mut cfg = test_config();
        cfg.details_format = "{file:basename} in {project}".to_string();

        let mut state2 = state.clone();
        state2.active_file = "/work/demo/src/main.rs".to_string();
        let p = build_presence(&state2, &cfg, 0.0, 0, "", None).unwrap();
        assert_eq!(p.details, "main.rs in demo");
    }

    #[test]
    fn test_unknown_variable_left_as_placeholder() {
        let state = active_state();
        let mut cfg = test_config();
        cfg.details_no_branch_format = "{mystery}".to_string();
        let mut state = state;
        state.branch = String::new();
        let p = build_presence(&state, &cfg, 0.0, 0, "", None).unwrap();
        assert_eq!(p.details, "{mystery}");
    }

    #[test]
    fn test_line_truncation() {
        let mut state = active_state();
        state.project = "p".repeat(200);
        let p = build_presence(&state, &test_config(), 0.0, 0, "", None).unwrap();
        assert_eq!(p.details.chars().count(), MAX_LINE_LEN);
        assert!(p.details.ends_with('…'));
    }

    #[test]
    fn test_extended_usage_variables() {
        let state = active_state();
        let mut cfg = test_config();
        cfg.state_no_cost_format =
            "{input_tokens} in / {output_tokens} out / {turns} turns".to_string();

        let usage = JsonlData {
            input_tokens: 1500,
            output_tokens: 500,
            turn_count: 7,
            ..JsonlData::default()
        };
        let p = build_presence(&state, &cfg, 0.0, 0, "", Some(&usage)).unwrap();
        assert_eq!(p.details, "Working on: demo (main)");
        assert_eq!(p.state, "1.5K in / 500 out / 7 turns");
    }

    #[test]
    fn test_git_owner_repo_variables() {
        let state = active_state();
        let mut cfg = test_config();
        cfg.details_format = "{git_owner}/{git_repo}".to_string();
        let p = build_presence(&state, &cfg, 0.0, 0, "", None).unwrap();
        assert_eq!(p.details, "acme/demo");
    }

    #[test]
    fn test_hash_stable_and_sensitive() {
        let state = active_state();
        let cfg = test_config();
        let a = build_presence(&state, &cfg, 1.0, 100, "claude-opus-4-6", None).unwrap();
        let b = build_presence(&state, &cfg, 1.0, 100, "claude-opus-4-6", None).unwrap();
        assert_eq!(a.hash(), b.hash());

        let mut c = b.clone();
        c.details.push('!');
        assert_ne!(a.hash(), c.hash());

        let mut d = b.clone();
        d.assets.small_image = "sonnet".to_string();
        assert_ne!(a.hash(), d.hash());
    }

    #[test]
    fn test_extract_model_tier() {
        let tiers = vec![
            "opus".to_string(),
            "sonnet".to_string(),
            "haiku".to_string(),
        ];
        assert_eq!(extract_model_tier("claude-opus-4-6", &tiers, "default"), "opus");
        assert_eq!(
            extract_model_tier("claude-sonnet-4-5-20250929", &tiers, "default"),
            "sonnet"
        );
        assert_eq!(extract_model_tier("gpt-5-codex", &tiers, "fallback"), "fallback");
        assert_eq!(extract_model_tier("mystery-model", &[], ""), "default");
    }

    #[test]
    fn test_parse_git_remote() {
        assert_eq!(
            parse_git_remote("https://github.com/acme/demo"),
            ("acme".to_string(), "demo".to_string())
        );
        assert_eq!(
            parse_git_remote("git@github.com:acme/demo.git"),
            ("acme".to_string(), "demo".to_string())
        );
        assert_eq!(parse_git_remote("https://example.com/x"), (String::new(), String::new()));
    }

    #[test]
    fn test_format_path() {
        assert_eq!(format_path("/a/b/c.rs", "basename"), "c.rs");
        assert_eq!(format_path("/a/b/c.rs", "dir"), "/a/b");
        assert_eq!(format_path("/a/b/c.rs", "ext"), ".rs");
        assert_eq!(format_path("/a/b/c.rs", ""), "/a/b/c.rs");
        assert_eq!(format_path("", "basename"), "");
    }
}
