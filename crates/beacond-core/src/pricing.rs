//! Model pricing: fetching, caching, and per-token cost calculation.
//!
//! Pricing data comes from one of three source types: a remote URL
//! (OpenRouter, LiteLLM, or the native beacond format), a local file, or
//! static inline values from the config. For URL and file sources a
//! fallback applies: primary source first, then the on-disk cache. If both
//! fail no pricing data is available and costs show as $0.
//!
//! The HTTP client is constructed once at startup and passed down; there
//! are no lazily-initialized globals.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::atomicfile;
use crate::config::{PricingConfig, PricingModelConfig};
use crate::error::{Error, Result};
use crate::paths;

/// Default pricing API endpoints per format.
fn default_url(format: &str) -> Option<&'static str> {
    match format {
        "openrouter" => Some("https://openrouter.ai/api/v1/models"),
        "litellm" => Some(
            "https://raw.githubusercontent.com/BerriAI/litellm/main/model_prices_and_context_window.json",
        ),
        _ => None,
    }
}

/// Upper bound on remote response bodies.
const MAX_RESPONSE_BYTES: usize = 10 << 20;

// ─────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────

/// Per-token pricing for a model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_per_token: f64,
    pub output_per_token: f64,
}

/// Pricing information for all known models.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PricingData {
    pub models: HashMap<String, ModelPricing>,
}

impl PricingData {
    /// Computes the dollar cost for a model and token counts.
    /// Unknown models cost 0.
    pub fn cost(&self, model: &str, input_tokens: i64, output_tokens: i64) -> f64 {
        match self.models.get(model) {
            Some(mp) => {
                input_tokens as f64 * mp.input_per_token
                    + output_tokens as f64 * mp.output_per_token
            }
            None => 0.0,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Fetching
// ─────────────────────────────────────────────────────────────────

/// Builds the HTTP client used for remote data fetches. Constructed once
/// during daemon startup and shared by pricing and tier fetches.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| Error::pricing(format!("build HTTP client: {e}")))
}

/// Retrieves pricing data based on the configured source.
///
/// For "url" and "file" sources: primary first, then the cache in
/// `cache_dir` (a cache hit after a primary failure logs a warning but
/// succeeds). For "static" the inline prices are returned directly.
/// Errors only when every applicable source fails.
pub async fn fetch(
    client: &reqwest::Client,
    cfg: &PricingConfig,
    cache_dir: &Path,
) -> Result<PricingData> {
    match cfg.source.as_str() {
        "static" => fetch_static(&cfg.models),
        "file" => {
            let primary = fetch_from_file(&cfg.file, &cfg.format);
            with_cache_fallback(cache_dir, primary)
        }
        _ => {
            let url = if cfg.url.is_empty() {
                default_url(&cfg.format).ok_or_else(|| {
                    Error::pricing(format!(
                        "no URL configured and format {:?} has no default URL",
                        cfg.format
                    ))
                })?
            } else {
                cfg.url.as_str()
            };
            let primary = fetch_from_url(client, url, &cfg.format).await;
            with_cache_fallback(cache_dir, primary)
        }
    }
}

/// Applies the primary-then-cache fallback and refreshes the cache after a
/// successful primary fetch.
fn with_cache_fallback(cache_dir: &Path, primary: Result<PricingData>) -> Result<PricingData> {
    match primary {
        Ok(data) if !data.models.is_empty() => {
            if let Err(e) = write_cache(cache_dir, &data) {
                warn!("failed to write pricing cache: {e}");
            }
            Ok(data)
        }
        Ok(_) => Err(Error::pricing("primary source returned empty pricing data")),
        Err(primary_err) => {
            warn!("pricing fetch failed, trying cache: {primary_err}");
            match read_cache(cache_dir) {
                Ok(data) => Ok(data),
                Err(cache_err) => Err(Error::pricing(format!(
                    "all pricing sources failed: primary: {primary_err}; cache: {cache_err}"
                ))),
            }
        }
    }
}

fn fetch_static(models: &HashMap<String, PricingModelConfig>) -> Result<PricingData> {
    if models.is_empty() {
        return Err(Error::pricing("static pricing has no models defined"));
    }
    let models = models
        .iter()
        .map(|(id, m)| {
            (
                id.clone(),
                ModelPricing {
                    input_per_token: m.input_per_token,
                    output_per_token: m.output_per_token,
                },
            )
        })
        .collect();
    Ok(PricingData { models })
}

async fn fetch_from_url(client: &reqwest::Client, url: &str, format: &str) -> Result<PricingData> {
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::pricing(format!("GET {url}: {e}")))?;

    if !resp.status().is_success() {
        return Err(Error::pricing(format!(
            "GET {url}: status {}",
            resp.status().as_u16()
        )));
    }

    let body = resp
        .bytes()
        .await
        .map_err(|e| Error::pricing(format!("reading response from {url}: {e}")))?;
    if body.len() > MAX_RESPONSE_BYTES {
        return Err(Error::pricing(format!(
            "response from {url} exceeds {MAX_RESPONSE_BYTES} bytes"
        )));
    }

    parse_body(&body, format)
}

fn fetch_from_file(path: &str, format: &str) -> Result<PricingData> {
    let body = std::fs::read(path)
        .map_err(|e| Error::pricing(format!("read pricing file {path}: {e}")))?;
    parse_body(&body, format)
}

// ─────────────────────────────────────────────────────────────────
// Format Adapters
// ─────────────────────────────────────────────────────────────────

fn parse_body(body: &[u8], format: &str) -> Result<PricingData> {
    match format {
        "litellm" => parse_litellm(body),
        "beacond" => parse_native(body),
        _ => parse_openrouter(body),
    }
}

/// OpenRouter transmits prices as string-encoded floats.
#[derive(Deserialize)]
struct OpenRouterResponse {
    data: Vec<OpenRouterModel>,
}

#[derive(Deserialize)]
struct OpenRouterModel {
    id: String,
    #[serde(default)]
    pricing: OpenRouterModelPricing,
}

#[derive(Default, Deserialize)]
struct OpenRouterModelPricing {
    #[serde(default)]
    prompt: String,
    #[serde(default)]
    completion: String,
}

/// Parses OpenRouter's `{"data": [...]}` format, stripping the `provider/`
/// prefix from model IDs ("anthropic/claude-opus-4-6" -> "claude-opus-4-6").
fn parse_openrouter(body: &[u8]) -> Result<PricingData> {
    let resp: OpenRouterResponse = serde_json::from_slice(body)
        .map_err(|e| Error::pricing(format!("parsing openrouter response: {e}")))?;

    let mut models = HashMap::new();
    for m in resp.data {
        let (Ok(input), Ok(output)) = (
            m.pricing.prompt.parse::<f64>(),
            m.pricing.completion.parse::<f64>(),
        ) else {
            debug!(id = %m.id, "skipping model with unparseable pricing");
            continue;
        };
        let id = match m.id.split_once('/') {
            Some((_, rest)) => rest.to_string(),
            None => m.id,
        };
        models.insert(
            id,
            ModelPricing {
                input_per_token: input,
                output_per_token: output,
            },
        );
    }
    Ok(PricingData { models })
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct LiteLlmModel {
    input_cost_per_token: f64,
    output_cost_per_token: f64,
}

/// Parses LiteLLM's flat model pricing map, keeping models with non-zero
/// pricing.
fn parse_litellm(body: &[u8]) -> Result<PricingData> {
    let raw: HashMap<String, serde_json::Value> = serde_json::from_slice(body)
        .map_err(|e| Error::pricing(format!("parsing litellm response: {e}")))?;

    let mut models = HashMap::new();
    for (id, value) in raw {
        let Ok(m) = serde_json::from_value::<LiteLlmModel>(value) else {
            continue;
        };
        if m.input_cost_per_token == 0.0 && m.output_cost_per_token == 0.0 {
            continue;
        }
        models.insert(
            id,
            ModelPricing {
                input_per_token: m.input_cost_per_token,
                output_per_token: m.output_cost_per_token,
            },
        );
    }
    Ok(PricingData { models })
}

/// Parses the native format: `{"models": {"model-id": {...}}}`.
fn parse_native(body: &[u8]) -> Result<PricingData> {
    serde_json::from_slice(body)
        .map_err(|e| Error::pricing(format!("parsing pricing data: {e}")))
}

// ─────────────────────────────────────────────────────────────────
// Cache
// ─────────────────────────────────────────────────────────────────

fn write_cache(cache_dir: &Path, data: &PricingData) -> Result<()> {
    std::fs::create_dir_all(cache_dir)?;
    let path = cache_dir.join(paths::PRICING_CACHE_FILE);
    let bytes = serde_json::to_vec(data)?;
    atomicfile::write(&path, &bytes, 0o644)
}

fn read_cache(cache_dir: &Path) -> Result<PricingData> {
    let path = cache_dir.join(paths::PRICING_CACHE_FILE);
    let bytes = std::fs::read(&path)
        .map_err(|e| Error::pricing(format!("reading pricing cache: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| Error::pricing(format!("parsing pricing cache: {e}")))
}
