//! Conversation-log aggregation.
//!
//! Editor integrations append one JSON object per line to a `.jsonl` file
//! while a session runs. This module finds the newest log, aggregates token
//! usage and the active model, and formats token counts for display.
//! Malformed lines are skipped; the log is advisory data, not a source of
//! truth.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Deserialize;

use crate::config;
use crate::error::{Error, Result};

// ─────────────────────────────────────────────────────────────────
// Aggregated Data
// ─────────────────────────────────────────────────────────────────

/// Aggregated data parsed from a JSONL conversation file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonlData {
    pub model: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cache_creation_tokens: i64,
    pub cache_read_tokens: i64,
    pub turn_count: i64,
    pub tool_use_count: i64,
    pub unique_models: Vec<String>,
}

impl JsonlData {
    pub fn total_tokens(&self) -> i64 {
        self.input_tokens + self.output_tokens
    }

    pub fn cache_tokens(&self) -> i64 {
        self.cache_creation_tokens + self.cache_read_tokens
    }
}

/// A single line in a JSONL conversation log. Only the fields needed for
/// token aggregation and model detection are decoded.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JsonlEntry {
    /// Entry kind (e.g. "assistant", "user").
    #[serde(rename = "type")]
    kind: String,
    /// Model identifier that produced this entry.
    model: String,
    /// Content blocks for assistant messages (for tool use counting).
    message: JsonlMessage,
    /// Token consumption for this entry.
    usage: JsonlUsage,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JsonlMessage {
    content: Vec<JsonlContentBlock>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JsonlContentBlock {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JsonlUsage {
    input_tokens: i64,
    output_tokens: i64,
    cache_creation_input_tokens: i64,
    cache_read_input_tokens: i64,
}

// ─────────────────────────────────────────────────────────────────
// Parsing
// ─────────────────────────────────────────────────────────────────

fn accumulate(data: &mut JsonlData, line: &[u8]) {
    let Ok(entry) = serde_json::from_slice::<JsonlEntry>(line) else {
        return;
    };

    data.input_tokens += entry.usage.input_tokens;
    data.output_tokens += entry.usage.output_tokens;
    data.cache_creation_tokens += entry.usage.cache_creation_input_tokens;
    data.cache_read_tokens += entry.usage.cache_read_input_tokens;

    if !entry.model.is_empty() {
        if !data.unique_models.contains(&entry.model) {
            data.unique_models.push(entry.model.clone());
        }
        data.model = entry.model;
    }

    if entry.kind == "assistant" {
        data.turn_count += 1;
        data.tool_use_count += entry
            .message
            .content
            .iter()
            .filter(|b| b.kind == "tool_use")
            .count() as i64;
    }
}

/// Reads a JSONL file, aggregating token counts and the latest model.
/// Malformed lines are silently skipped.
pub fn parse_jsonl(path: &Path) -> Result<JsonlData> {
    let file = File::open(path).map_err(|e| Error::StateRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut data = JsonlData::default();
    for line in BufReader::new(file).split(b'\n') {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        accumulate(&mut data, &line);
    }
    Ok(data)
}

// ─────────────────────────────────────────────────────────────────
// Incremental Parsing
// ─────────────────────────────────────────────────────────────────

/// Tracks parse state so subsequent reads only scan new entries.
///
/// Stores the last known file size and accumulated data; a shrunken file
/// (truncation or rotation) triggers a full re-scan.
#[derive(Debug)]
pub struct JsonlCache {
    path: PathBuf,
    inner: Mutex<CacheInner>,
}

#[derive(Debug, Default)]
struct CacheInner {
    last_size: u64,
    last_data: JsonlData,
}

impl JsonlCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// The conversation log this cache tracks.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads only the portion of the file appended since the last call.
    pub fn parse(&self) -> Result<JsonlData> {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut file = File::open(&self.path).map_err(|e| Error::StateRead {
            path: self.path.clone(),
            source: e,
        })?;
        let current_size = file.metadata()?.len();

        // The file shrunk, reset and do a full scan.
        if current_size < inner.last_size {
            *inner = CacheInner::default();
        }

        if current_size == inner.last_size {
            return Ok(inner.last_data.clone());
        }

        if inner.last_size > 0 {
            file.seek(SeekFrom::Start(inner.last_size))?;
        }

        let mut data = inner.last_data.clone();
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        for line in buf.split(|&b| b == b'\n') {
            if line.is_empty() {
                continue;
            }
            accumulate(&mut data, line);
        }

        inner.last_size = current_size;
        inner.last_data = data.clone();
        Ok(data)
    }
}

// ─────────────────────────────────────────────────────────────────
// Discovery
// ─────────────────────────────────────────────────────────────────

/// Finds the most recently modified `.jsonl` file in the given directory.
pub fn find_latest_jsonl(dir: &Path) -> Result<PathBuf> {
    let entries = std::fs::read_dir(dir).map_err(|e| Error::StateRead {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut latest: Option<(PathBuf, std::time::SystemTime)> = None;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path
            .extension()
            .is_some_and(|ext| ext == "jsonl")
        {
            continue;
        }
        let Ok(meta) = entry.metadata() else { continue };
        if meta.is_dir() {
            continue;
        }
        let Ok(modified) = meta.modified() else { continue };
        match &latest {
            Some((_, best)) if *best >= modified => {}
            _ => latest = Some((path, modified)),
        }
    }

    latest.map(|(path, _)| path).ok_or_else(|| {
        Error::config(format!("no .jsonl files found in {}", dir.display()))
    })
}

// ─────────────────────────────────────────────────────────────────
// Token Formatting
// ─────────────────────────────────────────────────────────────────

/// Formats a token count as a human-readable string.
/// Format can be "short" (1.5M, 234K, 500) or "full" (1,500,000).
pub fn format_token_count(tokens: i64, format: &str) -> String {
    if format == "full" {
        config::format_with_commas(tokens)
    } else {
        config::format_short(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = concat!(
        r#"{"type":"user","message":{"content":[{"type":"text"}]}}"#,
        "\n",
        r#"{"type":"assistant","model":"claude-opus-4-6","usage":{"input_tokens":100,"output_tokens":40,"cache_read_input_tokens":5},"message":{"content":[{"type":"tool_use"},{"type":"text"}]}}"#,
        "\n",
        "not json at all\n",
        r#"{"type":"assistant","model":"claude-sonnet-4-5","usage":{"input_tokens":10,"output_tokens":2,"cache_creation_input_tokens":7},"message":{"content":[]}}"#,
        "\n",
    );

    fn write_sample(dir: &Path) -> PathBuf {
        let path = dir.join("conv.jsonl");
        std::fs::write(&path, SAMPLE).unwrap();
        path
    }

    #[test]
    fn test_parse_jsonl_aggregates() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample(dir.path());

        let data = parse_jsonl(&path).unwrap();
        assert_eq!(data.input_tokens, 110);
        assert_eq!(data.output_tokens, 42);
        assert_eq!(data.cache_read_tokens, 5);
        assert_eq!(data.cache_creation_tokens, 7);
        assert_eq!(data.turn_count, 2);
        assert_eq!(data.tool_use_count, 1);
        assert_eq!(data.model, "claude-sonnet-4-5");
        assert_eq!(
            data.unique_models,
            vec!["claude-opus-4-6", "claude-sonnet-4-5"]
        );
    }

    #[test]
    fn test_cached_parse_only_reads_appended_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample(dir.path());

        let cache = JsonlCache::new(&path);
        let first = cache.parse().unwrap();
        assert_eq!(first.total_tokens(), 152);

        // Unchanged file returns the cached data.
        let again = cache.parse().unwrap();
        assert_eq!(again, first);

        // Appended entries accumulate on top.
        let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(
            f,
            r#"{{"type":"assistant","model":"claude-opus-4-6","usage":{{"input_tokens":1,"output_tokens":1}},"message":{{"content":[]}}}}"#
        )
        .unwrap();

        let updated = cache.parse().unwrap();
        assert_eq!(updated.total_tokens(), 154);
        assert_eq!(updated.turn_count, 3);
        assert_eq!(updated.model, "claude-opus-4-6");
    }

    #[test]
    fn test_cached_parse_rescans_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample(dir.path());

        let cache = JsonlCache::new(&path);
        cache.parse().unwrap();

        std::fs::write(
            &path,
            concat!(
                r#"{"type":"assistant","model":"m","usage":{"input_tokens":3,"output_tokens":1},"message":{"content":[]}}"#,
                "\n"
            ),
        )
        .unwrap();

        let data = cache.parse().unwrap();
        assert_eq!(data.total_tokens(), 4);
        assert_eq!(data.turn_count, 1);
    }

    #[test]
    fn test_find_latest_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.jsonl");
        let new = dir.path().join("new.jsonl");
        std::fs::write(&old, "{}\n").unwrap();
        std::fs::write(&new, "{}\n").unwrap();

        let older = std::time::SystemTime::now() - std::time::Duration::from_secs(600);
        let f = File::options().write(true).open(&old).unwrap();
        f.set_modified(older).unwrap();

        assert_eq!(find_latest_jsonl(dir.path()).unwrap(), new);
    }

    #[test]
    fn test_find_latest_jsonl_empty_dir_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_latest_jsonl(dir.path()).is_err());
    }

    #[test]
    fn test_format_token_count() {
        assert_eq!(format_token_count(1_500_000, "short"), "1.5M");
        assert_eq!(format_token_count(1_500_000, "full"), "1,500,000");
        assert_eq!(format_token_count(500, "short"), "500");
    }
}
