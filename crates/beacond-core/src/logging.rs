//! Logging configuration using tracing

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Initialize the logging subsystem.
///
/// Logs are written to `<data-dir>/logs/beacond.log` with daily rotation.
/// The configured level applies to beacond crates; `BEACOND_LOG` overrides
/// the whole filter.
///
/// # Examples
/// ```bash
/// BEACOND_LOG=debug beacond
/// BEACOND_LOG=trace beacond --data-dir /tmp/beacond
/// ```
pub fn init(log_dir: &Path, level: &str) -> Result<()> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "beacond.log");

    // Default to the configured level, allow override via BEACOND_LOG
    let env_filter = EnvFilter::try_from_env("BEACOND_LOG").unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "session_beacon={level},beacond_core={level},beacond_ipc={level},warn"
        ))
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .init();

    tracing::info!("log directory: {}", log_dir.display());

    Ok(())
}
