//! beacond - mirrors coding-agent session activity to Discord Rich Presence
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use beacond_core::prelude::*;
use beacond_core::{logging, paths, pricing, tiers, Config, DataPaths};
use beacond_ipc::Client;
use session_beacon::daemon::{self, pidfile, signals, Daemon};
use session_beacon::watcher::StateWatcher;

/// beacond - Discord Rich Presence for coding-agent sessions
#[derive(Parser, Debug)]
#[command(name = "beacond")]
#[command(about = "Discord Rich Presence daemon for coding-agent sessions", long_about = None)]
#[command(version)]
struct Args {
    /// Root directory for state, config, and log files
    #[arg(long, value_name = "PATH")]
    data_dir: Option<PathBuf>,
}

fn fatal(message: &str) -> ! {
    eprintln!("fatal: {message}");
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let data_paths = DataPaths::new(args.data_dir.unwrap_or_else(paths::default_data_dir));

    if let Err(e) = std::fs::create_dir_all(&data_paths.root) {
        fatal(&format!(
            "create data dir {}: {e}",
            data_paths.root.display()
        ));
    }

    if let Some(pid) = pidfile::check_stale(&data_paths.pid()) {
        eprintln!("daemon already running (pid {pid})");
        std::process::exit(1);
    }

    // Seed a default config so users have something to edit.
    if !data_paths.config().exists() {
        if let Err(e) = Config::default().save(&data_paths.config()) {
            eprintln!("warning: failed to write default config: {e}");
        }
    }

    let cfg = match Config::load(&data_paths.config()) {
        Ok(cfg) => cfg,
        Err(e) => fatal(&format!("load config: {e}")),
    };

    if let Err(e) = logging::init(&data_paths.logs(), &cfg.log.level) {
        fatal(&format!("init logging: {e}"));
    }
    info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %data_paths.root.display(),
        "beacond starting"
    );

    let pid_file = match pidfile::acquire(&data_paths.pid()) {
        Ok(f) => f,
        Err(e) => {
            error!("failed to write PID file: {e}");
            fatal(&format!("write PID file: {e}"));
        }
    };

    // The PID lock is held for everything past this point; release it on
    // every exit path before propagating the result.
    let result = run(data_paths, cfg).await;
    pid_file.release();

    if let Err(e) = result {
        error!("daemon exited with error: {e}");
        eprintln!("fatal: {e}");
        std::process::exit(1);
    }
    Ok(())
}

/// Startup sequence and event loop, separated from `main` so the PID lock
/// release runs on every path.
async fn run(data_paths: DataPaths, cfg: Config) -> Result<()> {
    let http = pricing::http_client()?;

    let pricing_data = pricing::fetch(&http, &cfg.pricing, &data_paths.root).await?;
    info!(models = pricing_data.models.len(), "pricing data loaded");

    let tier_data = tiers::load(&http, &cfg.tiers.url, &data_paths.root).await;
    info!(clients = tier_data.clients.len(), "model tiers loaded");

    let client = Client::new(cfg.discord.app_id.clone());
    let reconnect_interval = Duration::from_secs(cfg.behavior.reconnect_interval_seconds);
    daemon::connect_with_retry(&client, reconnect_interval).await?;
    info!("connected to presence service");

    let mut watcher = StateWatcher::watch_dir(&data_paths.root);
    if watcher.polling() {
        info!("using polling mode for file watching");
    }

    let mut shutdown = signals::spawn_signal_listener();

    let mut daemon = Daemon::new(client, cfg, pricing_data, tier_data, data_paths);
    let result = daemon.run(&mut watcher, &mut shutdown).await;

    watcher.close();
    daemon.client.close().await;
    result
}
