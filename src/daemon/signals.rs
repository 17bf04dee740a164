//! OS signal handling for graceful shutdown

use tokio::sync::mpsc;

use beacond_core::prelude::*;

/// Spawns a task listening for OS termination signals and returns the
/// channel that receives exactly one message when shutdown is requested.
pub fn spawn_signal_listener() -> mpsc::Receiver<()> {
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(async move {
        if let Err(e) = wait_for_signal().await {
            error!("signal handler error: {e}");
            return;
        }
        info!("shutdown signal received");
        let _ = tx.send(()).await;
    });
    rx
}

/// Waits for a termination signal.
async fn wait_for_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => {
                info!("received SIGINT");
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM");
            }
        }

        Ok(())
    }

    #[cfg(windows)]
    {
        tokio::signal::ctrl_c().await?;
        info!("received Ctrl+C");
        Ok(())
    }
}
