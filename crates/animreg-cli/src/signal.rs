//! Termination signals for the long-running `watch` command

use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};

/// Wait for SIGTERM, SIGINT or Ctrl+C
pub async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to register SIGTERM handler: {}", e);
                signal::ctrl_c().await.ok();
                return;
            }
        };

        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to register SIGINT handler: {}", e);
                signal::ctrl_c().await.ok();
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, stopping watcher");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, stopping watcher");
            }
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, stopping watcher");
            }
        }
    }

    #[cfg(not(unix))]
    {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, stopping watcher"),
            Err(e) => warn!("Failed to listen for shutdown signal: {}", e),
        }
    }
}

/// Receiver that flips to `true` once a termination signal arrives
pub fn create_shutdown_receiver() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);

    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        let _ = tx.send(true);
    });

    rx
}
