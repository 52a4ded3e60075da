use crate::common::{emit, GlobalOpts};
use crate::errors::RegistryError;
use crate::logger;
use crate::registry::Registry;
use crate::signal::create_shutdown_receiver;
use crate::watch::{DetectorStats, WatchHandle};
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug, Clone)]
pub struct WatchCommand {
    /// Run a full sync before watching
    #[arg(long)]
    pub sync: bool,

    /// Poll interval in milliseconds (overrides the config)
    #[arg(long)]
    pub interval_ms: Option<u64>,
}

/// Watch the module directory and manifest until SIGINT or SIGTERM
pub async fn handle_watch(
    cmd: WatchCommand,
    registry: Registry,
    opts: &GlobalOpts,
) -> Result<(), RegistryError> {
    let registry = Arc::new(registry);
    if cmd.sync {
        let report = registry.sync_all(false).await?;
        logger::info(&report.summary);
    }

    let known = registry.seed().await?;
    let period = cmd
        .interval_ms
        .map(std::time::Duration::from_millis)
        .unwrap_or_else(|| registry.config().poll_interval());
    logger::success(&format!(
        "Watching {} module(s) every {}ms (Ctrl+C to stop)",
        known,
        period.as_millis()
    ));

    let source = crate::watch::PollingChangeSource::new(registry.clone(), period);
    let handle = WatchHandle::spawn_with(registry, source);

    let mut shutdown = create_shutdown_receiver();
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            break;
        }
    }

    let stats = handle.stop().await;
    emit(opts, &stats, print_stats);
    Ok(())
}

fn print_stats(stats: &DetectorStats) {
    logger::success(&format!(
        "Watcher stopped: {} event(s), {} cleaned, {} stripped, {} resync(s), {} failure(s)",
        stats.events, stats.cleaned, stats.stripped, stats.resyncs, stats.failures
    ));
}
