//! Orphan detection
//!
//! Changes outside the registry's control arrive as batches of
//! [`ChangeEvent`]s from a single [`ChangeSource`]. The polling source diffs
//! both the module directory and the manifest text on every tick, so the
//! directory path and the manifest path never race each other: one
//! [`OrphanDetector`] loop consumes everything in order.

use crate::registry::{Registry, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    /// Content fingerprint changed
    Modified,
    Deleted,
    /// The manifest still imports the module but no entry renders it
    Unreferenced,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub module_name: String,
    pub observed_at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, module_name: &str, observed_at: DateTime<Utc>) -> Self {
        ChangeEvent {
            kind,
            module_name: module_name.to_string(),
            observed_at,
        }
    }
}

/// Producer of change batches; `None` ends the stream
#[async_trait]
pub trait ChangeSource: Send {
    async fn next_batch(&mut self) -> Option<Vec<ChangeEvent>>;
}

/// Periodic observation of the module directory and manifest
pub struct PollingChangeSource {
    registry: Arc<Registry>,
    ticker: Interval,
}

impl PollingChangeSource {
    pub fn new(registry: Arc<Registry>, period: Duration) -> Self {
        // The registry was just seeded, so the first observation waits a full period
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        PollingChangeSource { registry, ticker }
    }
}

#[async_trait]
impl ChangeSource for PollingChangeSource {
    async fn next_batch(&mut self) -> Option<Vec<ChangeEvent>> {
        self.ticker.tick().await;
        match self.registry.observe_changes().await {
            Ok(events) => Some(events),
            Err(err) => {
                warn!("Change poll failed: {}", err);
                Some(Vec::new())
            }
        }
    }
}

/// Counters for one detector run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetectorStats {
    pub batches: usize,
    pub events: usize,
    pub cleaned: usize,
    pub stripped: usize,
    pub resyncs: usize,
    pub failures: usize,
}

pub struct OrphanDetector {
    registry: Arc<Registry>,
    resync_on_change: bool,
}

impl OrphanDetector {
    pub fn new(registry: Arc<Registry>) -> Self {
        let resync_on_change = registry.config().resync_on_change;
        OrphanDetector {
            registry,
            resync_on_change,
        }
    }

    /// Apply one batch; created and modified events share a single resync
    pub async fn handle_batch(&self, events: &[ChangeEvent], stats: &mut DetectorStats) {
        stats.batches += 1;
        stats.events += events.len();
        let mut needs_resync = false;

        for event in events {
            debug!("{:?} {}", event.kind, event.module_name);
            match self.handle(event).await {
                Ok(Outcome::Cleaned) => stats.cleaned += 1,
                Ok(Outcome::Stripped) => stats.stripped += 1,
                Ok(Outcome::Resync) => needs_resync = true,
                Ok(Outcome::Ignored) => {}
                Err(err) => {
                    stats.failures += 1;
                    warn!("Handling {:?} for {} failed: {}", event.kind, event.module_name, err);
                }
            }
        }

        if needs_resync {
            match self.registry.sync_all(false).await {
                Ok(report) => {
                    stats.resyncs += 1;
                    info!("{}", report.summary);
                }
                Err(err) => {
                    stats.failures += 1;
                    warn!("Resync after module change failed: {}", err);
                }
            }
        }
    }

    async fn handle(&self, event: &ChangeEvent) -> Result<Outcome> {
        let name = event.module_name.as_str();
        let outcome = match event.kind {
            ChangeKind::Deleted => {
                if self.registry.scoped_cleanup(name).await? {
                    Outcome::Cleaned
                } else {
                    Outcome::Ignored
                }
            }
            ChangeKind::Unreferenced => {
                if self.registry.strip_unreferenced(name).await? {
                    Outcome::Stripped
                } else {
                    Outcome::Ignored
                }
            }
            ChangeKind::Created | ChangeKind::Modified if self.resync_on_change => Outcome::Resync,
            ChangeKind::Created | ChangeKind::Modified => {
                info!("Module {} {:?}; run sync to register it", name, event.kind);
                Outcome::Ignored
            }
        };
        Ok(outcome)
    }

    /// Consume `source` until it ends or shutdown is requested
    pub async fn run<S: ChangeSource>(
        &self,
        mut source: S,
        mut shutdown: watch::Receiver<bool>,
    ) -> DetectorStats {
        let mut stats = DetectorStats::default();
        if *shutdown.borrow() {
            return stats;
        }

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("Orphan detector stopping");
                        break;
                    }
                }
                batch = source.next_batch() => match batch {
                    Some(events) => self.handle_batch(&events, &mut stats).await,
                    None => break,
                },
            }
        }
        stats
    }
}

enum Outcome {
    Cleaned,
    Stripped,
    Resync,
    Ignored,
}

/// A detector running on its own task
pub struct WatchHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<DetectorStats>,
}

impl WatchHandle {
    /// Poll `registry` every `poll_interval` from its config
    ///
    /// The registry should be seeded first, otherwise the first poll reports
    /// every existing module as created.
    pub fn spawn(registry: Arc<Registry>) -> Self {
        let period = registry.config().poll_interval();
        let source = PollingChangeSource::new(registry.clone(), period);
        Self::spawn_with(registry, source)
    }

    pub fn spawn_with<S: ChangeSource + 'static>(registry: Arc<Registry>, source: S) -> Self {
        let (shutdown, receiver) = watch::channel(false);
        let detector = OrphanDetector::new(registry);
        let task = tokio::spawn(async move { detector.run(source, receiver).await });
        WatchHandle { shutdown, task }
    }

    /// Signal shutdown and wait for the loop to finish its current batch
    pub async fn stop(self) -> DetectorStats {
        let _ = self.shutdown.send(true);
        match self.task.await {
            Ok(stats) => stats,
            Err(err) => {
                warn!("Orphan detector task failed: {}", err);
                DetectorStats::default()
            }
        }
    }
}
