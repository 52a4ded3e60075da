use crate::common::{emit, GlobalOpts};
use crate::errors::RegistryError;
use crate::logger;
use crate::registry::{Registry, SyncReport};
use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct SyncCommand {
    /// Rewrite the manifest and signal a reload even when nothing changed
    #[arg(short, long)]
    pub force: bool,
}

/// Rescan the module directory and regenerate the manifest
pub async fn handle_sync(
    cmd: SyncCommand,
    registry: &Registry,
    opts: &GlobalOpts,
) -> Result<(), RegistryError> {
    if !opts.json {
        logger::spinner_start("Scanning modules");
    }
    let result = registry.sync_all(cmd.force).await;
    if !opts.json {
        logger::spinner_stop();
    }

    let report = result?;
    emit(opts, &report, print_report);
    Ok(())
}

fn print_report(report: &SyncReport) {
    for id in &report.dropped_entries {
        logger::warn(&format!("Dropped hand-written entry '{}' (id reused by a module)", id));
    }
    if report.written {
        logger::success(&report.summary);
    } else {
        println!("{}", report.summary);
    }
}
