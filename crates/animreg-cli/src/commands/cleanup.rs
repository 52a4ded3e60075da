use crate::common::{emit, GlobalOpts};
use crate::errors::RegistryError;
use crate::logger;
use crate::registry::{CleanupReport, Registry};
use clap::Args;
use colored::Colorize;

#[derive(Args, Debug, Clone)]
pub struct CleanupCommand {
    /// Report orphans without touching the manifest
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

/// Remove manifest references to module files that no longer exist
pub async fn handle_cleanup(
    cmd: CleanupCommand,
    registry: &Registry,
    opts: &GlobalOpts,
) -> Result<(), RegistryError> {
    let report = registry.cleanup_orphans(cmd.dry_run).await?;
    emit(opts, &report, print_report);
    Ok(())
}

fn print_report(report: &CleanupReport) {
    if report.removed_names.is_empty() {
        println!("No orphaned modules");
        return;
    }

    let heading = if report.dry_run {
        "Orphaned modules (dry run):"
    } else {
        "Removed orphaned modules:"
    };
    println!("{}", heading.bold());
    for name in &report.removed_names {
        println!("  {}", name.yellow());
    }
    if !report.dry_run {
        logger::success(&format!("Cleaned {} module(s)", report.removed_names.len()));
    }
}
