use crate::common::{emit, GlobalOpts};
use crate::errors::RegistryError;
use crate::logger;
use crate::registry::{DeleteReport, Registry};
use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct DeleteCommand {
    /// Module to remove (matched case-insensitively)
    pub name: String,

    /// Remove only the manifest entry and leave the source file in place
    #[arg(long)]
    pub keep_file: bool,
}

pub async fn handle_delete(
    cmd: DeleteCommand,
    registry: &Registry,
    opts: &GlobalOpts,
) -> Result<(), RegistryError> {
    let report = registry.delete_module(&cmd.name, !cmd.keep_file).await?;
    emit(opts, &report, print_report);
    Ok(())
}

fn print_report(report: &DeleteReport) {
    match (report.file_deleted, report.entry_removed) {
        (true, true) => logger::success(&format!(
            "Deleted {} and its manifest entry",
            report.module_name
        )),
        (true, false) => logger::success(&format!(
            "Deleted {} (it had no manifest entry)",
            report.module_name
        )),
        (false, true) => logger::success(&format!(
            "Removed manifest entry for {}",
            report.module_name
        )),
        (false, false) => logger::warn(&format!("Nothing to remove for {}", report.module_name)),
    }
}
