use crate::common::{emit, GlobalOpts};
use crate::errors::RegistryError;
use crate::logger;
use crate::registry::{CreateReport, Registry};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

#[derive(Args, Debug, Clone)]
pub struct CreateCommand {
    /// Requested module name (e.g. BouncingBall or bouncing-ball)
    pub name: String,

    /// Module source file. If not provided, reads from stdin
    pub file: Option<PathBuf>,

    /// Duration in seconds; overrides the name heuristic
    #[arg(short, long)]
    pub duration: Option<f64>,
}

async fn read_source(file: Option<&PathBuf>) -> Result<String, RegistryError> {
    match file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RegistryError::io(path, e)),
        None => {
            let mut source = String::new();
            tokio::io::stdin()
                .read_to_string(&mut source)
                .await
                .map_err(|e| RegistryError::io("<stdin>", e))?;
            Ok(source)
        }
    }
}

pub async fn handle_create(
    cmd: CreateCommand,
    registry: &Registry,
    opts: &GlobalOpts,
) -> Result<(), RegistryError> {
    let source = read_source(cmd.file.as_ref()).await?;
    logger::step(&format!("Creating module '{}'", cmd.name));

    let report = registry
        .create_module(&cmd.name, &source, cmd.duration)
        .await?;
    emit(opts, &report, print_report);
    Ok(())
}

fn print_report(report: &CreateReport) {
    if let Some(collision) = &report.collision {
        logger::warn(&format!(
            "'{}' collides with {}; created as '{}'",
            collision.requested_name,
            collision.conflicts_with.join(", "),
            report.resolved_name
        ));
    }
    logger::success(&format!(
        "Created {} ({} frames)",
        report.resolved_name.bold(),
        report.duration_frames
    ));
    println!("  {}: {}", "file".cyan(), report.module_path.display());
    println!("  {}: {}", "tag".cyan(), report.description_tag);
}
