use crate::common::{emit, GlobalOpts};
use crate::errors::RegistryError;
use crate::registry::Registry;
use animreg_ast::NameResolutionResult;
use clap::Args;
use colored::Colorize;

#[derive(Args, Debug, Clone)]
pub struct ResolveCommand {
    /// Name to check against the registry
    pub name: String,
}

/// Show what name a create would end up with, without writing anything
pub async fn handle_resolve(
    cmd: ResolveCommand,
    registry: &Registry,
    opts: &GlobalOpts,
) -> Result<(), RegistryError> {
    let result = registry.resolve_name(&cmd.name).await?;
    emit(opts, &result, print_result);
    Ok(())
}

fn print_result(result: &NameResolutionResult) {
    if !result.has_conflict {
        println!("{} is available", result.resolved_name.green().bold());
        return;
    }

    println!(
        "{} collides with {}",
        result.requested_name.yellow().bold(),
        result.conflicts_with.join(", ")
    );
    println!("  {}: {}", "resolved".cyan(), result.resolved_name);
    println!("  {}:", "alternatives".cyan());
    for alternative in &result.alternatives {
        println!("    {}", alternative);
    }
}
