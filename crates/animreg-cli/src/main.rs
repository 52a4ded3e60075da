use animreg::{
    commands::{
        cleanup::{self, CleanupCommand},
        config::{self, ConfigAction},
        create::{self, CreateCommand},
        delete::{self, DeleteCommand},
        open_registry,
        resolve::{self, ResolveCommand},
        sync::{self, SyncCommand},
        watch::{self, WatchCommand},
    },
    common::report_failure,
    logger, GlobalOpts,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "animreg")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Animation registry manager",
    long_about = "animreg keeps an animation registry manifest in sync with its module directory."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a module and register it in the manifest
    Create(CreateCommand),
    /// Rescan every module and regenerate the manifest
    Sync(SyncCommand),
    /// Remove a module and its manifest entry
    Delete(DeleteCommand),
    /// Remove manifest entries whose module file is gone
    Cleanup(CleanupCommand),
    /// Check a name for collisions without creating anything
    Resolve(ResolveCommand),
    /// Watch for deleted modules and hand edits until interrupted
    Watch(WatchCommand),
    /// Show or change settings
    #[command(subcommand_required = false, arg_required_else_help = false)]
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

/// Route library `tracing` events to stderr at the logger's verbosity
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logger::verbosity_to_filter()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let opts = cli.global;

    if let Err(e) = logger::init_with_verbosity(opts.verbosity_level(), false) {
        eprintln!("Warning: Failed to initialize logger: {}", e);
    }
    init_tracing();

    let command = match cli.command {
        Commands::Config { action } => {
            if let Err(e) = config::handle_config(action, &opts) {
                logger::error(&format!("Config command failed: {}", e));
                std::process::exit(1);
            }
            return;
        }
        command => command,
    };

    let registry = match open_registry() {
        Ok(registry) => registry,
        Err(e) => {
            logger::error(&format!("{:#}", e));
            std::process::exit(1);
        }
    };

    let result = match command {
        Commands::Create(cmd) => create::handle_create(cmd, &registry, &opts).await,
        Commands::Sync(cmd) => sync::handle_sync(cmd, &registry, &opts).await,
        Commands::Delete(cmd) => delete::handle_delete(cmd, &registry, &opts).await,
        Commands::Cleanup(cmd) => cleanup::handle_cleanup(cmd, &registry, &opts).await,
        Commands::Resolve(cmd) => resolve::handle_resolve(cmd, &registry, &opts).await,
        Commands::Watch(cmd) => watch::handle_watch(cmd, registry, &opts).await,
        Commands::Config { .. } => Ok(()),
    };

    if let Err(e) = result {
        report_failure(&opts, &e);
        std::process::exit(1);
    }
}
