pub mod cleanup;
pub mod config;
pub mod create;
pub mod delete;
pub mod resolve;
pub mod sync;
pub mod watch;

use crate::logger;
use crate::registry::Registry;
use animreg_config::Config;
use anyhow::Context;
use std::path::PathBuf;

/// Registry for the project in the current directory
pub fn open_registry() -> anyhow::Result<Registry> {
    let config_path = Config::path();
    logger::debug(&format!("Reading config from: {}", config_path.display()));
    let config = Config::load_from_path(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    let root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    Ok(Registry::open(config, root))
}
