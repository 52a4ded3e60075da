use crate::common::GlobalOpts;
use crate::logger;
use animreg_config::{Config, ConfigError};
use clap::Subcommand;
use colored::Colorize;
use std::collections::BTreeMap;

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print every setting
    Show,
    /// Change one setting (e.g. `fps 60`, `on-conflict reject`)
    Set { key: String, value: String },
    /// Print the config file location
    Path,
}

pub fn handle_config(action: Option<ConfigAction>, opts: &GlobalOpts) -> Result<(), ConfigError> {
    match action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => {
            let config = Config::load()?;
            if opts.json {
                let values: BTreeMap<&str, String> = config.values_iter().into_iter().collect();
                match serde_json::to_string_pretty(&values) {
                    Ok(json) => println!("{}", json),
                    Err(e) => logger::error(&format!("Failed to serialize config: {}", e)),
                }
                return Ok(());
            }

            println!("{}", "Configuration:".bold().green());
            for (key, value) in config.values_iter() {
                println!("  {}: {}", key.cyan(), value);
            }
            if opts.verbosity_level() > 0 {
                println!("  {} {}", "file".cyan(), Config::path().display());
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, value.clone())?;
            config.save()?;
            logger::success(&format!("Set {} = {}", key, value));
        }
        ConfigAction::Path => {
            let config_path = Config::path();
            logger::debug(&format!("Reading config from: {}", config_path.display()));
            println!("{}", config_path.display());
        }
    }
    Ok(())
}
