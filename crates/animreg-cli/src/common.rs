//! Common types and utilities shared across commands

use crate::errors::RegistryError;
use crate::logger;
use clap::Parser;
use serde::Serialize;

/// Global CLI options available to all commands
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    #[arg(short, long, global = true, help = "Decrease verbosity")]
    pub quiet: bool,

    #[arg(short, long, global = true, action = clap::ArgAction::Count, help = "Increase verbosity (-v for debug, -vv for trace)")]
    pub verbose: u8,

    #[arg(long, global = true, help = "Print results as JSON on stdout")]
    pub json: bool,
}

impl GlobalOpts {
    /// Get the effective verbosity level
    /// - 0: quiet/warn only
    /// - 1: debug (-v)
    /// - 2: trace (-vv)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

/// Print `value` as JSON, or run `human` for console output
pub fn emit<T: Serialize>(opts: &GlobalOpts, value: &T, human: impl FnOnce(&T)) {
    if opts.json {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{}", json),
            Err(e) => logger::error(&format!("Failed to serialize result: {}", e)),
        }
    } else {
        human(value);
    }
}

/// Report a failed operation in the selected output format
pub fn report_failure(opts: &GlobalOpts, err: &RegistryError) {
    if opts.json {
        #[derive(Serialize)]
        struct Failure<'a> {
            error: &'a crate::errors::ErrorReport,
        }
        let report = err.report();
        emit(opts, &Failure { error: &report }, |_| {});
    } else {
        logger::error(&err.to_string());
        if !err.alternatives().is_empty() {
            eprintln!("  Alternatives: {}", err.alternatives().join(", "));
        }
    }
}
