//! animreg library - registry, watcher and CLI commands
//!
//! Exposed as a library so the registry can be driven from tests and from
//! other tools without going through the binary.

pub mod commands;
pub mod common;
pub mod errors;
pub mod fs;
pub mod registry;
pub mod signal;
pub mod watch;

pub use animreg_logger as logger;
pub use common::GlobalOpts;
