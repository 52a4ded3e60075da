//! Static analysis of animation modules
//!
//! This crate reads module sources without running them:
//! 1. Locating the `<Name>Parameters` interface, through the ast-grep TSX
//!    grammar or a declaration pattern
//! 2. Parsing its fields into an ordered parameter list
//! 3. Resolving a duration from the author's hint, a declared constant or
//!    the name heuristic
//!
//! It also owns module naming: canonical casing, collision detection against
//! the registry and alternative-name generation.

pub mod analyzer;
pub mod duration;
pub mod errors;
pub mod naming;
pub mod parameters;
pub mod resolver;

use regex::Regex;

pub use analyzer::{
    analyze_batch, AnalyzeOptions, AstGrepAnalyzer, ModuleAnalyzer, ModuleSource, PatternAnalyzer,
};
pub use errors::AnalysisError;
pub use naming::{canonical_name, description_tag, rename_identifiers};
pub use resolver::{resolve_name, similarity, NameResolutionResult};

pub(crate) fn pattern(re: &str) -> Regex {
    Regex::new(re).unwrap_or_else(|err| panic!("invalid analyzer pattern {re}: {err}"))
}
