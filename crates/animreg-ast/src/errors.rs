use thiserror::Error;

/// Reasons a module's parameter interface could not be read
///
/// These never leave the analyzer: they are logged and the module is
/// treated as having no parameters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("Parameter block '{0}' is never closed")]
    UnterminatedBlock(String),

    #[error("Parameter block '{block}' has an unreadable field: {field}")]
    MalformedField { block: String, field: String },
}
