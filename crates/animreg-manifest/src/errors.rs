use thiserror::Error;

/// Errors that can occur while reading or rewriting the registry manifest
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    /// The text is not recognizable as a manifest at all
    #[error("Manifest is corrupt: {0}")]
    Corrupt(String),
}
