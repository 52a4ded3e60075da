//! Error types surfaced by registry operations
//!
//! Every variant maps to a stable machine-readable kind so that callers
//! driving the CLI through `--json` can branch on it.

use animreg_manifest::ManifestError;
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Module name '{requested}' collides with {}", conflicts_with.join(", "))]
    NameConflict {
        requested: String,
        conflicts_with: Vec<String>,
        /// Collision-free names in priority order
        alternatives: Vec<String>,
    },

    #[error("Invalid module name: '{0}'")]
    InvalidName(String),

    #[error("Module not found: {0}")]
    NotFound(String),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

impl RegistryError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        RegistryError::Io {
            path: path.into(),
            source,
        }
    }

    /// Stable identifier of the failure class
    pub fn kind(&self) -> &'static str {
        match self {
            RegistryError::NameConflict { .. } => "name_conflict",
            RegistryError::InvalidName(_) => "invalid_name",
            RegistryError::NotFound(_) => "not_found",
            RegistryError::Io { .. } => "io",
            RegistryError::Manifest(_) => "manifest",
        }
    }

    pub fn alternatives(&self) -> &[String] {
        match self {
            RegistryError::NameConflict { alternatives, .. } => alternatives,
            _ => &[],
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            message: self.to_string(),
            alternatives: self.alternatives().to_vec(),
        }
    }
}

/// Serializable form of a failed operation
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_stable() {
        let conflict = RegistryError::NameConflict {
            requested: "Orbs".to_string(),
            conflicts_with: vec!["Orbs".to_string()],
            alternatives: vec!["OrbsAnimation".to_string()],
        };
        assert_eq!(conflict.kind(), "name_conflict");
        assert_eq!(conflict.alternatives(), ["OrbsAnimation".to_string()]);
        assert_eq!(conflict.to_string(), "Module name 'Orbs' collides with Orbs");

        let missing = RegistryError::NotFound("Ghost".to_string());
        assert_eq!(missing.kind(), "not_found");
        assert!(missing.alternatives().is_empty());

        let io_err = RegistryError::io("src/Root.tsx", io::Error::other("disk full"));
        assert_eq!(io_err.kind(), "io");
        assert_eq!(io_err.to_string(), "IO error on src/Root.tsx: disk full");
    }

    #[test]
    fn test_report_serializes() {
        let report = RegistryError::InvalidName("3d".to_string()).report();
        let json = serde_json::to_string(&report).unwrap_or_default();
        assert_eq!(
            json,
            r#"{"kind":"invalid_name","message":"Invalid module name: '3d'"}"#
        );
    }
}
