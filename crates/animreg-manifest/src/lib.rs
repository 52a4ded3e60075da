//! Animation Registry Manifest
//!
//! This crate owns the registry manifest: the single file that imports every
//! animation module, declares one validator schema per module and lists one
//! composition entry per module inside the root component.
//!
//! Parsing keeps the raw text and line span of every block, so the merger can
//! regenerate the auto-managed region while passing hand-written content
//! through unchanged, and scoped removal can cut a single module out without
//! touching any other byte.

pub mod errors;
pub mod merger;
pub mod parser;
pub mod schema;
pub mod types;
pub mod writer;

pub use types::{
    schema_name_for, AnimationModule, DurationSource, Entry, ImportLine, LineSpan,
    ManifestDocument, OtherBlock, Parameter, Parameters, SchemaBlock, DEFAULT_ROOT_NAME,
};

pub use errors::ManifestError;

pub use merger::{
    merge, remove_module, strip_unreferenced_import, unreferenced_imports, BaselineSpec,
    MergeOptions, MergeOutcome, MergeStats, RemovalOutcome,
};
pub use parser::{parse, HEADER_COMMENT};
pub use schema::synthesize;
pub use writer::{serialize, RenderSettings};
