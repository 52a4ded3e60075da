//! Data model for animation modules and the registry manifest
//!
//! Parsed manifest blocks keep their raw text and line span so that content
//! this crate does not own can be written back byte-for-byte.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// =============================================================================
// ANIMATION MODULE
// =============================================================================

/// A single field of a module's `<Name>Parameters` interface
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// Type annotation as written, trimmed of trailing punctuation
    pub type_token: String,
    pub optional: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>, type_token: impl Into<String>, optional: bool) -> Self {
        Parameter {
            name: name.into(),
            type_token: type_token.into(),
            optional,
        }
    }
}

pub type Parameters = SmallVec<[Parameter; 8]>;

/// Where a module's duration came from, in decreasing priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationSource {
    /// Duration hint passed when the module was authored
    Explicit,
    /// `durationInFrames` constant exported by the module source
    Declared,
    /// Keyword heuristic on the module name
    #[default]
    Inferred,
}

/// An analyzed animation module as seen by one directory scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationModule {
    pub name: String,
    #[serde(skip)]
    pub source_text: String,
    pub parameters: Parameters,
    pub has_parameters: bool,
    pub duration_frames: u32,
    pub duration_source: DurationSource,
    pub description_tag: String,
}

impl AnimationModule {
    /// Name of the validator schema constant generated for this module
    pub fn schema_name(&self) -> String {
        schema_name_for(&self.name)
    }
}

pub fn schema_name_for(module_name: &str) -> String {
    format!("{}Schema", module_name)
}

// =============================================================================
// MANIFEST DOCUMENT
// =============================================================================

/// Half-open range of zero-based line indices in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

impl LineSpan {
    pub fn new(start: usize, end: usize) -> Self {
        LineSpan { start, end }
    }
}

/// One `import ... from "..."` statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportLine {
    pub raw: String,
    /// Local names the statement binds
    pub bindings: SmallVec<[String; 2]>,
    pub source: String,
    pub span: LineSpan,
}

impl ImportLine {
    /// Whether the import points at a file of this project rather than a package
    pub fn is_relative(&self) -> bool {
        self.source.starts_with("./") || self.source.starts_with("../")
    }

    /// Module name a relative import refers to (last path segment, without extension)
    pub fn module_ref(&self) -> Option<&str> {
        if !self.is_relative() {
            return None;
        }
        let last = self.source.rsplit('/').next()?;
        let stem = last.split('.').next().unwrap_or(last);
        (!stem.is_empty()).then_some(stem)
    }

    pub fn binds(&self, name: &str) -> bool {
        self.bindings.iter().any(|b| b == name)
    }

    /// Dedupe key: whitespace collapsed, double quotes, trailing semicolon
    pub fn normalized(&self) -> String {
        let collapsed = self
            .raw
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .replace('\'', "\"")
            .replace("{ ", "{")
            .replace(" }", "}");
        let trimmed = collapsed.trim_end_matches(';').trim_end();
        format!("{};", trimmed)
    }
}

/// A `const <Owner>Schema = z.object({...});` block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaBlock {
    pub raw: String,
    pub owner: String,
    pub span: LineSpan,
}

impl SchemaBlock {
    pub fn name(&self) -> String {
        schema_name_for(&self.owner)
    }
}

/// An item inside the root fragment
///
/// Either a `<Composition ... />` element or hand-written markup the manifest
/// does not interpret, in which case every attribute is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub raw: String,
    pub id: Option<String>,
    /// Component the entry renders
    pub module_ref: Option<String>,
    pub duration_frames: Option<u32>,
    pub schema_ref: Option<String>,
    pub span: LineSpan,
}

impl Entry {
    /// Markup kept verbatim, such as a comment or a `<Still />`
    pub fn opaque(raw: String, span: LineSpan) -> Self {
        Entry {
            raw,
            id: None,
            module_ref: None,
            duration_frames: None,
            schema_ref: None,
            span,
        }
    }

    pub fn is_opaque(&self) -> bool {
        self.id.is_none() && self.module_ref.is_none()
    }
}

/// Top-level text the manifest neither generates nor understands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtherBlock {
    pub raw: String,
    pub span: LineSpan,
}

/// Parsed registry manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDocument {
    pub imports: Vec<ImportLine>,
    pub schemas: Vec<SchemaBlock>,
    pub others: Vec<OtherBlock>,
    /// Identifier of the exported root component
    pub root_name: String,
    pub entries: Vec<Entry>,
}

pub const DEFAULT_ROOT_NAME: &str = "RemotionRoot";

impl Default for ManifestDocument {
    fn default() -> Self {
        ManifestDocument {
            imports: Vec::new(),
            schemas: Vec::new(),
            others: Vec::new(),
            root_name: DEFAULT_ROOT_NAME.to_string(),
            entries: Vec::new(),
        }
    }
}

impl ManifestDocument {
    pub fn entry_by_id(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id.as_deref() == Some(id))
    }

    /// Whether any entry renders the given component
    pub fn references_component(&self, component: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.module_ref.as_deref() == Some(component))
    }

    /// Names of modules the manifest imports from under `import_prefix`
    pub fn module_refs_under(&self, import_prefix: &str) -> Vec<String> {
        let prefix = format!("{}/", import_prefix.trim_end_matches('/'));
        let mut names: Vec<String> = self
            .imports
            .iter()
            .filter(|imp| imp.source.starts_with(&prefix))
            .filter_map(|imp| imp.module_ref().map(str::to_string))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Every name a new module must not collide with
    pub fn claimed_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for entry in &self.entries {
            names.extend(entry.id.iter().cloned());
            names.extend(entry.module_ref.iter().cloned());
        }
        for import in self.imports.iter().filter(|imp| imp.is_relative()) {
            names.extend(import.bindings.iter().cloned());
        }
        names.sort();
        names.dedup();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn import(raw: &str, bindings: &[&str], source: &str) -> ImportLine {
        ImportLine {
            raw: raw.to_string(),
            bindings: bindings.iter().map(|b| b.to_string()).collect(),
            source: source.to_string(),
            span: LineSpan::default(),
        }
    }

    #[test]
    fn test_module_ref_only_for_relative_imports() {
        let module = import(
            "import { Orbs } from \"./animations/Orbs\";",
            &["Orbs"],
            "./animations/Orbs",
        );
        assert_eq!(module.module_ref(), Some("Orbs"));

        let package = import("import { z } from \"zod\";", &["z"], "zod");
        assert_eq!(package.module_ref(), None);

        let with_ext = import("import { A } from '../lib/A.tsx'", &["A"], "../lib/A.tsx");
        assert_eq!(with_ext.module_ref(), Some("A"));
    }

    #[test]
    fn test_normalized_import_text() {
        let a = import("import {  Orbs } from './animations/Orbs'", &["Orbs"], "");
        let b = import("import { Orbs } from \"./animations/Orbs\";", &["Orbs"], "");
        assert_eq!(a.normalized(), b.normalized());
        assert_eq!(b.normalized(), "import {Orbs} from \"./animations/Orbs\";");
    }

    #[test]
    fn test_claimed_names() {
        let doc = ManifestDocument {
            imports: vec![
                import("", &["Composition"], "remotion"),
                import("", &["Orbs"], "./animations/Orbs"),
            ],
            entries: vec![Entry {
                raw: String::new(),
                id: Some("Intro".to_string()),
                module_ref: Some("IntroCard".to_string()),
                duration_frames: Some(90),
                schema_ref: None,
                span: LineSpan::default(),
            }],
            ..Default::default()
        };
        assert_eq!(doc.claimed_names(), vec!["Intro", "IntroCard", "Orbs"]);
        assert_eq!(doc.module_refs_under("./animations"), vec!["Orbs"]);
    }

    #[test]
    fn test_schema_name() {
        let module = AnimationModule {
            name: "BouncingBall".to_string(),
            source_text: String::new(),
            parameters: smallvec![Parameter::new("count", "number", false)],
            has_parameters: true,
            duration_frames: 240,
            duration_source: DurationSource::Explicit,
            description_tag: "Bouncing Ball".to_string(),
        };
        assert_eq!(module.schema_name(), "BouncingBallSchema");
    }
}
