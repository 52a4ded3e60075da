//! Manifest reconciliation
//!
//! A merge regenerates the auto-managed region (every import, schema and entry
//! tied to a module of the current scan) and passes everything else through
//! untouched. The new text is built entirely in memory; callers commit it.
//!
//! Scoped removal edits the previous text by line span instead of
//! re-serializing, so content unrelated to the removed module keeps its exact
//! bytes, formatting included.

use crate::errors::ManifestError;
use crate::parser::parse;
use crate::schema::synthesize;
use crate::types::{AnimationModule, DurationSource, ImportLine, LineSpan, ManifestDocument};
use crate::writer::{
    remove_spans, render_entry, render_import, render_schema, serialize, RenderSettings,
};
use ahash::{AHashMap, AHashSet};
use tracing::{debug, warn};

/// The composition that must exist in every manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineSpec {
    pub id: String,
    pub component: String,
    pub import_source: String,
    pub duration_frames: u32,
}

impl Default for BaselineSpec {
    fn default() -> Self {
        BaselineSpec {
            id: "Baseline".to_string(),
            component: "Baseline".to_string(),
            import_source: "./Baseline".to_string(),
            duration_frames: 150,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOptions {
    /// Import path prefix of module files, e.g. `./animations`
    pub import_prefix: String,
    pub render: RenderSettings,
    pub baseline: BaselineSpec,
}

impl Default for MergeOptions {
    fn default() -> Self {
        MergeOptions {
            import_prefix: "./animations".to_string(),
            render: RenderSettings::default(),
            baseline: BaselineSpec::default(),
        }
    }
}

impl MergeOptions {
    fn module_source(&self, name: &str) -> String {
        format!("{}/{}", self.import_prefix.trim_end_matches('/'), name)
    }
}

/// Counters describing what a merge did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub generated_entries: usize,
    pub preserved_entries: usize,
    pub schemas_generated: usize,
    /// Preserved entries dropped because their id clashed
    pub dropped_entries: Vec<String>,
    pub baseline_inserted: bool,
    /// The previous manifest could not be parsed and was treated as empty
    pub previous_corrupt: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub text: String,
    pub stats: MergeStats,
}

/// Result of removing one module's blocks from a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalOutcome {
    pub text: String,
    pub removed_imports: usize,
    pub removed_schemas: usize,
    pub removed_entries: usize,
}

impl RemovalOutcome {
    pub fn removed_anything(&self) -> bool {
        self.removed_imports + self.removed_schemas + self.removed_entries > 0
    }
}

const REQUIRED_IMPORTS: &[(&str, &str)] = &[("Composition", "remotion"), ("z", "zod")];

/// Regenerate the manifest for the modules of the current scan
///
/// Never fails: an unparseable previous manifest is logged and treated as
/// empty.
pub fn merge(
    previous: Option<&str>,
    modules: &[AnimationModule],
    options: &MergeOptions,
) -> MergeOutcome {
    let mut stats = MergeStats::default();

    let previous_doc = match previous.map(parse).transpose() {
        Ok(doc) => doc.unwrap_or_default(),
        Err(err) => {
            warn!("Previous manifest unreadable, regenerating from scratch: {}", err);
            stats.previous_corrupt = true;
            ManifestDocument::default()
        }
    };

    // Stable module order regardless of directory listing order
    let mut scanned: Vec<&AnimationModule> = Vec::with_capacity(modules.len());
    let mut seen: AHashSet<&str> = AHashSet::new();
    let mut sorted: Vec<&AnimationModule> = modules.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    for module in sorted {
        if seen.insert(module.name.as_str()) {
            scanned.push(module);
        } else {
            warn!("Module '{}' scanned twice, keeping the first", module.name);
        }
    }
    let scan_set: AHashSet<&str> = scanned.iter().map(|m| m.name.as_str()).collect();

    // Durations of auto-managed entries survive re-scans that only have a heuristic
    let previous_durations: AHashMap<&str, u32> = previous_doc
        .entries
        .iter()
        .filter_map(|entry| {
            let module = entry.module_ref.as_deref()?;
            scan_set
                .contains(module)
                .then_some((module, entry.duration_frames?))
        })
        .collect();

    // Partition: everything not tied to a scanned module is preserved verbatim
    let preserved_imports: Vec<_> = previous_doc
        .imports
        .iter()
        .filter(|imp| {
            let binds_scanned = imp.bindings.iter().any(|b| scan_set.contains(b.as_str()));
            !(binds_scanned && imp.is_relative())
        })
        .cloned()
        .collect();
    let preserved_schemas: Vec<_> = previous_doc
        .schemas
        .iter()
        .filter(|schema| !scan_set.contains(schema.owner.as_str()))
        .cloned()
        .collect();
    let preserved_entries: Vec<_> = previous_doc
        .entries
        .iter()
        .filter(|entry| {
            entry
                .module_ref
                .as_deref()
                .map_or(true, |module| !scan_set.contains(module))
        })
        .cloned()
        .collect();

    // Fresh triples for the scan
    let mut fresh_imports = Vec::with_capacity(scanned.len());
    let mut fresh_schemas = Vec::new();
    let mut fresh_entries = Vec::with_capacity(scanned.len());
    for module in &scanned {
        let duration = match module.duration_source {
            DurationSource::Inferred => previous_durations
                .get(module.name.as_str())
                .copied()
                .unwrap_or(module.duration_frames),
            DurationSource::Explicit | DurationSource::Declared => module.duration_frames,
        };

        fresh_imports.push(render_import(
            &module.name,
            &options.module_source(&module.name),
        ));

        let schema_name = if module.has_parameters {
            fresh_schemas.push(render_schema(
                &module.name,
                synthesize(&module.name, &module.parameters),
            ));
            Some(module.schema_name())
        } else {
            None
        };

        fresh_entries.push(render_entry(
            &module.name,
            &module.name,
            duration,
            schema_name.as_deref(),
            &options.render,
        ));
    }

    // Entry ids stay unique; generated entries win over preserved ones
    let fresh_ids: AHashSet<&str> = fresh_entries
        .iter()
        .filter_map(|e| e.id.as_deref())
        .collect();
    let mut kept_ids: AHashSet<String> = AHashSet::new();
    let mut entries = Vec::with_capacity(preserved_entries.len() + fresh_entries.len() + 1);
    for entry in preserved_entries {
        if let Some(id) = entry.id.as_deref() {
            if fresh_ids.contains(id) || !kept_ids.insert(id.to_string()) {
                warn!("Dropping hand-written entry with duplicate id '{}'", id);
                stats.dropped_entries.push(id.to_string());
                continue;
            }
        }
        entries.push(entry);
    }
    stats.preserved_entries = entries.iter().filter(|e| !e.is_opaque()).count();
    stats.generated_entries = fresh_entries.len();
    stats.schemas_generated = fresh_schemas.len();

    let mut imports = Vec::new();
    for (binding, source) in REQUIRED_IMPORTS {
        if !preserved_imports.iter().any(|imp| imp.binds(binding)) {
            imports.push(render_import(binding, source));
        }
    }
    imports.extend(preserved_imports);

    let baseline = &options.baseline;
    let has_baseline = entries
        .iter()
        .chain(fresh_entries.iter())
        .any(|e| e.id.as_deref() == Some(baseline.id.as_str()));
    if !has_baseline {
        debug!("Inserting baseline entry '{}'", baseline.id);
        entries.insert(
            0,
            render_entry(
                &baseline.id,
                &baseline.component,
                baseline.duration_frames,
                None,
                &options.render,
            ),
        );
        if !imports.iter().any(|imp| imp.binds(&baseline.component)) {
            imports.push(render_import(&baseline.component, &baseline.import_source));
        }
        stats.baseline_inserted = true;
    }

    imports.extend(fresh_imports);
    entries.extend(fresh_entries);

    // Exact-text dedupe, first occurrence wins
    let mut seen_imports: AHashSet<String> = AHashSet::new();
    imports.retain(|imp| seen_imports.insert(imp.normalized()));

    let mut schemas = preserved_schemas;
    schemas.extend(fresh_schemas);

    let doc = ManifestDocument {
        imports,
        schemas,
        others: previous_doc.others,
        root_name: previous_doc.root_name,
        entries,
    };

    MergeOutcome {
        text: serialize(&doc),
        stats,
    }
}

/// Remove one module's import, schema and entries, leaving all other bytes untouched
pub fn remove_module(text: &str, module_name: &str) -> Result<RemovalOutcome, ManifestError> {
    let doc = parse(text)?;

    let mut spans: Vec<LineSpan> = Vec::new();
    let mut outcome = RemovalOutcome {
        text: String::new(),
        removed_imports: 0,
        removed_schemas: 0,
        removed_entries: 0,
    };

    for import in &doc.imports {
        if imports_module(import, module_name) {
            spans.push(import.span);
            outcome.removed_imports += 1;
        }
    }
    for schema in &doc.schemas {
        if schema.owner == module_name {
            spans.push(schema.span);
            outcome.removed_schemas += 1;
        }
    }
    for entry in &doc.entries {
        if entry.module_ref.as_deref() == Some(module_name) {
            spans.push(entry.span);
            outcome.removed_entries += 1;
        }
    }

    outcome.text = if spans.is_empty() {
        text.to_string()
    } else {
        remove_spans(text, &spans)
    };
    Ok(outcome)
}

/// Whether a relative import pulls in the given module
///
/// Matches a statement that binds only `module_name`, or any statement whose
/// source path ends in the module's file, whatever else it binds.
fn imports_module(import: &ImportLine, module_name: &str) -> bool {
    if !import.is_relative() {
        return false;
    }
    import.module_ref() == Some(module_name)
        || (import.binds(module_name) && import.bindings.len() == 1)
}

/// Module imports that lost their last entry between two observations
///
/// Only names that were rendered by some entry in `previous` count: an import
/// that was never used is someone's deliberate choice, not an orphan.
pub fn unreferenced_imports(
    previous: &ManifestDocument,
    current: &ManifestDocument,
) -> Vec<String> {
    let mut names: Vec<String> = current
        .imports
        .iter()
        .filter(|imp| imp.is_relative())
        .flat_map(|imp| imp.bindings.iter())
        .filter(|binding| {
            previous.references_component(binding) && !current.references_component(binding)
        })
        .cloned()
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Strip an import nothing renders any more, with its schema when no entry uses it
pub fn strip_unreferenced_import(
    text: &str,
    module_name: &str,
) -> Result<RemovalOutcome, ManifestError> {
    let doc = parse(text)?;
    if doc.references_component(module_name) {
        return Ok(RemovalOutcome {
            text: text.to_string(),
            removed_imports: 0,
            removed_schemas: 0,
            removed_entries: 0,
        });
    }

    let schema_in_use = |schema_name: &str| {
        doc.entries
            .iter()
            .any(|e| e.schema_ref.as_deref() == Some(schema_name))
    };

    let mut spans = Vec::new();
    let mut outcome = RemovalOutcome {
        text: String::new(),
        removed_imports: 0,
        removed_schemas: 0,
        removed_entries: 0,
    };
    for import in &doc.imports {
        let other_binding_used = import
            .bindings
            .iter()
            .any(|b| b != module_name && doc.references_component(b));
        if imports_module(import, module_name) && !other_binding_used {
            spans.push(import.span);
            outcome.removed_imports += 1;
        }
    }
    for schema in &doc.schemas {
        if schema.owner == module_name && !schema_in_use(&schema.name()) {
            spans.push(schema.span);
            outcome.removed_schemas += 1;
        }
    }

    outcome.text = if spans.is_empty() {
        text.to_string()
    } else {
        remove_spans(text, &spans)
    };
    Ok(outcome)
}
