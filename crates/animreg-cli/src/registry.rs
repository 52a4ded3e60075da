//! The animation registry
//!
//! [`Registry`] owns the reconciliation state (known module names, their
//! content fingerprints and the last manifest text it observed) and performs
//! every manifest read-modify-write under a single async lock. New manifest
//! text is always built in memory first and committed with one atomic write,
//! followed by a touch of the reload sentinel.

use crate::errors::RegistryError;
use crate::fs::{FileSystem, TokioFs};
use crate::watch::{ChangeEvent, ChangeKind};
use ahash::RandomState;
use animreg_ast::{
    analyze_batch, canonical_name, rename_identifiers, resolve_name, AnalyzeOptions,
    AstGrepAnalyzer, ModuleAnalyzer, ModuleSource, NameResolutionResult,
};
use animreg_config::{Config, ConflictPolicy};
use animreg_manifest::{
    merge, parse, remove_module, strip_unreferenced_import, unreferenced_imports,
    AnimationModule, BaselineSpec, MergeOptions, RenderSettings,
};
use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::BuildHasher;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Debug, Clone, Serialize)]
pub struct CreateReport {
    pub resolved_name: String,
    /// Present when the requested name collided and was replaced
    pub collision: Option<NameResolutionResult>,
    pub module_path: PathBuf,
    pub duration_frames: u32,
    pub parameter_count: usize,
    pub description_tag: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub scanned_count: usize,
    pub schema_count: usize,
    /// Whether the manifest file was rewritten
    pub written: bool,
    /// Hand-written entries dropped for reusing a generated id
    pub dropped_entries: Vec<String>,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteReport {
    pub module_name: String,
    pub file_deleted: bool,
    pub entry_removed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanupReport {
    pub dry_run: bool,
    pub removed_names: Vec<String>,
}

/// What the registry saw on its last look at the disk
#[derive(Debug, Default)]
struct ObservedState {
    known_names: BTreeSet<String>,
    fingerprints: BTreeMap<String, u64>,
    last_manifest: Option<String>,
}

pub struct Registry {
    config: Config,
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    analyzer: Arc<dyn ModuleAnalyzer>,
    /// Serializes every manifest read-modify-write
    write_lock: tokio::sync::Mutex<()>,
    state: Mutex<ObservedState>,
    hasher: RandomState,
}

impl Registry {
    /// Registry with relative config paths resolved against `root`
    pub fn new(
        config: Config,
        root: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        analyzer: Arc<dyn ModuleAnalyzer>,
    ) -> Self {
        Registry {
            config,
            root: root.into(),
            fs,
            analyzer,
            write_lock: tokio::sync::Mutex::new(()),
            state: Mutex::new(ObservedState::default()),
            hasher: RandomState::new(),
        }
    }

    /// Registry on the real file system with the syntax-tree analyzer
    pub fn open(config: Config, root: impl Into<PathBuf>) -> Self {
        Self::new(config, root, Arc::new(TokioFs), Arc::new(AstGrepAnalyzer))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // PATHS
    // =========================================================================

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    pub fn module_dir(&self) -> PathBuf {
        self.resolve(&self.config.module_dir)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.resolve(&self.config.manifest_path)
    }

    pub fn sentinel_path(&self) -> PathBuf {
        self.resolve(&self.config.sentinel_path)
    }

    pub fn module_path(&self, name: &str) -> PathBuf {
        self.module_dir()
            .join(format!("{}.{}", name, self.config.module_extension))
    }

    fn merge_options(&self) -> MergeOptions {
        let baseline = &self.config.baseline;
        MergeOptions {
            import_prefix: self.config.import_prefix.clone(),
            render: RenderSettings {
                fps: self.config.fps,
                width: self.config.width,
                height: self.config.height,
            },
            baseline: BaselineSpec {
                id: baseline.id.clone(),
                component: baseline.component.clone(),
                import_source: baseline.import_source.clone(),
                duration_frames: baseline.duration_frames,
            },
        }
    }

    // =========================================================================
    // DISK ACCESS
    // =========================================================================

    /// Module names present in the module directory, sorted
    async fn list_module_names(&self) -> Result<Vec<String>> {
        let dir = self.module_dir();
        let files = self
            .fs
            .list_files(&dir)
            .await
            .map_err(|e| RegistryError::io(&dir, e))?;

        let mut names: Vec<String> = files
            .iter()
            .filter(|path| {
                path.extension().and_then(|ext| ext.to_str())
                    == Some(self.config.module_extension.as_str())
            })
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()))
            .filter(|stem| !stem.starts_with('.'))
            .filter(|stem| {
                let usable = canonical_name(stem).as_deref() == Some(*stem);
                if !usable {
                    warn!("Skipping module file with a non-identifier name: {}", stem);
                }
                usable
            })
            .map(str::to_string)
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    async fn read_sources(&self, names: &[String]) -> Result<Vec<ModuleSource>> {
        let mut sources = Vec::with_capacity(names.len());
        for name in names {
            let path = self.module_path(name);
            match self.fs.read_to_string(&path).await {
                Ok(Some(source)) => sources.push(ModuleSource {
                    name: name.clone(),
                    source,
                }),
                // Deleted between listing and reading
                Ok(None) => debug!("Module {} vanished during scan", name),
                Err(e) => return Err(RegistryError::io(&path, e)),
            }
        }
        Ok(sources)
    }

    async fn scan_modules(&self) -> Result<Vec<AnimationModule>> {
        let names = self.list_module_names().await?;
        let sources = self.read_sources(&names).await?;
        Ok(analyze_batch(self.analyzer.as_ref(), &sources, self.config.fps))
    }

    async fn read_manifest(&self) -> Result<Option<String>> {
        let path = self.manifest_path();
        self.fs
            .read_to_string(&path)
            .await
            .map_err(|e| RegistryError::io(&path, e))
    }

    async fn write_manifest(&self, text: &str) -> Result<()> {
        let path = self.manifest_path();
        self.fs
            .write_atomic(&path, text)
            .await
            .map_err(|e| RegistryError::io(&path, e))?;
        self.state.lock().last_manifest = Some(text.to_string());
        Ok(())
    }

    /// Tell the preview environment to reload
    async fn signal_reload(&self) -> Result<()> {
        let path = self.sentinel_path();
        let stamp = format!("{}\n", Utc::now().to_rfc3339());
        self.fs
            .write_atomic(&path, &stamp)
            .await
            .map_err(|e| RegistryError::io(&path, e))
    }

    /// Write the manifest and signal a reload
    ///
    /// When the reload signal cannot be written the manifest is put back to
    /// `previous` (or removed when there was none) before the error returns.
    async fn commit(&self, text: &str, previous: Option<&str>) -> Result<()> {
        self.write_manifest(text).await?;
        if let Err(err) = self.signal_reload().await {
            self.restore_manifest(previous).await;
            return Err(err);
        }
        Ok(())
    }

    async fn restore_manifest(&self, previous: Option<&str>) {
        let path = self.manifest_path();
        let restored = match previous {
            Some(text) => self.fs.write_atomic(&path, text).await,
            None => self.fs.remove_file(&path).await.map(|_| ()),
        };
        match restored {
            Ok(()) => self.state.lock().last_manifest = previous.map(str::to_string),
            Err(err) => warn!("Could not restore {}: {}", path.display(), err),
        }
    }

    fn fingerprint(&self, source: &str) -> u64 {
        self.hasher.hash_one(source)
    }

    fn remember_module(&self, name: &str, source: &str) {
        let fingerprint = self.fingerprint(source);
        let mut state = self.state.lock();
        state.known_names.insert(name.to_string());
        state.fingerprints.insert(name.to_string(), fingerprint);
    }

    fn forget_module(&self, name: &str) {
        let mut state = self.state.lock();
        state.known_names.remove(name);
        state.fingerprints.remove(name);
    }

    fn remember_scan(&self, modules: &[AnimationModule]) {
        let fingerprints: BTreeMap<String, u64> = modules
            .iter()
            .map(|m| (m.name.clone(), self.fingerprint(&m.source_text)))
            .collect();
        let mut state = self.state.lock();
        state.known_names = fingerprints.keys().cloned().collect();
        state.fingerprints = fingerprints;
    }

    /// Every name a new module must not collide with
    async fn existing_names(&self) -> Result<Vec<String>> {
        let mut names: BTreeSet<String> = self.list_module_names().await?.into_iter().collect();
        names.insert(self.config.baseline.id.clone());
        names.insert(self.config.baseline.component.clone());

        if let Some(text) = self.read_manifest().await? {
            match parse(&text) {
                Ok(doc) => names.extend(doc.claimed_names()),
                Err(err) => warn!("Ignoring manifest names: {}", err),
            }
        }
        Ok(names.into_iter().collect())
    }

    // =========================================================================
    // OPERATIONS
    // =========================================================================

    /// Record the current directory and manifest as the baseline for change detection
    pub async fn seed(&self) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let names = self.list_module_names().await?;
        let sources = self.read_sources(&names).await?;
        let manifest = self.read_manifest().await?;

        let fingerprints: BTreeMap<String, u64> = sources
            .iter()
            .map(|s| (s.name.clone(), self.fingerprint(&s.source)))
            .collect();
        let count = fingerprints.len();

        let mut state = self.state.lock();
        state.known_names = fingerprints.keys().cloned().collect();
        state.fingerprints = fingerprints;
        state.last_manifest = manifest;
        Ok(count)
    }

    /// Collision check for a requested name, without side effects
    pub async fn resolve_name(&self, requested: &str) -> Result<NameResolutionResult> {
        let canonical = canonical_name(requested)
            .ok_or_else(|| RegistryError::InvalidName(requested.to_string()))?;
        let existing = self.existing_names().await?;
        Ok(resolve_name(&canonical, &existing))
    }

    /// Write a new module and register it in the manifest
    ///
    /// A colliding name is replaced by the first alternative, or rejected when
    /// the conflict policy says so. Identifiers derived from the requested
    /// name are renamed in the source to match.
    pub async fn create_module(
        &self,
        requested: &str,
        source: &str,
        duration_hint_seconds: Option<f64>,
    ) -> Result<CreateReport> {
        let canonical = canonical_name(requested)
            .ok_or_else(|| RegistryError::InvalidName(requested.to_string()))?;

        let _guard = self.write_lock.lock().await;
        let existing = self.existing_names().await?;
        let resolution = resolve_name(&canonical, &existing);

        if resolution.has_conflict && self.config.on_conflict == ConflictPolicy::Reject {
            return Err(RegistryError::NameConflict {
                requested: canonical,
                conflicts_with: resolution.conflicts_with,
                alternatives: resolution.alternatives,
            });
        }

        let resolved = resolution.resolved_name.clone();
        let mut source = source.to_string();
        if resolved != canonical {
            warn!(
                "Module name '{}' collides with {:?}, using '{}'",
                canonical, resolution.conflicts_with, resolved
            );
            source = rename_identifiers(&source, &canonical, &resolved);
            let raw_is_ident = requested
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
            if requested != canonical && raw_is_ident {
                source = rename_identifiers(&source, requested, &resolved);
            }
        }

        let options = AnalyzeOptions {
            fps: self.config.fps,
            duration_hint_seconds,
        };
        let created = self.analyzer.analyze(&resolved, &source, &options);

        let module_path = self.module_path(&resolved);
        self.fs
            .write_atomic(&module_path, &source)
            .await
            .map_err(|e| RegistryError::io(&module_path, e))?;

        let committed = match self.build_manifest_with(&created).await {
            Ok((previous, text)) => self.commit(&text, previous.as_deref()).await,
            Err(err) => Err(err),
        };
        if let Err(err) = committed {
            self.discard_module_file(&module_path).await;
            return Err(err);
        }
        self.remember_module(&resolved, &source);

        info!(
            "Created module {} ({} frames)",
            resolved, created.duration_frames
        );
        Ok(CreateReport {
            resolved_name: resolved,
            collision: resolution.has_conflict.then_some(resolution),
            module_path,
            duration_frames: created.duration_frames,
            parameter_count: created.parameters.len(),
            description_tag: created.description_tag,
        })
    }

    /// Previous and new manifest text for the current scan plus `created`
    async fn build_manifest_with(
        &self,
        created: &AnimationModule,
    ) -> Result<(Option<String>, String)> {
        let mut modules = self.scan_modules().await?;
        modules.retain(|m| m.name != created.name);
        modules.push(created.clone());

        let previous = self.read_manifest().await?;
        let outcome = merge(previous.as_deref(), &modules, &self.merge_options());
        Ok((previous, outcome.text))
    }

    /// Undo a module file written by a create that could not finish
    async fn discard_module_file(&self, path: &Path) {
        if let Err(err) = self.fs.remove_file(path).await {
            warn!("Could not remove {} after failed create: {}", path.display(), err);
        }
    }

    /// Rescan every module and regenerate the manifest
    ///
    /// Without `force` an unchanged manifest is left alone and no reload is
    /// signalled.
    pub async fn sync_all(&self, force: bool) -> Result<SyncReport> {
        let _guard = self.write_lock.lock().await;
        let modules = self.scan_modules().await?;
        let previous = self.read_manifest().await?;
        let outcome = merge(previous.as_deref(), &modules, &self.merge_options());

        let changed = previous.as_deref() != Some(outcome.text.as_str());
        let written = force || changed;
        if written {
            self.commit(&outcome.text, previous.as_deref()).await?;
        } else {
            self.state.lock().last_manifest = previous;
        }
        self.remember_scan(&modules);

        let stats = &outcome.stats;
        let summary = format!(
            "Scanned {} module(s), {} schema(s), {} preserved entr{}; manifest {}",
            modules.len(),
            stats.schemas_generated,
            stats.preserved_entries,
            if stats.preserved_entries == 1 { "y" } else { "ies" },
            if written { "written" } else { "unchanged" }
        );
        info!("{}", summary);

        Ok(SyncReport {
            scanned_count: modules.len(),
            schema_count: stats.schemas_generated,
            written,
            dropped_entries: stats.dropped_entries.clone(),
            summary,
        })
    }

    /// Remove a module's manifest triple and optionally its file
    ///
    /// The module is matched case-insensitively against the module directory
    /// and the manifest.
    pub async fn delete_module(&self, name: &str, delete_file: bool) -> Result<DeleteReport> {
        let _guard = self.write_lock.lock().await;
        let on_disk = self
            .list_module_names()
            .await?
            .into_iter()
            .find(|n| n.eq_ignore_ascii_case(name));
        let previous = self.read_manifest().await?;

        let in_manifest = previous
            .as_deref()
            .and_then(|text| parse(text).ok())
            .and_then(|doc| {
                doc.entries
                    .iter()
                    .filter_map(|e| e.module_ref.clone())
                    .chain(
                        doc.imports
                            .iter()
                            .filter(|imp| imp.is_relative())
                            .flat_map(|imp| imp.bindings.iter().cloned()),
                    )
                    .find(|n| n.eq_ignore_ascii_case(name))
            });

        let Some(target) = on_disk.clone().or(in_manifest) else {
            return Err(RegistryError::NotFound(name.to_string()));
        };

        let mut file_deleted = false;
        if delete_file && on_disk.is_some() {
            let path = self.module_path(&target);
            file_deleted = self
                .fs
                .remove_file(&path)
                .await
                .map_err(|e| RegistryError::io(&path, e))?;
            self.forget_module(&target);
        }

        let mut entry_removed = false;
        if let Some(text) = previous {
            let outcome = remove_module(&text, &target)?;
            if outcome.removed_anything() {
                self.commit(&outcome.text, Some(&text)).await?;
                entry_removed = outcome.removed_entries > 0;
            }
        }

        info!(
            "Deleted module {} (file: {}, entry: {})",
            target, file_deleted, entry_removed
        );
        Ok(DeleteReport {
            module_name: target,
            file_deleted,
            entry_removed,
        })
    }

    /// Remove every manifest reference to a module file that no longer exists
    pub async fn cleanup_orphans(&self, dry_run: bool) -> Result<CleanupReport> {
        let _guard = self.write_lock.lock().await;
        let Some(text) = self.read_manifest().await? else {
            return Ok(CleanupReport {
                dry_run,
                removed_names: Vec::new(),
            });
        };
        let doc = match parse(&text) {
            Ok(doc) => doc,
            Err(err) => {
                warn!("Skipping orphan cleanup: {}", err);
                return Ok(CleanupReport {
                    dry_run,
                    removed_names: Vec::new(),
                });
            }
        };

        let present: BTreeSet<String> = self
            .list_module_names()
            .await?
            .iter()
            .map(|n| n.to_ascii_lowercase())
            .collect();
        let prefix = format!("{}/", self.config.import_prefix.trim_end_matches('/'));

        let mut orphans: Vec<String> = doc
            .imports
            .iter()
            .filter(|imp| imp.source.starts_with(&prefix))
            .filter(|imp| {
                imp.module_ref()
                    .is_some_and(|m| !present.contains(&m.to_ascii_lowercase()))
            })
            .flat_map(|imp| imp.bindings.iter().cloned())
            .collect();
        orphans.sort();
        orphans.dedup();

        if orphans.is_empty() || dry_run {
            return Ok(CleanupReport {
                dry_run,
                removed_names: orphans,
            });
        }

        let mut updated = text.clone();
        for name in &orphans {
            updated = remove_module(&updated, name)?.text;
        }
        self.commit(&updated, Some(&text)).await?;
        for name in &orphans {
            self.forget_module(name);
        }

        warn!("Removed orphaned modules: {}", orphans.join(", "));
        Ok(CleanupReport {
            dry_run,
            removed_names: orphans,
        })
    }

    /// Remove one vanished module's triple after confirming its file is gone
    ///
    /// Returns `false` when the file exists again (a fast re-create raced the
    /// detector) or when the manifest held nothing for it.
    pub async fn scoped_cleanup(&self, name: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let path = self.module_path(name);
        if self.fs.exists(&path).await.map_err(|e| RegistryError::io(&path, e))? {
            debug!("{} exists again, skipping cleanup", name);
            return Ok(false);
        }
        self.forget_module(name);

        let Some(text) = self.read_manifest().await? else {
            return Ok(false);
        };
        let outcome = remove_module(&text, name)?;
        if !outcome.removed_anything() {
            return Ok(false);
        }
        self.commit(&outcome.text, Some(&text)).await?;
        warn!("Cleaned up orphaned module {}", name);
        Ok(true)
    }

    /// Strip an import whose last entry was removed from the manifest
    pub async fn strip_unreferenced(&self, name: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let Some(text) = self.read_manifest().await? else {
            return Ok(false);
        };
        let outcome = strip_unreferenced_import(&text, name)?;
        if !outcome.removed_anything() {
            return Ok(false);
        }
        self.commit(&outcome.text, Some(&text)).await?;
        warn!("Stripped unreferenced import {}", name);
        Ok(true)
    }

    /// Compare the disk against the last observation and report what changed
    ///
    /// Deletions come first, then imports that lost their entry, then
    /// creations and modifications; each group is sorted by name.
    pub async fn observe_changes(&self) -> Result<Vec<ChangeEvent>> {
        let _guard = self.write_lock.lock().await;
        let names = self.list_module_names().await?;
        let sources = self.read_sources(&names).await?;
        let manifest = self.read_manifest().await?;
        let observed_at = Utc::now();

        let fingerprints: BTreeMap<String, u64> = sources
            .iter()
            .map(|s| (s.name.clone(), self.fingerprint(&s.source)))
            .collect();

        let mut state = self.state.lock();
        let mut events = Vec::new();

        for gone in state
            .known_names
            .iter()
            .filter(|name| !fingerprints.contains_key(*name))
        {
            events.push(ChangeEvent::new(ChangeKind::Deleted, gone, observed_at));
        }

        if let (Some(before), Some(after)) = (state.last_manifest.as_deref(), manifest.as_deref()) {
            if before != after {
                if let (Ok(before), Ok(after)) = (parse(before), parse(after)) {
                    for name in unreferenced_imports(&before, &after) {
                        events.push(ChangeEvent::new(ChangeKind::Unreferenced, &name, observed_at));
                    }
                }
            }
        }

        for (name, fingerprint) in &fingerprints {
            if !state.known_names.contains(name) {
                events.push(ChangeEvent::new(ChangeKind::Created, name, observed_at));
            } else if state
                .fingerprints
                .get(name)
                .is_some_and(|previous| previous != fingerprint)
            {
                events.push(ChangeEvent::new(ChangeKind::Modified, name, observed_at));
            }
        }

        state.known_names = fingerprints.keys().cloned().collect();
        state.fingerprints = fingerprints;
        state.last_manifest = manifest;
        Ok(events)
    }

    /// Names the registry currently believes exist
    pub fn known_names(&self) -> Vec<String> {
        self.state.lock().known_names.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;
    use animreg_ast::PatternAnalyzer;

    const BALL_SOURCE: &str = r#"import { useCurrentFrame } from "remotion";

export interface BouncingBallParameters {
  color: string;
  bounces?: number;
}

export const BouncingBall: React.FC<BouncingBallParameters> = ({ color }) => {
  const frame = useCurrentFrame();
  return <div style={{ color }}>{frame}</div>;
};
"#;

    const MANUAL_ENTRY: &str = "      <Composition\n        id=\"Credits\"\n        component={Credits}\n        durationInFrames={90}\n        fps={30}\n        width={1920}\n        height={1080}\n      />";

    fn registry_with(config: Config) -> (Arc<MemoryFs>, Registry) {
        let fs = Arc::new(MemoryFs::new());
        let registry = Registry::new(config, PathBuf::new(), fs.clone(), Arc::new(PatternAnalyzer));
        (fs, registry)
    }

    fn registry() -> (Arc<MemoryFs>, Registry) {
        registry_with(Config::default())
    }

    fn simple_source(name: &str) -> String {
        format!("export const {name}: React.FC = () => null;\n")
    }

    fn manifest(fs: &MemoryFs) -> String {
        fs.get("src/Root.tsx").unwrap_or_default()
    }

    /// Insert a hand-written Credits entry and its import into the stored manifest
    fn add_manual_entry(fs: &MemoryFs) {
        let text = manifest(fs)
            .replacen(
                "import { z } from \"zod\";",
                "import { z } from \"zod\";\nimport { Credits } from \"./manual/Credits\";",
                1,
            )
            .replacen("    </>", &format!("{}\n    </>", MANUAL_ENTRY), 1);
        fs.insert("src/Root.tsx", text);
    }

    #[tokio::test]
    async fn test_create_into_empty_registry() {
        let (fs, registry) = registry();
        let Ok(report) = registry.create_module("BouncingBall", BALL_SOURCE, Some(8.0)).await else {
            panic!("create should succeed");
        };

        assert_eq!(report.resolved_name, "BouncingBall");
        assert!(report.collision.is_none());
        assert_eq!(report.duration_frames, 240);
        assert_eq!(report.parameter_count, 2);

        let text = manifest(&fs);
        assert_eq!(
            text.matches("import { BouncingBall } from \"./animations/BouncingBall\";").count(),
            1
        );
        assert_eq!(text.matches("<Composition").count(), 2);
        assert!(text.contains("id=\"Baseline\""));
        assert!(text.contains("durationInFrames={240}"));
        assert!(text.contains("schema={BouncingBallSchema}"));
        assert!(text.contains("  color: z.string(),\n  bounces: z.number().optional(),"));

        assert_eq!(fs.get("src/animations/BouncingBall.tsx").as_deref(), Some(BALL_SOURCE));
        assert!(fs.get("src/.animreg-reload").is_some());
        assert_eq!(registry.known_names(), vec!["BouncingBall"]);
    }

    #[tokio::test]
    async fn test_colliding_create_is_renamed() {
        let (fs, registry) = registry();
        let orbs = "export interface FloatingOrbsParameters { count: number }\nexport const FloatingOrbs = () => null;\n";
        assert!(registry.create_module("FloatingOrbs", orbs, None).await.is_ok());

        let Ok(report) = registry.create_module("FloatingOrbs", orbs, None).await else {
            panic!("colliding create should be renamed");
        };
        let Some(collision) = report.collision.as_ref() else {
            panic!("collision should be reported");
        };
        assert!(collision.has_conflict);
        assert_eq!(collision.conflicts_with, vec!["FloatingOrbs"]);
        assert!(!report.resolved_name.eq_ignore_ascii_case("FloatingOrbs"));

        let path = format!("src/animations/{}.tsx", report.resolved_name);
        let written = fs.get(&path).unwrap_or_default();
        assert!(written.contains(&format!("export const {} =", report.resolved_name)));
        assert!(written.contains(&format!("{}Parameters", report.resolved_name)));
        assert!(manifest(&fs).contains(&format!("id=\"{}\"", report.resolved_name)));
    }

    #[tokio::test]
    async fn test_lowercase_request_reports_existing_name() {
        let (_fs, registry) = registry();
        assert!(registry
            .create_module("FloatingOrbs", &simple_source("FloatingOrbs"), None)
            .await
            .is_ok());

        let Ok(result) = registry.resolve_name("floatingorbs").await else {
            panic!("resolution should succeed");
        };
        assert!(result.has_conflict);
        assert_eq!(result.conflicts_with, vec!["FloatingOrbs"]);
        assert_ne!(result.resolved_name.to_ascii_lowercase(), "floatingorbs");
    }

    #[tokio::test]
    async fn test_reject_policy_fails_with_alternatives() {
        let config = Config {
            on_conflict: ConflictPolicy::Reject,
            ..Config::default()
        };
        let (fs, registry) = registry_with(config);
        assert!(registry.create_module("Orbs", &simple_source("Orbs"), None).await.is_ok());
        let before = manifest(&fs);

        let Err(err) = registry.create_module("orbs", &simple_source("Orbs"), None).await else {
            panic!("reject policy should fail");
        };
        assert_eq!(err.kind(), "name_conflict");
        assert!(!err.alternatives().is_empty());
        assert_eq!(manifest(&fs), before);
    }

    #[tokio::test]
    async fn test_resolved_names_stay_unique() {
        let (_fs, registry) = registry();
        let mut resolved: Vec<String> = Vec::new();
        for requested in ["Orbs", "orbs", "ORBS", "Orbs", "orbs-2"] {
            let created = registry
                .create_module(requested, &simple_source("Orbs"), None)
                .await;
            let Ok(report) = created else {
                panic!("create should succeed for {requested}");
            };
            resolved.push(report.resolved_name);
        }

        for (i, a) in resolved.iter().enumerate() {
            for b in &resolved[i + 1..] {
                assert!(!a.eq_ignore_ascii_case(b), "{a} and {b} collide");
            }
        }
    }

    #[tokio::test]
    async fn test_invalid_name() {
        let (_fs, registry) = registry();
        let result = registry.create_module("3d", "", None).await;
        assert!(result.is_err_and(|e| e.kind() == "invalid_name"));
    }

    #[tokio::test]
    async fn test_sync_is_idempotent_and_keeps_hint_duration() {
        let (fs, registry) = registry();
        assert!(registry.create_module("BouncingBall", BALL_SOURCE, Some(8.0)).await.is_ok());
        fs.insert("src/animations/IntroCard.tsx", simple_source("IntroCard"));

        let Ok(first) = registry.sync_all(false).await else {
            panic!("sync should succeed");
        };
        assert!(first.written);
        assert_eq!(first.scanned_count, 2);
        assert_eq!(first.schema_count, 1);
        let after_first = manifest(&fs);
        assert!(after_first.contains("durationInFrames={240}"));
        assert!(after_first.contains("durationInFrames={150}"));

        let Ok(second) = registry.sync_all(false).await else {
            panic!("sync should succeed");
        };
        assert!(!second.written);
        assert_eq!(manifest(&fs), after_first);

        let forced = registry.sync_all(true).await;
        assert!(forced.is_ok_and(|report| report.written));
        assert_eq!(manifest(&fs), after_first);
    }

    #[tokio::test]
    async fn test_sync_preserves_manual_entry() {
        let (fs, registry) = registry();
        assert!(registry.create_module("Orbs", &simple_source("Orbs"), None).await.is_ok());
        add_manual_entry(&fs);

        assert!(registry.sync_all(true).await.is_ok());
        let text = manifest(&fs);
        assert!(text.contains(MANUAL_ENTRY));
        assert!(text.contains("import { Credits } from \"./manual/Credits\";"));
    }

    #[tokio::test]
    async fn test_sync_preserves_hand_written_root_markup() {
        let (fs, registry) = registry();
        assert!(registry.create_module("Orbs", &simple_source("Orbs"), None).await.is_ok());
        let markup = concat!(
            "      {/* keep this comment */}\n",
            "      <Still id=\"Poster\" component={Poster} width={1080} height={1080} />"
        );
        let text = manifest(&fs)
            .replacen(
                "import { z } from \"zod\";",
                "import { z } from \"zod\";\nimport { Poster } from \"./manual/Poster\";",
                1,
            )
            .replacen("    </>", &format!("{}\n    </>", markup), 1);
        fs.insert("src/Root.tsx", text);

        assert!(registry.sync_all(true).await.is_ok());
        let text = manifest(&fs);
        assert!(text.contains(markup));
        assert!(text.contains("import { Poster } from \"./manual/Poster\";"));
        assert!(text.contains("id=\"Orbs\""));
    }

    #[tokio::test]
    async fn test_sync_recovers_from_corrupt_manifest() {
        let (fs, registry) = registry();
        fs.insert("src/Root.tsx", "this is not a manifest");
        fs.insert("src/animations/Orbs.tsx", simple_source("Orbs"));

        assert!(registry.sync_all(false).await.is_ok_and(|r| r.written));
        let text = manifest(&fs);
        assert!(text.contains("id=\"Orbs\""));
        assert!(!text.contains("this is not a manifest"));
    }

    #[tokio::test]
    async fn test_failed_manifest_write_leaves_everything_unchanged() {
        let (fs, registry) = registry();
        assert!(registry.create_module("Orbs", &simple_source("Orbs"), None).await.is_ok());
        let before = manifest(&fs);

        fs.set_fail_path(Some(PathBuf::from("src/Root.tsx")));
        let result = registry.create_module("Waves", &simple_source("Waves"), None).await;

        assert!(result.is_err_and(|e| e.kind() == "io"));
        assert_eq!(manifest(&fs), before);
        assert!(fs.get("src/animations/Waves.tsx").is_none());
    }

    #[tokio::test]
    async fn test_failed_reload_signal_restores_manifest() {
        let (fs, registry) = registry();
        assert!(registry.create_module("Orbs", &simple_source("Orbs"), None).await.is_ok());
        let before = manifest(&fs);

        fs.set_fail_path(Some(PathBuf::from("src/.animreg-reload")));
        let result = registry.create_module("Waves", &simple_source("Waves"), None).await;

        assert!(result.is_err_and(|e| e.kind() == "io"));
        assert_eq!(manifest(&fs), before);
        assert!(fs.get("src/animations/Waves.tsx").is_none());
        assert_eq!(registry.known_names(), vec!["Orbs"]);

        fs.insert("src/animations/Waves.tsx", simple_source("Waves"));
        assert!(registry.sync_all(false).await.is_err());
        assert_eq!(manifest(&fs), before);

        fs.remove("src/animations/Orbs.tsx");
        assert!(registry.cleanup_orphans(false).await.is_err());
        assert_eq!(manifest(&fs), before);
    }

    #[tokio::test]
    async fn test_failed_reload_signal_on_first_create_leaves_no_manifest() {
        let (fs, registry) = registry();
        fs.set_fail_path(Some(PathBuf::from("src/.animreg-reload")));

        let result = registry.create_module("Orbs", &simple_source("Orbs"), None).await;
        assert!(result.is_err());
        assert!(fs.get("src/Root.tsx").is_none());
        assert!(fs.get("src/animations/Orbs.tsx").is_none());
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_the_orphan() {
        let (fs, registry) = registry();
        let orbs = "export interface OrbsParameters { count: number }\nexport const Orbs = () => null;\n";
        assert!(registry.create_module("Orbs", orbs, None).await.is_ok());
        assert!(registry.create_module("Waves", &simple_source("Waves"), None).await.is_ok());
        add_manual_entry(&fs);
        let before = manifest(&fs);

        fs.remove("src/animations/Orbs.tsx");
        let dry = registry.cleanup_orphans(true).await;
        assert!(dry.is_ok_and(|r| r.removed_names == vec!["Orbs"]));
        assert_eq!(manifest(&fs), before);

        let Ok(report) = registry.cleanup_orphans(false).await else {
            panic!("cleanup should succeed");
        };
        assert_eq!(report.removed_names, vec!["Orbs"]);

        let after = manifest(&fs);
        assert!(!after.contains("Orbs"));
        assert!(after.contains(MANUAL_ENTRY));
        assert!(after.contains("import { Waves } from \"./animations/Waves\";"));
        // Every surviving line is untouched and in its original order
        let mut old_lines = before.lines();
        for line in after.lines() {
            assert!(old_lines.any(|old| old == line), "line changed: {line}");
        }

        let again = registry.cleanup_orphans(false).await;
        assert!(again.is_ok_and(|r| r.removed_names.is_empty()));
    }

    #[tokio::test]
    async fn test_scoped_cleanup_rechecks_absence() {
        let (fs, registry) = registry();
        assert!(registry.create_module("Orbs", &simple_source("Orbs"), None).await.is_ok());
        let before = manifest(&fs);

        assert!(registry.scoped_cleanup("Orbs").await.is_ok_and(|removed| !removed));
        assert_eq!(manifest(&fs), before);

        fs.remove("src/animations/Orbs.tsx");
        assert!(registry.scoped_cleanup("Orbs").await.is_ok_and(|removed| removed));
        assert!(!manifest(&fs).contains("Orbs"));
        assert!(registry.scoped_cleanup("Orbs").await.is_ok_and(|removed| !removed));
    }

    #[tokio::test]
    async fn test_delete_module_case_insensitive() {
        let (fs, registry) = registry();
        assert!(registry
            .create_module("SpinningStar", &simple_source("SpinningStar"), None)
            .await
            .is_ok());

        let Ok(report) = registry.delete_module("spinningstar", true).await else {
            panic!("delete should succeed");
        };
        assert_eq!(report.module_name, "SpinningStar");
        assert!(report.file_deleted);
        assert!(report.entry_removed);
        assert!(fs.get("src/animations/SpinningStar.tsx").is_none());
        assert!(!manifest(&fs).contains("SpinningStar"));

        let missing = registry.delete_module("Ghost", true).await;
        assert!(missing.is_err_and(|e| e.kind() == "not_found"));
    }

    #[tokio::test]
    async fn test_delete_keeping_file() {
        let (fs, registry) = registry();
        assert!(registry.create_module("Orbs", &simple_source("Orbs"), None).await.is_ok());

        let report = registry.delete_module("Orbs", false).await;
        assert!(report.is_ok_and(|r| !r.file_deleted && r.entry_removed));
        assert!(fs.get("src/animations/Orbs.tsx").is_some());
    }

    #[tokio::test]
    async fn test_observe_changes() {
        let (fs, registry) = registry();
        assert!(registry.create_module("Orbs", &simple_source("Orbs"), None).await.is_ok());
        assert!(registry.create_module("Waves", &simple_source("Waves"), None).await.is_ok());
        assert!(registry.seed().await.is_ok_and(|count| count == 2));
        assert!(registry.observe_changes().await.is_ok_and(|events| events.is_empty()));

        fs.remove("src/animations/Orbs.tsx");
        fs.insert("src/animations/Waves.tsx", "export const Waves = () => 1;\n");
        fs.insert("src/animations/Sparks.tsx", simple_source("Sparks"));

        let events = registry.observe_changes().await.unwrap_or_default();
        let seen: Vec<(ChangeKind, &str)> = events
            .iter()
            .map(|e| (e.kind, e.module_name.as_str()))
            .collect();
        assert_eq!(
            seen,
            vec![
                (ChangeKind::Deleted, "Orbs"),
                (ChangeKind::Created, "Sparks"),
                (ChangeKind::Modified, "Waves"),
            ]
        );
        assert!(registry.observe_changes().await.is_ok_and(|events| events.is_empty()));
    }

    #[tokio::test]
    async fn test_observe_unreferenced_import() {
        let (fs, registry) = registry();
        assert!(registry.create_module("Orbs", &simple_source("Orbs"), None).await.is_ok());
        assert!(registry.seed().await.is_ok());

        // Hand edit drops the entry but leaves the import behind
        let text = manifest(&fs);
        let start = text.find("      <Composition\n        id=\"Orbs\"").unwrap_or_default();
        let end = start + text[start..].find("/>\n").unwrap_or_default() + 3;
        let edited = format!("{}{}", &text[..start], &text[end..]);
        fs.insert("src/Root.tsx", edited);

        let events = registry.observe_changes().await.unwrap_or_default();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ChangeKind::Unreferenced);
        assert_eq!(events[0].module_name, "Orbs");

        assert!(registry.strip_unreferenced("Orbs").await.is_ok_and(|stripped| stripped));
        assert!(!manifest(&fs).contains("import { Orbs }"));
    }
}
