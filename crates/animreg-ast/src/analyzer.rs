//! Module analysis
//!
//! Callers depend on [`ModuleAnalyzer`] only. Two implementations ship:
//! [`PatternAnalyzer`] finds the parameter block with a declaration pattern,
//! [`AstGrepAnalyzer`] locates it in the TSX syntax tree and falls back to the
//! pattern scan when the tree has nothing usable.

use crate::duration::{declared_frames, hint_frames, infer_frames};
use crate::errors::AnalysisError;
use crate::naming::description_tag;
use crate::parameters::{locate_block, matching_brace, parse_fields, ParameterBlock};
use animreg_logger as logger;
use animreg_manifest::{AnimationModule, DurationSource, Parameters};
use ast_grep_core::AstGrep;
use ast_grep_language::Tsx;
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, warn};

/// Per-call analysis settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyzeOptions {
    pub fps: u32,
    /// Duration requested by the author, in seconds
    pub duration_hint_seconds: Option<f64>,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        AnalyzeOptions {
            fps: 30,
            duration_hint_seconds: None,
        }
    }
}

/// Source text of one module file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSource {
    pub name: String,
    pub source: String,
}

pub trait ModuleAnalyzer: Send + Sync {
    /// Find the first `<Name>Parameters` block
    fn locate(&self, source: &str) -> Result<Option<ParameterBlock>, AnalysisError>;

    /// Parameters declared by the module; no block means no parameters
    fn extract(&self, source: &str) -> Result<Parameters, AnalysisError> {
        match self.locate(source)? {
            Some(block) => parse_fields(&block.name, &block.body),
            None => Ok(Parameters::new()),
        }
    }

    /// Analyze a module; failures degrade to an unparameterized module
    fn analyze(&self, name: &str, source: &str, options: &AnalyzeOptions) -> AnimationModule {
        let parameters = match self.extract(source) {
            Ok(parameters) => parameters,
            Err(err) => {
                warn!("Ignoring parameters of '{}': {}", name, err);
                Parameters::new()
            }
        };
        let (duration_frames, duration_source) = resolve_duration(name, source, options);

        AnimationModule {
            name: name.to_string(),
            source_text: source.to_string(),
            has_parameters: !parameters.is_empty(),
            description_tag: description_tag(name, parameters.len()),
            parameters,
            duration_frames,
            duration_source,
        }
    }
}

/// Pick the duration from the strongest available source
pub fn resolve_duration(
    name: &str,
    source: &str,
    options: &AnalyzeOptions,
) -> (u32, DurationSource) {
    if let Some(frames) = options
        .duration_hint_seconds
        .and_then(|seconds| hint_frames(seconds, options.fps))
    {
        return (frames, DurationSource::Explicit);
    }
    if let Some(frames) = declared_frames(source) {
        return (frames, DurationSource::Declared);
    }
    (infer_frames(name, options.fps), DurationSource::Inferred)
}

/// Declaration-pattern analyzer
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternAnalyzer;

impl ModuleAnalyzer for PatternAnalyzer {
    fn locate(&self, source: &str) -> Result<Option<ParameterBlock>, AnalysisError> {
        locate_block(source)
    }
}

/// Syntax-tree analyzer backed by ast-grep's TSX grammar
#[derive(Debug, Clone, Copy, Default)]
pub struct AstGrepAnalyzer;

impl AstGrepAnalyzer {
    fn locate_in_tree(source: &str) -> Option<ParameterBlock> {
        let sg = AstGrep::new(source, Tsx);
        let root = sg.root();

        for node in root.dfs() {
            let body_field = match node.kind().as_ref() {
                "interface_declaration" => "body",
                "type_alias_declaration" => "value",
                _ => continue,
            };
            let Some(name) = node.field("name").map(|n| n.text().to_string()) else {
                continue;
            };
            if !name.ends_with("Parameters") {
                continue;
            }

            // Error recovery can produce a body without its closing brace
            let body = node.field(body_field)?;
            let text = body.text();
            let text = text.trim();
            let closes = text.starts_with('{') && matching_brace(text, 0) == Some(text.len() - 1);
            if !closes {
                debug!("Syntax tree body of {} is incomplete", name);
                return None;
            }
            return Some(ParameterBlock {
                name,
                body: text[1..text.len() - 1].to_string(),
            });
        }
        None
    }
}

impl ModuleAnalyzer for AstGrepAnalyzer {
    fn locate(&self, source: &str) -> Result<Option<ParameterBlock>, AnalysisError> {
        match Self::locate_in_tree(source) {
            Some(block) => Ok(Some(block)),
            None => locate_block(source),
        }
    }
}

/// Analyze many modules in parallel, keeping input order
pub fn analyze_batch(
    analyzer: &dyn ModuleAnalyzer,
    sources: &[ModuleSource],
    fps: u32,
) -> Vec<AnimationModule> {
    let start = Instant::now();
    let options = AnalyzeOptions {
        fps,
        duration_hint_seconds: None,
    };

    let modules: Vec<AnimationModule> = sources
        .par_iter()
        .map(|module| analyzer.analyze(&module.name, &module.source, &options))
        .collect();

    logger::debug(&format!(
        "analyze_batch: {} modules in {:.2}ms",
        modules.len(),
        start.elapsed().as_secs_f64() * 1000.0
    ));
    modules
}
