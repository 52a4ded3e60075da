//! Name collision detection and alternative-name generation
//!
//! A requested name collides with an existing one when the two are equal
//! ignoring case, or when their normalized edit distance similarity is above
//! [`SIMILARITY_THRESHOLD`]. Alternatives are built from domain synonyms,
//! then suffix patterns, then numeric suffixes, which always yield a free
//! name so resolution terminates.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Similarity above which two names are considered the same module
pub const SIMILARITY_THRESHOLD: f64 = 0.7;

/// Maximum number of alternatives reported
pub const MAX_ALTERNATIVES: usize = 10;

/// Motion verbs and shape nouns with interchangeable replacements
const SYNONYMS: &[(&str, &[&str])] = &[
    ("Bouncing", &["Jumping", "Hopping"]),
    ("Floating", &["Drifting", "Hovering"]),
    ("Spinning", &["Rotating", "Twirling"]),
    ("Rotating", &["Spinning", "Turning"]),
    ("Sliding", &["Gliding", "Sweeping"]),
    ("Fading", &["Dissolving", "Vanishing"]),
    ("Pulsing", &["Throbbing", "Beating"]),
    ("Waving", &["Rippling", "Undulating"]),
    ("Growing", &["Expanding", "Scaling"]),
    ("Orbs", &["Spheres", "Bubbles"]),
    ("Ball", &["Sphere", "Orb"]),
    ("Circle", &["Ring", "Disc"]),
    ("Square", &["Box", "Tile"]),
    ("Star", &["Sparkle", "Twinkle"]),
    ("Particles", &["Sparks", "Dots"]),
    ("Wave", &["Ripple", "Swell"]),
    ("Text", &["Caption", "Label"]),
];

const SUFFIXES: &[&str] = &["Animation", "Effect", "Motion", "Transition"];
const PREFIXES: &[&str] = &["Enhanced"];
const VERSION_SUFFIXES: &[&str] = &["Pro", "Plus", "V2", "Improved"];

/// Outcome of checking a requested name against the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameResolutionResult {
    pub requested_name: String,
    pub resolved_name: String,
    /// Existing names the request collides with, sorted
    pub conflicts_with: Vec<String>,
    /// Collision-free candidates in priority order
    pub alternatives: Vec<String>,
    pub has_conflict: bool,
}

/// Levenshtein edit distance over characters, ignoring ASCII case
///
/// Runs in O(n * m) time and keeps a single row of O(min(n, m)) integers.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().map(|c| c.to_ascii_lowercase()).collect();
    let b: Vec<char> = b.chars().map(|c| c.to_ascii_lowercase()).collect();
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };

    let mut row: Vec<usize> = (0..=short.len()).collect();
    for (i, lc) in long.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, sc) in short.iter().enumerate() {
            let substitution = diagonal + usize::from(lc != sc);
            diagonal = row[j + 1];
            row[j + 1] = substitution.min(row[j] + 1).min(diagonal + 1);
        }
    }
    row[short.len()]
}

/// Normalized similarity in `[0, 1]`; identical names score 1
pub fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - edit_distance(a, b) as f64 / longest as f64
}

fn same_name(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

fn collides(candidate: &str, existing: &str) -> bool {
    same_name(candidate, existing) || similarity(candidate, existing) > SIMILARITY_THRESHOLD
}

/// Check `requested` (already canonical) against `existing` names
pub fn resolve_name<S: AsRef<str>>(requested: &str, existing: &[S]) -> NameResolutionResult {
    let mut conflicts_with: Vec<String> = existing
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| collides(requested, name))
        .map(str::to_string)
        .collect();
    conflicts_with.sort();
    conflicts_with.dedup();

    if conflicts_with.is_empty() {
        return NameResolutionResult {
            requested_name: requested.to_string(),
            resolved_name: requested.to_string(),
            conflicts_with,
            alternatives: Vec::new(),
            has_conflict: false,
        };
    }

    // An exact match keeps the established casing as the stem for candidates
    let base = existing
        .iter()
        .map(AsRef::as_ref)
        .find(|name| same_name(requested, name))
        .unwrap_or(requested);

    let alternatives = alternatives_for(base, existing);
    debug!(
        "Name '{}' collides with {:?}; alternatives {:?}",
        requested, conflicts_with, alternatives
    );

    let resolved_name = alternatives
        .first()
        .cloned()
        .unwrap_or_else(|| requested.to_string());

    NameResolutionResult {
        requested_name: requested.to_string(),
        resolved_name,
        conflicts_with,
        alternatives,
        has_conflict: true,
    }
}

fn alternatives_for<S: AsRef<str>>(base: &str, existing: &[S]) -> Vec<String> {
    let is_free = |candidate: &str| !existing.iter().any(|e| collides(candidate, e.as_ref()));

    let mut candidates: Vec<String> = Vec::new();
    candidates.extend(synonym_candidates(base).into_iter().filter(|c| is_free(c)));
    candidates.extend(pattern_candidates(base).into_iter().filter(|c| is_free(c)));

    // Numbered names are obviously distinct, so only exact reuse rules them out
    let is_unused = |candidate: &str| !existing.iter().any(|e| same_name(candidate, e.as_ref()));
    let mut numbered = 0;
    let mut n = 2;
    while numbered == 0 || n <= 10 {
        let candidate = format!("{}{}", base, n);
        if is_unused(&candidate) {
            candidates.push(candidate);
            numbered += 1;
        }
        n += 1;
    }

    let mut unique: Vec<String> = Vec::new();
    for candidate in candidates {
        if !unique.iter().any(|u| same_name(u, &candidate)) {
            unique.push(candidate);
        }
    }
    unique.truncate(MAX_ALTERNATIVES);
    unique
}

/// Swap each known word found in `base` for its synonyms
fn synonym_candidates(base: &str) -> Vec<String> {
    let lowered = base.to_ascii_lowercase();
    let mut candidates = Vec::new();

    for (word, replacements) in SYNONYMS {
        let Some(pos) = lowered.find(&word.to_ascii_lowercase()) else {
            continue;
        };
        let (head, rest) = base.split_at(pos);
        let tail = &rest[word.len()..];
        for replacement in replacements.iter() {
            candidates.push(format!("{}{}{}", head, replacement, tail));
        }
    }
    candidates
}

fn pattern_candidates(base: &str) -> Vec<String> {
    let mut candidates = Vec::new();
    for suffix in SUFFIXES {
        if !base.ends_with(suffix) {
            candidates.push(format!("{}{}", base, suffix));
        }
    }
    for prefix in PREFIXES {
        if !base.starts_with(prefix) {
            candidates.push(format!("{}{}", prefix, base));
        }
    }
    for suffix in VERSION_SUFFIXES {
        candidates.push(format!("{}{}", base, suffix));
    }
    candidates
}
