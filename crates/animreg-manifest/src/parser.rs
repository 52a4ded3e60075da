//! Structural parser for the registry manifest
//!
//! The manifest is TSX, but only a handful of shapes matter here: import
//! statements, `z.object` schema constants, the exported root component and
//! the `<Composition />` elements inside it. Other markup in the root is kept
//! as opaque text. Everything is matched line by line with bracket counting;
//! no JavaScript is evaluated.

use crate::errors::ManifestError;
use crate::types::{Entry, ImportLine, LineSpan, ManifestDocument, OtherBlock, SchemaBlock};
use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;

/// First line of every generated manifest
pub const HEADER_COMMENT: &str =
    "// Registry manifest maintained by animreg. Hand-written entries are preserved.";

fn pattern(re: &str) -> Regex {
    Regex::new(re).unwrap_or_else(|err| panic!("invalid manifest pattern {re}: {err}"))
}

static IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    pattern(r#"^import\s+(?:type\s+)?(?P<clause>.+?)\s+from\s+["'](?P<source>[^"']+)["']\s*;?$"#)
});
static SIDE_EFFECT_IMPORT_RE: Lazy<Regex> =
    Lazy::new(|| pattern(r#"^import\s+["'](?P<source>[^"']+)["']\s*;?$"#));
static SCHEMA_START_RE: Lazy<Regex> = Lazy::new(|| {
    pattern(r"^(?:export\s+)?const\s+(?P<owner>[A-Za-z_$][\w$]*)Schema\s*=\s*z\s*\.\s*object\s*\(")
});
static ROOT_START_RE: Lazy<Regex> =
    Lazy::new(|| pattern(r"^export\s+const\s+(?P<name>[A-Za-z_$][\w$]*)\s*[:=]"));
static ENTRY_ID_RE: Lazy<Regex> = Lazy::new(|| {
    pattern(r#"\bid\s*=\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)'|\{\s*["'](?P<ex>[^"']*)["']\s*\})"#)
});
static ENTRY_COMPONENT_RE: Lazy<Regex> =
    Lazy::new(|| pattern(r"\bcomponent\s*=\s*\{\s*(?P<name>[A-Za-z_$][\w$]*)\s*\}"));
static ENTRY_DURATION_RE: Lazy<Regex> =
    Lazy::new(|| pattern(r"\bdurationInFrames\s*=\s*\{\s*(?P<frames>\d+)\s*\}"));
static ENTRY_SCHEMA_RE: Lazy<Regex> =
    Lazy::new(|| pattern(r"\bschema\s*=\s*\{\s*(?P<name>[A-Za-z_$][\w$]*)\s*\}"));

/// Parse manifest text into its sections
///
/// Empty or whitespace-only text parses to an empty document. Text that has
/// content but no root declaration is reported as corrupt.
pub fn parse(text: &str) -> Result<ManifestDocument, ManifestError> {
    let lines: Vec<&str> = text.lines().collect();
    let mut doc = ManifestDocument::default();
    let mut found_root = false;
    let mut idx = 0;

    while idx < lines.len() {
        let trimmed = lines[idx].trim();

        if trimmed.is_empty() || trimmed == HEADER_COMMENT {
            idx += 1;
            continue;
        }

        if trimmed.starts_with("import ") || trimmed.starts_with("import{") {
            let end = import_end(&lines, idx);
            let raw = lines[idx..end].join("\n");
            if let Some(import) = parse_import(&raw, LineSpan::new(idx, end)) {
                doc.imports.push(import);
            } else {
                doc.others.push(OtherBlock {
                    raw,
                    span: LineSpan::new(idx, end),
                });
            }
            idx = end;
            continue;
        }

        if let Some(caps) = SCHEMA_START_RE.captures(trimmed) {
            let end = bracket_block_end(&lines, idx);
            doc.schemas.push(SchemaBlock {
                raw: lines[idx..end].join("\n"),
                owner: caps["owner"].to_string(),
                span: LineSpan::new(idx, end),
            });
            idx = end;
            continue;
        }

        if !found_root && is_root_start(trimmed) {
            let end = bracket_block_end(&lines, idx);
            // Helper arrow functions share the shape; the root renders JSX
            let renders_jsx = lines[idx..end]
                .iter()
                .any(|line| line.contains("<Composition") || line.contains("<>"));
            if renders_jsx {
                if let Some(caps) = ROOT_START_RE.captures(trimmed) {
                    doc.root_name = caps["name"].to_string();
                }
                doc.entries = parse_entries(&lines, idx + 1, end);
                found_root = true;
                idx = end;
                continue;
            }
        }

        let end = other_block_end(&lines, idx);
        doc.others.push(OtherBlock {
            raw: lines[idx..end].join("\n"),
            span: LineSpan::new(idx, end),
        });
        idx = end;
    }

    if !found_root && !text.trim().is_empty() {
        return Err(ManifestError::Corrupt(
            "no exported root component found".to_string(),
        ));
    }

    Ok(doc)
}

fn is_root_start(trimmed: &str) -> bool {
    ROOT_START_RE.is_match(trimmed) && (trimmed.contains("=>") || trimmed.contains("React.FC"))
}

/// Index one past the last line of the import statement starting at `start`
fn import_end(lines: &[&str], start: usize) -> usize {
    let mut idx = start;
    while idx < lines.len() {
        let trimmed = lines[idx].trim();
        let single = idx == start && SIDE_EFFECT_IMPORT_RE.is_match(trimmed);
        if single || trimmed.contains(" from ") || trimmed.starts_with("from ") {
            return idx + 1;
        }
        // Give up on runaway statements so one bad line cannot swallow the file
        if idx - start >= 32 {
            return start + 1;
        }
        idx += 1;
    }
    start + 1
}

fn parse_import(raw: &str, span: LineSpan) -> Option<ImportLine> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    if let Some(caps) = SIDE_EFFECT_IMPORT_RE.captures(&collapsed) {
        return Some(ImportLine {
            raw: raw.to_string(),
            bindings: SmallVec::new(),
            source: caps["source"].to_string(),
            span,
        });
    }

    let caps = IMPORT_RE.captures(&collapsed)?;
    Some(ImportLine {
        raw: raw.to_string(),
        bindings: parse_bindings(&caps["clause"]),
        source: caps["source"].to_string(),
        span,
    })
}

/// Local names bound by an import clause such as `React, { A, B as C }` or `* as X`
fn parse_bindings(clause: &str) -> SmallVec<[String; 2]> {
    clause
        .split(',')
        .map(|part| part.trim().trim_matches(|c| c == '{' || c == '}').trim())
        .filter(|part| !part.is_empty())
        .filter_map(|part| {
            let local = match part.rsplit_once(" as ") {
                Some((_, alias)) => alias.trim(),
                None => part.trim_start_matches("type ").trim(),
            };
            (!local.is_empty() && local != "*").then(|| local.to_string())
        })
        .collect()
}

/// Net change in bracket depth over a line, ignoring string contents and `//` comments
fn bracket_delta(line: &str) -> (i32, bool) {
    let mut delta = 0;
    let mut opened = false;
    let mut quote: Option<char> = None;
    let mut prev = '\0';

    for ch in line.chars() {
        if let Some(q) = quote {
            if ch == q && prev != '\\' {
                quote = None;
            }
            prev = ch;
            continue;
        }
        match ch {
            '"' | '\'' | '`' => quote = Some(ch),
            '/' if prev == '/' => break,
            '(' | '[' | '{' => {
                delta += 1;
                opened = true;
            }
            ')' | ']' | '}' => delta -= 1,
            _ => {}
        }
        prev = ch;
    }

    (delta, opened)
}

/// Index one past the line where the bracket block opened at `start` closes
fn bracket_block_end(lines: &[&str], start: usize) -> usize {
    let mut depth = 0;
    let mut opened = false;
    for (idx, line) in lines.iter().enumerate().skip(start) {
        let (delta, line_opened) = bracket_delta(line);
        depth += delta;
        opened |= line_opened;
        if opened && depth <= 0 {
            return idx + 1;
        }
    }
    lines.len()
}

/// Other blocks run until a blank line or the start of a recognized section
fn other_block_end(lines: &[&str], start: usize) -> usize {
    let mut depth = 0;
    let mut idx = start;
    while idx < lines.len() {
        let trimmed = lines[idx].trim();
        if idx > start && depth <= 0 {
            if trimmed.is_empty()
                || trimmed.starts_with("import ")
                || SCHEMA_START_RE.is_match(trimmed)
                || is_root_start(trimmed)
            {
                return idx;
            }
        }
        depth += bracket_delta(lines[idx]).0;
        idx += 1;
    }
    lines.len()
}

/// Items between the root's `<>` and `</>`
///
/// `<Composition />` elements are parsed; any other run of non-blank lines
/// (comments, `<Still />`, `<Folder>` tags) is kept as an opaque item in place.
/// A root without a fragment only yields its compositions.
fn parse_entries(lines: &[&str], start: usize, end: usize) -> Vec<Entry> {
    let open = (start..end).find(|&idx| lines[idx].trim() == "<>");
    let close = (start..end).rev().find(|&idx| lines[idx].trim() == "</>");
    let (start, end, keep_opaque) = match (open, close) {
        (Some(open), Some(close)) if open < close => (open + 1, close, true),
        _ => (start, end, false),
    };

    let mut entries = Vec::new();
    let mut idx = start;

    while idx < end {
        let trimmed = lines[idx].trim();
        if trimmed.is_empty() {
            idx += 1;
            continue;
        }

        if !trimmed.starts_with("<Composition") {
            let mut run_end = idx + 1;
            while run_end < end {
                let line = lines[run_end].trim();
                if line.is_empty() || line.starts_with("<Composition") {
                    break;
                }
                run_end += 1;
            }
            if keep_opaque {
                entries.push(Entry::opaque(
                    lines[idx..run_end].join("\n"),
                    LineSpan::new(idx, run_end),
                ));
            }
            idx = run_end;
            continue;
        }

        let mut close = idx;
        while close < end {
            let line = lines[close].trim();
            if line.ends_with("/>") || line.contains("</Composition>") {
                break;
            }
            close += 1;
        }
        let entry_end = (close + 1).min(end);
        let raw = lines[idx..entry_end].join("\n");
        entries.push(parse_entry(raw, LineSpan::new(idx, entry_end)));
        idx = entry_end;
    }

    entries
}

fn parse_entry(raw: String, span: LineSpan) -> Entry {
    let id = ENTRY_ID_RE.captures(&raw).and_then(|caps| {
        caps.name("dq")
            .or_else(|| caps.name("sq"))
            .or_else(|| caps.name("ex"))
            .map(|m| m.as_str().to_string())
    });
    let module_ref = ENTRY_COMPONENT_RE
        .captures(&raw)
        .map(|caps| caps["name"].to_string());
    let duration_frames = ENTRY_DURATION_RE
        .captures(&raw)
        .and_then(|caps| caps["frames"].parse().ok());
    let schema_ref = ENTRY_SCHEMA_RE
        .captures(&raw)
        .map(|caps| caps["name"].to_string());

    Entry {
        raw,
        id,
        module_ref,
        duration_frames,
        schema_ref,
        span,
    }
}
