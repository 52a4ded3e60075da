//! Manifest serialization
//!
//! Sections are always written in the same order: header comment, imports,
//! schemas, unrecognized top-level blocks, then the root component holding
//! the entries. Parsed blocks are written back from their raw text.

use crate::parser::HEADER_COMMENT;
use crate::types::{Entry, ImportLine, LineSpan, ManifestDocument, SchemaBlock};
use smallvec::smallvec;

/// Render settings shared by every generated entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSettings {
    pub fps: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        RenderSettings {
            fps: 30,
            width: 1920,
            height: 1080,
        }
    }
}

/// Build a `import { Name } from "source";` line
pub fn render_import(binding: &str, source: &str) -> ImportLine {
    ImportLine {
        raw: format!("import {{ {} }} from \"{}\";", binding, source),
        bindings: smallvec![binding.to_string()],
        source: source.to_string(),
        span: LineSpan::default(),
    }
}

/// Build a `<Composition />` element
pub fn render_entry(
    id: &str,
    component: &str,
    duration_frames: u32,
    schema: Option<&str>,
    settings: &RenderSettings,
) -> Entry {
    let mut raw = String::new();
    raw.push_str("      <Composition\n");
    raw.push_str(&format!("        id=\"{}\"\n", id));
    raw.push_str(&format!("        component={{{}}}\n", component));
    raw.push_str(&format!("        durationInFrames={{{}}}\n", duration_frames));
    raw.push_str(&format!("        fps={{{}}}\n", settings.fps));
    raw.push_str(&format!("        width={{{}}}\n", settings.width));
    raw.push_str(&format!("        height={{{}}}\n", settings.height));
    if let Some(schema) = schema {
        raw.push_str(&format!("        schema={{{}}}\n", schema));
    }
    raw.push_str("      />");

    Entry {
        raw,
        id: Some(id.to_string()),
        module_ref: Some(component.to_string()),
        duration_frames: Some(duration_frames),
        schema_ref: schema.map(str::to_string),
        span: LineSpan::default(),
    }
}

pub fn render_schema(owner: &str, text: String) -> SchemaBlock {
    SchemaBlock {
        raw: text,
        owner: owner.to_string(),
        span: LineSpan::default(),
    }
}

/// Serialize a document in canonical section order
pub fn serialize(doc: &ManifestDocument) -> String {
    let mut out = String::new();
    out.push_str(HEADER_COMMENT);
    out.push('\n');

    for import in &doc.imports {
        out.push_str(&import.raw);
        out.push('\n');
    }

    for schema in &doc.schemas {
        out.push('\n');
        out.push_str(&schema.raw);
        out.push('\n');
    }

    for other in &doc.others {
        out.push('\n');
        out.push_str(&other.raw);
        out.push('\n');
    }

    out.push('\n');
    out.push_str(&format!(
        "export const {}: React.FC = () => {{\n",
        doc.root_name
    ));
    out.push_str("  return (\n");
    out.push_str("    <>\n");
    for entry in &doc.entries {
        out.push_str(&entry.raw);
        out.push('\n');
    }
    out.push_str("    </>\n");
    out.push_str("  );\n");
    out.push_str("};\n");
    out
}

/// Remove whole lines covered by `spans` from `text`, leaving every other byte as it was
///
/// A blank line directly after a removed block is dropped as well when the
/// block was itself preceded by a blank line, so removing a schema does not
/// leave a double gap behind.
pub fn remove_spans(text: &str, spans: &[LineSpan]) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut drop = vec![false; lines.len()];

    for span in spans {
        let end = span.end.min(lines.len());
        for flag in drop.iter_mut().take(end).skip(span.start) {
            *flag = true;
        }
        let preceded_by_blank = span.start == 0
            || lines
                .get(span.start - 1)
                .is_some_and(|line| line.trim().is_empty());
        // The final split element is the empty remainder after a trailing newline
        let followed_by_blank = end + 1 < lines.len() && lines[end].trim().is_empty();
        if preceded_by_blank && followed_by_blank {
            drop[end] = true;
        }
    }

    lines
        .iter()
        .zip(drop)
        .filter(|(_, dropped)| !dropped)
        .map(|(line, _)| *line)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_render_entry_round_trips_through_parser() {
        let settings = RenderSettings::default();
        let entry = render_entry("Orbs", "Orbs", 240, Some("OrbsSchema"), &settings);
        let doc = ManifestDocument {
            imports: vec![render_import("Orbs", "./animations/Orbs")],
            entries: vec![entry.clone()],
            ..Default::default()
        };

        let text = serialize(&doc);
        let parsed = parse(&text).unwrap_or_default();
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.entries[0].raw, entry.raw);
        assert_eq!(parsed.entries[0].duration_frames, Some(240));
        assert_eq!(parsed.entries[0].schema_ref.as_deref(), Some("OrbsSchema"));
        assert_eq!(serialize(&parsed), text);
    }

    #[test]
    fn test_remove_spans_keeps_other_bytes() {
        let text = "a\n\nblock1\nblock2\n\nc\n";
        let out = remove_spans(text, &[LineSpan::new(2, 4)]);
        assert_eq!(out, "a\n\nc\n");
    }

    #[test]
    fn test_remove_spans_inside_contiguous_lines() {
        let text = "one\ntwo\nthree\n";
        assert_eq!(remove_spans(text, &[LineSpan::new(1, 2)]), "one\nthree\n");
    }
}
