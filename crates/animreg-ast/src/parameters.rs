//! Parameter interface extraction
//!
//! A module declares its tunable inputs as `interface <Name>Parameters { ... }`
//! or `type <Name>Parameters = { ... }`. Only the first such block counts.

use crate::errors::AnalysisError;
use animreg_manifest::{Parameter, Parameters};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static BLOCK_START_RE: Lazy<Regex> = Lazy::new(|| {
    crate::pattern(
        r"(?m)^[ \t]*(?:export[ \t]+)?(?:interface[ \t]+(?P<iname>[A-Za-z_$][\w$]*Parameters)\b[^{\n]*\{|type[ \t]+(?P<tname>[A-Za-z_$][\w$]*Parameters)[ \t]*=[ \t]*\{)",
    )
});

static FIELD_RE: Lazy<Regex> = Lazy::new(|| {
    crate::pattern(
        r#"(?s)^(?:readonly\s+)?(?P<name>[A-Za-z_$][\w$]*|"[^"]*"|'[^']*')\s*(?P<opt>\?)?\s*(?P<sig>\([^)]*\))?\s*:\s*(?P<ty>.+)$"#,
    )
});

/// A located parameter block: its declared name and the text between its braces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterBlock {
    pub name: String,
    pub body: String,
}

/// Find the first parameter block by scanning declaration lines
pub fn locate_block(source: &str) -> Result<Option<ParameterBlock>, AnalysisError> {
    let Some(caps) = BLOCK_START_RE.captures(source) else {
        return Ok(None);
    };
    let name = caps
        .name("iname")
        .or_else(|| caps.name("tname"))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    let open = caps.get(0).map(|m| m.end() - 1).unwrap_or_default();

    let close = matching_brace(source, open)
        .ok_or_else(|| AnalysisError::UnterminatedBlock(name.clone()))?;
    Ok(Some(ParameterBlock {
        name,
        body: source[open + 1..close].to_string(),
    }))
}

/// Byte index of the `}` closing the `{` at `open`
///
/// String literals and comments are skipped so braces inside them do not count.
pub fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'{') {
        return None;
    }

    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' | b'`' => i = skip_string(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 1;
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Index of the closing quote of the string starting at `start`
fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b if b == quote => return i,
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}

/// Remove `//` and `/* */` comments, keeping string literals intact
fn strip_comments(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' | b'`' => {
                let end = skip_string(bytes, i).min(bytes.len() - 1);
                out.extend_from_slice(&bytes[i..=end]);
                i = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 1;
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Split a block body into member texts at top-level `;`, `,` and newlines
fn split_members(body: &str) -> Vec<String> {
    let mut members: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut prev = '\0';

    for ch in body.chars() {
        if let Some(q) = quote {
            current.push(ch);
            if ch == q && prev != '\\' {
                quote = None;
            }
            prev = ch;
            continue;
        }
        match ch {
            '"' | '\'' | '`' => quote = Some(ch),
            '{' | '(' | '[' | '<' => depth += 1,
            '}' | ')' | ']' => depth -= 1,
            '>' if prev != '=' => depth -= 1,
            _ => {}
        }
        if depth <= 0 && matches!(ch, ';' | ',' | '\n') {
            push_member(&mut members, &current);
            current.clear();
        } else {
            current.push(ch);
        }
        prev = ch;
    }
    push_member(&mut members, &current);
    members
}

/// Append a member, folding continuation lines of a multi-line type
fn push_member(members: &mut Vec<String>, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    let continues_previous = text.starts_with('|') || text.starts_with('&');
    let previous_open = members
        .last()
        .is_some_and(|m| m.ends_with('|') || m.ends_with('&') || m.ends_with(':'));
    match members.last_mut() {
        Some(last) if continues_previous || previous_open => {
            last.push(' ');
            last.push_str(text);
        }
        _ => members.push(text.to_string()),
    }
}

/// Parse the fields of a block body in declaration order
pub fn parse_fields(block_name: &str, body: &str) -> Result<Parameters, AnalysisError> {
    let mut parameters = Parameters::new();

    for member in split_members(&strip_comments(body)) {
        // Index signatures name no field
        if member.starts_with('[') {
            debug!("Skipping index signature in {}: {}", block_name, member);
            continue;
        }

        let caps = FIELD_RE.captures(&member).ok_or_else(|| AnalysisError::MalformedField {
            block: block_name.to_string(),
            field: member.clone(),
        })?;

        let name = caps
            .name("name")
            .map(|m| m.as_str().trim_matches(|c| c == '"' || c == '\''))
            .unwrap_or_default();
        let ty = caps
            .name("ty")
            .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
            .unwrap_or_default();
        let type_token = match caps.name("sig") {
            Some(sig) => format!("{} => {}", sig.as_str(), ty),
            None => ty,
        };

        if name.is_empty() || type_token.is_empty() {
            return Err(AnalysisError::MalformedField {
                block: block_name.to_string(),
                field: member,
            });
        }
        parameters.push(Parameter::new(name, type_token, caps.name("opt").is_some()));
    }

    Ok(parameters)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORBS: &str = r#"import React from "react";

// Public inputs
export interface FloatingOrbsParameters {
  accentColor?: string; // main hue
  count: number,
  direction: 'left' | 'right';
  /* legacy */ speed?: number
}

export const FloatingOrbs: React.FC<FloatingOrbsParameters> = () => null;
"#;

    #[test]
    fn test_locate_interface_block() {
        let Ok(Some(block)) = locate_block(ORBS) else {
            panic!("expected a parameter block");
        };
        assert_eq!(block.name, "FloatingOrbsParameters");
        assert!(block.body.contains("accentColor?: string;"));
        assert!(!block.body.contains("React.FC"));
    }

    #[test]
    fn test_parse_fields_tolerates_punctuation_and_comments() {
        let Ok(Some(block)) = locate_block(ORBS) else {
            panic!("expected a parameter block");
        };
        let Ok(fields) = parse_fields(&block.name, &block.body) else {
            panic!("fields should parse");
        };

        assert_eq!(
            fields.to_vec(),
            vec![
                Parameter::new("accentColor", "string", true),
                Parameter::new("count", "number", false),
                Parameter::new("direction", "'left' | 'right'", false),
                Parameter::new("speed", "number", true),
            ]
        );
    }

    #[test]
    fn test_type_alias_block() {
        let source = "type TitleCardParameters = { text: string; size?: number };\n";
        let Ok(Some(block)) = locate_block(source) else {
            panic!("expected a parameter block");
        };
        assert_eq!(block.name, "TitleCardParameters");
        let fields = parse_fields(&block.name, &block.body).unwrap_or_default();
        assert_eq!(fields.len(), 2);
        assert!(fields[1].optional);
    }

    #[test]
    fn test_multiline_union_and_nested_types() {
        let body = concat!(
            "\n",
            "  mode:\n",
            "    | 'fast'\n",
            "    | 'slow';\n",
            "  origin: { x: number; y: number };\n",
            "  onDone(frame: number): void;\n",
            "  [key: string]: unknown;\n",
        );
        let fields = parse_fields("XParameters", body).unwrap_or_default();

        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].type_token, "| 'fast' | 'slow'");
        assert_eq!(fields[1].type_token, "{ x: number; y: number }");
        assert_eq!(fields[2].name, "onDone");
        assert_eq!(fields[2].type_token, "(frame: number) => void");
    }

    #[test]
    fn test_no_block_is_not_an_error() {
        let source = "interface Props { a: number }\nexport const X = () => null;\n";
        assert_eq!(locate_block(source), Ok(None));
    }

    #[test]
    fn test_unterminated_block() {
        let source = "interface BrokenParameters {\n  a: number;\n";
        assert_eq!(
            locate_block(source),
            Err(AnalysisError::UnterminatedBlock("BrokenParameters".to_string()))
        );
    }

    #[test]
    fn test_malformed_field() {
        let result = parse_fields("BadParameters", "\n  just some words\n");
        assert!(matches!(result, Err(AnalysisError::MalformedField { .. })));
    }

    #[test]
    fn test_braces_inside_strings_are_ignored() {
        let text = "{ label: \"}\"; x: number }";
        assert_eq!(matching_brace(text, 0), Some(text.len() - 1));
    }
}
