//! Validator schema synthesis
//!
//! Maps a module's parameter list onto a `zod` object schema. The output is a
//! pure function of the parameter list, so repeated syncs never produce
//! spurious manifest diffs.

use crate::types::{schema_name_for, Parameter};

/// Render the schema constant for a module
pub fn synthesize(module_name: &str, parameters: &[Parameter]) -> String {
    if parameters.is_empty() {
        return format!("const {} = z.object({{}});", schema_name_for(module_name));
    }

    let mut out = format!("const {} = z.object({{\n", schema_name_for(module_name));
    for param in parameters {
        out.push_str(&format!(
            "  {}: {},\n",
            object_key(&param.name),
            field_validator(param)
        ));
    }
    out.push_str("});");
    out
}

/// Validator expression for one field, including the optional modifier
pub fn field_validator(param: &Parameter) -> String {
    let base = validator_for(&param.type_token);
    if param.optional {
        format!("{}.optional()", base)
    } else {
        base
    }
}

/// Validator expression for a bare type token
pub fn validator_for(type_token: &str) -> String {
    let token = type_token.trim().trim_end_matches([';', ',']).trim();

    match token {
        "number" => return "z.number()".to_string(),
        "string" => return "z.string()".to_string(),
        "boolean" => return "z.boolean()".to_string(),
        _ => {}
    }

    if token.contains('|') {
        if let Some(literals) = extract_literals(token) {
            let quoted: Vec<String> = literals.iter().map(|l| format!("\"{}\"", l)).collect();
            return format!("z.enum([{}])", quoted.join(", "));
        }
    }

    "z.any()".to_string()
}

/// Quoted string literals of a union type, in order of first appearance
///
/// `None` unless every member is a string literal: a union mixing literals
/// with other types is not a closed set of options.
fn extract_literals(token: &str) -> Option<Vec<String>> {
    let mut literals: Vec<String> = Vec::new();
    // A leading `|` leaves an empty first member
    for part in token.split('|').map(str::trim).filter(|part| !part.is_empty()) {
        let quote = part.chars().next().filter(|c| matches!(c, '"' | '\'' | '`'))?;
        if part.len() < 2 || !part.ends_with(quote) {
            return None;
        }
        let value = part[1..part.len() - 1].replace('"', "\\\"");
        if !literals.contains(&value) {
            literals.push(value);
        }
    }
    (!literals.is_empty()).then_some(literals)
}

fn object_key(name: &str) -> String {
    let is_identifier = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if is_identifier {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\\\""))
    }
}
