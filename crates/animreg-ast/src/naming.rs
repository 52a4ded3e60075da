//! Naming utilities for module identifiers
//!
//! Module names are PascalCase identifiers: they become the file stem, the
//! imported binding and the composition id all at once.

/// Normalize a requested name to canonical PascalCase
///
/// Separators (space, `-`, `_`, `.`) start a new word; the casing inside a
/// word is kept, so `FloatingOrbs` stays as is and `bouncing-ball` becomes
/// `BouncingBall`. Returns `None` when nothing identifier-like is left.
pub fn canonical_name(raw: &str) -> Option<String> {
    let mut result = String::new();
    for word in raw.split(|c: char| !c.is_ascii_alphanumeric()) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            result.push(first.to_ascii_uppercase());
            result.push_str(chars.as_str());
        }
    }

    let starts_with_letter = result
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic());
    starts_with_letter.then_some(result)
}

/// Split a PascalCase name into words
///
/// Acronyms stay together:
/// - BouncingBall -> Bouncing Ball
/// - HTMLTitleCard -> HTML Title Card
pub fn camel_to_words(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut result = String::new();

    for (i, &ch) in chars.iter().enumerate() {
        if i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|c| c.is_lowercase());

            // New word from lowercase or digit, or the last capital of an
            // acronym that is followed by a lowercase run
            let start_new_word = ch.is_uppercase() && !prev.is_uppercase();
            let end_of_acronym = ch.is_uppercase() && prev.is_uppercase() && next_lower;
            let digit_run = ch.is_ascii_digit() && !prev.is_ascii_digit();

            if start_new_word || end_of_acronym || digit_run {
                result.push(' ');
            }
        }
        result.push(ch);
    }

    result
}

/// Human-readable label shown next to a module
pub fn description_tag(name: &str, parameter_count: usize) -> String {
    let words = camel_to_words(name);
    if parameter_count == 0 {
        words
    } else {
        format!("{} ({} params)", words, parameter_count)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Rewrite whole-word uses of `from` (and its `Parameters`/`Props`/`Schema`
/// forms) to `to`
pub fn rename_identifiers(source: &str, from: &str, to: &str) -> String {
    if from.is_empty() || from == to {
        return source.to_string();
    }

    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(pos) = rest.find(from) {
        let (before, matched) = rest.split_at(pos);
        out.push_str(before);

        let preceded_by_ident = out.chars().last().is_some_and(is_ident_char);
        let after = &matched[from.len()..];
        let suffix = ["Parameters", "Props", "Schema"]
            .into_iter()
            .find(|s| after.starts_with(s))
            .unwrap_or("");
        let tail = &after[suffix.len()..];

        if preceded_by_ident || tail.chars().next().is_some_and(is_ident_char) {
            out.push_str(from);
            rest = after;
        } else {
            out.push_str(to);
            out.push_str(suffix);
            rest = tail;
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_name() {
        assert_eq!(canonical_name("FloatingOrbs").as_deref(), Some("FloatingOrbs"));
        assert_eq!(canonical_name("floatingorbs").as_deref(), Some("Floatingorbs"));
        assert_eq!(canonical_name("bouncing-ball").as_deref(), Some("BouncingBall"));
        assert_eq!(canonical_name("  spinning star 2 ").as_deref(), Some("SpinningStar2"));
        assert_eq!(canonical_name("3d-cube"), None);
        assert_eq!(canonical_name("--"), None);
        assert_eq!(canonical_name(""), None);
    }

    #[test]
    fn test_camel_to_words() {
        assert_eq!(camel_to_words("BouncingBall"), "Bouncing Ball");
        assert_eq!(camel_to_words("HTMLTitleCard"), "HTML Title Card");
        assert_eq!(camel_to_words("Intro"), "Intro");
        assert_eq!(camel_to_words("Orbs2"), "Orbs 2");
    }

    #[test]
    fn test_description_tag() {
        assert_eq!(description_tag("BouncingBall", 0), "Bouncing Ball");
        assert_eq!(description_tag("BouncingBall", 1), "Bouncing Ball (1 params)");
        assert_eq!(description_tag("FloatingOrbs", 2), "Floating Orbs (2 params)");
    }

    #[test]
    fn test_rename_identifiers_whole_words_only() {
        let source = "interface OrbsParameters { count: number }\n\
                      export const Orbs: React.FC<OrbsParameters> = () => null;\n\
                      const OrbsExtra = 1;\n\
                      const MyOrbs = 2;\n";
        let renamed = rename_identifiers(source, "Orbs", "DriftingOrbs");

        assert!(renamed.contains("interface DriftingOrbsParameters {"));
        assert!(renamed.contains("export const DriftingOrbs: React.FC<DriftingOrbsParameters>"));
        assert!(renamed.contains("const OrbsExtra = 1;"));
        assert!(renamed.contains("const MyOrbs = 2;"));
    }

    #[test]
    fn test_rename_identifiers_noop() {
        assert_eq!(rename_identifiers("const A = 1;", "A", "A"), "const A = 1;");
        assert_eq!(rename_identifiers("const A = 1;", "", "B"), "const A = 1;");
    }
}
