/// A piece of a template string: literal text or a `{{path}}` hole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart {
    Text(String),
    /// The raw path between the braces, trimmed.
    Placeholder(String),
}

/// Split a string into literal and placeholder parts.
///
/// An opening `{{` without a matching `}}` is treated as literal text,
/// as is everything after the last complete placeholder.
pub fn scan_template(input: &str) -> Vec<TemplatePart> {
    let mut parts = Vec::new();
    let mut rest = input;

    while let Some(open) = rest.find("{{") {
        let Some(close) = rest[open + 2..].find("}}") else {
            break;
        };
        if open > 0 {
            parts.push(TemplatePart::Text(rest[..open].to_string()));
        }
        let inner = rest[open + 2..open + 2 + close].trim();
        parts.push(TemplatePart::Placeholder(inner.to_string()));
        rest = &rest[open + 2 + close + 2..];
    }

    if !rest.is_empty() {
        parts.push(TemplatePart::Text(rest.to_string()));
    }
    parts
}

/// Whether the scanned parts are exactly one placeholder and nothing else.
pub fn is_single_placeholder(parts: &[TemplatePart]) -> bool {
    matches!(parts, [TemplatePart::Placeholder(_)])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> TemplatePart {
        TemplatePart::Text(s.to_string())
    }

    fn hole(s: &str) -> TemplatePart {
        TemplatePart::Placeholder(s.to_string())
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(scan_template("no holes here"), vec![text("no holes here")]);
    }

    #[test]
    fn test_single_placeholder() {
        let parts = scan_template("{{trigger_data.id}}");
        assert_eq!(parts, vec![hole("trigger_data.id")]);
        assert!(is_single_placeholder(&parts));
    }

    #[test]
    fn test_mixed_template() {
        let parts = scan_template("Ticket {{id}} from {{user.name}}!");
        assert_eq!(
            parts,
            vec![
                text("Ticket "),
                hole("id"),
                text(" from "),
                hole("user.name"),
                text("!"),
            ]
        );
        assert!(!is_single_placeholder(&parts));
    }

    #[test]
    fn test_inner_whitespace_trimmed() {
        assert_eq!(scan_template("{{ a.b }}"), vec![hole("a.b")]);
    }

    #[test]
    fn test_unterminated_brace_is_literal() {
        assert_eq!(
            scan_template("before {{a.b after"),
            vec![text("before {{a.b after")]
        );
        assert_eq!(
            scan_template("{{ok}} then {{broken"),
            vec![hole("ok"), text(" then {{broken")]
        );
    }

    #[test]
    fn test_adjacent_placeholders() {
        assert_eq!(scan_template("{{a}}{{b}}"), vec![hole("a"), hole("b")]);
    }

    #[test]
    fn test_empty_placeholder_kept() {
        // Resolves to null later; the scanner does not judge paths
        assert_eq!(scan_template("{{}}"), vec![hole("")]);
    }
}
