/// One step of a resolution path: a key with an optional array index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub key: String,
    pub index: Option<usize>,
}

impl PathSegment {
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            index: None,
        }
    }

    pub fn indexed(key: impl Into<String>, index: usize) -> Self {
        Self {
            key: key.into(),
            index: Some(index),
        }
    }
}

/// Parse a dot path like `a.b[2].c` into segments.
///
/// Grammar: `segment ('.' segment)*` where a segment is an identifier
/// with an optional single `[uint]` suffix. Identifiers are ASCII
/// alphanumerics plus `_` and `-`. Returns `None` for anything else;
/// resolution then yields null rather than an error.
pub fn parse_path(input: &str) -> Option<Vec<PathSegment>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let mut segments = Vec::new();
    for part in input.split('.') {
        segments.push(parse_segment(part)?);
    }
    Some(segments)
}

fn parse_segment(part: &str) -> Option<PathSegment> {
    let (key, index) = match part.find('[') {
        None => (part, None),
        Some(open) => {
            if !part.ends_with(']') {
                return None;
            }
            let digits = &part[open + 1..part.len() - 1];
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            (&part[..open], Some(digits.parse().ok()?))
        }
    };

    if key.is_empty() || !key.bytes().all(is_ident_byte) {
        return None;
    }
    Some(PathSegment {
        key: key.to_string(),
        index,
    })
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_path() {
        assert_eq!(
            parse_path("trigger_data.issue.title"),
            Some(vec![
                PathSegment::key("trigger_data"),
                PathSegment::key("issue"),
                PathSegment::key("title"),
            ])
        );
    }

    #[test]
    fn test_indexed_segment() {
        assert_eq!(
            parse_path("trigger_data.labels[0].name"),
            Some(vec![
                PathSegment::key("trigger_data"),
                PathSegment::indexed("labels", 0),
                PathSegment::key("name"),
            ])
        );
    }

    #[test]
    fn test_single_segment() {
        assert_eq!(parse_path("agent1"), Some(vec![PathSegment::key("agent1")]));
        assert_eq!(
            parse_path("items[12]"),
            Some(vec![PathSegment::indexed("items", 12)])
        );
    }

    #[test]
    fn test_ids_with_dashes_and_digits() {
        assert_eq!(
            parse_path("node-7.output_2"),
            Some(vec![PathSegment::key("node-7"), PathSegment::key("output_2")])
        );
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        assert_eq!(parse_path("  a.b  "), Some(vec![PathSegment::key("a"), PathSegment::key("b")]));
    }

    #[test]
    fn test_malformed_paths_rejected() {
        for bad in [
            "",
            ".",
            "a.",
            ".a",
            "a..b",
            "a[",
            "a[]",
            "a[x]",
            "a[1",
            "a[1]]",
            "a[0][1]",
            "a b",
            "a.b!",
            "[0]",
        ] {
            assert_eq!(parse_path(bad), None, "expected rejection: {bad:?}");
        }
    }
}
