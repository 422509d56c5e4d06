//! Brace-aware splitting
//!
//! Splits text on a delimiter pattern while treating every matched `{...}`
//! region as opaque. Both the grammar parser (closing-brace scanning) and the
//! name segmenter (whitespace, comma and ` and ` splitting) build on this.
//!
//! Tokens are returned verbatim: this module never strips a token's own
//! wrapping braces. Callers that want unwrapped text use
//! [`strip_outer_braces`] explicitly.

use regex::Regex;

use crate::error::SplitError;

/// Brace depth before each byte of `text`, plus the depth after the last one.
///
/// Braces are counted literally, as BibTeX does: a backslash does not
/// escape them, so `C:\tmp\}` closes a group.
fn depth_map(text: &str) -> Result<Vec<usize>, SplitError> {
    let mut depths = Vec::with_capacity(text.len() + 1);
    let mut depth = 0usize;

    for (pos, b) in text.bytes().enumerate() {
        depths.push(depth);
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or(SplitError::Unbalanced { offset: pos })?;
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(SplitError::Unbalanced { offset: text.len() });
    }
    depths.push(depth);
    Ok(depths)
}

/// Check that every `{` in `text` has a matching `}`.
pub fn is_balanced(text: &str) -> bool {
    depth_map(text).is_ok()
}

/// Split `text` on every match of `delimiter` that lies at brace depth zero.
///
/// Matches that start inside a brace group, or that themselves contain a
/// brace, are ignored. Unbalanced braces are reported as an error rather
/// than producing a partial split.
pub fn split<'a>(text: &'a str, delimiter: &Regex) -> Result<Vec<&'a str>, SplitError> {
    let depths = depth_map(text)?;
    let mut parts = Vec::new();
    let mut start = 0;

    for m in delimiter.find_iter(text) {
        if m.start() < start || m.is_empty() {
            continue;
        }
        if depths[m.start()] != 0 || m.as_str().contains(['{', '}']) {
            continue;
        }
        parts.push(&text[start..m.start()]);
        start = m.end();
    }
    parts.push(&text[start..]);

    Ok(parts)
}

/// Byte offset of the `}` matching the `{` that `text` starts with.
///
/// Returns `None` when `text` does not start with `{` or the group is never
/// closed.
pub fn closing_brace(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.first() != Some(&b'{') {
        return None;
    }

    let mut depth = 0usize;
    for (pos, b) in bytes.iter().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(pos);
                }
            }
            _ => {}
        }
    }

    None
}

/// Remove one pair of braces when they wrap the whole token.
///
/// `{Barnes and Noble}` becomes `Barnes and Noble`; `{B}ook` is returned
/// unchanged because its braces close before the end.
pub fn strip_outer_braces(token: &str) -> &str {
    match closing_brace(token) {
        Some(end) if end == token.len() - 1 => &token[1..end],
        _ => token,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ws() -> Regex {
        Regex::new(r"\s+").unwrap()
    }

    #[test]
    fn test_split_plain() {
        assert_eq!(split("a b  c", &ws()).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_split_keeps_braced_regions() {
        assert_eq!(
            split("{Barnes and Noble} Inc", &ws()).unwrap(),
            vec!["{Barnes and Noble}", "Inc"]
        );
    }

    #[test]
    fn test_split_on_and_at_depth_zero() {
        let and = Regex::new(r"(?i)\s+and\s+").unwrap();
        assert_eq!(
            split("Smith, J. and {Tom and Jerry} AND Doe", &and).unwrap(),
            vec!["Smith, J.", "{Tom and Jerry}", "Doe"]
        );
    }

    #[test]
    fn test_split_unbalanced() {
        assert!(split("a {b c", &ws()).is_err());
        assert!(split("a } b", &ws()).is_err());
    }

    #[test]
    fn test_backslash_does_not_escape_braces() {
        assert!(!is_balanced(r"a \{ b"));
        assert!(!is_balanced(r"50\% \}"));
        assert!(is_balanced(r#"{\"o}"#));
        assert_eq!(
            split(r"{dir C:\tmp\} next", &ws()).unwrap(),
            vec![r"{dir C:\tmp\}", "next"]
        );
    }

    #[test]
    fn test_closing_brace() {
        assert_eq!(closing_brace("{a{b}c} rest"), Some(6));
        assert_eq!(closing_brace("{a"), None);
        assert_eq!(closing_brace("a}"), None);
        assert_eq!(closing_brace(r"{a\}}"), Some(3));
    }

    #[test]
    fn test_strip_outer_braces() {
        assert_eq!(strip_outer_braces("{Von}"), "Von");
        assert_eq!(strip_outer_braces("{B}ook"), "{B}ook");
        assert_eq!(strip_outer_braces("plain"), "plain");
        assert_eq!(strip_outer_braces(""), "");
    }
}
