//! Personal name segmentation
//!
//! Splits a BibTeX name into its four parts (first, von, last, jr). Two
//! layouts are recognized:
//!
//! - `First von Last`, with no comma
//! - `von Last, First` and `von Last, Jr, First`
//!
//! The von part is found by case: a token whose first visible letter is
//! lowercase belongs to it. Tokens are kept verbatim, braces included, so
//! `{van}` stays protected and round-trips unchanged.
//!
//! Segmentation never fails. Unbalanced braces put the whole text in `last`.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::crossref::EntrySource;
use crate::entry::{Entry, FieldValue};
use crate::error::FieldError;
use crate::splitter::{closing_brace, split};

lazy_static! {
    // A tie (`~`) separates tokens like a space. Hyphens do not, so
    // `Jean-Paul` stays one token.
    static ref TOKEN_SEPARATOR: Regex = Regex::new(r"[\s~]+").unwrap();
    static ref COMMA: Regex = Regex::new(r"\s*,\s*").unwrap();
    static ref AND: Regex = Regex::new(r"(?i)\s+and\s+").unwrap();
}

/// Control words that stand for a single letter (`\o`, `\aa`, `\ss`, ...).
/// Their own first letter gives the case.
const LETTER_ESCAPES: &[&str] = &[
    "i", "j", "o", "O", "l", "L", "aa", "AA", "ae", "AE", "oe", "OE", "ss", "SS",
];

/// Accent commands written with a letter name; the accented letter follows.
const ACCENT_ESCAPES: &[&str] = &["c", "v", "u", "r", "k", "H", "d", "b", "t", "G", "U"];

/// A name split into its four parts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    first: Option<String>,
    von: Option<String>,
    last: Option<String>,
    jr: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn join(tokens: &[&str]) -> Option<String> {
    non_empty(Some(tokens.join(" ")))
}

impl PersonName {
    /// Segment a raw name
    pub fn parse(full_name: &str) -> Self {
        split_name(full_name)
    }

    pub fn first(&self) -> Option<&str> {
        self.first.as_deref()
    }

    pub fn von(&self) -> Option<&str> {
        self.von.as_deref()
    }

    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }

    pub fn jr(&self) -> Option<&str> {
        self.jr.as_deref()
    }

    pub fn set_first(&mut self, value: Option<String>) {
        self.first = non_empty(value);
    }

    pub fn set_von(&mut self, value: Option<String>) {
        self.von = non_empty(value);
    }

    pub fn set_last(&mut self, value: Option<String>) {
        self.last = non_empty(value);
    }

    pub fn set_jr(&mut self, value: Option<String>) {
        self.jr = non_empty(value);
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_none() && self.von.is_none() && self.last.is_none() && self.jr.is_none()
    }

    fn von_last(&self) -> Option<String> {
        let parts: Vec<&str> = [self.von(), self.last()].into_iter().flatten().collect();
        join(&parts)
    }

    /// Format as "von Last, Jr, First" for BibTeX
    pub fn to_bibtex(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        parts.extend(self.von_last());
        parts.extend(self.jr.clone());
        if self.jr.is_some() && self.first.is_none() {
            parts.push(String::new());
        }
        parts.extend(self.first.clone());
        parts.join(", ")
    }

    /// Format as "First von Last, Jr" for display
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.first(), self.von(), self.last()]
            .into_iter()
            .flatten()
            .collect();
        let mut name = parts.join(" ");
        if let Some(jr) = &self.jr {
            name.push_str(", ");
            name.push_str(jr);
        }
        name
    }

    /// "Last First von Jr", the order used for sorting
    pub fn sort_name(&self) -> String {
        let parts: Vec<&str> = [self.last(), self.first(), self.von(), self.jr()]
            .into_iter()
            .flatten()
            .collect();
        parts.join(" ")
    }
}

/// Split a name list on ` and ` (any case) outside braces
pub fn split_names(field: &str) -> Vec<&str> {
    let field = field.trim();
    let parts = split(field, &AND).unwrap_or_else(|_| vec![field]);
    parts
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}

/// Segment a raw name into first, von, last and jr
pub fn split_name(full_name: &str) -> PersonName {
    let text = full_name.trim();
    if text.is_empty() {
        return PersonName::default();
    }

    let segments = match split(text, &COMMA) {
        Ok(segments) => segments,
        Err(_) => {
            return PersonName {
                last: Some(text.to_string()),
                ..PersonName::default()
            }
        }
    };

    if segments.len() == 1 {
        split_first_von_last(&tokens(text))
    } else {
        split_von_last_first(&segments)
    }
}

fn tokens(segment: &str) -> Vec<&str> {
    split(segment, &TOKEN_SEPARATOR)
        .unwrap_or_else(|_| vec![segment])
        .into_iter()
        .filter(|token| !token.is_empty())
        .collect()
}

/// "First von Last": the final token always stays in last
fn split_first_von_last(tokens: &[&str]) -> PersonName {
    let Some(last_idx) = tokens.len().checked_sub(1) else {
        return PersonName::default();
    };

    let (first, von, last) = match tokens[..last_idx]
        .iter()
        .position(|token| is_lowercase_initial(token))
    {
        Some(start) => {
            let run = tokens[start..last_idx]
                .iter()
                .take_while(|token| is_lowercase_initial(token))
                .count();
            let end = start + run;
            (&tokens[..start], &tokens[start..end], &tokens[end..])
        }
        None => (&tokens[..last_idx], &tokens[..0], &tokens[last_idx..]),
    };

    PersonName {
        first: join(first),
        von: join(von),
        last: join(last),
        jr: None,
    }
}

/// "von Last, First" or "von Last, Jr, First"
fn split_von_last_first(segments: &[&str]) -> PersonName {
    let head = tokens(segments[0]);
    let limit = head.len().saturating_sub(1);
    let von_len = head[..limit]
        .iter()
        .take_while(|token| is_lowercase_initial(token))
        .count();

    let (jr, first) = match segments {
        [_, first] => (None, tokens(first).join(" ")),
        [_, jr, rest @ ..] => {
            let rest: Vec<String> = rest.iter().map(|seg| tokens(seg).join(" ")).collect();
            (join(&tokens(jr)), rest.join(", "))
        }
        _ => (None, String::new()),
    };

    PersonName {
        first: non_empty(Some(first)),
        von: join(&head[..von_len]),
        last: join(&head[von_len..]),
        jr,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Case {
    Lower,
    Upper,
}

fn is_lowercase_initial(token: &str) -> bool {
    initial_case(token) == Some(Case::Lower)
}

/// Case of the first visible letter of a token.
///
/// A token wrapped entirely in braces is caseless. A brace group opening
/// with a backslash is a special character and its escape decides.
fn initial_case(token: &str) -> Option<Case> {
    if token.starts_with('{') {
        let end = closing_brace(token)?;
        let inner = &token[1..end];
        if inner.starts_with('\\') {
            return escape_case(inner);
        }
        let rest = &token[end + 1..];
        if rest.is_empty() {
            return None;
        }
        return letter_case(rest);
    }
    if token.starts_with('\\') {
        return escape_case(token);
    }
    letter_case(token)
}

fn letter_case(text: &str) -> Option<Case> {
    for (idx, c) in text.char_indices() {
        if c == '{' || c == '\\' {
            return initial_case(&text[idx..]);
        }
        if c.is_alphabetic() {
            return Some(if c.is_lowercase() {
                Case::Lower
            } else {
                Case::Upper
            });
        }
    }
    None
}

/// Case carried by a `\`-escape at the start of `text`
fn escape_case(text: &str) -> Option<Case> {
    let body = &text[1..];
    let name_len = body
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(body.len());
    let name = &body[..name_len];

    if name.is_empty() {
        // Control symbol such as \" or \'; the accented letter follows
        let mut chars = body.chars();
        chars.next()?;
        return letter_case(skip_argument_start(chars.as_str()));
    }

    if LETTER_ESCAPES.contains(&name) {
        return letter_case(name);
    }

    // Accent commands and any other control word: look past it
    let after = &body[name_len..];
    if ACCENT_ESCAPES.contains(&name) {
        return letter_case(skip_argument_start(after));
    }
    letter_case(after.trim_start())
}

fn skip_argument_start(text: &str) -> &str {
    text.trim_start_matches(|c: char| c == '{' || c.is_whitespace())
}

impl Entry {
    /// Names in a (possibly inherited) name-list field
    pub fn names<S: EntrySource + ?Sized>(&self, field: &str, source: &S) -> Vec<PersonName> {
        self.resolve(field, source)
            .map(|value| split_names(value.as_str()).into_iter().map(split_name).collect())
            .unwrap_or_default()
    }

    pub fn authors<S: EntrySource + ?Sized>(&self, source: &S) -> Vec<PersonName> {
        self.names("author", source)
    }

    pub fn editors<S: EntrySource + ?Sized>(&self, source: &S) -> Vec<PersonName> {
        self.names("editor", source)
    }

    /// Replace a name-list field with structured names
    pub fn set_names(
        &mut self,
        field: &str,
        names: &[PersonName],
    ) -> Result<Option<FieldValue>, FieldError> {
        let value = names
            .iter()
            .map(PersonName::to_bibtex)
            .collect::<Vec<_>>()
            .join(" and ");
        self.set_field(field, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(name: &PersonName) -> (Option<&str>, Option<&str>, Option<&str>, Option<&str>) {
        (name.first(), name.von(), name.last(), name.jr())
    }

    #[test]
    fn test_first_last() {
        let name = split_name("Donald Duck");
        assert_eq!(parts(&name), (Some("Donald"), None, Some("Duck"), None));
    }

    #[test]
    fn test_von_last_first() {
        let name = split_name("von Neumann, John");
        assert_eq!(parts(&name), (Some("John"), Some("von"), Some("Neumann"), None));
    }

    #[test]
    fn test_first_von_last() {
        let name = split_name("Ludwig van Beethoven");
        assert_eq!(parts(&name), (Some("Ludwig"), Some("van"), Some("Beethoven"), None));
    }

    #[test]
    fn test_last_jr_first() {
        let name = split_name("King, Jr, Martin Luther");
        assert_eq!(
            parts(&name),
            (Some("Martin Luther"), None, Some("King"), Some("Jr"))
        );
    }

    #[test]
    fn test_single_token() {
        let name = split_name("Aristotle");
        assert_eq!(parts(&name), (None, None, Some("Aristotle"), None));
    }

    #[test]
    fn test_empty_and_blank() {
        assert!(split_name("").is_empty());
        assert!(split_name("   ").is_empty());
    }

    #[test]
    fn test_braced_von_is_protected() {
        let name = split_name("Ludwig {van} Beethoven");
        assert_eq!(parts(&name), (Some("Ludwig {van}"), None, Some("Beethoven"), None));
    }

    #[test]
    fn test_special_character_decides_case() {
        let name = split_name("Hans {\\\"u}ber Alles");
        assert_eq!(name.von(), Some("{\\\"u}ber"));

        let name = split_name("Hans {\\\"U}ber Alles");
        assert_eq!(name.first(), Some("Hans {\\\"U}ber"));
        assert_eq!(name.von(), None);
    }

    #[test]
    fn test_letter_escapes() {
        assert_eq!(initial_case("\\aa rhus"), Some(Case::Lower));
        assert_eq!(initial_case("\\AA rhus"), Some(Case::Upper));
        assert_eq!(initial_case("\\v{s}ilhav\\'y"), Some(Case::Lower));
        assert_eq!(initial_case("{Von}"), None);
        assert_eq!(initial_case("{X}y"), Some(Case::Lower));
        assert_eq!(initial_case("-de"), Some(Case::Lower));
    }

    #[test]
    fn test_von_run_never_takes_last_token() {
        let name = split_name("Ludwig van beethoven");
        assert_eq!(parts(&name), (Some("Ludwig"), Some("van"), Some("beethoven"), None));

        let name = split_name("de la, Jean");
        assert_eq!(parts(&name), (Some("Jean"), Some("de"), Some("la"), None));
    }

    #[test]
    fn test_multi_word_von() {
        let name = split_name("Jean de la Fontaine");
        assert_eq!(parts(&name), (Some("Jean"), Some("de la"), Some("Fontaine"), None));
    }

    #[test]
    fn test_unbalanced_falls_back_to_last() {
        let name = split_name("Ludwig {van Beethoven");
        assert_eq!(parts(&name), (None, None, Some("Ludwig {van Beethoven"), None));
    }

    #[test]
    fn test_extra_commas_join_into_first() {
        let name = split_name("Doe, Jr, John, Q.");
        assert_eq!(name.first(), Some("John, Q."));
        assert_eq!(name.jr(), Some("Jr"));
    }

    #[test]
    fn test_trailing_comma_has_no_first() {
        let name = split_name("Smith,");
        assert_eq!(parts(&name), (None, None, Some("Smith"), None));
    }

    #[test]
    fn test_split_names() {
        assert_eq!(
            split_names("Smith, John and {Barnes and Noble} AND Doe, Jane"),
            vec!["Smith, John", "{Barnes and Noble}", "Doe, Jane"]
        );
        assert!(split_names("  ").is_empty());
    }

    #[test]
    fn test_formatting() {
        let name = split_name("King, Jr, Martin Luther");
        assert_eq!(name.to_bibtex(), "King, Jr, Martin Luther");
        assert_eq!(name.display_name(), "Martin Luther King, Jr");
        assert_eq!(name.sort_name(), "King Martin Luther Jr");

        let name = split_name("Ludwig van Beethoven");
        assert_eq!(name.to_bibtex(), "van Beethoven, Ludwig");
        assert_eq!(split_name(&name.to_bibtex()), name);
    }

    #[test]
    fn test_setters_normalize_empty() {
        let mut name = split_name("Donald Duck");
        name.set_first(Some(String::new()));
        name.set_jr(Some("III".to_string()));
        assert_eq!(name.first(), None);
        assert_eq!(name.to_bibtex(), "Duck, III, ");
    }

    #[test]
    fn test_tie_separates_tokens() {
        let name = split_name("Donald~E. Knuth");
        assert_eq!(name.first(), Some("Donald E."));
        assert_eq!(name.last(), Some("Knuth"));

        let name = split_name("Knuth, Donald~E.");
        assert_eq!(name.first(), Some("Donald E."));

        let name = split_name("Ludwig~van~Beethoven");
        assert_eq!(name.von(), Some("van"));
        assert_eq!(name.last(), Some("Beethoven"));
    }

    #[test]
    fn test_hyphenated_tokens_stay_whole() {
        let name = split_name("Jean-Paul Sartre");
        assert_eq!(name.first(), Some("Jean-Paul"));
        assert_eq!(name.last(), Some("Sartre"));

        let name = split_name("Ludwig van Beethoven-Smith");
        assert_eq!(name.last(), Some("Beethoven-Smith"));
    }
}
