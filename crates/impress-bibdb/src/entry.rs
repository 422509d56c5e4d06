//! BibTeX entry data structures

use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crossref::EntrySource;
use crate::error::{FieldError, ParseError};
use crate::latex::to_plain_text;
use crate::splitter::is_balanced;

/// BibTeX/BibLaTeX entry type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryType {
    Article,
    Book,
    MvBook,
    InBook,
    BookInBook,
    SuppBook,
    Booklet,
    Collection,
    MvCollection,
    InCollection,
    SuppCollection,
    Manual,
    Misc,
    Online,
    Patent,
    Periodical,
    SuppPeriodical,
    Proceedings,
    MvProceedings,
    InProceedings,
    Reference,
    MvReference,
    InReference,
    Report,
    Set,
    Thesis,
    Unpublished,
    MastersThesis,
    PhdThesis,
    TechReport,
    /// `@comment{...}`, kept verbatim
    Comment,
    /// `@preamble{...}`, kept verbatim
    Preamble,
    /// `@string{...}`; only seen on failed definitions
    Macro,
    /// Any other type, stored lowercase
    Other(String),
}

impl EntryType {
    /// Parse an entry type from a string (case-insensitive)
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "article" => Self::Article,
            "book" => Self::Book,
            "mvbook" => Self::MvBook,
            "inbook" => Self::InBook,
            "bookinbook" => Self::BookInBook,
            "suppbook" => Self::SuppBook,
            "booklet" => Self::Booklet,
            "collection" => Self::Collection,
            "mvcollection" => Self::MvCollection,
            "incollection" => Self::InCollection,
            "suppcollection" => Self::SuppCollection,
            "manual" => Self::Manual,
            "misc" => Self::Misc,
            "online" | "electronic" | "www" => Self::Online,
            "patent" => Self::Patent,
            "periodical" => Self::Periodical,
            "suppperiodical" => Self::SuppPeriodical,
            "proceedings" => Self::Proceedings,
            "mvproceedings" => Self::MvProceedings,
            "inproceedings" | "conference" => Self::InProceedings,
            "reference" => Self::Reference,
            "mvreference" => Self::MvReference,
            "inreference" => Self::InReference,
            "report" => Self::Report,
            "set" => Self::Set,
            "thesis" => Self::Thesis,
            "unpublished" => Self::Unpublished,
            "mastersthesis" => Self::MastersThesis,
            "phdthesis" => Self::PhdThesis,
            "techreport" => Self::TechReport,
            "comment" => Self::Comment,
            "preamble" => Self::Preamble,
            "string" => Self::Macro,
            other => Self::Other(other.to_string()),
        }
    }

    /// Convert entry type to canonical string
    pub fn as_str(&self) -> &str {
        match self {
            Self::Article => "article",
            Self::Book => "book",
            Self::MvBook => "mvbook",
            Self::InBook => "inbook",
            Self::BookInBook => "bookinbook",
            Self::SuppBook => "suppbook",
            Self::Booklet => "booklet",
            Self::Collection => "collection",
            Self::MvCollection => "mvcollection",
            Self::InCollection => "incollection",
            Self::SuppCollection => "suppcollection",
            Self::Manual => "manual",
            Self::Misc => "misc",
            Self::Online => "online",
            Self::Patent => "patent",
            Self::Periodical => "periodical",
            Self::SuppPeriodical => "suppperiodical",
            Self::Proceedings => "proceedings",
            Self::MvProceedings => "mvproceedings",
            Self::InProceedings => "inproceedings",
            Self::Reference => "reference",
            Self::MvReference => "mvreference",
            Self::InReference => "inreference",
            Self::Report => "report",
            Self::Set => "set",
            Self::Thesis => "thesis",
            Self::Unpublished => "unpublished",
            Self::MastersThesis => "mastersthesis",
            Self::PhdThesis => "phdthesis",
            Self::TechReport => "techreport",
            Self::Comment => "comment",
            Self::Preamble => "preamble",
            Self::Macro => "string",
            Self::Other(name) => name,
        }
    }

    /// Comment and preamble blocks carry raw text instead of fields
    pub fn is_verbatim(&self) -> bool {
        matches!(self, Self::Comment | Self::Preamble)
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field value. Numbers are tracked apart from text so they can be
/// written back without braces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(String),
}

impl FieldValue {
    /// Build a number from a bare literal. Leading zeros are not numbers.
    pub fn parse_number(literal: &str) -> Option<Self> {
        let is_digits = !literal.is_empty() && literal.bytes().all(|b| b.is_ascii_digit());
        if is_digits && (literal == "0" || !literal.starts_with('0')) {
            Some(Self::Number(literal.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(s) | Self::Number(s) => s,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Self::Number(_))
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<u64> for FieldValue {
    fn from(n: u64) -> Self {
        Self::Number(n.to_string())
    }
}

pub(crate) fn is_field_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "_-.:+/".contains(c)
}

/// A parsed BibTeX entry, or a comment/preamble pseudo-entry
#[derive(Debug, Clone)]
pub struct Entry {
    entry_type: EntryType,
    key: Option<String>,
    fields: BTreeMap<String, FieldValue>,
    raw: String,
    line: usize,
    error: Option<ParseError>,
    modified: bool,
    crossref_link: Option<String>,
    sort_key: OnceCell<String>,
    validation: Vec<String>,
}

impl Entry {
    /// Create a new, empty entry
    pub fn new(entry_type: EntryType, key: impl Into<String>) -> Self {
        Self {
            entry_type,
            key: Some(key.into()),
            fields: BTreeMap::new(),
            raw: String::new(),
            line: 0,
            error: None,
            modified: false,
            crossref_link: None,
            sort_key: OnceCell::new(),
            validation: Vec::new(),
        }
    }

    /// A comment or preamble block captured byte-for-byte
    pub(crate) fn verbatim(entry_type: EntryType, raw: &str, line: usize) -> Self {
        Self {
            key: None,
            raw: raw.to_string(),
            line,
            ..Self::new(entry_type, String::new())
        }
    }

    /// An entry whose block could not be read
    pub(crate) fn failed(
        entry_type: EntryType,
        key: Option<String>,
        raw: &str,
        line: usize,
        error: ParseError,
    ) -> Self {
        Self {
            key,
            raw: raw.to_string(),
            line,
            error: Some(error),
            ..Self::new(entry_type, String::new())
        }
    }

    /// Attach source position after a successful read
    pub(crate) fn with_source(mut self, raw: &str, line: usize) -> Self {
        self.raw = raw.to_string();
        self.line = line;
        self
    }

    /// Store a value while parsing; does not mark the entry modified.
    /// Returns the previous value when the field was repeated.
    pub(crate) fn insert_parsed(&mut self, name: &str, value: FieldValue) -> Option<FieldValue> {
        self.fields.insert(name.to_lowercase(), value)
    }

    pub fn entry_type(&self) -> &EntryType {
        &self.entry_type
    }

    pub fn set_entry_type(&mut self, entry_type: EntryType) {
        self.entry_type = entry_type;
        self.modified = true;
    }

    /// Citation key; `None` for comment/preamble pseudo-entries
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Source text of the block as read (empty for entries built in memory)
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// 1-based line the block starts on (0 for entries built in memory)
    pub fn line(&self) -> usize {
        self.line
    }

    /// Whether the block parsed without error
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn error(&self) -> Option<&ParseError> {
        self.error.as_ref()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Get a field stored directly on this entry (case-insensitive name)
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(&name.to_lowercase())
    }

    /// Get a local field as text
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.field(name).map(FieldValue::as_str)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Set a field, returning the previous value.
    ///
    /// Text values must have balanced braces, otherwise the written file
    /// could not be read back.
    pub fn set_field(
        &mut self,
        name: &str,
        value: impl Into<FieldValue>,
    ) -> Result<Option<FieldValue>, FieldError> {
        if self.entry_type.is_verbatim() {
            return Err(FieldError::NoFields);
        }
        if name.is_empty() || !name.chars().all(is_field_name_char) {
            return Err(FieldError::InvalidName(name.to_string()));
        }
        let value = value.into();
        if !is_balanced(value.as_str()) {
            return Err(FieldError::UnbalancedBraces {
                field: name.to_string(),
            });
        }
        let name = name.to_lowercase();
        self.unlink_if_crossref(&name);
        self.modified = true;
        Ok(self.fields.insert(name, value))
    }

    /// Remove a field, returning its value
    pub fn remove_field(&mut self, name: &str) -> Option<FieldValue> {
        let name = name.to_lowercase();
        let removed = self.fields.remove(&name);
        if removed.is_some() {
            self.unlink_if_crossref(&name);
            self.modified = true;
        }
        removed
    }

    /// A link may only name the parent the `crossref` field names, so
    /// editing that field drops it until the next link pass.
    fn unlink_if_crossref(&mut self, name: &str) {
        if name == "crossref" {
            self.crossref_link = None;
        }
    }

    /// Fields in lexical name order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Key named by the `crossref` field, if any
    pub fn crossref(&self) -> Option<&str> {
        self.field_str("crossref")
    }

    /// Key of the parent entry, once the link pass found it
    pub fn crossref_link(&self) -> Option<&str> {
        self.crossref_link.as_deref()
    }

    pub(crate) fn set_crossref_link(&mut self, parent: Option<String>) {
        self.crossref_link = parent;
    }

    /// Messages from the last [`Entry::validate`] run
    pub fn validation_messages(&self) -> &[String] {
        &self.validation
    }

    pub(crate) fn set_validation_messages(&mut self, messages: Vec<String>) {
        self.validation = messages;
    }

    /// Stamp the timestamp field of a modified entry
    pub(crate) fn touch(&mut self, timestamp_field: &str, date: &str) {
        self.fields
            .insert(timestamp_field.to_lowercase(), FieldValue::Text(date.to_string()));
    }

    /// Record the text just written for this entry and clear the modified flag
    pub(crate) fn mark_saved(&mut self, raw: String) {
        self.raw = raw;
        self.modified = false;
    }

    /// Plain-text rendition of a (possibly inherited) field
    pub fn plain_field<S: EntrySource + ?Sized>(&self, name: &str, source: &S) -> Option<String> {
        self.resolve(name, source)
            .map(|value| to_plain_text(value.as_str()))
    }

    /// Key used to order entries.
    ///
    /// Computed on first use and cached; later edits do not refresh it.
    pub fn sort_key<S: EntrySource + ?Sized>(&self, source: &S) -> &str {
        self.sort_key.get_or_init(|| self.compute_sort_key(source))
    }

    fn compute_sort_key<S: EntrySource + ?Sized>(&self, source: &S) -> String {
        if let Some(explicit) = self.plain_field("sortkey", source) {
            return explicit.to_lowercase();
        }

        let mut names = self.names("author", source);
        if names.is_empty() {
            names = self.names("editor", source);
        }
        let surnames: Vec<String> = names
            .iter()
            .map(|name| to_plain_text(&name.sort_name()))
            .collect();

        let year = self
            .plain_field("year", source)
            .or_else(|| self.plain_field("date", source))
            .unwrap_or_default();
        let title = self.plain_field("title", source).unwrap_or_default();

        [surnames.join(" "), year, title]
            .iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_type_parsing() {
        assert_eq!(EntryType::from_str("article"), EntryType::Article);
        assert_eq!(EntryType::from_str("ARTICLE"), EntryType::Article);
        assert_eq!(EntryType::from_str("conference"), EntryType::InProceedings);
        assert_eq!(EntryType::from_str("www"), EntryType::Online);
        assert_eq!(
            EntryType::from_str("Dataset"),
            EntryType::Other("dataset".to_string())
        );
        assert_eq!(EntryType::from_str("Dataset").as_str(), "dataset");
    }

    #[test]
    fn test_number_literals() {
        assert_eq!(
            FieldValue::parse_number("2024"),
            Some(FieldValue::Number("2024".to_string()))
        );
        assert_eq!(
            FieldValue::parse_number("0"),
            Some(FieldValue::Number("0".to_string()))
        );
        assert_eq!(FieldValue::parse_number("007"), None);
        assert_eq!(FieldValue::parse_number("12a"), None);
    }

    #[test]
    fn test_field_access_is_case_insensitive() {
        let mut entry = Entry::new(EntryType::Article, "Smith2024");
        entry.set_field("Title", "A Great Paper").unwrap();
        entry.set_field("YEAR", 2024u64).unwrap();

        assert_eq!(entry.field_str("title"), Some("A Great Paper"));
        assert_eq!(entry.field("year"), Some(&FieldValue::Number("2024".into())));
        assert!(entry.is_modified());
        assert_eq!(entry.key(), Some("Smith2024"));
    }

    #[test]
    fn test_set_field_rejects_unbalanced_braces() {
        let mut entry = Entry::new(EntryType::Misc, "x");
        let err = entry.set_field("title", "A {broken title").unwrap_err();
        assert_eq!(
            err,
            FieldError::UnbalancedBraces {
                field: "title".to_string()
            }
        );
        assert!(!entry.has_field("title"));
        assert!(entry.set_field("bad name", "x").is_err());
    }

    #[test]
    fn test_remove_field_marks_modified() {
        let mut entry = Entry::new(EntryType::Misc, "x");
        entry.insert_parsed("note", "hello".into());
        assert!(!entry.is_modified());
        assert_eq!(entry.remove_field("NOTE"), Some("hello".into()));
        assert!(entry.is_modified());
        assert_eq!(entry.remove_field("note"), None);
    }

    #[test]
    fn test_verbatim_entries_have_no_fields() {
        let mut entry = Entry::verbatim(EntryType::Comment, "@comment{x}", 3);
        assert_eq!(entry.key(), None);
        assert_eq!(entry.raw(), "@comment{x}");
        assert_eq!(entry.set_field("a", "b"), Err(FieldError::NoFields));
    }

    #[test]
    fn test_sort_key_is_cached() {
        let mut entry = Entry::new(EntryType::Book, "k");
        entry.set_field("author", "Ludwig van Beethoven").unwrap();
        entry.set_field("year", 1810u64).unwrap();
        entry.set_field("title", "F{\\\"u}r Elise").unwrap();

        let no_parents: &[Entry] = &[];
        assert_eq!(entry.sort_key(no_parents), "beethoven ludwig van 1810 für elise");

        entry.set_field("title", "Something else").unwrap();
        assert_eq!(entry.sort_key(no_parents), "beethoven ludwig van 1810 für elise");
    }
}
