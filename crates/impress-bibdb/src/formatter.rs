//! BibTeX formatting module
//!
//! Converts entries back to BibTeX text. Comment and preamble pseudo-entries
//! are written exactly as they were read.

use serde::{Deserialize, Serialize};

use crate::entry::{Entry, FieldValue};
use crate::macros::MacroTable;

/// Fields written first, in this order, when present
pub const PREFERRED_ORDER: &[&str] = &[
    "author",
    "title",
    "subtitle",
    "titleaddon",
    "editor",
    "booktitle",
    "booksubtitle",
    "maintitle",
    "journaltitle",
    "journal",
    "series",
    "volume",
    "number",
    "edition",
    "pages",
    "chapter",
    "publisher",
    "organization",
    "institution",
    "school",
    "location",
    "address",
    "month",
    "year",
    "date",
    "note",
    "crossref",
    "keywords",
    "abstract",
    "isbn",
    "issn",
    "eprint",
    "doi",
    "url",
    "file",
];

/// Output layout settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatOptions {
    /// Prefix of every field line
    pub indent: String,

    /// Field stamped with the current date when a modified entry is written
    pub timestamp_field: Option<String>,

    /// Write unmodified parsed entries back byte-for-byte
    pub keep_raw_unmodified: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            indent: "    ".to_string(),
            timestamp_field: Some("timestamp".to_string()),
            keep_raw_unmodified: false,
        }
    }
}

/// Format a single entry
pub fn format_entry(entry: &Entry, options: &FormatOptions) -> String {
    if entry.entry_type().is_verbatim() {
        return entry.raw().to_string();
    }
    if options.keep_raw_unmodified && !entry.is_modified() && !entry.raw().is_empty() {
        return entry.raw().to_string();
    }

    let mut result = String::new();
    result.push('@');
    result.push_str(entry.entry_type().as_str());
    result.push('{');
    result.push_str(entry.key().unwrap_or_default());
    result.push(',');
    result.push('\n');

    for (name, value) in ordered_fields(entry) {
        result.push_str(&options.indent);
        result.push_str(name);
        result.push_str(" = ");
        result.push_str(&format_field_value(value));
        result.push(',');
        result.push('\n');
    }

    result.push('}');
    result
}

/// Format entries separated by blank lines
pub fn format_entries<'a>(
    entries: impl IntoIterator<Item = &'a Entry>,
    options: &FormatOptions,
) -> String {
    entries
        .into_iter()
        .map(|entry| format_entry(entry, options))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Format every macro as an `@string` definition, one per line
pub fn format_macros(macros: &MacroTable) -> String {
    macros
        .iter()
        .map(|(name, value)| format_string_definition(name, value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format a @string definition
pub fn format_string_definition(name: &str, value: &str) -> String {
    format!("@string{{{} = {{{}}}}}", name, value)
}

/// Preferred fields first, then the rest in lexical order
fn ordered_fields(entry: &Entry) -> Vec<(&str, &FieldValue)> {
    let mut fields: Vec<(&str, &FieldValue)> = PREFERRED_ORDER
        .iter()
        .filter_map(|name| entry.field(name).map(|value| (*name, value)))
        .collect();
    fields.extend(
        entry
            .fields()
            .filter(|(name, _)| !PREFERRED_ORDER.contains(name)),
    );
    fields
}

fn format_field_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Number(n) => n.clone(),
        FieldValue::Text(text) => format!("{{{}}}", text),
    }
}
