//! Linked-file references
//!
//! The `file` field holds one or more links separated by `;`, each written
//! `description:path:type`. A literal `:`, `;` or `\` inside a part is
//! escaped with a backslash.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entry::Entry;

/// One linked file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLink {
    pub description: String,
    pub path: String,
    pub file_type: String,
}

impl FileLink {
    pub fn new(
        description: impl Into<String>,
        path: impl Into<String>,
        file_type: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            path: path.into(),
            file_type: file_type.into(),
        }
    }

    /// Parse a single `description:path:type` link.
    ///
    /// A bare path (no separator) becomes the path alone. Parts beyond the
    /// third are joined back into the type.
    pub fn parse(text: &str) -> Self {
        let parts = split_unescaped(text, ':');
        match parts.as_slice() {
            [] => Self::default(),
            [path] => Self::new("", path.as_str(), ""),
            [description, path] => Self::new(description.as_str(), path.as_str(), ""),
            [description, path, rest @ ..] => {
                Self::new(description.as_str(), path.as_str(), rest.join(":"))
            }
        }
    }

    /// Parse every link in a `file` field value
    pub fn parse_list(text: &str) -> Vec<Self> {
        split_unescaped_raw(text, ';')
            .into_iter()
            .filter(|part| !part.trim().is_empty())
            .map(|part| Self::parse(part.trim()))
            .collect()
    }

    /// Join links back into a `file` field value
    pub fn format_list(links: &[FileLink]) -> String {
        links
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl fmt::Display for FileLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            escape(&self.description),
            escape(&self.path),
            escape(&self.file_type)
        )
    }
}

fn escape(part: &str) -> String {
    let mut result = String::with_capacity(part.len());
    for c in part.chars() {
        if matches!(c, '\\' | ':' | ';') {
            result.push('\\');
        }
        result.push(c);
    }
    result
}

/// Split on an unescaped separator, keeping escapes in the pieces
fn split_unescaped_raw(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;

    for (idx, c) in text.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == separator {
            parts.push(&text[start..idx]);
            start = idx + c.len_utf8();
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Split on an unescaped separator and remove the escapes
fn split_unescaped(text: &str, separator: char) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    split_unescaped_raw(text, separator)
        .into_iter()
        .map(unescape)
        .collect()
}

fn unescape(part: &str) -> String {
    let mut result = String::with_capacity(part.len());
    let mut chars = part.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => result.extend(chars.next()),
            _ => result.push(c),
        }
    }
    result
}

impl Entry {
    /// Links stored in the `file` field
    pub fn file_links(&self) -> Vec<FileLink> {
        self.field_str("file")
            .map(FileLink::parse_list)
            .unwrap_or_default()
    }
}
