//! `@string` macro table
//!
//! One table belongs to one parse session. Definitions are applied in source
//! order, so redefining a name only affects values read afterwards.

use std::collections::BTreeMap;

const MONTHS: [(&str, &str); 12] = [
    ("jan", "January"),
    ("feb", "February"),
    ("mar", "March"),
    ("apr", "April"),
    ("may", "May"),
    ("jun", "June"),
    ("jul", "July"),
    ("aug", "August"),
    ("sep", "September"),
    ("oct", "October"),
    ("nov", "November"),
    ("dec", "December"),
];

/// Mapping from macro name (case-insensitive) to expansion text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacroTable {
    macros: BTreeMap<String, String>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table pre-seeded with the standard three-letter month macros
    pub fn with_month_names() -> Self {
        let mut table = Self::new();
        for (name, value) in MONTHS {
            table.define(name, value);
        }
        table
    }

    /// Define or overwrite a macro, returning the previous expansion
    pub fn define(&mut self, name: &str, value: impl Into<String>) -> Option<String> {
        self.macros.insert(name.to_lowercase(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.macros.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(&name.to_lowercase())
    }

    /// Expand a bare token; undefined names pass through literally.
    pub fn expand<'a>(&'a self, token: &'a str) -> &'a str {
        self.get(token).unwrap_or(token)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.macros.remove(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Definitions in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.macros.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
