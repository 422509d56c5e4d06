//! Mandatory-field validation
//!
//! Each entry type has a list of OR-groups written as `a/b`: at least one
//! field of every group must resolve, locally or through the crossref
//! parent. Validation is explicit and never runs while parsing.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::crossref::EntrySource;
use crate::entry::{Entry, EntryType};
use crate::error::ValidationError;

const NO_FIELDS: &[&str] = &[];

/// (entry types, mandatory groups)
type Rule = (&'static [&'static str], &'static [&'static str]);

const RULES: &[Rule] = &[
    (&["article"], &["author", "title", "journaltitle/journal", "year/date"]),
    (
        &["book", "mvbook", "booklet", "misc"],
        &["author/editor", "title", "year/date"],
    ),
    (
        &[
            "inbook",
            "bookinbook",
            "suppbook",
            "incollection",
            "suppcollection",
            "inproceedings",
            "inreference",
        ],
        &["author", "title", "booktitle", "year/date"],
    ),
    (
        &["collection", "mvcollection", "reference", "mvreference", "periodical"],
        &["editor", "title", "year/date"],
    ),
    (&["proceedings", "mvproceedings"], &["title", "year/date"]),
    (&["manual"], &["author/editor/organization", "title", "year/date"]),
    (&["online"], &["author/editor", "title", "year/date", "url"]),
    (&["patent"], &["author", "title", "number", "year/date"]),
    (&["suppperiodical"], &["author", "title", "journaltitle/journal", "year/date"]),
    (&["report"], &["author", "title", "type", "institution", "year/date"]),
    (&["techreport"], &["author", "title", "institution", "year/date"]),
    (&["thesis"], &["author", "title", "type", "institution/school", "year/date"]),
    (
        &["mastersthesis", "phdthesis"],
        &["author", "title", "school/institution", "year/date"],
    ),
    (&["unpublished"], &["author", "title", "year/date"]),
    (&["set"], &["entryset"]),
];

lazy_static! {
    static ref MANDATORY: HashMap<&'static str, &'static [&'static str]> = {
        let mut table = HashMap::new();
        for (types, groups) in RULES {
            for entry_type in *types {
                table.insert(*entry_type, *groups);
            }
        }
        table
    };
}

/// Mandatory OR-groups for a type; `None` for unknown types.
/// Pseudo-entries have no requirements.
pub fn mandatory_fields(entry_type: &EntryType) -> Option<&'static [&'static str]> {
    match entry_type {
        EntryType::Comment | EntryType::Preamble | EntryType::Macro => Some(NO_FIELDS),
        EntryType::Other(_) => None,
        known => MANDATORY.get(known.as_str()).copied(),
    }
}

impl Entry {
    /// Validation failures for this entry, one per missing group
    pub fn check<S: EntrySource + ?Sized>(&self, source: &S) -> Vec<ValidationError> {
        let Some(groups) = mandatory_fields(self.entry_type()) else {
            return vec![ValidationError::UnknownType(
                self.entry_type().as_str().to_string(),
            )];
        };

        groups
            .iter()
            .filter(|group| {
                !group
                    .split('/')
                    .any(|field| self.resolve(field, source).is_some())
            })
            .map(|group| ValidationError::MissingMandatoryField {
                entry_type: self.entry_type().as_str().to_string(),
                fields: group.to_string(),
            })
            .collect()
    }

    /// Validate and cache the messages; see [`Entry::validation_messages`]
    pub fn validate<S: EntrySource + ?Sized>(&mut self, source: &S) -> bool {
        let messages: Vec<String> = self
            .check(source)
            .iter()
            .map(ToString::to_string)
            .collect();
        let valid = messages.is_empty();
        self.set_validation_messages(messages);
        valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_reports_each_missing_group() {
        let mut entry = Entry::new(EntryType::Article, "a");
        entry.set_field("journal", "Nature").unwrap();
        let none: &[Entry] = &[];

        assert!(!entry.validate(none));
        assert_eq!(
            entry.validation_messages(),
            &[
                "article entry is missing mandatory field author".to_string(),
                "article entry is missing mandatory field title".to_string(),
                "article entry is missing mandatory field year/date".to_string(),
            ]
        );
    }

    #[test]
    fn test_alternative_satisfies_group() {
        let mut entry = Entry::new(EntryType::Book, "b");
        entry.set_field("editor", "Jane Doe").unwrap();
        entry.set_field("title", "Edited Volume").unwrap();
        entry.set_field("date", "2020-01").unwrap();
        let none: &[Entry] = &[];

        assert!(entry.validate(none));
        assert!(entry.validation_messages().is_empty());
    }

    #[test]
    fn test_unknown_type_fails() {
        let entry = Entry::new(EntryType::Other("dataset".to_string()), "d");
        let none: &[Entry] = &[];
        assert_eq!(
            entry.check(none),
            vec![ValidationError::UnknownType("dataset".to_string())]
        );
    }

    #[test]
    fn test_inherited_fields_count() {
        let mut proc = Entry::new(EntryType::Proceedings, "p");
        proc.set_field("title", "Proceedings").unwrap();
        proc.set_field("year", 2021u64).unwrap();
        let mut paper = Entry::new(EntryType::InProceedings, "x");
        paper.set_field("author", "A. Author").unwrap();
        paper.set_field("title", "Paper").unwrap();
        paper.set_field("crossref", "p").unwrap();
        paper.set_crossref_link(Some("p".to_string()));

        let entries = vec![proc, paper.clone()];
        assert!(paper.validate(&entries));
    }

    #[test]
    fn test_messages_are_not_refreshed_by_mutation() {
        let mut entry = Entry::new(EntryType::Unpublished, "u");
        let none: &[Entry] = &[];
        assert!(!entry.validate(none));
        entry.set_field("author", "A").unwrap();
        entry.set_field("title", "T").unwrap();
        entry.set_field("year", 2000u64).unwrap();
        assert_eq!(entry.validation_messages().len(), 3);
        assert!(entry.validate(none));
    }
}
