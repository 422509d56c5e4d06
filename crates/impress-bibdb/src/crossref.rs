//! Cross-reference field inheritance
//!
//! A child entry names its parent through the `crossref` field. The link is
//! stored as the parent's key and looked up through an [`EntrySource`] (the
//! owning collection), so entries never own each other.
//!
//! Which parent field feeds which child field is decided by a static table
//! keyed by (parent type, child type). Rows may use `*` for either side; the
//! most specific row that mentions the field wins.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::entry::{Entry, EntryType, FieldValue};

/// Longest crossref chain followed before giving up. Also stops cycles.
pub const MAX_CROSSREF_DEPTH: usize = 8;

/// Key-based access to the entries a crossref may point at
pub trait EntrySource {
    fn lookup(&self, key: &str) -> Option<&Entry>;
}

impl EntrySource for [Entry] {
    fn lookup(&self, key: &str) -> Option<&Entry> {
        self.iter().find(|entry| entry.key() == Some(key))
    }
}

impl EntrySource for Vec<Entry> {
    fn lookup(&self, key: &str) -> Option<&Entry> {
        self.as_slice().lookup(key)
    }
}

impl EntrySource for HashMap<String, Entry> {
    fn lookup(&self, key: &str) -> Option<&Entry> {
        self.get(key)
    }
}

type FieldMap = HashMap<&'static str, &'static str>;

const WILDCARD: &str = "*";

/// (parents, children, [(child field, parent field)])
type Rule = (&'static [&'static str], &'static [&'static str], &'static [(&'static str, &'static str)]);

const MAIN_TITLES: &[(&str, &str)] = &[
    ("maintitle", "title"),
    ("mainsubtitle", "subtitle"),
    ("maintitleaddon", "titleaddon"),
];

const BOOK_TITLES: &[(&str, &str)] = &[
    ("booktitle", "title"),
    ("booksubtitle", "subtitle"),
    ("booktitleaddon", "titleaddon"),
];

const RULES: &[Rule] = &[
    (
        &["mvbook", "book"],
        &["inbook", "bookinbook", "suppbook"],
        &[("author", "author"), ("bookauthor", "author")],
    ),
    (
        &["mvbook"],
        &["book", "inbook", "bookinbook", "suppbook"],
        MAIN_TITLES,
    ),
    (
        &["mvcollection", "mvreference"],
        &[
            "collection",
            "reference",
            "incollection",
            "inreference",
            "suppcollection",
        ],
        MAIN_TITLES,
    ),
    (&["mvproceedings"], &["proceedings", "inproceedings"], MAIN_TITLES),
    (&["book"], &["inbook", "bookinbook", "suppbook"], BOOK_TITLES),
    (
        &["collection", "reference"],
        &["incollection", "inreference", "suppcollection"],
        BOOK_TITLES,
    ),
    (&["proceedings"], &["inproceedings"], BOOK_TITLES),
    (
        &["periodical"],
        &["article", "suppperiodical"],
        &[
            ("journaltitle", "title"),
            ("journal", "title"),
            ("journalsubtitle", "subtitle"),
        ],
    ),
    (
        &[WILDCARD],
        &[WILDCARD],
        &[
            ("editor", "editor"),
            ("editora", "editora"),
            ("editorb", "editorb"),
            ("editorc", "editorc"),
            ("translator", "translator"),
            ("publisher", "publisher"),
            ("organization", "organization"),
            ("institution", "institution"),
            ("school", "school"),
            ("location", "location"),
            ("address", "address"),
            ("year", "year"),
            ("date", "date"),
            ("month", "month"),
            ("edition", "edition"),
            ("series", "series"),
            ("volume", "volume"),
            ("volumes", "volumes"),
            ("isbn", "isbn"),
            ("issn", "issn"),
            ("language", "language"),
            ("langid", "langid"),
            ("eventtitle", "eventtitle"),
            ("eventdate", "eventdate"),
            ("venue", "venue"),
        ],
    ),
];

lazy_static! {
    /// parent type -> child type -> child field -> parent field
    static ref INHERITANCE: HashMap<&'static str, HashMap<&'static str, FieldMap>> = {
        let mut table: HashMap<&'static str, HashMap<&'static str, FieldMap>> = HashMap::new();
        for (parents, children, fields) in RULES {
            for parent in *parents {
                for child in *children {
                    let map = table.entry(*parent).or_default().entry(*child).or_default();
                    for (child_field, parent_field) in *fields {
                        map.insert(*child_field, *parent_field);
                    }
                }
            }
        }
        table
    };
}

/// Parent field that a child field inherits from, if any
pub fn inherited_field(
    parent: &EntryType,
    child: &EntryType,
    field: &str,
) -> Option<&'static str> {
    let (parent, child) = (parent.as_str(), child.as_str());
    [
        (parent, child),
        (parent, WILDCARD),
        (WILDCARD, child),
        (WILDCARD, WILDCARD),
    ]
    .iter()
    .find_map(|(p, c)| INHERITANCE.get(*p)?.get(*c)?.get(field).copied())
}

impl Entry {
    /// Look up a field, falling back to the crossref parent.
    ///
    /// A field stored on the entry always wins. Otherwise, if the link pass
    /// connected this entry to a parent, the inheritance table decides which
    /// parent field to read, recursively.
    pub fn resolve<'a, S: EntrySource + ?Sized>(
        &'a self,
        field: &str,
        source: &'a S,
    ) -> Option<&'a FieldValue> {
        self.resolve_at_depth(&field.to_lowercase(), source, 0)
    }

    /// Resolved field as text
    pub fn resolve_str<'a, S: EntrySource + ?Sized>(
        &'a self,
        field: &str,
        source: &'a S,
    ) -> Option<&'a str> {
        self.resolve(field, source).map(FieldValue::as_str)
    }

    fn resolve_at_depth<'a, S: EntrySource + ?Sized>(
        &'a self,
        field: &str,
        source: &'a S,
        depth: usize,
    ) -> Option<&'a FieldValue> {
        if let Some(value) = self.field(field) {
            return Some(value);
        }

        let parent_key = self.crossref_link()?;
        if depth >= MAX_CROSSREF_DEPTH {
            tracing::warn!(
                "crossref chain from {:?} exceeds {} links, stopping at {}",
                self.key(),
                MAX_CROSSREF_DEPTH,
                parent_key
            );
            return None;
        }

        let parent = source.lookup(parent_key)?;
        let parent_field = inherited_field(parent.entry_type(), self.entry_type(), field)?;
        parent.resolve_at_depth(parent_field, source, depth + 1)
    }
}
