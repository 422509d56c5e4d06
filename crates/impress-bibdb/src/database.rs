//! In-memory record store
//!
//! A [`Database`] owns the entries of one file in source order, indexed by
//! key. Loading stops at the first block that fails to parse or repeats a
//! key; everything read before it is kept and the error is recorded.
//! Crossref links are set in a second pass so a child may precede its
//! parent.

use std::collections::HashMap;
use std::path::Path;

use chrono::{Local, NaiveDate};

use crate::config::BibConfig;
use crate::crossref::EntrySource;
use crate::entry::{Entry, FieldValue};
use crate::error::{DatabaseError, Result};
use crate::formatter::{format_entry, format_string_definition, FormatOptions};
use crate::macros::MacroTable;
use crate::parser::Parser;

/// Output of one rendering pass, applied by [`Database::commit`]
struct Rendered {
    text: String,
    date: String,
    /// Index and written text of each modified entry
    saved: Vec<(usize, String)>,
}

/// Entries of one bibliography, in source order
#[derive(Debug, Default)]
pub struct Database {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
    macros: MacroTable,
    preset: MacroTable,
    format: FormatOptions,
    error: Option<DatabaseError>,
    warnings: Vec<String>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty database using the given output settings
    pub fn with_config(config: &BibConfig) -> Self {
        let preset = config.parse.initial_macros();
        Self {
            macros: preset.clone(),
            preset,
            format: config.format.clone(),
            ..Self::default()
        }
    }

    /// Read BibTeX text.
    ///
    /// Never fails as a whole: check [`Database::is_ok`] and
    /// [`Database::error`] for the block that stopped the load.
    pub fn parse(text: &str, config: &BibConfig) -> Self {
        let mut db = Self::with_config(config);
        let mut parser = Parser::with_macros(text, config.parse.initial_macros());

        for entry in parser.by_ref() {
            if let Some(error) = entry.error() {
                tracing::warn!("stopping load at line {}: {}", entry.line(), error);
                db.error = Some(DatabaseError::Parse(error.clone()));
                break;
            }
            if let Err(err) = db.insert(entry) {
                tracing::warn!("stopping load: {}", err);
                db.error = Some(err);
                break;
            }
        }

        db.macros = parser.into_macros();
        db.warnings = db.link_crossrefs();
        db
    }

    /// Read a file
    pub fn open(path: &Path, config: &BibConfig) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let db = Self::parse(&text, config);
        tracing::info!("loaded {} entries from {}", db.len(), path.display());
        Ok(db)
    }

    /// Write every entry back to a file, stamping modified entries.
    ///
    /// Entries are only stamped and marked saved once the write succeeded.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        let rendered = self.render(Local::now().date_naive());
        std::fs::write(path, &rendered.text)?;
        let text = self.commit(rendered);
        tracing::info!(
            "saved {} entries ({} bytes) to {}",
            self.len(),
            text.len(),
            path.display()
        );
        Ok(())
    }

    /// Whether the whole input was loaded
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// What stopped the load, if anything
    pub fn error(&self) -> Option<&DatabaseError> {
        self.error.as_ref()
    }

    /// Non-fatal problems found while linking crossrefs
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Macro table after the load
    pub fn macros(&self) -> &MacroTable {
        &self.macros
    }

    /// Add an entry at the end. Keys must be unique; pseudo-entries have
    /// none. Call [`Database::link_crossrefs`] once inserting is done.
    pub fn insert(&mut self, entry: Entry) -> Result<()> {
        if let Some(key) = entry.key() {
            if self.index.contains_key(key) {
                return Err(DatabaseError::DuplicateKey {
                    key: key.to_string(),
                    line: entry.line(),
                });
            }
            self.index.insert(key.to_string(), self.entries.len());
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.index.get(key).map(|&idx| &self.entries[idx])
    }

    /// Mutable access to an entry. Changing its `crossref` field unlinks it;
    /// run [`Database::link_crossrefs`] to link the new target.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Entry> {
        let idx = *self.index.get(key)?;
        self.entries.get_mut(idx)
    }

    /// Remove an entry by key; children pointing at it lose their link
    pub fn remove(&mut self, key: &str) -> Option<Entry> {
        let idx = self.index.remove(key)?;
        let entry = self.entries.remove(idx);
        self.reindex();
        self.warnings = self.link_crossrefs();
        Some(entry)
    }

    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(idx, entry)| entry.key().map(|key| (key.to_string(), idx)))
            .collect();
    }

    /// All entries, pseudo-entries included, in source order
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Entries that carry a key
    pub fn records(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|entry| entry.key().is_some())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Connect every `crossref` field to its target entry.
    ///
    /// Returns one warning per target that does not exist; such entries
    /// are left unlinked.
    pub fn link_crossrefs(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();
        let links: Vec<Option<String>> = self
            .entries
            .iter()
            .map(|entry| {
                let target = entry.crossref()?;
                if self.index.contains_key(target) {
                    Some(target.to_string())
                } else {
                    let message = format!(
                        "entry `{}`: crossref target `{}` not found",
                        entry.key().unwrap_or_default(),
                        target
                    );
                    tracing::warn!("{}", message);
                    warnings.push(message);
                    None
                }
            })
            .collect();

        for (entry, link) in self.entries.iter_mut().zip(links) {
            entry.set_crossref_link(link);
        }
        warnings
    }

    /// Field of an entry, following crossrefs
    pub fn resolve(&self, key: &str, field: &str) -> Option<&FieldValue> {
        self.get(key)?.resolve(field, self)
    }

    /// Validate every keyed entry, caching the messages on each.
    /// Returns the number of invalid entries.
    pub fn validate_all(&mut self) -> usize {
        let db: &Database = self;
        let results: Vec<Option<Vec<String>>> = db
            .entries
            .iter()
            .map(|entry| {
                entry.key()?;
                Some(entry.check(db).iter().map(ToString::to_string).collect())
            })
            .collect();

        let mut invalid = 0;
        for (entry, messages) in self.entries.iter_mut().zip(results) {
            if let Some(messages) = messages {
                if !messages.is_empty() {
                    invalid += 1;
                }
                entry.set_validation_messages(messages);
            }
        }
        invalid
    }

    /// Keyed entries ordered by sort key, then key
    pub fn sorted(&self) -> Vec<&Entry> {
        let mut entries: Vec<&Entry> = self.records().collect();
        entries.sort_by(|a, b| {
            a.sort_key(self)
                .cmp(b.sort_key(self))
                .then_with(|| a.key().cmp(&b.key()))
        });
        entries
    }

    /// Render the whole database, stamping modified entries with today's date
    pub fn to_bibtex(&mut self) -> String {
        self.to_bibtex_at(Local::now().date_naive())
    }

    /// Render the whole database, stamping modified entries with `date`.
    ///
    /// `@string` definitions come first (only those the input defined),
    /// then every entry in sequence order.
    pub fn to_bibtex_at(&mut self, date: NaiveDate) -> String {
        let rendered = self.render(date);
        self.commit(rendered)
    }

    /// Output text with modified entries stamped on copies; the database
    /// itself is left untouched.
    fn render(&self, date: NaiveDate) -> Rendered {
        let date = date.format("%Y-%m-%d").to_string();
        let mut blocks: Vec<String> = Vec::new();
        let mut saved = Vec::new();

        let definitions: Vec<String> = self
            .macros
            .iter()
            .filter(|(name, value)| self.preset.get(name) != Some(*value))
            .map(|(name, value)| format_string_definition(name, value))
            .collect();
        if !definitions.is_empty() {
            blocks.push(definitions.join("\n"));
        }

        for (idx, entry) in self.entries.iter().enumerate() {
            if !entry.is_modified() {
                blocks.push(format_entry(entry, &self.format));
                continue;
            }
            let mut stamped = entry.clone();
            if let Some(field) = &self.format.timestamp_field {
                stamped.touch(field, &date);
            }
            let text = format_entry(&stamped, &self.format);
            saved.push((idx, text.clone()));
            blocks.push(text);
        }

        let mut text = blocks.join("\n\n");
        text.push('\n');
        Rendered { text, date, saved }
    }

    /// Apply the stamps of a rendering and mark those entries saved
    fn commit(&mut self, rendered: Rendered) -> String {
        for (idx, raw) in rendered.saved {
            let entry = &mut self.entries[idx];
            if let Some(field) = &self.format.timestamp_field {
                entry.touch(field, &rendered.date);
            }
            entry.mark_saved(raw);
        }
        rendered.text
    }

    /// Render the keyed entries in sort order, without stamping
    pub fn to_bibtex_sorted(&self) -> String {
        let mut output = self
            .sorted()
            .into_iter()
            .map(|entry| format_entry(entry, &self.format))
            .collect::<Vec<_>>()
            .join("\n\n");
        output.push('\n');
        output
    }
}

impl EntrySource for Database {
    fn lookup(&self, key: &str) -> Option<&Entry> {
        self.get(key)
    }
}
