//! BibTeX/BibLaTeX record store
//!
//! Reads bibliography files into entries that can be edited and written
//! back without losing what the file said.
//!
//! Features:
//! - Nom-based parser with `@string` macros, `#` concatenation and
//!   verbatim `@comment`/`@preamble` blocks
//! - Per-entry parse errors with source lines; the stream never aborts
//! - Crossref field inheritance driven by a static BibLaTeX table
//! - Personal name segmentation (first, von, last, jr)
//! - Mandatory-field validation
//! - Formatting with a stable field order and modification timestamps
//!
//! ```
//! use impress_bibdb::{BibConfig, Database};
//!
//! let db = Database::parse(
//!     "@string{me = \"ME\"}\n@misc{k, author = {von Neumann, John}, note = me # \"-more\"}",
//!     &BibConfig::default(),
//! );
//! assert!(db.is_ok());
//! assert_eq!(db.resolve("k", "note").unwrap().as_str(), "ME-more");
//!
//! let authors = db.get("k").unwrap().authors(&db);
//! assert_eq!(authors[0].von(), Some("von"));
//! ```

pub mod config;
pub mod crossref;
pub mod database;
pub mod entry;
pub mod error;
pub mod file_link;
pub mod formatter;
pub mod latex;
pub mod macros;
pub mod names;
pub mod parser;
pub mod splitter;
pub mod validate;

pub use config::{BibConfig, ParseConfig};
pub use crossref::{inherited_field, EntrySource, MAX_CROSSREF_DEPTH};
pub use database::Database;
pub use entry::{Entry, EntryType, FieldValue};
pub use error::{
    ConfigError, DatabaseError, FieldError, ParseError, Result, SplitError, ValidationError,
};
pub use file_link::FileLink;
pub use formatter::{format_entries, format_entry, format_macros, FormatOptions};
pub use latex::to_plain_text;
pub use macros::MacroTable;
pub use names::{split_name, split_names, PersonName};
pub use parser::Parser;
pub use validate::mandatory_fields;
