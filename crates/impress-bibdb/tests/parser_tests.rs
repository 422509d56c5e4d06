//! Parser and formatter integration tests

mod common;

use common::fixtures::load_bibtex_fixture;
use impress_bibdb::{
    format_entry, Entry, EntryType, FieldValue, FormatOptions, ParseError, Parser,
};
use proptest::prelude::*;

fn fields(entry: &Entry) -> Vec<(String, FieldValue)> {
    entry
        .fields()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

// === Fixture Parsing ===

#[test]
fn test_parse_library_fixture() {
    let input = load_bibtex_fixture("library.bib");
    let entries: Vec<Entry> = Parser::new(&input).collect();

    assert_eq!(entries.len(), 8);
    assert!(entries.iter().all(Entry::is_ok));
    assert_eq!(entries[0].entry_type(), &EntryType::Comment);
    assert_eq!(entries[1].entry_type(), &EntryType::Preamble);
    assert_eq!(entries[1].raw(), r#"@preamble{ "\newcommand{\noopsort}[1]{}" }"#);

    let knuth = &entries[2];
    assert_eq!(knuth.key(), Some("knuth1997"));
    assert_eq!(knuth.line(), 10);
    assert_eq!(knuth.field_str("publisher"), Some("Addison-Wesley"));
    assert_eq!(knuth.field("volume"), Some(&FieldValue::Number("1".into())));
}

#[test]
fn test_field_names_and_types_are_lowercased() {
    let input = load_bibtex_fixture("library.bib");
    let entries: Vec<Entry> = Parser::new(&input).collect();
    let einstein = entries
        .iter()
        .find(|e| e.key() == Some("Einstein1905"))
        .unwrap();

    assert_eq!(einstein.entry_type(), &EntryType::Article);
    assert_eq!(einstein.field_str("doi"), Some("10.1002/andp.19053221004"));
    assert_eq!(einstein.field("number"), Some(&FieldValue::Text("10".into())));
    assert_eq!(einstein.field("year"), Some(&FieldValue::Number("1905".into())));
    // No predefined macros in a bare parser
    assert_eq!(einstein.field_str("month"), Some("jun"));
}

#[test]
fn test_concatenated_macro_value() {
    let input = load_bibtex_fixture("library.bib");
    let entries: Vec<Entry> = Parser::new(&input).collect();
    let hubble = entries.iter().find(|e| e.key() == Some("hubble1929")).unwrap();
    assert_eq!(
        hubble.field_str("journal"),
        Some("The Astrophysical Journal (Proceedings)")
    );
}

#[test]
fn test_macro_defined_before_use() {
    let input = "@string{me = \"ME\"}\n@misc{k, field = me # \"-more\"}";
    let entries: Vec<Entry> = Parser::new(input).collect();
    let source: &[Entry] = &entries;
    assert_eq!(entries[0].resolve_str("field", source), Some("ME-more"));
}

// === Round Trip ===

#[test]
fn test_round_trip_preserves_fields() {
    let input = load_bibtex_fixture("library.bib");
    let options = FormatOptions::default();

    for entry in Parser::new(&input).filter(|e| e.key().is_some()) {
        let text = format_entry(&entry, &options);
        let reparsed: Vec<Entry> = Parser::new(&text).collect();

        assert_eq!(reparsed.len(), 1, "{}", text);
        assert!(reparsed[0].is_ok());
        assert_eq!(reparsed[0].key(), entry.key());
        assert_eq!(reparsed[0].entry_type(), entry.entry_type());
        assert_eq!(fields(&reparsed[0]), fields(&entry));
    }
}

#[test]
fn test_formatting_is_idempotent() {
    let input = load_bibtex_fixture("library.bib");
    let options = FormatOptions::default();

    for entry in Parser::new(&input) {
        let once = format_entry(&entry, &options);
        assert_eq!(once, format_entry(&entry, &options));

        let reparsed = Parser::new(&once).next().unwrap();
        assert_eq!(format_entry(&reparsed, &options), once);
    }
}

#[test]
fn test_preferred_field_order() {
    let input = "@article{k, zeta = {z}, year = 2000, doi = {10.1/x}, title = {T}, author = {A}, abstract = {B}}";
    let entry = Parser::new(input).next().unwrap();
    let text = format_entry(&entry, &FormatOptions::default());
    let names: Vec<&str> = text
        .lines()
        .skip(1)
        .filter_map(|line| line.trim().split(' ').next())
        .filter(|name| *name != "}")
        .collect();
    assert_eq!(names, vec!["author", "title", "year", "abstract", "doi", "zeta"]);
}

// === Errors ===

#[test]
fn test_error_lines_and_recovery() {
    let input = load_bibtex_fixture("broken.bib");
    let entries: Vec<Entry> = Parser::new(&input).collect();

    assert!(entries[0].is_ok());
    let bad = &entries[1];
    assert_eq!(bad.key(), Some("bad"));
    assert_eq!(bad.line(), 3);
    assert!(matches!(bad.error(), Some(ParseError::Lexical { line: 4, .. })));
    assert!(bad.error().unwrap().message().contains("unterminated"));
}

#[test]
fn test_stream_continues_after_structural_error() {
    let input = "@misc{a title = {x}}\n@misc{b, title = {y}}\n";
    let entries: Vec<Entry> = Parser::new(input).collect();
    assert_eq!(entries.len(), 2);
    assert!(matches!(entries[0].error(), Some(ParseError::Structural { .. })));
    assert!(entries[1].is_ok());
}

// === Property-Based Tests ===

proptest! {
    #[test]
    fn test_parser_never_panics(input in "[@{}()=,#\"a-z0-9 \\n\\\\]{0,80}") {
        let count = Parser::new(&input).count();
        prop_assert!(count <= input.matches('@').count());
    }

    #[test]
    fn test_plain_values_survive_formatting(value in "[A-Za-z0-9 .,:-]{1,30}") {
        let mut entry = Entry::new(EntryType::Misc, "k");
        entry.set_field("note", value.as_str()).unwrap();
        let text = format_entry(&entry, &FormatOptions::default());
        let reparsed = Parser::new(&text).next().unwrap();
        prop_assert_eq!(reparsed.field_str("note"), Some(value.as_str()));
    }
}
