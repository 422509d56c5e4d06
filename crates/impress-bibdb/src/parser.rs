//! BibTeX parser
//!
//! A [`Parser`] is one parse session: it owns the `@string` macro table and
//! yields one [`Entry`] per `@` block, in source order.
//!
//! This parser handles:
//! - `@string` definitions (no entry is produced)
//! - `@comment` and `@preamble` blocks, kept byte-for-byte
//! - all entry types, delimited by `{...}` or `(...)`
//! - braced, quoted, numeric and macro values joined with `#`
//!
//! A block that cannot be read still yields an entry, with
//! [`Entry::is_ok`] false and the error attached. The parser then resumes
//! at the next `@`.

use nom::{
    bytes::complete::take_while1,
    character::complete::{digit1, multispace0},
    IResult,
};

use crate::entry::{is_field_name_char, Entry, EntryType, FieldValue};
use crate::error::ParseError;
use crate::macros::MacroTable;
use crate::splitter::closing_brace;

/// Where and why a block failed, plus whatever was read before it
struct Failure<'a> {
    at: &'a str,
    lexical: bool,
    message: String,
    entry_type: Option<EntryType>,
    key: Option<String>,
}

impl<'a> Failure<'a> {
    fn structural(at: &'a str, message: impl Into<String>) -> Self {
        Self {
            at,
            lexical: false,
            message: message.into(),
            entry_type: None,
            key: None,
        }
    }

    fn lexical(at: &'a str, message: impl Into<String>) -> Self {
        Self {
            lexical: true,
            ..Self::structural(at, message)
        }
    }
}

type Step<'a, T> = Result<(&'a str, T), Failure<'a>>;

/// Result of reading one `@` block
enum Block {
    Entry(Entry),
    Verbatim(EntryType),
    Macro(String, String),
}

/// One value piece between `#` operators
enum Piece<'a> {
    Text(String),
    Number(&'a str),
}

fn ws(input: &str) -> &str {
    multispace0::<_, nom::error::Error<&str>>(input)
        .map(|(rest, _)| rest)
        .unwrap_or(input)
}

fn type_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-')(input)
}

fn cite_key(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_whitespace() && !",{}()=\"#".contains(c))(input)
}

fn field_name(input: &str) -> IResult<&str, &str> {
    take_while1(is_field_name_char)(input)
}

fn macro_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_whitespace() && !"\"#%'(),={}".contains(c))(input)
}

/// Byte offset of the `)` closing a block opened with `(`
fn closing_paren(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, b) in text.bytes().enumerate().skip(1) {
        match b {
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b')' if depth == 0 => return Some(idx),
            _ => {}
        }
    }
    None
}

fn open_delimiter(input: &str) -> Step<'_, char> {
    match input.chars().next() {
        Some('{') => Ok((&input[1..], '}')),
        Some('(') => Ok((&input[1..], ')')),
        _ => Err(Failure::structural(
            input,
            "expected `{` or `(` after entry type",
        )),
    }
}

fn expect_char<'a>(input: &'a str, expected: char, message: impl Into<String>) -> Step<'a, ()> {
    match input.strip_prefix(expected) {
        Some(rest) => Ok((rest, ())),
        None => Err(Failure::structural(input, message)),
    }
}

/// BibTeX parse session
pub struct Parser<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    counted: usize,
    macros: MacroTable,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Self::with_macros(input, MacroTable::new())
    }

    /// Start a session with predefined macros
    pub fn with_macros(input: &'a str, macros: MacroTable) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            counted: 0,
            macros,
        }
    }

    /// Macros defined so far in this session
    pub fn macros(&self) -> &MacroTable {
        &self.macros
    }

    pub fn into_macros(self) -> MacroTable {
        self.macros
    }

    fn offset(&self, rest: &str) -> usize {
        self.input.len() - rest.len()
    }

    /// 1-based line of a byte offset. Offsets are requested in increasing
    /// order, so lines are counted incrementally.
    fn line_at(&mut self, offset: usize) -> usize {
        if offset < self.counted {
            return 1 + self.input[..offset].matches('\n').count();
        }
        self.line += self.input[self.counted..offset].matches('\n').count();
        self.counted = offset;
        self.line
    }

    fn read_block(&self, block: &'a str) -> Step<'a, Block> {
        let rest = ws(&block[1..]);
        let (rest, name) = type_name(rest)
            .map_err(|_| Failure::structural(rest, "expected entry type after `@`"))?;
        let entry_type = EntryType::from_str(name);
        let rest = ws(rest);

        let result = match entry_type {
            EntryType::Comment | EntryType::Preamble => {
                Self::read_verbatim(rest).map(|(rest, ())| (rest, Block::Verbatim(entry_type.clone())))
            }
            EntryType::Macro => self.read_macro(rest),
            _ => self.read_entry(rest, entry_type.clone()),
        };

        result.map_err(|mut failure| {
            failure.entry_type = Some(entry_type);
            failure
        })
    }

    /// Skip a comment or preamble body, matching outer delimiters only
    fn read_verbatim(rest: &'a str) -> Step<'a, ()> {
        let end = match rest.chars().next() {
            Some('{') => closing_brace(rest),
            Some('(') => closing_paren(rest),
            _ => {
                // Undelimited `@comment`: runs to the end of the line
                let end = rest.find('\n').unwrap_or(rest.len());
                return Ok((&rest[end..], ()));
            }
        };
        match end {
            Some(end) => Ok((&rest[end + 1..], ())),
            None => Err(Failure::structural(
                &rest[rest.len()..],
                "missing closing brace for block",
            )),
        }
    }

    fn read_macro(&self, rest: &'a str) -> Step<'a, Block> {
        let (rest, close) = open_delimiter(rest)?;
        let rest = ws(rest);
        let (rest, name) = macro_name(rest)
            .map_err(|_| Failure::structural(rest, "expected macro name in @string"))?;
        let rest = ws(rest);
        let (rest, ()) = expect_char(rest, '=', format!("missing `=` after macro `{name}`"))?;
        let (rest, value) = self.read_value(rest, name)?;
        let rest = ws(rest);
        let (rest, ()) = expect_char(rest, close, format!("missing closing `{close}` for @string"))?;
        Ok((rest, Block::Macro(name.to_string(), value.as_str().to_string())))
    }

    fn read_entry(&self, rest: &'a str, entry_type: EntryType) -> Step<'a, Block> {
        let (rest, close) = open_delimiter(rest)?;
        let rest = ws(rest);
        let (after_key, key) =
            cite_key(rest).map_err(|_| Failure::structural(rest, "missing entry key"))?;
        let after_key = ws(after_key);
        if after_key.starts_with('=') {
            return Err(Failure::structural(rest, "missing entry key"));
        }

        let mut entry = Entry::new(entry_type, key);
        self.read_fields(after_key, &mut entry, close)
            .map(|(rest, ())| (rest, Block::Entry(entry)))
            .map_err(|mut failure| {
                failure.key = Some(key.to_string());
                failure
            })
    }

    fn read_fields(&self, mut rest: &'a str, entry: &mut Entry, close: char) -> Step<'a, ()> {
        let missing_close = || format!("missing closing `{close}` for entry");

        match rest.chars().next() {
            Some(',') => rest = &rest[1..],
            Some(c) if c == close => return Ok((&rest[1..], ())),
            None | Some('@') => return Err(Failure::structural(rest, missing_close())),
            _ => return Err(Failure::structural(rest, "expected `,` after entry key")),
        }

        loop {
            rest = ws(rest);
            match rest.chars().next() {
                Some(c) if c == close => return Ok((&rest[1..], ())),
                None | Some('@') => return Err(Failure::structural(rest, missing_close())),
                _ => {}
            }

            let (after, name) =
                field_name(rest).map_err(|_| Failure::structural(rest, "expected field name"))?;
            let after = ws(after);
            let (after, ()) = expect_char(after, '=', format!("missing `=` after field `{name}`"))?;
            let (after, value) = self.read_value(after, name)?;
            if entry.insert_parsed(name, value).is_some() {
                tracing::warn!(
                    "field `{}` repeated in entry {:?}, keeping the last value",
                    name,
                    entry.key()
                );
            }

            let after = ws(after);
            match after.chars().next() {
                Some(',') => rest = &after[1..],
                Some(c) if c == close => return Ok((&after[1..], ())),
                None | Some('@') => return Err(Failure::structural(after, missing_close())),
                _ => {
                    return Err(Failure::structural(
                        after,
                        format!("expected `,` or `{close}` after field `{name}`"),
                    ))
                }
            }
        }
    }

    /// Read a `#`-joined value expression
    fn read_value(&self, rest: &'a str, field: &str) -> Step<'a, FieldValue> {
        let mut rest = ws(rest);
        let mut text = String::new();
        let mut pieces = 0;
        let mut number = None;

        loop {
            let (after, piece) = self.read_piece(rest, field)?;
            pieces += 1;
            match piece {
                Piece::Text(s) => text.push_str(&s),
                Piece::Number(n) => {
                    text.push_str(n);
                    number = Some(n);
                }
            }

            let next = ws(after);
            match next.strip_prefix('#') {
                Some(more) => rest = ws(more),
                None => {
                    let value = match number {
                        Some(n) if pieces == 1 => {
                            FieldValue::parse_number(n).unwrap_or(FieldValue::Text(text))
                        }
                        _ => FieldValue::Text(text),
                    };
                    return Ok((after, value));
                }
            }
        }
    }

    fn read_piece(&self, rest: &'a str, field: &str) -> Step<'a, Piece<'a>> {
        match rest.chars().next() {
            Some('{') => match closing_brace(rest) {
                Some(end) => Ok((&rest[end + 1..], Piece::Text(rest[1..end].to_string()))),
                None => Err(Failure::lexical(
                    rest,
                    format!("unbalanced braces in value of field `{field}`"),
                )),
            },
            Some('"') => Self::read_quoted(rest, field),
            Some(c) if c.is_ascii_digit() => {
                let (after, digits) = digit1::<_, nom::error::Error<&str>>(rest)
                    .map_err(|_| Failure::structural(rest, "expected number"))?;
                match FieldValue::parse_number(digits) {
                    Some(_) => Ok((after, Piece::Number(digits))),
                    None => Ok((after, Piece::Text(digits.to_string()))),
                }
            }
            _ => match macro_name(rest) {
                Ok((after, name)) => {
                    if !self.macros.contains(name) {
                        tracing::debug!("macro `{}` is not defined, keeping it literally", name);
                    }
                    Ok((after, Piece::Text(self.macros.expand(name).to_string())))
                }
                Err(_) => Err(Failure::structural(
                    rest,
                    format!("missing value for field `{field}`"),
                )),
            },
        }
    }

    /// `"..."`; quotes inside braces do not terminate the value, and a
    /// backslash escapes neither quotes nor braces
    fn read_quoted(rest: &'a str, field: &str) -> Step<'a, Piece<'a>> {
        let mut depth = 0usize;

        for (pos, b) in rest.bytes().enumerate().skip(1) {
            match b {
                b'{' => depth += 1,
                b'}' => {
                    depth = depth.checked_sub(1).ok_or_else(|| {
                        Failure::lexical(rest, format!("unbalanced braces in value of field `{field}`"))
                    })?;
                }
                b'"' if depth == 0 => {
                    return Ok((&rest[pos + 1..], Piece::Text(rest[1..pos].to_string())));
                }
                _ => {}
            }
        }

        Err(Failure::lexical(
            rest,
            format!("unterminated quoted value for field `{field}`"),
        ))
    }
}

impl<'a> Iterator for Parser<'a> {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        let input = self.input;
        loop {
            let Some(found) = input[self.pos..].find('@') else {
                self.pos = input.len();
                return None;
            };
            let start = self.pos + found;
            let start_line = self.line_at(start);
            let block = &input[start..];

            match self.read_block(block) {
                Ok((rest, Block::Macro(name, value))) => {
                    tracing::debug!("line {}: @string {} defined", start_line, name);
                    self.macros.define(&name, value);
                    self.pos = self.offset(rest);
                }
                Ok((rest, Block::Verbatim(entry_type))) => {
                    let end = self.offset(rest);
                    self.pos = end;
                    return Some(Entry::verbatim(
                        entry_type,
                        &input[start..end],
                        start_line,
                    ));
                }
                Ok((rest, Block::Entry(entry))) => {
                    let end = self.offset(rest);
                    self.pos = end;
                    tracing::debug!("line {}: read entry {:?}", start_line, entry.key());
                    return Some(entry.with_source(&input[start..end], start_line));
                }
                Err(failure) => {
                    let failed_at = self.offset(failure.at);
                    let line = self.line_at(failed_at);
                    let error = if failure.lexical {
                        ParseError::lexical(line, failure.message)
                    } else {
                        ParseError::structural(line, failure.message)
                    };
                    tracing::debug!("failed to read block at line {}: {}", start_line, error);

                    self.pos = failed_at.max(start + 1);
                    return Some(Entry::failed(
                        failure.entry_type.unwrap_or(EntryType::Other(String::new())),
                        failure.key,
                        &input[start..self.pos],
                        start_line,
                        error,
                    ));
                }
            }
        }
    }
}
