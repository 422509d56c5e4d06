//! Markup-to-plain-text conversion
//!
//! Turns a raw field value into plain Unicode text for sorting and cleaned
//! display. This is table-driven and deliberately shallow: accents, named
//! letters and symbols are mapped, every other control word is dropped
//! (its braced argument stays), and all unescaped braces are removed.
//!
//! Never used while parsing; raw values are stored untouched.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    /// Accent command -> combining mark
    static ref ACCENTS: HashMap<&'static str, char> = {
        let mut m = HashMap::new();
        m.insert("\"", '\u{0308}'); // diaeresis
        m.insert("'", '\u{0301}'); // acute
        m.insert("`", '\u{0300}'); // grave
        m.insert("^", '\u{0302}'); // circumflex
        m.insert("~", '\u{0303}'); // tilde
        m.insert("=", '\u{0304}'); // macron
        m.insert(".", '\u{0307}'); // dot above
        m.insert("u", '\u{0306}'); // breve
        m.insert("v", '\u{030C}'); // caron
        m.insert("H", '\u{030B}'); // double acute
        m.insert("r", '\u{030A}'); // ring
        m.insert("c", '\u{0327}'); // cedilla
        m.insert("k", '\u{0328}'); // ogonek
        m.insert("d", '\u{0323}'); // dot below
        m.insert("b", '\u{0331}'); // macron below
        m
    };

    /// Control words that stand for text
    static ref WORDS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        // Letters
        m.insert("ss", "ß");
        m.insert("SS", "SS");
        m.insert("aa", "å");
        m.insert("AA", "Å");
        m.insert("ae", "æ");
        m.insert("AE", "Æ");
        m.insert("oe", "œ");
        m.insert("OE", "Œ");
        m.insert("o", "ø");
        m.insert("O", "Ø");
        m.insert("l", "ł");
        m.insert("L", "Ł");
        m.insert("i", "ı");
        m.insert("j", "ȷ");

        // Text symbols
        m.insert("ldots", "…");
        m.insert("dots", "…");
        m.insert("textellipsis", "…");
        m.insert("textendash", "–");
        m.insert("textemdash", "—");
        m.insert("textquoteleft", "\u{2018}");
        m.insert("textquoteright", "\u{2019}");
        m.insert("copyright", "©");
        m.insert("textregistered", "®");
        m.insert("texttrademark", "™");
        m.insert("pounds", "£");
        m.insert("euro", "€");
        m.insert("S", "§");
        m.insert("P", "¶");
        m.insert("dag", "†");
        m.insert("ddag", "‡");
        m.insert("textbackslash", "\\");
        m.insert("textasciitilde", "~");

        // Greek letters
        m.insert("alpha", "α");
        m.insert("beta", "β");
        m.insert("gamma", "γ");
        m.insert("delta", "δ");
        m.insert("epsilon", "ε");
        m.insert("lambda", "λ");
        m.insert("mu", "μ");
        m.insert("pi", "π");
        m.insert("sigma", "σ");
        m.insert("omega", "ω");
        m.insert("Gamma", "Γ");
        m.insert("Delta", "Δ");
        m.insert("Sigma", "Σ");
        m.insert("Omega", "Ω");
        m
    };

    static ref ACCENT_COMMAND: Regex = Regex::new(
        r#"\\(["'`^~=.]|[uvHrckdb]\b)\s*(?:\{\s*(\\[ij]|[A-Za-z])\s*\}|(\\[ij]\b|[A-Za-z]))"#
    )
    .unwrap();

    static ref CONTROL_WORD: Regex = Regex::new(r"\\([A-Za-z]+)").unwrap();

    static ref CONTROL_SYMBOL: Regex = Regex::new(r"\\([&%$#_{}~^ ,;])").unwrap();

    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Convert a raw field value to plain text
pub fn to_plain_text(raw: &str) -> String {
    let text = ACCENT_COMMAND.replace_all(raw, |caps: &Captures| {
        let base = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map(|m| m.as_str())
            .unwrap_or_default();
        let base = match base {
            "\\i" => "i",
            "\\j" => "j",
            other => other,
        };
        match ACCENTS.get(caps[1].trim_end()) {
            Some(mark) => base.chars().chain(std::iter::once(*mark)).nfc().collect(),
            None => base.to_string(),
        }
    });

    let text = CONTROL_WORD.replace_all(&text, |caps: &Captures| {
        WORDS.get(&caps[1]).copied().unwrap_or_default().to_string()
    });

    let text = strip_markup(&text)
        .replace("---", "—")
        .replace("--", "–")
        .replace("``", "\u{201C}")
        .replace("''", "\u{201D}");

    let text = CONTROL_SYMBOL.replace_all(&text, |caps: &Captures| match &caps[1] {
        "," | ";" => " ".to_string(),
        symbol => symbol.to_string(),
    });

    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Drop unescaped braces and turn ties into spaces
fn strip_markup(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                result.push(c);
                if let Some(next) = chars.next() {
                    result.push(next);
                }
            }
            '{' | '}' => {}
            '~' => result.push(' '),
            _ => result.push(c),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accents() {
        assert_eq!(to_plain_text(r#"M\"uller"#), "Müller");
        assert_eq!(to_plain_text(r#"M{\"u}ller"#), "Müller");
        assert_eq!(to_plain_text(r#"caf\'{e}"#), "café");
        assert_eq!(to_plain_text(r#"gar\c con"#), "garçon");
        assert_eq!(to_plain_text(r#"\v{S}koda"#), "Škoda");
        assert_eq!(to_plain_text(r#"Garc\'{\i}a"#), "García");
    }

    #[test]
    fn test_named_letters_and_symbols() {
        assert_eq!(to_plain_text(r"Stra{\ss}e"), "Straße");
        assert_eq!(to_plain_text(r#"{\AA}ngstr{\"o}m"#), "Ångström");
        assert_eq!(to_plain_text(r"10\% off \& more"), "10% off & more");
        assert_eq!(to_plain_text(r"\alpha particles"), "α particles");
    }

    #[test]
    fn test_commands_and_braces_removed() {
        assert_eq!(to_plain_text(r"\emph{The} {DNA} Story"), "The DNA Story");
        assert_eq!(to_plain_text(r"\textbf{bold}~text"), "bold text");
        assert_eq!(to_plain_text(r"a \{literal\} brace"), "a {literal} brace");
    }

    #[test]
    fn test_dashes_and_whitespace() {
        assert_eq!(to_plain_text("pages 1--10"), "pages 1–10");
        assert_eq!(to_plain_text("the---as   usual\n"), "the—as usual");
    }
}
