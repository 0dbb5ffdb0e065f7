//! Canonical plain-text form for corpus books.
//!
//! Every book is flattened into a single line: line breaks are treated as
//! ordinary whitespace, so paragraphs flow straight into each other while
//! typing. Smart punctuation is folded to its ASCII counterpart so every
//! character in the stream can be typed on a plain keyboard.

/// Books shorter than this (in characters, after normalization) are rejected.
pub const MIN_BOOK_CHARS: usize = 500;

fn is_zero_width(c: char) -> bool {
    matches!(c, '\u{200B}'..='\u{200D}' | '\u{2060}' | '\u{FEFF}')
}

fn fold_char(c: char) -> Option<&'static str> {
    let folded = match c {
        '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{00AB}' | '\u{00BB}' => "\"",
        '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' => "'",
        '\u{2010}'..='\u{2015}' | '\u{2212}' => "-",
        '\u{2026}' => "...",
        _ => return None,
    };
    Some(folded)
}

/// Normalizes raw book text.
///
/// CRLF, the Unicode space variants and every other whitespace run collapse to
/// a single ASCII space, zero-width characters disappear, and the result is
/// trimmed. Idempotent.
pub fn normalize_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;

    for c in raw.chars() {
        if is_zero_width(c) {
            continue;
        }
        // char::is_whitespace covers \r, \n, NBSP, the en/em space family,
        // U+202F, U+205F and U+3000
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }

        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;

        match fold_char(c) {
            Some(folded) => out.push_str(folded),
            None => out.push(c),
        }
    }

    out
}

/// Normalizes and enforces the minimum book length, returning the character
/// count on rejection.
pub fn normalize_book_text(raw: &str) -> Result<String, usize> {
    let text = normalize_text(raw);
    let len = text.chars().count();
    if len < MIN_BOOK_CHARS {
        return Err(len);
    }
    Ok(text)
}
