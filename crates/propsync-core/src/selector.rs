//! CSS identifier escaping for field lookup
//!
//! Role identifiers are used verbatim as element ids, and ids such as
//! `7-unit` are not valid selector identifiers as written. [`Selector::id`]
//! escapes the identifier the way `CSS.escape` does; lookups match by
//! decoding the selector back to the raw id.

use std::fmt;

/// `#id` selector for a single element
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector(String);

impl Selector {
    /// Selector matching the element whose id is `ident`
    #[must_use]
    pub fn id(ident: &str) -> Self {
        Self(format!("#{}", escape_ident(ident)))
    }

    /// Selector text, e.g. `#\37 -unit`
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw id this selector targets, `None` if it is not an id selector
    #[must_use]
    pub fn target_id(&self) -> Option<String> {
        self.0.strip_prefix('#').map(unescape_ident)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Escape `ident` for use as a CSS identifier
#[must_use]
pub fn escape_ident(ident: &str) -> String {
    let chars: Vec<char> = ident.chars().collect();
    let mut out = String::with_capacity(ident.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        match c {
            '\0' => out.push('\u{FFFD}'),
            '\u{1}'..='\u{1F}' | '\u{7F}' => push_code_point(&mut out, c),
            '0'..='9' if i == 0 || (i == 1 && chars[0] == '-') => push_code_point(&mut out, c),
            '-' if i == 0 && chars.len() == 1 => out.push_str("\\-"),
            c if c >= '\u{80}' || c == '-' || c == '_' || c.is_ascii_alphanumeric() => out.push(c),
            c => {
                out.push('\\');
                out.push(c);
            }
        }
    }
    out
}

/// Decode CSS escapes back to the raw identifier
#[must_use]
pub fn unescape_ident(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let mut hex = String::new();
        while hex.len() < 6 {
            match chars.peek() {
                Some(h) if h.is_ascii_hexdigit() => {
                    hex.push(*h);
                    chars.next();
                }
                _ => break,
            }
        }
        if hex.is_empty() {
            out.push(chars.next().unwrap_or('\u{FFFD}'));
            continue;
        }
        // One whitespace terminates a hex escape
        if matches!(chars.peek(), Some(' ' | '\t' | '\n')) {
            chars.next();
        }
        let decoded = u32::from_str_radix(&hex, 16)
            .ok()
            .filter(|cp| *cp != 0)
            .and_then(char::from_u32)
            .unwrap_or('\u{FFFD}');
        out.push(decoded);
    }
    out
}

fn push_code_point(out: &mut String, c: char) {
    out.push_str(&format!("\\{:x} ", u32::from(c)));
}
