//! Folding text down to what a limited font can draw.
//!
//! Drawing fonts are encoded with WinAnsi, so anything outside Latin-1 (and,
//! for the built-in Helvetica fallback, outside ASCII) must be replaced by
//! its closest equivalent before it reaches the page.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Target character repertoire for [`fold_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Charset {
    /// Printable ASCII only.
    Ascii,
    /// ISO-8859-1 printable range: ASCII plus U+00A1..=U+00FF.
    Latin1,
}

impl Charset {
    pub fn contains(&self, c: char) -> bool {
        match self {
            Charset::Ascii => c == ' ' || c.is_ascii_graphic(),
            Charset::Latin1 => {
                c == ' ' || c.is_ascii_graphic() || ('\u{00A1}'..='\u{00FF}').contains(&c)
            }
        }
    }
}

/// Replace every character outside `charset` with its closest equivalent.
///
/// Characters outside the charset first go through a substitution table
/// (typographic punctuation, ligatures, letters without a decomposition such
/// as `ß` or `ł`). Remaining characters
/// are NFKD-decomposed and stripped of combining marks; whatever still falls
/// outside the charset becomes `?`. Control and zero-width characters are
/// removed, other whitespace becomes a plain space.
pub fn fold_text(text: &str, charset: Charset) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        fold_char(c, charset, &mut out);
    }
    out
}

/// ASCII-fold `text`. Shorthand for `fold_text(text, Charset::Ascii)`.
pub fn to_ascii(text: &str) -> String {
    fold_text(text, Charset::Ascii)
}

fn fold_char(c: char, charset: Charset, out: &mut String) {
    if c.is_whitespace() && c != ' ' {
        out.push(' ');
        return;
    }
    if is_invisible(c) {
        return;
    }
    if charset.contains(c) {
        out.push(c);
        return;
    }
    if let Some(replacement) = substitute(c, charset) {
        out.push_str(replacement);
        return;
    }

    let mut produced = false;
    for d in c.to_string().nfkd() {
        if is_combining_mark(d) {
            continue;
        }
        if charset.contains(d) {
            out.push(d);
            produced = true;
        } else if let Some(replacement) = substitute(d, charset) {
            out.push_str(replacement);
            produced = true;
        } else if !d.is_control() {
            out.push('?');
            produced = true;
        }
    }
    if !produced && !is_combining_mark(c) {
        out.push('?');
    }
}

fn is_invisible(c: char) -> bool {
    c.is_control()
        || matches!(
            c,
            '\u{00AD}' | '\u{200B}'..='\u{200F}' | '\u{2060}' | '\u{FEFF}' | '\u{FE00}'..='\u{FE0F}'
        )
}

/// Characters NFKD cannot reduce, or reduces to something unhelpful.
fn substitute(c: char, charset: Charset) -> Option<&'static str> {
    let latin1 = charset == Charset::Latin1;
    let s = match c {
        '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' | '\u{02BC}' => "'",
        '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' => "\"",
        '\u{2010}'..='\u{2015}' | '\u{2212}' => "-",
        '\u{2026}' => "...",
        '\u{2022}' | '\u{2023}' | '\u{2043}' | '\u{25CF}' | '\u{25E6}' => "*",
        '\u{2039}' => "<",
        '\u{203A}' => ">",
        '\u{20AC}' => "EUR",
        '\u{20BA}' => "TL",
        '\u{2122}' => "TM",
        '\u{FB00}' => "ff",
        '\u{FB01}' => "fi",
        '\u{FB02}' => "fl",
        '\u{FB03}' => "ffi",
        '\u{FB04}' => "ffl",
        '\u{0131}' => "i",
        '\u{0141}' => "L",
        '\u{0142}' => "l",
        '\u{0110}' => "D",
        '\u{0111}' => "d",
        '\u{0152}' => "OE",
        '\u{0153}' => "oe",
        '\u{0192}' => "f",
        _ if latin1 => return None,
        // Below: Latin-1 letters that need a spelled-out ASCII form.
        '\u{00DF}' => "ss",
        '\u{00C6}' => "AE",
        '\u{00E6}' => "ae",
        '\u{00D8}' => "O",
        '\u{00F8}' => "o",
        '\u{00DE}' => "TH",
        '\u{00FE}' => "th",
        '\u{00D0}' => "D",
        '\u{00F0}' => "d",
        '\u{00AB}' => "<<",
        '\u{00BB}' => ">>",
        '\u{00A9}' => "(c)",
        '\u{00AE}' => "(R)",
        '\u{00B0}' => "deg",
        '\u{00B1}' => "+/-",
        '\u{00D7}' => "x",
        '\u{00F7}' => "/",
        '\u{00B7}' => ".",
        '\u{00A7}' => "S",
        '\u{00B6}' => "P",
        '\u{00A3}' => "GBP",
        '\u{00A5}' => "JPY",
        '\u{00A2}' => "c",
        '\u{00A1}' => "!",
        '\u{00BF}' => "?",
        '\u{00A0}' => " ",
        _ => return None,
    };
    Some(s)
}
