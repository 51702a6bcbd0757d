//! ToUnicode CMap parsing.
//!
//! Only the `bfchar` and `bfrange` sections matter for text extraction; the
//! rest of the CMap program (codespace ranges, PostScript boilerplate) is
//! skipped. Parsing is lenient: a malformed entry is dropped, not fatal.

use std::collections::HashMap;

/// Character code → Unicode text mapping from a `/ToUnicode` stream.
#[derive(Debug, Clone, Default)]
pub struct ToUnicodeCMap {
    mappings: HashMap<u32, String>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    Hex(&'a str),
    ArrayStart,
    ArrayEnd,
    Word(&'a str),
}

impl ToUnicodeCMap {
    pub fn parse(data: &[u8]) -> Self {
        let text = String::from_utf8_lossy(data);
        let tokens = lex(&text);
        let mut mappings = HashMap::new();

        let mut i = 0;
        while i < tokens.len() {
            match tokens[i] {
                Token::Word("beginbfchar") => i = parse_bfchar(&tokens, i + 1, &mut mappings),
                Token::Word("beginbfrange") => i = parse_bfrange(&tokens, i + 1, &mut mappings),
                _ => i += 1,
            }
        }

        Self { mappings }
    }

    pub fn lookup(&self, code: u32) -> Option<&str> {
        self.mappings.get(&code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

fn lex(text: &str) -> Vec<Token<'_>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        match bytes[pos] {
            b'%' => {
                while pos < bytes.len() && bytes[pos] != b'\n' && bytes[pos] != b'\r' {
                    pos += 1;
                }
            }
            b'<' if bytes.get(pos + 1) == Some(&b'<') => pos += 2,
            b'>' if bytes.get(pos + 1) == Some(&b'>') => pos += 2,
            b'<' => {
                let start = pos + 1;
                let end = text[start..].find('>').map_or(bytes.len(), |e| start + e);
                tokens.push(Token::Hex(&text[start..end]));
                pos = end + 1;
            }
            b'[' => {
                tokens.push(Token::ArrayStart);
                pos += 1;
            }
            b']' => {
                tokens.push(Token::ArrayEnd);
                pos += 1;
            }
            b if b.is_ascii_whitespace() => pos += 1,
            _ => {
                let start = pos;
                while pos < bytes.len()
                    && !bytes[pos].is_ascii_whitespace()
                    && !matches!(bytes[pos], b'<' | b'>' | b'[' | b']' | b'%')
                {
                    pos += 1;
                }
                if pos == start {
                    pos += 1;
                } else {
                    tokens.push(Token::Word(&text[start..pos]));
                }
            }
        }
    }
    tokens
}

fn parse_bfchar(tokens: &[Token<'_>], mut i: usize, out: &mut HashMap<u32, String>) -> usize {
    while i + 1 < tokens.len() {
        match (&tokens[i], &tokens[i + 1]) {
            (Token::Hex(src), Token::Hex(dst)) => {
                if let (Some(code), Some(text)) = (hex_code(src), utf16be_hex(dst)) {
                    out.insert(code, text);
                }
                i += 2;
            }
            (Token::Word("endbfchar"), _) => return i + 1,
            _ => i += 1,
        }
    }
    tokens.len()
}

fn parse_bfrange(tokens: &[Token<'_>], mut i: usize, out: &mut HashMap<u32, String>) -> usize {
    while i < tokens.len() {
        if tokens[i] == Token::Word("endbfrange") {
            return i + 1;
        }
        let (Some(Token::Hex(lo)), Some(Token::Hex(hi))) = (tokens.get(i), tokens.get(i + 1)) else {
            i += 1;
            continue;
        };
        let (Some(lo), Some(hi)) = (hex_code(lo), hex_code(hi)) else {
            i += 2;
            continue;
        };
        match tokens.get(i + 2) {
            Some(Token::Hex(dst)) => {
                if let Some(units) = utf16_units(dst) {
                    insert_incrementing_range(lo, hi, &units, out);
                }
                i += 3;
            }
            Some(Token::ArrayStart) => {
                i += 3;
                let mut code = lo;
                while let Some(Token::Hex(dst)) = tokens.get(i) {
                    if code <= hi {
                        if let Some(text) = utf16be_hex(dst) {
                            out.insert(code, text);
                        }
                    }
                    code = code.saturating_add(1);
                    i += 1;
                }
                if tokens.get(i) == Some(&Token::ArrayEnd) {
                    i += 1;
                }
            }
            _ => i += 2,
        }
    }
    tokens.len()
}

/// A range maps consecutive codes to consecutive values of the last UTF-16 unit.
fn insert_incrementing_range(lo: u32, hi: u32, base: &[u16], out: &mut HashMap<u32, String>) {
    if hi < lo || hi - lo > 0xFFFF {
        return;
    }
    for offset in 0..=(hi - lo) {
        let mut units = base.to_vec();
        if let Some(last) = units.last_mut() {
            *last = last.wrapping_add(offset as u16);
        }
        if let Ok(text) = String::from_utf16(&units) {
            out.insert(lo + offset, text);
        }
    }
}

fn hex_code(hex: &str) -> Option<u32> {
    let digits: String = hex.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.is_empty() || digits.len() > 8 {
        return None;
    }
    u32::from_str_radix(&digits, 16).ok()
}

fn utf16_units(hex: &str) -> Option<Vec<u16>> {
    let mut digits: String = hex.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.is_empty() {
        return None;
    }
    // Some producers write single bytes; pad to whole UTF-16 units.
    while digits.len() % 4 != 0 {
        digits.insert(0, '0');
    }
    digits
        .as_bytes()
        .chunks(4)
        .map(|chunk| {
            std::str::from_utf8(chunk)
                .ok()
                .and_then(|s| u16::from_str_radix(s, 16).ok())
        })
        .collect()
}

fn utf16be_hex(hex: &str) -> Option<String> {
    String::from_utf16(&utf16_units(hex)?).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] = b"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CMapName /Adobe-Identity-UCS def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
2 beginbfchar
<0003> <0020>
<0011> <00660069>
endbfchar
2 beginbfrange
<0024> <0026> <0041>
<0030> <0032> [<0078> <0079> <007A>]
endbfrange
endcmap";

    #[test]
    fn bfchar_entries() {
        let cmap = ToUnicodeCMap::parse(SAMPLE);
        assert_eq!(cmap.lookup(0x03), Some(" "));
        assert_eq!(cmap.lookup(0x11), Some("fi"));
    }

    #[test]
    fn bfrange_increments_last_unit() {
        let cmap = ToUnicodeCMap::parse(SAMPLE);
        assert_eq!(cmap.lookup(0x24), Some("A"));
        assert_eq!(cmap.lookup(0x26), Some("C"));
        assert_eq!(cmap.lookup(0x27), None);
    }

    #[test]
    fn bfrange_array_form() {
        let cmap = ToUnicodeCMap::parse(SAMPLE);
        assert_eq!(cmap.lookup(0x30), Some("x"));
        assert_eq!(cmap.lookup(0x32), Some("z"));
        assert_eq!(cmap.len(), 8);
    }

    #[test]
    fn entries_on_one_line_and_short_values() {
        let cmap = ToUnicodeCMap::parse(b"1 beginbfchar <01> <41> <02> <DC> endbfchar");
        assert_eq!(cmap.lookup(1), Some("A"));
        assert_eq!(cmap.lookup(2), Some("\u{00DC}"));
    }

    #[test]
    fn surrogate_pairs_decode() {
        let cmap = ToUnicodeCMap::parse(b"beginbfchar <0001> <D83DDE00> endbfchar");
        assert_eq!(cmap.lookup(1), Some("\u{1F600}"));
    }

    #[test]
    fn garbage_is_ignored() {
        let cmap = ToUnicodeCMap::parse(b"beginbfchar <zz> <0041> <0005> endbfchar");
        assert!(cmap.is_empty());
    }
}
