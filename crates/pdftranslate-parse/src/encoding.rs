//! Byte-to-Unicode tables for simple (single-byte) fonts.
//!
//! WinAnsi and MacRoman come from `encoding_rs`; Adobe StandardEncoding is
//! ASCII with its own upper half. A font's `/Differences` array overrides
//! individual codes by glyph name.

/// Base encoding named by a font's `/Encoding` or `/BaseEncoding`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseEncoding {
    WinAnsi,
    MacRoman,
    Standard,
}

impl BaseEncoding {
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"WinAnsiEncoding" => Some(BaseEncoding::WinAnsi),
            b"MacRomanEncoding" => Some(BaseEncoding::MacRoman),
            b"StandardEncoding" => Some(BaseEncoding::Standard),
            _ => None,
        }
    }
}

/// A 256-entry code → char table.
#[derive(Debug, Clone)]
pub struct SimpleEncoding {
    table: [Option<char>; 256],
}

impl SimpleEncoding {
    pub fn new(base: BaseEncoding) -> Self {
        let mut table = [None; 256];
        for (code, slot) in table.iter_mut().enumerate() {
            *slot = base_char(base, code as u8);
        }
        Self { table }
    }

    /// Apply `(code, glyph name)` overrides. Unknown glyph names clear the code
    /// so a ToUnicode-less subset font falls back to the raw code.
    pub fn apply_differences<'a>(&mut self, differences: impl IntoIterator<Item = (u8, &'a str)>) {
        for (code, name) in differences {
            self.table[code as usize] = glyph_name_to_char(name);
        }
    }

    pub fn decode(&self, code: u8) -> Option<char> {
        self.table[code as usize]
    }
}

impl Default for SimpleEncoding {
    fn default() -> Self {
        Self::new(BaseEncoding::Standard)
    }
}

fn base_char(base: BaseEncoding, code: u8) -> Option<char> {
    if code < 0x20 {
        return None;
    }
    match base {
        BaseEncoding::WinAnsi => single_byte(encoding_rs::WINDOWS_1252, code),
        BaseEncoding::MacRoman => single_byte(encoding_rs::MACINTOSH, code),
        BaseEncoding::Standard => standard_char(code),
    }
}

fn single_byte(encoding: &'static encoding_rs::Encoding, code: u8) -> Option<char> {
    let bytes = [code];
    let (text, had_errors) = encoding.decode_without_bom_handling(&bytes);
    if had_errors {
        return None;
    }
    // Codes the codepage leaves undefined decode to C1 controls.
    text.chars().next().filter(|c| !c.is_control() && *c != '\u{FFFD}')
}

fn standard_char(code: u8) -> Option<char> {
    Some(match code {
        0x27 => '\u{2019}',
        0x60 => '\u{2018}',
        0x20..=0x7E => code as char,
        0xA1 => '¡',
        0xA2 => '¢',
        0xA3 => '£',
        0xA4 => '\u{2044}',
        0xA5 => '¥',
        0xA6 => '\u{0192}',
        0xA7 => '§',
        0xA8 => '¤',
        0xA9 => '\'',
        0xAA => '\u{201C}',
        0xAB => '«',
        0xAC => '\u{2039}',
        0xAD => '\u{203A}',
        0xAE => '\u{FB01}',
        0xAF => '\u{FB02}',
        0xB1 => '\u{2013}',
        0xB2 => '\u{2020}',
        0xB3 => '\u{2021}',
        0xB4 => '·',
        0xB6 => '¶',
        0xB7 => '\u{2022}',
        0xB8 => '\u{201A}',
        0xB9 => '\u{201E}',
        0xBA => '\u{201D}',
        0xBB => '»',
        0xBC => '\u{2026}',
        0xBD => '\u{2030}',
        0xBF => '¿',
        0xC1 => '`',
        0xC2 => '´',
        0xC3 => '\u{02C6}',
        0xC4 => '\u{02DC}',
        0xC5 => '¯',
        0xC6 => '\u{02D8}',
        0xC7 => '\u{02D9}',
        0xC8 => '¨',
        0xCA => '\u{02DA}',
        0xCB => '¸',
        0xCD => '\u{02DD}',
        0xCE => '\u{02DB}',
        0xCF => '\u{02C7}',
        0xD0 => '\u{2014}',
        0xE1 => 'Æ',
        0xE3 => 'ª',
        0xE8 => '\u{0141}',
        0xE9 => 'Ø',
        0xEA => '\u{0152}',
        0xEB => 'º',
        0xF1 => 'æ',
        0xF5 => '\u{0131}',
        0xF8 => '\u{0142}',
        0xF9 => 'ø',
        0xFA => '\u{0153}',
        0xFB => 'ß',
        _ => return None,
    })
}

/// Resolve an Adobe glyph name to a character.
///
/// Understands `uniXXXX`, `uXXXX`..`uXXXXXX`, single-character names, and the
/// common Latin glyph names.
pub fn glyph_name_to_char(name: &str) -> Option<char> {
    // Suffixes like ".sc" or ".alt" name variants of the same character.
    let name = name.split('.').next().unwrap_or(name);

    if let Some(hex) = name.strip_prefix("uni") {
        if let Some(c) = hex.get(..4).and_then(parse_hex_char) {
            return Some(c);
        }
    }
    if let Some(hex) = name.strip_prefix('u') {
        if (4..=6).contains(&hex.len()) {
            if let Some(c) = parse_hex_char(hex) {
                return Some(c);
            }
        }
    }

    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(c);
    }

    named_glyph(name).or_else(|| accented_glyph(name))
}

fn parse_hex_char(hex: &str) -> Option<char> {
    u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
}

fn named_glyph(name: &str) -> Option<char> {
    Some(match name {
        "space" | "nbspace" => ' ',
        "exclam" => '!',
        "quotedbl" => '"',
        "numbersign" => '#',
        "dollar" => '$',
        "percent" => '%',
        "ampersand" => '&',
        "quotesingle" => '\'',
        "parenleft" => '(',
        "parenright" => ')',
        "asterisk" => '*',
        "plus" => '+',
        "comma" => ',',
        "hyphen" | "minus" => '-',
        "period" => '.',
        "slash" => '/',
        "zero" => '0',
        "one" => '1',
        "two" => '2',
        "three" => '3',
        "four" => '4',
        "five" => '5',
        "six" => '6',
        "seven" => '7',
        "eight" => '8',
        "nine" => '9',
        "colon" => ':',
        "semicolon" => ';',
        "less" => '<',
        "equal" => '=',
        "greater" => '>',
        "question" => '?',
        "at" => '@',
        "bracketleft" => '[',
        "backslash" => '\\',
        "bracketright" => ']',
        "asciicircum" => '^',
        "underscore" => '_',
        "grave" => '`',
        "braceleft" => '{',
        "bar" => '|',
        "braceright" => '}',
        "asciitilde" => '~',
        "exclamdown" => '¡',
        "cent" => '¢',
        "sterling" => '£',
        "currency" => '¤',
        "yen" => '¥',
        "brokenbar" => '¦',
        "section" => '§',
        "dieresis" => '¨',
        "copyright" => '©',
        "ordfeminine" => 'ª',
        "guillemotleft" => '«',
        "logicalnot" => '¬',
        "registered" => '®',
        "macron" => '¯',
        "degree" => '°',
        "plusminus" => '±',
        "twosuperior" => '²',
        "threesuperior" => '³',
        "acute" => '´',
        "mu" => 'µ',
        "paragraph" => '¶',
        "periodcentered" => '·',
        "cedilla" => '¸',
        "onesuperior" => '¹',
        "ordmasculine" => 'º',
        "guillemotright" => '»',
        "onequarter" => '¼',
        "onehalf" => '½',
        "threequarters" => '¾',
        "questiondown" => '¿',
        "multiply" => '×',
        "divide" => '÷',
        "AE" => 'Æ',
        "ae" => 'æ',
        "OE" => 'Œ',
        "oe" => 'œ',
        "Oslash" => 'Ø',
        "oslash" => 'ø',
        "Eth" => 'Ð',
        "eth" => 'ð',
        "Thorn" => 'Þ',
        "thorn" => 'þ',
        "germandbls" => 'ß',
        "dotlessi" => 'ı',
        "Lslash" => 'Ł',
        "lslash" => 'ł',
        "florin" => 'ƒ',
        "circumflex" => 'ˆ',
        "tilde" => '˜',
        "caron" => 'ˇ',
        "endash" => '–',
        "emdash" => '—',
        "quoteleft" => '‘',
        "quoteright" => '’',
        "quotesinglbase" => '‚',
        "quotedblleft" => '“',
        "quotedblright" => '”',
        "quotedblbase" => '„',
        "dagger" => '†',
        "daggerdbl" => '‡',
        "bullet" => '•',
        "ellipsis" => '…',
        "perthousand" => '‰',
        "guilsinglleft" => '‹',
        "guilsinglright" => '›',
        "fraction" => '⁄',
        "Euro" => '€',
        "trademark" => '™',
        "fi" => 'ﬁ',
        "fl" => 'ﬂ',
        _ => return None,
    })
}

/// Names like `eacute` or `Scaron`: a base letter followed by an accent name.
fn accented_glyph(name: &str) -> Option<char> {
    const ACCENTS: &[(&str, &str, &str)] = &[
        // (suffix, uppercase letters, matching precomposed characters)
        ("grave", "AEIOUaeiou", "ÀÈÌÒÙàèìòù"),
        ("acute", "AEIOUYaeiouyCcNnSsZz", "ÁÉÍÓÚÝáéíóúýĆćŃńŚśŹź"),
        ("circumflex", "AEIOUaeiou", "ÂÊÎÔÛâêîôû"),
        ("tilde", "ANOano", "ÃÑÕãñõ"),
        ("dieresis", "AEIOUYaeiouy", "ÄËÏÖÜŸäëïöüÿ"),
        ("ring", "AaUu", "ÅåŮů"),
        ("cedilla", "CcSsTt", "ÇçŞşŢţ"),
        ("caron", "CcDdEeNnRrSsZz", "ČčĎďĚěŇňŘřŠšŽž"),
        ("breve", "AaGg", "ĂăĞğ"),
        ("ogonek", "AaEe", "ĄąĘę"),
        ("dotaccent", "IZz", "İŻż"),
        ("hungarumlaut", "OoUu", "ŐőŰű"),
        ("macron", "AaEeIiOoUu", "ĀāĒēĪīŌōŪū"),
    ];
    let mut chars = name.chars();
    let base = chars.next()?;
    let suffix = chars.as_str();
    let (_, letters, composed) = ACCENTS.iter().find(|(s, _, _)| *s == suffix)?;
    let index = letters.chars().position(|c| c == base)?;
    composed.chars().nth(index)
}
