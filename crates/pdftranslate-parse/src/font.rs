//! Fonts as the page interpreter sees them: code splitting, Unicode
//! mapping, advance widths, vertical metrics and style.

use std::collections::HashMap;
use std::ops::Range;

use lopdf::{Dictionary, Document, Object};
use pdftranslate_core::StyleFlags;

use crate::cmap::ToUnicodeCMap;
use crate::encoding::{BaseEncoding, SimpleEncoding};
use crate::objects::{get, get_dict, get_name, get_number, number, resolve, stream_data};
use crate::standard_fonts::{self, StandardFont, strip_subset_prefix};

const DEFAULT_ASCENT: f64 = 750.0;
const DEFAULT_DESCENT: f64 = -250.0;
const DEFAULT_WIDTH: f64 = 600.0;
const DEFAULT_CID_WIDTH: f64 = 1000.0;

/// FontDescriptor `/Flags` bits.
const DESCRIPTOR_ITALIC: i64 = 1 << 6;
const DESCRIPTOR_FORCE_BOLD: i64 = 1 << 18;

/// One character code found in a shown string.
#[derive(Debug, Clone, PartialEq)]
pub struct ShownCode {
    pub code: u32,
    /// Bytes of the string operand this code was read from.
    pub bytes: Range<usize>,
}

#[derive(Debug, Clone)]
enum Widths {
    Simple {
        first_char: u32,
        widths: Vec<f64>,
        missing: f64,
        standard: Option<&'static StandardFont>,
    },
    Composite {
        widths: HashMap<u32, f64>,
        default: f64,
    },
}

/// A font resource loaded for interpretation.
#[derive(Debug, Clone)]
pub struct LoadedFont {
    /// `/BaseFont` without a subset prefix.
    pub base_font: String,
    pub flags: StyleFlags,
    ascent: f64,
    descent: f64,
    widths: Widths,
    encoding: SimpleEncoding,
    to_unicode: Option<ToUnicodeCMap>,
}

impl LoadedFont {
    /// Load a font dictionary. Missing or malformed entries fall back to
    /// defaults; loading never fails.
    pub fn load(doc: &Document, font: &Dictionary) -> Self {
        let raw_name = get_name(doc, font, b"BaseFont")
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .unwrap_or_default();
        let base_font = strip_subset_prefix(&raw_name).to_string();
        let composite = get_name(doc, font, b"Subtype") == Some(b"Type0".as_slice());

        let descendant = composite
            .then(|| {
                get(doc, font, b"DescendantFonts")
                    .and_then(|o| o.as_array().ok())
                    .and_then(|a| a.first())
                    .and_then(|o| resolve(doc, o).as_dict().ok())
            })
            .flatten();
        let descriptor = get_dict(doc, descendant.unwrap_or(font), b"FontDescriptor");
        let standard = standard_fonts::lookup(&base_font);

        let ascent = descriptor
            .and_then(|d| get_number(doc, d, b"Ascent"))
            .filter(|a| *a != 0.0)
            .or(standard.map(|s| s.ascent))
            .unwrap_or(DEFAULT_ASCENT);
        let descent = descriptor
            .and_then(|d| get_number(doc, d, b"Descent"))
            .filter(|d| *d != 0.0)
            .or(standard.map(|s| s.descent))
            .unwrap_or(DEFAULT_DESCENT);

        let widths = match descendant {
            Some(cid_font) => Widths::Composite {
                widths: get(doc, cid_font, b"W")
                    .and_then(|o| o.as_array().ok())
                    .map(|a| parse_w_array(doc, a))
                    .unwrap_or_default(),
                default: get_number(doc, cid_font, b"DW").unwrap_or(DEFAULT_CID_WIDTH),
            },
            None if composite => Widths::Composite {
                widths: HashMap::new(),
                default: DEFAULT_CID_WIDTH,
            },
            None => Widths::Simple {
                first_char: get_number(doc, font, b"FirstChar").map_or(0, |v| v as u32),
                widths: get(doc, font, b"Widths")
                    .and_then(|o| o.as_array().ok())
                    .map(|a| a.iter().map(|o| number(resolve(doc, o)).unwrap_or(0.0)).collect())
                    .unwrap_or_default(),
                missing: descriptor
                    .and_then(|d| get_number(doc, d, b"MissingWidth"))
                    .unwrap_or(0.0),
                standard,
            },
        };

        let descriptor_flags = descriptor
            .and_then(|d| get(doc, d, b"Flags"))
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0);
        let weight = descriptor.and_then(|d| get_number(doc, d, b"FontWeight"));
        let flags = style_flags(&base_font, descriptor_flags, weight);

        let encoding = if composite {
            SimpleEncoding::default()
        } else {
            load_encoding(doc, font, standard.is_some())
        };

        let to_unicode = get(doc, font, b"ToUnicode")
            .and_then(|o| o.as_stream().ok())
            .map(|s| ToUnicodeCMap::parse(&stream_data(s)))
            .filter(|c| !c.is_empty());

        Self {
            base_font,
            flags,
            ascent,
            descent,
            widths,
            encoding,
            to_unicode,
        }
    }

    /// Metrics used when a `Tf` names a font the resources do not define.
    pub fn unknown(name: &str) -> Self {
        Self {
            base_font: name.to_string(),
            flags: style_flags(name, 0, None),
            ascent: DEFAULT_ASCENT,
            descent: DEFAULT_DESCENT,
            widths: Widths::Simple {
                first_char: 0,
                widths: Vec::new(),
                missing: 0.0,
                standard: None,
            },
            encoding: SimpleEncoding::new(BaseEncoding::WinAnsi),
            to_unicode: None,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.widths, Widths::Composite { .. })
    }

    pub fn ascent(&self) -> f64 {
        self.ascent
    }

    pub fn descent(&self) -> f64 {
        self.descent
    }

    /// Split a shown string into character codes: two bytes each for
    /// composite fonts (a trailing odd byte stands alone), one otherwise.
    pub fn codes(&self, bytes: &[u8]) -> Vec<ShownCode> {
        let step = if self.is_composite() { 2 } else { 1 };
        bytes
            .chunks(step)
            .enumerate()
            .map(|(i, chunk)| ShownCode {
                code: chunk.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b)),
                bytes: i * step..i * step + chunk.len(),
            })
            .collect()
    }

    /// Unicode text for a code: ToUnicode, then the font encoding, then the
    /// code itself.
    pub fn text(&self, code: u32) -> String {
        if let Some(text) = self.to_unicode.as_ref().and_then(|c| c.lookup(code)) {
            return text.to_string();
        }
        if !self.is_composite() {
            if let Some(c) = u8::try_from(code).ok().and_then(|b| self.encoding.decode(b)) {
                return c.to_string();
            }
        }
        char::from_u32(code).map(String::from).unwrap_or_default()
    }

    /// Advance width of `code` in glyph space (1/1000 em).
    pub fn width(&self, code: u32) -> f64 {
        match &self.widths {
            Widths::Simple {
                first_char,
                widths,
                missing,
                standard,
            } => {
                if let Some(w) = code
                    .checked_sub(*first_char)
                    .and_then(|i| widths.get(i as usize))
                {
                    return *w;
                }
                if *missing > 0.0 {
                    return *missing;
                }
                match (standard, u8::try_from(code)) {
                    (Some(std_font), Ok(b)) => std_font.width(b),
                    _ => DEFAULT_WIDTH,
                }
            }
            Widths::Composite { widths, default } => widths.get(&code).copied().unwrap_or(*default),
        }
    }
}

fn style_flags(base_font: &str, descriptor_flags: i64, weight: Option<f64>) -> StyleFlags {
    let lower = base_font.to_ascii_lowercase();
    let bold = descriptor_flags & DESCRIPTOR_FORCE_BOLD != 0
        || weight.is_some_and(|w| w >= 600.0)
        || ["bold", "black", "heavy", "semibold", "demi"]
            .iter()
            .any(|k| lower.contains(k));
    let italic = descriptor_flags & DESCRIPTOR_ITALIC != 0
        || lower.contains("italic")
        || lower.contains("oblique");
    StyleFlags::new(bold, italic)
}

fn load_encoding(doc: &Document, font: &Dictionary, is_standard_latin: bool) -> SimpleEncoding {
    // Standard Latin fonts without an /Encoding use StandardEncoding; for
    // everything else WinAnsi is the most useful guess.
    let implicit = if is_standard_latin {
        BaseEncoding::Standard
    } else {
        BaseEncoding::WinAnsi
    };
    match get(doc, font, b"Encoding") {
        Some(Object::Name(name)) => {
            SimpleEncoding::new(BaseEncoding::from_name(name).unwrap_or(implicit))
        }
        Some(Object::Dictionary(dict)) => {
            let base = get_name(doc, dict, b"BaseEncoding")
                .and_then(BaseEncoding::from_name)
                .unwrap_or(implicit);
            let mut encoding = SimpleEncoding::new(base);
            if let Some(diffs) = get(doc, dict, b"Differences").and_then(|o| o.as_array().ok()) {
                let names = differences(diffs);
                encoding.apply_differences(names.iter().map(|(c, n)| (*c, n.as_str())));
            }
            encoding
        }
        _ => SimpleEncoding::new(implicit),
    }
}

/// `[code /name /name code /name ...]` into `(code, name)` pairs.
fn differences(items: &[Object]) -> Vec<(u8, String)> {
    let mut out = Vec::new();
    let mut next: Option<u32> = None;
    for item in items {
        match item {
            Object::Integer(i) => next = u32::try_from(*i).ok(),
            Object::Name(name) => {
                if let Some(code) = next {
                    if let Ok(code) = u8::try_from(code) {
                        out.push((code, String::from_utf8_lossy(name).into_owned()));
                    }
                    next = Some(code + 1);
                }
            }
            _ => {}
        }
    }
    out
}

/// `/W` entries: `c [w1 w2 ...]` and `c_first c_last w`.
fn parse_w_array(doc: &Document, items: &[Object]) -> HashMap<u32, f64> {
    let mut widths = HashMap::new();
    let values: Vec<&Object> = items.iter().map(|o| resolve(doc, o)).collect();
    let mut i = 0;
    while i < values.len() {
        let Some(start) = number(values[i]).map(|v| v as u32) else {
            i += 1;
            continue;
        };
        match values.get(i + 1) {
            Some(Object::Array(list)) => {
                for (offset, w) in list.iter().enumerate() {
                    if let Some(w) = number(resolve(doc, w)) {
                        widths.insert(start + offset as u32, w);
                    }
                }
                i += 2;
            }
            Some(end) => {
                if let (Some(end), Some(w)) = (number(end), values.get(i + 2).and_then(|o| number(o))) {
                    let end = end as u32;
                    // Cap pathological ranges.
                    if end >= start && end - start <= 0xFFFF {
                        for cid in start..=end {
                            widths.insert(cid, w);
                        }
                    }
                }
                i += 3;
            }
            None => break,
        }
    }
    widths
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Stream, dictionary};

    fn simple_font(doc: &mut Document) -> Dictionary {
        let descriptor = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => "ABCDEF+Garamond-Italic",
            "Flags" => 64,
            "Ascent" => 700,
            "Descent" => -200,
            "MissingWidth" => 250,
        });
        dictionary! {
            "Type" => "Font",
            "Subtype" => "TrueType",
            "BaseFont" => "ABCDEF+Garamond-Italic",
            "FirstChar" => 65,
            "LastChar" => 66,
            "Widths" => vec![Object::Integer(610), Object::Integer(580)],
            "FontDescriptor" => descriptor,
            "Encoding" => dictionary! {
                "BaseEncoding" => "WinAnsiEncoding",
                "Differences" => vec![Object::Integer(66), Object::Name(b"Scedilla".to_vec())],
            },
        }
    }

    #[test]
    fn simple_font_metrics_and_text() {
        let mut doc = Document::with_version("1.7");
        let dict = simple_font(&mut doc);
        let font = LoadedFont::load(&doc, &dict);
        assert_eq!(font.base_font, "Garamond-Italic");
        assert!(font.flags.is_italic());
        assert!(!font.flags.is_bold());
        assert_eq!(font.ascent(), 700.0);
        assert_eq!(font.width(65), 610.0);
        assert_eq!(font.width(90), 250.0);
        assert_eq!(font.text(65), "A");
        assert_eq!(font.text(66), "Ş");
        assert_eq!(font.text(0xE9), "é");
    }

    #[test]
    fn standard_font_without_widths_uses_afm() {
        let doc = Document::with_version("1.7");
        let dict = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
        };
        let font = LoadedFont::load(&doc, &dict);
        assert!(font.flags.is_bold());
        assert_eq!(font.width(u32::from(b' ')), 278.0);
        assert_eq!(font.width(u32::from(b'W')), 944.0);
        assert_eq!(font.text(0x27), "\u{2019}");
    }

    #[test]
    fn composite_font_two_byte_codes_and_w_array() {
        let mut doc = Document::with_version("1.7");
        let cmap = doc.add_object(Stream::new(
            dictionary! {},
            b"beginbfchar <0024> <0048> <0025> <0069> endbfchar".to_vec(),
        ));
        let cid_font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => "NotoSans-Bold",
            "DW" => 500,
            "W" => vec![
                Object::Integer(36),
                Object::Array(vec![Object::Integer(700), Object::Integer(300)]),
                Object::Integer(100),
                Object::Integer(102),
                Object::Integer(450),
            ],
        });
        let dict = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "NotoSans-Bold",
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::Reference(cid_font)],
            "ToUnicode" => cmap,
        };
        let font = LoadedFont::load(&doc, &dict);
        assert!(font.is_composite());
        assert!(font.flags.is_bold());

        let codes = font.codes(&[0x00, 0x24, 0x00, 0x25]);
        assert_eq!(codes.len(), 2);
        assert_eq!(codes[1], ShownCode { code: 0x25, bytes: 2..4 });
        assert_eq!(font.text(0x24), "H");
        assert_eq!(font.width(0x24), 700.0);
        assert_eq!(font.width(0x25), 300.0);
        assert_eq!(font.width(101), 450.0);
        assert_eq!(font.width(7), 500.0);
    }

    #[test]
    fn unknown_font_defaults() {
        let font = LoadedFont::unknown("F9");
        assert_eq!(font.width(65), 600.0);
        assert_eq!(font.ascent(), 750.0);
        assert_eq!(font.descent(), -250.0);
        assert_eq!(font.codes(b"ab").len(), 2);
    }

    #[test]
    fn differences_runs() {
        let items = vec![
            Object::Integer(1),
            Object::Name(b"a".to_vec()),
            Object::Name(b"b".to_vec()),
            Object::Integer(200),
            Object::Name(b"c".to_vec()),
        ];
        let parsed = differences(&items);
        assert_eq!(parsed[1], (2, "b".to_string()));
        assert_eq!(parsed[2], (200, "c".to_string()));
    }
}
