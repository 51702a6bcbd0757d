use crate::color::Rgb;
use crate::geometry::{BBox, Point};

/// Style flag bit for italic text.
pub const FLAG_ITALIC: u32 = 1 << 1;
/// Style flag bit for bold text.
pub const FLAG_BOLD: u32 = 1 << 4;

/// Bold/italic style bits attached to extracted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StyleFlags(pub u32);

impl StyleFlags {
    pub fn new(bold: bool, italic: bool) -> Self {
        let mut bits = 0;
        if bold {
            bits |= FLAG_BOLD;
        }
        if italic {
            bits |= FLAG_ITALIC;
        }
        Self(bits)
    }

    pub fn is_bold(&self) -> bool {
        self.0 & FLAG_BOLD != 0
    }

    pub fn is_italic(&self) -> bool {
        self.0 & FLAG_ITALIC != 0
    }

    pub fn font_style(&self) -> FontStyle {
        match (self.is_bold(), self.is_italic()) {
            (true, true) => FontStyle::BoldItalic,
            (true, false) => FontStyle::Bold,
            (false, true) => FontStyle::Italic,
            (false, false) => FontStyle::Regular,
        }
    }
}

/// One of the four faces a font family can provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FontStyle {
    #[default]
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

impl FontStyle {
    pub const ALL: [FontStyle; 4] = [
        FontStyle::Regular,
        FontStyle::Bold,
        FontStyle::Italic,
        FontStyle::BoldItalic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FontStyle::Regular => "regular",
            FontStyle::Bold => "bold",
            FontStyle::Italic => "italic",
            FontStyle::BoldItalic => "bold_italic",
        }
    }

    pub fn is_bold(&self) -> bool {
        matches!(self, FontStyle::Bold | FontStyle::BoldItalic)
    }

    pub fn is_italic(&self) -> bool {
        matches!(self, FontStyle::Italic | FontStyle::BoldItalic)
    }
}

impl std::fmt::Display for FontStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single glyph extracted from a PDF page.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Char {
    /// The Unicode text of this glyph (may be several code points for ligatures).
    pub text: String,
    /// Bounding box in top-left origin coordinates.
    pub bbox: BBox,
    /// Font name as declared by the font's /BaseFont.
    pub fontname: String,
    /// Effective font size in points (font size scaled by text and current matrices).
    pub size: f64,
    /// Fill color at the time the glyph was shown.
    pub color: Rgb,
    /// Baseline origin of the glyph in top-left coordinates.
    pub origin: Point,
    pub flags: StyleFlags,
}

/// Smallest styled text run: consecutive glyphs sharing font, size, color and baseline.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    pub text: String,
    pub bbox: BBox,
    pub font_name: String,
    pub font_size: f64,
    pub color: Rgb,
    pub flags: StyleFlags,
    /// Baseline origin of the first glyph.
    pub origin: Point,
}

impl Span {
    pub fn is_bold(&self) -> bool {
        self.flags.is_bold()
    }

    pub fn is_italic(&self) -> bool {
        self.flags.is_italic()
    }
}

/// Spans sharing one text row, ordered left to right.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Line {
    pub spans: Vec<Span>,
    pub bbox: BBox,
}

impl Line {
    /// Build a line from spans, sorting them left to right and deriving the bbox.
    ///
    /// Returns `None` for an empty span list.
    pub fn from_spans(mut spans: Vec<Span>) -> Option<Line> {
        spans.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));
        let bbox = union_all(spans.iter().map(|s| s.bbox))?;
        Some(Line { spans, bbox })
    }

    pub fn avg_font_size(&self) -> f64 {
        average_size(&self.spans)
    }

    /// Style key used to keep headings and body text in separate blocks.
    pub fn style_key(&self) -> Option<(&str, i64)> {
        self.spans
            .first()
            .map(|s| (s.font_name.as_str(), s.font_size.round() as i64))
    }
}

/// A run of same-style lines.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Block {
    pub lines: Vec<Line>,
    pub bbox: BBox,
}

impl Block {
    /// Full text of the block, one line per row.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| {
                l.spans
                    .iter()
                    .map(|s| s.text.as_str())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn avg_font_size(&self) -> f64 {
        let sizes: Vec<f64> = self.lines.iter().map(Line::avg_font_size).collect();
        if sizes.is_empty() {
            0.0
        } else {
            sizes.iter().sum::<f64>() / sizes.len() as f64
        }
    }
}

/// A horizontal sub-range of a line: the unit that gets translated and redrawn.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Segment {
    /// Position of this segment in page extraction order.
    pub index: usize,
    /// Index of the block the segment came from.
    pub block: usize,
    /// Index of the line within its block.
    pub line: usize,
    pub spans: Vec<Span>,
    pub bbox: BBox,
    pub text: String,
}

impl Segment {
    pub fn avg_font_size(&self) -> f64 {
        average_size(&self.spans)
    }

    /// Baseline origin of the first span.
    pub fn origin(&self) -> Point {
        self.spans
            .first()
            .map(|s| s.origin)
            .unwrap_or(Point::new(self.bbox.x0, self.bbox.bottom))
    }

    pub fn color(&self) -> Rgb {
        self.spans.first().map(|s| s.color).unwrap_or_default()
    }

    pub fn style(&self) -> FontStyle {
        self.spans
            .first()
            .map(|s| s.flags.font_style())
            .unwrap_or_default()
    }
}

pub(crate) fn union_all(boxes: impl IntoIterator<Item = BBox>) -> Option<BBox> {
    boxes.into_iter().reduce(|acc, b| acc.union(&b))
}

fn average_size(spans: &[Span]) -> f64 {
    if spans.is_empty() {
        return 0.0;
    }
    spans.iter().map(|s| s.font_size).sum::<f64>() / spans.len() as f64
}
