//! What a page scan produces: positioned glyphs that remember where they
//! live in the content stream, the filled areas under them, and where the
//! images are.

use std::ops::Range;

use pdftranslate_core::{BBox, Char, Point, Rgb};

use crate::tokenizer::Operator;

/// A shown glyph and its location in the page content stream.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphRecord {
    pub ch: Char,
    /// Index of the text-showing operator in [`PageScan::operators`].
    pub op_index: usize,
    /// Element index inside a `TJ` array; `None` for `Tj`, `'` and `"`.
    pub element: Option<usize>,
    /// Bytes of the string operand that encode this glyph.
    pub bytes: Range<usize>,
    /// Horizontal advance in unscaled text space: `w0·Tfs/1000 + Tc (+ Tw)`.
    pub advance: f64,
    /// Font size from `Tf`, needed to express `advance` as a `TJ` offset.
    pub font_size: f64,
}

/// Fill rule used when a path was painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillRule {
    NonZero,
    EvenOdd,
}

/// A filled path in top-left page coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct FillRegion {
    /// Closed subpaths; curves are flattened to line segments.
    pub subpaths: Vec<Vec<Point>>,
    pub color: Rgb,
    pub rule: FillRule,
}

impl FillRegion {
    pub fn bbox(&self) -> Option<BBox> {
        let points: Vec<Point> = self.subpaths.iter().flatten().copied().collect();
        BBox::from_points(&points)
    }
}

/// Everything the translator needs to know about one page.
#[derive(Debug, Clone)]
pub struct PageScan {
    pub page_index: usize,
    /// `/MediaBox` as `[x0, y0, x1, y1]` in PDF user space.
    pub media_box: [f64; 4],
    pub width: f64,
    pub height: f64,
    pub glyphs: Vec<GlyphRecord>,
    pub fills: Vec<FillRegion>,
    /// Placed images (XObject and inline) in top-left page coordinates.
    pub images: Vec<BBox>,
    /// The page content, all `/Contents` streams joined.
    pub content: Vec<u8>,
    /// Tokenized [`PageScan::content`].
    pub operators: Vec<Operator>,
}

impl PageScan {
    /// The visible characters in content-stream order.
    pub fn chars(&self) -> Vec<Char> {
        self.glyphs.iter().map(|g| g.ch.clone()).collect()
    }

    /// Page bounds in top-left coordinates.
    pub fn page_bbox(&self) -> BBox {
        let [x0, _, x1, _] = self.media_box;
        BBox::new(x0, 0.0, x1, self.height)
    }

    /// Convert a top-left `top` value back to a PDF user-space y.
    pub fn pdf_y(&self, top: f64) -> f64 {
        self.media_box[3] - top
    }
}
