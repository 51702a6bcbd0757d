//! Page editing: glyph removal, overpainting, font embedding and drawing.
//!
//! A [`PageEditor`] collects changes against a [`PageScan`] and applies them
//! in [`PageEditor::commit`]. Removing glyphs rewrites only the operators
//! that showed them; every other byte of the original content is copied
//! through unchanged. Erasures are written before drawings, so new text is
//! never painted over by a later erasure.

use std::collections::HashMap;
use std::sync::Arc;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use pdftranslate_core::{BBox, FontStyle, Point, Rgb};

use crate::error::BackendError;
use crate::objects::{get_dict, inherited};
use crate::scan::{GlyphRecord, PageScan};
use crate::standard_fonts;
use crate::tokenizer::{Operand, Operator, write_operators};

/// First and last character codes covered by embedded `/Widths`.
pub const FIRST_EMBEDDED_CODE: u8 = 32;
pub const LAST_EMBEDDED_CODE: u8 = 255;

/// An area to clear.
#[derive(Debug, Clone, PartialEq)]
pub struct Redaction {
    /// Top-left page coordinates.
    pub rect: BBox,
    /// Overpaint color; `None` removes glyphs without painting.
    pub fill: Option<Rgb>,
}

/// A font to make available on a page.
#[derive(Debug, Clone)]
pub enum FontSpec {
    /// A TrueType program embedded as a WinAnsi-encoded simple font.
    TrueType {
        /// PostScript-safe `/BaseFont` name.
        base_font: String,
        data: Arc<[u8]>,
        /// Advance widths for codes 32..=255, in 1/1000 em.
        widths: Vec<f64>,
        ascent: f64,
        descent: f64,
        style: FontStyle,
    },
    /// One of the Helvetica faces every viewer provides.
    Helvetica(FontStyle),
}

/// An editing session for one page.
///
/// Created by [`crate::PdfDocument::editor`].
pub struct PageEditor<'d, 's> {
    doc: &'d mut Document,
    embedded: &'d mut HashMap<String, ObjectId>,
    page_id: ObjectId,
    scan: &'s PageScan,
    removed: Vec<bool>,
    erasures: Vec<u8>,
    drawing: Vec<u8>,
    page_fonts: Vec<(String, ObjectId)>,
}

impl<'d, 's> PageEditor<'d, 's> {
    pub(crate) fn new(
        doc: &'d mut Document,
        embedded: &'d mut HashMap<String, ObjectId>,
        page_id: ObjectId,
        scan: &'s PageScan,
    ) -> Self {
        Self {
            doc,
            embedded,
            page_id,
            scan,
            removed: vec![false; scan.glyphs.len()],
            erasures: Vec::new(),
            drawing: Vec::new(),
            page_fonts: Vec::new(),
        }
    }

    /// Remove every glyph whose bbox center lies inside one of the rects,
    /// then overpaint each rect that has a fill color. Image rectangles are
    /// cut out of the overpaint. Returns the number of glyphs removed.
    pub fn redact(&mut self, redactions: &[Redaction]) -> usize {
        let mut count = 0;
        for (glyph, removed) in self.scan.glyphs.iter().zip(self.removed.iter_mut()) {
            if *removed {
                continue;
            }
            let center = glyph.ch.bbox.center();
            if redactions.iter().any(|r| r.rect.contains_point(center)) {
                *removed = true;
                count += 1;
            }
        }
        for redaction in redactions {
            if let Some(fill) = redaction.fill {
                self.overpaint(&redaction.rect, fill);
            }
        }
        count
    }

    fn overpaint(&mut self, rect: &BBox, fill: Rgb) {
        if rect.is_degenerate() {
            return;
        }
        let mut ops = vec![
            Operator::new("q", vec![]),
            Operator::new("rg", vec![real(fill.r), real(fill.g), real(fill.b)]),
            self.rect_op(rect),
        ];
        for hole in self.scan.images.iter().filter_map(|img| img.intersection(rect)) {
            if !hole.is_degenerate() {
                ops.push(self.rect_op(&hole));
            }
        }
        ops.push(Operator::new("f*", vec![]));
        ops.push(Operator::new("Q", vec![]));
        self.erasures.extend(write_operators(&ops));
    }

    fn rect_op(&self, rect: &BBox) -> Operator {
        Operator::new(
            "re",
            vec![
                real(rect.x0),
                real(self.scan.pdf_y(rect.bottom)),
                real(rect.width()),
                real(rect.height()),
            ],
        )
    }

    /// Make `spec` available on this page as `/resource_name`. The font
    /// object is created once per document; repeated calls are no-ops.
    pub fn add_font(&mut self, resource_name: &str, spec: &FontSpec) -> Result<(), BackendError> {
        if self.page_fonts.iter().any(|(name, _)| name == resource_name) {
            return Ok(());
        }
        let font_id = match self.embedded.get(resource_name) {
            Some(id) => *id,
            None => {
                let id = embed_font(self.doc, spec)?;
                self.embedded.insert(resource_name.to_string(), id);
                id
            }
        };
        self.page_fonts.push((resource_name.to_string(), font_id));
        Ok(())
    }

    /// Draw WinAnsi-encoded `bytes` with its baseline starting at `origin`
    /// (top-left coordinates).
    pub fn draw_text(
        &mut self,
        resource_name: &str,
        size: f64,
        color: Rgb,
        origin: Point,
        bytes: &[u8],
    ) {
        let ops = [
            Operator::new("q", vec![]),
            Operator::new("rg", vec![real(color.r), real(color.g), real(color.b)]),
            Operator::new("BT", vec![]),
            Operator::new("Tf", vec![Operand::Name(resource_name.to_string()), real(size)]),
            Operator::new(
                "Tm",
                vec![
                    Operand::Integer(1),
                    Operand::Integer(0),
                    Operand::Integer(0),
                    Operand::Integer(1),
                    real(origin.x),
                    real(self.scan.pdf_y(origin.y)),
                ],
            ),
            Operator::new("Tj", vec![Operand::LiteralString(bytes.to_vec())]),
            Operator::new("ET", vec![]),
            Operator::new("Q", vec![]),
        ];
        self.drawing.extend(write_operators(&ops));
    }

    /// Whether any change is pending.
    pub fn is_modified(&self) -> bool {
        self.removed.iter().any(|r| *r) || !self.erasures.is_empty() || !self.drawing.is_empty()
    }

    /// Write the changes into the document. Returns `false` when there was
    /// nothing to write.
    pub fn commit(self) -> Result<bool, BackendError> {
        if !self.is_modified() {
            return Ok(false);
        }
        let mut content = Vec::with_capacity(self.scan.content.len() + 64);
        content.extend_from_slice(b"q\n");
        content.extend(self.rewritten_content());
        content.push(b'\n');
        // Close any q the original left open so the appended content starts
        // from the default graphics state.
        for _ in 0..unbalanced_saves(&self.scan.operators) {
            content.extend_from_slice(b"Q\n");
        }
        content.extend_from_slice(b"Q\n");
        content.extend_from_slice(&self.erasures);
        content.extend_from_slice(&self.drawing);

        let stream_id = self.doc.add_object(Stream::new(Dictionary::new(), content));
        let resources = if self.page_fonts.is_empty() {
            None
        } else {
            Some(page_resources_with_fonts(self.doc, self.page_id, &self.page_fonts)?)
        };
        let page = self
            .doc
            .get_object_mut(self.page_id)
            .and_then(Object::as_dict_mut)?;
        page.set("Contents", Object::Reference(stream_id));
        if let Some(resources) = resources {
            page.set("Resources", Object::Dictionary(resources));
        }
        Ok(true)
    }

    /// The original content with removed glyphs cut out of their operators.
    fn rewritten_content(&self) -> Vec<u8> {
        let mut by_op: HashMap<usize, Vec<(&GlyphRecord, bool)>> = HashMap::new();
        for (glyph, removed) in self.scan.glyphs.iter().zip(&self.removed) {
            by_op.entry(glyph.op_index).or_default().push((glyph, *removed));
        }
        let mut changed: Vec<usize> = by_op
            .iter()
            .filter(|(_, glyphs)| glyphs.iter().any(|(_, removed)| *removed))
            .map(|(op, _)| *op)
            .collect();
        changed.sort_unstable();

        let source = &self.scan.content;
        let mut out = Vec::with_capacity(source.len());
        let mut copied = 0;
        for op_index in changed {
            let Some(op) = self.scan.operators.get(op_index) else {
                continue;
            };
            let Some(replacement) = rewrite_show_operator(op, &by_op[&op_index]) else {
                continue;
            };
            out.extend_from_slice(&source[copied..op.span.start]);
            out.push(b'\n');
            out.extend(write_operators(&replacement));
            copied = op.span.end;
        }
        out.extend_from_slice(&source[copied..]);
        out
    }
}

fn real(value: f64) -> Operand {
    Operand::Real(value)
}

/// Net `q` depth left open by a content stream.
fn unbalanced_saves(ops: &[Operator]) -> usize {
    ops.iter().fold(0usize, |depth, op| match op.name.as_str() {
        "q" => depth + 1,
        "Q" => depth.saturating_sub(1),
        _ => depth,
    })
}

/// Rebuild a text-showing operator as a `TJ` with removed glyphs replaced
/// by the equivalent position adjustment.
fn rewrite_show_operator(op: &Operator, glyphs: &[(&GlyphRecord, bool)]) -> Option<Vec<Operator>> {
    let elements: Vec<(Option<usize>, &Operand)> = match op.name.as_str() {
        "TJ" => match op.operands.first() {
            Some(Operand::Array(items)) => items.iter().enumerate().map(|(i, e)| (Some(i), e)).collect(),
            _ => return None,
        },
        "Tj" | "'" => vec![(None, op.operands.first()?)],
        "\"" => vec![(None, op.operands.get(2)?)],
        _ => return None,
    };

    let mut array: Vec<Operand> = Vec::new();
    for (element, operand) in elements {
        let Some(bytes) = operand.as_string_bytes() else {
            push_element(&mut array, operand.clone());
            continue;
        };
        let hex = matches!(operand, Operand::HexString(_));
        let make = |b: Vec<u8>| if hex { Operand::HexString(b) } else { Operand::LiteralString(b) };

        let mut shown: Vec<&(&GlyphRecord, bool)> =
            glyphs.iter().filter(|(g, _)| g.element == element).collect();
        shown.sort_by_key(|(g, _)| g.bytes.start);

        let mut run = Vec::new();
        let mut cursor = 0;
        for (glyph, removed) in shown {
            let range = glyph.bytes.clone();
            if range.start < cursor || range.end > bytes.len() {
                continue;
            }
            run.extend_from_slice(&bytes[cursor..range.start]);
            if *removed {
                if !run.is_empty() {
                    push_element(&mut array, make(std::mem::take(&mut run)));
                }
                if glyph.font_size != 0.0 {
                    let adjust = -glyph.advance * 1000.0 / glyph.font_size;
                    push_element(&mut array, Operand::Real(adjust));
                }
            } else {
                run.extend_from_slice(&bytes[range.clone()]);
            }
            cursor = range.end;
        }
        run.extend_from_slice(&bytes[cursor..]);
        if !run.is_empty() {
            push_element(&mut array, make(run));
        }
    }

    let tj = Operator::new("TJ", vec![Operand::Array(array)]);
    Some(match op.name.as_str() {
        "'" => vec![Operator::new("T*", vec![]), tj],
        "\"" => {
            let aw = op.operands.first().cloned().unwrap_or(Operand::Integer(0));
            let ac = op.operands.get(1).cloned().unwrap_or(Operand::Integer(0));
            vec![
                Operator::new("Tw", vec![aw]),
                Operator::new("Tc", vec![ac]),
                Operator::new("T*", vec![]),
                tj,
            ]
        }
        _ => vec![tj],
    })
}

/// Append to a TJ array, merging consecutive numbers.
fn push_element(array: &mut Vec<Operand>, element: Operand) {
    if let (Some(prev), Some(next)) = (array.last().and_then(Operand::as_f64), element.as_f64()) {
        if let Some(last) = array.last_mut() {
            *last = Operand::Real(prev + next);
        }
        return;
    }
    array.push(element);
}

fn embed_font(doc: &mut Document, spec: &FontSpec) -> Result<ObjectId, BackendError> {
    match spec {
        FontSpec::Helvetica(style) => {
            let base = standard_fonts::helvetica(*style).base_name;
            Ok(doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => base,
                "Encoding" => "WinAnsiEncoding",
            }))
        }
        FontSpec::TrueType {
            base_font,
            data,
            widths,
            ascent,
            descent,
            style,
        } => {
            let expected = usize::from(LAST_EMBEDDED_CODE - FIRST_EMBEDDED_CODE) + 1;
            if widths.len() != expected {
                return Err(BackendError::Font(format!(
                    "{base_font}: expected {expected} widths, got {}",
                    widths.len()
                )));
            }
            let file_id = doc.add_object(Stream::new(
                dictionary! { "Length1" => data.len() as i64 },
                data.to_vec(),
            ));
            // Nonsymbolic, plus Italic and ForceBold as the style asks.
            let flags = 32
                | if style.is_italic() { 1 << 6 } else { 0 }
                | if style.is_bold() { 1 << 18 } else { 0 };
            let descriptor_id = doc.add_object(dictionary! {
                "Type" => "FontDescriptor",
                "FontName" => Object::Name(base_font.as_bytes().to_vec()),
                "Flags" => flags,
                "FontBBox" => vec![
                    Object::Integer(-200),
                    Object::Real(*descent as f32),
                    Object::Integer(1200),
                    Object::Real(*ascent as f32),
                ],
                "ItalicAngle" => if style.is_italic() { -12 } else { 0 },
                "Ascent" => Object::Real(*ascent as f32),
                "Descent" => Object::Real(*descent as f32),
                "CapHeight" => Object::Real(*ascent as f32),
                "StemV" => if style.is_bold() { 120 } else { 80 },
                "FontWeight" => if style.is_bold() { 700 } else { 400 },
                "FontFile2" => file_id,
            });
            let width_objects: Vec<Object> = widths
                .iter()
                .map(|w| Object::Integer(w.round() as i64))
                .collect();
            Ok(doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "TrueType",
                "BaseFont" => Object::Name(base_font.as_bytes().to_vec()),
                "FirstChar" => i64::from(FIRST_EMBEDDED_CODE),
                "LastChar" => i64::from(LAST_EMBEDDED_CODE),
                "Widths" => width_objects,
                "Encoding" => "WinAnsiEncoding",
                "FontDescriptor" => descriptor_id,
            }))
        }
    }
}

/// A page-owned copy of the page's resources with `fonts` added to `/Font`.
/// Shared resource dictionaries are never modified.
fn page_resources_with_fonts(
    doc: &Document,
    page_id: ObjectId,
    fonts: &[(String, ObjectId)],
) -> Result<Dictionary, BackendError> {
    let mut resources = match inherited(doc, page_id, b"Resources")? {
        Some(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    };
    let mut font_dict = get_dict(doc, &resources, b"Font").cloned().unwrap_or_default();
    for (name, id) in fonts {
        font_dict.set(name.as_bytes().to_vec(), Object::Reference(*id));
    }
    resources.set("Font", Object::Dictionary(font_dict));
    Ok(resources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PdfDocument;
    use crate::tokenizer::tokenize;

    /// One page, Helvetica as /F1, with the given content.
    fn one_page_pdf(content: &[u8]) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
                "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(612), Object::Integer(792)],
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);
        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    fn first_page_ops(doc: &mut PdfDocument) -> Vec<Operator> {
        doc.scan_page(0).unwrap().operators
    }

    #[test]
    fn removed_glyphs_become_adjustments() {
        let bytes = one_page_pdf(b"BT /F1 10 Tf 100 700 Td (Hello World) Tj ET");
        let mut doc = PdfDocument::open(&bytes).unwrap();
        let scan = doc.scan_page(0).unwrap();
        // "World" starts after "Hello " = 6 glyphs.
        let world = scan.glyphs[6..]
            .iter()
            .map(|g| g.ch.bbox)
            .reduce(|a, b| a.union(&b))
            .unwrap();
        let mut editor = doc.editor(0, &scan).unwrap();
        let removed = editor.redact(&[Redaction { rect: world, fill: None }]);
        assert_eq!(removed, 5);
        assert!(editor.commit().unwrap());

        let ops = first_page_ops(&mut doc);
        let tj = ops.iter().find(|op| op.name == "TJ").unwrap();
        let Operand::Array(items) = &tj.operands[0] else {
            panic!("TJ without array");
        };
        assert_eq!(items[0], Operand::LiteralString(b"Hello ".to_vec()));
        assert_eq!(items.len(), 2);
        // W o r l d in Helvetica: 944 + 556 + 333 + 222 + 556.
        let adjust = items[1].as_f64().unwrap();
        assert!((adjust + 2611.0).abs() < 1e-6, "{adjust}");

        let rescan = doc.scan_page(0).unwrap();
        let text: String = rescan.glyphs.iter().map(|g| g.ch.text.as_str()).collect();
        assert_eq!(text, "Hello ");
    }

    #[test]
    fn untouched_operators_are_copied_verbatim() {
        let original = b"BT /F1 10 Tf 100 700 Td (A) Tj 0 -20 Td (B) Tj ET\n% keep\n0.5 g 0 0 10 10 re f";
        let bytes = one_page_pdf(original);
        let mut doc = PdfDocument::open(&bytes).unwrap();
        let scan = doc.scan_page(0).unwrap();
        let b_box = scan.glyphs[1].ch.bbox;
        let mut editor = doc.editor(0, &scan).unwrap();
        editor.redact(&[Redaction { rect: b_box, fill: None }]);
        let rewritten = editor.rewritten_content();
        let text = String::from_utf8_lossy(&rewritten);
        assert!(text.starts_with("BT /F1 10 Tf 100 700 Td (A) Tj 0 -20 Td"));
        assert!(text.ends_with("ET\n% keep\n0.5 g 0 0 10 10 re f"));
        assert!(!text.contains("(B)"));
    }

    #[test]
    fn quote_operators_keep_their_line_moves() {
        let glyph_op = Operator {
            name: "\"".into(),
            operands: vec![Operand::Integer(2), Operand::Integer(1), Operand::LiteralString(b"ab".to_vec())],
            span: 0..0,
        };
        let glyph = |range: std::ops::Range<usize>| GlyphRecord {
            ch: pdftranslate_core::Char {
                text: "a".into(),
                bbox: BBox::new(0.0, 0.0, 1.0, 1.0),
                fontname: "Helvetica".into(),
                size: 10.0,
                color: Rgb::BLACK,
                origin: Point::new(0.0, 0.0),
                flags: Default::default(),
            },
            op_index: 0,
            element: None,
            bytes: range,
            advance: 5.0,
            font_size: 10.0,
        };
        let a = glyph(0..1);
        let b = glyph(1..2);
        let ops = rewrite_show_operator(&glyph_op, &[(&a, true), (&b, false)]).unwrap();
        let names: Vec<&str> = ops.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["Tw", "Tc", "T*", "TJ"]);
        assert_eq!(
            ops[3].operands[0],
            Operand::Array(vec![Operand::Real(-500.0), Operand::LiteralString(b"b".to_vec())])
        );
    }

    #[test]
    fn adjacent_adjustments_merge() {
        let mut array = vec![Operand::LiteralString(b"x".to_vec())];
        push_element(&mut array, Operand::Integer(-100));
        push_element(&mut array, Operand::Real(-50.0));
        assert_eq!(array.len(), 2);
        assert_eq!(array[1].as_f64(), Some(-150.0));
    }

    #[test]
    fn overpaint_excludes_images_and_drawing_follows_erasure() {
        let bytes = one_page_pdf(b"BT /F1 10 Tf 100 700 Td (Hi) Tj ET");
        let mut doc = PdfDocument::open(&bytes).unwrap();
        let mut scan = doc.scan_page(0).unwrap();
        scan.images.push(BBox::new(110.0, 80.0, 300.0, 200.0));
        let rect = BBox::new(100.0, 80.0, 120.0, 95.0);
        let mut editor = doc.editor(0, &scan).unwrap();
        editor.redact(&[Redaction { rect, fill: Some(Rgb::WHITE) }]);
        editor.add_font("TRFON_helvetica_regular", &FontSpec::Helvetica(FontStyle::Regular)).unwrap();
        editor.draw_text("TRFON_helvetica_regular", 9.0, Rgb::BLACK, Point::new(100.0, 92.0), b"Merhaba");
        assert!(editor.commit().unwrap());

        let ops = first_page_ops(&mut doc);
        let fill_index = ops.iter().position(|op| op.name == "f*").unwrap();
        let rects: Vec<&Operator> = ops[..fill_index].iter().rev().take_while(|op| op.name == "re").collect();
        assert_eq!(rects.len(), 2, "redaction plus one image hole");
        let draw_index = ops.iter().rposition(|op| op.name == "Tj").unwrap();
        assert!(draw_index > fill_index);
        assert_eq!(ops[draw_index].operands[0], Operand::LiteralString(b"Merhaba".to_vec()));

        let saved = doc.save().unwrap();
        let reopened = PdfDocument::open(&saved).unwrap();
        let rescan = reopened.scan_page(0).unwrap();
        let text: String = rescan.glyphs.iter().map(|g| g.ch.text.as_str()).collect();
        assert_eq!(text, "Merhaba");
    }

    #[test]
    fn fonts_are_embedded_once_per_document() {
        let bytes = one_page_pdf(b"BT /F1 10 Tf (x) Tj ET");
        let mut doc = PdfDocument::open(&bytes).unwrap();
        let spec = FontSpec::TrueType {
            base_font: "TestSans".into(),
            data: Arc::from(vec![0u8; 16]),
            widths: vec![500.0; 224],
            ascent: 800.0,
            descent: -200.0,
            style: FontStyle::Bold,
        };
        let before = doc.document().objects.len();
        let scan = doc.scan_page(0).unwrap();
        {
            let mut editor = doc.editor(0, &scan).unwrap();
            editor.add_font("TRFON_test_bold", &spec).unwrap();
            editor.add_font("TRFON_test_bold", &spec).unwrap();
            editor.draw_text("TRFON_test_bold", 10.0, Rgb::BLACK, Point::new(0.0, 10.0), b"y");
            editor.commit().unwrap();
        }
        // font, descriptor, font file, new content stream
        assert_eq!(doc.document().objects.len(), before + 4);
        let scan = doc.scan_page(0).unwrap();
        {
            let mut editor = doc.editor(0, &scan).unwrap();
            editor.add_font("TRFON_test_bold", &spec).unwrap();
        }
        assert_eq!(doc.document().objects.len(), before + 4);
        let glyph = scan.glyphs.last().unwrap();
        assert_eq!(glyph.ch.fontname, "TestSans");
        assert!(glyph.ch.flags.is_bold());
    }

    #[test]
    fn wrong_width_count_is_a_font_error() {
        let mut doc = Document::with_version("1.7");
        let spec = FontSpec::TrueType {
            base_font: "Bad".into(),
            data: Arc::from(vec![0u8; 4]),
            widths: vec![500.0; 10],
            ascent: 800.0,
            descent: -200.0,
            style: FontStyle::Regular,
        };
        assert!(matches!(embed_font(&mut doc, &spec), Err(BackendError::Font(_))));
    }

    #[test]
    fn unbalanced_saves_are_closed() {
        let ops = tokenize(b"q q Q q").unwrap();
        assert_eq!(unbalanced_saves(&ops), 2);
        let ops = tokenize(b"Q Q q").unwrap();
        assert_eq!(unbalanced_saves(&ops), 1);
    }
}
