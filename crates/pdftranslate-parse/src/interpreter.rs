//! Content stream interpreter.
//!
//! Walks the tokenized page content, maintaining graphics and text state,
//! and records three things: every visible glyph with its position in the
//! stream, every filled path, and every placed image. Form XObjects are
//! entered for fills and images only; text inside forms is not editable
//! and is not reported.

use std::collections::HashMap;
use std::rc::Rc;

use lopdf::{Dictionary, Document, Object};
use pdftranslate_core::{BBox, Char, Ctm, Point};

use crate::error::BackendError;
use crate::font::LoadedFont;
use crate::interpreter_state::{FillSpace, InterpreterState};
use crate::objects::{get, get_dict, get_name, number, stream_data};
use crate::scan::{FillRegion, FillRule, GlyphRecord, PageScan};
use crate::text_state::{TextRenderMode, TextState};
use crate::tokenizer::{Operand, Operator, tokenize};

/// Nesting limit for Form XObjects.
pub const MAX_FORM_DEPTH: usize = 8;

/// Segments used to flatten one Bézier curve.
const CURVE_STEPS: usize = 8;

/// Interpret a page's content stream.
pub(crate) fn scan_content(
    doc: &Document,
    resources: Option<&Dictionary>,
    content: Vec<u8>,
    page_index: usize,
    media_box: [f64; 4],
) -> Result<PageScan, BackendError> {
    let operators = tokenize(&content)?;
    let mut scanner = Scanner::new(doc, media_box[3]);
    let mut gs = InterpreterState::default();
    let mut ts = TextState::new();
    scanner.run(&operators, resources, &mut gs, &mut ts, 0);

    let Scanner {
        glyphs,
        fills,
        images,
        ..
    } = scanner;
    Ok(PageScan {
        page_index,
        media_box,
        width: media_box[2] - media_box[0],
        height: media_box[3] - media_box[1],
        glyphs,
        fills,
        images,
        content,
        operators,
    })
}

/// Path under construction, already in top-left page coordinates.
#[derive(Debug, Default)]
struct PathBuilder {
    subpaths: Vec<Vec<Point>>,
    current: Vec<Point>,
}

impl PathBuilder {
    fn move_to(&mut self, p: Point) {
        self.flush();
        self.current.push(p);
    }

    fn line_to(&mut self, p: Point) {
        self.current.push(p);
    }

    fn last(&self) -> Option<Point> {
        self.current.last().copied()
    }

    fn curve_to(&mut self, c1: Point, c2: Point, end: Point) {
        let Some(start) = self.last() else {
            self.current.push(end);
            return;
        };
        for step in 1..=CURVE_STEPS {
            let t = step as f64 / CURVE_STEPS as f64;
            let u = 1.0 - t;
            let x = u * u * u * start.x + 3.0 * u * u * t * c1.x + 3.0 * u * t * t * c2.x + t * t * t * end.x;
            let y = u * u * u * start.y + 3.0 * u * u * t * c1.y + 3.0 * u * t * t * c2.y + t * t * t * end.y;
            self.current.push(Point::new(x, y));
        }
    }

    fn close(&mut self) {
        if let Some(&first) = self.current.first() {
            self.flush();
            // A new subpath begins at the start of the closed one.
            self.current.push(first);
        }
    }

    fn flush(&mut self) {
        if self.current.len() > 1 {
            self.subpaths.push(std::mem::take(&mut self.current));
        } else {
            self.current.clear();
        }
    }

    fn take(&mut self) -> Vec<Vec<Point>> {
        self.flush();
        std::mem::take(&mut self.subpaths)
    }

    fn clear(&mut self) {
        self.subpaths.clear();
        self.current.clear();
    }
}

struct Scanner<'a> {
    doc: &'a Document,
    mediabox_top: f64,
    fonts: HashMap<String, Rc<LoadedFont>>,
    path: PathBuilder,
    glyphs: Vec<GlyphRecord>,
    fills: Vec<FillRegion>,
    images: Vec<BBox>,
}

impl<'a> Scanner<'a> {
    fn new(doc: &'a Document, mediabox_top: f64) -> Self {
        Self {
            doc,
            mediabox_top,
            fonts: HashMap::new(),
            path: PathBuilder::default(),
            glyphs: Vec::new(),
            fills: Vec::new(),
            images: Vec::new(),
        }
    }

    /// PDF user space through `ctm`, then flipped to top-left coordinates.
    fn device_point(&self, ctm: &Ctm, x: f64, y: f64) -> Point {
        let p = ctm.transform_point(Point::new(x, y));
        Point::new(p.x, self.mediabox_top - p.y)
    }

    fn run(
        &mut self,
        ops: &[Operator],
        resources: Option<&Dictionary>,
        gs: &mut InterpreterState,
        ts: &mut TextState,
        depth: usize,
    ) {
        // Only the page's own content stream carries editable text.
        let text_enabled = depth == 0;
        for (index, op) in ops.iter().enumerate() {
            let n = numbers(&op.operands);
            match op.name.as_str() {
                "q" => gs.save(&ts.params),
                "Q" => {
                    if !gs.restore(&mut ts.params) {
                        scan_warn!("unbalanced Q at operator {index}");
                    }
                }
                "cm" => {
                    if let [a, b, c, d, e, f] = n[..] {
                        gs.concat(Ctm::new(a, b, c, d, e, f));
                    }
                }

                // Text object and state
                "BT" => ts.begin_text(),
                "ET" => ts.end_text(),
                "Tf" => {
                    if let Some(name) = op.operands.first().and_then(Operand::as_name) {
                        ts.params.font_name = name.to_string();
                    }
                    if let Some(size) = op.operands.get(1).and_then(Operand::as_f64) {
                        ts.params.font_size = size;
                    }
                }
                "Tc" => set_first(&n, &mut ts.params.char_spacing),
                "Tw" => set_first(&n, &mut ts.params.word_spacing),
                "Tz" => set_first(&n, &mut ts.params.h_scaling),
                "TL" => set_first(&n, &mut ts.params.leading),
                "Ts" => set_first(&n, &mut ts.params.rise),
                "Tr" => {
                    if let Some(mode) = n.first().and_then(|m| TextRenderMode::from_i64(*m as i64)) {
                        ts.params.render_mode = mode;
                    }
                }
                "Td" => {
                    if let [tx, ty] = n[..] {
                        ts.move_text_position(tx, ty);
                    }
                }
                "TD" => {
                    if let [tx, ty] = n[..] {
                        ts.move_text_position_and_set_leading(tx, ty);
                    }
                }
                "Tm" => {
                    if let [a, b, c, d, e, f] = n[..] {
                        ts.set_text_matrix(Ctm::new(a, b, c, d, e, f));
                    }
                }
                "T*" => ts.move_to_next_line(),

                // Text showing
                "Tj" => {
                    if let Some(bytes) = op.operands.first().and_then(Operand::as_string_bytes) {
                        self.show(text_enabled, index, None, bytes, resources, gs, ts);
                    }
                }
                "'" => {
                    ts.move_to_next_line();
                    if let Some(bytes) = op.operands.first().and_then(Operand::as_string_bytes) {
                        self.show(text_enabled, index, None, bytes, resources, gs, ts);
                    }
                }
                "\"" => {
                    if let [aw, ac, ..] = n[..] {
                        ts.params.word_spacing = aw;
                        ts.params.char_spacing = ac;
                    }
                    ts.move_to_next_line();
                    if let Some(bytes) = op.operands.get(2).and_then(Operand::as_string_bytes) {
                        self.show(text_enabled, index, None, bytes, resources, gs, ts);
                    }
                }
                "TJ" => {
                    let Some(Operand::Array(elements)) = op.operands.first() else {
                        continue;
                    };
                    for (element, item) in elements.iter().enumerate() {
                        if let Some(bytes) = item.as_string_bytes() {
                            self.show(text_enabled, index, Some(element), bytes, resources, gs, ts);
                        } else if let Some(adjust) = item.as_f64() {
                            let p = &ts.params;
                            let tx = -adjust / 1000.0 * p.font_size * p.h_scale();
                            ts.advance(tx);
                        }
                    }
                }

                // Fill color
                "g" => {
                    if let Some(&v) = n.first() {
                        gs.set_fill_gray(v);
                    }
                }
                "rg" => {
                    if let [r, g, b] = n[..] {
                        gs.set_fill_rgb(r, g, b);
                    }
                }
                "k" => {
                    if let [c, m, y, k] = n[..] {
                        gs.set_fill_cmyk(c, m, y, k);
                    }
                }
                "cs" => {
                    let space = op
                        .operands
                        .first()
                        .and_then(Operand::as_name)
                        .map(|name| self.color_space(name, resources))
                        .unwrap_or_default();
                    gs.set_fill_space(space);
                }
                "sc" | "scn" => gs.set_fill_components(&n),

                // Path construction
                "m" => {
                    if let [x, y] = n[..] {
                        let p = self.device_point(gs.ctm(), x, y);
                        self.path.move_to(p);
                    }
                }
                "l" => {
                    if let [x, y] = n[..] {
                        let p = self.device_point(gs.ctm(), x, y);
                        self.path.line_to(p);
                    }
                }
                "c" => {
                    if let [x1, y1, x2, y2, x3, y3] = n[..] {
                        let ctm = gs.ctm();
                        let c1 = self.device_point(ctm, x1, y1);
                        let c2 = self.device_point(ctm, x2, y2);
                        let end = self.device_point(ctm, x3, y3);
                        self.path.curve_to(c1, c2, end);
                    }
                }
                "v" => {
                    if let [x2, y2, x3, y3] = n[..] {
                        let ctm = gs.ctm();
                        let c2 = self.device_point(ctm, x2, y2);
                        let end = self.device_point(ctm, x3, y3);
                        let c1 = self.path.last().unwrap_or(c2);
                        self.path.curve_to(c1, c2, end);
                    }
                }
                "y" => {
                    if let [x1, y1, x3, y3] = n[..] {
                        let ctm = gs.ctm();
                        let c1 = self.device_point(ctm, x1, y1);
                        let end = self.device_point(ctm, x3, y3);
                        self.path.curve_to(c1, end, end);
                    }
                }
                "h" => self.path.close(),
                "re" => {
                    if let [x, y, w, h] = n[..] {
                        let ctm = gs.ctm();
                        let corners = [
                            self.device_point(ctm, x, y),
                            self.device_point(ctm, x + w, y),
                            self.device_point(ctm, x + w, y + h),
                            self.device_point(ctm, x, y + h),
                        ];
                        self.path.move_to(corners[0]);
                        for corner in &corners[1..] {
                            self.path.line_to(*corner);
                        }
                        self.path.close();
                    }
                }

                // Path painting
                "f" | "F" | "B" | "b" => self.fill(FillRule::NonZero, gs, op.name == "b"),
                "f*" | "B*" | "b*" => self.fill(FillRule::EvenOdd, gs, op.name == "b*"),
                "S" | "s" | "n" => self.path.clear(),
                // Clipping does not change what is painted under the text.
                "W" | "W*" => {}

                "Do" => {
                    if let Some(name) = op.operands.first().and_then(Operand::as_name) {
                        self.invoke_xobject(name, resources, gs, depth);
                    }
                }
                "BI" => {
                    let unit = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
                    self.place_image(gs.ctm(), &unit);
                }
                _ => {}
            }
        }
    }

    fn fill(&mut self, rule: FillRule, gs: &InterpreterState, close: bool) {
        if close {
            self.path.close();
        }
        let subpaths = self.path.take();
        if subpaths.iter().any(|s| s.len() >= 3) {
            self.fills.push(FillRegion {
                subpaths,
                color: gs.fill_color(),
                rule,
            });
        }
    }

    fn place_image(&mut self, ctm: &Ctm, corners: &[(f64, f64)]) {
        let points: Vec<Point> = corners
            .iter()
            .map(|&(x, y)| self.device_point(ctm, x, y))
            .collect();
        if let Some(bbox) = BBox::from_points(&points) {
            self.images.push(bbox);
        }
    }

    fn color_space(&self, name: &str, resources: Option<&Dictionary>) -> FillSpace {
        let direct = FillSpace::from_name(name);
        if direct != FillSpace::Inferred {
            return direct;
        }
        let Some(spaces) = resources.and_then(|r| get_dict(self.doc, r, b"ColorSpace")) else {
            return FillSpace::Inferred;
        };
        match get(self.doc, spaces, name.as_bytes()) {
            Some(Object::Name(family)) => FillSpace::from_name(&String::from_utf8_lossy(family)),
            Some(Object::Array(parts)) => parts
                .first()
                .and_then(|p| p.as_name().ok())
                .map(|family| match family {
                    // ICC profiles are read by component count.
                    b"ICCBased" => FillSpace::Inferred,
                    other => FillSpace::from_name(&String::from_utf8_lossy(other)),
                })
                .unwrap_or(FillSpace::Unsupported),
            _ => FillSpace::Inferred,
        }
    }

    fn font(&mut self, resources: Option<&Dictionary>, name: &str) -> Rc<LoadedFont> {
        if let Some(font) = self.fonts.get(name) {
            return Rc::clone(font);
        }
        let dict = resources
            .and_then(|r| get_dict(self.doc, r, b"Font"))
            .and_then(|fonts| get_dict(self.doc, fonts, name.as_bytes()));
        let font = match dict {
            Some(dict) => LoadedFont::load(self.doc, dict),
            None => {
                scan_warn!("font /{name} is not in the page resources");
                LoadedFont::unknown(name)
            }
        };
        let font = Rc::new(font);
        self.fonts.insert(name.to_string(), Rc::clone(&font));
        font
    }

    #[allow(clippy::too_many_arguments)]
    fn show(
        &mut self,
        record: bool,
        op_index: usize,
        element: Option<usize>,
        bytes: &[u8],
        resources: Option<&Dictionary>,
        gs: &InterpreterState,
        ts: &mut TextState,
    ) {
        let font = self.font(resources, &ts.params.font_name.clone());
        let record = record && ts.params.render_mode.is_visible();
        for shown in font.codes(bytes) {
            let params = &ts.params;
            let w0 = font.width(shown.code);
            let word_spacing = if !font.is_composite() && shown.code == 32 {
                params.word_spacing
            } else {
                0.0
            };
            let advance = w0 / 1000.0 * params.font_size + params.char_spacing + word_spacing;

            if record {
                let trm = params.font_matrix().concat(ts.text_matrix()).concat(gs.ctm());
                let origin = self.device_point(&trm, 0.0, 0.0);
                let lower = self.device_point(&trm, 0.0, font.descent() / 1000.0);
                let upper = self.device_point(&trm, w0 / 1000.0, font.ascent() / 1000.0);
                let bbox = BBox::new(
                    lower.x.min(upper.x),
                    lower.y.min(upper.y),
                    lower.x.max(upper.x),
                    lower.y.max(upper.y),
                );
                self.glyphs.push(GlyphRecord {
                    ch: Char {
                        text: font.text(shown.code),
                        bbox,
                        fontname: font.base_font.clone(),
                        size: trm.y_scale(),
                        color: gs.fill_color(),
                        origin,
                        flags: font.flags,
                    },
                    op_index,
                    element,
                    bytes: shown.bytes,
                    advance,
                    font_size: params.font_size,
                });
            }
            let tx = advance * params.h_scale();
            ts.advance(tx);
        }
    }

    fn invoke_xobject(
        &mut self,
        name: &str,
        resources: Option<&Dictionary>,
        gs: &InterpreterState,
        depth: usize,
    ) {
        let Some(xobjects) = resources.and_then(|r| get_dict(self.doc, r, b"XObject")) else {
            scan_warn!("Do /{name} without an /XObject resource dictionary");
            return;
        };
        let Some(Object::Stream(stream)) = get(self.doc, xobjects, name.as_bytes()) else {
            scan_warn!("XObject /{name} is missing or not a stream");
            return;
        };
        match get_name(self.doc, &stream.dict, b"Subtype") {
            Some(b"Image") => {
                let unit = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
                self.place_image(gs.ctm(), &unit);
            }
            Some(b"Form") => {
                if depth + 1 > MAX_FORM_DEPTH {
                    scan_warn!("form /{name} nested deeper than {MAX_FORM_DEPTH}; skipped");
                    return;
                }
                let ops = match tokenize(&stream_data(stream)) {
                    Ok(ops) => ops,
                    Err(err) => {
                        scan_warn!("form /{name} content is unreadable: {err}");
                        return;
                    }
                };
                let form_resources = get_dict(self.doc, &stream.dict, b"Resources").or(resources);
                // Forms run on a copy of the state, so unbalanced q/Q inside
                // cannot leak out.
                let mut form_gs = gs.clone();
                if let Some(matrix) = get(self.doc, &stream.dict, b"Matrix")
                    .and_then(|m| m.as_array().ok())
                    .and_then(|m| matrix_from_objects(m))
                {
                    form_gs.concat(matrix);
                }
                let mut form_ts = TextState::new();
                self.path.clear();
                self.run(&ops, form_resources, &mut form_gs, &mut form_ts, depth + 1);
                self.path.clear();
            }
            _ => {}
        }
    }
}

fn numbers(operands: &[Operand]) -> Vec<f64> {
    operands.iter().filter_map(Operand::as_f64).collect()
}

fn set_first(values: &[f64], target: &mut f64) {
    if let Some(&v) = values.first() {
        *target = v;
    }
}

fn matrix_from_objects(values: &[Object]) -> Option<Ctm> {
    let nums: Vec<f64> = values.iter().filter_map(number).collect();
    match nums[..] {
        [a, b, c, d, e, f] => Some(Ctm::new(a, b, c, d, e, f)),
        _ => None,
    }
}
