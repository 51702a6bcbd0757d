//! Text state for the page interpreter.
//!
//! Tracks BT/ET, the text and line matrices, and the text parameters set by
//! `Tf Tc Tw Tz TL Ts Tr`. The parameters are part of the graphics state and
//! are saved and restored with `q`/`Q` through [`TextParams`].

use pdftranslate_core::Ctm;

/// Text rendering mode set by `Tr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextRenderMode {
    #[default]
    Fill,
    Stroke,
    FillStroke,
    /// Neither filled nor stroked. Used for OCR layers and hidden text.
    Invisible,
    FillClip,
    StrokeClip,
    FillStrokeClip,
    Clip,
}

impl TextRenderMode {
    pub fn from_i64(value: i64) -> Option<Self> {
        Some(match value {
            0 => Self::Fill,
            1 => Self::Stroke,
            2 => Self::FillStroke,
            3 => Self::Invisible,
            4 => Self::FillClip,
            5 => Self::StrokeClip,
            6 => Self::FillStrokeClip,
            7 => Self::Clip,
            _ => return None,
        })
    }

    /// Whether glyphs shown in this mode leave marks on the page.
    pub fn is_visible(self) -> bool {
        !matches!(self, Self::Invisible | Self::Clip)
    }
}

/// Text parameters that belong to the graphics state.
#[derive(Debug, Clone, PartialEq)]
pub struct TextParams {
    /// `Tc`, in unscaled text space units.
    pub char_spacing: f64,
    /// `Tw`, applied to single-byte code 32 only.
    pub word_spacing: f64,
    /// `Tz`, as a percentage.
    pub h_scaling: f64,
    /// `TL`.
    pub leading: f64,
    /// Resource name from `Tf`, without the slash.
    pub font_name: String,
    pub font_size: f64,
    pub render_mode: TextRenderMode,
    /// `Ts`.
    pub rise: f64,
}

impl Default for TextParams {
    fn default() -> Self {
        Self {
            char_spacing: 0.0,
            word_spacing: 0.0,
            h_scaling: 100.0,
            leading: 0.0,
            font_name: String::new(),
            font_size: 0.0,
            render_mode: TextRenderMode::Fill,
            rise: 0.0,
        }
    }
}

impl TextParams {
    /// `Tz` as a fraction, 1.0 meaning unscaled.
    pub fn h_scale(&self) -> f64 {
        self.h_scaling / 100.0
    }

    /// Matrix mapping glyph space (already divided by 1000) to text space.
    pub fn font_matrix(&self) -> Ctm {
        Ctm::new(
            self.font_size * self.h_scale(),
            0.0,
            0.0,
            self.font_size,
            0.0,
            self.rise,
        )
    }
}

/// Full text state: parameters plus the BT/ET matrices.
#[derive(Debug, Clone, Default)]
pub struct TextState {
    pub params: TextParams,
    in_text_object: bool,
    text_matrix: Ctm,
    line_matrix: Ctm,
}

impl TextState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_text_object(&self) -> bool {
        self.in_text_object
    }

    pub fn text_matrix(&self) -> &Ctm {
        &self.text_matrix
    }

    /// `BT`
    pub fn begin_text(&mut self) {
        self.text_matrix = Ctm::identity();
        self.line_matrix = Ctm::identity();
        self.in_text_object = true;
    }

    /// `ET`
    pub fn end_text(&mut self) {
        self.in_text_object = false;
    }

    /// `Tm` replaces both matrices.
    pub fn set_text_matrix(&mut self, m: Ctm) {
        self.text_matrix = m;
        self.line_matrix = m;
    }

    /// `Td`
    pub fn move_text_position(&mut self, tx: f64, ty: f64) {
        self.line_matrix = Ctm::new(1.0, 0.0, 0.0, 1.0, tx, ty).concat(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    /// `TD` sets the leading to `-ty`, then moves like `Td`.
    pub fn move_text_position_and_set_leading(&mut self, tx: f64, ty: f64) {
        self.params.leading = -ty;
        self.move_text_position(tx, ty);
    }

    /// `T*`
    pub fn move_to_next_line(&mut self) {
        let leading = self.params.leading;
        self.move_text_position(0.0, -leading);
    }

    /// Move the text matrix right by `tx` text space units.
    pub fn advance(&mut self, tx: f64) {
        self.text_matrix = Ctm::new(1.0, 0.0, 0.0, 1.0, tx, 0.0).concat(&self.text_matrix);
    }
}
