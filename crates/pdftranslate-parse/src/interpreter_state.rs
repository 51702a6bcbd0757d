//! Graphics state stack for the page interpreter.
//!
//! Only the parts of the graphics state that affect what ends up visible
//! under a text box are tracked: the CTM, the fill color, and the text
//! parameters. `q` pushes a copy, `Q` pops it.

use pdftranslate_core::{Ctm, Rgb};

use crate::text_state::TextParams;

/// Color space selected with `cs`, used to read `sc`/`scn` components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillSpace {
    /// No explicit space; components are read by count.
    #[default]
    Inferred,
    Gray,
    Rgb,
    Cmyk,
    /// Patterns, separations and other spaces that do not map to a flat color.
    Unsupported,
}

impl FillSpace {
    /// Map a color space name from a `cs` operand or a resolved resource.
    pub fn from_name(name: &str) -> Self {
        match name {
            "DeviceGray" | "G" | "CalGray" => FillSpace::Gray,
            "DeviceRGB" | "RGB" | "CalRGB" | "Lab" => FillSpace::Rgb,
            "DeviceCMYK" | "CMYK" => FillSpace::Cmyk,
            "Pattern" | "Separation" | "DeviceN" | "Indexed" => FillSpace::Unsupported,
            _ => FillSpace::Inferred,
        }
    }

    /// Initial color of a freshly selected space.
    fn initial_color(self) -> Rgb {
        Rgb::BLACK
    }
}

#[derive(Debug, Clone)]
struct Snapshot {
    ctm: Ctm,
    fill: Rgb,
    fill_space: FillSpace,
    text: TextParams,
}

/// CTM, fill color and the save stack.
#[derive(Debug, Clone)]
pub struct InterpreterState {
    ctm: Ctm,
    fill: Rgb,
    fill_space: FillSpace,
    stack: Vec<Snapshot>,
}

impl Default for InterpreterState {
    fn default() -> Self {
        Self::new(Ctm::identity())
    }
}

impl InterpreterState {
    pub fn new(ctm: Ctm) -> Self {
        Self {
            ctm,
            fill: Rgb::BLACK,
            fill_space: FillSpace::Inferred,
            stack: Vec::new(),
        }
    }

    pub fn ctm(&self) -> &Ctm {
        &self.ctm
    }

    pub fn fill_color(&self) -> Rgb {
        self.fill
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// `q`
    pub fn save(&mut self, text: &TextParams) {
        self.stack.push(Snapshot {
            ctm: self.ctm,
            fill: self.fill,
            fill_space: self.fill_space,
            text: text.clone(),
        });
    }

    /// `Q`. Returns `false` on an unbalanced restore, leaving state untouched.
    pub fn restore(&mut self, text: &mut TextParams) -> bool {
        let Some(saved) = self.stack.pop() else {
            return false;
        };
        self.ctm = saved.ctm;
        self.fill = saved.fill;
        self.fill_space = saved.fill_space;
        *text = saved.text;
        true
    }

    /// `cm`: the new matrix applies before the current CTM.
    pub fn concat(&mut self, m: Ctm) {
        self.ctm = m.concat(&self.ctm);
    }

    /// `g`
    pub fn set_fill_gray(&mut self, gray: f64) {
        self.fill_space = FillSpace::Gray;
        self.fill = Rgb::gray(gray);
    }

    /// `rg`
    pub fn set_fill_rgb(&mut self, r: f64, g: f64, b: f64) {
        self.fill_space = FillSpace::Rgb;
        self.fill = Rgb::new(r, g, b);
    }

    /// `k`
    pub fn set_fill_cmyk(&mut self, c: f64, m: f64, y: f64, k: f64) {
        self.fill_space = FillSpace::Cmyk;
        self.fill = Rgb::from_cmyk(c, m, y, k);
    }

    /// `cs`
    pub fn set_fill_space(&mut self, space: FillSpace) {
        self.fill_space = space;
        self.fill = space.initial_color();
    }

    /// `sc`/`scn`. Unsupported spaces keep the previous color.
    pub fn set_fill_components(&mut self, components: &[f64]) {
        let space = match (self.fill_space, components.len()) {
            (FillSpace::Unsupported, _) => return,
            (FillSpace::Inferred, 1) => FillSpace::Gray,
            (FillSpace::Inferred, 3) => FillSpace::Rgb,
            (FillSpace::Inferred, 4) => FillSpace::Cmyk,
            (FillSpace::Inferred, _) => return,
            (space, _) => space,
        };
        let color = match (space, components) {
            (FillSpace::Gray, [g, ..]) => Rgb::gray(*g),
            (FillSpace::Rgb, [r, g, b, ..]) => Rgb::new(*r, *g, *b),
            (FillSpace::Cmyk, [c, m, y, k, ..]) => Rgb::from_cmyk(*c, *m, *y, *k),
            _ => return,
        };
        self.fill = color;
    }
}
