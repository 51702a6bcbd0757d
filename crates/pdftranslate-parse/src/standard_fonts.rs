//! Built-in metrics for the standard Type1 fonts a viewer always has.
//!
//! Widths are Adobe AFM advance widths (1/1000 em) indexed by WinAnsi code,
//! starting at code 32. They back two things: measuring text that references
//! an unembedded standard font without `/Widths`, and measuring the Helvetica
//! fallback used for drawing when no TrueType font could be loaded.

use pdftranslate_core::FontStyle;

const FIRST_CODE: usize = 32;

/// One standard font's advance widths for WinAnsi codes 32..=255.
#[derive(Debug)]
pub struct StandardFont {
    /// PostScript base font name, as written to `/BaseFont`.
    pub base_name: &'static str,
    widths: [u16; 224],
    /// Typographic ascent and descent in 1/1000 em.
    pub ascent: f64,
    pub descent: f64,
}

impl StandardFont {
    /// Advance width of `code` in 1/1000 em; control codes are zero-width.
    pub fn width(&self, code: u8) -> f64 {
        let code = code as usize;
        if code < FIRST_CODE {
            return 0.0;
        }
        f64::from(self.widths[code - FIRST_CODE])
    }

    /// Width of WinAnsi-encoded `bytes` drawn at `size` points.
    pub fn text_width(&self, bytes: &[u8], size: f64) -> f64 {
        bytes.iter().map(|&b| self.width(b)).sum::<f64>() * size / 1000.0
    }
}

/// The Helvetica face used when no TrueType font is available.
pub fn helvetica(style: FontStyle) -> &'static StandardFont {
    match style {
        FontStyle::Regular => &HELVETICA,
        FontStyle::Bold => &HELVETICA_BOLD,
        FontStyle::Italic => &HELVETICA_OBLIQUE,
        FontStyle::BoldItalic => &HELVETICA_BOLD_OBLIQUE,
    }
}

/// Look up metrics for a font name as it appears in `/BaseFont`.
///
/// Subset prefixes (`ABCDEF+`) are ignored. The common metric-compatible
/// aliases (Arial, Times New Roman, Courier New) resolve to their standard
/// counterparts; oblique and italic faces share the upright widths, except
/// Courier which is monospaced anyway.
pub fn lookup(base_font: &str) -> Option<&'static StandardFont> {
    let name = strip_subset_prefix(base_font);
    let (family, style) = match name.split_once([',', '-']) {
        Some((family, style)) => (family, style),
        None => (name, ""),
    };
    let bold = style.contains("Bold");

    match family {
        "Helvetica" | "Arial" | "ArialMT" => Some(if bold { &HELVETICA_BOLD } else { &HELVETICA }),
        "Times" | "TimesNewRoman" | "TimesNewRomanPS" | "TimesNewRomanPSMT" => {
            Some(if bold { &TIMES_BOLD } else { &TIMES_ROMAN })
        }
        "Courier" | "CourierNew" | "CourierNewPSMT" => Some(&COURIER),
        _ => None,
    }
}

/// Remove a six-letter subset tag such as `ABCDEF+` from a font name.
pub fn strip_subset_prefix(name: &str) -> &str {
    match name.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.bytes().all(|b| b.is_ascii_uppercase()) => rest,
        _ => name,
    }
}

static COURIER: StandardFont = StandardFont {
    base_name: "Courier",
    widths: [600; 224],
    ascent: 629.0,
    descent: -157.0,
};

#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 224] = [
        278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
        556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
        1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
        667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
        333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
        556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, 0,
        556, 0, 222, 556, 333, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0, 611, 0,
        0, 222, 222, 333, 333, 350, 556, 1000, 333, 1000, 500, 333, 944, 0, 500, 667,
        278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333,
        400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611,
        667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
        722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
        556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278,
        556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 224] = [
        278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
        556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
        975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
        667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
        333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
        611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, 0,
        556, 0, 278, 556, 500, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0, 611, 0,
        0, 278, 278, 500, 500, 350, 556, 1000, 333, 1000, 556, 333, 944, 0, 500, 667,
        278, 333, 556, 556, 556, 556, 280, 556, 333, 737, 370, 556, 584, 333, 737, 333,
        400, 584, 333, 333, 333, 611, 556, 278, 333, 333, 365, 556, 834, 834, 834, 611,
        722, 722, 722, 722, 722, 722, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
        722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
        556, 556, 556, 556, 556, 556, 889, 556, 556, 556, 556, 556, 278, 278, 278, 278,
        611, 611, 611, 611, 611, 611, 611, 584, 611, 611, 611, 611, 611, 556, 611, 556,
];

static HELVETICA: StandardFont = StandardFont {
    base_name: "Helvetica",
    widths: HELVETICA_WIDTHS,
    ascent: 718.0,
    descent: -207.0,
};

static HELVETICA_OBLIQUE: StandardFont = StandardFont {
    base_name: "Helvetica-Oblique",
    widths: HELVETICA_WIDTHS,
    ascent: 718.0,
    descent: -207.0,
};

static HELVETICA_BOLD: StandardFont = StandardFont {
    base_name: "Helvetica-Bold",
    widths: HELVETICA_BOLD_WIDTHS,
    ascent: 718.0,
    descent: -207.0,
};

static HELVETICA_BOLD_OBLIQUE: StandardFont = StandardFont {
    base_name: "Helvetica-BoldOblique",
    widths: HELVETICA_BOLD_WIDTHS,
    ascent: 718.0,
    descent: -207.0,
};

#[rustfmt::skip]
static TIMES_ROMAN: StandardFont = StandardFont {
    base_name: "Times-Roman",
    widths: [
            250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
            500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
            921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
            556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
            333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
            500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541, 0,
            500, 0, 333, 500, 444, 1000, 500, 500, 333, 1000, 556, 333, 889, 0, 611, 0,
            0, 333, 333, 444, 444, 350, 500, 1000, 333, 980, 389, 333, 722, 0, 444, 722,
            250, 333, 500, 500, 500, 500, 200, 500, 333, 760, 276, 500, 564, 333, 760, 333,
            400, 564, 300, 300, 333, 500, 453, 250, 333, 300, 310, 500, 750, 750, 750, 444,
            722, 722, 722, 722, 722, 722, 889, 667, 611, 611, 611, 611, 333, 333, 333, 333,
            722, 722, 722, 722, 722, 722, 722, 564, 722, 722, 722, 722, 722, 722, 556, 500,
            444, 444, 444, 444, 444, 444, 667, 444, 444, 444, 444, 444, 278, 278, 278, 278,
            500, 500, 500, 500, 500, 500, 500, 564, 500, 500, 500, 500, 500, 500, 500, 500,
    ],
    ascent: 683.0,
    descent: -217.0,
};

#[rustfmt::skip]
static TIMES_BOLD: StandardFont = StandardFont {
    base_name: "Times-Bold",
    widths: [
            250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
            500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
            930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778,
            611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500,
            333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500,
            556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520, 0,
            500, 0, 333, 500, 500, 1000, 500, 500, 333, 1000, 556, 333, 1000, 0, 667, 0,
            0, 333, 333, 500, 500, 350, 500, 1000, 333, 1000, 389, 333, 722, 0, 444, 722,
            250, 333, 500, 500, 500, 500, 220, 500, 333, 747, 300, 500, 570, 333, 747, 333,
            400, 570, 300, 300, 333, 556, 540, 250, 333, 300, 330, 500, 750, 750, 750, 500,
            722, 722, 722, 722, 722, 722, 1000, 722, 667, 667, 667, 667, 389, 389, 389, 389,
            722, 722, 778, 778, 778, 778, 778, 570, 778, 722, 722, 722, 722, 722, 611, 556,
            500, 500, 500, 500, 500, 500, 722, 444, 444, 444, 444, 444, 278, 278, 278, 278,
            500, 556, 500, 500, 500, 500, 500, 570, 500, 556, 556, 556, 556, 500, 556, 500,
    ],
    ascent: 683.0,
    descent: -217.0,
};
