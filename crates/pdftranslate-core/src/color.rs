//! RGB color values and the brightness/contrast rules used when repainting text.

/// Simple RGB color with components in [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

/// Minimum luminance difference for the original text color to stay readable.
pub const MIN_TEXT_CONTRAST: f64 = 0.4;

impl Rgb {
    pub const WHITE: Rgb = Rgb {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    pub const BLACK: Rgb = Rgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    /// Create a new color, clamping each component into [0.0, 1.0].
    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self {
            r: clamp_unit(r),
            g: clamp_unit(g),
            b: clamp_unit(b),
        }
    }

    pub fn gray(level: f64) -> Self {
        Self::new(level, level, level)
    }

    /// Naive CMYK to RGB conversion.
    pub fn from_cmyk(c: f64, m: f64, y: f64, k: f64) -> Self {
        Self::new(
            (1.0 - c) * (1.0 - k),
            (1.0 - m) * (1.0 - k),
            (1.0 - y) * (1.0 - k),
        )
    }

    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(
            f64::from(r) / 255.0,
            f64::from(g) / 255.0,
            f64::from(b) / 255.0,
        )
    }

    /// Unpack a `0xRRGGBB` integer.
    pub fn from_packed(packed: u32) -> Self {
        Self::from_rgb8(
            ((packed >> 16) & 0xFF) as u8,
            ((packed >> 8) & 0xFF) as u8,
            (packed & 0xFF) as u8,
        )
    }

    /// Pack into a `0xRRGGBB` integer.
    pub fn to_packed(&self) -> u32 {
        let [r, g, b] = self.to_rgb8();
        (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
    }

    pub fn to_rgb8(&self) -> [u8; 3] {
        [
            (self.r * 255.0).round() as u8,
            (self.g * 255.0).round() as u8,
            (self.b * 255.0).round() as u8,
        ]
    }

    /// Plain average of the three channels.
    pub fn brightness(&self) -> f64 {
        (self.r + self.g + self.b) / 3.0
    }

    /// Perceived luminance (Rec. 601 weights).
    pub fn luminance(&self) -> f64 {
        0.299 * self.r + 0.587 * self.g + 0.114 * self.b
    }

    pub fn is_dark(&self) -> bool {
        self.luminance() < 0.5
    }

    /// Approximate equality, used for background comparisons.
    pub fn approx_eq(&self, other: &Rgb, epsilon: f64) -> bool {
        (self.r - other.r).abs() <= epsilon
            && (self.g - other.g).abs() <= epsilon
            && (self.b - other.b).abs() <= epsilon
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::BLACK
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

/// Pick the color for redrawn text.
///
/// The original span color wins when it contrasts enough with the background;
/// otherwise text becomes black on light backgrounds and white on dark ones.
pub fn choose_text_color(original: Rgb, background: Rgb) -> Rgb {
    if (original.luminance() - background.luminance()).abs() >= MIN_TEXT_CONTRAST {
        original
    } else if background.is_dark() {
        Rgb::WHITE
    } else {
        Rgb::BLACK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_roundtrip_and_components() {
        let c = Rgb::from_packed(0xFF8000);
        assert_eq!(c.r, 1.0);
        assert!((c.g - 128.0 / 255.0).abs() < 1e-9);
        assert_eq!(c.b, 0.0);
        assert_eq!(c.to_packed(), 0xFF8000);
    }

    #[test]
    fn new_clamps_out_of_range() {
        let c = Rgb::new(-0.5, 1.5, f64::NAN);
        assert_eq!(c, Rgb::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn cmyk_black_and_white() {
        assert_eq!(Rgb::from_cmyk(0.0, 0.0, 0.0, 1.0), Rgb::BLACK);
        assert_eq!(Rgb::from_cmyk(0.0, 0.0, 0.0, 0.0), Rgb::WHITE);
    }

    #[test]
    fn text_color_keeps_contrasting_original() {
        let red = Rgb::new(0.8, 0.0, 0.0);
        assert_eq!(choose_text_color(red, Rgb::WHITE), red);
    }

    #[test]
    fn text_color_forces_black_on_light() {
        let pale = Rgb::new(0.9, 0.9, 0.9);
        assert_eq!(choose_text_color(pale, Rgb::WHITE), Rgb::BLACK);
    }

    #[test]
    fn text_color_forces_white_on_dark() {
        let navy = Rgb::new(0.0, 0.0, 0.3);
        assert_eq!(choose_text_color(Rgb::BLACK, navy), Rgb::WHITE);
    }
}
