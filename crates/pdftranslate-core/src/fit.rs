//! Single-line font-size fitting.

/// Options for shrinking text into a fixed-width box.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FitOptions {
    /// Multiplier applied to the size on each shrink step.
    pub shrink_factor: f64,
    /// Smallest size ever tried, in points.
    pub min_font_size: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            shrink_factor: 0.92,
            min_font_size: 6.0,
        }
    }
}

/// Candidate font sizes, largest first.
///
/// Yields `start`, then `start × factor`, and so on while the value stays
/// above the floor, then the floor exactly once. A start at or below the
/// floor yields only itself. Non-finite or non-positive starts yield nothing.
#[derive(Debug, Clone)]
pub struct FontSizeSteps {
    next: Option<f64>,
    factor: f64,
    floor: f64,
}

impl FontSizeSteps {
    pub fn new(start: f64, options: &FitOptions) -> Self {
        let valid = start.is_finite() && start > 0.0;
        // A factor outside (0, 1) would never reach the floor.
        let factor = if options.shrink_factor > 0.0 && options.shrink_factor < 1.0 {
            options.shrink_factor
        } else {
            FitOptions::default().shrink_factor
        };
        Self {
            next: valid.then_some(start),
            factor,
            floor: options.min_font_size,
        }
    }
}

impl Iterator for FontSizeSteps {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        let current = self.next?;
        self.next = if current <= self.floor {
            None
        } else {
            Some((current * self.factor).max(self.floor))
        };
        Some(current)
    }
}

/// Result of [`fit_font_size`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FitOutcome {
    /// The text fits on one line at this size.
    Fits(f64),
    /// The text overflows even at the smallest candidate size.
    Overflow,
}

impl FitOutcome {
    pub fn size(&self) -> Option<f64> {
        match self {
            FitOutcome::Fits(size) => Some(*size),
            FitOutcome::Overflow => None,
        }
    }
}

/// Find the largest candidate size at which `measure(size)` fits in `max_width`.
///
/// `measure` returns the drawn width of the text at the given size.
pub fn fit_font_size(
    start: f64,
    max_width: f64,
    options: &FitOptions,
    measure: impl Fn(f64) -> f64,
) -> FitOutcome {
    FontSizeSteps::new(start, options)
        .find(|&size| measure(size) <= max_width)
        .map_or(FitOutcome::Overflow, FitOutcome::Fits)
}
