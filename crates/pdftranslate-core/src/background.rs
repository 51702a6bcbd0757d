//! Estimating the fill color behind a text box from border samples.
//!
//! The sampling source is abstract: anything that can report the color at a
//! page point (a raster of the page, a test fixture) implements
//! [`ColorSource`].

use crate::color::Rgb;
use crate::geometry::{BBox, Point};

/// Brightness below which a sample is treated as ink rather than background.
pub const DARK_SAMPLE_THRESHOLD: f64 = 30.0 / 255.0;

/// Anything that can tell the color at a point in top-left page coordinates.
///
/// Returns `None` for points outside the sampled area.
pub trait ColorSource {
    fn color_at(&self, point: Point) -> Option<Rgb>;
}

/// Options for [`estimate_background`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SampleOptions {
    /// Distance the sampled border sits outside the bbox, in points.
    pub margin: f64,
    /// Evenly spaced points per edge, not counting corners.
    pub points_per_edge: usize,
    /// Number of brightness buckets used for clustering.
    pub buckets: usize,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            margin: 1.0,
            points_per_edge: 5,
            buckets: 8,
        }
    }
}

/// Corners and evenly spaced edge points of `bbox`, never its interior.
pub fn edge_sample_points(bbox: &BBox, points_per_edge: usize) -> Vec<Point> {
    let mut points = vec![
        Point::new(bbox.x0, bbox.top),
        Point::new(bbox.x1, bbox.top),
        Point::new(bbox.x0, bbox.bottom),
        Point::new(bbox.x1, bbox.bottom),
    ];
    for i in 1..=points_per_edge {
        let t = i as f64 / (points_per_edge + 1) as f64;
        let x = bbox.x0 + t * bbox.width();
        let y = bbox.top + t * bbox.height();
        points.push(Point::new(x, bbox.top));
        points.push(Point::new(x, bbox.bottom));
        points.push(Point::new(bbox.x0, y));
        points.push(Point::new(bbox.x1, y));
    }
    points
}

/// Estimate the background color around `bbox`.
///
/// Samples the border of the box grown by `options.margin`. Near-black
/// samples are dropped as glyph ink unless every sample is that dark. The
/// rest are bucketed by brightness and the mean of the fullest bucket wins.
/// Degenerate boxes, or boxes with no sample on the page, give white.
pub fn estimate_background(source: &dyn ColorSource, bbox: &BBox, options: &SampleOptions) -> Rgb {
    if bbox.is_degenerate() {
        return Rgb::WHITE;
    }
    let region = bbox.expand(options.margin);
    let samples: Vec<Rgb> = edge_sample_points(&region, options.points_per_edge)
        .into_iter()
        .filter_map(|p| source.color_at(p))
        .collect();
    if samples.is_empty() {
        return Rgb::WHITE;
    }

    let light: Vec<Rgb> = samples
        .iter()
        .copied()
        .filter(|c| c.brightness() >= DARK_SAMPLE_THRESHOLD)
        .collect();
    let kept = if light.is_empty() { samples } else { light };

    dominant_cluster(&kept, options.buckets).unwrap_or_else(|| mean(&kept))
}

fn dominant_cluster(samples: &[Rgb], buckets: usize) -> Option<Rgb> {
    if buckets == 0 {
        return None;
    }
    let mut groups: Vec<Vec<Rgb>> = vec![Vec::new(); buckets];
    for c in samples {
        let idx = ((c.brightness() * buckets as f64) as usize).min(buckets - 1);
        groups[idx].push(*c);
    }
    // Ties go to the brighter bucket.
    let largest = groups
        .iter()
        .enumerate()
        .max_by_key(|(i, g)| (g.len(), *i))
        .map(|(_, g)| g)?;
    (!largest.is_empty()).then(|| mean(largest))
}

fn mean(samples: &[Rgb]) -> Rgb {
    if samples.is_empty() {
        return Rgb::WHITE;
    }
    let n = samples.len() as f64;
    let (r, g, b) = samples
        .iter()
        .fold((0.0, 0.0, 0.0), |(r, g, b), c| (r + c.r, g + c.g, b + c.b));
    Rgb::new(r / n, g / n, b / n)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A page that is `base` everywhere except inside the listed boxes.
    struct Patches {
        width: f64,
        height: f64,
        base: Rgb,
        patches: Vec<(BBox, Rgb)>,
    }

    impl ColorSource for Patches {
        fn color_at(&self, p: Point) -> Option<Rgb> {
            if p.x < 0.0 || p.y < 0.0 || p.x > self.width || p.y > self.height {
                return None;
            }
            Some(
                self.patches
                    .iter()
                    .rev()
                    .find(|(b, _)| b.contains_point(p))
                    .map_or(self.base, |(_, c)| *c),
            )
        }
    }

    fn page(base: Rgb, patches: Vec<(BBox, Rgb)>) -> Patches {
        Patches {
            width: 612.0,
            height: 792.0,
            base,
            patches,
        }
    }

    #[test]
    fn edge_points_stay_on_border() {
        let bbox = BBox::new(10.0, 20.0, 110.0, 40.0);
        let points = edge_sample_points(&bbox, 3);
        assert_eq!(points.len(), 4 + 4 * 3);
        for p in points {
            let on_vertical = p.x == bbox.x0 || p.x == bbox.x1;
            let on_horizontal = p.y == bbox.top || p.y == bbox.bottom;
            assert!(on_vertical || on_horizontal, "{p:?}");
        }
    }

    #[test]
    fn solid_white_region_is_white() {
        let src = page(Rgb::WHITE, Vec::new());
        let c = estimate_background(&src, &BBox::new(100.0, 100.0, 300.0, 120.0), &SampleOptions::default());
        assert!(c.approx_eq(&Rgb::WHITE, 1e-6));
    }

    #[test]
    fn colored_cell_is_detected() {
        let blue = Rgb::new(0.2, 0.4, 0.8);
        let src = page(Rgb::WHITE, vec![(BBox::new(50.0, 50.0, 400.0, 200.0), blue)]);
        let c = estimate_background(&src, &BBox::new(100.0, 100.0, 300.0, 120.0), &SampleOptions::default());
        assert!(c.approx_eq(&blue, 1e-6));
    }

    #[test]
    fn dark_ink_touching_the_border_is_ignored() {
        let ink = BBox::new(95.0, 95.0, 110.0, 125.0);
        let src = page(Rgb::WHITE, vec![(ink, Rgb::BLACK)]);
        let c = estimate_background(&src, &BBox::new(100.0, 100.0, 300.0, 120.0), &SampleOptions::default());
        assert!(c.approx_eq(&Rgb::WHITE, 1e-6));
    }

    #[test]
    fn all_dark_samples_mean_dark_background() {
        let src = page(Rgb::gray(0.05), Vec::new());
        let c = estimate_background(&src, &BBox::new(100.0, 100.0, 300.0, 120.0), &SampleOptions::default());
        assert!(c.approx_eq(&Rgb::gray(0.05), 1e-6));
        assert!(c.is_dark());
    }

    #[test]
    fn majority_bucket_wins() {
        let gray = Rgb::gray(0.6);
        // Covers the left part of the border only.
        let src = page(Rgb::WHITE, vec![(BBox::new(0.0, 0.0, 120.0, 792.0), gray)]);
        let c = estimate_background(&src, &BBox::new(100.0, 100.0, 300.0, 120.0), &SampleOptions::default());
        assert!(c.approx_eq(&Rgb::WHITE, 1e-6));
    }

    #[test]
    fn degenerate_or_off_page_is_white() {
        let src = page(Rgb::gray(0.3), Vec::new());
        let opts = SampleOptions::default();
        assert_eq!(estimate_background(&src, &BBox::new(10.0, 10.0, 10.0, 30.0), &opts), Rgb::WHITE);
        assert_eq!(
            estimate_background(&src, &BBox::new(1000.0, 1000.0, 1100.0, 1020.0), &opts),
            Rgb::WHITE
        );
    }
}
