//! Low-resolution page raster used for background sampling.

use pdftranslate_core::{ColorSource, Point, Rgb};
use pdftranslate_parse::{FillRegion, FillRule, PageScan};
use tiny_skia::{Color, Paint, PathBuilder, Pixmap, Transform};

/// Largest raster edge in pixels, whatever the page size.
const MAX_EDGE: f64 = 4096.0;

/// The page's filled paths painted on a white canvas.
///
/// Text and images are not drawn; sampling happens on a box border where
/// only the background matters.
pub struct PageRaster {
    pixmap: Pixmap,
    /// Pixels per point.
    scale: f64,
    x_origin: f64,
}

impl PageRaster {
    /// Rasterize `scan.fills`. Returns `None` for a page without area.
    pub fn render(scan: &PageScan, pixels_per_point: f64) -> Option<Self> {
        let longest = scan.width.max(scan.height);
        let has_area = longest > 0.0 && pixels_per_point > 0.0;
        if !has_area {
            return None;
        }
        let scale = pixels_per_point.min(MAX_EDGE / longest);
        let width = (scan.width * scale).ceil().max(1.0) as u32;
        let height = (scan.height * scale).ceil().max(1.0) as u32;
        let mut pixmap = Pixmap::new(width, height)?;
        pixmap.fill(Color::WHITE);

        let x_origin = scan.media_box[0];
        let transform = Transform::from_row(
            scale as f32,
            0.0,
            0.0,
            scale as f32,
            (-x_origin * scale) as f32,
            0.0,
        );
        for region in &scan.fills {
            paint_region(&mut pixmap, region, transform);
        }
        Some(Self {
            pixmap,
            scale,
            x_origin,
        })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }
}

fn paint_region(pixmap: &mut Pixmap, region: &FillRegion, transform: Transform) {
    let mut builder = PathBuilder::new();
    for subpath in &region.subpaths {
        let mut points = subpath.iter();
        let Some(first) = points.next() else {
            continue;
        };
        builder.move_to(first.x as f32, first.y as f32);
        for p in points {
            builder.line_to(p.x as f32, p.y as f32);
        }
        builder.close();
    }
    let Some(path) = builder.finish() else {
        return;
    };
    let [r, g, b] = region.color.to_rgb8();
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, 255);
    paint.anti_alias = false;
    let rule = match region.rule {
        FillRule::NonZero => tiny_skia::FillRule::Winding,
        FillRule::EvenOdd => tiny_skia::FillRule::EvenOdd,
    };
    pixmap.fill_path(&path, &paint, rule, transform, None);
}

impl ColorSource for PageRaster {
    fn color_at(&self, point: Point) -> Option<Rgb> {
        let x = ((point.x - self.x_origin) * self.scale).floor();
        let y = (point.y * self.scale).floor();
        if x < 0.0 || y < 0.0 {
            return None;
        }
        let pixel = self.pixmap.pixel(x as u32, y as u32)?.demultiply();
        Some(Rgb::from_rgb8(pixel.red(), pixel.green(), pixel.blue()))
    }
}
