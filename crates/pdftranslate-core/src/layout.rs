//! Rebuilds the span → line → block tree from a flat glyph stream.

use crate::geometry::BBox;
use crate::text::{Block, Char, Line, Span, union_all};

/// Options for grouping glyphs into spans, lines and blocks.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayoutOptions {
    /// A horizontal gap of at least this fraction of the font size starts a new span.
    pub span_gap_ratio: f64,
    /// Maximum baseline difference (in points) for spans on the same line.
    pub y_tolerance: f64,
    /// Maximum vertical gap between lines to group into the same block (in points).
    pub y_density: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            span_gap_ratio: 0.25,
            y_tolerance: 3.0,
            y_density: 10.0,
        }
    }
}

/// Run the full grouping: glyphs → spans → lines → blocks (reading order).
pub fn build_blocks(chars: &[Char], options: &LayoutOptions) -> Vec<Block> {
    let spans = group_chars_into_spans(chars, options.span_gap_ratio);
    let lines = cluster_spans_into_lines(spans, options.y_tolerance);
    let mut blocks = cluster_lines_into_blocks(lines, options.y_density);
    sort_blocks_reading_order(&mut blocks);
    blocks
}

/// Group consecutive glyphs (content stream order) into styled runs.
///
/// A run continues while font, size, color, style and baseline stay the same
/// and the next glyph starts close to where the previous one ended. Runs made
/// only of whitespace are dropped; whitespace glyphs do not extend a run's bbox.
pub fn group_chars_into_spans(chars: &[Char], span_gap_ratio: f64) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut current: Vec<&Char> = Vec::new();

    for ch in chars {
        if let Some(prev) = current.last() {
            if !continues_span(prev, ch, span_gap_ratio) {
                spans.extend(make_span(&current));
                current.clear();
            }
        }
        current.push(ch);
    }
    spans.extend(make_span(&current));
    spans
}

fn continues_span(prev: &Char, next: &Char, span_gap_ratio: f64) -> bool {
    let size = prev.size.max(next.size);
    if prev.fontname != next.fontname
        || (prev.size - next.size).abs() > 0.01
        || prev.color != next.color
        || prev.flags != next.flags
    {
        return false;
    }
    if (prev.origin.y - next.origin.y).abs() > 0.1 * size {
        return false;
    }
    let gap = next.bbox.x0 - prev.bbox.x1;
    gap > -0.5 * size && gap < span_gap_ratio * size
}

fn make_span(chars: &[&Char]) -> Option<Span> {
    let first_ink = chars.iter().position(|c| !is_blank(c))?;
    let first = chars[first_ink];
    let bbox = union_all(chars.iter().filter(|c| !is_blank(c)).map(|c| c.bbox))?;
    let text: String = chars.iter().map(|c| c.text.as_str()).collect();
    Some(Span {
        text,
        bbox,
        font_name: first.fontname.clone(),
        font_size: first.size,
        color: first.color,
        flags: first.flags,
        origin: first.origin,
    })
}

fn is_blank(ch: &Char) -> bool {
    ch.text.chars().all(char::is_whitespace)
}

/// Cluster spans into lines by baseline proximity.
///
/// Spans whose baselines are within `y_tolerance` of a line's first baseline
/// belong to that line. Lines are returned top to bottom.
pub fn cluster_spans_into_lines(spans: Vec<Span>, y_tolerance: f64) -> Vec<Line> {
    let mut sorted = spans;
    sorted.sort_by(|a, b| {
        a.origin
            .y
            .total_cmp(&b.origin.y)
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });

    let mut rows: Vec<(f64, Vec<Span>)> = Vec::new();
    for span in sorted {
        match rows
            .iter_mut()
            .find(|(baseline, _)| (span.origin.y - *baseline).abs() <= y_tolerance)
        {
            Some((_, members)) => members.push(span),
            None => rows.push((span.origin.y, vec![span])),
        }
    }

    let mut lines: Vec<Line> = rows
        .into_iter()
        .filter_map(|(_, spans)| Line::from_spans(spans))
        .collect();
    lines.sort_by(|a, b| a.bbox.top.total_cmp(&b.bbox.top));
    lines
}

/// Cluster lines into blocks based on x-overlap, vertical proximity and style.
///
/// A line joins the closest block above it (gap <= `y_density`) whose last
/// line has the same font name and rounded size, so headings never merge
/// with body text.
pub fn cluster_lines_into_blocks(lines: Vec<Line>, y_density: f64) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();

    for line in lines {
        let mut best_block: Option<usize> = None;
        let mut best_gap = f64::INFINITY;

        for (i, block) in blocks.iter().enumerate() {
            let gap = line.bbox.top - block.bbox.bottom;
            let same_style = block
                .lines
                .last()
                .is_some_and(|last| last.style_key() == line.style_key());
            if gap >= -0.5
                && gap <= y_density
                && same_style
                && has_x_overlap(&line.bbox, &block.bbox)
                && gap < best_gap
            {
                best_gap = gap;
                best_block = Some(i);
            }
        }

        match best_block {
            Some(idx) => {
                blocks[idx].bbox = blocks[idx].bbox.union(&line.bbox);
                blocks[idx].lines.push(line);
            }
            None => blocks.push(Block {
                bbox: line.bbox,
                lines: vec![line],
            }),
        }
    }

    for block in &mut blocks {
        block
            .lines
            .sort_by(|a, b| a.bbox.top.total_cmp(&b.bbox.top));
    }

    blocks
}

fn has_x_overlap(a: &BBox, b: &BBox) -> bool {
    a.x0 < b.x1 && b.x0 < a.x1
}

/// Sort blocks top-to-bottom, then left-to-right.
pub fn sort_blocks_reading_order(blocks: &mut [Block]) {
    blocks.sort_by(|a, b| {
        a.bbox
            .top
            .total_cmp(&b.bbox.top)
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });
}
