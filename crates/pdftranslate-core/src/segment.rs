//! Splits lines into column-safe segments and filters out untranslatable ones.

use crate::text::{Block, Line, Segment, Span, union_all};

/// Options controlling how lines are split into segments.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SegmentOptions {
    /// A gap of at least `split_gap_ratio × average font size` between spans splits the line.
    pub split_gap_ratio: f64,
    /// A smaller gap of at least `space_gap_ratio × average font size` inserts a space.
    pub space_gap_ratio: f64,
    /// Segments whose trimmed text has fewer characters are skipped.
    pub min_chars: usize,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            split_gap_ratio: 1.1,
            space_gap_ratio: 0.25,
            min_chars: 2,
        }
    }
}

/// Produce the translatable segments of a page, in document order.
///
/// Blocks are visited in order, lines top to bottom, spans left to right.
/// Segments that are too short or contain no words are dropped, and the
/// survivors are numbered consecutively.
pub fn extract_segments(blocks: &[Block], options: &SegmentOptions) -> Vec<Segment> {
    let mut segments = Vec::new();

    for (block_idx, block) in blocks.iter().enumerate() {
        let mut lines: Vec<&Line> = block.lines.iter().collect();
        lines.sort_by(|a, b| a.bbox.top.total_cmp(&b.bbox.top));

        for (line_idx, line) in lines.into_iter().enumerate() {
            for mut segment in split_line(line, options) {
                if should_skip(&segment.text, options.min_chars) {
                    continue;
                }
                segment.index = segments.len();
                segment.block = block_idx;
                segment.line = line_idx;
                segments.push(segment);
            }
        }
    }

    segments
}

/// Split a line wherever the horizontal gap between consecutive spans reaches the threshold.
///
/// Returned segments carry index 0; [`extract_segments`] assigns final positions.
pub fn split_line(line: &Line, options: &SegmentOptions) -> Vec<Segment> {
    let mut spans: Vec<&Span> = line.spans.iter().collect();
    spans.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));

    let avg_size = line.avg_font_size();
    let split_at = options.split_gap_ratio * avg_size;
    let space_at = options.space_gap_ratio * avg_size;

    let mut groups: Vec<Vec<&Span>> = Vec::new();
    for span in spans {
        match groups.last_mut() {
            Some(group) if horizontal_gap(group, span) < split_at => group.push(span),
            _ => groups.push(vec![span]),
        }
    }

    groups
        .into_iter()
        .filter_map(|group| make_segment(&group, space_at))
        .collect()
}

fn horizontal_gap(group: &[&Span], next: &Span) -> f64 {
    let right = group
        .iter()
        .map(|s| s.bbox.x1)
        .fold(f64::NEG_INFINITY, f64::max);
    next.bbox.x0 - right
}

fn make_segment(group: &[&Span], space_at: f64) -> Option<Segment> {
    let bbox = union_all(group.iter().map(|s| s.bbox))?;
    let mut text = String::new();
    let mut prev: Option<&Span> = None;

    for span in group {
        if let Some(p) = prev {
            let gap = span.bbox.x0 - p.bbox.x1;
            let already_spaced = text.ends_with(char::is_whitespace)
                || span.text.starts_with(char::is_whitespace);
            if gap >= space_at && !already_spaced {
                text.push(' ');
            }
        }
        text.push_str(&span.text);
        prev = Some(span);
    }

    Some(Segment {
        index: 0,
        block: 0,
        line: 0,
        spans: group.iter().map(|s| (*s).clone()).collect(),
        bbox,
        text: collapse_whitespace(&text),
    })
}

/// Trim and collapse every whitespace run to a single space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn should_skip(text: &str, min_chars: usize) -> bool {
    text.trim().chars().count() < min_chars || is_skippable(text)
}

/// True when `text` holds nothing worth translating: only digits,
/// punctuation, currency symbols and whitespace (or nothing at all).
pub fn is_skippable(text: &str) -> bool {
    text.chars().all(|c| {
        c.is_whitespace()
            || c.is_numeric()
            || c.is_ascii_punctuation()
            || is_currency(c)
            || is_general_punctuation(c)
    })
}

fn is_currency(c: char) -> bool {
    matches!(c, '\u{00A2}'..='\u{00A5}' | '\u{20A0}'..='\u{20CF}')
}

fn is_general_punctuation(c: char) -> bool {
    matches!(
        c,
        '\u{00A1}' | '\u{00A7}' | '\u{00AB}' | '\u{00B0}' | '\u{00B1}' | '\u{00B7}' | '\u{00BB}'
            | '\u{00BF}' | '\u{00D7}' | '\u{00F7}' | '\u{2010}'..='\u{2027}' | '\u{2030}'..='\u{205E}'
    )
}
