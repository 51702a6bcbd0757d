//! pdftranslate-core: Backend-independent data types and algorithms.
//!
//! This crate provides the geometry and text model (BBox, Char, Span, Line,
//! Segment, Block) and the algorithms of the translation engine that do not
//! touch a PDF: layout clustering, segmentation, text folding, background
//! estimation and font-size fitting.

pub mod background;
pub mod color;
pub mod error;
pub mod fit;
pub mod geometry;
pub mod layout;
pub mod sanitize;
pub mod segment;
pub mod text;

pub use background::{
    ColorSource, DARK_SAMPLE_THRESHOLD, SampleOptions, edge_sample_points, estimate_background,
};
pub use color::{MIN_TEXT_CONTRAST, Rgb, choose_text_color};
pub use error::PdfError;
pub use fit::{FitOptions, FitOutcome, FontSizeSteps, fit_font_size};
pub use geometry::{BBox, Ctm, Point};
pub use layout::{
    LayoutOptions, build_blocks, cluster_lines_into_blocks, cluster_spans_into_lines,
    group_chars_into_spans, sort_blocks_reading_order,
};
pub use sanitize::{Charset, fold_text, to_ascii};
pub use segment::{SegmentOptions, collapse_whitespace, extract_segments, is_skippable, split_line};
pub use text::{Block, Char, FLAG_BOLD, FLAG_ITALIC, FontStyle, Line, Segment, Span, StyleFlags};
