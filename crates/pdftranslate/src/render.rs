//! Replacing a segment's text in place.
//!
//! Every decision is made up front in [`plan_segment`], without touching the
//! page. [`apply`] then embeds the fonts, erases every planned region and
//! only after that draws the new text, so no drawing can be covered by a
//! later erasure.

use pdftranslate_core::{
    BBox, FitOutcome, Point, Rgb, Segment, choose_text_color, collapse_whitespace, fit_font_size,
    fold_text,
};
use pdftranslate_parse::{PageEditor, Redaction};
use tracing::{debug, warn};

use crate::config::RenderOptions;
use crate::fonts::{PageRenderContext, ResolvedFont, encode_win_ansi};

/// What gets drawn in place of one segment.
#[derive(Debug, Clone)]
pub struct RenderPlan {
    pub segment: Segment,
    /// The translation with whitespace collapsed, before folding.
    pub translated: String,
    pub background: Rgb,
    pub font: ResolvedFont,
    /// Area erased before drawing: the segment bbox plus the erase margin.
    pub erase: BBox,
    /// Folded text that will be drawn.
    pub text: String,
    pub size: f64,
    pub color: Rgb,
    /// True when the translation did not fit and the original text is drawn.
    pub fallback: bool,
}

impl RenderPlan {
    /// WinAnsi bytes of [`RenderPlan::text`].
    pub fn bytes(&self) -> Vec<u8> {
        encode_win_ansi(&self.text)
    }

    pub fn origin(&self) -> Point {
        self.segment.origin()
    }

    /// The same plan computed for another font.
    pub fn with_font(&self, font: ResolvedFont, options: &RenderOptions) -> Option<RenderPlan> {
        plan_segment(&self.segment, &self.translated, font, self.background, options)
    }
}

/// Decide how `segment` is redrawn with `translated`.
///
/// Returns `None` when the segment should be left untouched: the
/// translation is empty or equal to the source, or neither the translation
/// nor the original text fits on one line in the box.
pub fn plan_segment(
    segment: &Segment,
    translated: &str,
    font: ResolvedFont,
    background: Rgb,
    options: &RenderOptions,
) -> Option<RenderPlan> {
    let translated = collapse_whitespace(translated);
    if translated.is_empty() || translated == collapse_whitespace(&segment.text) {
        debug!(segment = segment.index, "translation unchanged, skipping");
        return None;
    }
    let origin = segment.origin();
    let max_width = (segment.bbox.x1 - origin.x).max(0.0);
    let start = segment.avg_font_size();
    let charset = font.charset();

    let fit = |text: &str| {
        let bytes = encode_win_ansi(text);
        fit_font_size(start, max_width, &options.fit, |size| {
            font.text_width(&bytes, size)
        })
    };

    let folded = fold_text(&translated, charset);
    let (text, size, fallback) = match fit(&folded) {
        FitOutcome::Fits(size) => (folded, size, false),
        FitOutcome::Overflow => {
            let original = fold_text(&collapse_whitespace(&segment.text), charset);
            match fit(&original) {
                FitOutcome::Fits(size) => {
                    debug!(segment = segment.index, "translation overflows, keeping original");
                    (original, size, true)
                }
                FitOutcome::Overflow => {
                    debug!(segment = segment.index, "nothing fits, leaving segment alone");
                    return None;
                }
            }
        }
    };

    Some(RenderPlan {
        segment: segment.clone(),
        translated,
        background,
        erase: segment.bbox.expand(options.erase_margin),
        color: choose_text_color(segment.color(), background),
        font,
        text,
        size,
        fallback,
    })
}

/// Counts from [`apply`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    /// Segments erased and redrawn.
    pub rendered: usize,
    /// Of those, segments redrawn with their original text.
    pub fallbacks: usize,
    /// Glyphs removed from the content stream.
    pub glyphs_removed: usize,
}

/// Embed fonts, erase all planned regions, then draw all planned text.
///
/// A plan whose font cannot be embedded is recomputed with the built-in
/// Helvetica; if that fails too the segment is left as it was.
pub fn apply(
    editor: &mut PageEditor<'_, '_>,
    ctx: &mut PageRenderContext,
    plans: Vec<RenderPlan>,
    options: &RenderOptions,
) -> ApplyStats {
    let mut ready = Vec::with_capacity(plans.len());
    for plan in plans {
        match ctx.ensure_font(editor, &plan.font) {
            Ok(()) => ready.push(plan),
            Err(err) => {
                warn!(font = plan.font.key(), error = %err, "font embedding failed, using Helvetica");
                let fallback = ResolvedFont::builtin(plan.font.style());
                let Some(replanned) = plan.with_font(fallback, options) else {
                    continue;
                };
                match ctx.ensure_font(editor, &replanned.font) {
                    Ok(()) => ready.push(replanned),
                    Err(err) => {
                        warn!(segment = plan.segment.index, error = %err, "no usable font, segment untouched")
                    }
                }
            }
        }
    }

    let redactions: Vec<Redaction> = ready
        .iter()
        .map(|plan| Redaction {
            rect: plan.erase,
            fill: Some(plan.background),
        })
        .collect();
    let glyphs_removed = editor.redact(&redactions);

    for plan in &ready {
        editor.draw_text(
            plan.font.key(),
            plan.size,
            plan.color,
            plan.origin(),
            &plan.bytes(),
        );
    }

    ApplyStats {
        rendered: ready.len(),
        fallbacks: ready.iter().filter(|p| p.fallback).count(),
        glyphs_removed,
    }
}
