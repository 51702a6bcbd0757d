//! The document pipeline: scan, segment, translate, plan, redact, draw.

use std::sync::Arc;

use pdftranslate_core::{PdfError, Rgb, build_blocks, estimate_background, extract_segments};
use pdftranslate_parse::PdfDocument;
use tracing::{debug, info};

use crate::cache::TranslationCache;
use crate::config::TranslatorConfig;
use crate::fonts::{FontResolver, PageRenderContext};
use crate::orchestrator::Orchestrator;
use crate::provider::{ProviderChain, ProviderStatus};
use crate::raster::PageRaster;
use crate::render::{RenderPlan, apply, plan_segment};

/// Page progress callback, called with `(page_number, total_pages)`, 1-based.
pub type ProgressFn<'a> = dyn Fn(usize, usize) + Send + Sync + 'a;

/// What happened on one page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslationReport {
    /// 1-based page number.
    pub page: usize,
    /// Segments found on the page, skippable ones included.
    pub segments: usize,
    /// Segments a provider returned a translation for.
    pub translated: usize,
    /// Segments erased and redrawn.
    pub rendered: usize,
    /// Redrawn segments that kept their original text because the
    /// translation did not fit.
    pub fallbacks: usize,
}

/// Translates PDF documents in place.
///
/// Holds the provider chain, the result cache and the font cache, so one
/// translator should be reused across documents.
pub struct PdfTranslator {
    config: TranslatorConfig,
    chain: Arc<ProviderChain>,
    cache: Arc<TranslationCache>,
    fonts: Arc<FontResolver>,
}

impl PdfTranslator {
    /// A translator using the HTTP providers described by `config.providers`.
    pub fn new(config: TranslatorConfig) -> Result<Self, PdfError> {
        let chain = ProviderChain::from_settings(&config.providers)
            .map_err(|e| PdfError::TranslationError(e.to_string()))?;
        Ok(Self::with_providers(config, chain))
    }

    /// A translator using a caller-supplied provider chain.
    pub fn with_providers(config: TranslatorConfig, chain: ProviderChain) -> Self {
        let fonts = FontResolver::new(config.fonts.clone());
        Self {
            config,
            chain: Arc::new(chain),
            cache: TranslationCache::global(),
            fonts: Arc::new(fonts),
        }
    }

    /// Use a private result cache instead of the process-wide one.
    pub fn with_cache(mut self, cache: Arc<TranslationCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Replace the font resolver, e.g. one with bundled faces registered.
    pub fn with_font_resolver(mut self, fonts: FontResolver) -> Self {
        self.fonts = Arc::new(fonts);
        self
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<TranslationCache> {
        &self.cache
    }

    /// Availability of every configured provider.
    pub async fn provider_status(&self) -> Vec<ProviderStatus> {
        self.chain.status().await
    }

    /// Translate `input` from `source` (a language code or `auto`) to `target`.
    ///
    /// Returns a complete document or an error, never a partial one. Segments
    /// that could not be translated keep their original text. If nothing was
    /// changed the input bytes come back unchanged.
    pub async fn translate_pdf(
        &self,
        input: &[u8],
        source: &str,
        target: &str,
        progress: Option<&ProgressFn<'_>>,
    ) -> Result<Vec<u8>, PdfError> {
        self.translate_pdf_with_report(input, source, target, progress)
            .await
            .map(|(output, _)| output)
    }

    /// Like [`Self::translate_pdf`], also returning one report per page.
    pub async fn translate_pdf_with_report(
        &self,
        input: &[u8],
        source: &str,
        target: &str,
        progress: Option<&ProgressFn<'_>>,
    ) -> Result<(Vec<u8>, Vec<TranslationReport>), PdfError> {
        let mut doc = PdfDocument::open(input)?;
        let total = doc.page_count();
        let orchestrator = Orchestrator::new(
            Arc::clone(&self.chain),
            Arc::clone(&self.cache),
            self.config.orchestrator.clone(),
        );
        let mut reports = Vec::with_capacity(total);
        let mut modified = false;

        for index in 0..total {
            let (report, changed) = self
                .translate_page(&mut doc, &orchestrator, index, source, target)
                .await?;
            info!(
                page = report.page,
                segments = report.segments,
                translated = report.translated,
                rendered = report.rendered,
                fallbacks = report.fallbacks,
                "page done"
            );
            modified |= changed;
            reports.push(report);
            if let Some(progress) = progress {
                progress(index + 1, total);
            }
        }

        let output = if modified {
            doc.save()?
        } else {
            debug!("no page changed, returning input unchanged");
            input.to_vec()
        };
        Ok((output, reports))
    }

    async fn translate_page(
        &self,
        doc: &mut PdfDocument,
        orchestrator: &Orchestrator,
        index: usize,
        source: &str,
        target: &str,
    ) -> Result<(TranslationReport, bool), PdfError> {
        let scan = doc.scan_page(index)?;
        let blocks = build_blocks(&scan.chars(), &self.config.layout);
        let segments = extract_segments(&blocks, &self.config.segment);
        let translations = orchestrator
            .translate_segments(&segments, source, target)
            .await;
        let mut report = TranslationReport {
            page: index + 1,
            segments: segments.len(),
            translated: translations.len(),
            ..TranslationReport::default()
        };
        if translations.is_empty() {
            return Ok((report, false));
        }

        let render = &self.config.render;
        let raster = PageRaster::render(&scan, render.pixels_per_point);
        let plans: Vec<RenderPlan> = segments
            .iter()
            .filter_map(|segment| {
                let translated = translations.get(&segment.index)?;
                let background = raster
                    .as_ref()
                    .map(|r| estimate_background(r, &segment.bbox, &render.sample))
                    .unwrap_or(Rgb::WHITE);
                let font = self.fonts.resolve(segment.style());
                plan_segment(segment, translated, font, background, render)
            })
            .collect();
        if plans.is_empty() {
            return Ok((report, false));
        }

        let mut ctx = PageRenderContext::new(index);
        let mut editor = doc.editor(index, &scan)?;
        let stats = apply(&mut editor, &mut ctx, plans, render);
        let changed = editor.commit()?;
        report.rendered = stats.rendered;
        report.fallbacks = stats.fallbacks;
        Ok((report, changed))
    }

    /// Blocking wrapper around [`Self::translate_pdf`] on a private runtime.
    ///
    /// Must not be called from inside an async runtime.
    pub fn translate_pdf_blocking(
        &self,
        input: &[u8],
        source: &str,
        target: &str,
        progress: Option<&ProgressFn<'_>>,
    ) -> Result<Vec<u8>, PdfError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| PdfError::TranslationError(format!("cannot start runtime: {e}")))?;
        runtime.block_on(self.translate_pdf(input, source, target, progress))
    }
}
