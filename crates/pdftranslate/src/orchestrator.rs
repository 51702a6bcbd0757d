//! Batched, concurrent translation of page segments.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use pdftranslate_core::{Segment, is_skippable};
use tracing::{debug, warn};

use crate::cache::TranslationCache;
use crate::config::OrchestratorOptions;
use crate::error::TranslateError;
use crate::provider::ProviderChain;

/// Dispatches texts to a [`ProviderChain`] through a [`TranslationCache`].
pub struct Orchestrator {
    chain: Arc<ProviderChain>,
    cache: Arc<TranslationCache>,
    options: OrchestratorOptions,
}

impl Orchestrator {
    pub fn new(
        chain: Arc<ProviderChain>,
        cache: Arc<TranslationCache>,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            chain,
            cache,
            options,
        }
    }

    pub fn options(&self) -> &OrchestratorOptions {
        &self.options
    }

    /// Translate one text, consulting the cache first. Each provider gets
    /// its own call timeout, so one that hangs does not starve the rest.
    pub async fn translate_one(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslateError> {
        if let Some(hit) = self.cache.get(source, target, text) {
            return Ok(hit);
        }
        let translated = self
            .chain
            .translate_within(text, target, source, Some(self.options.call_timeout()))
            .await?;
        self.cache.insert(source, target, text, translated.clone());
        Ok(translated)
    }

    /// Translate `texts`; the result is index-aligned with the input and holds
    /// `None` wherever every provider failed.
    pub async fn translate_batch(
        &self,
        texts: &[String],
        source: &str,
        target: &str,
    ) -> Vec<Option<String>> {
        let mut results = vec![None; texts.len()];
        let batch_size = self.options.batch_size.max(1);
        let workers = self.options.workers.max(1);
        for (batch_no, chunk) in texts.chunks(batch_size).enumerate() {
            let offset = batch_no * batch_size;
            let done: Vec<(usize, Option<String>)> = stream::iter(chunk.iter().enumerate())
                .map(|(i, text)| async move {
                    let index = offset + i;
                    match self.translate_one(text, source, target).await {
                        Ok(translated) => (index, Some(translated)),
                        Err(err) => {
                            warn!(index, error = %err, "translation failed, keeping original");
                            (index, None)
                        }
                    }
                })
                .buffer_unordered(workers)
                .collect()
                .await;
            debug!(batch = batch_no, size = chunk.len(), "batch finished");
            for (index, translated) in done {
                results[index] = translated;
            }
        }
        results
    }

    /// Translate every segment that carries words.
    ///
    /// Keys are [`Segment::index`]; failed and skipped segments are absent.
    pub async fn translate_segments(
        &self,
        segments: &[Segment],
        source: &str,
        target: &str,
    ) -> HashMap<usize, String> {
        let wanted: Vec<&Segment> = segments.iter().filter(|s| !is_skippable(&s.text)).collect();
        let texts: Vec<String> = wanted.iter().map(|s| s.text.clone()).collect();
        let translated = self.translate_batch(&texts, source, target).await;
        wanted
            .into_iter()
            .zip(translated)
            .filter_map(|(segment, text)| text.map(|t| (segment.index, t)))
            .collect()
    }
}
