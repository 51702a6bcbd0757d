//! Translation providers and the failover chain that combines them.

mod chain;
mod huggingface;
mod libretranslate;
mod lingva;
mod mymemory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{ProviderKind, ProviderSettings};
use crate::error::TranslateError;

pub use chain::{ProviderChain, ProviderStatus};
pub use huggingface::HuggingFaceProvider;
pub use libretranslate::LibreTranslateProvider;
pub use lingva::LingvaProvider;
pub use mymemory::MyMemoryProvider;

/// Request timeout for providers that do not set their own.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A text translation service.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Whether the provider can be used at all (credentials, endpoint).
    /// Unavailable providers are skipped without being called.
    async fn is_available(&self) -> bool;

    /// Translate `text` from `source` (a language code or `auto`) to `target`.
    async fn translate(&self, text: &str, target: &str, source: &str)
    -> Result<String, TranslateError>;
}

/// Source language for services that cannot detect it.
pub(crate) fn explicit_source(source: &str) -> &str {
    if source.eq_ignore_ascii_case("auto") || source.is_empty() {
        "en"
    } else {
        source
    }
}

/// Build the provider list described by `settings`, in its priority order.
pub fn providers_from_settings(
    settings: &ProviderSettings,
) -> Result<Vec<Arc<dyn TranslationProvider>>, TranslateError> {
    let client = reqwest::Client::builder()
        .timeout(DEFAULT_REQUEST_TIMEOUT)
        .build()?;
    let providers = settings
        .order
        .iter()
        .map(|kind| -> Arc<dyn TranslationProvider> {
            match kind {
                ProviderKind::MyMemory => Arc::new(MyMemoryProvider::new(
                    client.clone(),
                    settings.mymemory_email.clone(),
                )),
                ProviderKind::HuggingFace => Arc::new(HuggingFaceProvider::new(
                    client.clone(),
                    settings.huggingface_token.clone(),
                )),
                ProviderKind::Lingva => {
                    Arc::new(LingvaProvider::new(client.clone(), settings.lingva_url.clone()))
                }
                ProviderKind::LibreTranslate => Arc::new(LibreTranslateProvider::new(
                    client.clone(),
                    settings.libretranslate_url.clone(),
                    settings.libretranslate_api_key.clone(),
                )),
            }
        })
        .collect();
    Ok(providers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_source_becomes_english() {
        assert_eq!(explicit_source("auto"), "en");
        assert_eq!(explicit_source(""), "en");
        assert_eq!(explicit_source("de"), "de");
    }

    #[tokio::test]
    async fn settings_order_is_kept() {
        let settings = ProviderSettings {
            order: vec![ProviderKind::Lingva, ProviderKind::MyMemory],
            ..ProviderSettings::default()
        };
        let providers = providers_from_settings(&settings).unwrap();
        let names: Vec<&str> = providers.iter().map(|p| p.name()).collect();
        assert_eq!(names, ["lingva", "mymemory"]);
    }
}
