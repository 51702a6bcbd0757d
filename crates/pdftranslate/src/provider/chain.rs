//! Ordered failover across providers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::{TranslationProvider, providers_from_settings};
use crate::config::ProviderSettings;
use crate::error::TranslateError;

struct Entry {
    provider: Arc<dyn TranslationProvider>,
    /// Checked once, on first use.
    available: OnceCell<bool>,
}

/// Availability of one provider, as reported by [`ProviderChain::status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderStatus {
    pub name: String,
    pub available: bool,
}

/// Providers tried in priority order until one returns a translation.
pub struct ProviderChain {
    entries: Vec<Entry>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn TranslationProvider>>) -> Self {
        let entries = providers
            .into_iter()
            .map(|provider| Entry {
                provider,
                available: OnceCell::new(),
            })
            .collect();
        Self { entries }
    }

    /// The default HTTP providers, configured from `settings`.
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, TranslateError> {
        Ok(Self::new(providers_from_settings(settings)?))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Translate with the first provider that succeeds.
    ///
    /// Blank input is returned unchanged without calling anything.
    pub async fn translate(
        &self,
        text: &str,
        target: &str,
        source: &str,
    ) -> Result<String, TranslateError> {
        self.translate_within(text, target, source, None).await
    }

    /// Like [`Self::translate`], giving each provider at most `per_call`.
    ///
    /// A provider that runs out of time counts as failed and the next one
    /// is tried.
    pub async fn translate_within(
        &self,
        text: &str,
        target: &str,
        source: &str,
        per_call: Option<Duration>,
    ) -> Result<String, TranslateError> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }
        let mut last = None;
        for entry in &self.entries {
            let name = entry.provider.name();
            if !entry.is_available().await {
                debug!(provider = name, "skipping unavailable provider");
                continue;
            }
            let call = entry.provider.translate(text, target, source);
            let outcome = match per_call {
                Some(limit) => tokio::time::timeout(limit, call)
                    .await
                    .unwrap_or(Err(TranslateError::Timeout(limit))),
                None => call.await,
            };
            match outcome {
                Ok(translated) if !translated.trim().is_empty() => {
                    debug!(provider = name, "translated");
                    return Ok(translated);
                }
                Ok(_) => {
                    warn!(provider = name, "empty translation");
                    last = Some(TranslateError::Malformed {
                        provider: "chain",
                        message: format!("{name} returned an empty translation"),
                    });
                }
                Err(err) => {
                    warn!(provider = name, error = %err, "provider failed");
                    last = Some(err);
                }
            }
        }
        Err(TranslateError::Exhausted {
            last: last.map(Box::new),
        })
    }

    /// Availability of every provider, in order.
    pub async fn status(&self) -> Vec<ProviderStatus> {
        let mut statuses = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            statuses.push(ProviderStatus {
                name: entry.provider.name().to_string(),
                available: entry.is_available().await,
            });
        }
        statuses
    }
}

impl Entry {
    async fn is_available(&self) -> bool {
        *self
            .available
            .get_or_init(|| self.provider.is_available())
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    struct Fixed {
        name: &'static str,
        available: bool,
        reply: Option<&'static str>,
        calls: AtomicUsize,
        checks: AtomicUsize,
    }

    impl Fixed {
        fn new(name: &'static str, available: bool, reply: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                name,
                available,
                reply,
                calls: AtomicUsize::new(0),
                checks: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TranslationProvider for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        async fn is_available(&self) -> bool {
            self.checks.fetch_add(1, Ordering::SeqCst);
            self.available
        }

        async fn translate(&self, _: &str, _: &str, _: &str) -> Result<String, TranslateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.map(str::to_string).ok_or(TranslateError::Api {
                provider: "fixed",
                message: format!("{} failed", self.name),
            })
        }
    }

    fn chain_of(providers: &[&Arc<Fixed>]) -> ProviderChain {
        ProviderChain::new(
            providers
                .iter()
                .map(|p| Arc::clone(p) as Arc<dyn TranslationProvider>)
                .collect(),
        )
    }

    #[tokio::test]
    async fn falls_through_to_the_first_success() {
        let offline = Fixed::new("offline", false, Some("never"));
        let broken = Fixed::new("broken", true, None);
        let good = Fixed::new("good", true, Some("Merhaba"));
        let chain = chain_of(&[&offline, &broken, &good]);

        assert_eq!(chain.translate("Hello", "tr", "en").await.unwrap(), "Merhaba");
        assert_eq!(chain.translate("Hello", "tr", "en").await.unwrap(), "Merhaba");
        assert_eq!(offline.calls.load(Ordering::SeqCst), 0);
        assert_eq!(broken.calls.load(Ordering::SeqCst), 2);
        // availability is cached after the first call
        assert_eq!(broken.checks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_keeps_the_last_error() {
        let chain = chain_of(&[&Fixed::new("a", true, None), &Fixed::new("b", true, None)]);
        match chain.translate("Hello", "tr", "en").await {
            Err(TranslateError::Exhausted { last: Some(last) }) => {
                assert_eq!(last.to_string(), "fixed: b failed");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn blank_text_is_not_sent() {
        let provider = Fixed::new("a", true, Some("x"));
        let chain = chain_of(&[&provider]);
        assert_eq!(chain.translate("  ", "tr", "en").await.unwrap(), "  ");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_replies_do_not_count() {
        let chain = chain_of(&[&Fixed::new("blank", true, Some(" "))]);
        assert!(matches!(
            chain.translate("Hello", "tr", "en").await,
            Err(TranslateError::Exhausted { last: Some(_) })
        ));
    }

    /// Never answers within any reasonable deadline.
    struct Hanging;

    #[async_trait]
    impl TranslationProvider for Hanging {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn translate(&self, _: &str, _: &str, _: &str) -> Result<String, TranslateError> {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok("too late".into())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn a_hanging_provider_fails_over_to_the_next() {
        let good = Fixed::new("good", true, Some("Merhaba"));
        let chain = ProviderChain::new(vec![
            Arc::new(Hanging) as Arc<dyn TranslationProvider>,
            Arc::clone(&good) as Arc<dyn TranslationProvider>,
        ]);
        let translated = chain
            .translate_within("Hello", "tr", "en", Some(Duration::from_secs(30)))
            .await
            .unwrap();
        assert_eq!(translated, "Merhaba");
        assert_eq!(good.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeouts_are_reported_as_the_last_error() {
        let chain = ProviderChain::new(vec![Arc::new(Hanging) as Arc<dyn TranslationProvider>]);
        match chain
            .translate_within("Hello", "tr", "en", Some(Duration::from_secs(5)))
            .await
        {
            Err(TranslateError::Exhausted { last: Some(last) }) => {
                assert!(matches!(*last, TranslateError::Timeout(d) if d == Duration::from_secs(5)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn status_lists_every_provider() {
        let chain = chain_of(&[&Fixed::new("a", false, None), &Fixed::new("b", true, None)]);
        let status = chain.status().await;
        assert_eq!(
            status,
            vec![
                ProviderStatus {
                    name: "a".into(),
                    available: false
                },
                ProviderStatus {
                    name: "b".into(),
                    available: true
                },
            ]
        );
    }
}
