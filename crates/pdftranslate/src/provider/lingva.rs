//! Lingva, a Google Translate front end with several public instances.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use super::{TranslationProvider, explicit_source};
use crate::error::TranslateError;

const NAME: &str = "lingva";
const INSTANCE_TIMEOUT: Duration = Duration::from_secs(10);
const PUBLIC_INSTANCES: &[&str] = &[
    "https://lingva.ml",
    "https://translate.plausibility.cloud",
    "https://lingva.garuber.eu",
];

#[derive(Debug, Deserialize)]
struct Response {
    translation: Option<String>,
}

pub struct LingvaProvider {
    client: reqwest::Client,
    instances: Vec<String>,
}

impl LingvaProvider {
    /// `preferred` is tried before the public instances.
    pub fn new(client: reqwest::Client, preferred: Option<String>) -> Self {
        let instances = preferred
            .into_iter()
            .chain(PUBLIC_INSTANCES.iter().map(|s| s.to_string()))
            .filter(|s| !s.trim().is_empty())
            .collect();
        Self { client, instances }
    }

    /// Use exactly these instances.
    pub fn with_instances(client: reqwest::Client, instances: Vec<String>) -> Self {
        Self { client, instances }
    }

    async fn request(&self, url: Url) -> Result<String, TranslateError> {
        let response = self.client.get(url).timeout(INSTANCE_TIMEOUT).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TranslateError::Status {
                provider: NAME,
                status: status.as_u16(),
            });
        }
        let parsed: Response = response.json().await?;
        parsed.translation.ok_or_else(|| TranslateError::Malformed {
            provider: NAME,
            message: "missing translation".into(),
        })
    }
}

/// `{instance}/api/v1/{source}/{target}/{text}` with the text percent-encoded
/// as one path segment.
fn request_url(instance: &str, source: &str, target: &str, text: &str) -> Option<Url> {
    let mut url = Url::parse(instance).ok()?;
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .extend(["api", "v1", source, target, text]);
    Some(url)
}

#[async_trait]
impl TranslationProvider for LingvaProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn is_available(&self) -> bool {
        !self.instances.is_empty()
    }

    async fn translate(
        &self,
        text: &str,
        target: &str,
        source: &str,
    ) -> Result<String, TranslateError> {
        let source = explicit_source(source);
        let mut last = None;
        for instance in &self.instances {
            let Some(url) = request_url(instance, source, target, text) else {
                debug!(provider = NAME, instance = %instance, "invalid instance URL");
                continue;
            };
            match self.request(url).await {
                Ok(translated) => return Ok(translated),
                Err(err) => {
                    debug!(provider = NAME, instance = %instance, error = %err, "instance failed");
                    last = Some(err);
                }
            }
        }
        Err(last.unwrap_or_else(|| TranslateError::Unavailable(NAME.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_one_encoded_segment() {
        let url = request_url("https://lingva.ml/", "en", "tr", "a/b c?").unwrap();
        assert_eq!(url.as_str(), "https://lingva.ml/api/v1/en/tr/a%2Fb%20c%3F");
    }

    #[test]
    fn preferred_instance_comes_first() {
        let provider = LingvaProvider::new(reqwest::Client::new(), Some("http://local:3000".into()));
        assert_eq!(provider.instances[0], "http://local:3000");
        assert_eq!(provider.instances.len(), 1 + PUBLIC_INSTANCES.len());
    }

    #[tokio::test]
    async fn no_instances_means_unavailable() {
        let provider = LingvaProvider::with_instances(reqwest::Client::new(), vec![]);
        assert!(!provider.is_available().await);
    }
}
