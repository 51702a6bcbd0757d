//! MyMemory (`api.mymemory.translated.net`), usable without credentials.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{TranslationProvider, explicit_source};
use crate::error::TranslateError;

const NAME: &str = "mymemory";
const ENDPOINT: &str = "https://api.mymemory.translated.net/get";
const MAX_ATTEMPTS: u32 = 3;

pub struct MyMemoryProvider {
    client: reqwest::Client,
    endpoint: String,
    /// Registered address; raises the daily quota.
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(rename = "responseStatus")]
    status: serde_json::Value,
    #[serde(rename = "responseDetails", default)]
    details: Option<String>,
    #[serde(rename = "responseData")]
    data: Option<ResponseData>,
}

#[derive(Debug, Deserialize)]
struct ResponseData {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
}

impl MyMemoryProvider {
    pub fn new(client: reqwest::Client, email: Option<String>) -> Self {
        Self {
            client,
            endpoint: ENDPOINT.to_string(),
            email,
        }
    }

    /// Point the provider at another endpoint (a proxy or a test server).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn request(&self, text: &str, langpair: &str) -> Result<String, TranslateError> {
        let mut query = vec![("q", text), ("langpair", langpair)];
        if let Some(email) = &self.email {
            query.push(("de", email.as_str()));
        }
        let response = self.client.get(&self.endpoint).query(&query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TranslateError::Status {
                provider: NAME,
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        parse_response(&body)
    }
}

/// Extract the translation from a response body.
fn parse_response(body: &str) -> Result<String, TranslateError> {
    let parsed: Response = serde_json::from_str(body).map_err(|e| TranslateError::Malformed {
        provider: NAME,
        message: e.to_string(),
    })?;
    // responseStatus comes back as a number or a numeric string.
    let code = match &parsed.status {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    };
    if code != Some(200) {
        return Err(TranslateError::Api {
            provider: NAME,
            message: parsed
                .details
                .unwrap_or_else(|| format!("responseStatus {}", parsed.status)),
        });
    }
    parsed
        .data
        .and_then(|d| d.translated_text)
        .ok_or_else(|| TranslateError::Malformed {
            provider: NAME,
            message: "missing responseData.translatedText".into(),
        })
}

#[async_trait]
impl TranslationProvider for MyMemoryProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn translate(
        &self,
        text: &str,
        target: &str,
        source: &str,
    ) -> Result<String, TranslateError> {
        let langpair = format!("{}|{target}", explicit_source(source));
        let mut attempt = 0;
        loop {
            match self.request(text, &langpair).await {
                Ok(translated) => return Ok(translated),
                Err(err) if err.is_transient() && attempt + 1 < MAX_ATTEMPTS => {
                    debug!(provider = NAME, attempt, error = %err, "retrying");
                    tokio::time::sleep(Duration::from_millis(500 * u64::from(attempt + 1))).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
