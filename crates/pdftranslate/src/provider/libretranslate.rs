//! A self-hosted LibreTranslate server.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::TranslationProvider;
use crate::error::TranslateError;

const NAME: &str = "libretranslate";

#[derive(Debug, Serialize)]
struct Request<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
    error: Option<String>,
}

pub struct LibreTranslateProvider {
    client: reqwest::Client,
    url: Option<String>,
    api_key: Option<String>,
}

impl LibreTranslateProvider {
    pub fn new(client: reqwest::Client, url: Option<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            url: url
                .map(|u| u.trim_end_matches('/').to_string())
                .filter(|u| !u.is_empty()),
            api_key,
        }
    }
}

#[async_trait]
impl TranslationProvider for LibreTranslateProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn is_available(&self) -> bool {
        self.url.is_some()
    }

    async fn translate(
        &self,
        text: &str,
        target: &str,
        source: &str,
    ) -> Result<String, TranslateError> {
        let Some(url) = &self.url else {
            return Err(TranslateError::Unavailable(NAME.to_string()));
        };
        // LibreTranslate detects the language itself when given "auto".
        let request = Request {
            q: text,
            source: if source.is_empty() { "auto" } else { source },
            target,
            format: "text",
            api_key: self.api_key.as_deref(),
        };
        let response = self
            .client
            .post(format!("{url}/translate"))
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TranslateError::Status {
                provider: NAME,
                status: status.as_u16(),
            });
        }
        let parsed: Response = response.json().await?;
        match (parsed.translated_text, parsed.error) {
            (Some(text), _) => Ok(text),
            (None, Some(message)) => Err(TranslateError::Api {
                provider: NAME,
                message,
            }),
            (None, None) => Err(TranslateError::Malformed {
                provider: NAME,
                message: "missing translatedText".into(),
            }),
        }
    }
}
