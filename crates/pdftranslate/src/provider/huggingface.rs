//! Hugging Face inference router: OPUS models for common pairs, NLLB otherwise.

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{TranslationProvider, explicit_source};
use crate::error::TranslateError;

const NAME: &str = "huggingface";
const ENDPOINT: &str = "https://router.huggingface.co/hf-inference/models";
const NLLB_MODEL: &str = "facebook/nllb-200-distilled-600M";

/// Language pairs with a dedicated Helsinki-NLP OPUS-MT model.
const OPUS_PAIRS: &[(&str, &str)] = &[
    ("en", "tr"),
    ("tr", "en"),
    ("en", "de"),
    ("de", "en"),
    ("en", "fr"),
    ("fr", "en"),
    ("en", "es"),
    ("es", "en"),
    ("en", "it"),
    ("it", "en"),
    ("en", "ru"),
    ("ru", "en"),
    ("en", "ar"),
    ("ar", "en"),
    ("en", "zh"),
    ("zh", "en"),
    ("de", "tr"),
    ("tr", "de"),
    ("fr", "tr"),
    ("tr", "fr"),
];

/// ISO 639-1 to NLLB-200 language codes.
fn nllb_code(lang: &str) -> Option<&'static str> {
    Some(match lang {
        "en" => "eng_Latn",
        "tr" => "tur_Latn",
        "de" => "deu_Latn",
        "fr" => "fra_Latn",
        "es" => "spa_Latn",
        "it" => "ita_Latn",
        "ru" => "rus_Cyrl",
        "ar" => "arb_Arab",
        "zh" => "zho_Hans",
        "ja" => "jpn_Jpan",
        "ko" => "kor_Hang",
        "nl" => "nld_Latn",
        "pl" => "pol_Latn",
        "pt" => "por_Latn",
        "sv" => "swe_Latn",
        _ => return None,
    })
}

pub struct HuggingFaceProvider {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl HuggingFaceProvider {
    pub fn new(client: reqwest::Client, token: Option<String>) -> Self {
        Self {
            client,
            endpoint: ENDPOINT.to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Model and request body for a language pair.
fn build_request(text: &str, source: &str, target: &str) -> (String, Value) {
    let source = explicit_source(source);
    if OPUS_PAIRS.contains(&(source, target)) {
        let model = format!("Helsinki-NLP/opus-mt-{source}-{target}");
        return (model, json!({ "inputs": text }));
    }
    let body = json!({
        "inputs": text,
        "parameters": {
            "src_lang": nllb_code(source).unwrap_or("eng_Latn"),
            "tgt_lang": nllb_code(target).unwrap_or("tur_Latn"),
        },
    });
    (NLLB_MODEL.to_string(), body)
}

fn parse_response(status: u16, body: &str) -> Result<String, TranslateError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(TranslateError::Malformed {
            provider: NAME,
            message: "empty response".into(),
        });
    }
    if trimmed.starts_with('<') {
        return Err(TranslateError::Malformed {
            provider: NAME,
            message: "HTML error page".into(),
        });
    }
    if status == 503 {
        return Err(TranslateError::Api {
            provider: NAME,
            message: "model is loading".into(),
        });
    }
    if status != 200 {
        return Err(TranslateError::Status {
            provider: NAME,
            status,
        });
    }
    let value: Value = serde_json::from_str(trimmed).map_err(|e| TranslateError::Malformed {
        provider: NAME,
        message: e.to_string(),
    })?;
    if let Some(err) = value.get("error").and_then(Value::as_str) {
        return Err(TranslateError::Api {
            provider: NAME,
            message: err.to_string(),
        });
    }
    let item = match &value {
        Value::Array(items) => items.first(),
        other => Some(other),
    };
    item.and_then(|v| v.get("translation_text"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| TranslateError::Malformed {
            provider: NAME,
            message: "missing translation_text".into(),
        })
}

#[async_trait]
impl TranslationProvider for HuggingFaceProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn is_available(&self) -> bool {
        self.token.is_some()
    }

    async fn translate(
        &self,
        text: &str,
        target: &str,
        source: &str,
    ) -> Result<String, TranslateError> {
        let Some(token) = &self.token else {
            return Err(TranslateError::Unavailable(NAME.to_string()));
        };
        let (model, body) = build_request(text, source, target);
        let response = self
            .client
            .post(format!("{}/{model}", self.endpoint))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        parse_response(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opus_for_known_pairs() {
        let (model, body) = build_request("Hello", "auto", "tr");
        assert_eq!(model, "Helsinki-NLP/opus-mt-en-tr");
        assert_eq!(body, json!({ "inputs": "Hello" }));
    }

    #[test]
    fn nllb_for_other_pairs() {
        let (model, body) = build_request("Hallo", "de", "ja");
        assert_eq!(model, NLLB_MODEL);
        assert_eq!(body["parameters"]["src_lang"], "deu_Latn");
        assert_eq!(body["parameters"]["tgt_lang"], "jpn_Jpan");
    }

    #[test]
    fn response_shapes() {
        assert_eq!(
            parse_response(200, r#"[{"translation_text":"Merhaba"}]"#).unwrap(),
            "Merhaba"
        );
        assert_eq!(
            parse_response(200, r#"{"translation_text":"Hallo"}"#).unwrap(),
            "Hallo"
        );
        assert!(matches!(
            parse_response(200, r#"{"error":"rate limited"}"#),
            Err(TranslateError::Api { .. })
        ));
        assert!(matches!(
            parse_response(503, r#"{"error":"loading"}"#),
            Err(TranslateError::Api { .. })
        ));
        assert!(matches!(
            parse_response(502, "<!DOCTYPE html>"),
            Err(TranslateError::Malformed { .. })
        ));
        assert!(matches!(
            parse_response(401, r#"{"msg":"no"}"#),
            Err(TranslateError::Status { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn needs_a_token() {
        let provider = HuggingFaceProvider::new(reqwest::Client::new(), Some("  ".into()));
        assert!(!provider.is_available().await);
        assert!(matches!(
            provider.translate("x", "tr", "en").await,
            Err(TranslateError::Unavailable(_))
        ));
    }
}
