//! Errors raised by translation providers.
//!
//! None of these are fatal to a document: the orchestrator logs them and the
//! affected segment keeps its original text.

use std::time::Duration;

use thiserror::Error;

/// A failed call to a translation provider.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// Transport failure: connection refused, DNS, TLS, body read.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with an unexpected HTTP status.
    #[error("{provider} returned HTTP {status}")]
    Status { provider: &'static str, status: u16 },

    /// The service answered but reported an error of its own.
    #[error("{provider}: {message}")]
    Api {
        provider: &'static str,
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("{provider}: malformed response: {message}")]
    Malformed {
        provider: &'static str,
        message: String,
    },

    /// The provider is not configured (no credentials or endpoint).
    #[error("{0} is not available")]
    Unavailable(String),

    #[error("translation timed out after {0:?}")]
    Timeout(Duration),

    /// Every provider in a chain was skipped or failed.
    #[error("no translation provider succeeded{}", describe_last(.last))]
    Exhausted { last: Option<Box<TranslateError>> },
}

fn describe_last(last: &Option<Box<TranslateError>>) -> String {
    last.as_ref()
        .map(|err| format!(" (last error: {err})"))
        .unwrap_or_default()
}

impl TranslateError {
    /// Connection and timeout failures, which are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            TranslateError::Http(err) => err.is_connect() || err.is_timeout(),
            TranslateError::Timeout(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_mentions_the_last_error() {
        let err = TranslateError::Exhausted {
            last: Some(Box::new(TranslateError::Status {
                provider: "mymemory",
                status: 429,
            })),
        };
        assert_eq!(
            err.to_string(),
            "no translation provider succeeded (last error: mymemory returned HTTP 429)"
        );
        let none = TranslateError::Exhausted { last: None };
        assert_eq!(none.to_string(), "no translation provider succeeded");
    }

    #[test]
    fn only_transport_problems_are_transient() {
        assert!(TranslateError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(
            !TranslateError::Api {
                provider: "lingva",
                message: "bad language".into()
            }
            .is_transient()
        );
    }
}
