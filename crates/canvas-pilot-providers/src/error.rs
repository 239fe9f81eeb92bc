use std::time::Duration;

use thiserror::Error;

/// Failures surfaced by provider adapters.
///
/// The `Display` text is what callers see in the `error` field of the
/// response envelope.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0} not configured")]
    MissingCredential(&'static str),

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("{provider} request timed out after {secs}s")]
    Timeout { provider: &'static str, secs: u64 },

    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} API error {status}: {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("Prediction {status}: {detail}")]
    Prediction { status: String, detail: String },

    #[error("Malformed {provider} response: {detail}")]
    MalformedResponse {
        provider: &'static str,
        detail: String,
    },

    #[error("Could not extract image URL: {0}")]
    ImageExtraction(String),
}

impl ProviderError {
    /// Classify a reqwest failure, separating timeouts from other transport errors.
    pub(crate) fn transport(provider: &'static str, timeout: Duration, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            ProviderError::Timeout {
                provider,
                secs: timeout.as_secs(),
            }
        } else {
            ProviderError::Transport { provider, source }
        }
    }

    pub(crate) fn malformed(provider: &'static str, detail: impl Into<String>) -> Self {
        ProviderError::MalformedResponse {
            provider,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_model_message() {
        let err = ProviderError::UnknownModel("unknown-model".into());
        assert_eq!(err.to_string(), "Unknown model: unknown-model");
    }

    #[test]
    fn test_missing_credential_message() {
        let err = ProviderError::MissingCredential("Replicate API token");
        assert_eq!(err.to_string(), "Replicate API token not configured");
    }

    #[test]
    fn test_api_error_embeds_provider_message() {
        let err = ProviderError::Api {
            provider: "OpenAI",
            status: 401,
            body: r#"{"error":{"message":"Incorrect API key"}}"#.into(),
        };
        let text = err.to_string();
        assert!(text.starts_with("OpenAI API error 401"));
        assert!(text.contains("Incorrect API key"));
    }
}
