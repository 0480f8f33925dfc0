//! Language-model completion providers.
//!
//! Defines the [`CompletionProvider`] trait the pipeline calls with a
//! rendered prompt and a sampling temperature, plus the shared HTTP
//! response handling.
//!
//! Two providers are implemented:
//! - [`openai::OpenAiProvider`]: OpenAI `/v1/completions` API
//! - [`ollama::OllamaProvider`]: Ollama `/api/generate` API

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;

pub mod ollama;
pub mod openai;

/// Errors returned by completion providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP transport failure.
    #[error("completion request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Response did not match the expected schema.
    #[error("completion response parse error: {0}")]
    Parse(String),
    /// Upstream provider responded with an error status.
    #[error("completion provider returned status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        body: String,
    },
    /// Provider cannot satisfy the request with current configuration.
    #[error("completion provider unavailable: {0}")]
    Unavailable(String),
}

/// Core completion interface: prompt text in, completion text out.
///
/// The pipeline constructs prompts and parses responses; model selection
/// and transport live behind this trait. Implementations must be
/// `Send + Sync` so concurrent requests can share one provider.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Request a completion at the given sampling temperature.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on transport, API, or parse failure.
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, ProviderError>;

    /// The model identifier this provider is instantiated for.
    fn model_id(&self) -> &str;
}

/// Check HTTP response status and return body text or a structured error.
///
/// # Errors
///
/// Returns `ProviderError::Request` on transport failure,
/// `ProviderError::HttpStatus` on non-2xx.
pub async fn check_http_response(response: reqwest::Response) -> Result<String, ProviderError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ProviderError::HttpStatus {
            status: status.as_u16(),
            body: sanitize_http_error_body(&body),
        });
    }
    Ok(body)
}

fn sanitize_http_error_body(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut sanitized = collapsed;
    for pattern in [r"sk-[A-Za-z0-9]{32,}", r"Bearer [A-Za-z0-9_.\-]{16,}"] {
        if let Ok(regex) = Regex::new(pattern) {
            sanitized = regex.replace_all(&sanitized, "[REDACTED]").into_owned();
        }
    }

    const MAX_ERROR_BODY_CHARS: usize = 256;
    if sanitized.chars().count() > MAX_ERROR_BODY_CHARS {
        let shortened = sanitized
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect::<String>();
        return format!("{shortened}...[truncated]");
    }

    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_redacts_api_keys() {
        let body = format!("error: invalid key sk-{}", "a".repeat(40));
        let out = sanitize_http_error_body(&body);
        assert!(out.contains("[REDACTED]"));
        assert!(!out.contains(&"a".repeat(40)));
    }

    #[test]
    fn sanitize_truncates_long_bodies() {
        let out = sanitize_http_error_body(&"y".repeat(2000));
        assert!(out.ends_with("...[truncated]"));
    }

    #[test]
    fn sanitize_collapses_whitespace() {
        assert_eq!(sanitize_http_error_body("a\n  b\t c"), "a b c");
    }
}
