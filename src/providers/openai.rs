//! OpenAI provider implementation using the `/v1/completions` API.

use serde::{Deserialize, Serialize};

use super::{check_http_response, CompletionProvider, ProviderError};

const COMPLETIONS_PATH: &str = "/v1/completions";
const DEFAULT_MAX_TOKENS: u32 = 512;

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// OpenAI completions request body.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct OpenAiRequest<'a> {
    /// Model identifier.
    pub model: &'a str,
    /// Rendered prompt text.
    pub prompt: &'a str,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
}

/// OpenAI completions response body.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiResponse {
    /// Completion choices; the first is used.
    pub choices: Vec<OpenAiChoice>,
}

/// A single completion choice.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiChoice {
    /// Generated text.
    pub text: String,
}

/// Parse an OpenAI completions body into the completion text.
///
/// # Errors
///
/// Returns `ProviderError::Parse` when the body does not deserialize or
/// carries no choices.
#[doc(hidden)]
pub fn parse_response(body: &str) -> Result<String, ProviderError> {
    let resp: OpenAiResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;
    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Parse("response carried no choices".to_owned()))?;
    Ok(choice.text)
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// OpenAI completions API provider.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Create a provider for the given base URL, model, and API key.
    pub fn new(base_url: String, model: String, api_key: String) -> Self {
        Self {
            base_url,
            model,
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, ProviderError> {
        let url = format!("{}{COMPLETIONS_PATH}", self.base_url.trim_end_matches('/'));
        let body = OpenAiRequest {
            model: &self.model,
            prompt,
            temperature,
            max_tokens: DEFAULT_MAX_TOKENS,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let payload = check_http_response(response).await?;
        parse_response(&payload)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_choice_text() {
        let body = r#"{"choices": [{"text": "create_event"}, {"text": "other"}]}"#;
        assert_eq!(parse_response(body).expect("text"), "create_event");
    }

    #[test]
    fn empty_choices_is_a_parse_error() {
        let body = r#"{"choices": []}"#;
        assert!(matches!(parse_response(body), Err(ProviderError::Parse(_))));
    }

    #[test]
    fn malformed_body_is_a_parse_error() {
        assert!(matches!(
            parse_response("not json"),
            Err(ProviderError::Parse(_))
        ));
    }

    #[test]
    fn request_serializes_expected_fields() {
        let req = OpenAiRequest {
            model: "gpt-3.5-turbo-instruct",
            prompt: "Classification:",
            temperature: 0.0,
            max_tokens: 512,
        };
        let json = serde_json::to_value(&req).expect("serialize");
        assert_eq!(json["model"], "gpt-3.5-turbo-instruct");
        assert_eq!(json["max_tokens"], 512);
    }
}
