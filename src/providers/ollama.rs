//! Ollama provider implementation using the `/api/generate` API.

use serde::{Deserialize, Serialize};

use super::{check_http_response, CompletionProvider, ProviderError};

/// Ollama generate request body.
#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

/// Sampling options forwarded to the model.
#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Ollama generate response body.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

/// Local Ollama provider.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a provider for the given base URL and model.
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url,
            model,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl CompletionProvider for OllamaProvider {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, ProviderError> {
        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));
        let body = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: OllamaOptions { temperature },
        };

        let response = self.client.post(url).json(&body).send().await?;
        let payload = check_http_response(response).await?;

        let parsed: OllamaResponse =
            serde_json::from_str(&payload).map_err(|e| ProviderError::Parse(e.to_string()))?;
        Ok(parsed.response)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_disables_streaming() {
        let req = OllamaRequest {
            model: "llama3",
            prompt: "Classification:",
            stream: false,
            options: OllamaOptions { temperature: 0.2 },
        };
        let json = serde_json::to_value(&req).expect("serialize");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["temperature"], 0.2_f32);
    }

    #[test]
    fn response_body_parses() {
        let parsed: OllamaResponse =
            serde_json::from_str(r#"{"response": "view_events", "done": true}"#).expect("parse");
        assert_eq!(parsed.response, "view_events");
    }
}
