//! Text-generation provider client.
//!
//! Sends a built prompt and returns the raw reply text. The reply is
//! expected to match the six-segment format owned by `mailsift-classify`;
//! this client does not interpret it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result, from_response};

/// Default text-generation endpoint.
pub const DEFAULT_TEXTGEN_ENDPOINT: &str = "https://api.textgen.example/v1";

/// Default model requested from the provider.
pub const DEFAULT_MODEL: &str = "text-classifier-1";

/// Text-generation access for the classification pipeline.
#[async_trait]
pub trait TextGenApi: Send + Sync {
    /// Generates a completion for the given prompt and returns the raw
    /// reply text.
    ///
    /// # Errors
    ///
    /// Returns an error on provider failure; rate-limit signals carry the
    /// retry-after hint and quota detail.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// `reqwest`-backed text-generation client.
#[derive(Debug, Clone)]
pub struct HttpTextGenClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpTextGenClient {
    /// Creates a client against the default endpoint.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_endpoint(DEFAULT_TEXTGEN_ENDPOINT, api_key)
    }

    /// Creates a client against a custom endpoint (used by tests).
    #[must_use]
    pub fn with_endpoint(endpoint: &str, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Overrides the requested model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl TextGenApi for HttpTextGenClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(prompt_len = prompt.len(), model = %self.model, "requesting completion");
        let url = format!("{}/generate", self.base_url);
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
            })
            .send()
            .await?;

        if response.status().is_success() {
            let body: GenerateResponse = response.json().await?;
            if body.text.is_empty() {
                return Err(Error::Decode("empty completion text".to_string()));
            }
            Ok(body.text)
        } else {
            Err(from_response(response).await)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_generate_returns_reply_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .and(header("authorization", "Bearer key"))
            .and(body_string_contains("Classify the email"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"text": "Summary: Hi.\nUrgency Score: 5\n"}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let client = HttpTextGenClient::with_endpoint(&server.uri(), "key");
        let text = client
            .generate("You are an email triage assistant. Classify the email below.")
            .await
            .unwrap();
        assert!(text.starts_with("Summary:"));
    }

    #[tokio::test]
    async fn test_generate_rate_limit_without_hint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_raw(
                r#"{"error": {"message": "Resource exhausted"}}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let client = HttpTextGenClient::with_endpoint(&server.uri(), "key");
        let err = client.generate("prompt").await.unwrap_err();
        match err {
            Error::RateLimited {
                retry_after,
                message,
                ..
            } => {
                assert!(retry_after.is_none());
                assert_eq!(message, "Resource exhausted");
            }
            other => panic!("expected RateLimited, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_generate_empty_text_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(r"{}", "application/json"))
            .mount(&server)
            .await;

        let client = HttpTextGenClient::with_endpoint(&server.uri(), "key");
        let err = client.generate("prompt").await.unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[tokio::test]
    async fn test_generate_bad_request_is_not_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_raw(
                r#"{"error": {"message": "prompt too long"}}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let client = HttpTextGenClient::with_endpoint(&server.uri(), "key");
        let err = client.generate("prompt").await.unwrap_err();
        assert!(matches!(err, Error::Rejected { status: 400, .. }));
        assert!(!err.is_transient());
    }
}
