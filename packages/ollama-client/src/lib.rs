//! Pure Ollama REST API client
//!
//! A small client for a local or remote Ollama server with no domain-specific
//! logic. Supports non-streaming text generation (optionally multimodal and
//! JSON-constrained) and model listing.
//!
//! # Example
//!
//! ```rust,ignore
//! use ollama_client::{GenerateRequest, OllamaClient};
//!
//! let client = OllamaClient::new("http://localhost:11434");
//!
//! let answer = client
//!     .generate(GenerateRequest::new("llama3.1", "What is Rust in one sentence?"))
//!     .await?;
//! println!("{}", answer.response);
//! ```

pub mod error;
pub mod types;

pub use error::{OllamaError, Result};
pub use types::*;

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

/// Default Ollama endpoint.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Pure Ollama API client.
#[derive(Clone)]
pub struct OllamaClient {
    http_client: Client,
    base_url: String,
    timeout: Duration,
}

impl OllamaClient {
    /// Create a new client for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Create from environment variable `OLLAMA_HOST`, falling back to the
    /// default local endpoint.
    pub fn from_env() -> Self {
        let base_url = std::env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        Self::new(base_url)
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Text generation.
    ///
    /// Sends the request with `stream: false` and returns the whole answer.
    pub async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(format!("{}/api/generate", self.base_url))
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, model = %request.model, "Ollama request failed");
                self.transport_error(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "Ollama API error");
            return Err(OllamaError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let raw: GenerateResponseRaw = response.json().await.map_err(|e| {
            if e.is_timeout() {
                OllamaError::Timeout(self.timeout)
            } else {
                OllamaError::Parse(e.to_string())
            }
        })?;

        let text = raw
            .response
            .ok_or_else(|| OllamaError::Parse("response field missing".into()))?;

        debug!(
            model = %request.model,
            images = request.images.len(),
            duration_ms = start.elapsed().as_millis(),
            "Ollama generate"
        );

        let usage = match (raw.prompt_eval_count, raw.eval_count) {
            (Some(prompt_tokens), Some(completion_tokens)) => Some(Usage {
                prompt_tokens,
                completion_tokens,
            }),
            _ => None,
        };

        Ok(GenerateResponse {
            response: text,
            model: raw.model.unwrap_or(request.model),
            usage,
        })
    }

    /// List locally available models.
    pub async fn list_models(&self) -> Result<Vec<ModelTag>> {
        let response = self
            .http_client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(OllamaError::Api { status, message });
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| OllamaError::Parse(e.to_string()))?;

        Ok(tags.models)
    }

    fn transport_error(&self, error: reqwest::Error) -> OllamaError {
        if error.is_timeout() {
            OllamaError::Timeout(self.timeout)
        } else if error.is_builder() {
            OllamaError::Config(error.to_string())
        } else {
            OllamaError::Unreachable(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builder() {
        let client = OllamaClient::new("http://ollama.internal:11434/")
            .with_timeout(Duration::from_secs(5));

        assert_eq!(client.base_url(), "http://ollama.internal:11434");
        assert_eq!(client.timeout(), Duration::from_secs(5));
    }
}
