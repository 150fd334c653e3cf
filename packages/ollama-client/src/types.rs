//! Ollama API request and response types.

use serde::{Deserialize, Serialize};

// =============================================================================
// Generate
// =============================================================================

/// Request for `POST /api/generate`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    /// Model to use (e.g., "llama3.1", "qwen2.5vl:3b")
    pub model: String,

    /// Prompt text
    pub prompt: String,

    /// Optional system prompt overriding the model default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Base64-encoded images for multimodal models
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,

    /// Constrain the answer format ("json")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Always false; this client does not consume streamed answers
    pub stream: bool,

    /// Sampling options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerateOptions>,
}

impl GenerateRequest {
    /// Create a new non-streaming request for the given model and prompt.
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            images: Vec::new(),
            format: None,
            stream: false,
            options: None,
        }
    }

    /// Set the system prompt.
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Attach a base64-encoded image.
    pub fn image(mut self, base64: impl Into<String>) -> Self {
        self.images.push(base64.into());
        self
    }

    /// Ask the server to constrain the answer to JSON.
    pub fn json(mut self) -> Self {
        self.format = Some("json".to_string());
        self
    }

    /// Set temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options.get_or_insert_with(GenerateOptions::default).temperature = Some(temperature);
        self
    }

    /// Cap the number of generated tokens.
    pub fn num_predict(mut self, tokens: u32) -> Self {
        self.options.get_or_insert_with(GenerateOptions::default).num_predict = Some(tokens);
        self
    }
}

/// Model sampling options.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

/// Response from `POST /api/generate`.
#[derive(Debug, Clone)]
pub struct GenerateResponse {
    /// Generated text
    pub response: String,

    /// Model that answered
    pub model: String,

    /// Token accounting, when the server reports it
    pub usage: Option<Usage>,
}

/// Raw generate response from API (for internal parsing).
#[derive(Debug, Deserialize)]
pub(crate) struct GenerateResponseRaw {
    pub model: Option<String>,
    pub response: Option<String>,
    pub prompt_eval_count: Option<u32>,
    pub eval_count: Option<u32>,
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,

    /// Tokens in the completion
    pub completion_tokens: u32,
}

// =============================================================================
// Model listing
// =============================================================================

/// Response from `GET /api/tags`.
#[derive(Debug, Deserialize)]
pub(crate) struct TagsResponse {
    #[serde(default)]
    pub models: Vec<ModelTag>,
}

/// One locally available model.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelTag {
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

// =============================================================================
// Utilities
// =============================================================================

/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

/// Strip markdown code blocks from a response.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_request_builder() {
        let req = GenerateRequest::new("llama3.1", "Hello")
            .system("Be brief")
            .json()
            .temperature(0.0)
            .num_predict(64);

        assert_eq!(req.model, "llama3.1");
        assert_eq!(req.format.as_deref(), Some("json"));
        assert!(!req.stream);
        let options = req.options.unwrap();
        assert_eq!(options.temperature, Some(0.0));
        assert_eq!(options.num_predict, Some(64));
    }

    #[test]
    fn test_generate_request_serialization_skips_empty() {
        let req = GenerateRequest::new("llama3.1", "Hello");
        let value = serde_json::to_value(&req).unwrap();

        assert_eq!(value["stream"], false);
        assert!(value.get("images").is_none());
        assert!(value.get("format").is_none());
        assert!(value.get("options").is_none());
    }

    #[test]
    fn test_images_serialized() {
        let req = GenerateRequest::new("qwen2.5vl:3b", "Describe").image("aGVsbG8=");
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["images"][0], "aGVsbG8=");
    }

    #[test]
    fn test_truncate_to_char_boundary() {
        let text = "Hello 世界";
        let truncated = truncate_to_char_boundary(text, 8);
        assert!(truncated.len() <= 8);
        assert!(text.starts_with(truncated));
    }

    #[test]
    fn test_strip_code_blocks() {
        assert_eq!(strip_code_blocks("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("```\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("{}"), "{}");
    }
}
