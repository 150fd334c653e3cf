//! Configuration for pipeline assembly.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Configuration threaded into detectors, narrators and extractors when a
/// pipeline is assembled. There is no process-wide default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CognitaConfig {
    /// Namespace of minted identifiers (`urn:<namespace>:...`).
    ///
    /// Default: "cognita".
    pub namespace: String,

    /// Consult the external classifier when no signature matches.
    ///
    /// Default: true.
    pub ai_fallback: bool,

    /// Base URL of the classifier/narrator service.
    pub endpoint: String,

    /// Model used for fallback classification. Default: "llama3.1".
    pub classifier_model: String,

    /// Model used to narrate text. Default: "qwen2.5vl:3b".
    pub narrator_model: String,

    /// Model used to narrate images. Default: "qwen2.5vl:3b".
    pub vision_model: String,

    /// Model used for statement extraction. Default: "mistral".
    pub extractor_model: String,

    /// Per-request timeout of service calls, in seconds. Default: 60.
    pub timeout_secs: u64,

    /// Bytes a file source reads up front for type detection.
    ///
    /// Default: 65535.
    pub prebuffer_bytes: usize,

    /// Narrations shorter than this are not sent for statement extraction.
    ///
    /// Default: 50.
    pub min_text_length: usize,
}

impl Default for CognitaConfig {
    fn default() -> Self {
        Self {
            namespace: "cognita".to_string(),
            ai_fallback: true,
            endpoint: "http://localhost:11434".to_string(),
            classifier_model: "llama3.1".to_string(),
            narrator_model: "qwen2.5vl:3b".to_string(),
            vision_model: "qwen2.5vl:3b".to_string(),
            extractor_model: "mistral".to_string(),
            timeout_secs: 60,
            prebuffer_bytes: 65535,
            min_text_length: 50,
        }
    }
}

impl CognitaConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_ai_fallback(mut self, enabled: bool) -> Self {
        self.ai_fallback = enabled;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_classifier_model(mut self, model: impl Into<String>) -> Self {
        self.classifier_model = model.into();
        self
    }

    pub fn with_narrator_model(mut self, model: impl Into<String>) -> Self {
        self.narrator_model = model.into();
        self
    }

    pub fn with_vision_model(mut self, model: impl Into<String>) -> Self {
        self.vision_model = model.into();
        self
    }

    pub fn with_extractor_model(mut self, model: impl Into<String>) -> Self {
        self.extractor_model = model.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_prebuffer_bytes(mut self, bytes: usize) -> Self {
        self.prebuffer_bytes = bytes;
        self
    }

    pub fn with_min_text_length(mut self, length: usize) -> Self {
        self.min_text_length = length;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check the config before a pipeline is assembled from it.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.namespace.is_empty() {
            return Err(PipelineError::Config("namespace must not be empty".into()));
        }
        if self
            .namespace
            .chars()
            .any(|c| c == ':' || c.is_whitespace())
        {
            return Err(PipelineError::Config(format!(
                "namespace {:?} must not contain ':' or whitespace",
                self.namespace
            )));
        }
        if self.prebuffer_bytes == 0 {
            return Err(PipelineError::Config(
                "prebuffer_bytes must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CognitaConfig::default();
        assert_eq!(config.namespace, "cognita");
        assert!(config.ai_fallback);
        assert_eq!(config.classifier_model, "llama3.1");
        assert_eq!(config.vision_model, "qwen2.5vl:3b");
        assert_eq!(config.extractor_model, "mistral");
        assert_eq!(config.prebuffer_bytes, 65535);
        assert_eq!(config.min_text_length, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_namespace() {
        assert!(CognitaConfig::new().with_namespace("").validate().is_err());
        assert!(CognitaConfig::new().with_namespace("a:b").validate().is_err());
        assert!(CognitaConfig::new().with_namespace("a b").validate().is_err());
        assert!(CognitaConfig::new().with_namespace("acme").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_prebuffer() {
        let config = CognitaConfig::new().with_prebuffer_bytes(0);
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: CognitaConfig =
            serde_json::from_str(r#"{"namespace": "acme", "ai_fallback": false}"#).unwrap();
        assert_eq!(config.namespace, "acme");
        assert!(!config.ai_fallback);
        assert_eq!(config.endpoint, "http://localhost:11434");
    }
}
