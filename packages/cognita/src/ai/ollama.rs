//! Ollama implementation of the AI trait.
//!
//! # Example
//!
//! ```rust,ignore
//! use cognita::ai::OllamaAI;
//!
//! let config = CognitaConfig::new().with_endpoint("http://gpu-box:11434");
//! let ai = Arc::new(OllamaAI::from_config(&config));
//! let detector = TypeDetector::from_config(&config, Some(ai));
//! ```

use async_trait::async_trait;
use ollama_client::{GenerateRequest, OllamaClient, OllamaError};
use tracing::debug;

use crate::error::{ServiceError, ServiceResult};
use crate::prompts::{
    format_classify_prompt, format_statement_prompt, parse_classification, parse_statements,
};
use crate::traits::ai::{
    Classification, ClassifySample, DescribeKind, DescribeRequest, Statement, StatementRequest, AI,
};
use crate::types::config::CognitaConfig;

/// Ollama-backed classifier, narrator and statement extractor.
///
/// Each task uses its own model; see [`CognitaConfig`].
#[derive(Clone)]
pub struct OllamaAI {
    client: OllamaClient,
    classifier_model: String,
    narrator_model: String,
    vision_model: String,
    extractor_model: String,
}

impl OllamaAI {
    pub fn new(client: OllamaClient) -> Self {
        Self::from_parts(client, &CognitaConfig::default())
    }

    /// Client and models from config.
    pub fn from_config(config: &CognitaConfig) -> Self {
        let client = OllamaClient::new(config.endpoint.clone()).with_timeout(config.timeout());
        Self::from_parts(client, config)
    }

    fn from_parts(client: OllamaClient, config: &CognitaConfig) -> Self {
        Self {
            client,
            classifier_model: config.classifier_model.clone(),
            narrator_model: config.narrator_model.clone(),
            vision_model: config.vision_model.clone(),
            extractor_model: config.extractor_model.clone(),
        }
    }

    pub fn client(&self) -> &OllamaClient {
        &self.client
    }

    async fn generate(&self, request: GenerateRequest) -> ServiceResult<String> {
        let model = request.model.clone();
        let response = self.client.generate(request).await.map_err(service_error)?;
        debug!(
            model = %model,
            tokens = response.usage.map(|u| u.completion_tokens),
            "ollama answered"
        );
        Ok(response.response)
    }
}

/// Map transport errors onto the service failure signal.
fn service_error(error: OllamaError) -> ServiceError {
    match error {
        OllamaError::Unreachable(message) | OllamaError::Config(message) => {
            ServiceError::Unreachable(message)
        }
        OllamaError::Timeout(after) => ServiceError::Timeout(after),
        OllamaError::Api { status, message } => ServiceError::Api { status, message },
        OllamaError::Parse(message) => ServiceError::MalformedResponse(message),
    }
}

#[async_trait]
impl AI for OllamaAI {
    async fn classify(&self, sample: &ClassifySample) -> ServiceResult<Classification> {
        let request = GenerateRequest::new(&self.classifier_model, format_classify_prompt(sample))
            .json()
            .temperature(0.0);
        let answer = self.generate(request).await?;
        parse_classification(&answer)
    }

    async fn describe(&self, request: &DescribeRequest) -> ServiceResult<String> {
        let generate = match request.kind {
            DescribeKind::Image => request.images.iter().fold(
                GenerateRequest::new(&self.vision_model, &request.prompt),
                |generate, image| generate.image(image),
            ),
            DescribeKind::Text => GenerateRequest::new(&self.narrator_model, &request.prompt),
        };
        self.generate(generate).await
    }

    async fn extract_statements(&self, request: &StatementRequest) -> ServiceResult<Vec<Statement>> {
        let prompt = format_statement_prompt(
            &request.subject,
            &request.text,
            request.tbox.as_deref(),
            request.mail,
        );
        let answer = self
            .generate(GenerateRequest::new(&self.extractor_model, prompt).temperature(0.0))
            .await?;
        parse_statements(&answer)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            service_error(OllamaError::Unreachable("refused".into())),
            ServiceError::Unreachable("refused".into())
        );
        assert_eq!(
            service_error(OllamaError::Timeout(Duration::from_secs(5))),
            ServiceError::Timeout(Duration::from_secs(5))
        );
        assert!(matches!(
            service_error(OllamaError::Parse("no response field".into())),
            ServiceError::MalformedResponse(_)
        ));
        assert!(matches!(
            service_error(OllamaError::Api {
                status: 404,
                message: "model not found".into()
            }),
            ServiceError::Api { status: 404, .. }
        ));
    }

    #[test]
    fn test_models_from_config() {
        let config = CognitaConfig::new().with_classifier_model("phi3");
        let ai = OllamaAI::from_config(&config);
        assert_eq!(ai.classifier_model, "phi3");
        assert_eq!(ai.client().timeout(), Duration::from_secs(60));
    }
}
