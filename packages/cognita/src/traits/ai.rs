//! AI trait for the external classifier/narrator service.
//!
//! The pipeline needs three things from a language model:
//! - Classifying a payload no signature recognized
//! - Describing an image or a text
//! - Extracting statements about a unit from its narration
//!
//! Implementations own transport, model choice and prompting. They must
//! report failures as a [`ServiceError`] so callers can tell an unreachable
//! service from a timeout or a malformed answer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ServiceResult;

/// Bounded sample of a payload sent for classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifySample {
    /// File name or source URI, when known
    pub label: String,

    /// First bytes, hex-encoded
    pub header_hex: String,

    /// Best-effort text rendering of the first bytes
    pub preview: String,
}

/// Classifier answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub type_name: String,
    pub mime_type: String,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub rationale: Option<String>,
}

/// What kind of content a describe request carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescribeKind {
    Image,
    Text,
}

/// Request for a free-text description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeRequest {
    pub kind: DescribeKind,

    /// Full prompt text
    pub prompt: String,

    /// Base64-encoded images (image requests only)
    pub images: Vec<String>,
}

impl DescribeRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            kind: DescribeKind::Text,
            prompt: prompt.into(),
            images: Vec::new(),
        }
    }

    pub fn image(prompt: impl Into<String>, base64: impl Into<String>) -> Self {
        Self {
            kind: DescribeKind::Image,
            prompt: prompt.into(),
            images: vec![base64.into()],
        }
    }
}

/// Request for statements about one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementRequest {
    /// Subject IRI every statement is about
    pub subject: String,

    /// Narrated text to extract from
    pub text: String,

    /// Optional ontology the predicates should come from
    pub tbox: Option<String>,

    /// Use the mail-specific extraction rules
    pub mail: bool,
}

/// One extracted statement. The subject is implied by the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub predicate: String,
    pub object: String,
}

/// AI trait for the classifier/narrator service.
#[async_trait]
pub trait AI: Send + Sync {
    /// Classify a payload sample into a type name and MIME type.
    async fn classify(&self, sample: &ClassifySample) -> ServiceResult<Classification>;

    /// Describe an image or a text in prose.
    async fn describe(&self, request: &DescribeRequest) -> ServiceResult<String>;

    /// Extract statements about `request.subject`.
    ///
    /// Best-effort; the default returns nothing.
    async fn extract_statements(&self, _request: &StatementRequest) -> ServiceResult<Vec<Statement>> {
        Ok(Vec::new())
    }
}
