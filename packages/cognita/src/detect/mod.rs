//! Two-stage type detection.
//!
//! 1. Signature stage: the ordered table in [`signatures`]. Deterministic,
//!    never fails, never calls out.
//! 2. Fallback stage: the external classifier, consulted only when no
//!    signature matched and fallback is enabled. Service failures surface
//!    as [`ClassificationError`]; no type is guessed on failure.
//!
//! A classifier answer never overrides a signature match.

pub mod signatures;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{ClassificationError, ClassificationResult};
use crate::prompts::classify_sample;
use crate::traits::ai::AI;
use crate::types::caps::{Caps, Field, Value};
use crate::types::config::CognitaConfig;
use crate::types::identity::TypeCategory;

pub use signatures::{match_signature, Signature, SIGNATURES};

/// Which stage resolved a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionSource {
    Signature,
    Classifier,
    /// Neither stage resolved the type
    None,
}

impl DetectionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionSource::Signature => "signature",
            DetectionSource::Classifier => "classifier",
            DetectionSource::None => "none",
        }
    }
}

/// Result of type detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// Format label ("png", "mbox", ...); None when unknown
    pub format: Option<String>,

    /// MIME type; None when unknown
    pub media_type: Option<String>,

    pub category: TypeCategory,
    pub extensions: Vec<String>,
    pub source: DetectionSource,

    /// Classifier's reasoning, if it was consulted
    pub rationale: Option<String>,
}

impl Detection {
    pub fn unknown() -> Self {
        Self {
            format: None,
            media_type: None,
            category: TypeCategory::Unknown,
            extensions: Vec::new(),
            source: DetectionSource::None,
            rationale: None,
        }
    }

    fn from_signature(sig: &Signature) -> Self {
        Self {
            format: Some(sig.format.to_string()),
            media_type: Some(sig.media_type.to_string()),
            category: sig.category,
            extensions: sig.extensions.iter().map(|e| e.to_string()).collect(),
            source: DetectionSource::Signature,
            rationale: None,
        }
    }

    pub fn is_known(&self) -> bool {
        self.source != DetectionSource::None
    }

    /// Record the detection in caps. Unknown types are written as an
    /// explicit [`Value::Unknown`], never omitted.
    pub fn write_to(&self, caps: &mut Caps) {
        let text_or_unknown = |value: &Option<String>| match value {
            Some(v) => Value::Text(v.clone()),
            None => Value::Unknown,
        };
        caps.set(Field::MediaType, text_or_unknown(&self.media_type));
        caps.set(Field::Format, text_or_unknown(&self.format));
        caps.set(Field::TypeSource, self.source.as_str());
        if !self.extensions.is_empty() {
            caps.set(Field::Extensions, self.extensions.clone());
        }
        if let Some(rationale) = &self.rationale {
            caps.set(Field::Description, rationale.as_str());
        }
    }
}

/// Hybrid signature/classifier type detector.
#[derive(Clone)]
pub struct TypeDetector {
    ai: Option<Arc<dyn AI>>,
    fallback: bool,
}

impl Default for TypeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeDetector {
    /// Signature-only detector.
    pub fn new() -> Self {
        Self {
            ai: None,
            fallback: false,
        }
    }

    /// Detector that falls back to the given classifier.
    pub fn with_ai(ai: Arc<dyn AI>) -> Self {
        Self {
            ai: Some(ai),
            fallback: true,
        }
    }

    /// Build from config; fallback is on only if the config allows it and
    /// a classifier is supplied.
    pub fn from_config(config: &CognitaConfig, ai: Option<Arc<dyn AI>>) -> Self {
        Self {
            fallback: config.ai_fallback && ai.is_some(),
            ai,
        }
    }

    /// Enable or disable the fallback stage.
    pub fn with_fallback(mut self, enabled: bool) -> Self {
        self.fallback = enabled;
        self
    }

    pub fn fallback_enabled(&self) -> bool {
        self.fallback && self.ai.is_some()
    }

    /// Detect the type of a payload prefix. `label` (a file name or URI)
    /// is passed to the classifier as context.
    pub async fn detect(&self, prefix: &[u8], label: &str) -> ClassificationResult<Detection> {
        if let Some(sig) = match_signature(prefix) {
            debug!(format = sig.format, label, "signature match");
            return Ok(Detection::from_signature(sig));
        }

        let ai = match (&self.ai, self.fallback) {
            (Some(ai), true) => ai,
            _ => {
                debug!(label, "no signature match, fallback disabled");
                return Ok(Detection::unknown());
            }
        };

        let sample = classify_sample(label, prefix);
        let answer = ai.classify(&sample).await.map_err(|e| {
            warn!(error = %e, label, "classifier failed");
            ClassificationError::Service(e)
        })?;

        let format = answer.type_name.trim().to_ascii_lowercase();
        let media_type = answer.mime_type.trim().to_ascii_lowercase();
        if format.is_empty() && media_type.is_empty() {
            return Err(ClassificationError::Unusable(
                "answer has neither type name nor MIME type".into(),
            ));
        }

        debug!(format = %format, media_type = %media_type, label, "classifier match");

        Ok(Detection {
            category: TypeCategory::from_media_type(&media_type),
            format: (!format.is_empty()).then_some(format),
            media_type: (!media_type.is_empty()).then_some(media_type),
            extensions: answer
                .extensions
                .into_iter()
                .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
            source: DetectionSource::Classifier,
            rationale: answer.rationale.filter(|r| !r.trim().is_empty()),
        })
    }
}
