//! Type detection and identity assignment.

use async_trait::async_trait;
use tracing::debug;

use crate::detect::TypeDetector;
use crate::error::{ElementError, UnitError};
use crate::identity::{content_hash, IdentityDeriver};
use crate::mailbox::{parse_message, write_header_caps};
use crate::traits::element::{Emit, Transform};
use crate::types::caps::{Caps, Field, Value};
use crate::types::identity::{Identity, TypeCategory};
use crate::types::unit::{ContentUnit, Payload};

/// What to do when the fallback classifier fails for a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnClassifyError {
    /// Record the failure and drop the unit; the run continues
    #[default]
    Skip,

    /// Halt the run
    Abort,
}

/// Detects the type of units that lack one and assigns their identity.
pub struct TypeFind {
    detector: TypeDetector,
    deriver: IdentityDeriver,
    on_error: OnClassifyError,
}

impl TypeFind {
    pub fn new(detector: TypeDetector, deriver: IdentityDeriver) -> Self {
        Self {
            detector,
            deriver,
            on_error: OnClassifyError::Skip,
        }
    }

    pub fn with_on_error(mut self, on_error: OnClassifyError) -> Self {
        self.on_error = on_error;
        self
    }

    /// Identity from a natural key when the content has one, else the hash.
    async fn identify(
        &self,
        payload: &Payload,
        category: TypeCategory,
        caps: &mut Caps,
    ) -> Result<Identity, UnitError> {
        let mut natural_key = None;
        if caps.text(Field::Format) == Some("eml") {
            if let Ok(parsed) = parse_message(payload.prefix()) {
                natural_key = write_header_caps(&parsed.headers, caps).map(str::to_string);
            }
        }

        if payload.is_complete() || natural_key.is_some() {
            return Ok(self
                .deriver
                .derive_bytes(payload.prefix(), category, natural_key.as_deref()));
        }

        // Streaming a large file blocks; keep it off the runtime threads
        let deriver = self.deriver.clone();
        let payload = payload.clone();
        let identity = tokio::task::spawn_blocking(move || deriver.derive(&payload, category, None))
            .await
            .map_err(|e| UnitError::Io(std::io::Error::other(e)))??;
        Ok(identity)
    }
}

fn has_type(caps: &Caps) -> bool {
    [Field::Format, Field::MediaType]
        .into_iter()
        .any(|field| matches!(caps.get(field), Some(Value::Text(_))))
}

#[async_trait]
impl Transform for TypeFind {
    fn name(&self) -> &str {
        "typefind"
    }

    async fn transform(&self, mut unit: ContentUnit) -> Result<Emit, ElementError> {
        if !has_type(unit.caps()) {
            let label = unit.display_name();
            let detection = match self.detector.detect(unit.payload().prefix(), &label).await {
                Ok(detection) => detection,
                Err(e) => {
                    return Err(match self.on_error {
                        OnClassifyError::Skip => ElementError::recoverable(e),
                        OnClassifyError::Abort => ElementError::fatal(e),
                    })
                }
            };
            detection.write_to(unit.caps_mut());
        }

        if unit.identity().is_none() {
            let category = unit
                .caps()
                .text(Field::MediaType)
                .map(TypeCategory::from_media_type)
                .unwrap_or(TypeCategory::Unknown);

            let payload = unit.payload().clone();
            let identity = self.identify(&payload, category, unit.caps_mut()).await?;

            let hash = match identity.content_hash() {
                Some(hash) => Some(hash.to_string()),
                None if payload.is_complete() => Some(content_hash(payload.prefix())),
                None => None,
            };
            if let Some(hash) = hash {
                unit.caps_mut().set(Field::ContentHash, hash);
            }

            debug!(identity = %identity, format = unit.caps().label(), "typed unit");
            unit.set_identity(identity);
        }

        Ok(Emit::One(unit))
    }
}
