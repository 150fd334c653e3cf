//! Triple extraction stage.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{ElementError, ExtractionError};
use crate::traits::element::{Emit, Transform};
use crate::triples::TripleExtractor;
use crate::types::caps::Field;
use crate::types::unit::ContentUnit;

const STAGE: &str = "extract_triples";

/// Adds triples derived from a unit's narration and caps.
///
/// A unit without a derivable subject continues with no new triples and an
/// annotation. A failed statement request keeps the deterministic triples
/// and is annotated too.
pub struct ExtractTriples {
    extractor: TripleExtractor,
}

impl ExtractTriples {
    pub fn new(extractor: TripleExtractor) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl Transform for ExtractTriples {
    fn name(&self) -> &str {
        STAGE
    }

    async fn transform(&self, mut unit: ContentUnit) -> Result<Emit, ElementError> {
        let text = unit
            .caps()
            .text(Field::Narration)
            .unwrap_or_default()
            .to_string();

        let triples = match self.extractor.extract(&text, unit.caps()) {
            Ok(triples) => triples,
            Err(ExtractionError::NoSubject) => {
                debug!(unit = %unit.display_name(), "no subject, skipping extraction");
                unit.annotate(STAGE, ExtractionError::NoSubject.to_string());
                return Ok(Emit::One(unit));
            }
            Err(e) => return Err(e.into()),
        };
        unit.caps_mut().extend_triples(triples);

        match self.extractor.extract_statements(&text, unit.caps()).await {
            Ok(statements) => unit.caps_mut().extend_triples(statements),
            Err(e) => {
                warn!(unit = %unit.display_name(), error = %e, "statement extraction failed");
                unit.annotate(STAGE, e.to_string());
            }
        }

        Ok(Emit::One(unit))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::ServiceError;
    use crate::identity::IdentityDeriver;
    use crate::testing::MockAI;
    use crate::triples::vocab;
    use crate::types::caps::Caps;

    fn narrated() -> ContentUnit {
        ContentUnit::new("x").with_caps(
            Caps::new()
                .with(Field::Identity, "urn:ns:content:abc123")
                .with(Field::Narration, "A fairly long narration that is well past the threshold."),
        )
    }

    fn one(emit: Emit) -> ContentUnit {
        match emit {
            Emit::One(unit) => unit,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_subject_continues_empty() {
        let stage = ExtractTriples::new(TripleExtractor::new(IdentityDeriver::new("ns")));
        let unit = ContentUnit::new("x").with_caps(Caps::new().with(Field::Narration, "text"));
        let unit = one(stage.transform(unit).await.unwrap());

        assert_eq!(unit.caps().triple_count(), 0);
        assert_eq!(unit.annotations()[0].stage, STAGE);
    }

    #[tokio::test]
    async fn test_service_failure_keeps_deterministic_triples() {
        let ai = Arc::new(MockAI::new().with_statement_error(ServiceError::Unreachable("down".into())));
        let stage = ExtractTriples::new(TripleExtractor::new(IdentityDeriver::new("ns")).with_ai(ai));
        let unit = one(stage.transform(narrated()).await.unwrap());

        assert!(unit
            .caps()
            .triples()
            .any(|t| t.predicate == vocab::DCTERMS_DESCRIPTION && t.subject == "urn:ns:content:abc123"));
        assert_eq!(unit.annotations().len(), 1);
        assert!(unit.annotations()[0].message.contains("unreachable"));
    }
}
