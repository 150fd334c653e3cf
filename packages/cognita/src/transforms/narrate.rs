//! Narration through a registry of narrators.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::ElementError;
use crate::traits::element::{Emit, Transform};
use crate::traits::narrator::Narrator;
use crate::types::caps::Field;
use crate::types::unit::ContentUnit;

/// Runs the first registered narrator that accepts a unit and stores its
/// text under [`Field::Narration`]. Units no narrator accepts pass through.
#[derive(Default)]
pub struct Narrate {
    narrators: Vec<Arc<dyn Narrator>>,
}

impl Narrate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a narrator. Earlier registrations take precedence.
    pub fn with(mut self, narrator: impl Narrator + 'static) -> Self {
        self.narrators.push(Arc::new(narrator));
        self
    }

    pub fn with_shared(mut self, narrator: Arc<dyn Narrator>) -> Self {
        self.narrators.push(narrator);
        self
    }

    pub fn len(&self) -> usize {
        self.narrators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.narrators.is_empty()
    }
}

#[async_trait]
impl Transform for Narrate {
    fn name(&self) -> &str {
        "narrate"
    }

    async fn transform(&self, mut unit: ContentUnit) -> Result<Emit, ElementError> {
        let Some(narrator) = self.narrators.iter().find(|n| n.accepts(unit.caps())) else {
            debug!(unit = %unit.display_name(), "no narrator accepts unit");
            return Ok(Emit::One(unit));
        };

        let text = narrator.narrate(&unit).await?;
        debug!(
            narrator = narrator.name(),
            unit = %unit.display_name(),
            chars = text.len(),
            "narrated"
        );
        unit.caps_mut().set(Field::Narration, text);
        Ok(Emit::One(unit))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::{ServiceError, UnitError};
    use crate::narrators::{ImageNarrator, MailboxNarrator};
    use crate::testing::MockAI;
    use crate::types::caps::Caps;

    fn png_unit() -> ContentUnit {
        ContentUnit::new(b"\x89PNG\r\n\x1a\n".as_slice()).with_caps(
            Caps::new()
                .with(Field::Format, "png")
                .with(Field::MediaType, "image/png"),
        )
    }

    #[tokio::test]
    async fn test_first_accepting_narrator_runs() {
        let ai = Arc::new(MockAI::new().with_description("A tiny square."));
        let narrate = Narrate::new()
            .with(MailboxNarrator::new())
            .with(ImageNarrator::new(ai.clone()));

        let unit = match narrate.transform(png_unit()).await.unwrap() {
            Emit::One(unit) => unit,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(unit.caps().text(Field::Narration), Some("A tiny square."));
        assert_eq!(ai.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_unaccepted_unit_passes_through() {
        let unit = ContentUnit::new("x").with_caps(Caps::new().with(Field::Format, "zip"));
        let narrate = Narrate::new().with(MailboxNarrator::new());
        match narrate.transform(unit).await.unwrap() {
            Emit::One(unit) => assert!(!unit.caps().contains(Field::Narration)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_narrator_failure_is_unit_error() {
        let ai = Arc::new(MockAI::new().with_describe_error(ServiceError::Timeout(
            std::time::Duration::from_secs(60),
        )));
        let err = Narrate::new()
            .with(ImageNarrator::new(ai))
            .transform(png_unit())
            .await
            .unwrap_err();
        assert!(!err.fatal);
        assert!(matches!(err.error, UnitError::Narration(ServiceError::Timeout(_))));
    }
}
