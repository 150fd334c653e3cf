use std::sync::Arc;

use async_trait::async_trait;

use crate::error::UnitError;
use crate::prompts::format_text_prompt;
use crate::traits::ai::{DescribeRequest, AI};
use crate::traits::narrator::Narrator;
use crate::types::caps::{Caps, Field};
use crate::types::unit::ContentUnit;

/// Formats narrated as text.
const TEXT_FORMATS: &[&str] = &["text", "calendar"];

/// Narrates textual content with the narrator model.
pub struct TextNarrator {
    ai: Arc<dyn AI>,
}

impl TextNarrator {
    pub fn new(ai: Arc<dyn AI>) -> Self {
        Self { ai }
    }
}

#[async_trait]
impl Narrator for TextNarrator {
    fn name(&self) -> &str {
        "text"
    }

    fn accepts(&self, caps: &Caps) -> bool {
        if let Some(format) = caps.text(Field::Format) {
            return TEXT_FORMATS.contains(&format);
        }
        caps.text(Field::MediaType)
            .is_some_and(|media_type| media_type.starts_with("text/"))
    }

    async fn narrate(&self, unit: &ContentUnit) -> Result<String, UnitError> {
        let bytes = unit.payload().load().await?;
        let text = String::from_utf8_lossy(&bytes);
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        let request = DescribeRequest::text(format_text_prompt(&text));
        let narration = self
            .ai
            .describe(&request)
            .await
            .map_err(UnitError::Narration)?;
        Ok(narration.trim().to_string())
    }
}
