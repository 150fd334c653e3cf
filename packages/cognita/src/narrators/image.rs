use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;

use crate::error::UnitError;
use crate::prompts::format_image_prompt;
use crate::traits::ai::{DescribeRequest, AI};
use crate::traits::narrator::Narrator;
use crate::types::caps::{Caps, Field};
use crate::types::unit::ContentUnit;

/// Describes images with the vision model. The whole image is sent.
pub struct ImageNarrator {
    ai: Arc<dyn AI>,
}

impl ImageNarrator {
    pub fn new(ai: Arc<dyn AI>) -> Self {
        Self { ai }
    }
}

#[async_trait]
impl Narrator for ImageNarrator {
    fn name(&self) -> &str {
        "image"
    }

    fn accepts(&self, caps: &Caps) -> bool {
        caps.text(Field::MediaType)
            .is_some_and(|media_type| media_type.starts_with("image/"))
    }

    async fn narrate(&self, unit: &ContentUnit) -> Result<String, UnitError> {
        let bytes = unit.payload().load().await?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        let request = DescribeRequest::image(format_image_prompt(&unit.display_name()), encoded);

        let text = self
            .ai
            .describe(&request)
            .await
            .map_err(UnitError::Narration)?;
        Ok(text.trim().to_string())
    }
}
