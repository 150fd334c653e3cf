use async_trait::async_trait;

use crate::error::UnitError;
use crate::mailbox::parse_message;
use crate::traits::narrator::Narrator;
use crate::types::caps::{Caps, Field, Value};
use crate::types::unit::ContentUnit;

/// Characters of the body quoted in a message narration.
pub const BODY_EXCERPT_CHARS: usize = 500;

/// Narrates a single mail message from its header caps plus the start of
/// its body. No service calls.
#[derive(Debug, Clone, Default)]
pub struct MessageNarrator;

impl MessageNarrator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Narrator for MessageNarrator {
    fn name(&self) -> &str {
        "message"
    }

    fn accepts(&self, caps: &Caps) -> bool {
        caps.text(Field::Format) == Some("eml")
    }

    async fn narrate(&self, unit: &ContentUnit) -> Result<String, UnitError> {
        let caps = unit.caps();
        let sender = caps.text(Field::Sender).unwrap_or("an unknown sender");
        let recipients = match caps.get(Field::Recipients).and_then(Value::as_list) {
            Some(list) if !list.is_empty() => list.join(", "),
            _ => "unknown recipients".to_string(),
        };

        let mut text = format!("Email from {} to {}", sender, recipients);
        if let Some(date) = caps.text(Field::Date) {
            text.push_str(&format!(", sent {}", date));
        }
        match caps.text(Field::Subject) {
            Some(subject) => text.push_str(&format!(", with subject \"{}\".", subject)),
            None => text.push_str(", without a subject."),
        }

        let bytes = unit.payload().load().await?;
        let body = parse_message(&bytes)
            .map(|parsed| String::from_utf8_lossy(parsed.body).into_owned())
            .unwrap_or_default();
        let excerpt = excerpt(&body, BODY_EXCERPT_CHARS);
        if !excerpt.is_empty() {
            text.push_str("\n\n");
            text.push_str(&excerpt);
        }

        Ok(text)
    }
}

/// Whitespace-collapsed prefix of `body`, with an ellipsis when cut.
fn excerpt(body: &str, max_chars: usize) -> String {
    let collapsed = body.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &collapsed[..end]),
        None => collapsed,
    }
}
