use async_trait::async_trait;

use crate::error::UnitError;
use crate::mailbox::{parse_message, RawMessages};
use crate::traits::narrator::Narrator;
use crate::types::caps::{Caps, Field};
use crate::types::unit::ContentUnit;

/// Messages listed before the summary is cut short.
pub const MAILBOX_LISTING_LIMIT: usize = 50;

/// Summarizes a whole mbox archive: message count plus date, sender and
/// subject of the first messages. No service calls.
#[derive(Debug, Clone, Default)]
pub struct MailboxNarrator;

impl MailboxNarrator {
    pub fn new() -> Self {
        Self
    }
}

fn archive_name(caps: &Caps) -> &str {
    caps.text(Field::SourceUri)
        .and_then(|uri| uri.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .unwrap_or("mailbox")
}

#[async_trait]
impl Narrator for MailboxNarrator {
    fn name(&self) -> &str {
        "mailbox"
    }

    fn accepts(&self, caps: &Caps) -> bool {
        caps.text(Field::Format) == Some("mbox")
    }

    async fn narrate(&self, unit: &ContentUnit) -> Result<String, UnitError> {
        let archive = unit.payload().load().await?;
        let messages: Vec<_> = RawMessages::new(archive)?.collect();

        let mut lines = vec![format!(
            "Mailbox: {} containing {} messages.\n",
            archive_name(unit.caps()),
            messages.len()
        )];

        for message in messages.iter().take(MAILBOX_LISTING_LIMIT) {
            let headers = parse_message(&message.bytes)
                .map(|parsed| parsed.headers)
                .unwrap_or_default();
            lines.push(format!(
                "{}. [{}] From: {} | Subject: {}",
                message.index + 1,
                headers.get("date").unwrap_or("(Unknown Date)"),
                headers.get("from").unwrap_or("(Unknown Sender)"),
                headers.get("subject").unwrap_or("(No Subject)"),
            ));
        }
        if messages.len() > MAILBOX_LISTING_LIMIT {
            lines.push(format!(
                "... and {} more messages.",
                messages.len() - MAILBOX_LISTING_LIMIT
            ));
        }

        Ok(lines.join("\n"))
    }
}
