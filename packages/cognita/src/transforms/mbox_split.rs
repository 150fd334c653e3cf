//! Fan-out of mailbox archives into message units.

use async_trait::async_trait;
use tracing::info;

use crate::error::{ElementError, UnitError};
use crate::identity::IdentityDeriver;
use crate::mailbox::{count_messages, MboxSplitter};
use crate::traits::element::{Emit, Transform};
use crate::types::caps::Field;
use crate::types::unit::ContentUnit;

/// Splits units typed `mbox` into one unit per message. Other units pass
/// through.
pub struct MboxSplit {
    splitter: MboxSplitter,
    keep_archive: bool,
}

impl MboxSplit {
    pub fn new(deriver: IdentityDeriver) -> Self {
        Self {
            splitter: MboxSplitter::new(deriver),
            keep_archive: true,
        }
    }

    /// Emit the archive unit itself ahead of its messages. Default: true.
    pub fn with_keep_archive(mut self, keep: bool) -> Self {
        self.keep_archive = keep;
        self
    }
}

#[async_trait]
impl Transform for MboxSplit {
    fn name(&self) -> &str {
        "mbox_split"
    }

    async fn transform(&self, mut unit: ContentUnit) -> Result<Emit, ElementError> {
        if unit.caps().text(Field::Format) != Some("mbox") {
            return Ok(Emit::One(unit));
        }

        let archive = unit.payload().load().await?;
        let count = count_messages(&archive);
        unit.caps_mut().set(Field::MessageCount, count as u64);

        let messages = self
            .splitter
            .split(archive, unit.caps(), unit.identity())
            .map_err(UnitError::from)?;

        info!(archive = %unit.display_name(), messages = count, "splitting mailbox");

        if self.keep_archive {
            Ok(Emit::many(std::iter::once(unit).chain(messages)))
        } else {
            Ok(Emit::many(messages))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::caps::Caps;

    const ARCHIVE: &[u8] = b"From alice@example.com Mon Jan  1 10:00:00 2024\n\
Message-ID: <1@example.com>\n\
From: alice@example.com\n\
Subject: First\n\
\n\
one\n\
\n\
From bob@example.com Mon Jan  1 11:00:00 2024\n\
From: bob@example.com\n\
Subject: Second\n\
\n\
two\n";

    fn mbox_unit() -> ContentUnit {
        ContentUnit::new(ARCHIVE).with_caps(Caps::new().with(Field::Format, "mbox"))
    }

    fn collect(emit: Emit) -> Vec<ContentUnit> {
        match emit {
            Emit::Many(units) => units.collect(),
            other => panic!("expected fan-out, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_archive_then_messages() {
        let units = collect(
            MboxSplit::new(IdentityDeriver::new("ns"))
                .transform(mbox_unit())
                .await
                .unwrap(),
        );

        assert_eq!(units.len(), 3);
        assert_eq!(units[0].caps().text(Field::Format), Some("mbox"));
        assert_eq!(units[0].caps().get(Field::MessageCount).and_then(|v| v.as_count()), Some(2));
        assert_eq!(units[1].identity().unwrap().iri(), "urn:ns:mail:1@example.com");
        // No Message-ID: hash of the message's own bytes
        assert!(units[2].identity().unwrap().iri().starts_with("urn:ns:content:"));
        assert_eq!(units[2].caps().get(Field::MessageCount).and_then(|v| v.as_count()), Some(2));
    }

    #[tokio::test]
    async fn test_drop_archive() {
        let units = collect(
            MboxSplit::new(IdentityDeriver::new("ns"))
                .with_keep_archive(false)
                .transform(mbox_unit())
                .await
                .unwrap(),
        );
        assert_eq!(units.len(), 2);
        assert!(units.iter().all(|u| u.caps().text(Field::Format) == Some("eml")));
    }

    #[tokio::test]
    async fn test_other_formats_pass_through() {
        let unit = ContentUnit::new("text").with_caps(Caps::new().with(Field::Format, "text"));
        let emit = MboxSplit::new(IdentityDeriver::new("ns"))
            .transform(unit)
            .await
            .unwrap();
        assert!(matches!(emit, Emit::One(_)));
    }

    #[tokio::test]
    async fn test_mistyped_archive_fails_unit() {
        let unit = ContentUnit::new("not an archive").with_caps(Caps::new().with(Field::Format, "mbox"));
        let err = MboxSplit::new(IdentityDeriver::new("ns"))
            .transform(unit)
            .await
            .unwrap_err();
        assert!(!err.fatal);
        assert!(matches!(err.error, UnitError::Parse(_)));
    }
}
