//! Mailbox (mbox) splitting.
//!
//! An archive is a sequence of messages, each introduced by a
//! `From <sender> <date>` line at the start of the archive or right after a
//! blank line. Splitting is lazy: each message is parsed when the iterator
//! reaches it. A message that cannot be parsed becomes a placeholder unit
//! carrying a [`ParseError`] annotation, and splitting continues.

pub mod headers;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::detect::signatures::is_from_line;
use crate::error::ParseError;
use crate::identity::{content_hash, IdentityDeriver};
use crate::triples::vocab;
use crate::types::caps::{Caps, Field};
use crate::types::identity::{Identity, TypeCategory};
use crate::types::triple::Term;
use crate::types::unit::{ContentUnit, ParentRef};

pub use headers::{address_of, parse_message, split_addresses, Headers, ParsedMessage};

/// Stage name used in annotations.
pub const STAGE: &str = "mbox_split";

/// One framed message: its position and raw bytes (without the `From `
/// separator line).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub index: usize,
    pub bytes: Bytes,
}

/// Iterator over the framed messages of an archive. A clone continues from
/// the same position.
#[derive(Debug, Clone)]
pub struct RawMessages {
    archive: Bytes,
    pos: usize,
    index: usize,
}

impl RawMessages {
    /// Frame an archive. Leading blank lines are skipped; the first
    /// remaining line must be a `From ` separator.
    pub fn new(archive: Bytes) -> Result<Self, ParseError> {
        let mut pos = 0;
        while let Some(line) = line_at(&archive, pos) {
            if !is_blank(line) {
                break;
            }
            pos += line.len();
        }

        match line_at(&archive, pos) {
            Some(line) if is_from_line(line) => Ok(Self {
                archive,
                pos,
                index: 0,
            }),
            Some(_) => Err(ParseError::NotMailbox(
                "first line is not a From separator".into(),
            )),
            None => Err(ParseError::NotMailbox("archive is empty".into())),
        }
    }
}

impl Iterator for RawMessages {
    type Item = RawMessage;

    fn next(&mut self) -> Option<RawMessage> {
        // Skip the separator line
        let separator = line_at(&self.archive, self.pos)?;
        let start = self.pos + separator.len();

        let mut cursor = start;
        let mut previous_blank = true;
        let mut end = self.archive.len();
        while let Some(line) = line_at(&self.archive, cursor) {
            if previous_blank && cursor != start && is_from_line(line) {
                end = cursor;
                break;
            }
            previous_blank = is_blank(line);
            cursor += line.len();
        }

        // The blank line before the next separator belongs to the framing
        let mut body_end = end;
        if end < self.archive.len() {
            body_end = strip_one_eol(&self.archive[start..end]) + start;
        }

        let message = RawMessage {
            index: self.index,
            bytes: self.archive.slice(start..body_end),
        };
        self.pos = end;
        self.index += 1;
        Some(message)
    }
}

/// Record a message's sender, recipients, date, subject and Message-ID in
/// caps. The Message-ID is kept verbatim; it is returned when non-blank.
pub fn write_header_caps<'h>(headers: &'h Headers, caps: &mut Caps) -> Option<&'h str> {
    if let Some(from) = headers.get("from") {
        caps.set(Field::Sender, from);
    }
    if let Some(to) = headers.get("to") {
        caps.set(Field::Recipients, split_addresses(to));
    }
    if let Some(date) = headers.get("date") {
        caps.set(Field::Date, date);
    }
    if let Some(subject) = headers.get("subject") {
        caps.set(Field::Subject, subject);
    }
    let message_id = headers.get("message-id").filter(|id| !id.trim().is_empty());
    if let Some(id) = message_id {
        caps.set(Field::MessageId, id);
    }
    message_id
}

/// Number of messages in an archive (0 if it is not an mbox).
pub fn count_messages(archive: &Bytes) -> usize {
    RawMessages::new(archive.clone())
        .map(|messages| messages.count())
        .unwrap_or(0)
}

/// Splits mailbox units into per-message units.
#[derive(Debug, Clone)]
pub struct MboxSplitter {
    deriver: IdentityDeriver,
}

impl MboxSplitter {
    pub fn new(deriver: IdentityDeriver) -> Self {
        Self { deriver }
    }

    /// Split an archive into message units.
    ///
    /// `parent_caps` and `parent_identity` describe the archive unit. Each
    /// child gets the archive-level fields of `parent_caps`, its own
    /// headers and identity, and an `isPartOf` link to the archive. The
    /// returned iterator is forward-only; call `split` again to restart.
    pub fn split(
        &self,
        archive: Bytes,
        parent_caps: &Caps,
        parent_identity: Option<&Identity>,
    ) -> Result<MessageIter, ParseError> {
        let messages = RawMessages::new(archive)?;
        let mut inherited = parent_caps.inherit_for_child();
        if let Some(identity) = parent_identity {
            inherited.set(Field::ArchiveIdentity, identity.iri());
        }

        Ok(MessageIter {
            messages,
            deriver: self.deriver.clone(),
            inherited,
            parent_identity: parent_identity.cloned(),
        })
    }
}

/// Lazy sequence of message units.
#[derive(Debug, Clone)]
pub struct MessageIter {
    messages: RawMessages,
    deriver: IdentityDeriver,
    inherited: Caps,
    parent_identity: Option<Identity>,
}

impl MessageIter {
    fn build(&self, raw: RawMessage) -> ContentUnit {
        let parent = ParentRef {
            identity: self.parent_identity.clone(),
            index: raw.index,
        };

        let parsed = match parse_message(&raw.bytes) {
            Ok(parsed) => parsed,
            Err(reason) => {
                let error = ParseError::Message {
                    index: raw.index,
                    reason,
                };
                warn!(index = raw.index, error = %error, "skipping malformed message");
                return ContentUnit::placeholder(STAGE, error.to_string())
                    .with_caps(self.inherited.clone())
                    .with_parent(parent);
            }
        };

        let mut caps = self.inherited.clone();
        caps.set(Field::MediaType, "message/rfc822");
        caps.set(Field::Format, "eml");
        caps.set(Field::TypeSource, "container");
        caps.set(Field::ContentHash, content_hash(&raw.bytes));

        let message_id = write_header_caps(&parsed.headers, &mut caps);

        let identity = self
            .deriver
            .derive_bytes(&raw.bytes, TypeCategory::Mail, message_id);

        if let Some(parent_identity) = &self.parent_identity {
            caps.add_triple(
                identity.iri(),
                vocab::DCTERMS_IS_PART_OF,
                Term::iri(parent_identity.iri()),
            );
        }

        debug!(index = raw.index, identity = %identity, "split message");

        let mut unit = ContentUnit::new(raw.bytes.clone())
            .with_caps(caps)
            .with_parent(parent);
        unit.set_identity(identity);
        unit
    }
}

impl Iterator for MessageIter {
    type Item = ContentUnit;

    fn next(&mut self) -> Option<ContentUnit> {
        let raw = self.messages.next()?;
        Some(self.build(raw))
    }
}

/// The line starting at `pos`, including its terminator.
fn line_at(bytes: &[u8], pos: usize) -> Option<&[u8]> {
    if pos >= bytes.len() {
        return None;
    }
    let end = bytes[pos..]
        .iter()
        .position(|b| *b == b'\n')
        .map(|i| pos + i + 1)
        .unwrap_or(bytes.len());
    Some(&bytes[pos..end])
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(|b| matches!(b, b'\n' | b'\r'))
}

/// Length of `bytes` without one trailing line ending.
fn strip_one_eol(bytes: &[u8]) -> usize {
    if bytes.ends_with(b"\r\n") {
        bytes.len() - 2
    } else if bytes.ends_with(b"\n") {
        bytes.len() - 1
    } else {
        bytes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::caps::Value;

    const ARCHIVE: &str = "From alice@example.com Mon Jan  1 10:00:00 2024\n\
Message-ID: <one@example.com>\n\
From: Alice <alice@example.com>\n\
To: bob@example.com, carol@example.com\n\
Date: Mon, 1 Jan 2024 10:00:00 +0000\n\
Subject: First\n\
\n\
Hello Bob.\n\
\n\
From bob@example.com Tue Jan  2 11:00:00 2024\n\
From: bob@example.com\n\
Subject: No id here\n\
\n\
Reply body.\n\
\n\
From carol@example.com Wed Jan  3 12:00:00 2024\n\
Message-ID: <three@example.com>\n\
From: carol@example.com\n\
Subject: Third\n\
\n\
From the desk of Carol: this line is body text, not a separator.\n";

    fn splitter() -> MboxSplitter {
        MboxSplitter::new(IdentityDeriver::new("cognita"))
    }

    fn archive_identity() -> Identity {
        IdentityDeriver::new("cognita").derive_bytes(ARCHIVE.as_bytes(), TypeCategory::Mail, None)
    }

    #[test]
    fn test_raw_framing() {
        let messages: Vec<_> = RawMessages::new(Bytes::from_static(ARCHIVE.as_bytes()))
            .unwrap()
            .collect();
        assert_eq!(messages.len(), 3);
        assert!(messages[0].bytes.starts_with(b"Message-ID: <one@example.com>"));
        assert!(messages[0].bytes.ends_with(b"Hello Bob.\n"));
        assert!(messages[2].bytes.ends_with(b"not a separator.\n"));
    }

    #[test]
    fn test_quoted_from_line_kept_verbatim() {
        let archive = "From a@x Mon Jan  1 10:00:00 2024\n\
Subject: quoting\n\
\n\
>From here on it is body text.\n\
\n\
>From again, after a blank line.\n";
        let messages: Vec<_> = RawMessages::new(Bytes::from_static(archive.as_bytes()))
            .unwrap()
            .collect();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].bytes.ends_with(
            b"\n>From here on it is body text.\n\n>From again, after a blank line.\n"
        ));
    }

    #[test]
    fn test_split_yields_one_unit_per_message() {
        let parent = archive_identity();
        let parent_caps = Caps::new()
            .with(Field::SourceUri, "file:///tmp/a.mbox")
            .with(Field::Format, "mbox")
            .with(Field::MessageCount, 3u64);

        let units: Vec<_> = splitter()
            .split(Bytes::from_static(ARCHIVE.as_bytes()), &parent_caps, Some(&parent))
            .unwrap()
            .collect();

        assert_eq!(units.len(), 3);
        let ids: std::collections::HashSet<_> =
            units.iter().map(|u| u.identity().unwrap().iri().to_string()).collect();
        assert_eq!(ids.len(), 3);

        let first = &units[0];
        assert_eq!(first.identity().unwrap().iri(), "urn:cognita:mail:one@example.com");
        assert_eq!(first.caps().text(Field::MessageId), Some("<one@example.com>"));
        assert_eq!(first.caps().text(Field::Subject), Some("First"));
        assert_eq!(
            first.caps().get(Field::Recipients).and_then(Value::as_list).map(|l| l.len()),
            Some(2)
        );
        assert_eq!(first.caps().text(Field::SourceUri), Some("file:///tmp/a.mbox"));
        assert_eq!(first.caps().text(Field::ArchiveIdentity), Some(parent.iri()));
        assert_eq!(first.caps().text(Field::Format), Some("eml"));
        assert_eq!(first.parent().unwrap().index, 0);
        assert!(first.caps().triples().any(|t| t.predicate == vocab::DCTERMS_IS_PART_OF
            && t.object == Term::iri(parent.iri())));

        // No Message-ID: hash of the message's own bytes
        let second = &units[1];
        let hash = second.caps().text(Field::ContentHash).unwrap();
        assert_eq!(
            second.identity().unwrap().iri(),
            format!("urn:cognita:content:{}", hash)
        );
        assert_ne!(second.identity().unwrap().content_hash(), parent.content_hash());
    }

    #[test]
    fn test_split_is_restartable() {
        let archive = Bytes::from_static(ARCHIVE.as_bytes());
        let first: Vec<_> = splitter()
            .split(archive.clone(), &Caps::new(), None)
            .unwrap()
            .map(|u| u.identity().cloned())
            .collect();
        let second: Vec<_> = splitter()
            .split(archive, &Caps::new(), None)
            .unwrap()
            .map(|u| u.identity().cloned())
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_malformed_message_becomes_placeholder() {
        let archive = "From a@x Mon Jan  1 10:00:00 2024\n\
Subject: ok\n\
\n\
body\n\
\n\
From b@x Mon Jan  1 11:00:00 2024\n\
this line is not a header\n\
\n\
From c@x Mon Jan  1 12:00:00 2024\n\
Message-ID: <c@x>\n\
Subject: still here\n\
\n\
body\n";
        let units: Vec<_> = splitter()
            .split(Bytes::from_static(archive.as_bytes()), &Caps::new(), None)
            .unwrap()
            .collect();

        assert_eq!(units.len(), 3);
        assert!(!units[0].is_placeholder());
        assert!(units[1].is_placeholder());
        assert!(units[1].annotations()[0].message.contains("malformed message #1"));
        assert_eq!(units[2].identity().unwrap().iri(), "urn:cognita:mail:c@x");
    }

    #[test]
    fn test_not_a_mailbox() {
        let err = splitter()
            .split(Bytes::from_static(b"Subject: hi\n\nbody"), &Caps::new(), None)
            .unwrap_err();
        assert!(matches!(err, ParseError::NotMailbox(_)));
        assert_eq!(count_messages(&Bytes::from_static(b"")), 0);
    }

    #[test]
    fn test_crlf_archive() {
        let archive = "From a@x Mon Jan  1 10:00:00 2024\r\nSubject: one\r\n\r\nbody\r\n\r\nFrom b@x Mon Jan  1 11:00:00 2024\r\nSubject: two\r\n\r\nbody\r\n";
        assert_eq!(count_messages(&Bytes::from_static(archive.as_bytes())), 2);
    }
}
