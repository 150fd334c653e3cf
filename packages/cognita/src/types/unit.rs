//! Content units: payload plus caps, flowing through a pipeline.

use std::fmt;
use std::path::{Path, PathBuf};

use bytes::Bytes;

use super::caps::{Caps, Field};
use super::identity::Identity;

/// Raw payload of a content unit. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Bytes held in memory
    Inline(Bytes),

    /// Reference to a file, with its first bytes prebuffered
    File {
        path: PathBuf,
        prefix: Bytes,
        len: u64,
    },
}

impl Payload {
    pub fn empty() -> Self {
        Payload::Inline(Bytes::new())
    }

    /// The bytes available without I/O: everything for inline payloads,
    /// the prebuffered prefix for file payloads.
    pub fn prefix(&self) -> &[u8] {
        match self {
            Payload::Inline(bytes) => bytes,
            Payload::File { prefix, .. } => prefix,
        }
    }

    pub fn len(&self) -> u64 {
        match self {
            Payload::Inline(bytes) => bytes.len() as u64,
            Payload::File { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when [`Payload::prefix`] holds the whole payload.
    pub fn is_complete(&self) -> bool {
        self.prefix().len() as u64 == self.len()
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Payload::Inline(_) => None,
            Payload::File { path, .. } => Some(path),
        }
    }

    /// Read the full payload.
    pub async fn load(&self) -> std::io::Result<Bytes> {
        match self {
            Payload::Inline(bytes) => Ok(bytes.clone()),
            Payload::File { prefix, len, .. } if prefix.len() as u64 == *len => {
                Ok(prefix.clone())
            }
            Payload::File { path, .. } => Ok(Bytes::from(tokio::fs::read(path).await?)),
        }
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Payload::Inline(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Inline(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for Payload {
    fn from(bytes: &'static [u8]) -> Self {
        Payload::Inline(Bytes::from_static(bytes))
    }
}

impl<const N: usize> From<&'static [u8; N]> for Payload {
    fn from(bytes: &'static [u8; N]) -> Self {
        Payload::Inline(Bytes::from_static(bytes))
    }
}

impl From<&'static str> for Payload {
    fn from(text: &'static str) -> Self {
        Payload::Inline(Bytes::from_static(text.as_bytes()))
    }
}

/// Error or note recorded against a unit by a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub stage: String,
    pub message: String,
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.message)
    }
}

/// Reference from a split unit to the unit it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentRef {
    /// Parent identity, if it had one when split
    pub identity: Option<Identity>,

    /// Position of this unit among its siblings (0-based)
    pub index: usize,
}

/// One datum in the pipeline.
#[derive(Debug, Clone)]
pub struct ContentUnit {
    payload: Payload,
    caps: Caps,
    identity: Option<Identity>,
    parent: Option<ParentRef>,
    annotations: Vec<Annotation>,
    placeholder: bool,
}

impl ContentUnit {
    pub fn new(payload: impl Into<Payload>) -> Self {
        Self {
            payload: payload.into(),
            caps: Caps::new(),
            identity: None,
            parent: None,
            annotations: Vec::new(),
            placeholder: false,
        }
    }

    /// A payload-less unit that only carries an annotation for a skipped item.
    pub fn placeholder(stage: impl Into<String>, message: impl Into<String>) -> Self {
        let mut unit = Self::new(Payload::empty());
        unit.placeholder = true;
        unit.annotate(stage, message);
        unit
    }

    pub fn with_caps(mut self, caps: Caps) -> Self {
        self.caps = caps;
        self
    }

    pub fn with_parent(mut self, parent: ParentRef) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn caps(&self) -> &Caps {
        &self.caps
    }

    /// Caps can be extended but never replaced wholesale once the unit
    /// is in flight.
    pub fn caps_mut(&mut self) -> &mut Caps {
        &mut self.caps
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Assign the unit's identity. Identities are set once: a second call,
    /// or a call after caps already carry an identity, leaves the first in
    /// place and returns false.
    pub fn set_identity(&mut self, identity: Identity) -> bool {
        if self.identity.is_some() || self.caps.contains(Field::Identity) {
            return false;
        }
        self.caps.set(Field::Identity, identity.iri());
        self.identity = Some(identity);
        true
    }

    pub fn parent(&self) -> Option<&ParentRef> {
        self.parent.as_ref()
    }

    pub fn annotate(&mut self, stage: impl Into<String>, message: impl Into<String>) {
        self.annotations.push(Annotation {
            stage: stage.into(),
            message: message.into(),
        });
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    /// Identity IRI or a short description, for logs.
    pub fn display_name(&self) -> String {
        match (&self.identity, self.caps.text(Field::SourceUri)) {
            (Some(identity), _) => identity.iri().to_string(),
            (None, Some(uri)) => uri.to_string(),
            (None, None) if self.placeholder => "placeholder".to_string(),
            (None, None) => format!("<{} bytes>", self.payload.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityDeriver;
    use crate::types::identity::TypeCategory;

    #[test]
    fn test_identity_is_set_once() {
        let deriver = IdentityDeriver::new("cognita");
        let mut unit = ContentUnit::new("hello");

        let first = deriver.derive_bytes(b"hello", TypeCategory::Document, None);
        let second = deriver.derive_bytes(b"other", TypeCategory::Document, None);

        assert!(unit.set_identity(first.clone()));
        assert!(!unit.set_identity(second));
        assert_eq!(unit.identity(), Some(&first));
        assert_eq!(unit.caps().text(Field::Identity), Some(first.iri()));

        // Caps cannot swap the identity out from under the unit
        unit.caps_mut().set(Field::Identity, "urn:cognita:content:forged");
        assert_eq!(unit.caps().text(Field::Identity), Some(first.iri()));
    }

    #[test]
    fn test_caps_identity_blocks_derived_identity() {
        let deriver = IdentityDeriver::new("cognita");
        let mut unit = ContentUnit::new("hello")
            .with_caps(Caps::new().with(Field::Identity, "urn:cognita:content:abc123"));

        let derived = deriver.derive_bytes(b"hello", TypeCategory::Document, None);
        assert!(!unit.set_identity(derived));
        assert!(unit.identity().is_none());
        assert_eq!(unit.caps().text(Field::Identity), Some("urn:cognita:content:abc123"));
    }

    #[test]
    fn test_placeholder_carries_annotation() {
        let unit = ContentUnit::placeholder("mbox_split", "missing header separator");
        assert!(unit.is_placeholder());
        assert!(unit.payload().is_empty());
        assert_eq!(
            unit.annotations()[0].to_string(),
            "[mbox_split] missing header separator"
        );
    }

    #[tokio::test]
    async fn test_file_payload_loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"0123456789").unwrap();

        let payload = Payload::File {
            path: path.clone(),
            prefix: Bytes::from_static(b"0123"),
            len: 10,
        };

        assert!(!payload.is_complete());
        assert_eq!(payload.prefix(), b"0123");
        assert_eq!(&payload.load().await.unwrap()[..], b"0123456789");
    }
}
