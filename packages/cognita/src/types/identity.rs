//! Identity and type-category values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Broad content category. Names the `<type-category>` component of
/// natural-key identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeCategory {
    Document,
    Image,
    Video,
    Mail,
    Calendar,
    Binary,
    Unknown,
}

impl TypeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeCategory::Document => "document",
            TypeCategory::Image => "image",
            TypeCategory::Video => "video",
            TypeCategory::Mail => "mail",
            TypeCategory::Calendar => "calendar",
            TypeCategory::Binary => "binary",
            TypeCategory::Unknown => "unknown",
        }
    }

    /// Guess a category from a MIME type (used for classifier answers).
    pub fn from_media_type(media_type: &str) -> Self {
        let media_type = media_type.trim().to_ascii_lowercase();
        let (top, sub) = media_type.split_once('/').unwrap_or((media_type.as_str(), ""));
        match (top, sub) {
            ("image", _) => TypeCategory::Image,
            ("video", _) => TypeCategory::Video,
            ("message", _) | ("application", "mbox") => TypeCategory::Mail,
            ("text", "calendar") => TypeCategory::Calendar,
            ("text", _) | ("application", "pdf") => TypeCategory::Document,
            ("application", s) if s.contains("officedocument") || s.contains("msword") => {
                TypeCategory::Document
            }
            ("application", "") | ("", _) => TypeCategory::Unknown,
            ("application", _) => TypeCategory::Binary,
            _ => TypeCategory::Unknown,
        }
    }
}

impl fmt::Display for TypeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an identity was derived.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum IdentityKind {
    /// Lowercase hex digest of the payload bytes
    ContentHash(String),

    /// Normalized domain key (e.g. a Message-ID without angle brackets)
    NaturalKey(String),
}

/// Stable identifier minted for a content unit.
///
/// Built by [`crate::identity::IdentityDeriver`]; immutable once minted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    iri: String,
    kind: IdentityKind,
}

impl Identity {
    pub(crate) fn new(iri: String, kind: IdentityKind) -> Self {
        Self { iri, kind }
    }

    /// Canonical `urn:` identifier.
    pub fn iri(&self) -> &str {
        &self.iri
    }

    pub fn kind(&self) -> &IdentityKind {
        &self.kind
    }

    pub fn content_hash(&self) -> Option<&str> {
        match &self.kind {
            IdentityKind::ContentHash(hash) => Some(hash),
            IdentityKind::NaturalKey(_) => None,
        }
    }

    pub fn natural_key(&self) -> Option<&str> {
        match &self.kind {
            IdentityKind::NaturalKey(key) => Some(key),
            IdentityKind::ContentHash(_) => None,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.iri)
    }
}
