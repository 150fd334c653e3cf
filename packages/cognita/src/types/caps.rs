//! Caps: the semantic metadata carried by every content unit.
//!
//! A Caps instance is an ordered map of well-known scalar [`Field`]s plus a
//! set of [`Triple`]s. Fields are last-writer-wins; triples are a set, so
//! adding the same statement twice stores it once. Nothing is ever removed.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::triple::{Term, Triple};

/// Well-known scalar fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    MediaType,
    Format,
    /// Which detection stage resolved the type ("signature", "classifier", "none")
    TypeSource,
    ContentHash,
    MessageId,
    Identity,
    Narration,
    SourceUri,
    Sender,
    Recipients,
    Date,
    Subject,
    MessageCount,
    Extensions,
    Description,
    ArchiveIdentity,
}

impl Field {
    pub const ALL: [Field; 16] = [
        Field::MediaType,
        Field::Format,
        Field::TypeSource,
        Field::ContentHash,
        Field::MessageId,
        Field::Identity,
        Field::Narration,
        Field::SourceUri,
        Field::Sender,
        Field::Recipients,
        Field::Date,
        Field::Subject,
        Field::MessageCount,
        Field::Extensions,
        Field::Description,
        Field::ArchiveIdentity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::MediaType => "media_type",
            Field::Format => "format",
            Field::TypeSource => "type_source",
            Field::ContentHash => "content_hash",
            Field::MessageId => "message_id",
            Field::Identity => "identity",
            Field::Narration => "narration",
            Field::SourceUri => "source_uri",
            Field::Sender => "sender",
            Field::Recipients => "recipients",
            Field::Date => "date",
            Field::Subject => "subject",
            Field::MessageCount => "message_count",
            Field::Extensions => "extensions",
            Field::Description => "description",
            Field::ArchiveIdentity => "archive_identity",
        }
    }

    /// Archive-level fields a split child receives from its parent.
    pub fn inherited_by_children(&self) -> bool {
        matches!(
            self,
            Field::SourceUri | Field::ArchiveIdentity | Field::MessageCount
        )
    }
}

/// A scalar field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Text(String),
    Count(u64),
    List(Vec<String>),
    /// Explicitly resolved as "not known" (distinct from an absent field)
    Unknown,
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_count(&self) -> Option<u64> {
        match self {
            Value::Count(count) => Some(*count),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown)
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Text(text) => json!(text),
            Value::Count(count) => json!(count),
            Value::List(items) => json!(items),
            Value::Unknown => json!("unknown"),
        }
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<u64> for Value {
    fn from(count: u64) -> Self {
        Value::Count(count)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items)
    }
}

/// Semantic metadata container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caps {
    fields: IndexMap<Field, Value>,
    triples: IndexSet<Triple>,
}

impl Caps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Caps::set`].
    pub fn with(mut self, field: Field, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn get(&self, field: Field) -> Option<&Value> {
        self.fields.get(&field)
    }

    /// Text value of a field, if present and textual.
    pub fn text(&self, field: Field) -> Option<&str> {
        self.get(field).and_then(Value::as_text)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.fields.contains_key(&field)
    }

    /// Set a field, returning the previous value.
    ///
    /// Elements should only set fields they own. [`Field::Identity`] is
    /// write-once: when already present it is left unchanged and the
    /// current value is returned.
    pub fn set(&mut self, field: Field, value: impl Into<Value>) -> Option<Value> {
        if field == Field::Identity {
            if let Some(current) = self.fields.get(&field) {
                return Some(current.clone());
            }
        }
        self.fields.insert(field, value.into())
    }

    /// Fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (Field, &Value)> + '_ {
        self.fields.iter().map(|(field, value)| (*field, value))
    }

    /// Add a statement. Returns false if it was already present.
    pub fn add_triple(
        &mut self,
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: Term,
    ) -> bool {
        self.triples.insert(Triple::new(subject, predicate, object))
    }

    pub fn extend_triples(&mut self, triples: impl IntoIterator<Item = Triple>) {
        self.triples.extend(triples);
    }

    /// Statements in insertion order. Call again to restart.
    pub fn triples(&self) -> impl Iterator<Item = &Triple> + '_ {
        self.triples.iter()
    }

    pub fn triple_count(&self) -> usize {
        self.triples.len()
    }

    /// Combine two caps: `other` wins on field conflicts except an
    /// identity already present, triples are unioned.
    pub fn merge(&self, other: &Caps) -> Caps {
        let mut merged = self.clone();
        for (field, value) in &other.fields {
            merged.set(*field, value.clone());
        }
        merged.triples.extend(other.triples.iter().cloned());
        merged
    }

    /// Fresh caps for a unit split out of this one: only archive-level
    /// fields, no triples.
    pub fn inherit_for_child(&self) -> Caps {
        Caps {
            fields: self
                .fields
                .iter()
                .filter(|(field, _)| field.inherited_by_children())
                .map(|(field, value)| (*field, value.clone()))
                .collect(),
            triples: IndexSet::new(),
        }
    }

    /// Detected format, else media type, else "unknown".
    pub fn label(&self) -> &str {
        self.text(Field::Format)
            .or_else(|| self.text(Field::MediaType))
            .unwrap_or("unknown")
    }

    /// Flat JSON object of the scalar fields, for display.
    pub fn summary_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|(field, value)| (field.as_str().to_string(), value.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }
}
