//! Triple extraction.
//!
//! Statements are always anchored to a subject derivable from the unit's
//! caps: its identity, or failing that its content hash or Message-ID.
//! Sender and recipient statements describe a synthesized person
//! identifier instead. Free-text statements from the AI service are
//! best-effort and always use the unit's subject.

pub mod turtle;
pub mod vocab;

use std::sync::Arc;

use chrono::DateTime;
use tracing::debug;

use crate::detect::signatures::signature_for_format;
use crate::error::ExtractionError;
use crate::identity::{normalize_natural_key, IdentityDeriver};
use crate::mailbox::address_of;
use crate::traits::ai::{StatementRequest, AI};
use crate::types::caps::{Caps, Field, Value};
use crate::types::config::CognitaConfig;
use crate::types::identity::TypeCategory;
use crate::types::triple::{Term, Triple};

pub use turtle::Graph;

/// Extracts triples from narration text plus caps.
#[derive(Clone)]
pub struct TripleExtractor {
    deriver: IdentityDeriver,
    ai: Option<Arc<dyn AI>>,
    tbox: Option<String>,
    min_text_length: usize,
}

impl TripleExtractor {
    /// Deterministic extractor (no AI statements).
    pub fn new(deriver: IdentityDeriver) -> Self {
        Self {
            deriver,
            ai: None,
            tbox: None,
            min_text_length: 50,
        }
    }

    pub fn from_config(config: &CognitaConfig, ai: Option<Arc<dyn AI>>) -> Self {
        Self {
            deriver: IdentityDeriver::new(config.namespace.clone()),
            ai,
            tbox: None,
            min_text_length: config.min_text_length,
        }
    }

    /// Ask the AI service for statements about narrated units.
    pub fn with_ai(mut self, ai: Arc<dyn AI>) -> Self {
        self.ai = Some(ai);
        self
    }

    /// Ontology the extracted predicates should come from.
    pub fn with_tbox(mut self, tbox: impl Into<String>) -> Self {
        self.tbox = Some(tbox.into());
        self
    }

    pub fn with_min_text_length(mut self, length: usize) -> Self {
        self.min_text_length = length;
        self
    }

    pub fn namespace(&self) -> &str {
        self.deriver.namespace()
    }

    /// Subject IRI derivable from caps, if any.
    pub fn subject_for(&self, caps: &Caps) -> Option<String> {
        if let Some(identity) = caps.text(Field::Identity) {
            return Some(identity.to_string());
        }
        if let Some(hash) = caps.text(Field::ContentHash) {
            return Some(format!("urn:{}:content:{}", self.namespace(), hash));
        }
        caps.text(Field::MessageId)
            .and_then(normalize_natural_key)
            .map(|key| self.deriver.mint(TypeCategory::Mail.as_str(), &key))
    }

    /// Deterministic triples for a unit's narration and caps.
    pub fn extract(&self, text: &str, caps: &Caps) -> Result<Vec<Triple>, ExtractionError> {
        let subject = self.subject_for(caps).ok_or(ExtractionError::NoSubject)?;
        let mut out = Vec::new();
        let mut push = |predicate: &str, object: Term| {
            out.push(Triple::new(subject.clone(), predicate, object));
        };

        if let Some(class) = self.class_for(caps) {
            push(vocab::RDF_TYPE, Term::iri(class));
        }
        if let Some(media_type) = caps.text(Field::MediaType) {
            push(vocab::DCTERMS_FORMAT, Term::literal(media_type));
        }
        let text = text.trim();
        if !text.is_empty() {
            push(vocab::DCTERMS_DESCRIPTION, Term::literal(text));
        }
        if let Some(title) = caps.text(Field::Subject) {
            push(vocab::DCTERMS_TITLE, Term::literal(title));
        }
        if let Some(date) = caps.text(Field::Date) {
            push(vocab::DCTERMS_DATE, date_term(date));
        }
        if let Some(id) = caps.text(Field::MessageId) {
            push(vocab::SCHEMA_IDENTIFIER, Term::literal(id));
        }
        if let Some(hash) = caps.text(Field::ContentHash) {
            push(vocab::SCHEMA_SHA256, Term::literal(hash));
        }
        if let Some(archive) = caps.text(Field::ArchiveIdentity) {
            push(vocab::DCTERMS_IS_PART_OF, Term::iri(archive));
        }
        if let Some(uri) = caps.text(Field::SourceUri) {
            let object = if uri.contains("://") {
                Term::iri(uri)
            } else {
                Term::literal(uri)
            };
            push(vocab::DCTERMS_SOURCE, object);
        }
        // Children inherit the archive's count; it describes the archive only
        let message_count = caps
            .get(Field::MessageCount)
            .and_then(Value::as_count)
            .filter(|_| caps.text(Field::Format) == Some("mbox"));
        if let Some(count) = message_count {
            push(
                &format!("{}messageCount", vocab::vocab_namespace(self.namespace())),
                Term::typed(count.to_string(), vocab::XSD_INTEGER),
            );
        }

        if let Some(sender) = caps.text(Field::Sender) {
            self.person_triples(&subject, vocab::SCHEMA_SENDER, sender, &mut out);
        }
        if let Some(recipients) = caps.get(Field::Recipients).and_then(Value::as_list) {
            for recipient in recipients {
                self.person_triples(&subject, vocab::SCHEMA_RECIPIENT, recipient, &mut out);
            }
        }

        Ok(out)
    }

    /// Best-effort statements from the AI service. Returns nothing when no
    /// service is configured or the text is shorter than the threshold.
    pub async fn extract_statements(
        &self,
        text: &str,
        caps: &Caps,
    ) -> Result<Vec<Triple>, ExtractionError> {
        let ai = match &self.ai {
            Some(ai) => ai,
            None => return Ok(Vec::new()),
        };
        let text = text.trim();
        if text.chars().count() < self.min_text_length {
            debug!(len = text.len(), "narration too short for statement extraction");
            return Ok(Vec::new());
        }
        let subject = self.subject_for(caps).ok_or(ExtractionError::NoSubject)?;

        let request = StatementRequest {
            subject: subject.clone(),
            text: text.to_string(),
            tbox: self.tbox.clone(),
            mail: caps.text(Field::Format).is_some_and(|f| f == "eml" || f == "mbox"),
        };
        let statements = ai.extract_statements(&request).await?;

        Ok(statements
            .into_iter()
            .map(|statement| {
                let object = statement.object.trim();
                let object = if looks_like_iri(object) {
                    Term::iri(object)
                } else {
                    Term::literal(object)
                };
                Triple::new(
                    subject.clone(),
                    vocab::map_predicate(&statement.predicate, self.namespace()),
                    object,
                )
            })
            .collect())
    }

    fn class_for(&self, caps: &Caps) -> Option<String> {
        let format = caps.text(Field::Format);
        if format == Some("mbox") {
            return Some(format!("{}Mailbox", vocab::vocab_namespace(self.namespace())));
        }
        let category = format
            .and_then(signature_for_format)
            .map(|sig| sig.category)
            .or_else(|| caps.text(Field::MediaType).map(TypeCategory::from_media_type))?;

        let class = match category {
            TypeCategory::Document => vocab::SCHEMA_DIGITAL_DOCUMENT.to_string(),
            TypeCategory::Image => vocab::SCHEMA_IMAGE_OBJECT.to_string(),
            TypeCategory::Video => vocab::SCHEMA_VIDEO_OBJECT.to_string(),
            TypeCategory::Mail => vocab::SCHEMA_EMAIL_MESSAGE.to_string(),
            TypeCategory::Calendar => {
                format!("{}Calendar", vocab::vocab_namespace(self.namespace()))
            }
            TypeCategory::Binary => format!("{}Binary", vocab::vocab_namespace(self.namespace())),
            TypeCategory::Unknown => return None,
        };
        Some(class)
    }

    /// Link `subject` to a person minted from a mailbox string.
    fn person_triples(&self, subject: &str, predicate: &str, mailbox: &str, out: &mut Vec<Triple>) {
        let Some(address) = address_of(mailbox) else {
            out.push(Triple::new(subject, predicate, Term::literal(mailbox.trim())));
            return;
        };
        let person = self.deriver.mint("person", &address);
        out.push(Triple::new(subject, predicate, Term::iri(person.clone())));
        out.push(Triple::new(person.clone(), vocab::RDF_TYPE, Term::iri(vocab::SCHEMA_PERSON)));
        out.push(Triple::new(person.clone(), vocab::SCHEMA_EMAIL, Term::literal(address)));

        let name = mailbox
            .rfind('<')
            .map(|i| mailbox[..i].trim().trim_matches('"').trim())
            .filter(|name| !name.is_empty());
        if let Some(name) = name {
            out.push(Triple::new(person, vocab::SCHEMA_NAME, Term::literal(name)));
        }
    }
}

/// RFC 2822 dates become `xsd:dateTime`; anything else stays a plain literal.
fn date_term(date: &str) -> Term {
    match DateTime::parse_from_rfc2822(date.trim()) {
        Ok(parsed) => Term::typed(parsed.to_rfc3339(), vocab::XSD_DATE_TIME),
        Err(_) => Term::literal(date),
    }
}

fn looks_like_iri(value: &str) -> bool {
    (value.starts_with("http://") || value.starts_with("https://") || value.starts_with("urn:"))
        && !value.contains(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockAI;
    use crate::traits::ai::Statement;

    fn extractor() -> TripleExtractor {
        TripleExtractor::new(IdentityDeriver::new("ns"))
    }

    fn image_caps() -> Caps {
        Caps::new()
            .with(Field::Identity, "urn:ns:content:abc123")
            .with(Field::MediaType, "image/png")
            .with(Field::Format, "png")
    }

    #[test]
    fn test_self_descriptive_triples_use_identity() {
        let triples = extractor()
            .extract("A red square on white.", &image_caps())
            .unwrap();

        let description = triples
            .iter()
            .find(|t| t.predicate == vocab::DCTERMS_DESCRIPTION)
            .unwrap();
        assert_eq!(description.subject, "urn:ns:content:abc123");
        assert_eq!(description.object, Term::literal("A red square on white."));
        assert!(triples.iter().all(|t| t.subject == "urn:ns:content:abc123"));
        assert!(triples
            .iter()
            .any(|t| t.predicate == vocab::RDF_TYPE && t.object == Term::iri(vocab::SCHEMA_IMAGE_OBJECT)));
    }

    #[test]
    fn test_message_count_stays_on_archive() {
        let archive = Caps::new()
            .with(Field::Identity, "urn:ns:content:box")
            .with(Field::Format, "mbox")
            .with(Field::MessageCount, 2u64);
        let child = archive
            .inherit_for_child()
            .with(Field::Identity, "urn:ns:mail:m1@x")
            .with(Field::Format, "eml");
        let message_count = "urn:ns:vocab:messageCount";

        let triples = extractor().extract("", &archive).unwrap();
        assert!(triples.contains(&Triple::new(
            "urn:ns:content:box",
            message_count,
            Term::typed("2", vocab::XSD_INTEGER)
        )));

        let triples = extractor().extract("", &child).unwrap();
        assert!(triples.iter().all(|t| t.predicate != message_count));
    }

    #[test]
    fn test_no_subject_is_error() {
        let caps = Caps::new().with(Field::Format, "png");
        let err = extractor().extract("text", &caps).unwrap_err();
        assert!(matches!(err, ExtractionError::NoSubject));
    }

    #[test]
    fn test_subject_from_message_id() {
        let caps = Caps::new().with(Field::MessageId, "<m1@example.com>");
        assert_eq!(
            extractor().subject_for(&caps).as_deref(),
            Some("urn:ns:mail:m1@example.com")
        );
    }

    #[test]
    fn test_mail_triples() {
        let caps = Caps::new()
            .with(Field::Identity, "urn:ns:mail:m1@example.com")
            .with(Field::Format, "eml")
            .with(Field::MediaType, "message/rfc822")
            .with(Field::Sender, "\"Ada Lovelace\" <Ada@Example.com>")
            .with(
                Field::Recipients,
                vec!["bob@example.com".to_string(), "undisclosed".to_string()],
            )
            .with(Field::Date, "Mon, 1 Jan 2024 10:00:00 +0000")
            .with(Field::Subject, "Engines");

        let triples = extractor().extract("", &caps).unwrap();
        let subject = "urn:ns:mail:m1@example.com";
        let ada = "urn:ns:person:ada@example.com";

        assert!(triples.contains(&Triple::new(subject, vocab::SCHEMA_SENDER, Term::iri(ada))));
        assert!(triples.contains(&Triple::new(ada, vocab::SCHEMA_NAME, Term::literal("Ada Lovelace"))));
        assert!(triples.contains(&Triple::new(
            subject,
            vocab::SCHEMA_RECIPIENT,
            Term::iri("urn:ns:person:bob@example.com")
        )));
        assert!(triples.contains(&Triple::new(
            subject,
            vocab::SCHEMA_RECIPIENT,
            Term::literal("undisclosed")
        )));
        assert!(triples.contains(&Triple::new(
            subject,
            vocab::DCTERMS_DATE,
            Term::typed("2024-01-01T10:00:00+00:00", vocab::XSD_DATE_TIME)
        )));
        assert!(triples.contains(&Triple::new(subject, vocab::DCTERMS_TITLE, Term::literal("Engines"))));
        assert!(triples.contains(&Triple::new(
            subject,
            vocab::RDF_TYPE,
            Term::iri(vocab::SCHEMA_EMAIL_MESSAGE)
        )));
        // Empty narration adds no description
        assert!(!triples.iter().any(|t| t.predicate == vocab::DCTERMS_DESCRIPTION));
    }

    #[test]
    fn test_unparseable_date_stays_literal() {
        assert_eq!(date_term("sometime in May"), Term::literal("sometime in May"));
    }

    #[tokio::test]
    async fn test_statements_anchor_to_subject() {
        let ai = Arc::new(MockAI::new().with_statements(vec![
            Statement {
                predicate: "topic".into(),
                object: "knowledge graphs".into(),
            },
            Statement {
                predicate: "works for".into(),
                object: "https://example.com/acme".into(),
            },
        ]));
        let extractor = extractor().with_ai(ai.clone()).with_min_text_length(10);

        let triples = extractor
            .extract_statements("A long enough narration about graphs.", &image_caps())
            .await
            .unwrap();

        assert_eq!(triples.len(), 2);
        assert!(triples.iter().all(|t| t.subject == "urn:ns:content:abc123"));
        assert_eq!(triples[0].predicate, vocab::SCHEMA_ABOUT);
        assert_eq!(triples[1].predicate, "urn:ns:vocab:works-for");
        assert_eq!(triples[1].object, Term::iri("https://example.com/acme"));
    }

    #[tokio::test]
    async fn test_short_text_skips_service() {
        let ai = Arc::new(MockAI::new());
        let extractor = extractor().with_ai(ai.clone());

        let triples = extractor
            .extract_statements("too short", &image_caps())
            .await
            .unwrap();
        assert!(triples.is_empty());
        assert!(ai.calls().is_empty());
    }
}
