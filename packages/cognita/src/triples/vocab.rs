//! Fixed predicate and class vocabulary.
//!
//! Well-known ontology terms where one fits (RDF, RDFS, XSD, Dublin Core
//! terms, schema.org); everything else lives under `urn:<namespace>:vocab:`.

pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
pub const DCTERMS: &str = "http://purl.org/dc/terms/";
pub const SCHEMA: &str = "https://schema.org/";

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";

pub const XSD_DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";

pub const DCTERMS_CREATOR: &str = "http://purl.org/dc/terms/creator";
pub const DCTERMS_DATE: &str = "http://purl.org/dc/terms/date";
pub const DCTERMS_DESCRIPTION: &str = "http://purl.org/dc/terms/description";
pub const DCTERMS_FORMAT: &str = "http://purl.org/dc/terms/format";
pub const DCTERMS_IS_PART_OF: &str = "http://purl.org/dc/terms/isPartOf";
pub const DCTERMS_SOURCE: &str = "http://purl.org/dc/terms/source";
pub const DCTERMS_TITLE: &str = "http://purl.org/dc/terms/title";

pub const SCHEMA_ABOUT: &str = "https://schema.org/about";
pub const SCHEMA_EMAIL: &str = "https://schema.org/email";
pub const SCHEMA_IDENTIFIER: &str = "https://schema.org/identifier";
pub const SCHEMA_LOCATION: &str = "https://schema.org/location";
pub const SCHEMA_MENTIONS: &str = "https://schema.org/mentions";
pub const SCHEMA_NAME: &str = "https://schema.org/name";
pub const SCHEMA_RECIPIENT: &str = "https://schema.org/recipient";
pub const SCHEMA_SENDER: &str = "https://schema.org/sender";
pub const SCHEMA_SHA256: &str = "https://schema.org/sha256";

pub const SCHEMA_DIGITAL_DOCUMENT: &str = "https://schema.org/DigitalDocument";
pub const SCHEMA_EMAIL_MESSAGE: &str = "https://schema.org/EmailMessage";
pub const SCHEMA_IMAGE_OBJECT: &str = "https://schema.org/ImageObject";
pub const SCHEMA_PERSON: &str = "https://schema.org/Person";
pub const SCHEMA_VIDEO_OBJECT: &str = "https://schema.org/VideoObject";

/// Prefixes bound in Turtle output, besides the project vocabulary.
pub const PREFIXES: &[(&str, &str)] = &[
    ("rdf", RDF),
    ("rdfs", RDFS),
    ("xsd", XSD),
    ("dcterms", DCTERMS),
    ("schema", SCHEMA),
];

/// Project-local vocabulary namespace.
pub fn vocab_namespace(namespace: &str) -> String {
    format!("urn:{}:vocab:", namespace)
}

/// Map a predicate name from free text onto the vocabulary.
///
/// Absolute IRIs pass through, known prefixes are expanded, known names map
/// to their ontology term, and anything else becomes a slug under the
/// project vocabulary.
pub fn map_predicate(name: &str, namespace: &str) -> String {
    let name = name.trim();
    if name.starts_with("http://") || name.starts_with("https://") || name.starts_with("urn:") {
        return name.to_string();
    }

    if let Some((prefix, local)) = name.split_once(':') {
        let expanded = match prefix {
            "dc" | "dcterms" => Some(DCTERMS),
            "schema" => Some(SCHEMA),
            "rdfs" => Some(RDFS),
            "rdf" => Some(RDF),
            _ => None,
        };
        if let Some(ns) = expanded {
            if !local.is_empty() {
                return format!("{}{}", ns, local);
            }
        }
    }

    let slug = slugify(name);
    let known = match slug.as_str() {
        "description" | "describes" | "summary" => Some(DCTERMS_DESCRIPTION),
        "title" | "subject-line" | "subject" => Some(DCTERMS_TITLE),
        "date" | "sent" | "sent-at" => Some(DCTERMS_DATE),
        "format" | "mime-type" => Some(DCTERMS_FORMAT),
        "creator" | "author" | "created-by" => Some(DCTERMS_CREATOR),
        "sender" | "from" => Some(SCHEMA_SENDER),
        "recipient" | "to" => Some(SCHEMA_RECIPIENT),
        "about" | "topic" => Some(SCHEMA_ABOUT),
        "mentions" | "mention" => Some(SCHEMA_MENTIONS),
        "location" | "place" => Some(SCHEMA_LOCATION),
        "name" => Some(SCHEMA_NAME),
        "label" => Some(RDFS_LABEL),
        _ => None,
    };

    match known {
        Some(iri) => iri.to_string(),
        None => format!("{}{}", vocab_namespace(namespace), slug),
    }
}

/// Lowercase, alphanumerics kept, every other run collapsed to one '-'.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("related");
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_predicate() {
        assert_eq!(map_predicate("description", "cognita"), DCTERMS_DESCRIPTION);
        assert_eq!(map_predicate("Subject line", "cognita"), DCTERMS_TITLE);
        assert_eq!(map_predicate("schema:knows", "cognita"), "https://schema.org/knows");
        assert_eq!(map_predicate("http://xmlns.com/foaf/0.1/knows", "cognita"), "http://xmlns.com/foaf/0.1/knows");
        assert_eq!(map_predicate("works for", "cognita"), "urn:cognita:vocab:works-for");
        assert_eq!(map_predicate("ex:likes", "acme"), "urn:acme:vocab:ex-likes");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("  Has Part!! "), "has-part");
        assert_eq!(slugify("???"), "related");
    }
}
