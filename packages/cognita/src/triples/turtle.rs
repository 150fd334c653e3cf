//! Turtle serialization for accumulated triples.

use std::io::{self, Write};

use indexmap::{IndexMap, IndexSet};

use super::vocab::{self, PREFIXES};
use crate::types::triple::{escape_literal, Term, Triple};

/// An insertion-ordered set of triples with a project namespace.
#[derive(Debug, Clone)]
pub struct Graph {
    namespace: String,
    triples: IndexSet<Triple>,
}

impl Graph {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            triples: IndexSet::new(),
        }
    }

    /// Returns false if the triple was already present.
    pub fn insert(&mut self, triple: Triple) -> bool {
        self.triples.insert(triple)
    }

    pub fn extend<'a>(&mut self, triples: impl IntoIterator<Item = &'a Triple>) {
        self.triples.extend(triples.into_iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Triple> + '_ {
        self.triples.iter()
    }

    pub fn to_turtle(&self) -> String {
        let mut out = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.write_turtle(&mut out);
        String::from_utf8_lossy(&out).into_owned()
    }

    /// Write prefixes, then one block per subject in first-seen order.
    pub fn write_turtle<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let prefixes = self.prefixes();
        for (prefix, ns) in &prefixes {
            writeln!(out, "@prefix {}: <{}> .", prefix, ns)?;
        }

        let mut by_subject: IndexMap<&str, Vec<&Triple>> = IndexMap::new();
        for triple in &self.triples {
            by_subject.entry(triple.subject.as_str()).or_default().push(triple);
        }

        for (subject, triples) in by_subject {
            writeln!(out)?;
            writeln!(out, "{}", compact_iri(subject, &prefixes))?;
            let last = triples.len() - 1;
            for (i, triple) in triples.iter().enumerate() {
                let predicate = if triple.predicate == vocab::RDF_TYPE {
                    "a".to_string()
                } else {
                    compact_iri(&triple.predicate, &prefixes)
                };
                let end = if i == last { " ." } else { " ;" };
                writeln!(
                    out,
                    "    {} {}{}",
                    predicate,
                    render_object(&triple.object, &prefixes),
                    end
                )?;
            }
        }
        Ok(())
    }

    fn prefixes(&self) -> Vec<(String, String)> {
        let mut prefixes: Vec<(String, String)> = PREFIXES
            .iter()
            .map(|(p, ns)| (p.to_string(), ns.to_string()))
            .collect();
        if is_prefix_name(&self.namespace) && !prefixes.iter().any(|(p, _)| *p == self.namespace) {
            prefixes.push((self.namespace.clone(), vocab::vocab_namespace(&self.namespace)));
        }
        prefixes
    }
}

fn is_prefix_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Local parts that can be written as a prefixed name without escaping.
fn is_simple_local(local: &str) -> bool {
    let mut chars = local.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        && local.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn compact_iri(iri: &str, prefixes: &[(String, String)]) -> String {
    for (prefix, ns) in prefixes {
        if let Some(local) = iri.strip_prefix(ns.as_str()) {
            if is_simple_local(local) {
                return format!("{}:{}", prefix, local);
            }
        }
    }
    format!("<{}>", iri)
}

fn render_object(term: &Term, prefixes: &[(String, String)]) -> String {
    match term {
        Term::Iri(iri) => compact_iri(iri, prefixes),
        Term::Literal {
            value,
            datatype: None,
        } => escape_literal(value),
        Term::Literal {
            value,
            datatype: Some(dt),
        } => format!("{}^^{}", escape_literal(value), compact_iri(dt, prefixes)),
    }
}
