//! Identity derivation.
//!
//! A unit's identity is either a natural key (e.g. a mail Message-ID) or
//! the SHA-256 digest of its payload bytes:
//!
//! - `urn:<namespace>:<category>:<natural key>`
//! - `urn:<namespace>:content:<hex sha256>`
//!
//! Changing [`HASH_ALGORITHM`] changes every content identity and must come
//! with a new namespace.

use std::fs::File;
use std::io::Read;

use sha2::{Digest, Sha256};

use crate::error::IdentityError;
use crate::types::identity::{Identity, IdentityKind, TypeCategory};
use crate::types::unit::Payload;

/// Hash algorithm behind content identities.
pub const HASH_ALGORITHM: &str = "sha256";

const READ_CHUNK: usize = 64 * 1024;

/// Lowercase hex SHA-256 of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Mints identities under one namespace.
#[derive(Debug, Clone)]
pub struct IdentityDeriver {
    namespace: String,
}

impl IdentityDeriver {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Derive the identity of a payload.
    ///
    /// A non-blank natural key wins and no bytes are read. Otherwise the
    /// whole payload is hashed; for file payloads that means streaming the
    /// file, which is the only way this can fail.
    pub fn derive(
        &self,
        payload: &Payload,
        category: TypeCategory,
        natural_key: Option<&str>,
    ) -> Result<Identity, IdentityError> {
        if let Some(identity) = self.from_natural_key(category, natural_key) {
            return Ok(identity);
        }

        match payload {
            Payload::Inline(bytes) => Ok(self.content_identity(content_hash(bytes))),
            Payload::File { prefix, len, .. } if prefix.len() as u64 == *len => {
                Ok(self.content_identity(content_hash(prefix)))
            }
            Payload::File { path, .. } => File::open(path)
                .and_then(|file| self.derive_reader(file, category, None))
                .map_err(|source| IdentityError::Unreadable {
                    path: path.clone(),
                    source,
                }),
        }
    }

    /// Derive from bytes already in memory. Never fails.
    pub fn derive_bytes(
        &self,
        bytes: &[u8],
        category: TypeCategory,
        natural_key: Option<&str>,
    ) -> Identity {
        self.from_natural_key(category, natural_key)
            .unwrap_or_else(|| self.content_identity(content_hash(bytes)))
    }

    /// Derive by streaming a reader to its end.
    pub fn derive_reader<R: Read>(
        &self,
        mut reader: R,
        category: TypeCategory,
        natural_key: Option<&str>,
    ) -> std::io::Result<Identity> {
        if let Some(identity) = self.from_natural_key(category, natural_key) {
            return Ok(identity);
        }

        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            let read = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buf[..read]);
        }

        Ok(self.content_identity(format!("{:x}", hasher.finalize())))
    }

    /// Mint an IRI for a non-unit entity, e.g. `mint("person", "a@b.org")`.
    pub fn mint(&self, category: &str, key: &str) -> String {
        format!("urn:{}:{}:{}", self.namespace, category, escape_iri_component(key))
    }

    /// Namespace for project-local vocabulary terms.
    pub fn vocab(&self) -> String {
        format!("urn:{}:vocab:", self.namespace)
    }

    fn from_natural_key(&self, category: TypeCategory, key: Option<&str>) -> Option<Identity> {
        let key = normalize_natural_key(key?)?;
        let iri = self.mint(category.as_str(), &key);
        Some(Identity::new(iri, IdentityKind::NaturalKey(key)))
    }

    fn content_identity(&self, hash: String) -> Identity {
        let iri = format!("urn:{}:content:{}", self.namespace, hash);
        Identity::new(iri, IdentityKind::ContentHash(hash))
    }
}

/// Trim and drop one pair of surrounding angle brackets. Case is preserved.
/// Returns None for keys that are blank after normalization.
pub fn normalize_natural_key(key: &str) -> Option<String> {
    let trimmed = key.trim();
    let inner = trimmed
        .strip_prefix('<')
        .and_then(|k| k.strip_suffix('>'))
        .unwrap_or(trimmed)
        .trim();
    if inner.is_empty() {
        None
    } else {
        Some(inner.to_string())
    }
}

/// Percent-encode the characters IRIs forbid.
fn escape_iri_component(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            '<' | '>' | '"' | '{' | '}' | '|' | '\\' | '^' | '`' | '%' => {
                out.push_str(&format!("%{:02X}", c as u32))
            }
            c if c.is_whitespace() || c.is_control() => {
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).bytes() {
                    out.push_str(&format!("%{:02X}", byte));
                }
            }
            c => out.push(c),
        }
    }
    out
}
