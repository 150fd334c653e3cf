//! RFC 5322 header block parsing.
//!
//! Handles folded lines and RFC 2047 encoded words (B and Q encodings for
//! UTF-8, US-ASCII and Latin-1). Anything fancier is kept as raw text.

use base64::Engine;

/// Parsed header fields in message order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// First value of a field, matched case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A message split into headers and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage<'a> {
    pub headers: Headers,
    pub body: &'a [u8],
}

/// Split a message into its header block and body.
///
/// Errors name the first problem found: an empty message, a header block
/// that starts with a continuation line, or a line that is neither a field
/// nor a continuation.
pub fn parse_message(bytes: &[u8]) -> Result<ParsedMessage<'_>, String> {
    let mut entries: Vec<(String, Vec<u8>)> = Vec::new();
    let mut pos = 0;
    let mut line_no = 0;

    while pos < bytes.len() {
        let end = bytes[pos..]
            .iter()
            .position(|b| *b == b'\n')
            .map(|i| pos + i + 1)
            .unwrap_or(bytes.len());
        let line = trim_eol(&bytes[pos..end]);
        pos = end;
        line_no += 1;

        if line.is_empty() {
            break;
        }

        if line[0] == b' ' || line[0] == b'\t' {
            match entries.last_mut() {
                Some((_, value)) => {
                    value.push(b' ');
                    value.extend_from_slice(trim_ascii(line));
                }
                None => return Err("header block starts with a continuation line".into()),
            }
            continue;
        }

        let colon = line
            .iter()
            .position(|b| *b == b':')
            .ok_or_else(|| format!("line {} is not a header field", line_no))?;
        let name = &line[..colon];
        if name.is_empty() || !name.iter().all(|b| (33..=126).contains(b)) {
            return Err(format!("line {} has an invalid field name", line_no));
        }

        entries.push((
            String::from_utf8_lossy(name).into_owned(),
            trim_ascii(&line[colon + 1..]).to_vec(),
        ));
    }

    if entries.is_empty() {
        return Err("message has no header fields".into());
    }

    Ok(ParsedMessage {
        headers: Headers {
            entries: entries
                .into_iter()
                .map(|(name, value)| (name, decode_header_value(&value)))
                .collect(),
        },
        body: &bytes[pos.min(bytes.len())..],
    })
}

/// Split an address-list field on top-level commas.
pub fn split_addresses(value: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut angle_depth = 0usize;

    for c in value.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            '<' if !in_quotes => angle_depth += 1,
            '>' if !in_quotes => angle_depth = angle_depth.saturating_sub(1),
            ',' if !in_quotes && angle_depth == 0 => {
                let item = current.trim();
                if !item.is_empty() {
                    out.push(item.to_string());
                }
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    let item = current.trim();
    if !item.is_empty() {
        out.push(item.to_string());
    }
    out
}

/// Bare address of a mailbox: the part in angle brackets, or the whole
/// value if it looks like an address. Lowercased.
pub fn address_of(mailbox: &str) -> Option<String> {
    let candidate = match (mailbox.rfind('<'), mailbox.rfind('>')) {
        (Some(start), Some(end)) if end > start => &mailbox[start + 1..end],
        _ => mailbox,
    };
    let candidate = candidate.trim();
    if candidate.contains('@') && !candidate.contains(char::is_whitespace) {
        Some(candidate.to_ascii_lowercase())
    } else {
        None
    }
}

fn trim_eol(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map(|i| i + 1)
        .unwrap_or(start);
    &bytes[start..end.max(start)]
}

/// Decode raw header bytes: UTF-8 (lossy), then RFC 2047 encoded words.
fn decode_header_value(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    if !text.contains("=?") {
        return text.into_owned();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest: &str = &text;
    let mut last_was_word = false;

    while let Some(start) = rest.find("=?") {
        let (before, candidate) = rest.split_at(start);
        match decode_encoded_word(candidate) {
            Some((decoded, consumed)) => {
                // Whitespace between adjacent encoded words is dropped
                if !(last_was_word && before.trim().is_empty()) {
                    out.push_str(before);
                }
                out.push_str(&decoded);
                rest = &candidate[consumed..];
                last_was_word = true;
            }
            None => {
                out.push_str(before);
                out.push_str("=?");
                rest = &candidate[2..];
                last_was_word = false;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Decode one `=?charset?enc?text?=` word at the start of `s`. Returns the
/// decoded text and the number of bytes consumed.
fn decode_encoded_word(s: &str) -> Option<(String, usize)> {
    let inner = s.strip_prefix("=?")?;
    let mut parts = inner.splitn(3, '?');
    let charset = parts.next()?;
    let encoding = parts.next()?;
    let remainder = parts.next()?;
    let text_end = remainder.find("?=")?;
    let encoded = &remainder[..text_end];
    let consumed = 2 + charset.len() + 1 + encoding.len() + 1 + text_end + 2;

    let bytes = match encoding {
        "B" | "b" => base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .ok()?,
        "Q" | "q" => decode_q(encoded)?,
        _ => return None,
    };

    let charset = charset.split('*').next().unwrap_or(charset);
    let decoded = match charset.to_ascii_lowercase().as_str() {
        "utf-8" | "utf8" | "us-ascii" => String::from_utf8_lossy(&bytes).into_owned(),
        "iso-8859-1" | "latin1" | "windows-1252" => bytes.iter().map(|&b| b as char).collect(),
        _ => return None,
    };
    Some((decoded, consumed))
}

fn decode_q(encoded: &str) -> Option<Vec<u8>> {
    let bytes = encoded.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => out.push(b' '),
            b'=' => {
                let hex = encoded.get(i + 1..i + 3)?;
                out.push(u8::from_str_radix(hex, 16).ok()?);
                i += 2;
            }
            b => out.push(b),
        }
        i += 1;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_headers_and_body() {
        let msg = b"From: Ada <ada@example.com>\r\nSubject: Hello\r\n\tworld\r\nMessage-ID: <1@example.com>\r\n\r\nBody line\r\n";
        let parsed = parse_message(msg).unwrap();

        assert_eq!(parsed.headers.get("from"), Some("Ada <ada@example.com>"));
        assert_eq!(parsed.headers.get("SUBJECT"), Some("Hello world"));
        assert_eq!(parsed.headers.get("Message-Id"), Some("<1@example.com>"));
        assert_eq!(parsed.body, b"Body line\r\n");
    }

    #[test]
    fn test_headers_without_body() {
        let parsed = parse_message(b"Subject: only headers\n").unwrap();
        assert_eq!(parsed.headers.len(), 1);
        assert!(parsed.body.is_empty());
    }

    #[test]
    fn test_malformed_blocks() {
        assert!(parse_message(b"").is_err());
        assert!(parse_message(b"\nbody only\n").is_err());
        assert!(parse_message(b" folded first\nSubject: x\n\n").is_err());
        assert!(parse_message(b"Subject: ok\nthis is not a header\n\nbody").is_err());
        assert!(parse_message(b"Bad Name: x\n\n").is_err());
    }

    #[test]
    fn test_encoded_words() {
        let parsed = parse_message(
            b"Subject: =?UTF-8?B?SGVsbG8g8J+Mjg==?= =?iso-8859-1?Q?caf=E9_time?=\n\n",
        )
        .unwrap();
        assert_eq!(parsed.headers.get("subject"), Some("Hello 🌎café time"));

        let parsed = parse_message(b"Subject: plain =?bogus?X?zz?= text\n\n").unwrap();
        assert_eq!(parsed.headers.get("subject"), Some("plain =?bogus?X?zz?= text"));
    }

    #[test]
    fn test_split_addresses() {
        let list = split_addresses(r#""Doe, Jane" <jane@example.com>, bob@example.com"#);
        assert_eq!(list, vec![r#""Doe, Jane" <jane@example.com>"#, "bob@example.com"]);
        assert!(split_addresses("  ").is_empty());
    }

    #[test]
    fn test_address_of() {
        assert_eq!(address_of("Ada <Ada@Example.com>"), Some("ada@example.com".into()));
        assert_eq!(address_of("bob@example.com"), Some("bob@example.com".into()));
        assert_eq!(address_of("undisclosed-recipients:;"), None);
    }
}
