//! Ordered signature table for the deterministic detection stage.
//!
//! Order matters: specific formats come before generic ones (OOXML before
//! zip, everything before text). The first matching rule wins.

use lazy_static::lazy_static;
use regex::bytes::Regex;

use crate::types::identity::TypeCategory;

/// Bytes of the prefix inspected by the text-ish heuristics.
pub const HEURISTIC_WINDOW: usize = 2048;

/// Minimum share of printable bytes for the text rule.
pub const TEXT_PRINTABLE_RATIO: f64 = 0.85;

/// What a matching rule resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub format: &'static str,
    pub media_type: &'static str,
    pub category: TypeCategory,
    pub extensions: &'static [&'static str],
}

/// A named predicate over the payload prefix.
pub struct SignatureRule {
    pub signature: Signature,
    matches: fn(&[u8]) -> bool,
}

impl SignatureRule {
    pub fn matches(&self, prefix: &[u8]) -> bool {
        (self.matches)(prefix)
    }
}

lazy_static! {
    static ref MBOX_FROM_LINE: Regex = Regex::new(r"^From \S+ .+\d{4}$").unwrap();
}

const fn rule(
    format: &'static str,
    media_type: &'static str,
    category: TypeCategory,
    extensions: &'static [&'static str],
    matches: fn(&[u8]) -> bool,
) -> SignatureRule {
    SignatureRule {
        signature: Signature {
            format,
            media_type,
            category,
            extensions,
        },
        matches,
    }
}

/// The built-in signature table.
pub static SIGNATURES: &[SignatureRule] = &[
    rule("calendar", "text/calendar", TypeCategory::Calendar, &["ics"], is_calendar),
    rule("mbox", "application/mbox", TypeCategory::Mail, &["mbox"], is_mbox),
    rule("eml", "message/rfc822", TypeCategory::Mail, &["eml"], is_eml),
    rule("pdf", "application/pdf", TypeCategory::Document, &["pdf"], is_pdf),
    rule(
        "ooxml",
        "application/vnd.openxmlformats-officedocument",
        TypeCategory::Document,
        &["docx", "pptx", "xlsx"],
        is_ooxml,
    ),
    rule("mp4", "video/mp4", TypeCategory::Video, &["mp4", "m4v", "mov"], is_mp4),
    rule("png", "image/png", TypeCategory::Image, &["png"], is_png),
    rule("jpeg", "image/jpeg", TypeCategory::Image, &["jpg", "jpeg"], is_jpeg),
    rule("gif", "image/gif", TypeCategory::Image, &["gif"], is_gif),
    rule("webp", "image/webp", TypeCategory::Image, &["webp"], is_webp),
    rule("zip", "application/zip", TypeCategory::Binary, &["zip"], is_zip),
    rule("gzip", "application/gzip", TypeCategory::Binary, &["gz"], is_gzip),
    rule("elf", "application/x-elf", TypeCategory::Binary, &[], is_elf),
    rule(
        "text",
        "text/plain",
        TypeCategory::Document,
        &["txt", "md", "html"],
        is_text,
    ),
];

/// Run the table against a prefix. Never fails; no match is `None`.
pub fn match_signature(prefix: &[u8]) -> Option<&'static Signature> {
    SIGNATURES
        .iter()
        .find(|rule| rule.matches(prefix))
        .map(|rule| &rule.signature)
}

/// Look up a rule's signature by format label.
pub fn signature_for_format(format: &str) -> Option<&'static Signature> {
    SIGNATURES
        .iter()
        .map(|rule| &rule.signature)
        .find(|sig| sig.format == format)
}

fn window(prefix: &[u8]) -> &[u8] {
    &prefix[..prefix.len().min(HEURISTIC_WINDOW)]
}

/// Case-insensitive substring search within the heuristic window.
fn window_contains(prefix: &[u8], needle: &[u8]) -> bool {
    let hay = window(prefix);
    hay.windows(needle.len())
        .any(|w| w.eq_ignore_ascii_case(needle))
}

fn contains(hay: &[u8], needle: &[u8]) -> bool {
    hay.windows(needle.len()).any(|w| w == needle)
}

fn is_calendar(prefix: &[u8]) -> bool {
    window_contains(prefix, b"begin:vcalendar") && window_contains(prefix, b"end:vcalendar")
}

/// An mbox `From ` separator line (terminator optional).
pub(crate) fn is_from_line(line: &[u8]) -> bool {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    line.starts_with(b"From ") && std::str::from_utf8(line).is_ok() && MBOX_FROM_LINE.is_match(line)
}

fn is_mbox(prefix: &[u8]) -> bool {
    let first_line = prefix.split(|b| *b == b'\n').next().unwrap_or_default();
    is_from_line(first_line)
}

fn is_eml(prefix: &[u8]) -> bool {
    window_contains(prefix, b"subject:") && window_contains(prefix, b"from:")
}

fn is_pdf(prefix: &[u8]) -> bool {
    prefix.starts_with(b"%PDF-")
}

fn is_ooxml(prefix: &[u8]) -> bool {
    is_zip(prefix)
        && [&b"[Content_Types].xml"[..], b"word/", b"ppt/", b"xl/"]
            .iter()
            .any(|marker| contains(prefix, marker))
}

fn is_mp4(prefix: &[u8]) -> bool {
    prefix.len() >= 12 && &prefix[4..8] == b"ftyp"
}

fn is_png(prefix: &[u8]) -> bool {
    prefix.starts_with(b"\x89PNG\r\n\x1a\n")
}

fn is_jpeg(prefix: &[u8]) -> bool {
    prefix.starts_with(b"\xff\xd8\xff")
}

fn is_gif(prefix: &[u8]) -> bool {
    prefix.starts_with(b"GIF87a") || prefix.starts_with(b"GIF89a")
}

fn is_webp(prefix: &[u8]) -> bool {
    prefix.len() >= 12 && prefix.starts_with(b"RIFF") && &prefix[8..12] == b"WEBP"
}

fn is_zip(prefix: &[u8]) -> bool {
    prefix.starts_with(b"PK\x03\x04")
}

fn is_gzip(prefix: &[u8]) -> bool {
    prefix.starts_with(b"\x1f\x8b")
}

fn is_elf(prefix: &[u8]) -> bool {
    prefix.starts_with(b"\x7fELF")
}

/// Mostly printable ASCII (plus tab, LF, CR) in the heuristic window.
pub fn is_text(prefix: &[u8]) -> bool {
    let sample = window(prefix);
    if sample.is_empty() {
        return false;
    }
    let printable = sample
        .iter()
        .filter(|b| matches!(b, 32..=126 | 9 | 10 | 13))
        .count();
    printable as f64 / sample.len() as f64 >= TEXT_PRINTABLE_RATIO
}
