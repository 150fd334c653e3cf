//! LLM prompts and answer parsing.
//!
//! Prompts are plain templates with `{placeholder}` slots. Parsers are
//! lenient about surrounding prose and code fences but strict about the
//! fields they require.

use serde::Deserialize;

use crate::error::ServiceError;
use crate::traits::ai::{Classification, ClassifySample, Statement};

/// Bytes of the payload sent hex-encoded to the classifier.
pub const CLASSIFY_HEADER_BYTES: usize = 64;

/// Bytes of the payload rendered as a text preview for the classifier.
pub const CLASSIFY_PREVIEW_BYTES: usize = 400;

/// Characters of text sent to the text narrator.
pub const TEXT_NARRATION_MAX_CHARS: usize = 50_000;

/// Prompt for classifying a payload no signature recognized.
pub const CLASSIFY_PROMPT: &str = r#"You are a file type classifier. Given hex header bytes and a short textual preview, identify the file type.
Prefer coarse categories when appropriate: document, binary, image, video, mail, calendar.

Respond with JSON only:
{"type_name": "...", "mime_type": "...", "extensions": ["ext1", "ext2"], "rationale": "..."}

File: {label}
Header (hex, first bytes): {header_hex}
Text preview (best-effort decoded): {preview}

Be concise in rationale and prefer the safest guess if unsure."#;

/// Prompt for describing an image. The image travels alongside the prompt.
pub const IMAGE_PROMPT: &str = r#"You are an image description assistant. Write a detailed English description of what the attached image contains.
Include salient objects, people, setting, colors, and mood. Write multiple sentences if needed, aiming for thoroughness without fluff.

Image: {label}

Provide the description only."#;

/// Prompt for narrating a text for knowledge-graph extraction.
pub const TEXT_PROMPT: &str = r#"Analyze this text for Knowledge Graph extraction.
1. Summarize the main topic.
2. Extract key entities and their relationships.

Output strictly as a list of atomic statements in this format:
- [Entity A] [relationship] [Entity B]
- [Entity] is [Attribute]

Do NOT write paragraphs. List separate facts.

Text:
{text}"#;

/// Prompt for extracting statements about one subject.
pub const STATEMENT_PROMPT: &str = r#"Extract facts about the subject {subject} from the text below.

{tbox_instruction}
{rules}

Respond with a JSON array only, one object per fact:
[{"predicate": "...", "object": "..."}]

Every fact is about {subject}; do not invent other subjects. Omit facts you are unsure of.

Text:
{text}"#;

/// Extraction rules for mail narrations.
pub const MAIL_RULES: &str = r#"Rules:
- Use predicates such as sender, recipient, date, subject, mentions, topic.
- Objects are plain values: addresses, names, dates, short phrases."#;

/// Extraction rules for everything else.
pub const DEFAULT_RULES: &str = r#"Rules:
- Use predicates such as description, topic, mentions, depicts, creator, location.
- Objects are plain values or short phrases."#;

/// Format the classification prompt.
pub fn format_classify_prompt(sample: &ClassifySample) -> String {
    fill(
        CLASSIFY_PROMPT,
        &[
            ("label", sample.label.as_str()),
            ("header_hex", sample.header_hex.as_str()),
            ("preview", sample.preview.as_str()),
        ],
    )
}

/// Format the image prompt.
pub fn format_image_prompt(label: &str) -> String {
    fill(IMAGE_PROMPT, &[("label", label)])
}

/// Format the text narration prompt, truncating very long texts.
pub fn format_text_prompt(text: &str) -> String {
    let truncated = match text.char_indices().nth(TEXT_NARRATION_MAX_CHARS) {
        Some((end, _)) => &text[..end],
        None => text,
    };
    fill(TEXT_PROMPT, &[("text", truncated)])
}

/// Format the statement extraction prompt.
pub fn format_statement_prompt(subject: &str, text: &str, tbox: Option<&str>, mail: bool) -> String {
    let tbox_instruction = match tbox {
        Some(tbox) if !tbox.trim().is_empty() => format!(
            "Strictly use this ontology (TBox) for predicates:\n{}",
            tbox.trim()
        ),
        _ => "Use standard vocabulary terms (dcterms, schema.org) as predicate names where possible."
            .to_string(),
    };
    let rules = if mail { MAIL_RULES } else { DEFAULT_RULES };

    fill(
        STATEMENT_PROMPT,
        &[
            ("tbox_instruction", tbox_instruction.as_str()),
            ("rules", rules),
            ("subject", subject),
            ("text", text),
        ],
    )
}

/// Fill `{name}` slots in one pass over the template. Substituted values
/// are never scanned for slots; unknown braces are copied as-is.
fn fill(template: &str, slots: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let slot = slots
            .iter()
            .find(|(name, _)| tail.starts_with(name) && tail[name.len()..].starts_with('}'));
        match slot {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Hex-encode the first bytes of a payload.
pub fn header_hex(bytes: &[u8]) -> String {
    hex::encode(&bytes[..bytes.len().min(CLASSIFY_HEADER_BYTES)])
}

/// Decode a short preview: UTF-8 first, Latin-1 when the bytes are not UTF-8.
pub fn preview_text(bytes: &[u8], max_len: usize) -> String {
    let snippet = &bytes[..bytes.len().min(max_len)];
    match std::str::from_utf8(snippet) {
        Ok(text) => text.to_string(),
        // Cut in the middle of a character at the end of the window
        Err(e) if e.error_len().is_none() => {
            String::from_utf8_lossy(&snippet[..e.valid_up_to()]).into_owned()
        }
        Err(_) => snippet.iter().map(|&b| b as char).collect(),
    }
}

/// Build the classifier sample for a payload prefix.
pub fn classify_sample(label: &str, prefix: &[u8]) -> ClassifySample {
    ClassifySample {
        label: label.to_string(),
        header_hex: header_hex(prefix),
        preview: preview_text(prefix, CLASSIFY_PREVIEW_BYTES),
    }
}

/// The first `{` through the last `}` of a free-form answer.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// The first `[` through the last `]` of a free-form answer.
pub fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse a classifier answer.
pub fn parse_classification(answer: &str) -> Result<Classification, ServiceError> {
    let json = extract_json_object(answer).ok_or_else(|| {
        ServiceError::MalformedResponse("classifier answer contains no JSON object".into())
    })?;

    let classification: Classification = serde_json::from_str(json)
        .map_err(|e| ServiceError::MalformedResponse(format!("classifier JSON: {}", e)))?;

    Ok(classification)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StatementsAnswer {
    List(Vec<Statement>),
    Wrapped { statements: Vec<Statement> },
}

/// Parse a statement extraction answer.
///
/// Accepts a bare array or an object with a `statements` array. Entries
/// with a blank predicate or object are dropped.
pub fn parse_statements(answer: &str) -> Result<Vec<Statement>, ServiceError> {
    let from_array = extract_json_array(answer)
        .map(|json| serde_json::from_str::<StatementsAnswer>(json));
    let parsed = match from_array {
        Some(Ok(parsed)) => parsed,
        _ => {
            let json = extract_json_object(answer).ok_or_else(|| {
                ServiceError::MalformedResponse("statement answer contains no JSON".into())
            })?;
            serde_json::from_str::<StatementsAnswer>(json).map_err(|e| {
                ServiceError::MalformedResponse(format!("statement JSON: {}", e))
            })?
        }
    };

    let statements = match parsed {
        StatementsAnswer::List(list) => list,
        StatementsAnswer::Wrapped { statements } => statements,
    };

    Ok(statements
        .into_iter()
        .filter(|s| !s.predicate.trim().is_empty() && !s.object.trim().is_empty())
        .collect())
}
