//! Post-processing: turn the vision model's reply into a [`ClassificationResult`].
//!
//! Even when asked for bare JSON, models wrap the object in ```json fences,
//! prepend a sentence, leave a trailing comma, or report confidence as a
//! percentage. The cleanup rules here are deterministic and run in order:
//!
//! 1. Strip invisible Unicode (BOM, zero-width spaces)
//! 2. Strip outer code fences
//! 3. Cut the outermost `{ … }` object out of any surrounding prose
//! 4. Drop trailing commas before `}` / `]`
//!
//! Parsing is lenient: missing keys take their defaults and unknown enum
//! spellings become `Unknown`.

use crate::model::{
    ClassificationResult, DocumentKind, DocumentSide, ExtractedData, ExtractedField, Field,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Clean and parse a raw model reply.
pub fn parse_classification(raw: &str) -> Result<ClassificationResult, String> {
    let json = extract_json(raw).ok_or_else(|| "response contains no JSON object".to_string())?;
    let parsed: RawClassification =
        serde_json::from_str(&json).map_err(|e| format!("invalid classification JSON: {e}"))?;
    Ok(parsed.into_result())
}

/// Apply the cleanup rules and return the JSON object text, if any.
pub fn extract_json(raw: &str) -> Option<String> {
    let s = remove_invisible_chars(raw);
    let s = strip_code_fences(&s);
    let s = outermost_object(&s)?;
    Some(remove_trailing_commas(s))
}

// ── Rule 1: Strip invisible Unicode ──────────────────────────────────────────

static RE_INVISIBLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x{FEFF}\x{200B}\x{200C}\x{200D}\x{2060}]").unwrap());

fn remove_invisible_chars(input: &str) -> String {
    RE_INVISIBLE.replace_all(input, "").into_owned()
}

// ── Rule 2: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\s*\n(.*?)\n?```\s*$").unwrap());

fn strip_code_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 3: Outermost object ─────────────────────────────────────────────────

fn outermost_object(input: &str) -> Option<&str> {
    let start = input.find('{')?;
    let end = input.rfind('}')?;
    (end > start).then(|| &input[start..=end])
}

// ── Rule 4: Trailing commas ──────────────────────────────────────────────────

static RE_TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",(\s*[}\]])").unwrap());

fn remove_trailing_commas(input: &str) -> String {
    RE_TRAILING_COMMA.replace_all(input, "$1").into_owned()
}

// ── Parsing ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClassification {
    #[serde(default)]
    document_type: String,
    #[serde(default)]
    document_side: String,
    #[serde(default)]
    is_valid_document: bool,
    #[serde(default)]
    is_legible: bool,
    #[serde(default)]
    contains_both_sides: bool,
    #[serde(default)]
    user_feedback: String,
    #[serde(default)]
    extracted_data: BTreeMap<String, RawField>,
}

#[derive(Debug, Default, Deserialize)]
struct RawField {
    #[serde(default)]
    value: Option<serde_json::Value>,
    #[serde(default)]
    confidence: Option<f64>,
}

impl RawClassification {
    fn into_result(self) -> ClassificationResult {
        let kind = DocumentKind::from_label(&self.document_type);
        let mut side = DocumentSide::from_label(&self.document_side);
        if kind != DocumentKind::Unknown && !kind.is_two_sided() {
            // Civil registries are single-page documents.
            side = DocumentSide::Full;
        } else if self.contains_both_sides {
            side = DocumentSide::Full;
        }

        let mut extracted = ExtractedData::default();
        for (key, raw) in self.extracted_data {
            let Some(field) = Field::from_key(&key) else {
                continue;
            };
            if let Some(value) = raw.value.as_ref().and_then(value_text) {
                extracted.insert(field, ExtractedField::new(value, normalise_confidence(raw.confidence)));
            }
        }

        ClassificationResult {
            is_valid: self.is_valid_document && kind != DocumentKind::Unknown,
            is_legible: self.is_legible,
            detected_side: side,
            feedback: self.user_feedback.trim().to_string(),
            kind,
            extracted,
        }
    }
}

fn value_text(value: &serde_json::Value) -> Option<String> {
    let text = match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Accept 0–1 fractions and 0–100 percentages.
fn normalise_confidence(confidence: Option<f64>) -> f32 {
    match confidence {
        Some(c) if c > 1.0 => (c / 100.0) as f32,
        Some(c) => c as f32,
        None => 0.0,
    }
}
