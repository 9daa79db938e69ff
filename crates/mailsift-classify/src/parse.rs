//! Fixed-format response parsing.
//!
//! The provider reply is a narrow, versioned wire contract: six labeled
//! segments in fixed order. Everything else is a parse failure; the caller
//! must never guess or synthesize a missing field.

use serde::Deserialize;

use crate::error::{ParseError, Result};
use crate::result::{Category, ClassificationResult, ExtractedEntities};

const SUMMARY: &str = "Summary:";
const URGENCY: &str = "Urgency Score:";
const ACTION: &str = "Action:";
const CLASSIFICATION: &str = "Classification:";
const KEYWORDS: &str = "Keywords:";
const ENTITIES: &str = "ExtractedEntities:";

/// Parses a provider reply into a [`ClassificationResult`].
///
/// Labels are matched case-sensitively at line start, in order. The urgency
/// score must be an integer in [1,100]; out-of-range values are rejected
/// rather than clamped, since silent clamping would mask format drift. The
/// entities segment is a flat JSON object and may span the remainder of the
/// reply.
///
/// # Errors
///
/// Returns a [`ParseError`] naming the first violated constraint.
pub fn parse_response(raw: &str) -> Result<ClassificationResult> {
    let lines: Vec<&str> = raw.lines().collect();
    let mut cursor = 0usize;

    let summary = next_segment(&lines, &mut cursor, SUMMARY)?;
    let urgency_text = next_segment(&lines, &mut cursor, URGENCY)?;
    let action = next_segment(&lines, &mut cursor, ACTION)?;
    let classification_text = next_segment(&lines, &mut cursor, CLASSIFICATION)?;
    let keywords_text = next_segment(&lines, &mut cursor, KEYWORDS)?;
    let entities_text = remaining_segment(&lines, cursor, ENTITIES)?;

    let urgency: i64 = urgency_text
        .parse()
        .map_err(|_| ParseError::NonNumericUrgency {
            value: urgency_text.clone(),
        })?;
    if !(1..=100).contains(&urgency) {
        return Err(ParseError::UrgencyOutOfRange { value: urgency });
    }

    let classification = Category::parse_exact(&classification_text).ok_or(
        ParseError::UnknownClassification {
            value: classification_text,
        },
    )?;

    let keywords = split_list(&keywords_text);
    let entities: RawEntities = serde_json::from_str(&entities_text)?;

    Ok(ClassificationResult {
        summary,
        urgency_score: u8::try_from(urgency).unwrap_or(100),
        action,
        classification,
        keywords,
        extracted_entities: entities.into(),
    })
}

/// Finds the next line starting with `label` at or after the cursor and
/// returns its trimmed value, advancing the cursor past it.
fn next_segment(lines: &[&str], cursor: &mut usize, label: &'static str) -> Result<String> {
    for (offset, line) in lines[*cursor..].iter().enumerate() {
        if let Some(value) = line.strip_prefix(label) {
            *cursor += offset + 1;
            return Ok(value.trim().to_string());
        }
    }
    Err(ParseError::MissingSegment { label })
}

/// Like [`next_segment`], but the value continues to the end of the reply
/// (the entities object may be pretty-printed over several lines).
fn remaining_segment(lines: &[&str], cursor: usize, label: &'static str) -> Result<String> {
    for (offset, line) in lines[cursor..].iter().enumerate() {
        if let Some(first) = line.strip_prefix(label) {
            let mut value = first.trim().to_string();
            for rest in &lines[cursor + offset + 1..] {
                value.push('\n');
                value.push_str(rest);
            }
            return Ok(value.trim().to_string());
        }
    }
    Err(ParseError::MissingSegment { label })
}

/// Splits a comma-separated list, trimming items and dropping empties.
fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Entities as they appear on the wire. List-valued sub-fields accept either
/// a JSON array or a comma-separated string; an empty string is a valid
/// empty list.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntities {
    #[serde(default)]
    sender_name: String,
    #[serde(default)]
    recipient_names: StringList,
    #[serde(default)]
    subject_terms: StringList,
    #[serde(default)]
    date: String,
    #[serde(default)]
    attachment_names: StringList,
    #[serde(default)]
    snippet: String,
}

impl From<RawEntities> for ExtractedEntities {
    fn from(raw: RawEntities) -> Self {
        Self {
            sender_name: raw.sender_name,
            recipient_names: raw.recipient_names.0,
            subject_terms: raw.subject_terms.0,
            date: raw.date,
            attachment_names: raw.attachment_names.0,
            snippet: raw.snippet,
        }
    }
}

/// JSON array or comma-separated string, normalized to a list.
#[derive(Debug, Default)]
struct StringList(Vec<String>);

impl<'de> Deserialize<'de> for StringList {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            List(Vec<String>),
            Text(String),
        }

        Ok(match Wire::deserialize(deserializer)? {
            Wire::List(items) => Self(items),
            Wire::Text(text) => Self(split_list(&text)),
        })
    }
}
