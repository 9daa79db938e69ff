//! Message part tree model.
//!
//! Mirrors the mail provider's JSON payload for a fetched message: a tree of
//! parts where each node carries a MIME type, optional filename, optional
//! inline base64url data, and child parts.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One node of a message's content tree.
///
/// A part is a container (children only), body text (inline data with a
/// `text/*` MIME type), or an attachment (non-empty filename). Large
/// attachment bodies are not inlined; they carry an attachment reference
/// that must be fetched separately.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    /// Part identifier, unique within a message.
    #[serde(default)]
    pub part_id: String,
    /// MIME type of this part (e.g. `text/plain`, `multipart/alternative`).
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Filename. Non-empty for attachment parts.
    #[serde(default)]
    pub filename: Option<String>,
    /// MIME headers attached to this part.
    #[serde(default)]
    pub headers: Vec<PartHeader>,
    /// Part body payload.
    #[serde(default)]
    pub body: Option<PartBody>,
    /// Child parts, in document order.
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

/// A single MIME header on a part.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartHeader {
    /// Header name.
    pub name: String,
    /// Header value.
    pub value: String,
}

/// Body payload of a part.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartBody {
    /// Inline data, base64url encoded without padding.
    #[serde(default)]
    pub data: Option<String>,
    /// Opaque reference for fetching large attachment bodies separately.
    #[serde(default)]
    pub attachment_id: Option<String>,
    /// Body size in bytes as reported by the provider.
    #[serde(default)]
    pub size: u64,
}

impl MessagePart {
    /// Returns the non-empty filename, if any.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref().filter(|f| !f.is_empty())
    }

    /// Returns true if this part is an attachment candidate.
    ///
    /// A part carrying both a filename and a MIME type is always an
    /// attachment, regardless of its MIME type or nesting depth.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.filename().is_some() && self.mime_type.is_some()
    }

    /// Returns the inline base64url data, if present.
    #[must_use]
    pub fn inline_data(&self) -> Option<&str> {
        self.body.as_ref().and_then(|b| b.data.as_deref())
    }

    /// Returns the attachment reference, if present.
    #[must_use]
    pub fn attachment_ref(&self) -> Option<&str> {
        self.body.as_ref().and_then(|b| b.attachment_id.as_deref())
    }

    /// Decodes the inline data as raw bytes.
    ///
    /// Returns `Ok(None)` if the part carries no inline data.
    ///
    /// # Errors
    ///
    /// Returns an error if the inline data is not valid base64url.
    pub fn decoded_data(&self) -> Result<Option<Vec<u8>>> {
        match self.inline_data() {
            Some(data) => URL_SAFE_NO_PAD
                .decode(data)
                .map(Some)
                .map_err(|source| Error::Base64Decode {
                    part_id: self.part_id.clone(),
                    source,
                }),
            None => Ok(None),
        }
    }

    /// Decodes the inline data as UTF-8 text.
    ///
    /// Returns `Ok(None)` if the part carries no inline data.
    ///
    /// # Errors
    ///
    /// Returns an error if the inline data is not valid base64url or not
    /// valid UTF-8.
    pub fn decoded_text(&self) -> Result<Option<String>> {
        match self.decoded_data()? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|source| Error::Utf8Decode {
                    part_id: self.part_id.clone(),
                    source,
                }),
            None => Ok(None),
        }
    }

    /// Looks up a MIME header by name, case-insensitively.
    ///
    /// Returns the first matching header's value.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

/// Content of an attachment descriptor: either inline bytes (small
/// attachments) or an opaque reference requiring a second fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentContent {
    /// Decoded inline bytes.
    Inline(Vec<u8>),
    /// Reference to fetch the body on demand, keyed by (email id, reference).
    Reference(String),
}

/// Attachment located by the walker.
///
/// Ephemeral: recomputed per message fetch. Only filename, MIME type and
/// reference are ever persisted; raw bytes never are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentDescriptor {
    /// Attachment filename.
    pub filename: String,
    /// Attachment MIME type.
    pub mime_type: String,
    /// Identifier of the part that carries this attachment.
    pub part_id: String,
    /// Inline bytes or a fetch-on-demand reference.
    pub content: AttachmentContent,
}

impl AttachmentDescriptor {
    /// Returns the attachment reference if the body must be fetched
    /// separately.
    #[must_use]
    pub fn reference(&self) -> Option<&str> {
        match &self.content {
            AttachmentContent::Reference(id) => Some(id),
            AttachmentContent::Inline(_) => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn part_with_filename(filename: &str, mime_type: Option<&str>) -> MessagePart {
        MessagePart {
            part_id: "1".to_string(),
            mime_type: mime_type.map(ToString::to_string),
            filename: Some(filename.to_string()),
            ..MessagePart::default()
        }
    }

    #[test]
    fn test_empty_filename_is_not_attachment() {
        let part = part_with_filename("", Some("text/plain"));
        assert!(!part.is_attachment());
        assert!(part.filename().is_none());
    }

    #[test]
    fn test_text_part_with_filename_is_attachment() {
        let part = part_with_filename("notes.txt", Some("text/plain"));
        assert!(part.is_attachment());
    }

    #[test]
    fn test_filename_without_mime_type_is_not_attachment() {
        let part = part_with_filename("notes.txt", None);
        assert!(!part.is_attachment());
    }

    #[test]
    fn test_decoded_text_roundtrip() {
        use base64::Engine as _;
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;

        let part = MessagePart {
            part_id: "0".to_string(),
            body: Some(PartBody {
                data: Some(URL_SAFE_NO_PAD.encode("Hello, World!")),
                attachment_id: None,
                size: 13,
            }),
            ..MessagePart::default()
        };
        assert_eq!(
            part.decoded_text().unwrap().as_deref(),
            Some("Hello, World!")
        );
    }

    #[test]
    fn test_decoded_data_rejects_invalid_base64() {
        let part = MessagePart {
            part_id: "0".to_string(),
            body: Some(PartBody {
                data: Some("not!valid!base64!".to_string()),
                attachment_id: None,
                size: 0,
            }),
            ..MessagePart::default()
        };
        assert!(part.decoded_data().is_err());
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let part = MessagePart {
            headers: vec![PartHeader {
                name: "List-Unsubscribe".to_string(),
                value: "<mailto:off@example.com>".to_string(),
            }],
            ..MessagePart::default()
        };
        assert_eq!(
            part.header("list-unsubscribe"),
            Some("<mailto:off@example.com>")
        );
        assert!(part.header("subject").is_none());
    }

    #[test]
    fn test_deserialize_provider_payload() {
        let json = r#"{
            "partId": "0",
            "mimeType": "multipart/mixed",
            "filename": "",
            "headers": [{"name": "From", "value": "a@example.com"}],
            "body": {"size": 0},
            "parts": [
                {"partId": "0.0", "mimeType": "text/plain", "body": {"data": "SGVsbG8", "size": 5}}
            ]
        }"#;
        let part: MessagePart = serde_json::from_str(json).unwrap();
        assert_eq!(part.part_id, "0");
        assert_eq!(part.parts.len(), 1);
        assert_eq!(part.parts[0].decoded_text().unwrap().as_deref(), Some("Hello"));
    }
}
