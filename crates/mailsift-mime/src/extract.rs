//! Body and attachment extraction from a message part tree.
//!
//! The walker visits the tree depth-first in pre-order with an explicit
//! work list, so adversarial or malformed trees cannot blow the stack.
//! Traversal depth and total part count are capped.

use crate::error::{Error, Result};
use crate::part::{AttachmentContent, AttachmentDescriptor, MessagePart};

/// Maximum nesting depth the walker will descend.
pub const MAX_TREE_DEPTH: usize = 100;

/// Maximum number of parts the walker will visit in one tree.
pub const MAX_PART_COUNT: usize = 10_000;

/// Result of walking a message part tree.
#[derive(Debug, Clone, Default)]
pub struct ExtractedContent {
    /// Selected body text (HTML preferred over plain, then the provider
    /// snippet, then empty).
    pub body_text: String,
    /// Attachments in document order.
    pub attachments: Vec<AttachmentDescriptor>,
}

/// Walks a part tree and extracts body text plus attachment descriptors.
///
/// Selection rules:
/// - a part carrying a filename and a MIME type is recorded as an attachment,
///   even when its MIME type is `text/*`;
/// - otherwise `text/html` and `text/plain` parts with inline data become
///   body candidates, last occurrence winning at any depth;
/// - the final body is the HTML candidate if non-empty, else the plain
///   candidate, else `snippet`, else empty.
///
/// # Errors
///
/// Returns an error if inline data fails to decode, or if the tree exceeds
/// [`MAX_TREE_DEPTH`] or [`MAX_PART_COUNT`].
pub fn extract(root: &MessagePart, snippet: &str) -> Result<ExtractedContent> {
    let mut html_candidate: Option<String> = None;
    let mut plain_candidate: Option<String> = None;
    let mut attachments = Vec::new();

    let mut visited = 0usize;
    let mut stack: Vec<(&MessagePart, usize)> = vec![(root, 0)];

    while let Some((part, depth)) = stack.pop() {
        if depth >= MAX_TREE_DEPTH {
            return Err(Error::TreeTooDeep(MAX_TREE_DEPTH));
        }
        visited += 1;
        if visited > MAX_PART_COUNT {
            return Err(Error::TooManyParts(MAX_PART_COUNT));
        }

        if part.is_attachment() {
            if let Some(descriptor) = attachment_descriptor(part)? {
                attachments.push(descriptor);
            }
        } else {
            match part.mime_type.as_deref() {
                Some("text/html") => {
                    if let Some(text) = part.decoded_text()? {
                        html_candidate = Some(text);
                    }
                }
                Some("text/plain") => {
                    if let Some(text) = part.decoded_text()? {
                        plain_candidate = Some(text);
                    }
                }
                _ => {}
            }
        }

        // Push children in reverse so they pop in document order.
        for child in part.parts.iter().rev() {
            stack.push((child, depth + 1));
        }
    }

    let body_text = match (html_candidate, plain_candidate) {
        (Some(html), _) if !html.is_empty() => html,
        (_, Some(plain)) if !plain.is_empty() => plain,
        _ => snippet.to_string(),
    };

    Ok(ExtractedContent {
        body_text,
        attachments,
    })
}

/// Finds a part by identifier, depth-first, checking the root itself before
/// descending into children. Returns `None` when the identifier is absent
/// from the tree.
#[must_use]
pub fn find_part<'a>(root: &'a MessagePart, part_id: &str) -> Option<&'a MessagePart> {
    let mut stack = vec![root];
    while let Some(part) = stack.pop() {
        if part.part_id == part_id {
            return Some(part);
        }
        for child in part.parts.iter().rev() {
            stack.push(child);
        }
    }
    None
}

/// Builds an attachment descriptor for a part, preferring inline data over
/// the fetch-on-demand reference. A part with neither carries no retrievable
/// body and is skipped.
fn attachment_descriptor(part: &MessagePart) -> Result<Option<AttachmentDescriptor>> {
    let (Some(filename), Some(mime_type)) = (part.filename(), part.mime_type.as_deref()) else {
        return Ok(None);
    };

    let content = if part.inline_data().is_some() {
        match part.decoded_data()? {
            Some(bytes) => AttachmentContent::Inline(bytes),
            None => return Ok(None),
        }
    } else if let Some(reference) = part.attachment_ref() {
        AttachmentContent::Reference(reference.to_string())
    } else {
        return Ok(None);
    };

    Ok(Some(AttachmentDescriptor {
        filename: filename.to_string(),
        mime_type: mime_type.to_string(),
        part_id: part.part_id.clone(),
        content,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::part::PartBody;
    use base64::Engine as _;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    fn text_part(id: &str, mime_type: &str, text: &str) -> MessagePart {
        MessagePart {
            part_id: id.to_string(),
            mime_type: Some(mime_type.to_string()),
            body: Some(PartBody {
                data: Some(URL_SAFE_NO_PAD.encode(text)),
                attachment_id: None,
                size: text.len() as u64,
            }),
            ..MessagePart::default()
        }
    }

    fn attachment_part(id: &str, filename: &str, reference: &str) -> MessagePart {
        MessagePart {
            part_id: id.to_string(),
            mime_type: Some("application/pdf".to_string()),
            filename: Some(filename.to_string()),
            body: Some(PartBody {
                data: None,
                attachment_id: Some(reference.to_string()),
                size: 1024,
            }),
            ..MessagePart::default()
        }
    }

    fn container(id: &str, parts: Vec<MessagePart>) -> MessagePart {
        MessagePart {
            part_id: id.to_string(),
            mime_type: Some("multipart/mixed".to_string()),
            parts,
            ..MessagePart::default()
        }
    }

    #[test]
    fn test_plain_body_with_referenced_attachment() {
        let mut root = text_part("0", "text/plain", "Hello");
        root.parts = vec![attachment_part("1", "invoice.pdf", "A1")];

        let extracted = extract(&root, "preview").unwrap();
        assert_eq!(extracted.body_text, "Hello");
        assert_eq!(extracted.attachments.len(), 1);
        assert_eq!(extracted.attachments[0].filename, "invoice.pdf");
        assert_eq!(extracted.attachments[0].reference(), Some("A1"));
    }

    #[test]
    fn test_html_preferred_over_plain() {
        let root = container(
            "0",
            vec![
                text_part("0.0", "text/plain", "plain body"),
                text_part("0.1", "text/html", "<p>html body</p>"),
            ],
        );

        let extracted = extract(&root, "").unwrap();
        assert_eq!(extracted.body_text, "<p>html body</p>");
    }

    #[test]
    fn test_last_html_wins_at_any_depth() {
        let root = container(
            "0",
            vec![
                text_part("0.0", "text/html", "<p>first</p>"),
                container("0.1", vec![text_part("0.1.0", "text/html", "<p>second</p>")]),
            ],
        );

        let extracted = extract(&root, "").unwrap();
        assert_eq!(extracted.body_text, "<p>second</p>");
    }

    #[test]
    fn test_text_part_with_filename_is_attachment_not_body() {
        let root = container(
            "0",
            vec![
                {
                    let mut p = text_part("0.0", "text/plain", "log contents");
                    p.filename = Some("server.log".to_string());
                    p
                },
                text_part("0.1", "text/plain", "real body"),
            ],
        );

        let extracted = extract(&root, "").unwrap();
        assert_eq!(extracted.body_text, "real body");
        assert_eq!(extracted.attachments.len(), 1);
        assert_eq!(extracted.attachments[0].filename, "server.log");
        assert_eq!(
            extracted.attachments[0].content,
            AttachmentContent::Inline(b"log contents".to_vec())
        );
    }

    #[test]
    fn test_snippet_fallback_when_no_body() {
        let root = container("0", vec![attachment_part("0.0", "a.pdf", "A1")]);
        let extracted = extract(&root, "short preview").unwrap();
        assert_eq!(extracted.body_text, "short preview");
    }

    #[test]
    fn test_empty_when_no_body_and_no_snippet() {
        let root = container("0", vec![]);
        let extracted = extract(&root, "").unwrap();
        assert_eq!(extracted.body_text, "");
    }

    #[test]
    fn test_find_part_returns_root_first() {
        let root = container("0", vec![container("0", vec![])]);
        let found = find_part(&root, "0").unwrap();
        // Root wins over the identically-named child.
        assert!(std::ptr::eq(found, &root));
    }

    #[test]
    fn test_find_part_absent_is_none() {
        let root = container("0", vec![text_part("0.0", "text/plain", "x")]);
        assert!(find_part(&root, "9.9").is_none());
    }

    #[test]
    fn test_depth_cap() {
        let mut root = container("0", vec![]);
        let mut current = &mut root;
        for i in 1..=MAX_TREE_DEPTH {
            current.parts = vec![container(&i.to_string(), vec![])];
            current = &mut current.parts[0];
        }
        assert!(matches!(extract(&root, ""), Err(Error::TreeTooDeep(_))));
    }

    #[test]
    fn test_part_count_cap() {
        let children = (0..=MAX_PART_COUNT)
            .map(|i| text_part(&i.to_string(), "text/plain", "x"))
            .collect();
        let root = container("0", children);
        assert!(matches!(extract(&root, ""), Err(Error::TooManyParts(_))));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_part(depth: u32) -> impl Strategy<Value = MessagePart> {
            let leaf = (any::<bool>(), "[a-z]{1,8}", "[a-z0-9.]{1,6}").prop_map(
                |(attachment, text, id)| {
                    if attachment {
                        MessagePart {
                            part_id: id,
                            mime_type: Some("text/plain".to_string()),
                            filename: Some(format!("{text}.txt")),
                            body: Some(PartBody {
                                data: Some(URL_SAFE_NO_PAD.encode(&text)),
                                attachment_id: None,
                                size: text.len() as u64,
                            }),
                            ..MessagePart::default()
                        }
                    } else {
                        text_part(&id, "text/plain", &text)
                    }
                },
            );
            leaf.prop_recursive(depth, 64, 4, |inner| {
                (prop::collection::vec(inner, 0..4), "[a-z0-9.]{1,6}")
                    .prop_map(|(parts, id)| container(&id, parts))
            })
        }

        proptest! {
            // A part with filename + MIME type never contributes body text.
            #[test]
            fn filename_parts_always_attachments(root in arb_part(4)) {
                let extracted = extract(&root, "").unwrap();
                let mut stack = vec![&root];
                let mut attachment_count = 0;
                while let Some(p) = stack.pop() {
                    if p.is_attachment() {
                        attachment_count += 1;
                    }
                    stack.extend(p.parts.iter());
                }
                prop_assert_eq!(extracted.attachments.len(), attachment_count);
            }

            // find_part agrees with a plain recursive scan.
            #[test]
            fn find_part_finds_existing_ids(root in arb_part(4)) {
                let mut stack = vec![&root];
                let mut ids = Vec::new();
                while let Some(p) = stack.pop() {
                    ids.push(p.part_id.clone());
                    stack.extend(p.parts.iter());
                }
                for id in ids {
                    prop_assert!(find_part(&root, &id).is_some());
                }
            }
        }
    }
}
