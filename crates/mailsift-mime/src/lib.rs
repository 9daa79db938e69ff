//! # mailsift-mime
//!
//! Message part tree model and content extraction for mail provider payloads.
//!
//! ## Features
//!
//! - **Part tree model**: Mirrors the provider's nested multipart JSON
//! - **Extraction**: Locates body text and attachment descriptors in one walk
//! - **Part lookup**: Resolve a single part by identifier on demand
//! - **Decoding**: Base64url inline data decoding
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailsift_mime::{MessagePart, extract, find_part};
//!
//! let root: MessagePart = serde_json::from_str(payload_json)?;
//! let content = extract(&root, snippet)?;
//! println!("body: {}", content.body_text);
//! for attachment in &content.attachments {
//!     println!("attachment: {}", attachment.filename);
//! }
//!
//! // Resolve one part later, e.g. to download a large attachment.
//! if let Some(part) = find_part(&root, "0.1") {
//!     println!("reference: {:?}", part.attachment_ref());
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
mod extract;
mod part;

pub use error::{Error, Result};
pub use extract::{ExtractedContent, MAX_PART_COUNT, MAX_TREE_DEPTH, extract, find_part};
pub use part::{AttachmentContent, AttachmentDescriptor, MessagePart, PartBody, PartHeader};
