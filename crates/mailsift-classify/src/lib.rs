//! # mailsift-classify
//!
//! Prompt construction and response parsing for email classification.
//!
//! ## Features
//!
//! - **Deterministic prompts**: Byte-identical output for identical input
//! - **Fixed-format parsing**: Six labeled segments, strictly validated
//! - **Typed results**: Category vocabulary, urgency bounds, entity model
//!
//! The provider reply format is a narrow wire contract. It is isolated
//! behind this crate so a future switch to a structured reply format only
//! touches one component.
//!
//! ## Quick Start
//!
//! ```
//! use mailsift_classify::{ClassificationRequest, build_prompt, parse_response};
//!
//! let request = ClassificationRequest {
//!     sender: "billing@acme.example".to_string(),
//!     recipients: vec!["user@example.com".to_string()],
//!     has_unsubscribe_link: false,
//!     attachment_names: vec!["invoice.pdf".to_string()],
//!     date: "2026-08-29".to_string(),
//!     body: "Your invoice is due Friday.".to_string(),
//! };
//! let prompt = build_prompt(&request);
//! assert!(prompt.contains("From: billing@acme.example"));
//!
//! let reply = "Summary: Pay invoice.\nUrgency Score: 75\nAction: Review invoice\n\
//!              Classification: Work-Related\nKeywords: invoice, payment\n\
//!              ExtractedEntities: {}";
//! let result = parse_response(reply).unwrap();
//! assert_eq!(result.urgency_score, 75);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
mod parse;
mod request;
mod result;

pub use error::{ParseError, Result};
pub use parse::parse_response;
pub use request::{ClassificationRequest, build_prompt};
pub use result::{Category, ClassificationResult, ExtractedEntities};
