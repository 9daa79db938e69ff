//! # mailsift-provider
//!
//! Network clients for the mailsift pipeline.
//!
//! ## Features
//!
//! - **Mail provider**: Fetch a full message part tree by id; fetch large
//!   attachment bodies on demand by `(email_id, attachment_ref)`
//! - **Text generation**: Submit a classification prompt, receive raw reply
//!   text
//! - **Typed failures**: Rate-limit signals carry the retry-after hint and
//!   quota description; transient faults are distinguishable from terminal
//!   rejections
//!
//! Both clients are exposed behind async traits ([`MailApi`],
//! [`TextGenApi`]) so the processing queue can be exercised against scripted
//! collaborators in tests.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
mod mail;
mod textgen;

pub use error::{Error, Result};
pub use mail::{AttachmentBody, DEFAULT_MAIL_ENDPOINT, FetchedMessage, HttpMailClient, MailApi};
pub use textgen::{DEFAULT_MODEL, DEFAULT_TEXTGEN_ENDPOINT, HttpTextGenClient, TextGenApi};
