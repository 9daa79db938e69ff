//! # mailsift-core
//!
//! Orchestration layer of the mailsift pipeline: takes an enqueued
//! `(user, email)` pair from provider identifier to persisted, PII-protected
//! classification record.
//!
//! ## Features
//!
//! - **Processing queue**: Deduplicated, concurrency-bounded job table with
//!   quota-aware backoff and live statistics
//! - **Pipeline**: Fetch, extract, classify, persist stages over the
//!   [`mailsift_provider`] clients
//! - **Credential gate**: Resolves decrypted provider access tokens, with a
//!   distinct needs-reauthentication outcome
//! - **Field-level encryption**: AES-256-GCM over individual identifying
//!   fields, fresh nonce per encryption, fail-closed decryption
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use mailsift_core::{
//!     CredentialGate, FieldCipher, KeyringTokenStore, Pipeline,
//!     ProcessingQueue, QueueConfig, UserId, EmailId,
//! };
//! use mailsift_provider::{HttpMailClient, HttpTextGenClient};
//!
//! # async fn run(store: Arc<dyn mailsift_core::DocumentStore>) -> anyhow::Result<()> {
//! let cipher = FieldCipher::from_hex(&std::env::var("MAILSIFT_FIELD_KEY")?)?;
//! let gate = CredentialGate::new(Arc::new(KeyringTokenStore), cipher.clone());
//! let pipeline = Pipeline::new(
//!     gate,
//!     Arc::new(HttpMailClient::new()),
//!     Arc::new(HttpTextGenClient::new(std::env::var("MAILSIFT_TEXTGEN_KEY")?)),
//!     store,
//!     cipher,
//! );
//! let queue = ProcessingQueue::new(pipeline, QueueConfig::default());
//! queue.enqueue(UserId::from("user-1"), EmailId::from("18c2f0a9")).await;
//! queue.run().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod credentials;
mod crypto;
mod error;
mod ids;
mod pipeline;
mod queue;
mod store;

pub use credentials::{CredentialError, CredentialGate, CredentialResult, KeyringTokenStore, TokenStore};
pub use crypto::{EncryptedField, EncryptionError, FieldCipher, KEY_LEN, NONCE_LEN, TAG_LEN};
pub use error::{Disposition, Error, Result};
pub use ids::{EmailId, UserId};
pub use pipeline::{Pipeline, PreparedEmail};
pub use queue::{
    JobKey, JobState, ProcessingQueue, QueueConfig, QueueJob, QueueStats, QuotaNotice, StateCounts,
};
pub use store::{DocumentStore, ProcessedEmail, StoreError, StoredEntities};
