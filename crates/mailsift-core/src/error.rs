//! Error types for the processing pipeline and queue.

use crate::credentials::CredentialError;
use crate::crypto::EncryptionError;
use crate::store::StoreError;

/// What the queue should do with a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Retry later with backoff.
    Retry,
    /// Wait out a provider-announced quota window, then retry.
    QuotaWait,
    /// The user must re-authenticate; do not retry automatically.
    Reauth,
    /// Permanent failure; do not retry.
    Fail,
}

/// Error type for pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Credential resolution failed.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// A mail or text-generation provider call failed.
    #[error(transparent)]
    Provider(#[from] mailsift_provider::Error),

    /// Message content extraction failed.
    #[error(transparent)]
    Content(#[from] mailsift_mime::Error),

    /// The classifier reply did not match the expected format.
    #[error(transparent)]
    Parse(#[from] mailsift_classify::ParseError),

    /// Field encryption or decryption failed.
    #[error(transparent)]
    Encryption(#[from] EncryptionError),

    /// The document store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Classifies this error into the action the queue should take.
    #[must_use]
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::Credential(CredentialError::Missing(_) | CredentialError::Decrypt(_)) => {
                Disposition::Reauth
            }
            Self::Credential(CredentialError::Store(_)) => Disposition::Retry,
            Self::Provider(e) => match e {
                mailsift_provider::Error::Unauthorized => Disposition::Reauth,
                mailsift_provider::Error::RateLimited { .. } => Disposition::QuotaWait,
                e if e.is_transient() => Disposition::Retry,
                _ => Disposition::Fail,
            },
            // Malformed replies and undecodable content do not improve with
            // retries.
            Self::Content(_) | Self::Parse(_) | Self::Encryption(_) => Disposition::Fail,
            Self::Store(_) => Disposition::Retry,
        }
    }

    /// A short, user-facing description without internal detail.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Credential(CredentialError::Missing(_) | CredentialError::Decrypt(_))
            | Self::Provider(mailsift_provider::Error::Unauthorized) => {
                "Your mail account needs to be reconnected.".to_owned()
            }
            Self::Provider(mailsift_provider::Error::RateLimited { message, .. }) => {
                if message.is_empty() {
                    "The mail provider is rate limiting requests; processing will resume shortly."
                        .to_owned()
                } else {
                    message.clone()
                }
            }
            Self::Provider(mailsift_provider::Error::NotFound(_)) => {
                "The message could not be found.".to_owned()
            }
            Self::Parse(_) => "The classifier returned an unusable reply.".to_owned(),
            _ => "Processing failed; it will be retried if possible.".to_owned(),
        }
    }
}
