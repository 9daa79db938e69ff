//! Error types for provider operations.

use std::time::Duration;

use serde::Deserialize;

/// Result type alias for provider operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Provider error types.
///
/// The variants map directly onto the queue's retry policy: rate limits wait,
/// transient faults retry with backoff, everything else is terminal.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested message, part, or attachment does not exist upstream.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The access token was rejected.
    #[error("Unauthorized: provider rejected the access token")]
    Unauthorized,

    /// The provider signaled quota/rate-limit exhaustion.
    #[error("Rate limited: {message}")]
    RateLimited {
        /// Human-readable quota message.
        message: String,
        /// Suggested wait duration, if the provider supplied one.
        retry_after: Option<Duration>,
        /// Description of the exhausted quota limit.
        quota_limit: Option<String>,
        /// Link to the provider's quota documentation.
        help_url: Option<String>,
    },

    /// Transient provider fault (5xx); retryable with backoff.
    #[error("Provider error ({status}): {message}")]
    Transient {
        /// HTTP status code.
        status: u16,
        /// Response body or status text.
        message: String,
    },

    /// Non-retryable client error (4xx other than 401/404/429).
    #[error("Provider rejected request ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body or status text.
        message: String,
    },

    /// Network-level failure (connect, timeout); retryable.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response payload did not match the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl Error {
    /// Returns true for faults worth retrying with backoff (rate limits are
    /// handled separately via [`Error::RateLimited`]).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::Http(_))
    }
}

/// Error body shape shared by the providers:
/// `{ "error": { "message", "quotaLimit"?, "helpUrl"? } }`.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: ErrorDetail,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    quota_limit: Option<String>,
    #[serde(default)]
    help_url: Option<String>,
}

/// Maps a non-2xx response to a typed error, consuming the body.
///
/// Reads the `Retry-After` header (seconds) and the JSON error body for
/// quota detail on 429 responses.
pub(crate) async fn from_response(response: reqwest::Response) -> Error {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs);

    let body = response.text().await.unwrap_or_default();
    let detail: ErrorDetail = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or_default();
    let message = if detail.message.is_empty() {
        body.clone()
    } else {
        detail.message
    };

    match status.as_u16() {
        401 | 403 => Error::Unauthorized,
        404 => Error::NotFound(message),
        429 => Error::RateLimited {
            message: if message.is_empty() {
                "Provider rate limit exceeded".to_string()
            } else {
                message
            },
            retry_after,
            quota_limit: detail.quota_limit,
            help_url: detail.help_url,
        },
        s if status.is_server_error() => Error::Transient { status: s, message },
        s => Error::Rejected { status: s, message },
    }
}
