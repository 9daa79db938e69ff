//! Error types for message tree operations.

use std::string::FromUtf8Error;

/// Result type alias for message tree operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Message tree error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Base64url decode error in inline part data.
    #[error("Base64 decode error in part {part_id}: {source}")]
    Base64Decode {
        /// Identifier of the offending part.
        part_id: String,
        /// Underlying decode error.
        source: base64::DecodeError,
    },

    /// Part data is not valid UTF-8 text.
    #[error("UTF-8 decode error in part {part_id}: {source}")]
    Utf8Decode {
        /// Identifier of the offending part.
        part_id: String,
        /// Underlying decode error.
        source: FromUtf8Error,
    },

    /// Part tree exceeds the maximum traversal depth.
    #[error("Part tree exceeds maximum depth of {0}")]
    TreeTooDeep(usize),

    /// Part tree contains more parts than the traversal cap allows.
    #[error("Part tree exceeds maximum part count of {0}")]
    TooManyParts(usize),
}
