//! Error types for response parsing.

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Errors produced when a provider reply does not match the required
/// six-segment format.
///
/// These are non-retryable: the prompt is deterministic, so an unparseable
/// reply is format drift, not a transient fault.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// A required labeled segment is absent from the reply.
    #[error("Missing required segment: {label}")]
    MissingSegment {
        /// The label that was not found.
        label: &'static str,
    },

    /// The urgency score is not an integer.
    #[error("Urgency score is not an integer: {value:?}")]
    NonNumericUrgency {
        /// The offending value text.
        value: String,
    },

    /// The urgency score is outside the allowed [1,100] range.
    #[error("Urgency score out of range [1,100]: {value}")]
    UrgencyOutOfRange {
        /// The parsed, out-of-range score.
        value: i64,
    },

    /// The classification is not one of the fixed vocabulary values.
    #[error("Unknown classification: {value:?}")]
    UnknownClassification {
        /// The offending value text.
        value: String,
    },

    /// The extracted-entities segment is not a valid flat JSON object.
    #[error("Invalid extracted entities: {0}")]
    InvalidEntities(#[from] serde_json::Error),
}
