use crate::types::ResourceId;

/// Validation failures for client payment payloads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The payload is not well-formed JSON, carries unknown fields, or a
    /// field fails to decode.
    #[error("malformed payment payload: {0}")]
    MalformedPayload(String),

    /// A required field is absent.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// The payload targets a different resource than the request path.
    #[error("payload resource id {got} does not match requested resource {expected}")]
    ResourceMismatch {
        expected: ResourceId,
        got: ResourceId,
    },

    /// The authorization validity window is not open.
    #[error("authorization window [{valid_after}, {valid_before}) is not open at {now}")]
    ExpiredAuthorization {
        valid_after: u64,
        valid_before: u64,
        now: u64,
    },
}
