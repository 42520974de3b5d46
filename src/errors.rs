//! Error types for the evaluation pipeline.
//!
//! Every failure surfaced to a caller is one [`EvalError`] variant; callers
//! get a kind plus a message and nothing else. There is no retry metadata:
//! retries, if any, belong to the orchestrating layer and must restart the
//! whole session with a fresh signed URL.
//!
//! An evaluation that succeeds on the wire but matches no score sub-tree is
//! *not* an error: it comes back as an all-zero
//! [`NormalizedScore`](crate::core::eval::score::NormalizedScore) that
//! callers should treat as suspect.

use std::time::Duration;

/// Upper bound on accumulated-payload bytes echoed in decode errors, so a
/// malformed multi-megabyte result cannot balloon an error message.
const PAYLOAD_HEAD_LEN: usize = 256;

/// Error type for evaluation operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EvalError {
    /// Credentials missing or empty; detected before any network call.
    #[error("authentication failed: {0}")]
    AuthFailure(String),

    /// Socket failed to open or errored mid-session.
    #[error("connection failed: {0}")]
    ConnectionFailure(String),

    /// The vendor returned a non-zero status code; the message is verbatim.
    #[error("vendor rejected evaluation (code {code}): {message}")]
    VendorRejected { code: i64, message: String },

    /// No terminal frame arrived before the session deadline; the socket was
    /// force-closed with no partial-result salvage.
    #[error("evaluation timed out after {0:?}")]
    Timeout(Duration),

    /// Base64 or structured-format parsing failed on the accumulated result.
    #[error("failed to decode result: {message} (payload head: {payload_head:?})")]
    DecodeFailure {
        message: String,
        /// Truncated head of the offending payload, for diagnostics.
        payload_head: String,
    },
}

impl EvalError {
    /// Build a [`EvalError::DecodeFailure`] carrying a truncated head of the
    /// payload that failed to decode.
    pub(crate) fn decode(message: impl Into<String>, payload: &str) -> Self {
        Self::DecodeFailure {
            message: message.into(),
            payload_head: payload.chars().take(PAYLOAD_HEAD_LEN).collect(),
        }
    }
}

/// Result type alias for evaluation operations.
pub type EvalResult<T> = Result<T, EvalError>;
