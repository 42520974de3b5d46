//! elocute: streaming pronunciation-evaluation client.
//!
//! Streams recorded audio to a remote speech-assessment service over an
//! HMAC-authenticated WebSocket session, using the vendor's framed,
//! multi-stage exchange, and deterministically extracts normalized
//! pronunciation sub-scores from the nested response.
//!
//! The crate covers four pieces: WAV/PCM codec utilities
//! ([`core::audio`]), the signed-session builder
//! ([`core::eval::session`]), the protocol state machine
//! ([`core::eval::client`]), and the score extractor
//! ([`core::eval::score`]). The [`pipeline`] module ties them into one
//! evaluate-pronunciation call.
//!
//! Persistence, chat providers, and upload storage are external
//! collaborators; the crate returns both normalized and raw results and
//! stores nothing itself.

pub mod config;
pub mod core;
pub mod errors;
pub mod pipeline;

// Re-export commonly used items for convenience
pub use crate::config::{Credentials, Endpoint, EvalConfig};
pub use crate::core::audio::{encode_wav, strip_wav_header};
pub use crate::core::eval::{
    extract_scores, Category, EvalClient, EvaluationRequest, Language, NormalizedScore,
    RawEvaluationResult,
};
pub use crate::errors::{EvalError, EvalResult};
pub use crate::pipeline::{evaluate, AudioSource, EvaluationInput, EvaluationOutcome};
