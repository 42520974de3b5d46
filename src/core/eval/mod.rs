//! Speech-evaluation protocol implementation.
//!
//! The pieces of one evaluation call, in wire order:
//!
//! - [`session`]: computes the time-boxed HMAC-signed connection URL
//! - [`messages`]: the frame types and flag enums of the custom exchange
//! - [`client`]: the state machine that streams audio and collects the result
//! - [`response`]: resolves the wire payload into one canonical result shape
//! - [`score`]: extracts and normalizes pronunciation sub-scores

pub mod client;
pub mod messages;
pub mod response;
pub mod score;
pub mod session;

pub use client::{EvalClient, EvaluationRequest};
pub use messages::{Category, Language};
pub use response::{RawEvaluationResult, WirePayload};
pub use score::{extract_scores, NormalizedScore};
pub use session::SignedSession;
