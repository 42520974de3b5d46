//! Evaluate-pronunciation use case.
//!
//! Glue above the protocol client: fetch the recorded audio (when hosted),
//! strip the WAV container, run one evaluation session, and normalize the
//! scores. Returns both the normalized and the untouched raw result so the
//! caller can persist both forms; nothing is persisted here.

use tracing::{debug, info, warn};

use crate::config::EvalConfig;
use crate::core::audio::strip_wav_header;
use crate::core::eval::client::{EvalClient, EvaluationRequest};
use crate::core::eval::messages::{Category, Language};
use crate::core::eval::response::RawEvaluationResult;
use crate::core::eval::score::{extract_scores, NormalizedScore};
use crate::errors::{EvalError, EvalResult};

/// Where the recorded audio lives.
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// Hosted recording, fetched with a plain GET.
    Url(String),
    /// Bytes already in hand, either a WAV container or raw PCM.
    Bytes(Vec<u8>),
}

/// Input to the evaluate-pronunciation use case.
#[derive(Debug, Clone)]
pub struct EvaluationInput {
    pub audio: AudioSource,
    /// What the speaker was asked to say.
    pub text: String,
    pub language: Language,
    pub category: Category,
}

/// Normalized scores plus the untouched vendor result.
#[derive(Debug, Clone)]
pub struct EvaluationOutcome {
    pub scores: NormalizedScore,
    pub raw: RawEvaluationResult,
}

/// Run one full pronunciation evaluation.
///
/// An outcome whose scores are all zero means the vendor responded but no
/// score sub-tree matched; callers should surface "evaluation unavailable"
/// rather than a literal zero.
pub async fn evaluate(config: &EvalConfig, input: EvaluationInput) -> EvalResult<EvaluationOutcome> {
    let audio = match input.audio {
        AudioSource::Bytes(bytes) => bytes,
        AudioSource::Url(url) => fetch_audio(&url).await?,
    };

    let pcm = strip_wav_header(&audio).to_vec();
    if pcm.is_empty() {
        warn!("audio payload is empty after container stripping");
    }

    let client = EvalClient::new(config.clone());
    let request = EvaluationRequest {
        pcm,
        text: input.text,
        language: input.language,
        category: input.category,
    };
    let raw = client.evaluate(&request).await?;

    let scores = extract_scores(&raw, input.language);
    if scores.is_empty() {
        warn!(
            category = input.category.result_key(),
            "evaluation produced an all-zero score"
        );
    } else {
        info!(total = scores.total_score, "evaluation complete");
    }

    Ok(EvaluationOutcome { scores, raw })
}

/// Plain GET against the hosted audio URL. The object-storage scheme behind
/// the URL is the caller's concern.
async fn fetch_audio(url: &str) -> EvalResult<Vec<u8>> {
    debug!(url, "fetching recorded audio");
    let response = reqwest::get(url)
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| EvalError::ConnectionFailure(format!("audio fetch failed: {e}")))?;
    let bytes = response
        .bytes()
        .await
        .map_err(|e| EvalError::ConnectionFailure(format!("audio fetch failed: {e}")))?;
    debug!(len = bytes.len(), "audio fetched");
    Ok(bytes.to_vec())
}
