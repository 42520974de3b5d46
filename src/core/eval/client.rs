//! Speech-evaluation WebSocket client.
//!
//! This module contains the `EvalClient` struct driving one authenticated
//! evaluation exchange against the vendor's WebSocket endpoint.
//!
//! # Protocol
//!
//! ```text
//! Connecting ──▶ ParamsSent ──▶ Streaming ──▶ AwaitingFinal ──▶ Decoding ──▶ Done
//!      │              │             │               │               │
//!      └──────────────┴─────────────┴───────────────┴───────────────┴──▶ Failed
//! ```
//!
//! One parameter frame goes out first, then PCM chunks paced by a timer
//! (the vendor's decoder expects real-time-like delivery and sends no
//! backpressure signal). Inbound messages carry base64 fragments that are
//! accumulated in arrival order; an inner terminal status closes the
//! session and hands the accumulator to the decode step.
//!
//! The whole exchange is bounded by a hard session timeout measured from
//! session start; on expiry the socket is force-closed and the call fails
//! with [`EvalError::Timeout`]. There is no partial-result salvage and no
//! retry here: a retry needs a fresh signed URL and belongs to the caller.

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::time::{interval, timeout};
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, warn};

use crate::config::EvalConfig;
use crate::core::eval::messages::{chunk_frames, Category, Language, ParameterFrame, VendorMessage};
use crate::core::eval::response::{RawEvaluationResult, WirePayload};
use crate::core::eval::session::SignedSession;
use crate::errors::{EvalError, EvalResult};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Phases of one evaluation exchange.
///
/// Held explicitly by the session run rather than implied by closure state,
/// so transitions are observable in logs and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Connecting,
    ParamsSent,
    Streaming,
    AwaitingFinal,
    Decoding,
}

fn advance(state: &mut SessionState, next: SessionState) {
    debug!(from = ?state, to = ?next, "session state");
    *state = next;
}

/// One pronunciation evaluation: raw PCM plus what the speaker was asked to
/// say.
///
/// `pcm` must be container-free mono 16-bit 16 kHz PCM by the time it gets
/// here; WAV containers are stripped upstream
/// (see [`strip_wav_header`](crate::core::audio::strip_wav_header)).
#[derive(Debug, Clone)]
pub struct EvaluationRequest {
    pub pcm: Vec<u8>,
    pub text: String,
    pub language: Language,
    pub category: Category,
}

/// Speech-evaluation protocol client.
///
/// One instance may serve many evaluations; each call opens its own socket,
/// holds no state shared with other calls, and never interleaves frames of
/// two evaluations on one connection.
#[derive(Debug, Clone)]
pub struct EvalClient {
    config: EvalConfig,
}

impl EvalClient {
    pub fn new(config: EvalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Run one full evaluation session and return the decoded vendor result.
    ///
    /// Fails fast on empty credentials before any network I/O. Bounded by
    /// the configured session timeout; on expiry the socket is dropped
    /// (force-closed) and the call fails with [`EvalError::Timeout`].
    pub async fn evaluate(&self, request: &EvaluationRequest) -> EvalResult<RawEvaluationResult> {
        let session = SignedSession::new(&self.config.credentials, &self.config.endpoint)?;
        let deadline = self.config.session_timeout;

        match timeout(deadline, self.run_session(&session, request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(?deadline, "no terminal frame before deadline, closing session");
                Err(EvalError::Timeout(deadline))
            }
        }
    }

    async fn run_session(
        &self,
        session: &SignedSession,
        request: &EvaluationRequest,
    ) -> EvalResult<RawEvaluationResult> {
        let mut state = SessionState::Connecting;
        debug!(?state, "opening evaluation session");

        let (ws, _) = connect_async(session.url())
            .await
            .map_err(|e| EvalError::ConnectionFailure(format!("WebSocket open failed: {e}")))?;
        info!("evaluation session established");
        let (mut sink, mut stream) = ws.split();

        advance(&mut state, SessionState::ParamsSent);
        let params = ParameterFrame::new(
            &self.config.credentials.app_id,
            request.language,
            request.category,
            &request.text,
        );
        send_frame(&mut sink, &params).await?;
        debug!(
            engine = request.language.engine_id(),
            category = request.category.result_key(),
            "parameter frame sent"
        );

        advance(&mut state, SessionState::Streaming);
        self.stream_audio(&mut sink, &request.pcm).await?;

        advance(&mut state, SessionState::AwaitingFinal);
        let accumulated = await_final(&mut sink, &mut stream).await?;

        advance(&mut state, SessionState::Decoding);
        WirePayload::Base64Stream(accumulated).decode(request.category)
    }

    /// Send the chunked PCM, paced by timer rather than by any server
    /// acknowledgment.
    async fn stream_audio(&self, sink: &mut WsSink, pcm: &[u8]) -> EvalResult<()> {
        let frames = chunk_frames(pcm, self.config.chunk_size);
        let total = frames.len();
        let mut pacing = interval(self.config.chunk_interval);

        for (index, frame) in frames.into_iter().enumerate() {
            pacing.tick().await;
            send_frame(sink, &frame).await?;
            debug!(chunk = index + 1, total, "audio chunk sent");
        }
        Ok(())
    }
}

/// Receive inbound messages until the vendor's terminal frame, returning the
/// accumulated base64 payload.
async fn await_final(sink: &mut WsSink, stream: &mut WsStream) -> EvalResult<String> {
    let mut accumulated = String::new();

    while let Some(message) = stream.next().await {
        let message =
            message.map_err(|e| EvalError::ConnectionFailure(format!("socket error: {e}")))?;
        match message {
            Message::Text(text) => {
                let vendor: VendorMessage = serde_json::from_str(&text)
                    .map_err(|e| EvalError::decode(format!("unparseable vendor message: {e}"), &text))?;

                if !vendor.is_ok() {
                    warn!(code = vendor.code, sid = ?vendor.sid, "vendor rejected evaluation");
                    return Err(EvalError::VendorRejected {
                        code: vendor.code,
                        message: vendor.message,
                    });
                }

                let terminal = vendor.is_terminal();
                if let Some(fragment) = vendor.data.and_then(|d| d.data) {
                    accumulated.push_str(&fragment);
                }
                if terminal {
                    debug!(payload_len = accumulated.len(), "terminal frame received");
                    // Best effort; the vendor is done with us either way.
                    let _ = sink.send(Message::Close(None)).await;
                    return Ok(accumulated);
                }
            }
            Message::Close(frame) => {
                info!(?frame, "vendor closed session before terminal frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {}
            other => {
                debug!(?other, "ignoring unexpected message type");
            }
        }
    }

    Err(EvalError::ConnectionFailure(
        "session closed before terminal frame".to_string(),
    ))
}

async fn send_frame<T: Serialize>(sink: &mut WsSink, frame: &T) -> EvalResult<()> {
    let payload = serde_json::to_string(frame)
        .map_err(|e| EvalError::ConnectionFailure(format!("frame serialization failed: {e}")))?;
    sink.send(Message::Text(payload.into()))
        .await
        .map_err(|e| EvalError::ConnectionFailure(format!("frame send failed: {e}")))
}
