//! Wire message types for the speech-evaluation protocol.
//!
//! This module contains all message types flowing over the evaluation
//! WebSocket, including:
//!
//! - **Outgoing frames**: sent from client to vendor
//!   - [`ParameterFrame`]: engine selection, category, and target text;
//!     sent exactly once, before any audio
//!   - [`AudioChunkFrame`]: one base64 PCM slice with position and
//!     stream-status flags
//!
//! - **Incoming messages**: received from the vendor
//!   - [`VendorMessage`]: status code, message, and an optional base64
//!     result fragment
//!
//! Engine ids, result sub-tree keys, and text tags are looked up through the
//! [`Language`] and [`Category`] enums rather than string literals at call
//! sites, so a typo in one place cannot silently skew a whole evaluation.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

/// UTF-8 byte-order mark the vendor requires at the start of the target text.
const TEXT_BOM: char = '\u{feff}';

/// Vendor status code indicating success.
pub const VENDOR_CODE_OK: i64 = 0;

/// Inner `data.status` value signalling the vendor has sent its last
/// result fragment.
pub const TERMINAL_DATA_STATUS: i32 = 2;

// =============================================================================
// Engine and Category Selection
// =============================================================================

/// Spoken language under evaluation. Selects the vendor engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    /// English pronunciation evaluation.
    En,
    /// Mandarin pronunciation evaluation (adds a tone score).
    Zh,
}

impl Language {
    /// Vendor engine id carried in the parameter frame.
    pub fn engine_id(self) -> &'static str {
        match self {
            Self::En => "en_vip",
            Self::Zh => "cn_vip",
        }
    }

    /// Whether this language carries an independent tone signal.
    pub fn has_tones(self) -> bool {
        matches!(self, Self::Zh)
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en" => Ok(Self::En),
            "zh" => Ok(Self::Zh),
            other => Err(format!("unsupported language: {other}")),
        }
    }
}

/// Evaluation category: the kind of text the speaker was asked to read.
///
/// The category determines three coupled wire details: the parameter-frame
/// category value, the key of the result sub-tree, and the bracketed tag
/// prepended to the target text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Word,
    Sentence,
    Chapter,
}

impl Category {
    /// Category value sent in the parameter frame; also the top-level key of
    /// the vendor's result sub-tree.
    pub fn result_key(self) -> &'static str {
        match self {
            Self::Word => "read_word",
            Self::Sentence => "read_sentence",
            Self::Chapter => "read_chapter",
        }
    }

    /// Bracketed marker line the vendor expects before the raw text.
    pub fn text_tag(self) -> &'static str {
        match self {
            Self::Word => "[word]",
            Self::Sentence => "[content]",
            Self::Chapter => "[chapter]",
        }
    }

    /// Format the target text as the vendor expects it: BOM, tag line, text.
    pub fn format_text(self, text: &str) -> String {
        format!("{TEXT_BOM}{}\n{}", self.text_tag(), text)
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "word" => Ok(Self::Word),
            "sentence" => Ok(Self::Sentence),
            "chapter" => Ok(Self::Chapter),
            other => Err(format!("unsupported category: {other}")),
        }
    }
}

// =============================================================================
// Chunk Flags
// =============================================================================

/// Position of an audio chunk within the stream.
///
/// A single-chunk stream collapses directly to `Last`; `First` only appears
/// when at least two chunks are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkPosition {
    First,
    Middle,
    Last,
}

impl ChunkPosition {
    pub fn wire_value(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Middle => 2,
            Self::Last => 4,
        }
    }
}

impl Serialize for ChunkPosition {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.wire_value())
    }
}

/// Whether more audio follows this chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    Continue,
    Final,
}

impl StreamStatus {
    pub fn wire_value(self) -> u8 {
        match self {
            Self::Continue => 1,
            Self::Final => 2,
        }
    }
}

impl Serialize for StreamStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.wire_value())
    }
}

// =============================================================================
// Outgoing Frames (Client to Vendor)
// =============================================================================

/// First frame on the wire; sent exactly once, before all audio chunks.
#[derive(Debug, Serialize)]
pub struct ParameterFrame {
    pub common: CommonParams,
    pub business: BusinessParams,
    pub data: ParameterData,
}

#[derive(Debug, Serialize)]
pub struct CommonParams {
    pub app_id: String,
}

/// Evaluation parameters: engine, category, and the formatted target text.
#[derive(Debug, Serialize)]
pub struct BusinessParams {
    /// Service selector (always "ise").
    pub sub: &'static str,
    /// Vendor engine id derived from the language.
    pub ent: &'static str,
    /// Evaluation category.
    pub category: &'static str,
    /// Stage command: "ssb" starts a session.
    pub cmd: &'static str,
    /// BOM-prefixed, tagged target text.
    pub text: String,
    /// Text encoding of `text`.
    pub tte: &'static str,
    /// Result encoding requested from the vendor.
    pub rstcd: &'static str,
    /// Audio encoding of the upcoming chunks (raw PCM).
    pub aue: &'static str,
    /// Audio format description.
    pub auf: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ParameterData {
    pub status: u8,
}

impl ParameterFrame {
    pub fn new(app_id: &str, language: Language, category: Category, text: &str) -> Self {
        Self {
            common: CommonParams {
                app_id: app_id.to_string(),
            },
            business: BusinessParams {
                sub: "ise",
                ent: language.engine_id(),
                category: category.result_key(),
                cmd: "ssb",
                text: category.format_text(text),
                tte: "utf-8",
                rstcd: "utf8",
                aue: "raw",
                auf: "audio/L16;rate=16000",
            },
            data: ParameterData { status: 0 },
        }
    }
}

/// One base64 slice of PCM with its position and stream-status flags.
#[derive(Debug, Serialize)]
pub struct AudioChunkFrame {
    pub business: ChunkBusiness,
    pub data: ChunkData,
}

#[derive(Debug, Serialize)]
pub struct ChunkBusiness {
    /// Stage command: "auw" uploads audio.
    pub cmd: &'static str,
    /// Position flag.
    pub aus: ChunkPosition,
    pub aue: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ChunkData {
    /// Stream status flag.
    pub status: StreamStatus,
    /// Base64-encoded PCM slice.
    pub data: String,
}

impl AudioChunkFrame {
    pub fn new(pcm: &[u8], position: ChunkPosition, status: StreamStatus) -> Self {
        Self {
            business: ChunkBusiness {
                cmd: "auw",
                aus: position,
                aue: "raw",
            },
            data: ChunkData {
                status,
                data: BASE64.encode(pcm),
            },
        }
    }

    pub fn position(&self) -> ChunkPosition {
        self.business.aus
    }

    pub fn status(&self) -> StreamStatus {
        self.data.status
    }
}

/// Split PCM into the frame sequence the protocol requires.
///
/// The final frame is always flagged both `Last` and `Final`, even when it is
/// the only frame. Empty input still produces one terminal frame so the
/// vendor sees a complete stream.
pub fn chunk_frames(pcm: &[u8], chunk_size: usize) -> Vec<AudioChunkFrame> {
    let chunk_size = chunk_size.max(1);
    if pcm.is_empty() {
        return vec![AudioChunkFrame::new(
            &[],
            ChunkPosition::Last,
            StreamStatus::Final,
        )];
    }

    let chunks: Vec<&[u8]> = pcm.chunks(chunk_size).collect();
    let total = chunks.len();
    chunks
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| {
            let last = index + 1 == total;
            let position = if last {
                ChunkPosition::Last
            } else if index == 0 {
                ChunkPosition::First
            } else {
                ChunkPosition::Middle
            };
            let status = if last {
                StreamStatus::Final
            } else {
                StreamStatus::Continue
            };
            AudioChunkFrame::new(chunk, position, status)
        })
        .collect()
}

// =============================================================================
// Incoming Messages (Vendor to Client)
// =============================================================================

/// Inbound message envelope from the vendor.
#[derive(Debug, Clone, Deserialize)]
pub struct VendorMessage {
    /// Vendor status code; 0 means success.
    pub code: i64,
    /// Human-readable status, populated on errors.
    #[serde(default)]
    pub message: String,
    /// Vendor session id, for support diagnostics.
    #[serde(default)]
    pub sid: Option<String>,
    #[serde(default)]
    pub data: Option<VendorData>,
}

/// Incremental result carrier inside a [`VendorMessage`].
#[derive(Debug, Clone, Deserialize)]
pub struct VendorData {
    pub status: i32,
    /// Base64 fragment of the result payload.
    #[serde(default)]
    pub data: Option<String>,
}

impl VendorMessage {
    pub fn is_ok(&self) -> bool {
        self.code == VENDOR_CODE_OK
    }

    /// True when this message carries the vendor's last fragment.
    pub fn is_terminal(&self) -> bool {
        self.data
            .as_ref()
            .is_some_and(|d| d.status == TERMINAL_DATA_STATUS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_ids_and_result_keys() {
        assert_eq!(Language::En.engine_id(), "en_vip");
        assert_eq!(Language::Zh.engine_id(), "cn_vip");
        assert_eq!(Category::Word.result_key(), "read_word");
        assert_eq!(Category::Sentence.result_key(), "read_sentence");
        assert_eq!(Category::Chapter.result_key(), "read_chapter");
    }

    #[test]
    fn parses_language_and_category_codes() {
        assert_eq!("en".parse::<Language>().unwrap(), Language::En);
        assert_eq!("zh".parse::<Language>().unwrap(), Language::Zh);
        assert!("fr".parse::<Language>().is_err());
        assert_eq!("word".parse::<Category>().unwrap(), Category::Word);
        assert!("paragraph".parse::<Category>().is_err());
    }

    #[test]
    fn formatted_text_carries_bom_and_tag() {
        let text = Category::Word.format_text("cat");
        assert!(text.starts_with('\u{feff}'));
        assert_eq!(&text[3..], "[word]\ncat");

        let text = Category::Chapter.format_text("a longer passage");
        assert!(text.contains("[chapter]\n"));
    }

    #[test]
    fn parameter_frame_wire_shape() {
        let frame = ParameterFrame::new("app123", Language::En, Category::Sentence, "hello");
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["common"]["app_id"], "app123");
        assert_eq!(json["business"]["cmd"], "ssb");
        assert_eq!(json["business"]["ent"], "en_vip");
        assert_eq!(json["business"]["category"], "read_sentence");
        assert_eq!(json["data"]["status"], 0);
    }

    #[test]
    fn chunk_frame_wire_shape() {
        let frame = AudioChunkFrame::new(&[1, 2, 3], ChunkPosition::First, StreamStatus::Continue);
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["business"]["cmd"], "auw");
        assert_eq!(json["business"]["aus"], 1);
        assert_eq!(json["data"]["status"], 1);
        assert_eq!(json["data"]["data"], BASE64.encode([1u8, 2, 3]));
    }

    #[test]
    fn single_chunk_collapses_to_last_and_final() {
        let frames = chunk_frames(&[0u8; 100], 12_000);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].position(), ChunkPosition::Last);
        assert_eq!(frames[0].status(), StreamStatus::Final);
    }

    #[test]
    fn chunk_flag_invariants_hold_for_varied_lengths() {
        for (len, chunk_size) in [
            (1usize, 1usize),
            (5, 2),
            (100, 10),
            (101, 10),
            (12_000, 12_000),
            (12_001, 12_000),
            (50_000, 12_000),
        ] {
            let pcm = vec![0u8; len];
            let frames = chunk_frames(&pcm, chunk_size);

            let firsts = frames
                .iter()
                .filter(|f| f.position() == ChunkPosition::First)
                .count();
            let lasts = frames
                .iter()
                .filter(|f| f.position() == ChunkPosition::Last)
                .count();
            let finals = frames
                .iter()
                .filter(|f| f.status() == StreamStatus::Final)
                .count();

            assert_eq!(lasts, 1, "len={len} chunk={chunk_size}");
            assert_eq!(finals, 1, "len={len} chunk={chunk_size}");
            if frames.len() == 1 {
                assert_eq!(firsts, 0, "single chunk must collapse to last");
            } else {
                assert_eq!(firsts, 1, "len={len} chunk={chunk_size}");
            }
            assert_eq!(frames.last().unwrap().status(), StreamStatus::Final);
            assert_eq!(frames.last().unwrap().position(), ChunkPosition::Last);
        }
    }

    #[test]
    fn empty_pcm_still_produces_terminal_frame() {
        let frames = chunk_frames(&[], 12_000);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].position(), ChunkPosition::Last);
        assert_eq!(frames[0].status(), StreamStatus::Final);
        assert!(frames[0].data.data.is_empty());
    }

    #[test]
    fn vendor_message_terminal_detection() {
        let msg: VendorMessage = serde_json::from_str(
            r#"{"code":0,"message":"success","sid":"ise000e1234","data":{"status":2,"data":"dGVzdA=="}}"#,
        )
        .unwrap();
        assert!(msg.is_ok());
        assert!(msg.is_terminal());

        let msg: VendorMessage =
            serde_json::from_str(r#"{"code":0,"data":{"status":1,"data":"YQ=="}}"#).unwrap();
        assert!(!msg.is_terminal());

        let msg: VendorMessage =
            serde_json::from_str(r#"{"code":10165,"message":"invalid appid"}"#).unwrap();
        assert!(!msg.is_ok());
        assert!(!msg.is_terminal());
    }
}
