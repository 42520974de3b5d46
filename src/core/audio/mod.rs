//! Audio codec utilities: WAV container handling and PCM preparation.
//!
//! The evaluation protocol consumes raw 16 kHz mono 16-bit PCM. This module
//! owns the two conversions around that format: stripping a WAV container
//! from fetched recordings, and encoding captured float samples into a
//! canonical WAV file for upload.

mod wav;

pub use wav::{encode_wav, strip_wav_header, TARGET_SAMPLE_RATE};
