//! WAV container codec.
//!
//! Header stripping is deliberately permissive: input that does not look like
//! a RIFF/WAVE container is passed through untouched and treated as raw PCM.
//! Resilience beats strictness at this boundary, so failures never raise;
//! they are logged and degraded instead.

use tracing::warn;

/// Sample rate the evaluation protocol expects.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Length of the canonical minimal WAV header.
const STANDARD_HEADER_LEN: usize = 44;

const RIFF_MAGIC: &[u8; 4] = b"RIFF";
const WAVE_MAGIC: &[u8; 4] = b"WAVE";
const DATA_CHUNK_ID: &[u8; 4] = b"data";
const FMT_CHUNK_ID: &[u8; 4] = b"fmt ";

/// PCM format tag in the `fmt ` chunk.
const FORMAT_PCM: u16 = 1;

/// Strip a WAV container from `bytes`, returning the raw PCM payload.
///
/// Validates the `RIFF` signature at offset 0 and `WAVE` at offset 8. If
/// either check fails the input is returned unchanged, since the caller may
/// already hold raw PCM. On success, walks the RIFF sub-chunks from offset
/// 12 (4-byte id, 4-byte little-endian size) and returns the byte range of
/// the first `data` chunk. If no `data` chunk exists, falls back to slicing
/// off the standard 44-byte header.
pub fn strip_wav_header(bytes: &[u8]) -> &[u8] {
    if bytes.len() < 12 || &bytes[0..4] != RIFF_MAGIC || &bytes[8..12] != WAVE_MAGIC {
        warn!(
            len = bytes.len(),
            "input has no RIFF/WAVE signature, treating as raw PCM"
        );
        return bytes;
    }

    let mut offset = 12;
    while offset + 8 <= bytes.len() {
        let id = &bytes[offset..offset + 4];
        let size = u32::from_le_bytes([
            bytes[offset + 4],
            bytes[offset + 5],
            bytes[offset + 6],
            bytes[offset + 7],
        ]) as usize;
        let body = offset + 8;

        if id == DATA_CHUNK_ID {
            let end = body.saturating_add(size).min(bytes.len());
            return &bytes[body.min(bytes.len())..end];
        }
        offset = body.saturating_add(size);
    }

    warn!("no data chunk found, slicing standard 44-byte header");
    &bytes[STANDARD_HEADER_LEN.min(bytes.len())..]
}

/// Encode interleaved float samples as a 16 kHz mono 16-bit PCM WAV file.
///
/// Multi-channel input is downmixed by averaging channels; a source rate
/// other than 16 kHz is linearly resampled. Samples outside [-1, 1] are
/// clipped during the int16 conversion.
pub fn encode_wav(samples: &[f32], channels: u16, sample_rate: u32) -> Vec<u8> {
    let mono = downmix(samples, channels);
    let mono = if sample_rate == TARGET_SAMPLE_RATE {
        mono
    } else {
        resample_linear(&mono, sample_rate, TARGET_SAMPLE_RATE)
    };

    let mut pcm = Vec::with_capacity(mono.len() * 2);
    for &sample in &mono {
        pcm.extend_from_slice(&float_to_i16(sample).to_le_bytes());
    }

    let mut out = Vec::with_capacity(STANDARD_HEADER_LEN + pcm.len());
    write_header(&mut out, pcm.len() as u32);
    out.extend_from_slice(&pcm);
    out
}

/// Average interleaved channels down to mono. Trailing partial frames are
/// dropped.
fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
    let channels = channels.max(1) as usize;
    if channels == 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Linear-interpolation resampler, mono only.
fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if samples.is_empty() || from_rate == 0 {
        return Vec::new();
    }
    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((samples.len() as f64) / ratio).round() as usize;
    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let pos = i as f64 * ratio;
        let idx = pos as usize;
        let frac = (pos - idx as f64) as f32;
        let a = samples[idx.min(samples.len() - 1)];
        let b = samples[(idx + 1).min(samples.len() - 1)];
        out.push(a + (b - a) * frac);
    }
    out
}

fn float_to_i16(sample: f32) -> i16 {
    let clipped = sample.clamp(-1.0, 1.0);
    if clipped < 0.0 {
        (clipped * 32_768.0) as i16
    } else {
        (clipped * 32_767.0) as i16
    }
}

/// Write the canonical 44-byte header: PCM tag, mono, 16-bit, with computed
/// byte rate and block alignment.
fn write_header(out: &mut Vec<u8>, data_len: u32) {
    let byte_rate = TARGET_SAMPLE_RATE * 2;
    let block_align: u16 = 2;

    out.extend_from_slice(RIFF_MAGIC);
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(WAVE_MAGIC);

    out.extend_from_slice(FMT_CHUNK_ID);
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&FORMAT_PCM.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&TARGET_SAMPLE_RATE.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());

    out.extend_from_slice(DATA_CHUNK_ID);
    out.extend_from_slice(&data_len.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn sine_samples(seconds: f32, rate: u32) -> Vec<f32> {
        let count = (seconds * rate as f32) as usize;
        (0..count)
            .map(|i| (i as f32 * 2.0 * std::f32::consts::PI * 440.0 / rate as f32).sin() * 0.5)
            .collect()
    }

    #[test]
    fn encode_then_strip_round_trips_pcm() {
        let samples = sine_samples(2.0, TARGET_SAMPLE_RATE);
        let wav = encode_wav(&samples, 1, TARGET_SAMPLE_RATE);

        let expected: Vec<u8> = samples
            .iter()
            .flat_map(|&s| float_to_i16(s).to_le_bytes())
            .collect();

        assert_eq!(strip_wav_header(&wav), expected.as_slice());
    }

    #[test]
    fn encoded_header_parses_as_canonical_wav() {
        let samples = sine_samples(0.5, TARGET_SAMPLE_RATE);
        let wav = encode_wav(&samples, 1, TARGET_SAMPLE_RATE);

        let reader = hound::WavReader::new(Cursor::new(&wav)).expect("valid WAV");
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, TARGET_SAMPLE_RATE);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, hound::SampleFormat::Int);
        assert_eq!(reader.len() as usize, samples.len());
    }

    #[test]
    fn strip_returns_non_wav_input_unchanged() {
        let raw = vec![1u8, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14];
        assert_eq!(strip_wav_header(&raw), raw.as_slice());

        let short = vec![0u8; 4];
        assert_eq!(strip_wav_header(&short), short.as_slice());
    }

    #[test]
    fn strip_skips_non_data_chunks() {
        // RIFF/WAVE with a LIST chunk before the data chunk.
        let pcm = [0x11u8, 0x22, 0x33, 0x44];
        let mut wav = Vec::new();
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&0u32.to_le_bytes());
        wav.extend_from_slice(b"WAVE");
        wav.extend_from_slice(b"LIST");
        wav.extend_from_slice(&6u32.to_le_bytes());
        wav.extend_from_slice(b"INFOab");
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&(pcm.len() as u32).to_le_bytes());
        wav.extend_from_slice(&pcm);

        assert_eq!(strip_wav_header(&wav), pcm.as_slice());
    }

    #[test]
    fn strip_falls_back_to_standard_header_when_data_chunk_missing() {
        let mut wav = Vec::new();
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&0u32.to_le_bytes());
        wav.extend_from_slice(b"WAVE");
        // Chunk claiming a size past the end of the buffer.
        wav.extend_from_slice(b"LIST");
        wav.extend_from_slice(&1_000_000u32.to_le_bytes());
        wav.extend_from_slice(&[0xAA; 40]);

        let stripped = strip_wav_header(&wav);
        assert_eq!(stripped, &wav[STANDARD_HEADER_LEN..]);
    }

    #[test]
    fn downmix_averages_channels() {
        let stereo = [1.0f32, 0.0, 0.5, 0.5, -1.0, 1.0];
        assert_eq!(downmix(&stereo, 2), vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn resample_halves_length_from_32k() {
        let samples = vec![0.0f32; 32_000];
        let out = resample_linear(&samples, 32_000, TARGET_SAMPLE_RATE);
        assert_eq!(out.len(), 16_000);
    }

    #[test]
    fn resample_preserves_constant_signal() {
        let samples = vec![0.25f32; 44_100];
        let out = resample_linear(&samples, 44_100, TARGET_SAMPLE_RATE);
        assert!(!out.is_empty());
        assert!(out.iter().all(|&s| (s - 0.25).abs() < 1e-6));
    }

    #[test]
    fn float_conversion_clips_out_of_range() {
        assert_eq!(float_to_i16(2.0), i16::MAX);
        assert_eq!(float_to_i16(-2.0), i16::MIN);
        assert_eq!(float_to_i16(0.0), 0);
    }
}
