//! PCM wire codec.
//!
//! The service speaks raw 16-bit little-endian PCM wrapped in a base64
//! envelope tagged with its mime type. Outbound chunks carry 16kHz mono
//! capture audio; inbound chunks are decoded at whatever rate the caller
//! declares (24kHz mono for response audio).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::audio::{AudioFrame, CAPTURE_SAMPLE_RATE};
use crate::error::{Result, TalkbackError};

/// One encoded audio payload as it crosses the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedChunk {
    /// Base64 of 16-bit little-endian PCM.
    pub data: String,
    /// e.g. "audio/pcm;rate=16000"
    pub mime_type: String,
}

impl EncodedChunk {
    pub fn new(data: String, sample_rate: u32) -> Self {
        Self {
            data,
            mime_type: format!("audio/pcm;rate={}", sample_rate),
        }
    }
}

/// Encode one capture frame: clamp to [-1, 1], scale to i16, serialize LE.
/// The only failure mode is an empty frame.
pub fn encode_frame(samples: &[f32]) -> Result<EncodedChunk> {
    encode_samples(samples, CAPTURE_SAMPLE_RATE)
}

/// Encode samples at an arbitrary declared rate (used by transports
/// synthesizing response audio).
pub fn encode_samples(samples: &[f32], sample_rate: u32) -> Result<EncodedChunk> {
    if samples.is_empty() {
        return Err(TalkbackError::EmptyFrame);
    }

    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * 32767.0).round() as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    Ok(EncodedChunk::new(STANDARD.encode(&bytes), sample_rate))
}

/// Decode a chunk into a playable frame at the declared rate/channel count.
pub fn decode_chunk(chunk: &EncodedChunk, sample_rate: u32, channels: u16) -> Result<AudioFrame> {
    let bytes = STANDARD
        .decode(&chunk.data)
        .map_err(|e| TalkbackError::Codec {
            message: format!("invalid base64 payload: {}", e),
        })?;
    Ok(decode_pcm(&bytes, sample_rate, channels))
}

/// Interpret raw bytes as little-endian i16 samples normalized by 32768.
/// A trailing odd byte is a truncated partial sample and is dropped.
pub fn decode_pcm(bytes: &[u8], sample_rate: u32, channels: u16) -> AudioFrame {
    let samples = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect();

    AudioFrame::new(samples, sample_rate, channels)
}
