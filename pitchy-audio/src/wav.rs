//! Canonical RIFF/WAVE encoding for mono 16-bit PCM

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::{AudioError, Result};

/// Size of the canonical PCM header in bytes
pub const WAV_HEADER_LEN: usize = 44;

/// Prefix of the data URLs produced by [`WavContainer::to_data_url`]
pub const WAV_DATA_URL_PREFIX: &str = "data:audio/wav;base64,";

const NUM_CHANNELS: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;
const BLOCK_ALIGN: u16 = NUM_CHANNELS * BITS_PER_SAMPLE / 8;

/// Largest payload whose RIFF chunk size (`36 + data_len`) still fits in a u32
pub const MAX_DATA_LEN: u32 = u32::MAX - 36;

/// Payload length in bytes for `sample_count` samples
///
/// Fails when the payload would not fit the RIFF size fields.
pub fn data_len_for(sample_count: usize) -> Result<u32> {
    sample_count
        .checked_mul(BLOCK_ALIGN as usize)
        .and_then(|len| u32::try_from(len).ok())
        .filter(|len| *len <= MAX_DATA_LEN)
        .ok_or_else(|| {
            AudioError::encode(format!(
                "{} samples exceed the {} byte WAV payload limit",
                sample_count, MAX_DATA_LEN
            ))
        })
}

/// An encoded WAV file: 44-byte header followed by little-endian PCM
///
/// Immutable once built; use [`WavContainer::encode`] to construct one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavContainer {
    bytes: Vec<u8>,
    sample_rate: u32,
}

impl WavContainer {
    /// Encode mono 16-bit samples at `sample_rate`
    pub fn encode(samples: &[i16], sample_rate: u32) -> Result<Self> {
        let data_len = data_len_for(samples.len())?;
        let byte_rate = sample_rate
            .checked_mul(BLOCK_ALIGN as u32)
            .ok_or_else(|| AudioError::encode(format!("sample rate {} too high", sample_rate)))?;

        let mut bytes = Vec::with_capacity(WAV_HEADER_LEN + data_len as usize);

        // RIFF header
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVE");

        // fmt subchunk
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes()); // Subchunk1Size (16 for PCM)
        bytes.extend_from_slice(&1u16.to_le_bytes()); // AudioFormat (1 = PCM)
        bytes.extend_from_slice(&NUM_CHANNELS.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&byte_rate.to_le_bytes());
        bytes.extend_from_slice(&BLOCK_ALIGN.to_le_bytes());
        bytes.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

        // data subchunk
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());

        for sample in samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }

        Ok(Self { bytes, sample_rate })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of PCM payload bytes after the header
    pub fn data_len(&self) -> usize {
        self.bytes.len() - WAV_HEADER_LEN
    }

    /// Number of samples in the payload
    pub fn sample_count(&self) -> usize {
        self.data_len() / BLOCK_ALIGN as usize
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Render as `data:audio/wav;base64,<...>`
    pub fn to_data_url(&self) -> String {
        let mut url = String::with_capacity(WAV_DATA_URL_PREFIX.len() + self.bytes.len() * 4 / 3 + 4);
        url.push_str(WAV_DATA_URL_PREFIX);
        BASE64.encode_string(&self.bytes, &mut url);
        url
    }
}
