//! Float to 16-bit PCM conversion

/// Full-scale value used when scaling floats to PCM.
///
/// Symmetric on purpose: `-1.0` maps to `-32767`, never to `i16::MIN`.
pub const PCM16_SCALE: f32 = 32767.0;

/// Quantize a single sample to signed 16-bit PCM.
///
/// The sample is clipped to `[-1.0, 1.0]` before scaling, so out-of-range
/// input saturates instead of wrapping. NaN quantizes to silence.
#[inline]
pub fn pcm16(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    (sample.clamp(-1.0, 1.0) * PCM16_SCALE).round() as i16
}

/// Quantize a block of samples
pub fn quantize(samples: &[f32]) -> Vec<i16> {
    samples.iter().copied().map(pcm16).collect()
}

/// Quantize a block and append it to an existing PCM buffer
pub fn quantize_into(output: &mut Vec<i16>, samples: &[f32]) {
    output.reserve(samples.len());
    output.extend(samples.iter().copied().map(pcm16));
}
