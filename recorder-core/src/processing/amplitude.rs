//! Amplitude metering for the live waveform.
//!
//! The amplitude of a buffer is its peak absolute sample divided by 32768,
//! computed over decoded 16-bit samples, never over raw bytes.

/// Full-scale magnitude of a signed 16-bit sample.
const FULL_SCALE: f32 = 32768.0;

/// Peak amplitude of little-endian signed 16-bit PCM, in `[0.0, 1.0]`.
///
/// A trailing odd byte (half a sample) is ignored. Empty input yields 0.0.
pub fn peak_amplitude(pcm: &[u8]) -> f32 {
    let peak = pcm
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]).unsigned_abs())
        .max()
        .unwrap_or(0);
    peak as f32 / FULL_SCALE
}

/// Peak amplitude of decoded samples, in `[0.0, 1.0]`.
pub fn peak_amplitude_samples(samples: &[i16]) -> f32 {
    let peak = samples.iter().map(|s| s.unsigned_abs()).max().unwrap_or(0);
    peak as f32 / FULL_SCALE
}
