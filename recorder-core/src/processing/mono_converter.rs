/// Converts device buffers into the recorder's capture format.
///
/// Backends rarely deliver exactly 44.1 kHz mono i16, so every buffer goes
/// through downmix → resample → 16-bit PCM before it reaches the line.
/// All operations work on `&[f32]` with no platform dependencies.
///
/// The resampler is streaming: the read position and the last input sample
/// carry over from one buffer to the next, so a stream fed in chunks comes
/// out the same as if it had been converted in one piece.
#[derive(Debug, Clone)]
pub struct MonoConverter {
    pub target_sample_rate: f64,
    /// Read position for the next output sample, relative to `previous`.
    position: f64,
    previous: Option<f32>,
}

impl MonoConverter {
    pub fn new(target_sample_rate: f64) -> Self {
        Self {
            target_sample_rate,
            position: 0.0,
            previous: None,
        }
    }

    /// Downmix, resample and encode one interleaved buffer as i16 LE bytes.
    pub fn to_pcm16(&mut self, samples: &[f32], source_sample_rate: f64, channels: u16) -> Vec<u8> {
        let mono = downmix_to_mono(samples, channels as usize);
        let resampled = self.resample(&mono, source_sample_rate);
        convert_to_int16_pcm(&resampled)
    }

    /// Linear interpolation resampling for mono audio, continuing from the
    /// previous call.
    ///
    /// Returns input unchanged if rates match.
    pub fn resample(&mut self, samples: &[f32], source_sample_rate: f64) -> Vec<f32> {
        if (source_sample_rate - self.target_sample_rate).abs() < 0.01 || samples.is_empty() {
            return samples.to_vec();
        }

        // Input seen as the previous buffer's last sample followed by `samples`.
        let history = usize::from(self.previous.is_some());
        let len = samples.len() + history;
        let at = |i: usize| match (i, self.previous) {
            (0, Some(previous)) => previous,
            _ => samples[i - history],
        };

        let step = source_sample_rate / self.target_sample_rate;
        let mut output = Vec::with_capacity((samples.len() as f64 / step) as usize + 1);
        let mut position = self.position;
        loop {
            let index = position as usize;
            if index + 1 >= len {
                break;
            }
            let fraction = (position - index as f64) as f32;
            output.push(at(index) * (1.0 - fraction) + at(index + 1) * fraction);
            position += step;
        }

        // The last sample becomes index 0 of the next call.
        self.position = position - (len - 1) as f64;
        self.previous = samples.last().copied();
        output
    }
}

/// Downmix interleaved multi-channel audio to mono by averaging channels per frame.
pub fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let scale = 1.0 / channels as f32;
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * scale)
        .collect()
}

/// Convert f32 samples `[-1.0, 1.0]` to 16-bit PCM (little-endian bytes).
///
/// Clamps out-of-range values. Output length = `samples.len() * 2` bytes.
pub fn convert_to_int16_pcm(samples: &[f32]) -> Vec<u8> {
    let mut data = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        let int16_value = (clamped * i16::MAX as f32) as i16;
        data.extend_from_slice(&int16_value.to_le_bytes());
    }
    data
}
