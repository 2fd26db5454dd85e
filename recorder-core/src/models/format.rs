use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// PCM layout of captured audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channels: u16,
    pub signed: bool,
    pub big_endian: bool,
}

/// The one format the recorder captures in: 44.1 kHz, 16-bit signed, mono, little-endian.
pub const CAPTURE_FORMAT: AudioFormat = AudioFormat {
    sample_rate: 44_100,
    bits_per_sample: 16,
    channels: 1,
    signed: true,
    big_endian: false,
};

impl AudioFormat {
    /// Bytes per frame (one sample for every channel).
    pub fn frame_size(&self) -> usize {
        self.channels as usize * self.bits_per_sample as usize / 8
    }

    /// Bytes per second of audio.
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.frame_size() as u32
    }

    /// Playback duration of `bytes` of PCM in this format.
    pub fn duration_of(&self, bytes: u64) -> f64 {
        let rate = self.byte_rate();
        if rate == 0 {
            return 0.0;
        }
        bytes as f64 / rate as f64
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        CAPTURE_FORMAT
    }
}

/// Container the user can save a recording as.
///
/// Only WAV is produced natively. Picking MP3 renames the file; no encoder
/// is involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Wav,
    Mp3,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
        }
    }

    /// Whether the bytes on disk actually match this container.
    pub fn is_native(&self) -> bool {
        matches!(self, Self::Wav)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "wav" | "wave" => Ok(Self::Wav),
            "mp3" => Ok(Self::Mp3),
            other => Err(format!("unsupported output format: {other}")),
        }
    }
}
