use std::path::PathBuf;
use std::time::Duration;

use super::format::CAPTURE_FORMAT;

/// Configuration for a recorder.
///
/// The capture format itself is fixed (`CAPTURE_FORMAT`); only the plumbing
/// around it is tunable.
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderConfig {
    /// Where in-progress audio is streamed (default: `temp_recording.wav`).
    pub temp_path: PathBuf,

    /// Bytes requested per line read (default: 1024). Must hold whole frames.
    pub buffer_size: usize,

    /// Number of amplitudes kept for display (default: 50).
    pub window_len: usize,

    /// Upper bound on how long `stop` waits for the worker (default: 2s).
    pub join_timeout: Duration,

    /// Capacity of the worker → UI amplitude queue (default: 64).
    pub amplitude_capacity: usize,

    /// Name suggested when saving (default: `recording.wav`).
    pub default_file_name: String,
}

impl RecorderConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.buffer_size == 0 {
            return Err("buffer size must be positive".into());
        }
        if self.buffer_size % CAPTURE_FORMAT.frame_size() != 0 {
            return Err(format!(
                "buffer size {} is not a multiple of the {}-byte frame",
                self.buffer_size,
                CAPTURE_FORMAT.frame_size()
            ));
        }
        if self.window_len == 0 {
            return Err("amplitude window must hold at least one value".into());
        }
        if self.amplitude_capacity == 0 {
            return Err("amplitude queue capacity must be positive".into());
        }
        if self.join_timeout.is_zero() {
            return Err("join timeout must be positive".into());
        }
        if self.temp_path.as_os_str().is_empty() {
            return Err("temp path is empty".into());
        }
        Ok(())
    }

    /// Same defaults, streaming into `temp_path` instead.
    pub fn with_temp_path(temp_path: impl Into<PathBuf>) -> Self {
        Self {
            temp_path: temp_path.into(),
            ..Default::default()
        }
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            temp_path: PathBuf::from("temp_recording.wav"),
            buffer_size: 1024,
            window_len: 50,
            join_timeout: Duration::from_secs(2),
            amplitude_capacity: 64,
            default_file_name: "recording.wav".into(),
        }
    }
}
