use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::format::AudioFormat;

/// Result returned when a capture session stops cleanly.
///
/// The audio still lives at `temp_path`; it belongs to the caller until it
/// is relocated or discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingResult {
    pub id: String,
    pub temp_path: PathBuf,
    pub format: AudioFormat,
    /// PCM bytes after the WAV header.
    pub data_bytes: u64,
    pub buffers_read: u64,
    pub duration_secs: f64,
    pub checksum: String,
    pub created_at: String,
}

impl RecordingResult {
    pub fn new(temp_path: PathBuf, format: AudioFormat, data_bytes: u64, buffers_read: u64, checksum: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            temp_path,
            format,
            data_bytes,
            buffers_read,
            duration_secs: format.duration_of(data_bytes),
            checksum,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
