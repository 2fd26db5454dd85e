use std::fs::{self, File};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::error::RecorderError;
use crate::models::format::AudioFormat;
use crate::processing::wav_format;

/// Streaming WAV file writer for the temp recording.
///
/// PCM is appended as soon as it is read, so the file on disk always holds
/// everything captured so far. The header carries zero sizes until `close`
/// patches them in.
///
/// ## File Format
/// ```text
/// [44-byte WAV header]
/// [raw 16-bit PCM data...]
/// ```
pub struct WavFileWriter {
    file_path: PathBuf,
    format: AudioFormat,
    file: Option<File>,
    data_bytes: u64,
}

impl WavFileWriter {
    pub fn new(file_path: PathBuf, format: AudioFormat) -> Self {
        Self {
            file_path,
            format,
            file: None,
            data_bytes: 0,
        }
    }

    /// Create (or truncate) the file and write a placeholder header.
    pub fn open(&mut self) -> Result<(), RecorderError> {
        if self.file.is_some() {
            return Ok(());
        }

        if let Some(parent) = self.file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| RecorderError::IoFailure(format!("failed to create directory: {}", e)))?;
        }

        let mut file = File::create(&self.file_path)
            .map_err(|e| RecorderError::IoFailure(format!("failed to create temp file: {}", e)))?;

        let header = wav_format::generate_wav_header(&self.format, 0);
        file.write_all(&header)
            .map_err(|e| RecorderError::IoFailure(format!("failed to write header: {}", e)))?;

        self.file = Some(file);
        self.data_bytes = 0;
        Ok(())
    }

    /// Append raw PCM.
    pub fn write(&mut self, data: &[u8]) -> Result<(), RecorderError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| RecorderError::IoFailure("temp file is not open".into()))?;
        file.write_all(data)
            .map_err(|e| RecorderError::IoFailure(format!("write failed: {}", e)))?;
        self.data_bytes += data.len() as u64;
        Ok(())
    }

    /// Finalize the file: patch header sizes, sync, compute SHA-256 checksum.
    pub fn close(&mut self) -> Result<String, RecorderError> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| RecorderError::IoFailure("temp file is not open".into()))?;

        let data_size = u32::try_from(self.data_bytes).unwrap_or_else(|_| {
            log::warn!("recording exceeds WAV size limit, header truncated to 4 GiB");
            u32::MAX - wav_format::WAV_HEADER_SIZE as u32
        });
        let header = wav_format::generate_wav_header(&self.format, data_size);

        file.seek(SeekFrom::Start(0))
            .map_err(|e| RecorderError::IoFailure(e.to_string()))?;
        file.write_all(&header)
            .map_err(|e| RecorderError::IoFailure(e.to_string()))?;
        file.sync_all()
            .map_err(|e| RecorderError::IoFailure(e.to_string()))?;
        drop(file);

        sha256_file(&self.file_path)
    }

    /// PCM bytes written so far (excluding the header).
    pub fn data_bytes(&self) -> u64 {
        self.data_bytes
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

/// Compute SHA-256 hex digest of a file.
fn sha256_file(path: &Path) -> Result<String, RecorderError> {
    let data = fs::read(path)
        .map_err(|e| RecorderError::IoFailure(format!("failed to read file for checksum: {}", e)))?;
    let digest = Sha256::digest(&data);
    Ok(hex_encode(&digest))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
