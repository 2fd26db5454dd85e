use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while recording or saving audio.
///
/// Every variant is recoverable: after any of them the recorder can be
/// started again.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecorderError {
    /// No capturable input line, or the OS denied access to it.
    #[error("input device unavailable: {0}")]
    DeviceUnavailable(String),

    /// `stop` was called with no active capture session.
    #[error("not recording")]
    NotRecording,

    /// `start` was called while a capture session is active.
    #[error("already recording")]
    AlreadyRecording,

    /// Temp file write or relocation failure.
    #[error("i/o failure: {0}")]
    IoFailure(String),

    /// The capture worker did not exit within the join timeout.
    #[error("capture worker did not stop within {0:?}")]
    Timeout(Duration),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),
}
