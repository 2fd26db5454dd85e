use super::error::RecorderError;
use super::recording_result::RecordingResult;

/// Recorder state machine.
///
/// State transitions:
/// ```text
/// idle → recording → stopping → completed → idle
///           ↓
///         failed → idle
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RecorderState {
    Idle,
    Recording { duration_secs: f64 },
    Stopping,
    Completed(Box<RecordingResult>),
    Failed(RecorderError),
}

impl RecorderState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording { .. })
    }

    /// Returns the captured duration if the state tracks one.
    pub fn duration(&self) -> Option<f64> {
        match self {
            Self::Recording { duration_secs } => Some(*duration_secs),
            Self::Completed(result) => Some(result.duration_secs),
            _ => None,
        }
    }

    /// Short lowercase name, for logs and status lines.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording { .. } => "recording",
            Self::Stopping => "stopping",
            Self::Completed(_) => "completed",
            Self::Failed(_) => "failed",
        }
    }
}
