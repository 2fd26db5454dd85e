use crate::models::error::RecorderError;
use crate::models::recording_result::RecordingResult;
use crate::models::state::RecorderState;

/// Event delegate for capture session notifications.
///
/// Methods may be called from the capture worker thread, not the UI
/// thread. Implementations should marshal to the UI thread if needed.
pub trait RecorderDelegate: Send + Sync {
    /// Called when the session state changes.
    fn on_state_changed(&self, state: &RecorderState);

    /// Called when capture terminates because of an error.
    fn on_error(&self, error: &RecorderError);

    /// Called when capture completes and the temp file is finalized.
    fn on_recording_finished(&self, result: &RecordingResult);
}
