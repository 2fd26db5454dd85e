use std::sync::Arc;

use crate::models::error::RecorderError;
use crate::models::format::AudioFormat;

/// Callback invoked with the amplitude of every buffer read, in `[0.0, 1.0]`.
///
/// Fires on the capture worker thread; keep it cheap.
pub type AmplitudeCallback = Arc<dyn Fn(f32) + Send + Sync + 'static>;

/// An open capture line delivering raw PCM in the format it was opened with.
///
/// Shared between the capture worker (which reads) and the session owner
/// (which stops and closes), so every method takes `&self`.
pub trait InputLine: Send + Sync {
    /// Block until `buf` is full or the line is stopped.
    ///
    /// After `stop`, returns whatever is still buffered and then `Ok(0)`.
    /// Always returns whole frames.
    fn read(&self, buf: &mut [u8]) -> Result<usize, RecorderError>;

    /// Stop delivering audio and wake any blocked `read`.
    fn stop(&self);

    /// Release the device. Implies `stop`.
    fn close(&self);

    /// Whether the line is still delivering audio.
    fn is_running(&self) -> bool;
}

/// Source of input lines for one capture device.
///
/// Implemented by:
/// - `CpalLineProvider` (recorder-cpal)
/// - scripted in-memory providers in tests
pub trait LineProvider: Send + Sync {
    /// Whether a capture device is present.
    fn is_available(&self) -> bool;

    /// Open and start a line at `format`.
    ///
    /// Fails with `DeviceUnavailable` if no matching line exists or access
    /// is denied.
    fn open(&self, format: &AudioFormat) -> Result<Arc<dyn InputLine>, RecorderError>;

    /// Human-readable name of the backing device.
    fn device_name(&self) -> String;
}
