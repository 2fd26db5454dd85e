//! # recorder-core
//!
//! Platform-agnostic core of a single-track microphone recorder.
//!
//! Provides the capture loop, amplitude metering, WAV temp-file streaming,
//! and relocation of finished recordings. Capture backends (cpal, test
//! doubles) implement the `LineProvider` trait and plug into the generic
//! `CaptureSession`; front ends drive a `RecorderController`.
//!
//! ## Architecture
//!
//! ```text
//! recorder-core (this crate)
//! ├── traits/       ← LineProvider, InputLine, RecorderDelegate, AmplitudeCallback
//! ├── models/       ← RecorderError, RecorderState, RecorderConfig, AudioFormat, OutputFormat
//! ├── processing/   ← peak amplitude, AmplitudeWindow, MonoConverter, WAV header
//! ├── session/      ← CaptureSession (capture loop), RecorderController (UI state)
//! └── storage/      ← WavFileWriter, relocation
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::config::RecorderConfig;
pub use models::error::RecorderError;
pub use models::format::{AudioFormat, OutputFormat, CAPTURE_FORMAT};
pub use models::recording_result::RecordingResult;
pub use models::state::RecorderState;
pub use processing::amplitude::{peak_amplitude, peak_amplitude_samples};
pub use processing::amplitude_window::AmplitudeWindow;
pub use processing::mono_converter::MonoConverter;
pub use session::capture::CaptureSession;
pub use session::controller::{ControllerEvent, RecorderController, Toggle};
pub use storage::relocate::{Relocation, RelocationMethod};
pub use storage::wav_writer::WavFileWriter;
pub use traits::input_line::{AmplitudeCallback, InputLine, LineProvider};
pub use traits::recorder_delegate::RecorderDelegate;
