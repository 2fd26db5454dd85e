//! # recorder-cpal
//!
//! Cross-platform microphone backend for recorder-core, built on cpal.
//!
//! Provides:
//! - `CpalLineProvider`: opens input lines on the default or a named device
//! - `CpalInputLine`: a running input stream converted to 44.1 kHz mono PCM
//! - `list_devices`: input device enumeration on the default host
//!
//! ## Usage
//! ```ignore
//! use recorder_core::RecorderController;
//! use recorder_cpal::CpalLineProvider;
//!
//! let mut controller = RecorderController::new(CpalLineProvider::default_device());
//! controller.toggle()?;
//! ```

pub mod device;
pub mod line;
mod queue;

pub use device::{list_devices, InputDeviceInfo};
pub use line::{CpalInputLine, CpalLineProvider};
