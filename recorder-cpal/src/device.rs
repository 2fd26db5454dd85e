//! Input device lookup and stream config negotiation.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, SampleFormat, SampleRate, SupportedStreamConfig, SupportedStreamConfigRange};

use recorder_core::RecorderError;

/// An input device as reported by the default host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDeviceInfo {
    pub name: String,
    pub is_default: bool,
}

/// List the input devices of the default host.
pub fn list_devices() -> Result<Vec<InputDeviceInfo>, RecorderError> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let devices = host
        .input_devices()
        .map_err(|e| RecorderError::DeviceUnavailable(format!("failed to enumerate input devices: {}", e)))?;

    Ok(devices
        .filter_map(|device| device.name().ok())
        .map(|name| InputDeviceInfo {
            is_default: default_name.as_deref() == Some(name.as_str()),
            name,
        })
        .collect())
}

/// Find an input device by name, or the host default when `name` is `None`.
pub(crate) fn find_device(name: Option<&str>) -> Result<Device, RecorderError> {
    let host = cpal::default_host();

    let Some(name) = name else {
        return host
            .default_input_device()
            .ok_or_else(|| RecorderError::DeviceUnavailable("no default input device".into()));
    };

    host.input_devices()
        .map_err(|e| RecorderError::DeviceUnavailable(format!("failed to enumerate input devices: {}", e)))?
        .find(|device| device.name().map(|n| n == name).unwrap_or(false))
        .ok_or_else(|| RecorderError::DeviceUnavailable(format!("input device '{}' not found", name)))
}

pub(crate) fn is_supported_format(format: SampleFormat) -> bool {
    matches!(format, SampleFormat::I16 | SampleFormat::U16 | SampleFormat::F32)
}

/// Pick a config that runs natively at `rate`, preferring mono.
pub(crate) fn pick_native_config(
    ranges: impl IntoIterator<Item = SupportedStreamConfigRange>,
    rate: u32,
) -> Option<SupportedStreamConfig> {
    ranges
        .into_iter()
        .filter(|range| is_supported_format(range.sample_format()))
        .filter(|range| range.min_sample_rate().0 <= rate && rate <= range.max_sample_rate().0)
        .min_by_key(|range| (range.channels() != 1, range.channels()))
        .map(|range| range.with_sample_rate(SampleRate(rate)))
}

/// Choose the stream config for `device`.
///
/// Uses a native `rate` config when one exists; otherwise the device
/// default, which the line resamples.
pub(crate) fn choose_config(device: &Device, rate: u32) -> Result<SupportedStreamConfig, RecorderError> {
    if let Ok(ranges) = device.supported_input_configs() {
        if let Some(config) = pick_native_config(ranges, rate) {
            return Ok(config);
        }
    }

    let fallback = device
        .default_input_config()
        .map_err(|e| RecorderError::DeviceUnavailable(format!("no supported input config: {}", e)))?;

    if !is_supported_format(fallback.sample_format()) {
        return Err(RecorderError::DeviceUnavailable(format!(
            "unsupported sample format {:?}",
            fallback.sample_format()
        )));
    }

    log::debug!(
        "No native {} Hz input config, resampling from {} Hz",
        rate,
        fallback.sample_rate().0
    );
    Ok(fallback)
}
