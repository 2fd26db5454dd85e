pub mod amplitude;
pub mod amplitude_window;
pub mod mono_converter;
pub mod wav_format;
