pub mod relocate;
pub mod wav_writer;
