pub mod input_line;
pub mod recorder_delegate;
