//! Report sinks

pub mod console;
pub mod json_file;

pub use console::{colors_enabled, stderr_colors_enabled, ConsoleSink};
pub use json_file::{report_file_name, JsonFileSink, JsonStdoutSink};
