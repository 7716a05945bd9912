//! Vigilctl library - platform adapters, sinks and commands
//!
//! Exposed as a library so integration tests can drive commands directly.

pub mod cli;
pub mod commands;
pub mod errors;
pub mod host;
pub mod logging;
pub mod sinks;
pub mod sources;
