//! Splat CLI library: argument parsing, dispatch and output formatting.

pub mod commands;
pub mod output;
