//! Splat Core - shared types for image filesystem materialization.
//!
//! Holds the error taxonomy and the run configuration used by the
//! runtime and the CLI.

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{LogLevel, SourceConfig, SourceKind, SplatConfig, StagingMode};
pub use error::{Result, SplatError};

/// Splat version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
