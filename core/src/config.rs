use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, SplatError};

/// Run configuration passed to the orchestrator at construction.
///
/// Every field has a default, so a config file only needs the keys it
/// wants to change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplatConfig {
    /// Log level used when `RUST_LOG` is not set
    pub log_level: LogLevel,

    /// Where images come from
    pub source: SourceConfig,

    /// Where layer blobs are held between scanning and applying
    pub staging: StagingMode,

    /// Fail when the save archive has no manifest entry.
    ///
    /// When false, a missing manifest is treated as an image with zero layers.
    pub require_manifest: bool,
}

impl Default for SplatConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            source: SourceConfig::default(),
            staging: StagingMode::Memory,
            require_manifest: true,
        }
    }
}

impl SplatConfig {
    /// Load a configuration from a YAML (or JSON) file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SplatError::ConfigError(format!(
                "Failed to read config at {}: {}",
                path.display(),
                e
            ))
        })?;

        serde_yaml::from_str(&content).map_err(|e| {
            SplatError::ConfigError(format!(
                "Failed to parse config at {}: {}",
                path.display(),
                e
            ))
        })
    }
}

/// Image source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Source implementation
    pub kind: SourceKind,

    /// Container engine binary (docker, podman, ...)
    pub engine: String,

    /// Arguments placed before every engine subcommand (e.g. `--context remote`)
    pub engine_args: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Engine,
            engine: "docker".to_string(),
            engine_args: Vec::new(),
        }
    }
}

/// Image source implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A docker-compatible engine CLI (`save` / `pull`)
    Engine,
    /// A save archive already on disk; the reference is its path
    Archive,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Engine => write!(f, "engine"),
            Self::Archive => write!(f, "archive"),
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "engine" => Ok(Self::Engine),
            "archive" => Ok(Self::Archive),
            _ => Err(format!(
                "unknown image source: '{}' (supported: engine, archive)",
                s
            )),
        }
    }
}

/// Layer blob staging strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StagingMode {
    /// Keep every layer blob in memory
    Memory,
    /// Spill layer blobs to a private temporary directory
    Disk,
}

impl std::fmt::Display for StagingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Disk => write!(f, "disk"),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_directive())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!(
                "unknown log level: '{}' (supported: trace, debug, info, warn, error)",
                s
            )),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}
