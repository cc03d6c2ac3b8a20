//! CLI definition and dispatch.

mod splat;

pub use splat::SplatArgs;

use std::path::PathBuf;

use clap::Parser;
use splat_core::{LogLevel, SourceKind, SplatConfig, StagingMode};

/// Splat: materialize a container image filesystem into a directory.
#[derive(Parser, Debug)]
#[command(name = "splat", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub args: SplatArgs,

    /// Configuration file (YAML or JSON)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Where images come from (engine, archive)
    #[arg(long, value_name = "KIND")]
    pub source: Option<SourceKind>,

    /// Container engine binary for the engine source
    #[arg(long, value_name = "BIN")]
    pub engine: Option<String>,

    /// Stage layer blobs in a temporary directory instead of memory
    #[arg(long)]
    pub stage_on_disk: bool,

    /// Treat an archive without manifest.json as an image with no layers
    #[arg(long)]
    pub allow_missing_manifest: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Shorthand for --log-level debug
    #[arg(short, long)]
    pub debug: bool,
}

impl Cli {
    /// Load the config file (if any) and apply command-line overrides.
    pub fn resolve_config(&self) -> splat_core::Result<SplatConfig> {
        let mut config = match &self.config {
            Some(path) => SplatConfig::from_file(path)?,
            None => SplatConfig::default(),
        };

        if let Some(kind) = self.source {
            config.source.kind = kind;
        }
        if let Some(engine) = &self.engine {
            config.source.engine = engine.clone();
        }
        if self.stage_on_disk {
            config.staging = StagingMode::Disk;
        }
        if self.allow_missing_manifest {
            config.require_manifest = false;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if self.debug {
            config.log_level = LogLevel::Debug;
        }

        Ok(config)
    }
}

/// Run the requested operation with an already resolved configuration.
pub fn dispatch(cli: Cli, config: SplatConfig) -> Result<(), Box<dyn std::error::Error>> {
    splat::execute(cli.args, config)
}
