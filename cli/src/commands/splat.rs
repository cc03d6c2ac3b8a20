//! `splat <IMAGE> <DESTINATION>`: materialize an image's filesystem.

use std::path::PathBuf;

use clap::Args;
use splat_core::SplatConfig;
use splat_runtime::Orchestrator;

use crate::output;

#[derive(Args, Debug)]
pub struct SplatArgs {
    /// Image reference (or save archive path with --source archive)
    pub image: String,

    /// Directory to write the image filesystem into
    pub destination: PathBuf,
}

pub fn execute(args: SplatArgs, config: SplatConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::debug!(
        image = %args.image,
        destination = %args.destination.display(),
        source = %config.source.kind,
        staging = %config.staging,
        "Starting"
    );

    let mut orchestrator = Orchestrator::from_config(config);
    let summary = orchestrator.run(&args.image, &args.destination)?;

    println!("{}", output::format_summary(&summary));
    Ok(())
}
