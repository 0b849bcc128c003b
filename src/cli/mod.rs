// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`   - trains (or resumes training of) the U-Net
//   2. `denoise` - loads a checkpoint and cleans one image
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, DenoiseArgs, TrainArgs};
use std::path::Path;

use crate::application::train_use_case::TrainConfig;

#[derive(Parser, Debug)]
#[command(
    name = "unet-denoise",
    version,
    about = "Train a U-Net denoising autoencoder on clean/noisy image pairs, then denoise images."
)]
pub struct Cli {
    /// The subcommand to run (train or denoise)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Denoise(args) => run_denoise(args),
        }
    }
}

/// Handles the `train` subcommand.
fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let config = match &args.config {
        Some(path) => {
            tracing::info!("Reading run configuration from '{}'", path);
            TrainConfig::from_json_file(path)?
        }
        None => args.into(),
    };
    tracing::info!("Starting training on images in: {}", config.data_dir);

    TrainUseCase::new(config).execute()?;

    println!("\nTraining complete.");
    Ok(())
}

/// Handles the `denoise` subcommand.
fn run_denoise(args: DenoiseArgs) -> Result<()> {
    use crate::application::denoise_use_case::DenoiseUseCase;

    let dims = DenoiseUseCase::new(&args.checkpoint, args.device.into())
        .execute(Path::new(&args.input), Path::new(&args.output))?;

    println!("Wrote {} ({})", args.output, dims);
    Ok(())
}
