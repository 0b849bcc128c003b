// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `denoise`, and all
// their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, enums, ...)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};

use crate::application::train_use_case::{
    DeviceKind, TrainConfig, BATCH_SIZE, DATA_DIR, EPOCHS, LEARNING_RATE, LOG_INTERVAL,
    LOSSES_DIR, MODELS_DIR, SEED,
};
use crate::ml::model::UNetConfig;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the denoising U-Net on paired clean/noisy images
    Train(TrainArgs),

    /// Denoise one image with a trained checkpoint
    Denoise(DenoiseArgs),
}

/// Compute device, as spelled on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceArg {
    Cpu,
    Wgpu,
}

impl From<DeviceArg> for DeviceKind {
    fn from(d: DeviceArg) -> Self {
        match d {
            DeviceArg::Cpu  => DeviceKind::Cpu,
            DeviceArg::Wgpu => DeviceKind::Wgpu,
        }
    }
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// JSON run configuration; when given, every other flag is ignored
    #[arg(long)]
    pub config: Option<String>,

    /// Directory holding train/{clean,noisy} and val/{clean,noisy}
    #[arg(long, default_value = DATA_DIR)]
    pub data_dir: String,

    /// Where model<NN>.mpk checkpoints are written
    #[arg(long, default_value = MODELS_DIR)]
    pub models_dir: String,

    /// Where losses_<NN>.png plots and metrics.csv are written
    #[arg(long, default_value = LOSSES_DIR)]
    pub losses_dir: String,

    #[arg(long, default_value_t = BATCH_SIZE)]
    pub batch_size: usize,

    /// Number of epochs to run on top of the starting state
    #[arg(long, default_value_t = EPOCHS)]
    pub epochs: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = LEARNING_RATE)]
    pub lr: f64,

    /// Print a progress line every N batches
    #[arg(long, default_value_t = LOG_INTERVAL)]
    pub log_interval: usize,

    /// Seed of the training-set shuffle
    #[arg(long, default_value_t = SEED)]
    pub seed: u64,

    /// Continue from a checkpoint instead of starting from scratch
    #[arg(long)]
    pub resume: bool,

    /// Checkpoint to resume from (default: newest in --models-dir)
    #[arg(long, requires = "resume")]
    pub checkpoint: Option<String>,

    /// 1 for grayscale, 3 for RGB
    #[arg(long, default_value_t = 1)]
    pub in_channels: usize,

    /// Output channels; must equal --in-channels
    #[arg(long, default_value_t = 1)]
    pub n_classes: usize,

    /// Number of down-path conv blocks
    #[arg(long, default_value_t = 3)]
    pub depth: usize,

    /// First block has 2^wf filters
    #[arg(long, default_value_t = 6)]
    pub wf: usize,

    /// Use unpadded 3x3 convolutions (output shrinks)
    #[arg(long)]
    pub no_padding: bool,

    #[arg(long)]
    pub batch_norm: bool,

    /// Resize every image to this height (requires --image-width)
    #[arg(long, requires = "image_width")]
    pub image_height: Option<u32>,

    /// Resize every image to this width (requires --image-height)
    #[arg(long, requires = "image_height")]
    pub image_width: Option<u32>,

    #[arg(long, value_enum, default_value_t = DeviceArg::Cpu)]
    pub device: DeviceArg,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// This is the boundary between Layer 1 and Layer 2:
/// the application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_dir:     a.data_dir,
            models_dir:   a.models_dir,
            losses_dir:   a.losses_dir,
            batch_size:   a.batch_size,
            epochs:       a.epochs,
            lr:           a.lr,
            log_interval: a.log_interval,
            seed:         a.seed,
            resume:       a.resume,
            checkpoint:   a.checkpoint,
            image_height: a.image_height,
            image_width:  a.image_width,
            device:       a.device.into(),
            model: UNetConfig::new()
                .with_in_channels(a.in_channels)
                .with_n_classes(a.n_classes)
                .with_depth(a.depth)
                .with_wf(a.wf)
                .with_padding(!a.no_padding)
                .with_batch_norm(a.batch_norm),
        }
    }
}

/// All arguments for the `denoise` command
#[derive(Args, Debug)]
pub struct DenoiseArgs {
    /// Checkpoint written by `train` (e.g. models/model01.mpk)
    #[arg(long)]
    pub checkpoint: String,

    /// Noisy input image
    #[arg(long)]
    pub input: String,

    /// Where to write the reconstruction; format follows the extension
    #[arg(long)]
    pub output: String,

    #[arg(long, value_enum, default_value_t = DeviceArg::Cpu)]
    pub device: DeviceArg,
}
