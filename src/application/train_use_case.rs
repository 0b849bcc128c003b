// ============================================================
// Layer 2 - TrainUseCase
// ============================================================
// Orchestrates a training run in order:
//
//   Step 1: Validate the configuration
//   Step 2: Open the train and val splits       (Layer 4 - data)
//   Step 3: Build a fresh model or resume one   (Layer 5 / 6)
//   Step 4: Prepare checkpoint / plot / metrics (Layer 6 - infra)
//   Step 5: Run the training loop               (Layer 5 - ml)
//
// Resuming:
//   resume = true loads `checkpoint` if one is named, otherwise the
//   newest model<NN>.mpk in models_dir. The stored architecture must
//   equal the configured one; the loss history and epoch counter
//   continue from the checkpoint.
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu},
    data::dataset::Dataset,
    module::Module,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::data::dataset::{DecodeOptions, PairedImageDataset};
use crate::domain::error::DenoiseError;
use crate::infra::{
    checkpoint::CheckpointStore,
    metrics::MetricsLogger,
    plot::LossPlotter,
};
use crate::ml::{
    model::UNetConfig,
    trainer::{batch_count, run_training, EpochSinks, TrainOutcome, TrainState},
};

pub type CpuBackend  = Autodiff<NdArray>;
pub type WgpuBackend = Autodiff<Wgpu>;

// ─── Defaults ────────────────────────────────────────────────────────────────
pub const DATA_DIR:      &str  = "data";
pub const MODELS_DIR:    &str  = "models";
pub const LOSSES_DIR:    &str  = "losses";
pub const BATCH_SIZE:    usize = 8;
pub const LEARNING_RATE: f64   = 3e-5;
pub const EPOCHS:        usize = 1;
pub const LOG_INTERVAL:  usize = 25;
pub const SEED:          u64   = 42;

const TRAIN_SPLIT: &str = "train";
const VAL_SPLIT:   &str = "val";

/// Compute device a run is placed on, chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// NdArray backend
    #[default]
    Cpu,
    /// WGPU backend (Vulkan / Metal / DX12)
    Wgpu,
}

// ─── Training Configuration ──────────────────────────────────────────────────
// Every parameter of a training run. Serialisable so a run can be
// described in a JSON file (`train --config run.json`); missing
// top-level keys fall back to the defaults above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub data_dir:     String,
    pub models_dir:   String,
    pub losses_dir:   String,
    pub batch_size:   usize,
    pub epochs:       usize,
    pub lr:           f64,
    pub log_interval: usize,
    pub seed:         u64,
    pub resume:       bool,
    /// Checkpoint to resume from; the newest in models_dir when None
    pub checkpoint:   Option<String>,
    pub image_height: Option<u32>,
    pub image_width:  Option<u32>,
    pub device:       DeviceKind,
    pub model:        UNetConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:     DATA_DIR.to_string(),
            models_dir:   MODELS_DIR.to_string(),
            losses_dir:   LOSSES_DIR.to_string(),
            batch_size:   BATCH_SIZE,
            epochs:       EPOCHS,
            lr:           LEARNING_RATE,
            log_interval: LOG_INTERVAL,
            seed:         SEED,
            resume:       false,
            checkpoint:   None,
            image_height: None,
            image_width:  None,
            device:       DeviceKind::default(),
            model:        UNetConfig::new(),
        }
    }
}

impl TrainConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file '{}'", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Cannot parse config file '{}'", path.display()))
    }

    /// Check every precondition a run relies on.
    pub fn validate(&self) -> Result<(), DenoiseError> {
        let invalid = |msg: String| Err(DenoiseError::InvalidConfig(msg));
        let m = &self.model;

        if self.batch_size == 0 {
            return invalid("batch_size must be greater than 0".into());
        }
        if self.log_interval == 0 {
            return invalid("log_interval must be greater than 0".into());
        }
        if m.depth == 0 {
            return invalid("depth must be at least 1".into());
        }
        if !matches!(m.in_channels, 1 | 3) {
            return invalid(format!("in_channels must be 1 or 3, got {}", m.in_channels));
        }
        // The clean target is compared channel for channel
        if m.n_classes != m.in_channels {
            return invalid(format!(
                "n_classes ({}) must equal in_channels ({})",
                m.n_classes, m.in_channels
            ));
        }
        if self.image_height.is_some() != self.image_width.is_some() {
            return invalid("image_height and image_width must be given together".into());
        }
        if matches!((self.image_height, self.image_width), (Some(0), _) | (_, Some(0))) {
            return invalid("image_height and image_width must be greater than 0".into());
        }
        if self.checkpoint.is_some() && !self.resume {
            return invalid("a checkpoint can only be given together with resume".into());
        }
        Ok(())
    }

    fn decode_options(&self) -> DecodeOptions {
        let options = DecodeOptions::new(self.model.in_channels);
        match (self.image_height, self.image_width) {
            (Some(h), Some(w)) => options.with_resize(h, w),
            _ => options,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the run on the configured device
    pub fn execute(&self) -> Result<()> {
        match self.config.device {
            DeviceKind::Cpu => {
                let device = NdArrayDevice::default();
                tracing::info!("Using NdArray device: {:?}", device);
                self.execute_on::<CpuBackend>(device)?;
            }
            DeviceKind::Wgpu => {
                let device = WgpuDevice::default();
                tracing::info!("Using WGPU device: {:?}", device);
                self.execute_on::<WgpuBackend>(device)?;
            }
        }
        Ok(())
    }

    /// Execute the full pipeline on a given backend
    pub fn execute_on<B: AutodiffBackend>(&self, device: B::Device) -> Result<TrainOutcome> {
        let cfg = &self.config;

        // ── Step 1: Validate ──────────────────────────────────────────────────
        cfg.validate()?;

        // ── Step 2: Open both splits ──────────────────────────────────────────
        let data_dir = PathBuf::from(&cfg.data_dir);
        let options  = cfg.decode_options();
        let train_dataset = open_split(&data_dir.join(TRAIN_SPLIT), options)?;
        let val_dataset   = open_split(&data_dir.join(VAL_SPLIT), options)?;

        // Both splits must survive every conv and pool of the U-Net
        for dataset in [&train_dataset, &val_dataset] {
            let (height, width) = cfg.model.check_input(dataset.dims())?;
            tracing::info!("{} → output {}x{}", dataset.dims(), height, width);
        }

        println!("\nlen(train_dataset) : {}", train_dataset.len());
        println!("len(val_dataset)   : {}", val_dataset.len());
        println!(
            "\nlen(train_loader): {}  @bs={}",
            batch_count(train_dataset.len(), cfg.batch_size),
            cfg.batch_size
        );
        println!(
            "len(val_loader)  : {}  @bs={}",
            batch_count(val_dataset.len(), cfg.batch_size),
            cfg.batch_size
        );

        // ── Step 3: Fresh model or resumed state ──────────────────────────────
        let checkpoints = CheckpointStore::new(&cfg.models_dir);
        let state = if cfg.resume {
            self.resume_state::<B>(&checkpoints, &device)?
        } else {
            println!("\nfrom scratch");
            TrainState::fresh(cfg.model.init::<B>(&device))
        };

        println!("\nmodel has {:.6} M parameters", state.model.num_params() as f64 / 1e6);
        println!("loss_fn        : MseLoss");
        println!("lr             : {}", cfg.lr);
        println!("epochs_till_now: {}", state.epochs_till_now);
        println!("epochs         : {}", cfg.epochs);

        // ── Step 4: Artifact sinks ────────────────────────────────────────────
        let sinks = EpochSinks {
            checkpoints,
            plotter: LossPlotter::new(&cfg.losses_dir),
            metrics: MetricsLogger::new(&cfg.losses_dir)?,
        };

        // ── Step 5: Run training loop (Layer 5) ───────────────────────────────
        run_training(cfg, state, train_dataset, val_dataset, &sinks, &device)
    }

    fn resume_state<B: AutodiffBackend>(
        &self,
        checkpoints: &CheckpointStore,
        device:      &B::Device,
    ) -> Result<TrainState<B>> {
        let cfg = &self.config;
        let path = match &cfg.checkpoint {
            Some(path) => PathBuf::from(path),
            None => checkpoints.latest()?.ok_or_else(|| DenoiseError::NotFound {
                path: checkpoints.dir().to_path_buf(),
            })?,
        };

        let loaded = CheckpointStore::load::<B>(&path, device)?;
        if loaded.config != cfg.model {
            return Err(DenoiseError::ArchitectureMismatch {
                expected: serde_json::to_string(&cfg.model)?,
                found:    serde_json::to_string(&loaded.config)?,
            }
            .into());
        }

        println!("\nckpt loaded: {}", path.display());
        Ok(TrainState {
            model:           loaded.model,
            history:         loaded.history,
            epochs_till_now: loaded.epochs_till_now,
        })
    }
}

fn open_split(root: &Path, options: DecodeOptions) -> Result<PairedImageDataset> {
    let dataset = PairedImageDataset::open(root, options)
        .map_err(DenoiseError::from)
        .with_context(|| format!("Cannot open split '{}'", root.display()))?;
    tracing::info!("Split '{}': {} pairs of {}", root.display(), dataset.len(), dataset.dims());
    Ok(dataset)
}
