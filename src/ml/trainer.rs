// ============================================================
// Layer 5 - Training Loop
// ============================================================
// Train + validation epochs using Burn's DataLoader and Adam.
//
// One epoch:
//   1. TRAINING    - shuffled batches: forward, MSE, backward, Adam step
//   2. VALIDATION  - fixed-order batches on the inner backend, no grads
//   3. bookkeeping - epoch means, loss plot, metrics row, checkpoint
//
// Key Burn insight:
//   - Training runs on B (an AutodiffBackend) for gradients
//   - model.valid() returns the model on B::InnerBackend
//   - so the validation batcher must also use B::InnerBackend
//
// Burn's Dataset::get can only say None, and a None ends the
// loader's iteration early. Samples are counted per phase and a
// short epoch is turned into a DataError.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};
use burn::{
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::Dataset,
    },
    module::AutodiffModule,
    nn::loss::{MseLoss, Reduction},
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{DenoiseBatch, PairBatcher},
    dataset::PairedImageDataset,
};
use crate::domain::{
    error::{DataError, DenoiseError},
    loss_history::LossHistory,
};
use crate::infra::{
    checkpoint::CheckpointStore,
    metrics::{EpochMetrics, MetricsLogger},
    plot::LossPlotter,
};
use crate::ml::model::{center_crop, UNet};

/// Adam's ε, as in torch.optim.Adam
const ADAM_EPSILON: f32 = 1e-8;

/// What the loop starts from: a fresh model or a restored checkpoint.
pub struct TrainState<B: Backend> {
    pub model:           UNet<B>,
    pub history:         LossHistory,
    pub epochs_till_now: usize,
}

impl<B: Backend> TrainState<B> {
    pub fn fresh(model: UNet<B>) -> Self {
        Self { model, history: LossHistory::new(), epochs_till_now: 0 }
    }
}

/// Where the per-epoch artifacts go.
pub struct EpochSinks {
    pub checkpoints: CheckpointStore,
    pub plotter:     LossPlotter,
    pub metrics:     MetricsLogger,
}

/// Summary of one finished epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochReport {
    /// 1-indexed, counted across resumes
    pub epoch:         usize,
    pub train_batches: usize,
    pub val_batches:   usize,
    pub train_loss:    f64,
    pub val_loss:      f64,
    pub checkpoint:    PathBuf,
    pub plot:          PathBuf,
}

/// State after the last epoch, plus one report per epoch run.
pub struct TrainOutcome {
    pub history:         LossHistory,
    pub epochs_till_now: usize,
    pub epochs:          Vec<EpochReport>,
}

/// Run `cfg.epochs` epochs on top of `state`.
///
/// With `cfg.epochs == 0` the state is handed back untouched and
/// nothing is written.
pub fn run_training<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    state:         TrainState<B>,
    train_dataset: PairedImageDataset,
    val_dataset:   PairedImageDataset,
    sinks:         &EpochSinks,
    device:        &B::Device,
) -> Result<TrainOutcome> {
    let TrainState { mut model, mut history, epochs_till_now } = state;

    let train_samples = train_dataset.len();
    let val_samples   = val_dataset.len();
    let train_batches = batch_count(train_samples, cfg.batch_size);
    let val_batches   = batch_count(val_samples, cfg.batch_size);

    // ── Adam optimiser ────────────────────────────────────────────────────────
    // Moments start from zero on every run, resumed or not
    let mut optim = AdamConfig::new().with_epsilon(ADAM_EPSILON).init();

    // ── Training data loader (AutodiffBackend), reshuffled every epoch ───────
    let train_loader = train_loader::<B>(cfg, epochs_till_now, train_dataset, device);

    // ── Validation data loader (InnerBackend, fixed order) ────────────────────
    let val_loader = DataLoaderBuilder::new(PairBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .build(val_dataset);

    let mse = MseLoss::new();
    let mut reports = Vec::with_capacity(cfg.epochs);
    let last_epoch = epochs_till_now + cfg.epochs;

    for epoch in epochs_till_now + 1..=last_epoch {
        println!("\n===== EPOCH {}/{} =====", epoch, last_epoch);
        let mark = history.begin_epoch();

        // ── Training phase ────────────────────────────────────────────────────
        println!("\nTRAINING...");
        let train_start = Instant::now();
        let mut seen = 0usize;

        for (batch_idx, batch) in train_loader.iter().enumerate() {
            let batch_start = Instant::now();
            seen += batch.len();

            let output = model.forward(batch.noisy_images);
            let [_, _, height, width] = output.dims();
            let target = center_crop(batch.images, height, width);
            let loss   = mse.forward(output, target, Reduction::Mean);

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            check_finite("train", batch_idx + 1, loss_val)?;
            history.push_train_batch(loss_val);

            // Backward pass + Adam update
            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(cfg.lr, model, grads);

            if (batch_idx + 1) % cfg.log_interval == 0 {
                let elapsed = batch_start.elapsed().as_secs_f64();
                println!(
                    "train loss @batch_idx {}/{}: {} in {} mins {:.2} secs",
                    pad_index(batch_idx + 1, train_batches),
                    train_batches,
                    loss_val,
                    (elapsed / 60.0).floor(),
                    elapsed % 60.0,
                );
            }
        }
        check_count("train", seen, train_samples)?;

        let train_time = train_start.elapsed();
        println!("\nepoch train time: {}", format_duration(train_time));

        // ── Validation phase ──────────────────────────────────────────────────
        // model.valid() → UNet<B::InnerBackend>, no autodiff graph
        println!("\nVALIDATION...");
        let val_start   = Instant::now();
        let model_valid = model.valid();
        let mut seen    = 0usize;

        for (batch_idx, batch) in val_loader.iter().enumerate() {
            seen += batch.len();

            let output = model_valid.forward(batch.noisy_images);
            let [_, _, height, width] = output.dims();
            let target = center_crop(batch.images, height, width);

            let loss_val: f64 = mse
                .forward(output, target, Reduction::Mean)
                .into_scalar()
                .elem::<f64>();
            check_finite("val", batch_idx + 1, loss_val)?;
            history.push_val_batch(loss_val);

            if (batch_idx + 1) % cfg.log_interval == 0 {
                println!(
                    "val loss   @batch_idx {}/{}: {}",
                    pad_index(batch_idx + 1, val_batches),
                    val_batches,
                    loss_val,
                );
            }
        }
        check_count("val", seen, val_samples)?;

        let val_time = val_start.elapsed();
        println!("\nepoch val   time: {}", format_duration(val_time));

        // ── Epoch bookkeeping ─────────────────────────────────────────────────
        let (train_loss, val_loss) = history.close_epoch(mark);
        println!(
            "Epoch {:>3}/{} | train_loss={:.6} | val_loss={:.6}",
            epoch, last_epoch, train_loss, val_loss,
        );

        let plot = sinks.plotter.render(&history, epoch)?;
        sinks.metrics.log(&EpochMetrics::new(
            epoch,
            train_loss,
            val_loss,
            train_time.as_secs_f64(),
            val_time.as_secs_f64(),
        ))?;
        let checkpoint = sinks.checkpoints.save(epoch, &model, &cfg.model, &history)?;
        tracing::info!("Checkpoint saved for epoch {} → '{}'", epoch, checkpoint.display());

        reports.push(EpochReport {
            epoch,
            train_batches,
            val_batches,
            train_loss,
            val_loss,
            checkpoint,
            plot,
        });
    }

    if !reports.is_empty() {
        tracing::info!("Training complete!");
    }

    Ok(TrainOutcome {
        history,
        epochs_till_now: last_epoch,
        epochs: reports,
    })
}

/// Shuffled loader for the training split.
///
/// Burn reseeds its shuffle only per process, so the epochs already
/// trained are folded into the seed. A resumed run then continues with
/// a fresh permutation instead of replaying the first run's.
fn train_loader<B: Backend>(
    cfg:             &TrainConfig,
    epochs_till_now: usize,
    dataset:         PairedImageDataset,
    device:          &B::Device,
) -> Arc<dyn DataLoader<DenoiseBatch<B>>> {
    DataLoaderBuilder::new(PairBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(shuffle_seed(cfg.seed, epochs_till_now))
        .build(dataset)
}

fn shuffle_seed(seed: u64, epochs_till_now: usize) -> u64 {
    seed.wrapping_add(epochs_till_now as u64)
}

/// Number of batches a loader yields, the last one possibly short
pub fn batch_count(samples: usize, batch_size: usize) -> usize {
    samples.div_ceil(batch_size)
}

fn check_finite(phase: &'static str, batch: usize, value: f64) -> Result<(), DenoiseError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(DenoiseError::NumericFault { phase, batch, value })
    }
}

fn check_count(phase: &'static str, seen: usize, expected: usize) -> Result<(), DenoiseError> {
    if seen == expected {
        Ok(())
    } else {
        Err(DataError::ShortEpoch { phase, seen, expected }.into())
    }
}

/// 1-indexed batch number zero-padded to the width of `total`
fn pad_index(index: usize, total: usize) -> String {
    let width = total.to_string().len();
    format!("{index:0width$}")
}

/// `h hrs m mins s secs`, whole units only
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{} hrs {} mins {} secs", secs / 3600, (secs % 3600) / 60, secs % 60)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    use crate::data::{dataset::DecodeOptions, loader::NOISY_DIR};
    use crate::ml::model::UNetConfig;
    use crate::test_support::write_split;

    type TestBackend = NdArray<f32>;

    fn open(root: &std::path::Path) -> PairedImageDataset {
        PairedImageDataset::open(root, DecodeOptions::new(1)).unwrap()
    }

    /// Clean pixels of every sample, in the order the first epoch draws them
    fn first_epoch_order(cfg: &TrainConfig, epochs_till_now: usize, root: &std::path::Path) -> Vec<f32> {
        let loader = train_loader::<TestBackend>(cfg, epochs_till_now, open(root), &Default::default());
        loader
            .iter()
            .flat_map(|batch| batch.images.into_data().to_vec::<f32>().unwrap())
            .collect()
    }

    #[test]
    fn test_resumed_run_draws_a_new_permutation() {
        let tmp = tempfile::tempdir().unwrap();
        write_split(tmp.path(), 8, 4, 4);
        let cfg = TrainConfig { batch_size: 8, ..TrainConfig::default() };

        let first   = first_epoch_order(&cfg, 0, tmp.path());
        let again   = first_epoch_order(&cfg, 0, tmp.path());
        let resumed = first_epoch_order(&cfg, 1, tmp.path());

        assert_eq!(first.len(), 8 * 16);
        assert_eq!(first, again);
        assert_ne!(first, resumed);
    }

    #[test]
    fn test_shuffle_seed_moves_with_epochs() {
        assert_eq!(shuffle_seed(42, 0), 42);
        assert_eq!(shuffle_seed(42, 3), 45);
        assert_eq!(shuffle_seed(u64::MAX, 1), 0);
    }

    #[test]
    fn test_file_lost_after_open_aborts_with_short_epoch() {
        let tmp = tempfile::tempdir().unwrap();
        write_split(&tmp.path().join("train"), 4, 8, 8);
        write_split(&tmp.path().join("val"), 2, 8, 8);

        let train = open(&tmp.path().join("train"));
        let val   = open(&tmp.path().join("val"));
        let victim = train.names().nth(2).unwrap().to_string();
        std::fs::remove_file(tmp.path().join("train").join(NOISY_DIR).join(victim)).unwrap();

        let cfg = TrainConfig {
            batch_size: 2,
            model:      UNetConfig::new().with_wf(1).with_depth(2),
            ..TrainConfig::default()
        };
        let device = Default::default();
        let sinks = EpochSinks {
            checkpoints: CheckpointStore::new(tmp.path().join("models")),
            plotter:     LossPlotter::new(tmp.path().join("losses")),
            metrics:     MetricsLogger::new(tmp.path().join("losses")).unwrap(),
        };
        let state = TrainState::<Autodiff<TestBackend>>::fresh(cfg.model.init(&device));

        let err = run_training(&cfg, state, train, val, &sinks, &device).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<DenoiseError>(),
            Some(DenoiseError::Data(DataError::ShortEpoch { phase: "train", expected: 4, .. }))
        ));
        assert!(!tmp.path().join("models/model01.mpk").exists());
        assert!(!tmp.path().join("losses/losses_01.png").exists());
    }

    #[test]
    fn test_batch_count_rounds_up() {
        assert_eq!(batch_count(4, 2), 2);
        assert_eq!(batch_count(5, 2), 3);
        assert_eq!(batch_count(1, 8), 1);
        assert_eq!(batch_count(0, 8), 0);
    }

    #[test]
    fn test_pad_index_matches_total_width() {
        assert_eq!(pad_index(5, 120), "005");
        assert_eq!(pad_index(25, 25), "25");
        assert_eq!(pad_index(7, 9), "7");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0 hrs 0 mins 0 secs");
        assert_eq!(format_duration(Duration::from_secs_f64(3725.9)), "1 hrs 2 mins 5 secs");
    }

    #[test]
    fn test_non_finite_loss_is_a_numeric_fault() {
        assert!(check_finite("train", 1, 0.25).is_ok());
        assert!(matches!(
            check_finite("val", 3, f64::NAN),
            Err(DenoiseError::NumericFault { phase: "val", batch: 3, .. })
        ));
        assert!(check_finite("train", 1, f64::INFINITY).is_err());
    }

    #[test]
    fn test_short_epoch_is_a_data_error() {
        assert!(check_count("train", 4, 4).is_ok());
        assert!(matches!(
            check_count("train", 3, 4),
            Err(DenoiseError::Data(DataError::ShortEpoch { seen: 3, expected: 4, .. }))
        ));
    }
}
