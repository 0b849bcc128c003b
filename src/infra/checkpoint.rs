// ============================================================
// Layer 6 - Checkpoint Store
// ============================================================
// Saves and restores training state, one file per epoch.
//
// What gets saved per checkpoint (a single Burn record):
//   1. model            - all learned U-Net parameters
//   2. architecture     - the UNetConfig as JSON
//   3. four loss series - the full LossHistory so far
//   4. epochs_till_now  - how many epochs this state has seen
//
// Why store the config inside the record?
//   Loading rebuilds the U-Net from the stored config before
//   loading weights into it, so a checkpoint never depends on
//   whatever model happens to be in memory. The caller compares
//   the stored config with its own to detect a mismatch.
//
// Recorder: NamedMpkFileRecorder<FullPrecisionSettings>
//   - MessagePack with named fields
//   - f32 weights and f64 losses stored as-is (bit-exact round trip)
//
// File naming convention:
//   models/
//     model01.mpk   ← state after epoch 1
//     model02.mpk   ← state after epoch 2
//     ...
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Record, Recorder},
};

use crate::domain::{error::DenoiseError, loss_history::LossHistory};
use crate::ml::model::{UNet, UNetConfig, UNetRecord};

/// Extension the recorder appends to every checkpoint stem
pub const CHECKPOINT_EXTENSION: &str = "mpk";

const CHECKPOINT_PREFIX: &str = "model";

/// Everything one checkpoint file contains.
#[derive(Record)]
pub struct CheckpointRecord<B: Backend> {
    pub model:              UNetRecord<B>,
    pub architecture:       String,
    pub running_train_loss: Vec<f64>,
    pub running_val_loss:   Vec<f64>,
    pub train_epoch_loss:   Vec<f64>,
    pub val_epoch_loss:     Vec<f64>,
    pub epochs_till_now:    usize,
}

/// A checkpoint read back from disk, model already rebuilt.
#[derive(Debug)]
pub struct LoadedCheckpoint<B: Backend> {
    pub model:           UNet<B>,
    pub config:          UNetConfig,
    pub history:         LossHistory,
    pub epochs_till_now: usize,
}

/// Manages checkpoint files in one directory.
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    /// The directory is created lazily by the first `save`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/model<NN>.mpk` for a 1-indexed epoch number
    pub fn checkpoint_path(&self, epoch: usize) -> PathBuf {
        self.dir
            .join(format!("{CHECKPOINT_PREFIX}{epoch:02}"))
            .with_extension(CHECKPOINT_EXTENSION)
    }

    /// Save the state reached after `epoch` (1-indexed) epochs.
    /// Returns the path of the written file.
    pub fn save<B: Backend>(
        &self,
        epoch:   usize,
        model:   &UNet<B>,
        config:  &UNetConfig,
        history: &LossHistory,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", self.dir.display()))?;

        let path = self.checkpoint_path(epoch);
        let record = CheckpointRecord::<B> {
            model:              model.clone().into_record(),
            architecture:       serde_json::to_string(config)?,
            running_train_loss: history.running_train_loss.clone(),
            running_val_loss:   history.running_val_loss.clone(),
            train_epoch_loss:   history.train_epoch_loss.clone(),
            val_epoch_loss:     history.val_epoch_loss.clone(),
            epochs_till_now:    epoch,
        };

        // The recorder sets the extension itself
        NamedMpkFileRecorder::<FullPrecisionSettings>::new()
            .record(record, path.clone())
            .map_err(|e| anyhow::anyhow!("Failed to save checkpoint to '{}': {:?}", path.display(), e))?;

        tracing::debug!("Saved checkpoint: epoch {} → '{}'", epoch, path.display());
        Ok(path)
    }

    /// Load a checkpoint file and rebuild the model it describes.
    ///
    /// `path` may be given with or without the `.mpk` extension; any
    /// other extension is reported as not found.
    pub fn load<B: Backend>(path: impl AsRef<Path>, device: &B::Device) -> Result<LoadedCheckpoint<B>> {
        let path = path.as_ref();
        let path = match path.extension() {
            None => path.with_extension(CHECKPOINT_EXTENSION),
            Some(ext) if ext == CHECKPOINT_EXTENSION => path.to_path_buf(),
            Some(_) => return Err(DenoiseError::NotFound { path: path.to_path_buf() }.into()),
        };
        if !path.is_file() {
            return Err(DenoiseError::NotFound { path }.into());
        }

        let corrupt = |reason: String| DenoiseError::CorruptArtifact { path: path.clone(), reason };

        let record: CheckpointRecord<B> = NamedMpkFileRecorder::<FullPrecisionSettings>::new()
            .load(path.clone(), device)
            .map_err(|e| corrupt(format!("{e:?}")))?;

        let config: UNetConfig = serde_json::from_str(&record.architecture)
            .map_err(|e| corrupt(format!("bad architecture config: {e}")))?;
        if config.depth == 0 {
            return Err(corrupt("architecture config has depth 0".to_string()).into());
        }

        let model = config.init::<B>(device).load_record(record.model);
        let history = LossHistory {
            running_train_loss: record.running_train_loss,
            running_val_loss:   record.running_val_loss,
            train_epoch_loss:   record.train_epoch_loss,
            val_epoch_loss:     record.val_epoch_loss,
        };

        tracing::info!(
            "Loaded checkpoint '{}' ({} epochs, {} batch losses)",
            path.display(),
            record.epochs_till_now,
            history.running_train_loss.len(),
        );

        Ok(LoadedCheckpoint { model, config, history, epochs_till_now: record.epochs_till_now })
    }

    /// Path of the checkpoint with the highest epoch number, if any.
    pub fn latest(&self) -> Result<Option<PathBuf>> {
        if !self.dir.is_dir() {
            return Ok(None);
        }

        let mut best: Option<(usize, PathBuf)> = None;
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Cannot read directory '{}'", self.dir.display()))?
        {
            let path = entry?.path();
            if let Some(epoch) = epoch_of(&path) {
                if best.as_ref().map_or(true, |(b, _)| epoch > *b) {
                    best = Some((epoch, path));
                }
            }
        }
        Ok(best.map(|(_, path)| path))
    }
}

/// Parse the epoch number out of `model<NN>.mpk`
fn epoch_of(path: &Path) -> Option<usize> {
    if path.extension()?.to_str()? != CHECKPOINT_EXTENSION {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let digits = stem.strip_prefix(CHECKPOINT_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
