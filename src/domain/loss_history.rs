// ============================================================
// Layer 3 - Loss History
// ============================================================
// The four loss sequences a training run accumulates:
//
//   running_train_loss - one value per training batch
//   running_val_loss   - one value per validation batch
//   train_epoch_loss   - one mean per completed epoch
//   val_epoch_loss     - one mean per completed epoch
//
// All four are append-only. The running sequences span every
// epoch ever trained (including epochs restored from a
// checkpoint), which is why an epoch's mean is taken over the
// slice recorded since that epoch began, not the whole sequence.
//
// The history is a plain value: the trainer takes it in, returns
// it, and the checkpoint store is the only place it is persisted.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LossHistory {
    pub running_train_loss: Vec<f64>,
    pub running_val_loss:   Vec<f64>,
    pub train_epoch_loss:   Vec<f64>,
    pub val_epoch_loss:     Vec<f64>,
}

/// Positions in the running sequences where the current epoch started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochMark {
    train_from: usize,
    val_from:   usize,
}

impl LossHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember where this epoch's batches begin
    pub fn begin_epoch(&self) -> EpochMark {
        EpochMark {
            train_from: self.running_train_loss.len(),
            val_from:   self.running_val_loss.len(),
        }
    }

    pub fn push_train_batch(&mut self, loss: f64) {
        self.running_train_loss.push(loss);
    }

    pub fn push_val_batch(&mut self, loss: f64) {
        self.running_val_loss.push(loss);
    }

    /// Close the epoch started at `mark`: append the mean of its
    /// batch losses to both per-epoch sequences and return them.
    pub fn close_epoch(&mut self, mark: EpochMark) -> (f64, f64) {
        let train = mean(&self.running_train_loss[mark.train_from..]);
        let val   = mean(&self.running_val_loss[mark.val_from..]);
        self.train_epoch_loss.push(train);
        self.val_epoch_loss.push(val);
        (train, val)
    }

    pub fn epochs(&self) -> usize {
        self.train_epoch_loss.len()
    }
}

/// Arithmetic mean; NaN for an empty slice, like numpy's mean.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
