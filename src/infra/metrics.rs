// ============================================================
// Layer 6 - Metrics Logger
// ============================================================
// Records one CSV row per training epoch, next to the loss plots.
//
// Metrics recorded per epoch:
//   - epoch:      the epoch number (1, 2, 3, ...), counted across resumes
//   - train_loss: mean MSE over this epoch's training batches
//   - val_loss:   mean MSE over this epoch's validation batches
//   - train_secs: wall time of the training phase
//   - val_secs:   wall time of the validation phase
//
// Output file: losses/metrics.csv
//
// Example CSV output:
//   epoch,train_loss,val_loss,train_secs,val_secs
//   1,0.031245,0.028920,412.37,35.10
//   2,0.012301,0.011543,409.85,34.96
//
// The header is written only when the file is new, so a resumed
// run keeps appending to the same log.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

pub const METRICS_FILE: &str = "metrics.csv";

const HEADER: &str = "epoch,train_loss,val_loss,train_secs,val_secs";

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    pub train_loss: f64,
    pub val_loss:   f64,

    pub train_secs: f64,
    pub val_secs:   f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, val_loss: f64, train_secs: f64, val_secs: f64) -> Self {
        Self { epoch, train_loss, val_loss, train_secs, val_secs }
    }

    fn to_row(&self) -> String {
        format!(
            "{},{:.6},{:.6},{:.2},{:.2}",
            self.epoch, self.train_loss, self.val_loss, self.train_secs, self.val_secs,
        )
    }
}

/// Appends epoch metrics to `<dir>/metrics.csv`.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create the directory and write the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create metrics dir '{}'", dir.display()))?;

        let csv_path = dir.join(METRICS_FILE);
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(f, "{}", m.to_row())?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
