// ============================================================
// Layer 3 - Error Taxonomy
// ============================================================
// Every way a denoising run can fail, as typed errors.
//
// Nothing in the crate recovers from these: the application
// layer wraps them into anyhow::Error and the run aborts. They
// are still typed so tests (and callers) can tell a missing
// checkpoint from a corrupt one via anyhow's downcast_ref.
//
//   DataError            - a sample pair is missing, unreadable,
//                          or has the wrong size
//   NotFound             - resume requested, checkpoint absent
//   CorruptArtifact      - checkpoint could not be deserialised
//   NumericFault         - loss became NaN or infinite
//   ArchitectureMismatch - checkpoint built for another U-Net
//   InvalidConfig        - a run parameter violates a precondition
//
// Reference: Rust Book §9 (Recoverable Errors with Result)
//            thiserror crate documentation

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::sample::ImageDims;

/// Failures of the paired-image dataset.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("directory '{}' does not exist", .0.display())]
    MissingDirectory(PathBuf),

    #[error("no matching clean/noisy image pairs under '{}'", .0.display())]
    Empty(PathBuf),

    #[error("index {index} is out of range for a dataset of {len} pairs")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("cannot read image '{}': {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },

    #[error("clean and noisy '{name}' differ in size: {clean} vs {noisy}")]
    DimensionMismatch { name: String, clean: ImageDims, noisy: ImageDims },

    #[error("pair '{name}' is {found}, but the dataset is {expected}")]
    InconsistentSize { name: String, expected: ImageDims, found: ImageDims },

    #[error("unsupported channel count {0}: only 1 (grayscale) and 3 (RGB) are supported")]
    UnsupportedChannels(usize),

    #[error("{phase} loader yielded {seen} of {expected} samples")]
    ShortEpoch { phase: &'static str, seen: usize, expected: usize },
}

#[derive(Debug, Error)]
pub enum DenoiseError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("checkpoint '{}' not found", path.display())]
    NotFound { path: PathBuf },

    #[error("checkpoint '{}' is corrupt: {reason}", path.display())]
    CorruptArtifact { path: PathBuf, reason: String },

    #[error("non-finite {phase} loss {value} at batch {batch}")]
    NumericFault { phase: &'static str, batch: usize, value: f64 },

    #[error("checkpoint architecture {found} does not match the configured {expected}")]
    ArchitectureMismatch { expected: String, found: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
