// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Everything a training run writes to disk besides its console
// output:
//
//   checkpoint.rs - model weights, architecture config and loss
//                   history, one Burn record per epoch
//                   (models/model01.mpk, ...)
//
//   plot.rs       - the four loss curves as a PNG per epoch
//                   (losses/losses_01.png, ...)
//
//   metrics.rs    - one CSV row per epoch
//                   (losses/metrics.csv)
//
// Each writer creates its directory on first use.
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Loss curve rendering
pub mod plot;

/// Training metrics CSV logger
pub mod metrics;
