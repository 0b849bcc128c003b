// ============================================================
// Layer 5 - ML / Model Layer (Burn)
// ============================================================
// The network, the loop that trains it, and the code that runs
// a trained network on a single image.
//
//   model.rs      - the U-Net
//                   • down path of conv blocks + 2x2 max-pool
//                   • up path of transposed convs + skip connections
//                   • optional padding and batch norm
//                   • final 1x1 conv to n_classes channels
//
//   trainer.rs    - the training loop
//                   Forward pass, MSE loss, backward pass, Adam
//                   step, validation, and per-epoch plot / metrics
//                   / checkpoint
//
//   inferencer.rs - the inference engine
//                   Loads a checkpoint, denoises one image
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Ronneberger et al. (2015) U-Net

/// U-Net reconstruction model
pub mod model;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Inference engine: loads a checkpoint and denoises images
pub mod inferencer;
