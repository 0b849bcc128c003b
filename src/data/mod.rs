// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything between image files on disk and tensor batches.
//
//   data/<split>/{clean,noisy}/*.png
//       │
//       ▼
//   loader              → pairs files by name, decodes pixels
//       │
//       ▼
//   PairedImageDataset  → implements Burn's Dataset trait
//       │
//       ▼
//   PairBatcher         → stacks samples into [N, C, H, W]
//       │
//       ▼
//   DataLoader          → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Pairs clean/noisy files and decodes images
pub mod loader;

/// Implements Burn's Dataset trait for image pairs
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
