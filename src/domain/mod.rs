// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain Rust types that describe what a denoising run works with:
// image pairs, the loss history, and the error taxonomy.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and functions
//
// Keeping this layer pure means the loss bookkeeping and the
// error types can be unit tested without any tensor backend.
//
// Reference: Rust Book §5 (Structs), §9 (Error Handling)

// A (clean, noisy) sample decoded into channel-first floats
pub mod sample;

// Append-only per-batch and per-epoch loss sequences
pub mod loss_history;

// DataError, NotFound, CorruptArtifact, NumericFault, ...
pub mod error;
