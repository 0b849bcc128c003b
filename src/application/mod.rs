// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// a specific goal (training, or denoising one image).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No direct image decoding or file formats (Layers 4 and 6)
//   - Only workflow coordination and backend selection
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The training workflow
pub mod train_use_case;

// The single-image inference workflow
pub mod denoise_use_case;
