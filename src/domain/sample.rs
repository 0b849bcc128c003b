// ============================================================
// Layer 3 - ImagePair Domain Type
// ============================================================
// One training sample: a clean image and its noisy counterpart,
// both decoded into channel-first (C x H x W) f32 values in [0, 1].
//
// The two images always share the same ImageDims. The dataset
// guarantees this before an ImagePair is ever constructed, so
// the batcher can stack samples without re-checking shapes.
//
// Layout example for a 1-channel 2x3 image:
//   pixels = [r0c0, r0c1, r0c2, r1c0, r1c1, r1c2]
//
// Reference: Rust Book §5 (Structs and Methods)

use std::fmt;

/// Shape of one decoded image in channel-first order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageDims {
    pub channels: usize,
    pub height:   usize,
    pub width:    usize,
}

impl ImageDims {
    pub fn new(channels: usize, height: usize, width: usize) -> Self {
        Self { channels, height, width }
    }

    /// Number of f32 values one image of this shape occupies
    pub fn numel(&self) -> usize {
        self.channels * self.height * self.width
    }
}

impl fmt::Display for ImageDims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.channels, self.height, self.width)
    }
}

/// A (clean, noisy) pair matched by file name.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePair {
    /// Shared file name of the two images, kept for diagnostics
    pub name: String,

    /// Ground-truth image, channel-first, scaled to [0, 1]
    pub clean: Vec<f32>,

    /// Corrupted input image with the same layout as `clean`
    pub noisy: Vec<f32>,

    pub dims: ImageDims,
}

impl ImagePair {
    pub fn new(name: impl Into<String>, clean: Vec<f32>, noisy: Vec<f32>, dims: ImageDims) -> Self {
        Self { name: name.into(), clean, noisy, dims }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numel_matches_shape() {
        let dims = ImageDims::new(3, 4, 5);
        assert_eq!(dims.numel(), 60);
        assert_eq!(dims.to_string(), "3x4x5");
    }
}
