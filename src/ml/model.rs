// ============================================================
// Layer 5 - U-Net Reconstruction Model
// ============================================================
// Maps a noisy batch [N, C, H, W] to its reconstruction.
//
//   input ─ block0 ──────────────────────────── up0 ─ 1x1 conv ─ output
//             │ pool                             ▲
//             └ block1 ──────────────── up1 ─────┘
//                 │ pool                 ▲
//                 └ block2 (deepest) ────┘
//
// Block i has 2^(wf + i) filters. Each up block doubles the spatial
// size with a transposed conv, concatenates the (center-cropped)
// skip tensor from the same level, and runs a conv block.
//
// Reference: Ronneberger et al. (2015) U-Net
//            Burn Book §3 (Building Blocks)

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::relu,
};

use crate::domain::{error::DenoiseError, sample::ImageDims};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally, do NOT add them again or you get conflicting impls.
#[derive(Config, Debug, PartialEq)]
pub struct UNetConfig {
    /// Channels of the noisy input image
    #[config(default = 1)]
    pub in_channels: usize,
    /// Channels of the reconstruction
    #[config(default = 1)]
    pub n_classes: usize,
    /// Number of conv blocks on the down path (>= 1)
    #[config(default = 3)]
    pub depth: usize,
    /// Block i has 2^(wf + i) filters
    #[config(default = 6)]
    pub wf: usize,
    /// Pad 3x3 convolutions so spatial size is preserved
    #[config(default = true)]
    pub padding: bool,
    #[config(default = false)]
    pub batch_norm: bool,
}

impl UNetConfig {
    /// # Panics
    /// Panics if `depth` is 0: a U-Net needs at least one conv block.
    pub fn init<B: Backend>(&self, device: &B::Device) -> UNet<B> {
        assert!(self.depth >= 1, "U-Net depth must be at least 1, got {}", self.depth);

        let mut prev = self.in_channels;
        let mut down_path = Vec::with_capacity(self.depth);
        for i in 0..self.depth {
            let width = self.block_width(i);
            down_path.push(self.conv_block(prev, width, device));
            prev = width;
        }

        let mut up_path = Vec::with_capacity(self.depth - 1);
        for i in (0..self.depth - 1).rev() {
            let width = self.block_width(i);
            up_path.push(UpBlock {
                up: ConvTranspose2dConfig::new([prev, width], [2, 2])
                    .with_stride([2, 2])
                    .init(device),
                conv_block: self.conv_block(prev, width, device),
            });
            prev = width;
        }

        UNet {
            down_path,
            up_path,
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            last: Conv2dConfig::new([prev, self.n_classes], [1, 1]).init(device),
        }
    }

    fn block_width(&self, level: usize) -> usize {
        1 << (self.wf + level)
    }

    fn conv_block<B: Backend>(&self, in_ch: usize, out_ch: usize, device: &B::Device) -> ConvBlock<B> {
        let padding = if self.padding {
            PaddingConfig2d::Explicit(1, 1)
        } else {
            PaddingConfig2d::Valid
        };
        let norm = || -> Option<BatchNorm<B, 2>> {
            self.batch_norm.then(|| BatchNormConfig::new(out_ch).init(device))
        };
        ConvBlock {
            conv1: Conv2dConfig::new([in_ch, out_ch], [3, 3])
                .with_padding(padding.clone())
                .init(device),
            norm1: norm(),
            conv2: Conv2dConfig::new([out_ch, out_ch], [3, 3])
                .with_padding(padding)
                .init(device),
            norm2: norm(),
        }
    }

    /// Spatial size of the reconstruction for an input of `height` x `width`,
    /// or None when some level would be left with nothing to convolve or pool.
    ///
    /// Equal to the input when padding is on and both sides divide by
    /// 2^(depth-1); otherwise smaller. Each unpadded 3x3 conv trims 2.
    pub fn output_size(&self, height: usize, width: usize) -> Option<(usize, usize)> {
        Some((self.output_side(height)?, self.output_side(width)?))
    }

    /// `output_size`, as an error naming the offending input.
    pub fn check_input(&self, dims: ImageDims) -> Result<(usize, usize), DenoiseError> {
        self.output_size(dims.height, dims.width).ok_or_else(|| {
            DenoiseError::InvalidConfig(format!(
                "a {} input is too small for a depth-{} U-Net (padding = {})",
                dims, self.depth, self.padding,
            ))
        })
    }

    fn output_side(&self, input: usize) -> Option<usize> {
        let block = |side: usize| -> Option<usize> {
            let side = if self.padding { side } else { side.checked_sub(4)? };
            (side >= 1).then_some(side)
        };

        let mut side = input;
        for level in 0..self.depth {
            side = block(side)?;
            if level != self.depth - 1 {
                // 2x2 max pool
                if side < 2 {
                    return None;
                }
                side /= 2;
            }
        }
        for _ in 1..self.depth {
            side = block(side * 2)?;
        }
        Some(side)
    }
}

/// Two 3x3 convolutions, each followed by ReLU and optional batch norm.
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv1: Conv2d<B>,
    pub norm1: Option<BatchNorm<B, 2>>,
    pub conv2: Conv2d<B>,
    pub norm2: Option<BatchNorm<B, 2>>,
}

impl<B: Backend> ConvBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut x = relu(self.conv1.forward(x));
        if let Some(norm) = &self.norm1 {
            x = norm.forward(x);
        }
        let mut x = relu(self.conv2.forward(x));
        if let Some(norm) = &self.norm2 {
            x = norm.forward(x);
        }
        x
    }
}

/// Transposed-conv upsampling, skip concatenation, then a conv block.
#[derive(Module, Debug)]
pub struct UpBlock<B: Backend> {
    pub up:         ConvTranspose2d<B>,
    pub conv_block: ConvBlock<B>,
}

impl<B: Backend> UpBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>, bridge: Tensor<B, 4>) -> Tensor<B, 4> {
        let up = self.up.forward(x);
        let [_, _, height, width] = up.dims();
        let bridge = center_crop(bridge, height, width);
        self.conv_block.forward(Tensor::cat(vec![up, bridge], 1))
    }
}

#[derive(Module, Debug)]
pub struct UNet<B: Backend> {
    pub down_path: Vec<ConvBlock<B>>,
    pub up_path:   Vec<UpBlock<B>>,
    pub pool:      MaxPool2d,
    pub last:      Conv2d<B>,
}

impl<B: Backend> UNet<B> {
    /// [batch, in_channels, H, W] → [batch, n_classes, H', W']
    ///
    /// H and W must pass `UNetConfig::check_input`; Burn's conv shape
    /// arithmetic panics on inputs that are too small.
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let last_level = self.down_path.len() - 1;
        let mut bridges = Vec::with_capacity(last_level);

        let mut x = x;
        for (level, block) in self.down_path.iter().enumerate() {
            x = block.forward(x);
            if level != last_level {
                bridges.push(x.clone());
                x = self.pool.forward(x);
            }
        }

        // Deepest skip connection pairs with the first up block
        for (up, bridge) in self.up_path.iter().zip(bridges.into_iter().rev()) {
            x = up.forward(x, bridge);
        }

        self.last.forward(x)
    }
}

/// Crop the centre `height` x `width` window out of `x`.
/// Used for skip connections and, when padding is off, for targets.
pub fn center_crop<B: Backend>(x: Tensor<B, 4>, height: usize, width: usize) -> Tensor<B, 4> {
    let [n, c, h, w] = x.dims();
    if h == height && w == width {
        return x;
    }
    let top  = (h - height) / 2;
    let left = (w - width) / 2;
    x.slice([0..n, 0..c, top..top + height, left..left + width])
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type TestBackend = NdArray<f32>;

    fn small() -> UNetConfig {
        UNetConfig::new().with_wf(2)
    }

    #[test]
    fn test_padded_output_keeps_input_shape() {
        let device = Default::default();
        let model: UNet<TestBackend> = small().init(&device);

        for batch in 1..=3 {
            let x = Tensor::<TestBackend, 4>::random([batch, 1, 16, 16], Distribution::Default, &device);
            assert_eq!(model.forward(x).dims(), [batch, 1, 16, 16]);
        }
    }

    #[test]
    fn test_unpadded_output_shrinks_as_predicted() {
        let device = Default::default();
        let cfg = small().with_padding(false);
        let model: UNet<TestBackend> = cfg.init(&device);

        let x = Tensor::<TestBackend, 4>::zeros([1, 1, 44, 44], &device);
        let (h, w) = cfg.output_size(44, 44).unwrap();
        assert_eq!((h, w), (4, 4));
        assert_eq!(model.forward(x).dims(), [1, 1, h, w]);
    }

    #[test]
    fn test_output_size_with_padding_is_identity() {
        assert_eq!(UNetConfig::new().output_size(64, 32), Some((64, 32)));
    }

    #[test]
    fn test_too_small_inputs_are_rejected() {
        let unpadded = UNetConfig::new().with_wf(1).with_depth(2).with_padding(false);
        // 8 → 4 → pool 2 → nothing left for the second block
        assert_eq!(unpadded.output_size(8, 8), None);
        assert_eq!(unpadded.output_size(20, 8), None);
        assert_eq!(unpadded.output_size(20, 20), Some((4, 4)));

        // Padded depth 3 pools twice, so each side needs at least 4 pixels
        assert_eq!(UNetConfig::new().output_size(2, 2), None);
        assert_eq!(UNetConfig::new().output_size(4, 4), Some((4, 4)));
        assert_eq!(UNetConfig::new().output_size(5, 7), Some((4, 4)));

        assert!(matches!(
            unpadded.check_input(ImageDims::new(1, 8, 8)),
            Err(DenoiseError::InvalidConfig(_))
        ));
        assert_eq!(unpadded.check_input(ImageDims::new(1, 20, 20)).unwrap(), (4, 4));
    }

    #[test]
    fn test_output_size_matches_forward_on_odd_sizes() {
        let device = Default::default();
        let cfg = small().with_padding(false);
        let model: UNet<TestBackend> = cfg.init(&device);

        let x = Tensor::<TestBackend, 4>::zeros([1, 1, 47, 45], &device);
        let (h, w) = cfg.output_size(47, 45).unwrap();
        assert_eq!(model.forward(x).dims(), [1, 1, h, w]);
    }

    #[test]
    fn test_rgb_and_batch_norm() {
        let device = Default::default();
        let cfg = small().with_in_channels(3).with_n_classes(3).with_batch_norm(true);
        let model: UNet<TestBackend> = cfg.init(&device);
        assert!(model.down_path[0].norm1.is_some());

        let x = Tensor::<TestBackend, 4>::ones([2, 3, 8, 8], &device);
        assert_eq!(model.forward(x).dims(), [2, 3, 8, 8]);
    }

    #[test]
    fn test_depth_one_is_plain_conv_stack() {
        let device = Default::default();
        let model: UNet<TestBackend> = small().with_depth(1).init(&device);
        assert!(model.up_path.is_empty());

        let x = Tensor::<TestBackend, 4>::ones([1, 1, 5, 7], &device);
        assert_eq!(model.forward(x).dims(), [1, 1, 5, 7]);
    }

    #[test]
    fn test_parameter_count() {
        let device = Default::default();
        let model: UNet<TestBackend> = UNetConfig::new().with_wf(1).with_depth(2).init(&device);
        // down: (1*9*2+2) + (2*9*2+2) = 20 + 38
        //       (2*9*4+4) + (4*9*4+4) = 76 + 148
        // up:   convT 4*2*4+2 = 34; block (4*9*2+2) + (2*9*2+2) = 74 + 38
        // last: 2*1+1 = 3
        assert_eq!(model.num_params(), 20 + 38 + 76 + 148 + 34 + 74 + 38 + 3);
    }

    #[test]
    fn test_center_crop_takes_middle() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 1, Int>::arange(0..16, &device)
            .float()
            .reshape([1, 1, 4, 4]);
        let cropped: Vec<f32> = center_crop(x, 2, 2).into_data().to_vec().unwrap();
        assert_eq!(cropped, vec![5.0, 6.0, 9.0, 10.0]);
    }

    #[test]
    #[should_panic]
    fn test_zero_depth_panics() {
        let _model: UNet<TestBackend> = small().with_depth(0).init(&Default::default());
    }
}
