// ============================================================
// Layer 4 - Image Pair Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<ImagePair> into
// two stacked tensors the model can consume.
//
// How batching works here:
//   Input:  N ImagePairs, each C x H x W
//   Output: DenoiseBatch with two tensors of shape [N, C, H, W]
//
//   All clean buffers are concatenated in sample order, then
//   reshaped; the same for the noisy buffers. Every pair of a
//   dataset shares one ImageDims, so no padding is needed.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::domain::sample::{ImageDims, ImagePair};

/// A batch of samples ready for the forward pass.
#[derive(Debug, Clone)]
pub struct DenoiseBatch<B: Backend> {
    /// Clean targets, [batch_size, channels, height, width]
    pub images: Tensor<B, 4>,

    /// Noisy inputs, same shape as `images`
    pub noisy_images: Tensor<B, 4>,
}

impl<B: Backend> DenoiseBatch<B> {
    pub fn len(&self) -> usize {
        self.images.dims()[0]
    }
}

/// Holds the target device so tensors are created on the right CPU/GPU.
#[derive(Clone, Debug)]
pub struct PairBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> PairBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<ImagePair, DenoiseBatch<B>> for PairBatcher<B> {
    fn batch(&self, items: Vec<ImagePair>) -> DenoiseBatch<B> {
        let n    = items.len();
        let dims = items.first().map(|p| p.dims).unwrap_or(ImageDims::new(0, 0, 0));
        let shape = [n, dims.channels, dims.height, dims.width];

        let clean: Vec<f32> = items.iter().flat_map(|p| p.clean.iter().copied()).collect();
        let noisy: Vec<f32> = items.into_iter().flat_map(|p| p.noisy).collect();

        let images       = Tensor::<B, 4>::from_data(TensorData::new(clean, shape), &self.device);
        let noisy_images = Tensor::<B, 4>::from_data(TensorData::new(noisy, shape), &self.device);

        DenoiseBatch { images, noisy_images }
    }
}
