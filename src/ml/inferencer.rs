// ============================================================
// Layer 5 - Inferencer
// ============================================================
// Loads a trained U-Net from a checkpoint and reconstructs single
// images with it. Runs on a plain (non-autodiff) backend.
use anyhow::Result;
use std::path::Path;
use burn::{prelude::*, tensor::TensorData};

use crate::domain::sample::ImageDims;
use crate::infra::checkpoint::CheckpointStore;
use crate::ml::model::{UNet, UNetConfig};

pub struct Denoiser<B: Backend> {
    model:  UNet<B>,
    config: UNetConfig,
    device: B::Device,
}

impl<B: Backend> Denoiser<B> {
    pub fn new(model: UNet<B>, config: UNetConfig, device: B::Device) -> Self {
        Self { model, config, device }
    }

    pub fn from_checkpoint(path: impl AsRef<Path>, device: &B::Device) -> Result<Self> {
        let loaded = CheckpointStore::load::<B>(path, device)?;
        tracing::info!(
            "Model loaded from checkpoint ({} epochs, {} parameters)",
            loaded.epochs_till_now,
            loaded.model.num_params(),
        );
        Ok(Self::new(loaded.model, loaded.config, device.clone()))
    }

    pub fn config(&self) -> &UNetConfig {
        &self.config
    }

    /// Reconstruct one channel-first image; output values are clamped to [0, 1].
    ///
    /// Without padding the result is smaller than the input, so the
    /// output shape is returned alongside the pixels.
    pub fn denoise(&self, pixels: Vec<f32>, dims: ImageDims) -> Result<(Vec<f32>, ImageDims)> {
        anyhow::ensure!(
            dims.channels == self.config.in_channels,
            "model expects {} channels, image has {}",
            self.config.in_channels,
            dims.channels,
        );
        anyhow::ensure!(
            pixels.len() == dims.numel(),
            "{} values do not fit a {} image",
            pixels.len(),
            dims,
        );

        self.config.check_input(dims)?;

        let shape = [1, dims.channels, dims.height, dims.width];
        let input = Tensor::<B, 4>::from_data(TensorData::new(pixels, shape), &self.device);

        let output = self.model.forward(input).clamp(0.0, 1.0);
        let [_, channels, height, width] = output.dims();

        let values: Vec<f32> = output
            .into_data()
            .to_vec()
            .map_err(|e| anyhow::anyhow!("Cannot read model output: {e:?}"))?;

        Ok((values, ImageDims::new(channels, height, width)))
    }
}
