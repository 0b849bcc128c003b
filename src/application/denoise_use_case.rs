// ============================================================
// Layer 2 - Denoise Use Case
// ============================================================
// Runs a trained checkpoint over one image file:
//   1. Load the checkpoint on the inference backend (no autodiff)
//   2. Decode the input with the model's channel count
//   3. Forward pass, clamp to [0, 1]
//   4. Write the result; the format follows the output extension
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, NdArray, Wgpu},
    prelude::Backend,
};

use crate::application::train_use_case::DeviceKind;
use crate::data::loader::{decode_image, encode_image};
use crate::domain::{error::DenoiseError, sample::ImageDims};
use crate::ml::inferencer::Denoiser;

pub struct DenoiseUseCase {
    checkpoint: PathBuf,
    device:     DeviceKind,
}

impl DenoiseUseCase {
    pub fn new(checkpoint: impl Into<PathBuf>, device: DeviceKind) -> Self {
        Self { checkpoint: checkpoint.into(), device }
    }

    /// Denoise `input` into `output`, returning the written image's shape
    pub fn execute(&self, input: &Path, output: &Path) -> Result<ImageDims> {
        match self.device {
            DeviceKind::Cpu  => self.execute_on::<NdArray>(NdArrayDevice::default(), input, output),
            DeviceKind::Wgpu => self.execute_on::<Wgpu>(WgpuDevice::default(), input, output),
        }
    }

    pub fn execute_on<B: Backend>(&self, device: B::Device, input: &Path, output: &Path) -> Result<ImageDims> {
        let denoiser = Denoiser::<B>::from_checkpoint(&self.checkpoint, &device)?;

        let channels = denoiser.config().in_channels;
        let (pixels, dims) = decode_image(input, channels, None)
            .map_err(DenoiseError::from)
            .with_context(|| format!("Cannot load input image '{}'", input.display()))?;

        let (restored, out_dims) = denoiser.denoise(pixels, dims)?;
        if out_dims != dims {
            tracing::info!("Output is {} for a {} input (unpadded model)", out_dims, dims);
        }

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create '{}'", parent.display()))?;
        }
        encode_image(&restored, out_dims)
            .map_err(DenoiseError::from)?
            .save(output)
            .with_context(|| format!("Cannot write '{}'", output.display()))?;

        tracing::info!("Denoised '{}' → '{}'", input.display(), output.display());
        Ok(out_dims)
    }
}
