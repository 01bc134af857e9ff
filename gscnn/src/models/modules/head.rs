//! # Final Logit Layer
//!
//! Two normalized 3x3 refinements of the fused features followed by a resize
//! to the output resolution. The per-class projection is left to the caller.

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig2d, Relu,
    },
    prelude::*,
};

use super::{utils::ensure_channels, Resize, ResizeConfig};
use crate::{config::ResizeMode, error::GscnnResult};

/// Configuration for the `FinalLogitLayer` module.
#[derive(Config, Debug)]
pub struct FinalLogitLayerConfig {
    /// Output height.
    pub height: usize,
    /// Output width.
    pub width: usize,
    /// Channels of the fused input.
    #[config(default = "320")]
    pub in_channels: usize,
    /// Channels of both refinement convolutions.
    #[config(default = "256")]
    pub channels: usize,
    /// Interpolation used for the final resize.
    #[config(default = "ResizeMode::Bilinear")]
    pub resize_mode: ResizeMode,
}

impl FinalLogitLayerConfig {
    /// Initializes a new `FinalLogitLayer` module.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> FinalLogitLayer<B> {
        let conv = |in_channels| {
            Conv2dConfig::new([in_channels, self.channels], [3, 3])
                .with_padding(PaddingConfig2d::Same)
                .with_bias(false)
                .init(device)
        };

        FinalLogitLayer {
            in_channels: self.in_channels,
            bn_1: BatchNormConfig::new(self.in_channels).init(device),
            conv_1: conv(self.in_channels),
            bn_2: BatchNormConfig::new(self.channels).init(device),
            conv_2: conv(self.channels),
            relu: Relu::new(),
            resize: ResizeConfig::new(self.height, self.width)
                .with_mode(self.resize_mode)
                .init(),
        }
    }
}

/// Refines fused features and resizes them to the output resolution.
#[derive(Module, Debug)]
pub struct FinalLogitLayer<B: Backend> {
    in_channels: usize,
    bn_1: BatchNorm<B, 2>,
    conv_1: Conv2d<B>,
    bn_2: BatchNorm<B, 2>,
    conv_2: Conv2d<B>,
    relu: Relu,
    resize: Resize,
}

impl<B: Backend> FinalLogitLayer<B> {
    /// # Shapes
    /// - input: `[batch_size, in_channels, h, w]`
    /// - output: `[batch_size, channels, height, width]`
    pub fn forward(&self, x: Tensor<B, 4>) -> GscnnResult<Tensor<B, 4>> {
        ensure_channels(&x, self.in_channels, "FinalLogitLayer")?;

        let x = self.bn_1.forward(x);
        let x = self.relu.forward(self.conv_1.forward(x));
        let x = self.bn_2.forward(x);
        let x = self.relu.forward(self.conv_2.forward(x));

        Ok(self.resize.forward(x))
    }
}
