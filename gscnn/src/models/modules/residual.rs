//! # Pre-activation Residual Unit
//!
//! `BN -> ReLU -> Conv3x3` twice, followed by the shortcut add.

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig2d, Relu,
    },
    prelude::*,
};

use super::utils::ensure_channels;
use crate::error::{GscnnError, GscnnResult};

/// Configuration for the `ResnetPreactUnit` module.
#[derive(Config, Debug)]
pub struct ResnetPreactUnitConfig {
    /// Channels of the input.
    pub in_channels: usize,
    /// Depth of both convolutions, and therefore of the output.
    pub depth: usize,
}

impl ResnetPreactUnitConfig {
    /// Checks that the shortcut can be added to the residual branch.
    ///
    /// The shortcut is either the input itself (`in_channels == depth`) or a
    /// single-channel input replicated across `depth` channels.
    pub fn validate(&self) -> GscnnResult<()> {
        if self.in_channels != self.depth && self.in_channels != 1 {
            return Err(GscnnError::InvalidConfiguration {
                reason: format!(
                    "residual unit of depth {} cannot take a {}-channel shortcut",
                    self.depth, self.in_channels
                ),
            });
        }
        Ok(())
    }

    /// Initializes a new `ResnetPreactUnit` module.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> GscnnResult<ResnetPreactUnit<B>> {
        self.validate()?;

        let bn_1 = BatchNormConfig::new(self.in_channels).init(device);
        let conv_1 = Conv2dConfig::new([self.in_channels, self.depth], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);
        let bn_2 = BatchNormConfig::new(self.depth).init(device);
        let conv_2 = Conv2dConfig::new([self.depth, self.depth], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);

        Ok(ResnetPreactUnit {
            in_channels: self.in_channels,
            depth: self.depth,
            bn_1,
            relu: Relu::new(),
            conv_1,
            bn_2,
            conv_2,
        })
    }
}

/// A pre-activation residual unit.
#[derive(Module, Debug)]
pub struct ResnetPreactUnit<B: Backend> {
    in_channels: usize,
    depth: usize,
    bn_1: BatchNorm<B, 2>,
    relu: Relu,
    conv_1: Conv2d<B>,
    bn_2: BatchNorm<B, 2>,
    conv_2: Conv2d<B>,
}

impl<B: Backend> ResnetPreactUnit<B> {
    /// Forward pass through the residual unit.
    ///
    /// # Shapes
    /// - input: `[batch_size, in_channels, height, width]`
    /// - output: `[batch_size, depth, height, width]`
    pub fn forward(&self, x: Tensor<B, 4>) -> GscnnResult<Tensor<B, 4>> {
        ensure_channels(&x, self.in_channels, "ResnetPreactUnit")?;

        let shortcut = if self.in_channels == self.depth {
            x.clone()
        } else {
            x.clone().repeat_dim(1, self.depth)
        };

        let x = self.bn_1.forward(x);
        let x = self.relu.forward(x);
        let x = self.conv_1.forward(x);
        let x = self.bn_2.forward(x);
        let x = self.relu.forward(x);
        let x = self.conv_2.forward(x);

        Ok(x + shortcut)
    }
}
