//! # Gated Convolutions
//!
//! The gating blocks that let boundary features steer the regular feature
//! stream. `GateConv` predicts a per-pixel gate from a concatenated pair of
//! maps; `GatedShapeConv` uses that gate to boost a base feature map.

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        BatchNorm, BatchNormConfig, Relu, Sigmoid,
    },
    prelude::*,
};

use super::utils::{cat_channels, ensure_channels};
use crate::error::GscnnResult;

/// Configuration for the `GateConv` module.
#[derive(Config, Debug)]
pub struct GateConvConfig {
    /// Channels of the (already concatenated) input.
    pub in_channels: usize,
}

impl GateConvConfig {
    /// Initializes a new `GateConv` module.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> GateConv<B> {
        let batch_norm_1 = BatchNormConfig::new(self.in_channels).init(device);
        let conv_1 = Conv2dConfig::new([self.in_channels, self.in_channels], [1, 1]).init(device);
        let conv_2 = Conv2dConfig::new([self.in_channels, 1], [1, 1]).init(device);
        let batch_norm_2 = BatchNormConfig::new(1).init(device);

        GateConv {
            in_channels: self.in_channels,
            batch_norm_1,
            conv_1,
            relu: Relu::new(),
            conv_2,
            batch_norm_2,
            sigmoid: Sigmoid::new(),
        }
    }
}

/// Predicts a single-channel gate in `(0, 1)` from its input.
#[derive(Module, Debug)]
pub struct GateConv<B: Backend> {
    in_channels: usize,
    batch_norm_1: BatchNorm<B, 2>,
    conv_1: Conv2d<B>,
    relu: Relu,
    conv_2: Conv2d<B>,
    batch_norm_2: BatchNorm<B, 2>,
    sigmoid: Sigmoid,
}

impl<B: Backend> GateConv<B> {
    /// Forward pass through the gate.
    ///
    /// # Shapes
    /// - input: `[batch_size, in_channels, height, width]`
    /// - output: `[batch_size, 1, height, width]`
    pub fn forward(&self, x: Tensor<B, 4>) -> GscnnResult<Tensor<B, 4>> {
        ensure_channels(&x, self.in_channels, "GateConv")?;

        let x = self.batch_norm_1.forward(x);
        let x = self.conv_1.forward(x);
        let x = self.relu.forward(x);
        let x = self.conv_2.forward(x);
        let x = self.batch_norm_2.forward(x);

        Ok(self.sigmoid.forward(x))
    }
}

/// Configuration for the `GatedShapeConv` module.
#[derive(Config, Debug)]
pub struct GatedShapeConvConfig {
    /// Channels of the base feature map; also the output channel count.
    pub feature_channels: usize,
    /// Channels of the auxiliary shape map.
    pub shape_channels: usize,
}

impl GatedShapeConvConfig {
    /// Initializes a new `GatedShapeConv` module.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> GatedShapeConv<B> {
        let gated_conv =
            GateConvConfig::new(self.feature_channels + self.shape_channels).init(device);
        let conv_1 = Conv2dConfig::new([self.feature_channels, self.feature_channels], [1, 1])
            .init(device);

        GatedShapeConv {
            feature_channels: self.feature_channels,
            shape_channels: self.shape_channels,
            gated_conv,
            conv_1,
        }
    }
}

/// Fuses a feature map with a shape map through a learned gate.
///
/// The gate acts as a boost in `[1, 2]`: the base map is scaled by
/// `gate + 1`, so a closed gate leaves it untouched instead of zeroing it.
#[derive(Module, Debug)]
pub struct GatedShapeConv<B: Backend> {
    feature_channels: usize,
    shape_channels: usize,
    gated_conv: GateConv<B>,
    conv_1: Conv2d<B>,
}

impl<B: Backend> GatedShapeConv<B> {
    /// Forward pass through the gated fusion.
    ///
    /// # Shapes
    /// - feature_map: `[batch_size, feature_channels, height, width]`
    /// - shape_map: `[batch_size, shape_channels, height, width]`
    /// - output: `[batch_size, feature_channels, height, width]`
    pub fn forward(
        &self,
        feature_map: Tensor<B, 4>,
        shape_map: Tensor<B, 4>,
    ) -> GscnnResult<Tensor<B, 4>> {
        ensure_channels(&feature_map, self.feature_channels, "GatedShapeConv features")?;
        ensure_channels(&shape_map, self.shape_channels, "GatedShapeConv shape")?;

        let features = cat_channels(vec![feature_map.clone(), shape_map], "GatedShapeConv")?;
        let alpha = self.gated_conv.forward(features)?;

        // [B, 1, H, W] gate broadcast over the feature channels
        let gated = feature_map * alpha.add_scalar(1.0);

        Ok(self.conv_1.forward(gated))
    }
}
