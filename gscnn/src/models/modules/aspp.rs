//! # Atrous Spatial Pyramid Pooling (ASPP)
//!
//! Multi-rate dilated convolutions over the backbone's final features, fused
//! with global context, the shape stream's attention and a higher-resolution
//! intermediate representation.

use burn::{
    module::Ignored,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        BatchNorm, BatchNormConfig, Relu,
    },
    prelude::*,
};
use burn_extra_ops::TensorExtraOps;

use super::{
    resize_to,
    utils::{cat_channels, ensure_channels, ensure_same_batch},
    AtrousConv, AtrousConvConfig,
};
use crate::{
    config::{Activation, ResizeMode},
    error::GscnnResult,
};

/// Channels of the fused pyramid before it meets the intermediate representation.
pub const ASPP_REDUCED_CHANNELS: usize = 64;
/// Channels the intermediate representation is projected to.
pub const ASPP_INTERMEDIATE_CHANNELS: usize = 256;

/// Configuration for a single atrous branch.
#[derive(Config, Debug)]
pub struct AtrousBranchConfig {
    /// Channels of the backbone features.
    pub in_channels: usize,
    /// Output channels of the branch.
    pub planes: usize,
    /// Dilation rate of the branch's convolution.
    pub rate: usize,
}

impl AtrousBranchConfig {
    /// Initializes a new `AtrousBranch`.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> GscnnResult<AtrousBranch<B>> {
        let bn = BatchNormConfig::new(self.in_channels).init(device);
        let atrous_conv = AtrousConvConfig::new(self.in_channels, self.planes, self.rate)
            .with_bias(false)
            .with_activation(Activation::Relu)
            .init(device)?;

        Ok(AtrousBranch { bn, atrous_conv })
    }
}

/// A single branch of the pyramid: its own normalization, then an atrous convolution.
#[derive(Module, Debug)]
pub struct AtrousBranch<B: Backend> {
    bn: BatchNorm<B, 2>,
    atrous_conv: AtrousConv<B>,
}

impl<B: Backend> AtrousBranch<B> {
    /// Normalizes `x` and applies the branch's atrous convolution.
    ///
    /// # Shapes
    /// - input: `[batch_size, in_channels, height, width]`
    /// - output: `[batch_size, planes, height, width]`
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.atrous_conv.forward(self.bn.forward(x))
    }
}

/// Configuration for the `AtrousPyramidPooling` module.
#[derive(Config, Debug)]
pub struct AtrousPyramidPoolingConfig {
    /// Channels of the backbone's final feature map.
    pub in_channels: usize,
    /// Channels of the intermediate backbone representation.
    pub intermediate_channels: usize,
    /// Channels of the shape stream output.
    #[config(default = "2")]
    pub shape_channels: usize,
    /// Width of every pyramid branch.
    #[config(default = "256")]
    pub out_channels: usize,
    /// Dilation rates of the atrous branches.
    #[config(default = "[6, 12, 18]")]
    pub rates: [usize; 3],
    /// Interpolation used to align the branches.
    #[config(default = "ResizeMode::Bilinear")]
    pub resize_mode: ResizeMode,
}

impl AtrousPyramidPoolingConfig {
    /// Channels of the tensor produced by the module.
    pub const fn output_channels(&self) -> usize {
        ASPP_REDUCED_CHANNELS + ASPP_INTERMEDIATE_CHANNELS
    }

    /// Channels entering the first reduction: global context, shape context,
    /// the 1x1 branch and one block per atrous rate.
    const fn fused_channels(&self) -> usize {
        self.out_channels * (2 + self.rates.len()) + self.shape_channels
    }

    /// Initializes a new `AtrousPyramidPooling` module.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> GscnnResult<AtrousPyramidPooling<B>> {
        // for final output of backbone
        let bn_1 = BatchNormConfig::new(self.in_channels).init(device);
        let conv_1 = Conv2dConfig::new([self.in_channels, self.out_channels], [1, 1]).init(device);

        let atrous_branches = self
            .rates
            .iter()
            .map(|&rate| {
                AtrousBranchConfig::new(self.in_channels, self.out_channels, rate).init(device)
            })
            .collect::<GscnnResult<Vec<_>>>()?;

        // for backbone features
        let bn_img = BatchNormConfig::new(self.in_channels).init(device);
        let conv_img =
            Conv2dConfig::new([self.in_channels, self.out_channels], [1, 1]).init(device);

        // for shape features
        let bn_shape = BatchNormConfig::new(self.shape_channels).init(device);

        // 1x1 reduction convolutions
        let conv_reduction_1 =
            Conv2dConfig::new([self.fused_channels(), ASPP_REDUCED_CHANNELS], [1, 1])
                .with_bias(false)
                .init(device);
        let conv_reduction_2 = Conv2dConfig::new(
            [self.intermediate_channels, ASPP_INTERMEDIATE_CHANNELS],
            [1, 1],
        )
        .with_bias(false)
        .init(device);

        Ok(AtrousPyramidPooling {
            in_channels: self.in_channels,
            shape_channels: self.shape_channels,
            intermediate_channels: self.intermediate_channels,
            bn_1,
            conv_1,
            atrous_branches,
            bn_img,
            conv_img,
            bn_shape,
            conv_reduction_1,
            conv_reduction_2,
            relu: Relu::new(),
            resize_mode: Ignored(self.resize_mode),
        })
    }
}

/// Atrous Spatial Pyramid Pooling fused with shape and intermediate features.
#[derive(Module, Debug)]
pub struct AtrousPyramidPooling<B: Backend> {
    in_channels: usize,
    shape_channels: usize,
    intermediate_channels: usize,
    bn_1: BatchNorm<B, 2>,
    conv_1: Conv2d<B>,
    atrous_branches: Vec<AtrousBranch<B>>,
    bn_img: BatchNorm<B, 2>,
    conv_img: Conv2d<B>,
    bn_shape: BatchNorm<B, 2>,
    conv_reduction_1: Conv2d<B>,
    conv_reduction_2: Conv2d<B>,
    relu: Relu,
    resize_mode: Ignored<ResizeMode>,
}

impl<B: Backend> AtrousPyramidPooling<B> {
    /// Forward pass through the pyramid.
    ///
    /// # Shapes
    /// - image_features: `[batch_size, in_channels, h, w]`
    /// - shape_features: `[batch_size, shape_channels, hs, ws]`
    /// - intermediate: `[batch_size, intermediate_channels, hi, wi]`
    /// - output: `[batch_size, 320, hi, wi]`
    pub fn forward(
        &self,
        image_features: Tensor<B, 4>,
        shape_features: Tensor<B, 4>,
        intermediate: Tensor<B, 4>,
    ) -> GscnnResult<Tensor<B, 4>> {
        ensure_channels(&image_features, self.in_channels, "AtrousPyramidPooling backbone")?;
        ensure_channels(&shape_features, self.shape_channels, "AtrousPyramidPooling shape")?;
        ensure_channels(
            &intermediate,
            self.intermediate_channels,
            "AtrousPyramidPooling intermediate",
        )?;
        ensure_same_batch(&image_features, &shape_features, "AtrousPyramidPooling")?;
        ensure_same_batch(&image_features, &intermediate, "AtrousPyramidPooling")?;

        let [_, _, h, w] = image_features.dims();
        let [_, _, hi, wi] = intermediate.dims();
        log::debug!("ASPP: backbone [{h}, {w}], intermediate [{hi}, {wi}]");

        // Global context and shape stream activations
        let img_net = image_features.clone().global_avg_pool2d();
        let img_net = self.bn_img.forward(img_net);
        let img_net = self.relu.forward(self.conv_img.forward(img_net));
        let img_net = resize_to(img_net, [h, w], self.resize_mode.0);
        let shape_net = resize_to(shape_features, [h, w], self.resize_mode.0);
        let shape_net = self.bn_shape.forward(shape_net);

        // Atrous pyramid over the backbone's final features
        let pointwise = self.bn_1.forward(image_features.clone());
        let pointwise = self.relu.forward(self.conv_1.forward(pointwise));

        let mut branches = vec![img_net, shape_net, pointwise];
        branches.extend(
            self.atrous_branches
                .iter()
                .map(|branch| branch.forward(image_features.clone())),
        );
        let net = cat_channels(branches, "AtrousPyramidPooling pyramid")?;
        let net = self.conv_reduction_1.forward(net);

        // Combine with the intermediate representation
        let intermediate = self.conv_reduction_2.forward(intermediate);
        let net = resize_to(net, [hi, wi], self.resize_mode.0);

        cat_channels(vec![net, intermediate], "AtrousPyramidPooling intermediate")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GscnnError;
    use burn::{backend::NdArray, tensor::Distribution};

    type TestBackend = NdArray<f32>;

    fn small_config() -> AtrousPyramidPoolingConfig {
        AtrousPyramidPoolingConfig::new(32, 24).with_out_channels(16)
    }

    #[test]
    fn output_matches_intermediate_resolution_with_320_channels() {
        let device = Default::default();
        let aspp = small_config().init::<TestBackend>(&device).unwrap();
        let backbone = Tensor::random([2, 32, 8, 8], Distribution::Default, &device);
        let shape = Tensor::random([2, 2, 64, 64], Distribution::Default, &device);
        let intermediate = Tensor::random([2, 24, 16, 16], Distribution::Default, &device);

        let out = aspp.forward(backbone, shape, intermediate).unwrap();

        assert_eq!(out.dims(), [2, 320, 16, 16]);
        assert_eq!(small_config().output_channels(), 320);
    }

    #[test]
    fn non_square_inputs_follow_the_intermediate_grid() {
        let device = Default::default();
        let aspp = small_config()
            .with_resize_mode(ResizeMode::Nearest)
            .init::<TestBackend>(&device)
            .unwrap();
        let backbone = Tensor::random([1, 32, 5, 9], Distribution::Default, &device);
        let shape = Tensor::random([1, 2, 40, 72], Distribution::Default, &device);
        let intermediate = Tensor::random([1, 24, 10, 18], Distribution::Default, &device);

        let out = aspp.forward(backbone, shape, intermediate).unwrap();

        assert_eq!(out.dims(), [1, 320, 10, 18]);
        assert_eq!(aspp.resize_mode.0, ResizeMode::Nearest);
    }

    #[test]
    fn batch_mismatch_is_rejected() {
        let device = Default::default();
        let aspp = small_config().init::<TestBackend>(&device).unwrap();
        let backbone = Tensor::zeros([2, 32, 4, 4], &device);
        let shape = Tensor::zeros([1, 2, 16, 16], &device);
        let intermediate = Tensor::zeros([2, 24, 8, 8], &device);

        assert!(matches!(
            aspp.forward(backbone, shape, intermediate),
            Err(GscnnError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn wrong_intermediate_channels_are_rejected() {
        let device = Default::default();
        let aspp = small_config().init::<TestBackend>(&device).unwrap();
        let backbone = Tensor::zeros([1, 32, 4, 4], &device);
        let shape = Tensor::zeros([1, 2, 16, 16], &device);
        let intermediate = Tensor::zeros([1, 12, 8, 8], &device);

        assert!(matches!(
            aspp.forward(backbone, shape, intermediate),
            Err(GscnnError::ChannelMismatch { expected: 24, actual: 12, .. })
        ));
    }

    #[test]
    fn every_atrous_branch_uses_its_own_rate() {
        let device = Default::default();
        let aspp = small_config()
            .with_rates([2, 4, 8])
            .init::<TestBackend>(&device)
            .unwrap();

        let rates: Vec<_> = aspp
            .atrous_branches
            .iter()
            .map(|branch| branch.atrous_conv.rate())
            .collect();

        assert_eq!(rates, vec![2, 4, 8]);
    }
}
