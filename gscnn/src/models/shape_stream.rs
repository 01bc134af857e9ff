//! # Shape Stream
//!
//! The auxiliary branch that turns four backbone activations into a boundary
//! attention map. `ShapeAttention` is the multi-scale tower; `ShapeStream`
//! fuses its output with raw image edges.
//!
//! The tower reduces every activation to a single channel and brings it to a
//! common resolution. Starting from the coarsest semantic cue, it then
//! alternates residual refinement, channel reduction (64 -> 32 -> 16 -> 8) and
//! gated fusion with the next activation.

use burn::{
    module::Ignored,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        Sigmoid,
    },
    prelude::*,
};

use super::modules::{
    utils::{cat_channels, ensure_channels, ensure_same_batch},
    GatedShapeConv, GatedShapeConvConfig, Resize, ResizeConfig, ResnetPreactUnit,
    ResnetPreactUnitConfig,
};
use crate::{config::ResizeMode, error::GscnnResult};

/// Depths of the tower's residual units and reduction convolutions.
pub const SHAPE_TOWER_DEPTHS: [usize; 4] = [64, 32, 16, 8];
/// Channels of the shape stream's attention output.
pub const SHAPE_STREAM_CHANNELS: usize = 2;

/// Configuration for the `ShapeAttention` tower.
#[derive(Config, Debug)]
pub struct ShapeAttentionConfig {
    /// Height of the attention map.
    pub height: usize,
    /// Width of the attention map.
    pub width: usize,
    /// Channels of the four backbone activations, in the order they are fused.
    pub in_channels: [usize; 4],
    /// Interpolation used to bring the activations to the target resolution.
    #[config(default = "ResizeMode::Bilinear")]
    pub resize_mode: ResizeMode,
}

impl ShapeAttentionConfig {
    /// Initializes a new `ShapeAttention` tower.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> GscnnResult<ShapeAttention<B>> {
        let [d1, d2, d3, d4] = SHAPE_TOWER_DEPTHS;
        let [c1, c2, c3, c4] = self.in_channels;

        let reduce = |in_channels| Conv2dConfig::new([in_channels, 1], [1, 1]).init(device);
        let project = |in_channels, out_channels| {
            Conv2dConfig::new([in_channels, out_channels], [1, 1]).init(device)
        };

        Ok(ShapeAttention {
            in_channels: Ignored(self.in_channels),
            resize: ResizeConfig::new(self.height, self.width)
                .with_mode(self.resize_mode)
                .init(),
            shape_reduction_1: reduce(c1),
            shape_reduction_2: reduce(c2),
            shape_reduction_3: reduce(c3),
            shape_reduction_4: reduce(c4),
            res_1: ResnetPreactUnitConfig::new(1, d1).init(device)?,
            res_2: ResnetPreactUnitConfig::new(d2, d2).init(device)?,
            res_3: ResnetPreactUnitConfig::new(d3, d3).init(device)?,
            reduction_conv_1: project(d1, d2),
            reduction_conv_2: project(d2, d3),
            reduction_conv_3: project(d3, d4),
            reduction_conv_4: Conv2dConfig::new([d4, 1], [1, 1])
                .with_bias(false)
                .init(device),
            gated_conv_1: GatedShapeConvConfig::new(d2, 1).init(device),
            gated_conv_2: GatedShapeConvConfig::new(d3, 1).init(device),
            gated_conv_3: GatedShapeConvConfig::new(d4, 1).init(device),
            sigmoid: Sigmoid::new(),
        })
    }
}

/// Multi-scale tower producing a single-channel boundary attention map.
#[derive(Module, Debug)]
pub struct ShapeAttention<B: Backend> {
    in_channels: Ignored<[usize; 4]>,
    resize: Resize,
    shape_reduction_1: Conv2d<B>,
    shape_reduction_2: Conv2d<B>,
    shape_reduction_3: Conv2d<B>,
    shape_reduction_4: Conv2d<B>,
    res_1: ResnetPreactUnit<B>,
    res_2: ResnetPreactUnit<B>,
    res_3: ResnetPreactUnit<B>,
    reduction_conv_1: Conv2d<B>,
    reduction_conv_2: Conv2d<B>,
    reduction_conv_3: Conv2d<B>,
    reduction_conv_4: Conv2d<B>,
    gated_conv_1: GatedShapeConv<B>,
    gated_conv_2: GatedShapeConv<B>,
    gated_conv_3: GatedShapeConv<B>,
    sigmoid: Sigmoid,
}

impl<B: Backend> ShapeAttention<B> {
    /// The `[height, width]` of the attention map.
    pub const fn target(&self) -> [usize; 2] {
        self.resize.target()
    }

    /// Forward pass through the tower.
    ///
    /// # Shapes
    /// - features: four `[batch_size, in_channels[i], h_i, w_i]` tensors, any `h_i, w_i`
    /// - output: `[batch_size, 1, height, width]`, values in `(0, 1)`
    pub fn forward(&self, features: [Tensor<B, 4>; 4]) -> GscnnResult<Tensor<B, 4>> {
        for (i, (feature, &channels)) in features.iter().zip(&self.in_channels.0).enumerate() {
            ensure_channels(feature, channels, &format!("ShapeAttention input {}", i + 1))?;
            ensure_same_batch(&features[0], feature, "ShapeAttention")?;
        }
        let [s1, s2, s3, s4] = features;

        let s1 = self.resize.forward(self.shape_reduction_1.forward(s1));
        let s2 = self.resize.forward(self.shape_reduction_2.forward(s2));
        let s3 = self.resize.forward(self.shape_reduction_3.forward(s3));
        let s4 = self.resize.forward(self.shape_reduction_4.forward(s4));

        let x = self.res_1.forward(s1)?;
        let x = self.reduction_conv_1.forward(x);
        let x = self.gated_conv_1.forward(x, s2)?;
        log::debug!("shape tower stage 1: {:?}", x.dims());

        let x = self.res_2.forward(x)?;
        let x = self.reduction_conv_2.forward(x);
        let x = self.gated_conv_2.forward(x, s3)?;
        log::debug!("shape tower stage 2: {:?}", x.dims());

        let x = self.res_3.forward(x)?;
        let x = self.reduction_conv_3.forward(x);
        let x = self.gated_conv_3.forward(x, s4)?;
        log::debug!("shape tower stage 3: {:?}", x.dims());

        let x = self.reduction_conv_4.forward(x);

        Ok(self.sigmoid.forward(x))
    }
}

/// Configuration for the `ShapeStream` module.
#[derive(Config, Debug)]
pub struct ShapeStreamConfig {
    /// The boundary attention tower.
    pub attention: ShapeAttentionConfig,
    /// Channels of the image edge tensor.
    #[config(default = "1")]
    pub edge_channels: usize,
}

impl ShapeStreamConfig {
    /// Initializes a new `ShapeStream` module.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> GscnnResult<ShapeStream<B>> {
        let shape_attention = self.attention.init(device)?;
        let reduction_conv =
            Conv2dConfig::new([1 + self.edge_channels, SHAPE_STREAM_CHANNELS], [1, 1])
                .with_bias(false)
                .init(device);

        Ok(ShapeStream {
            edge_channels: self.edge_channels,
            shape_attention,
            reduction_conv,
            sigmoid: Sigmoid::new(),
        })
    }
}

/// Output of the shape stream.
#[derive(Debug, Clone)]
pub struct ShapeStreamOutput<B: Backend> {
    /// Boundary attention from the tower: `[batch_size, 1, height, width]`.
    pub boundary: Tensor<B, 4>,
    /// Shape attention fused with edges: `[batch_size, 2, height, width]`.
    pub shape_attention: Tensor<B, 4>,
}

/// The shape stream: boundary tower fused with image edges.
#[derive(Module, Debug)]
pub struct ShapeStream<B: Backend> {
    edge_channels: usize,
    shape_attention: ShapeAttention<B>,
    reduction_conv: Conv2d<B>,
    sigmoid: Sigmoid,
}

impl<B: Backend> ShapeStream<B> {
    /// Forward pass through the shape stream.
    ///
    /// The edge tensor must already be at the tower's resolution.
    ///
    /// # Shapes
    /// - features: see [`ShapeAttention::forward`]
    /// - edges: `[batch_size, edge_channels, height, width]`
    pub fn forward(
        &self,
        features: [Tensor<B, 4>; 4],
        edges: Tensor<B, 4>,
    ) -> GscnnResult<ShapeStreamOutput<B>> {
        ensure_channels(&edges, self.edge_channels, "ShapeStream edges")?;

        let boundary = self.shape_attention.forward(features)?;
        let x = cat_channels(vec![boundary.clone(), edges], "ShapeStream")?;
        let shape_attention = self.sigmoid.forward(self.reduction_conv.forward(x));

        Ok(ShapeStreamOutput {
            boundary,
            shape_attention,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GscnnError;
    use burn::{backend::NdArray, tensor::Distribution};

    type TestBackend = NdArray<f32>;

    fn features(
        batch: usize,
        channels: [usize; 4],
        sizes: [[usize; 2]; 4],
        device: &Device<TestBackend>,
    ) -> [Tensor<TestBackend, 4>; 4] {
        let tensor = |i: usize| {
            let [h, w] = sizes[i];
            Tensor::random([batch, channels[i], h, w], Distribution::Normal(0.0, 1.0), device)
        };
        [tensor(0), tensor(1), tensor(2), tensor(3)]
    }

    #[test]
    fn tower_outputs_single_channel_unit_map_at_target() {
        let device = Default::default();
        let tower = ShapeAttentionConfig::new(32, 24, [8, 6, 4, 2])
            .init::<TestBackend>(&device)
            .unwrap();
        let inputs = features(2, [8, 6, 4, 2], [[4, 3], [8, 6], [16, 12], [32, 24]], &device);

        let out = tower.forward(inputs).unwrap();

        assert_eq!(out.dims(), [2, 1, 32, 24]);
        assert!(out.clone().min().into_scalar() >= 0.0);
        assert!(out.max().into_scalar() <= 1.0);
    }

    #[test]
    fn tower_accepts_arbitrary_input_resolutions() {
        let device = Default::default();
        let tower = ShapeAttentionConfig::new(20, 20, [3, 3, 3, 3])
            .with_resize_mode(ResizeMode::Nearest)
            .init::<TestBackend>(&device)
            .unwrap();
        let inputs = features(1, [3, 3, 3, 3], [[7, 5], [40, 40], [13, 29], [20, 20]], &device);

        assert_eq!(tower.forward(inputs).unwrap().dims(), [1, 1, 20, 20]);
        assert_eq!(tower.target(), [20, 20]);
    }

    #[test]
    fn tower_rejects_wrong_input_channels() {
        let device = Default::default();
        let tower = ShapeAttentionConfig::new(8, 8, [4, 4, 4, 4])
            .init::<TestBackend>(&device)
            .unwrap();
        let inputs = features(1, [4, 4, 5, 4], [[8, 8]; 4], &device);

        match tower.forward(inputs) {
            Err(GscnnError::ChannelMismatch { layer, .. }) => assert!(layer.contains("input 3")),
            other => panic!("Expected ChannelMismatch error, got {other:?}"),
        }
    }

    #[test]
    fn shape_stream_emits_boundary_and_two_channel_attention() {
        let device = Default::default();
        let stream = ShapeStreamConfig::new(ShapeAttentionConfig::new(16, 16, [4, 4, 4, 4]))
            .init::<TestBackend>(&device)
            .unwrap();
        let inputs = features(1, [4, 4, 4, 4], [[2, 2], [4, 4], [8, 8], [16, 16]], &device);
        let edges = Tensor::random([1, 1, 16, 16], Distribution::Default, &device);

        let out = stream.forward(inputs, edges).unwrap();

        assert_eq!(out.boundary.dims(), [1, 1, 16, 16]);
        assert_eq!(out.shape_attention.dims(), [1, 2, 16, 16]);
        assert!(out.shape_attention.clone().min().into_scalar() >= 0.0);
        assert!(out.shape_attention.max().into_scalar() <= 1.0);
    }

    #[test]
    fn shape_stream_requires_edges_at_tower_resolution() {
        let device = Default::default();
        let stream = ShapeStreamConfig::new(ShapeAttentionConfig::new(16, 16, [4, 4, 4, 4]))
            .init::<TestBackend>(&device)
            .unwrap();
        let inputs = features(1, [4, 4, 4, 4], [[16, 16]; 4], &device);
        let edges = Tensor::zeros([1, 1, 32, 32], &device);

        assert!(matches!(
            stream.forward(inputs, edges),
            Err(GscnnError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn multi_channel_edges_widen_the_final_projection() {
        let device = Default::default();
        let stream = ShapeStreamConfig::new(ShapeAttentionConfig::new(8, 8, [2, 2, 2, 2]))
            .with_edge_channels(3)
            .init::<TestBackend>(&device)
            .unwrap();
        let inputs = features(1, [2, 2, 2, 2], [[8, 8]; 4], &device);
        let edges = Tensor::zeros([1, 3, 8, 8], &device);

        let out = stream.forward(inputs, edges).unwrap();

        assert_eq!(out.shape_attention.dims(), [1, 2, 8, 8]);
    }
}
