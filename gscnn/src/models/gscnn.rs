//! # Gated Shape CNN head
//!
//! Wires the shape stream, the atrous pyramid and the final refinement into
//! the full two-stream head. A backbone supplies the activations; a
//! classifier consumes the dense features.

use burn::prelude::*;

use super::{
    modules::{
        AtrousConvConfig, AtrousPyramidPooling, AtrousPyramidPoolingConfig, FinalLogitLayer,
        FinalLogitLayerConfig,
    },
    shape_stream::{
        ShapeAttentionConfig, ShapeStream, ShapeStreamConfig, SHAPE_STREAM_CHANNELS,
    },
};
use crate::{
    config::ResizeMode,
    error::{GscnnError, GscnnResult},
};

/// Configuration for the `GatedScnn` head.
#[derive(Config, Debug)]
pub struct GatedScnnConfig {
    /// Shape stream configuration.
    pub shape_stream: ShapeStreamConfig,
    /// Atrous pyramid configuration.
    pub aspp: AtrousPyramidPoolingConfig,
    /// Final refinement configuration.
    pub head: FinalLogitLayerConfig,
}

impl GatedScnnConfig {
    /// Derives every channel count of the head from the shapes of its inputs.
    ///
    /// # Arguments
    ///
    /// * `image_size` - `[height, width]` of the dense output.
    /// * `shape_size` - `[height, width]` of the shape stream's attention map.
    /// * `shape_feature_channels` - Channels of the four shape stream activations.
    /// * `backbone_channels` - Channels of the backbone's final feature map.
    /// * `intermediate_channels` - Channels of the intermediate representation.
    pub fn for_inputs(
        image_size: [usize; 2],
        shape_size: [usize; 2],
        shape_feature_channels: [usize; 4],
        backbone_channels: usize,
        intermediate_channels: usize,
    ) -> Self {
        let [height, width] = shape_size;
        let attention = ShapeAttentionConfig::new(height, width, shape_feature_channels);
        let aspp = AtrousPyramidPoolingConfig::new(backbone_channels, intermediate_channels);
        let [height, width] = image_size;
        let head =
            FinalLogitLayerConfig::new(height, width).with_in_channels(aspp.output_channels());

        Self::new(ShapeStreamConfig::new(attention), aspp, head)
    }

    /// Uses `mode` for every resize in the head.
    pub fn with_interpolation(mut self, mode: ResizeMode) -> Self {
        self.shape_stream.attention.resize_mode = mode;
        self.aspp.resize_mode = mode;
        self.head.resize_mode = mode;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the stages do not fit together or a stage is
    /// configured with an impossible size.
    pub fn validate(&self) -> GscnnResult<()> {
        let attention = &self.shape_stream.attention;
        if attention.height == 0 || attention.width == 0 {
            return Err(GscnnError::InvalidConfiguration {
                reason: "Shape attention target must be non-empty".to_string(),
            });
        }
        if self.head.height == 0 || self.head.width == 0 {
            return Err(GscnnError::InvalidConfiguration {
                reason: "Output resolution must be non-empty".to_string(),
            });
        }
        if self.aspp.shape_channels != SHAPE_STREAM_CHANNELS {
            return Err(GscnnError::InvalidConfiguration {
                reason: format!(
                    "ASPP expects {} shape channels but the shape stream emits {}",
                    self.aspp.shape_channels, SHAPE_STREAM_CHANNELS
                ),
            });
        }
        if self.head.in_channels != self.aspp.output_channels() {
            return Err(GscnnError::InvalidConfiguration {
                reason: format!(
                    "Final layer expects {} channels but ASPP emits {}",
                    self.head.in_channels,
                    self.aspp.output_channels()
                ),
            });
        }
        for &rate in &self.aspp.rates {
            AtrousConvConfig::new(self.aspp.in_channels, self.aspp.out_channels, rate)
                .validate()?;
        }
        Ok(())
    }

    /// Initializes a new `GatedScnn` head.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> GscnnResult<GatedScnn<B>> {
        self.validate()?;

        Ok(GatedScnn {
            shape_stream: self.shape_stream.init(device)?,
            aspp: self.aspp.init(device)?,
            head: self.head.init(device),
        })
    }
}

/// Tensors handed over by the backbone.
#[derive(Debug, Clone)]
pub struct GatedScnnInput<B: Backend> {
    /// Four activations for the shape stream, coarsest semantic cue first.
    pub shape_features: [Tensor<B, 4>; 4],
    /// Image edges at the shape stream's resolution.
    pub edges: Tensor<B, 4>,
    /// The backbone's final feature map.
    pub backbone: Tensor<B, 4>,
    /// An intermediate, higher resolution backbone representation.
    pub intermediate: Tensor<B, 4>,
}

/// Outputs of the head.
#[derive(Debug, Clone)]
pub struct GatedScnnOutput<B: Backend> {
    /// Single-channel boundary map from the shape tower.
    pub boundary: Tensor<B, 4>,
    /// Two-channel shape attention, the target of the boundary loss.
    pub shape_attention: Tensor<B, 4>,
    /// Dense features at the output resolution, ready for a classifier.
    pub features: Tensor<B, 4>,
}

/// The two-stream Gated Shape CNN head.
#[derive(Module, Debug)]
pub struct GatedScnn<B: Backend> {
    shape_stream: ShapeStream<B>,
    aspp: AtrousPyramidPooling<B>,
    head: FinalLogitLayer<B>,
}

impl<B: Backend> GatedScnn<B> {
    /// Forward pass through both streams and the fusion head.
    ///
    /// # Errors
    ///
    /// Returns an error if any input does not match the configured channels,
    /// if the edges are not at the shape stream's resolution, or if the
    /// batch sizes of the inputs disagree.
    pub fn forward(&self, input: GatedScnnInput<B>) -> GscnnResult<GatedScnnOutput<B>> {
        let GatedScnnInput {
            shape_features,
            edges,
            backbone,
            intermediate,
        } = input;

        let shape = self.shape_stream.forward(shape_features, edges)?;
        log::debug!("shape stream: {:?}", shape.shape_attention.dims());

        let fused = self
            .aspp
            .forward(backbone, shape.shape_attention.clone(), intermediate)?;
        log::debug!("atrous pyramid: {:?}", fused.dims());

        let features = self.head.forward(fused)?;
        log::debug!("final features: {:?}", features.dims());

        Ok(GatedScnnOutput {
            boundary: shape.boundary,
            shape_attention: shape.shape_attention,
            features,
        })
    }
}
