//! Synthetic backbone activations.
//!
//! There is no trained backbone in this workspace, so the demos derive the
//! head's inputs from the image itself: average pooling down to each stride
//! followed by a fixed random pointwise projection and a ReLU. The result is
//! spatially correlated with the picture, which is enough to exercise every
//! layer of the head end to end.

use burn::{
    prelude::*,
    tensor::{
        module::{avg_pool2d, conv2d},
        ops::ConvOptions,
        Distribution,
    },
};
use burn_extra_ops::ImageGradientConfig;
use gscnn_burn::{GatedScnnInput, Resize, ResizeConfig};

use crate::config::DemoConfig;

/// Builds the head's inputs from a `[batch, 3, height, width]` image at the
/// configured image size.
pub fn synthetic_input<B: Backend>(config: &DemoConfig, image: Tensor<B, 4>) -> GatedScnnInput<B> {
    let device = image.device();
    let model = &config.model;
    let shape_channels = model.shape_stream.attention.in_channels;

    let shape_features = core::array::from_fn(|i| {
        project(
            downsample(image.clone(), config.shape_feature_strides[i]),
            shape_channels[i],
            &device,
        )
    });
    let backbone = project(
        downsample(image.clone(), config.backbone_stride),
        model.aspp.in_channels,
        &device,
    );
    let intermediate = project(
        downsample(image.clone(), config.intermediate_stride),
        model.aspp.intermediate_channels,
        &device,
    );

    GatedScnnInput {
        shape_features,
        edges: edges(config, image),
        backbone,
        intermediate,
    }
}

/// Sobel edges of the image at the shape stream's resolution.
pub fn edges<B: Backend>(config: &DemoConfig, image: Tensor<B, 4>) -> Tensor<B, 4> {
    let [height, width] = config.shape_size();
    let resize: Resize = ResizeConfig::new(height, width).init();
    let gradient = ImageGradientConfig {
        threshold: config.edge_threshold,
    }
    .init();

    gradient.forward(resize.forward(image))
}

fn downsample<B: Backend>(x: Tensor<B, 4>, stride: usize) -> Tensor<B, 4> {
    if stride == 1 {
        return x;
    }
    avg_pool2d(x, [stride, stride], [stride, stride], [0, 0], true)
}

fn project<B: Backend>(x: Tensor<B, 4>, channels: usize, device: &B::Device) -> Tensor<B, 4> {
    let [_, in_channels, _, _] = x.dims();
    let weight = Tensor::random(
        [channels, in_channels, 1, 1],
        Distribution::Normal(0.0, 1.0),
        device,
    );
    let options = ConvOptions::new([1, 1], [0, 0], [1, 1], 1);

    burn::tensor::activation::relu(conv2d(x, weight, None, options))
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;

    use super::*;

    type TestBackend = NdArray<f32>;

    #[test]
    fn synthetic_input_matches_configured_shapes() {
        let device = Default::default();
        let config = DemoConfig::new(32);
        let image = Tensor::<TestBackend, 4>::random(
            [2, 3, 32, 32],
            Distribution::Uniform(0.0, 1.0),
            &device,
        );

        let input = synthetic_input(&config, image);

        let sizes = input.shape_features.each_ref().map(|t| t.dims());
        assert_eq!(
            sizes,
            [
                [2, 256, 4, 4],
                [2, 256, 8, 8],
                [2, 512, 16, 16],
                [2, 1024, 32, 32]
            ]
        );
        assert_eq!(input.edges.dims(), [2, 1, 32, 32]);
        assert_eq!(input.backbone.dims(), [2, 512, 4, 4]);
        assert_eq!(input.intermediate.dims(), [2, 256, 8, 8]);
    }
}
