use burn::{
    backend::{Autodiff, NdArray},
    module::AutodiffModule,
    prelude::*,
    tensor::Distribution,
};

use crate::{
    GatedScnn, GatedScnnConfig, GatedScnnInput, GscnnError, ResizeMode, ShapeAttentionConfig,
    ShapeStreamConfig,
};

type TestBackend = NdArray<f32>;
type TestAutodiffBackend = Autodiff<TestBackend>;

const SHAPE_CHANNELS: [usize; 4] = [16, 16, 16, 16];
const BACKBONE_CHANNELS: usize = 32;
const INTERMEDIATE_CHANNELS: usize = 24;

fn small_config() -> GatedScnnConfig {
    GatedScnnConfig::for_inputs(
        [64, 64],
        [32, 32],
        SHAPE_CHANNELS,
        BACKBONE_CHANNELS,
        INTERMEDIATE_CHANNELS,
    )
}

fn input<B: Backend>(
    batch: usize,
    distribution: Distribution,
    device: &B::Device,
) -> GatedScnnInput<B> {
    let tensor =
        |channels, size| Tensor::random([batch, channels, size, size], distribution, device);

    GatedScnnInput {
        shape_features: [
            tensor(16, 4),
            tensor(16, 8),
            tensor(16, 16),
            tensor(16, 32),
        ],
        edges: tensor(1, 32),
        backbone: tensor(BACKBONE_CHANNELS, 4),
        intermediate: tensor(INTERMEDIATE_CHANNELS, 16),
    }
}

fn zero_input(batch: usize, device: &Device<TestBackend>) -> GatedScnnInput<TestBackend> {
    let tensor = |channels, size| Tensor::zeros([batch, channels, size, size], device);

    GatedScnnInput {
        shape_features: [
            tensor(16, 4),
            tensor(16, 8),
            tensor(16, 16),
            tensor(16, 32),
        ],
        edges: tensor(1, 32),
        backbone: tensor(BACKBONE_CHANNELS, 4),
        intermediate: tensor(INTERMEDIATE_CHANNELS, 16),
    }
}

#[test]
fn shape_stream_matches_reference_resolutions() {
    let device = Default::default();
    let stream = ShapeStreamConfig::new(ShapeAttentionConfig::new(128, 128, [256; 4]))
        .init::<TestBackend>(&device)
        .unwrap();
    let features = [128, 64, 32, 16].map(|size| {
        Tensor::random([1, 256, size, size], Distribution::Normal(0.0, 1.0), &device)
    });
    let edges = Tensor::random([1, 1, 128, 128], Distribution::Default, &device);

    let out = stream.forward(features, edges).unwrap();

    assert_eq!(out.shape_attention.dims(), [1, 2, 128, 128]);
    assert_eq!(out.boundary.dims(), [1, 1, 128, 128]);
}

#[test]
fn gated_scnn_forward_produces_all_outputs() {
    let device = Default::default();
    let model: GatedScnn<TestBackend> = small_config().init(&device).unwrap();

    let out = model
        .forward(input(2, Distribution::Normal(0.0, 1.0), &device))
        .unwrap();

    assert_eq!(out.boundary.dims(), [2, 1, 32, 32]);
    assert_eq!(out.shape_attention.dims(), [2, 2, 32, 32]);
    assert_eq!(out.features.dims(), [2, 256, 64, 64]);
}

#[test]
fn zero_inputs_are_deterministic() {
    let device = Default::default();
    let model: GatedScnn<TestBackend> = small_config().init(&device).unwrap();

    let first = model.forward(zero_input(1, &device)).unwrap();
    let second = model.forward(zero_input(1, &device)).unwrap();

    for (a, b) in [
        (first.boundary, second.boundary),
        (first.shape_attention, second.shape_attention),
        (first.features, second.features),
    ] {
        assert_eq!((a - b).abs().max().into_scalar(), 0.0);
    }
}

#[test]
fn misaligned_edges_are_rejected() {
    let device = Default::default();
    let model: GatedScnn<TestBackend> = small_config().init(&device).unwrap();
    let mut input = zero_input(1, &device);
    input.edges = Tensor::zeros([1, 1, 64, 64], &device);

    assert!(matches!(
        model.forward(input),
        Err(GscnnError::ShapeMismatch { .. })
    ));
}

#[test]
fn head_must_consume_pyramid_output() {
    let config = small_config();
    let config = GatedScnnConfig {
        head: config.head.clone().with_in_channels(256),
        ..config
    };

    match config.validate() {
        Err(GscnnError::InvalidConfiguration { reason }) => {
            assert!(reason.contains("Final layer expects 256 channels"));
        }
        other => panic!("Expected InvalidConfiguration error, got {other:?}"),
    }
}

#[test]
fn pyramid_must_take_two_shape_channels() {
    let config = small_config();
    let config = GatedScnnConfig {
        aspp: config.aspp.clone().with_shape_channels(3),
        ..config
    };

    assert!(matches!(
        config.validate(),
        Err(GscnnError::InvalidConfiguration { .. })
    ));
}

#[test]
fn zero_atrous_rate_is_rejected() {
    let config = small_config();
    let config = GatedScnnConfig {
        aspp: config.aspp.clone().with_rates([6, 0, 18]),
        ..config
    };

    assert!(config.init::<TestBackend>(&Default::default()).is_err());
}

#[test]
fn default_configuration_is_valid() {
    assert!(small_config().validate().is_ok());
}

#[test]
fn training_step_propagates_gradients_and_valid_copy_runs() {
    let device = Default::default();
    let model: GatedScnn<TestAutodiffBackend> = small_config()
        .with_interpolation(ResizeMode::Nearest)
        .init(&device)
        .unwrap();

    let mut batch = input(2, Distribution::Normal(0.0, 1.0), &device);
    batch.backbone = batch.backbone.require_grad();
    let backbone = batch.backbone.clone();

    let out = model.forward(batch).unwrap();
    let loss = out.features.mean() + out.shape_attention.mean();
    let grads = loss.backward();
    assert!(backbone.grad(&grads).is_some());

    let valid = model.valid();
    let out = valid
        .forward(input(1, Distribution::Normal(0.0, 1.0), &device))
        .unwrap();
    assert_eq!(out.features.dims(), [1, 256, 64, 64]);
}

#[test]
fn single_image_training_batch_stays_finite() {
    let device = Default::default();
    let model: GatedScnn<TestAutodiffBackend> = small_config().init(&device).unwrap();

    let mut batch = input(1, Distribution::Normal(0.0, 1.0), &device);
    batch.backbone = batch.backbone.require_grad();
    let backbone = batch.backbone.clone();

    let out = model.forward(batch).unwrap();

    assert_eq!(out.features.dims(), [1, 256, 64, 64]);
    let boundary = out.boundary.sum().into_scalar();
    let attention = out.shape_attention.sum().into_scalar();
    let features = out.features.clone().sum().into_scalar();
    assert!(boundary.is_finite() && attention.is_finite() && features.is_finite());

    let grads = out.features.mean().backward();
    let grad = backbone.grad(&grads).map(|grad| grad.sum().into_scalar());
    assert!(grad.is_some_and(f32::is_finite));
}
