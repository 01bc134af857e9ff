//! # Resize
//!
//! Spatial resizing of feature maps. Every fusion point in the network that
//! combines maps from different backbone stages resizes one side first.
//!
//! Resizing is separable: each spatial axis is multiplied by an
//! `[out, in]` interpolation matrix built on the host. Sample positions use
//! half-pixel centres and source indices are clamped to the input, so every
//! `(in, out)` pair is valid and the result is differentiable on any backend.

use burn::{module::Ignored, prelude::*, tensor::TensorData};

use crate::config::ResizeMode;

/// Keys cubic convolution coefficient.
const CUBIC_COEFF: f32 = -0.5;

/// Configuration for the `Resize` layer.
#[derive(Config, Debug)]
pub struct ResizeConfig {
    /// Target height.
    pub height: usize,
    /// Target width.
    pub width: usize,
    /// Interpolation mode, fixed for the lifetime of the layer.
    #[config(default = "ResizeMode::Bilinear")]
    pub mode: ResizeMode,
}

impl ResizeConfig {
    /// Initializes a new `Resize` layer.
    pub fn init(&self) -> Resize {
        Resize {
            height: self.height,
            width: self.width,
            mode: Ignored(self.mode),
        }
    }
}

/// Resizes `[batch, channels, height, width]` tensors to a fixed spatial size.
#[derive(Module, Clone, Debug)]
pub struct Resize {
    height: usize,
    width: usize,
    mode: Ignored<ResizeMode>,
}

impl Resize {
    /// The `[height, width]` this layer resizes to.
    pub const fn target(&self) -> [usize; 2] {
        [self.height, self.width]
    }

    /// The interpolation mode.
    pub const fn mode(&self) -> ResizeMode {
        self.mode.0
    }

    /// Resizes `x` to the configured target.
    ///
    /// # Shapes
    /// - input: `[batch_size, channels, height, width]`
    /// - output: `[batch_size, channels, target_height, target_width]`
    pub fn forward<B: Backend>(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.forward_to(x, self.target())
    }

    /// Resizes `x` to an explicit target with this layer's interpolation mode.
    pub fn forward_to<B: Backend>(&self, x: Tensor<B, 4>, size: [usize; 2]) -> Tensor<B, 4> {
        resize_to(x, size, self.mode())
    }
}

/// Resizes `x` to `[height, width]` with the given interpolation mode.
///
/// Returns `x` untouched when it already has the requested size.
pub fn resize_to<B: Backend>(
    x: Tensor<B, 4>,
    size: [usize; 2],
    mode: ResizeMode,
) -> Tensor<B, 4> {
    let [batch, channels, h, w] = x.dims();
    let [out_h, out_w] = size;
    if [h, w] == size {
        return x;
    }
    log::trace!("resize [{h}, {w}] -> {size:?}");

    let device = x.device();

    let x = if w == out_w {
        x
    } else {
        let weights = interpolation_matrix::<B>(w, out_w, mode, &device);
        x.reshape([batch * channels * h, w])
            .matmul(weights.transpose())
            .reshape([batch, channels, h, out_w])
    };

    if h == out_h {
        return x;
    }
    let weights = interpolation_matrix::<B>(h, out_h, mode, &device);
    x.swap_dims(2, 3)
        .reshape([batch * channels * out_w, h])
        .matmul(weights.transpose())
        .reshape([batch, channels, out_w, out_h])
        .swap_dims(2, 3)
}

fn interpolation_matrix<B: Backend>(
    input: usize,
    output: usize,
    mode: ResizeMode,
    device: &B::Device,
) -> Tensor<B, 2> {
    let values = interpolation_weights(input, output, mode);
    let data = TensorData::new(values, [output, input]).convert::<B::FloatElem>();

    Tensor::from_data(data, device)
}

/// Row-major `[output, input]` weights; every row sums to one.
fn interpolation_weights(input: usize, output: usize, mode: ResizeMode) -> Vec<f32> {
    let scale = input as f32 / output as f32;
    let last = input as isize - 1;
    let mut weights = vec![0.0f32; output * input];

    for o in 0..output {
        let row = &mut weights[o * input..(o + 1) * input];
        let mut add = |i: isize, weight: f32| row[i.clamp(0, last) as usize] += weight;

        match mode {
            ResizeMode::Nearest => {
                add(((o as f32 + 0.5) * scale).floor() as isize, 1.0);
            }
            ResizeMode::Bilinear => {
                let src = (o as f32 + 0.5) * scale - 0.5;
                let base = src.floor();
                let frac = src - base;
                add(base as isize, 1.0 - frac);
                add(base as isize + 1, frac);
            }
            ResizeMode::Bicubic => {
                let src = (o as f32 + 0.5) * scale - 0.5;
                let base = src.floor();
                let frac = src - base;
                for tap in -1..=2 {
                    add(base as isize + tap, cubic(tap as f32 - frac));
                }
            }
        }
    }

    weights
}

fn cubic(distance: f32) -> f32 {
    let a = CUBIC_COEFF;
    let x = distance.abs();
    if x <= 1.0 {
        ((a + 2.0) * x - (a + 3.0)) * x * x + 1.0
    } else if x < 2.0 {
        ((a * x - 5.0 * a) * x + 8.0 * a) * x - 4.0 * a
    } else {
        0.0
    }
}
