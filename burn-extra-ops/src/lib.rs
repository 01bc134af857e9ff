//! Additional operations for the Burn deep learning framework
//!
//! This crate provides operations that are commonly used in dense-prediction
//! networks but are not available as ready-made layers in the core Burn framework.

use burn::prelude::*;

mod gradient;
mod pooling;
mod zero_pad;

// Convenient re-exports
pub use gradient::{image_gradient, ImageGradient, ImageGradientConfig};
pub use pooling::global_avg_pool2d;
pub use zero_pad::{ZeroPad2d, ZeroPad2dConfig};

/// Additional operations for Burn tensors
pub trait TensorExtraOps<B: Backend> {
    /// Pad both spatial dimensions of a `[batch, channels, height, width]` tensor with zeros.
    fn zero_pad2d(self, padding: usize) -> Self;

    /// Average over both spatial dimensions, keeping them as size 1.
    fn global_avg_pool2d(self) -> Self;
}

impl<B: Backend> TensorExtraOps<B> for Tensor<B, 4> {
    fn zero_pad2d(self, padding: usize) -> Self {
        ZeroPad2dConfig::new(padding).init().forward(self)
    }

    fn global_avg_pool2d(self) -> Self {
        global_avg_pool2d(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{
        backend::{ndarray::NdArray, Autodiff},
        tensor::Tensor,
    };

    type TestBackend = Autodiff<NdArray<f32>>;

    #[test]
    fn test_tensor_extra_ops() {
        let device = Default::default();
        let tensor = Tensor::<TestBackend, 4>::random(
            [2, 3, 4, 5],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            &device,
        );

        assert_eq!(tensor.clone().zero_pad2d(2).dims(), [2, 3, 8, 9]);
        assert_eq!(tensor.global_avg_pool2d().dims(), [2, 3, 1, 1]);
    }
}
