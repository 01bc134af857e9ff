//! # Image Gradients
//!
//! Sobel gradient magnitude of an image batch. The result is the kind of raw
//! edge map a shape stream consumes next to its learned boundary features.

use burn::{
    prelude::*,
    tensor::{module::conv2d, ops::ConvOptions},
};

const SOBEL_X: [[f32; 3]; 3] = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
const SOBEL_Y: [[f32; 3]; 3] = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];

/// Configuration for the `ImageGradient` operator.
#[derive(Config, Debug)]
pub struct ImageGradientConfig {
    /// Binarize the magnitude: values above the threshold become 1, others 0.
    #[config(default = "None")]
    pub threshold: Option<f64>,
}

impl ImageGradientConfig {
    /// Initializes a new `ImageGradient` operator.
    pub const fn init(&self) -> ImageGradient {
        ImageGradient {
            threshold: self.threshold,
        }
    }
}

/// Sobel edge detector without learned parameters.
#[derive(Debug, Clone)]
pub struct ImageGradient {
    threshold: Option<f64>,
}

impl ImageGradient {
    /// Computes the gradient magnitude of the channel-averaged image.
    ///
    /// The border is zero padded so the output keeps the input resolution.
    ///
    /// # Shapes
    /// - input: `[batch_size, channels, height, width]`
    /// - output: `[batch_size, 1, height, width]`
    pub fn forward<B: Backend>(&self, image: Tensor<B, 4>) -> Tensor<B, 4> {
        let device = image.device();
        let gray = image.mean_dim(1);

        let options = || ConvOptions::new([1, 1], [1, 1], [1, 1], 1);
        let kernel_x = Tensor::<B, 2>::from_floats(SOBEL_X, &device).reshape([1, 1, 3, 3]);
        let kernel_y = Tensor::<B, 2>::from_floats(SOBEL_Y, &device).reshape([1, 1, 3, 3]);

        let gx = conv2d(gray.clone(), kernel_x, None, options());
        let gy = conv2d(gray, kernel_y, None, options());
        let magnitude = (gx.powf_scalar(2.0) + gy.powf_scalar(2.0)).sqrt();

        match self.threshold {
            Some(threshold) => magnitude.greater_elem(threshold).float(),
            None => magnitude,
        }
    }
}

/// Sobel gradient magnitude with default settings.
pub fn image_gradient<B: Backend>(image: Tensor<B, 4>) -> Tensor<B, 4> {
    ImageGradientConfig::new().init().forward(image)
}
