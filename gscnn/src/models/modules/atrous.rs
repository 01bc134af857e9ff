//! # Atrous Convolution
//!
//! Dilated convolution preceded by explicit zero padding of `rate` pixels,
//! which keeps the spatial size of a 3x3 kernel at any dilation rate.

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        PaddingConfig2d, Relu,
    },
    prelude::*,
};
use burn_extra_ops::{ZeroPad2d, ZeroPad2dConfig};

use crate::{
    config::Activation,
    error::{GscnnError, GscnnResult},
};

/// Configuration for the `AtrousConv` module.
#[derive(Config, Debug)]
pub struct AtrousConvConfig {
    /// Number of input channels.
    pub in_channels: usize,
    /// Number of filters (output channels).
    pub filters: usize,
    /// Dilation rate, also the zero padding on every side.
    pub rate: usize,
    /// Kernel size. Only 3 preserves the spatial size.
    #[config(default = "3")]
    pub kernel_size: usize,
    /// Whether the convolution has a bias.
    #[config(default = "true")]
    pub bias: bool,
    /// Activation applied to the convolution output.
    #[config(default = "Activation::Identity")]
    pub activation: Activation,
}

impl AtrousConvConfig {
    /// Checks the rate and kernel size.
    pub fn validate(&self) -> GscnnResult<()> {
        if self.rate == 0 {
            return Err(GscnnError::InvalidConfiguration {
                reason: "atrous rate must be at least 1".to_string(),
            });
        }
        if self.kernel_size != 3 {
            return Err(GscnnError::InvalidConfiguration {
                reason: format!(
                    "atrous convolution padded by its rate needs a 3x3 kernel, got {}x{}",
                    self.kernel_size, self.kernel_size
                ),
            });
        }
        Ok(())
    }

    /// Initializes a new `AtrousConv` module.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> GscnnResult<AtrousConv<B>> {
        self.validate()?;

        let pad = ZeroPad2dConfig::new(self.rate).init();
        let convolution = Conv2dConfig::new(
            [self.in_channels, self.filters],
            [self.kernel_size, self.kernel_size],
        )
        .with_dilation([self.rate, self.rate])
        .with_padding(PaddingConfig2d::Valid)
        .with_bias(self.bias)
        .init(device);
        let relu = match self.activation {
            Activation::Relu => Some(Relu::new()),
            Activation::Identity => None,
        };

        Ok(AtrousConv {
            rate: self.rate,
            pad,
            convolution,
            relu,
        })
    }
}

/// Dilated convolution with explicit zero padding.
#[derive(Module, Debug)]
pub struct AtrousConv<B: Backend> {
    rate: usize,
    pad: ZeroPad2d,
    convolution: Conv2d<B>,
    relu: Option<Relu>,
}

impl<B: Backend> AtrousConv<B> {
    /// The dilation rate.
    pub const fn rate(&self) -> usize {
        self.rate
    }

    /// # Shapes
    /// - input: `[batch_size, in_channels, height, width]`
    /// - output: `[batch_size, filters, height, width]`
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.convolution.forward(self.pad.forward(x));
        match &self.relu {
            Some(relu) => relu.forward(x),
            None => x,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{backend::NdArray, tensor::Distribution};

    type TestBackend = NdArray<f32>;

    #[test]
    fn atrous_conv_preserves_spatial_size_at_any_rate() {
        let device = Default::default();

        for rate in [1, 2, 6, 12, 18] {
            let conv = AtrousConvConfig::new(3, 5, rate)
                .init::<TestBackend>(&device)
                .unwrap();
            let x = Tensor::random([1, 3, 20, 13], Distribution::Default, &device);

            assert_eq!(conv.forward(x).dims(), [1, 5, 20, 13], "rate {rate}");
        }
    }

    #[test]
    fn relu_activation_clamps_negative_responses() {
        let device = Default::default();
        let conv = AtrousConvConfig::new(2, 4, 6)
            .with_bias(false)
            .with_activation(Activation::Relu)
            .init::<TestBackend>(&device)
            .unwrap();
        let x = Tensor::random([2, 2, 9, 9], Distribution::Normal(0.0, 1.0), &device);

        let y = conv.forward(x);

        assert!(y.min().into_scalar() >= 0.0);
    }

    #[test]
    fn zero_input_without_bias_gives_zero_output() {
        let device = Default::default();
        let conv = AtrousConvConfig::new(4, 4, 12)
            .with_bias(false)
            .init::<TestBackend>(&device)
            .unwrap();
        let x = Tensor::<TestBackend, 4>::zeros([1, 4, 7, 7], &device);

        assert_eq!(conv.forward(x).abs().max().into_scalar(), 0.0);
    }

    #[test]
    fn invalid_kernel_and_rate_are_rejected() {
        assert!(AtrousConvConfig::new(1, 1, 2)
            .with_kernel_size(5)
            .validate()
            .is_err());
        assert!(AtrousConvConfig::new(1, 1, 0).validate().is_err());
        assert!(AtrousConvConfig::new(1, 1, 18).validate().is_ok());
    }
}
