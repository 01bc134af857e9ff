//! # Zero Padding
//!
//! Explicit zero padding of the spatial dimensions, used in front of convolutions
//! that are configured without implicit padding.

use burn::prelude::*;

/// Configuration for the `ZeroPad2d` module.
#[derive(Config, Debug)]
pub struct ZeroPad2dConfig {
    /// Number of zero rows/columns added on every spatial side.
    pub padding: usize,
}

impl ZeroPad2dConfig {
    /// Initializes a new `ZeroPad2d` module.
    pub const fn init(&self) -> ZeroPad2d {
        ZeroPad2d {
            padding: self.padding,
        }
    }
}

/// Pads height and width symmetrically with zeros.
#[derive(Module, Clone, Debug)]
pub struct ZeroPad2d {
    padding: usize,
}

impl ZeroPad2d {
    /// The padding applied on each side.
    pub const fn padding(&self) -> usize {
        self.padding
    }

    /// Applies the padding.
    ///
    /// # Shapes
    /// - input: `[batch_size, channels, height, width]`
    /// - output: `[batch_size, channels, height + 2p, width + 2p]`
    pub fn forward<B: Backend>(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        if self.padding == 0 {
            return x;
        }
        let p = self.padding;

        x.pad((p, p, p, p), 0.0)
    }
}
