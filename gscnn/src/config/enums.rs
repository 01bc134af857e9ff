//! Enumeration types for layer configuration.

use burn::prelude::*;

/// Interpolation used by every resize in the network.
///
/// All modes sample at half-pixel centres and clamp at the border.
#[derive(Config, Debug, PartialEq, Eq, Hash, Copy)]
pub enum ResizeMode {
    /// Bilinear interpolation.
    Bilinear,
    /// Nearest-neighbour interpolation.
    Nearest,
    /// Bicubic (Keys, `a = -0.5`) interpolation.
    Bicubic,
}

impl Default for ResizeMode {
    fn default() -> Self {
        Self::Bilinear
    }
}

/// Activation applied after a convolution.
#[derive(Config, Debug, PartialEq, Eq, Hash, Copy)]
pub enum Activation {
    /// No activation.
    Identity,
    /// Rectified linear unit.
    Relu,
}

impl Default for Activation {
    fn default() -> Self {
        Self::Identity
    }
}
