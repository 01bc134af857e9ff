//! Global pooling helpers.

use burn::prelude::*;

/// Global average pooling over height and width.
///
/// Equivalent to a spatial mean with kept dimensions, so the result can be
/// resized back onto the input grid.
///
/// # Shapes
/// - input: `[batch_size, channels, height, width]`
/// - output: `[batch_size, channels, 1, 1]`
pub fn global_avg_pool2d<B: Backend>(x: Tensor<B, 4>) -> Tensor<B, 4> {
    x.mean_dim(2).mean_dim(3)
}
