//! Shape contracts checked at the fusion points of the network.

use burn::prelude::*;

use crate::error::{GscnnError, GscnnResult};

/// Fails unless `x` has exactly `expected` channels.
pub fn ensure_channels<B: Backend>(
    x: &Tensor<B, 4>,
    expected: usize,
    layer: &str,
) -> GscnnResult<()> {
    let [_, channels, _, _] = x.dims();
    if channels != expected {
        return Err(GscnnError::ChannelMismatch {
            layer: layer.to_string(),
            expected,
            actual: channels,
        });
    }
    Ok(())
}

/// Fails unless `a` and `b` share batch size and spatial dimensions.
///
/// Channel counts may differ: this is the precondition of a channel concatenation.
pub fn ensure_same_grid<B: Backend>(
    a: &Tensor<B, 4>,
    b: &Tensor<B, 4>,
    operation: &str,
) -> GscnnResult<()> {
    let [ba, _, ha, wa] = a.dims();
    let [bb, _, hb, wb] = b.dims();
    if (ba, ha, wa) != (bb, hb, wb) {
        return Err(GscnnError::ShapeMismatch {
            operation: operation.to_string(),
            expected: format!("[{ba}, _, {ha}, {wa}]"),
            actual: format!("[{bb}, _, {hb}, {wb}]"),
        });
    }
    Ok(())
}

/// Fails unless `a` and `b` share the batch size.
pub fn ensure_same_batch<B: Backend>(
    a: &Tensor<B, 4>,
    b: &Tensor<B, 4>,
    operation: &str,
) -> GscnnResult<()> {
    let [ba, ..] = a.dims();
    let [bb, ..] = b.dims();
    if ba != bb {
        return Err(GscnnError::ShapeMismatch {
            operation: operation.to_string(),
            expected: format!("batch size {ba}"),
            actual: format!("batch size {bb}"),
        });
    }
    Ok(())
}

/// Concatenates on the channel axis after checking every operand against the first.
pub fn cat_channels<B: Backend>(
    tensors: Vec<Tensor<B, 4>>,
    operation: &str,
) -> GscnnResult<Tensor<B, 4>> {
    if let Some((first, rest)) = tensors.split_first() {
        for tensor in rest {
            ensure_same_grid(first, tensor, operation)?;
        }
    }
    Ok(Tensor::cat(tensors, 1))
}
