//! # GSCNN-Burn
//!
//! This crate provides the layers of a Gated Shape CNN segmentation head,
//! built using the Burn deep learning framework. A regular stream of backbone
//! features is fused with a dedicated shape stream that predicts object
//! boundaries, so that boundary information sharpens the dense prediction.
//!
//! ## Modules
//!
//! - `config`: Enumerations shared by the layer configurations.
//! - `error`: Defines the custom error types used throughout the crate.
//! - `models`: Implements the layers, the shape stream and the composed head.
//!
//! ## Key Components
//!
//! - `GatedScnn`: The composed head.
//! - `GatedScnnConfig`: The configuration that drives its construction.
//! - `GscnnError`: The enum for all possible errors.
//!
//! All tensors use Burn's `[batch, channels, height, width]` layout.

mod config;
mod error;
mod models;

#[cfg(test)]
mod tests;

#[doc(inline)]
pub use config::{Activation, ResizeMode};
#[doc(inline)]
pub use error::{GscnnError, GscnnResult};
#[doc(inline)]
pub use models::{
    gscnn::{GatedScnn, GatedScnnConfig, GatedScnnInput, GatedScnnOutput, GatedScnnRecord},
    modules::{
        AtrousBranch, AtrousBranchConfig, AtrousConv, AtrousConvConfig, AtrousPyramidPooling,
        AtrousPyramidPoolingConfig, FinalLogitLayer, FinalLogitLayerConfig, GateConv,
        GateConvConfig, GatedShapeConv, GatedShapeConvConfig, ResnetPreactUnit,
        ResnetPreactUnitConfig, Resize, ResizeConfig, ASPP_INTERMEDIATE_CHANNELS,
        ASPP_REDUCED_CHANNELS, resize_to,
    },
    shape_stream::{
        ShapeAttention, ShapeAttentionConfig, ShapeStream, ShapeStreamConfig, ShapeStreamOutput,
        SHAPE_STREAM_CHANNELS, SHAPE_TOWER_DEPTHS,
    },
};
