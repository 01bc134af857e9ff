//! # Model Architectures
//!
//! This module aggregates the layers of the Gated Shape CNN head.
//! It is organized into sub-modules for clarity:
//!
//! - `modules`: Building blocks such as resizing, gated fusion, residual units,
//!   atrous convolutions, the atrous pyramid and the final refinement layer.
//! - `shape_stream`: The boundary attention tower and the shape stream around it.
//! - `gscnn`: The full head wiring both streams together.

pub mod gscnn;
pub mod modules;
pub mod shape_stream;
