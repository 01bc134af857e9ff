//! # Configuration
//!
//! Enumerations shared by the layer configurations. The layer configs
//! themselves live next to their modules and follow Burn's `Config` → `init`
//! convention.

mod enums;

pub use enums::{Activation, ResizeMode};
