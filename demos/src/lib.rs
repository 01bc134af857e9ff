//! GSCNN Demos
//!
//! This crate provides command line demos for the Gated Shape CNN head:
//! building it from a JSON configuration, feeding it synthetic backbone
//! activations together with edges computed from a real image, and writing
//! the boundary maps it predicts.
//!
//! ## Usage
//!
//! ```bash
//! # Print the default configuration
//! cargo run --bin gscnn -- config > gscnn.json
//!
//! # Run a forward pass on an image
//! cargo run --release --bin gscnn -- forward --config gscnn.json --image image.jpg --output outputs/
//! ```

pub mod common;
pub mod config;

pub use common::{backend_name, create_device, SelectedBackend, SelectedDevice};
pub use config::DemoConfig;
