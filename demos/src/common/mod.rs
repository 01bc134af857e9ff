//! Common utilities for the demos.

mod backend;
pub mod image;
pub mod synthetic;

pub use backend::{backend_name, create_device, SelectedBackend, SelectedDevice};
