//! Compile-time backend choice.
//!
//! `cuda` wins over `wgpu`, which wins over the default `ndarray` CPU backend.

use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(feature = "cuda")] {
        use burn::backend::cuda::{Cuda, CudaDevice};

        /// Backend the demos run on.
        pub type SelectedBackend = Cuda;
        pub type SelectedDevice = CudaDevice;

        /// Default device of the backend.
        pub fn create_device() -> SelectedDevice {
            CudaDevice::default()
        }

        pub const fn backend_name() -> &'static str {
            "CUDA (NVIDIA GPU)"
        }
    } else if #[cfg(feature = "wgpu")] {
        use burn::backend::wgpu::{Wgpu, WgpuDevice};

        /// Backend the demos run on.
        pub type SelectedBackend = Wgpu;
        pub type SelectedDevice = WgpuDevice;

        /// Default device of the backend.
        pub fn create_device() -> SelectedDevice {
            WgpuDevice::default()
        }

        pub const fn backend_name() -> &'static str {
            "WGPU (GPU)"
        }
    } else {
        use burn::backend::ndarray::{NdArray, NdArrayDevice};

        /// Backend the demos run on.
        pub type SelectedBackend = NdArray;
        pub type SelectedDevice = NdArrayDevice;

        /// Default device of the backend.
        pub fn create_device() -> SelectedDevice {
            NdArrayDevice::default()
        }

        pub const fn backend_name() -> &'static str {
            "NdArray (CPU)"
        }
    }
}
