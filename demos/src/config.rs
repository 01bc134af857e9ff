//! Configuration for the demos.
//!
//! The model part is the library's own `GatedScnnConfig`; the rest describes
//! the synthetic backbone that feeds it.

use std::{fs, path::Path};

use anyhow::{ensure, Context, Result};
use gscnn_burn::GatedScnnConfig;
use serde::{Deserialize, Serialize};

/// Channels of the four synthetic shape stream activations.
pub const SHAPE_FEATURE_CHANNELS: [usize; 4] = [256, 256, 512, 1024];
/// Channels of the synthetic backbone's final feature map.
pub const BACKBONE_CHANNELS: usize = 512;
/// Channels of the synthetic intermediate representation.
pub const INTERMEDIATE_CHANNELS: usize = 256;

/// Configuration of a demo run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// The head to build.
    pub model: GatedScnnConfig,
    /// Number of images per forward pass.
    pub batch_size: usize,
    /// Seed for the backend's random generator.
    pub seed: u64,
    /// Downsampling of the four shape stream activations relative to the image.
    pub shape_feature_strides: [usize; 4],
    /// Downsampling of the backbone's final feature map.
    pub backbone_stride: usize,
    /// Downsampling of the intermediate representation.
    pub intermediate_stride: usize,
    /// Binarize edges above this gradient magnitude.
    pub edge_threshold: Option<f64>,
}

impl DemoConfig {
    /// Default configuration for square images of `image_size` pixels.
    pub fn new(image_size: usize) -> Self {
        Self {
            model: GatedScnnConfig::for_inputs(
                [image_size, image_size],
                [image_size, image_size],
                SHAPE_FEATURE_CHANNELS,
                BACKBONE_CHANNELS,
                INTERMEDIATE_CHANNELS,
            ),
            batch_size: 1,
            seed: 42,
            shape_feature_strides: [8, 4, 2, 1],
            backbone_stride: 8,
            intermediate_stride: 4,
            edge_threshold: None,
        }
    }

    /// Reads a configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = serde_json::from_str::<Self>(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// `[height, width]` of the dense output, which is also the input image size.
    pub const fn image_size(&self) -> [usize; 2] {
        [self.model.head.height, self.model.head.width]
    }

    /// `[height, width]` of the shape stream's attention map.
    pub const fn shape_size(&self) -> [usize; 2] {
        let attention = &self.model.shape_stream.attention;
        [attention.height, attention.width]
    }

    /// Checks the model and that every stride yields a non-empty map.
    pub fn validate(&self) -> Result<()> {
        self.model.validate().context("Invalid model configuration")?;
        ensure!(self.batch_size > 0, "Batch size must be positive");

        let [height, width] = self.image_size();
        let strides = self
            .shape_feature_strides
            .iter()
            .chain([&self.backbone_stride, &self.intermediate_stride]);
        for &stride in strides {
            ensure!(
                stride > 0 && height / stride > 0 && width / stride > 0,
                "Stride {stride} is too large for a {height}x{width} image"
            );
        }
        Ok(())
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self::new(256)
    }
}
