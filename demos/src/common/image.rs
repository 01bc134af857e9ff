//! Image loading and saving for the demos.

use std::path::Path;

use anyhow::{Context, Result};
use burn::tensor::{backend::Backend, DType, ElementConversion, Tensor, TensorData};
use image::{buffer::ConvertBuffer, GenericImageView, GrayImage, ImageBuffer, Luma};

/// Loads an image as a `[1, 3, height, width]` tensor with values in `[0, 1]`.
pub fn load_image<B: Backend, P: AsRef<Path>>(path: P, device: &B::Device) -> Result<Tensor<B, 4>> {
    let img = image::open(&path)
        .with_context(|| format!("Failed to open image at {}", path.as_ref().display()))?;
    let (width, height) = img.dimensions();
    let buf = img.into_rgb32f().into_raw();

    let data =
        TensorData::new(buf, [height as usize, width as usize, 3]).convert::<B::FloatElem>();
    let tensor = Tensor::<B, 3>::from_data(data, device);

    Ok(tensor.permute([2, 0, 1]).unsqueeze::<4>())
}

/// Saves channel 0 of batch item `index` as a grayscale image.
///
/// Values are scaled by the map's maximum so that edge magnitudes and
/// attention maps both use the full range.
pub fn save_map<B: Backend, P: AsRef<Path>>(
    map: Tensor<B, 4>,
    index: usize,
    path: P,
) -> Result<()> {
    let [batch, _, height, width] = map.dims();
    anyhow::ensure!(index < batch, "Batch index {index} out of range for {batch} items");

    let map = map.slice([index..index + 1, 0..1, 0..height, 0..width]);
    let max = map.clone().max().into_scalar().elem::<f32>();
    let map = if max > 0.0 { map.div_scalar(max) } else { map };

    let data = map
        .reshape([height * width])
        .into_data()
        .convert_dtype(DType::F32)
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("Failed to convert tensor to f32: {:#?}", e))?;
    let buffer = ImageBuffer::<Luma<f32>, _>::from_raw(width as u32, height as u32, data)
        .context("Failed to create grayscale f32 image buffer")?;
    let img: GrayImage = buffer.convert();

    img.save(&path)
        .with_context(|| format!("Failed to save image to {}", path.as_ref().display()))
}
