//! Turns the spectrogram raster into the classifier's input tensor.

use image::imageops::{self, FilterType};
use ndarray::Array4;

use super::{IMAGE_SIZE, SpectrogramImage};
use crate::evaluation::EvaluationError;

/// Resampling filter used when the raster is not already `IMAGE_SIZE` square.
pub const RESIZE_FILTER: FilterType = FilterType::CatmullRom;

/// Channel-last input tensor shaped `(1, IMAGE_SIZE, IMAGE_SIZE, 3)` with
/// values in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierInput {
    tensor: Array4<f32>,
}

impl ClassifierInput {
    /// Shape of every tensor produced by [`preprocess_image`].
    pub const SHAPE: [usize; 4] = [1, IMAGE_SIZE as usize, IMAGE_SIZE as usize, 3];

    pub fn tensor(&self) -> &Array4<f32> {
        &self.tensor
    }

    /// Values in row-major `(batch, row, column, channel)` order.
    pub fn to_flat_vec(&self) -> Vec<f32> {
        self.tensor.iter().copied().collect()
    }

    pub fn mean(&self) -> f32 {
        self.tensor.mean().unwrap_or(0.0)
    }
}

/// Decode the raster, force RGB, resize to `IMAGE_SIZE`² and scale channels
/// linearly from `[0, 255]` to `[0, 1]`.
pub fn preprocess_image(image: &SpectrogramImage) -> Result<ClassifierInput, EvaluationError> {
    let decoded = image::load_from_memory(image.as_bytes())
        .map_err(|err| EvaluationError::ImageDecode {
            reason: err.to_string(),
        })?
        .to_rgb8();
    let rgb = if decoded.dimensions() == (IMAGE_SIZE, IMAGE_SIZE) {
        decoded
    } else {
        imageops::resize(&decoded, IMAGE_SIZE, IMAGE_SIZE, RESIZE_FILTER)
    };
    // Plain division by 255, matching the normalisation the weights were trained with.
    let tensor = Array4::from_shape_fn(ClassifierInput::SHAPE, |(_, row, col, channel)| {
        rgb.get_pixel(col as u32, row as u32).0[channel] as f32 / 255.0
    });
    Ok(ClassifierInput { tensor })
}
