//! Headless rasterization of a decibel mel spectrogram into a fixed-size
//! magma PNG, filling the whole canvas with no axes or padding.

mod colormap;

use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};

use super::mel::{MelSpectrogram, mel_spectrogram_db};
use super::{IMAGE_SIZE, Waveform};
use crate::evaluation::EvaluationError;

/// PNG-encoded spectrogram raster held in memory for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpectrogramImage {
    png: Vec<u8>,
    width: u32,
    height: u32,
}

impl SpectrogramImage {
    /// Wrap an already encoded buffer, e.g. one read back from a debug dump.
    pub fn from_encoded(png: Vec<u8>, width: u32, height: u32) -> Self {
        Self { png, width, height }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

/// Waveform to raster in one step: mel spectrogram, then [`render_spectrogram`].
pub fn generate_spectrogram(waveform: &Waveform) -> Result<SpectrogramImage, EvaluationError> {
    let mel = mel_spectrogram_db(waveform)?;
    render_spectrogram(&mel)
}

/// Rasterize `mel` to an `IMAGE_SIZE`×`IMAGE_SIZE` magma image.
///
/// Colours are normalised between the matrix minimum and maximum; a flat
/// matrix renders entirely in the lowest colour. Low frequencies sit at the
/// bottom row.
pub fn render_spectrogram(mel: &MelSpectrogram) -> Result<SpectrogramImage, EvaluationError> {
    let raster = rasterize(mel, IMAGE_SIZE, IMAGE_SIZE)?;
    let mut png = Vec::new();
    raster
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|err| EvaluationError::SpectrogramComputation {
            reason: format!("PNG encoding failed: {err}"),
        })?;
    Ok(SpectrogramImage {
        png,
        width: IMAGE_SIZE,
        height: IMAGE_SIZE,
    })
}

fn rasterize(mel: &MelSpectrogram, width: u32, height: u32) -> Result<RgbImage, EvaluationError> {
    let (lo, hi) = mel
        .db_range()
        .ok_or_else(|| EvaluationError::SpectrogramComputation {
            reason: "mel spectrogram is empty".to_string(),
        })?;
    let span = hi - lo;
    let db = mel.db();
    let (bands, frames) = (mel.n_mels(), mel.frames());
    Ok(RgbImage::from_fn(width, height, |x, y| {
        let frame = (x as usize * frames / width as usize).min(frames - 1);
        let from_bottom = (height - 1 - y) as usize;
        let band = (from_bottom * bands / height as usize).min(bands - 1);
        let t = if span > 0.0 {
            (db[[band, frame]] - lo) / span
        } else {
            0.0
        };
        Rgb(colormap::magma(t))
    }))
}
