//! Audio-to-tensor stages of the evaluation pipeline (decoding, mel
//! spectrogram, rasterization, classifier preprocessing).

pub mod audio;
pub mod mel;
pub mod preprocess;
pub mod spectrogram;

/// Fixed sample rate every recording is resampled to before analysis.
pub const ANALYSIS_SAMPLE_RATE: u32 = 4_000;
/// Width and height of the spectrogram raster and the classifier input.
pub const IMAGE_SIZE: u32 = 128;

pub use audio::{load_waveform, load_waveform_from_bytes};
pub use mel::{MelSpectrogram, mel_spectrogram_db};
pub use preprocess::{ClassifierInput, preprocess_image};
pub use spectrogram::{SpectrogramImage, generate_spectrogram, render_spectrogram};

/// Decoded mono audio at [`ANALYSIS_SAMPLE_RATE`].
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Waveform {
    pub(crate) fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Wrap samples that are already mono at [`ANALYSIS_SAMPLE_RATE`].
    pub fn from_analysis_samples(samples: Vec<f32>) -> Self {
        Self::new(samples, ANALYSIS_SAMPLE_RATE)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_seconds(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate.max(1) as f32
    }
}
