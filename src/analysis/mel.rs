//! Mel power spectrogram in decibels, referenced to the loudest cell.
//!
//! Frames are centred with zero padding, windowed with a periodic Hann
//! window and mapped onto a Slaney-scale, area-normalised mel filterbank,
//! so the output lines up with the spectrograms the classifier was
//! trained on.

use std::f64::consts::PI;

use ndarray::Array2;
use rustfft::{FftPlanner, num_complex::Complex32};

use super::Waveform;
use crate::evaluation::EvaluationError;

pub const N_FFT: usize = 2048;
pub const HOP_LENGTH: usize = 512;
pub const N_MELS: usize = 128;
/// Floor applied to power before taking the logarithm.
pub const AMIN: f32 = 1e-10;
/// Dynamic range kept below the loudest cell.
pub const TOP_DB: f32 = 80.0;

/// Decibel-scaled mel spectrogram, shaped `(N_MELS, frames)` with mel band 0
/// being the lowest frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct MelSpectrogram {
    db: Array2<f32>,
}

impl MelSpectrogram {
    pub fn db(&self) -> &Array2<f32> {
        &self.db
    }

    pub fn n_mels(&self) -> usize {
        self.db.nrows()
    }

    pub fn frames(&self) -> usize {
        self.db.ncols()
    }

    /// Smallest and largest decibel value, `None` for an empty matrix.
    pub fn db_range(&self) -> Option<(f32, f32)> {
        let mut iter = self.db.iter().copied();
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}

/// Compute the decibel mel spectrogram of the whole waveform.
pub fn mel_spectrogram_db(waveform: &Waveform) -> Result<MelSpectrogram, EvaluationError> {
    let samples = waveform.samples();
    if samples.len() < N_FFT {
        return Err(EvaluationError::SpectrogramComputation {
            reason: format!(
                "waveform has {} samples, shorter than the {N_FFT}-sample analysis window",
                samples.len()
            ),
        });
    }
    if samples.iter().any(|s| !s.is_finite()) {
        return Err(EvaluationError::SpectrogramComputation {
            reason: "waveform contains non-finite samples".to_string(),
        });
    }
    let power = stft_power(samples, N_FFT, HOP_LENGTH);
    let filters = slaney_mel_filterbank(waveform.sample_rate(), N_FFT, N_MELS);
    let mel_power = filters.dot(&power);
    Ok(MelSpectrogram {
        db: power_to_db(mel_power),
    })
}

/// Power spectra shaped `(N_FFT / 2 + 1, frames)`.
fn stft_power(samples: &[f32], n_fft: usize, hop: usize) -> Array2<f32> {
    let pad = n_fft / 2;
    let frames = 1 + samples.len() / hop;
    let bins = n_fft / 2 + 1;
    let window = periodic_hann(n_fft);
    let fft = FftPlanner::<f32>::new().plan_fft_forward(n_fft);
    let mut buffer = vec![Complex32::default(); n_fft];
    let mut power = Array2::<f32>::zeros((bins, frames));
    for frame in 0..frames {
        let start = (frame * hop) as isize - pad as isize;
        for (i, cell) in buffer.iter_mut().enumerate() {
            let idx = start + i as isize;
            let sample = if idx >= 0 {
                samples.get(idx as usize).copied().unwrap_or(0.0)
            } else {
                0.0
            };
            *cell = Complex32::new(sample * window[i], 0.0);
        }
        fft.process(&mut buffer);
        for bin in 0..bins {
            power[[bin, frame]] = buffer[bin].norm_sqr();
        }
    }
    power
}

fn periodic_hann(length: usize) -> Vec<f32> {
    (0..length)
        .map(|n| (0.5 - 0.5 * (2.0 * PI * n as f64 / length as f64).cos()) as f32)
        .collect()
}

/// Triangular Slaney filters shaped `(n_mels, n_fft / 2 + 1)` spanning
/// 0 Hz to Nyquist.
fn slaney_mel_filterbank(sample_rate: u32, n_fft: usize, n_mels: usize) -> Array2<f32> {
    let bins = n_fft / 2 + 1;
    let nyquist = sample_rate as f64 / 2.0;
    let fft_freqs: Vec<f64> = (0..bins)
        .map(|bin| bin as f64 * sample_rate as f64 / n_fft as f64)
        .collect();
    let mel_max = hz_to_mel(nyquist);
    let mel_points: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_max * i as f64 / (n_mels + 1) as f64))
        .collect();

    let mut weights = Array2::<f32>::zeros((n_mels, bins));
    for m in 0..n_mels {
        let (lower, center, upper) = (mel_points[m], mel_points[m + 1], mel_points[m + 2]);
        let enorm = 2.0 / (upper - lower);
        for (bin, &freq) in fft_freqs.iter().enumerate() {
            let rising = (freq - lower) / (center - lower);
            let falling = (upper - freq) / (upper - center);
            let w = rising.min(falling).max(0.0);
            weights[[m, bin]] = (w * enorm) as f32;
        }
    }
    weights
}

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1_000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4_f64.ln() / 27.0
}

fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

fn power_to_db(mut power: Array2<f32>) -> Array2<f32> {
    let reference = power.iter().copied().fold(0.0_f32, f32::max);
    let ref_db = 10.0 * reference.max(AMIN).log10();
    power.mapv_inplace(|p| 10.0 * p.max(AMIN).log10() - ref_db);
    let floor = power.iter().copied().fold(f32::NEG_INFINITY, f32::max) - TOP_DB;
    power.mapv_inplace(|db| db.max(floor));
    power
}
