//! Synthetic phonocardiograms for fixtures and smoke tests.
//!
//! Each beat carries Gaussian S1/S2 pulses over white noise whose level grows
//! with `severity`; any positive severity also adds a tonal murmur.

use std::f64::consts::PI;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

const S1_CENTER_SECS: f64 = 0.1;
const S2_CENTER_SECS: f64 = 0.6;
const PULSE_WIDTH_SECS: f64 = 0.01;
const MURMUR_AMPLITUDE: f64 = 0.02;
const SMOOTHING_TAPS: usize = 10;

/// Parameters of one generated recording.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PcgParams {
    pub sample_rate: u32,
    pub duration_secs: f64,
    pub bpm: f64,
    /// 0 is a healthy heart; 1 and 2 add progressively louder murmurs.
    pub severity: u32,
    pub seed: u64,
}

impl Default for PcgParams {
    fn default() -> Self {
        Self {
            sample_rate: 4_000,
            duration_secs: 10.0,
            bpm: 90.0,
            severity: 0,
            seed: 0,
        }
    }
}

impl PcgParams {
    pub fn with_severity(severity: u32) -> Self {
        Self {
            severity,
            ..Self::default()
        }
    }
}

/// Errors raised while generating or writing synthetic audio.
#[derive(Debug, Error)]
pub enum SynthError {
    /// Parameters that cannot produce a single beat.
    #[error("Invalid PCG parameters: {0}")]
    InvalidParams(String),
    /// The WAV file could not be written.
    #[error("Failed to write WAV: {0}")]
    Wav(#[from] hound::Error),
}

/// Generate a peak-normalized, lightly smoothed phonocardiogram.
pub fn generate_pcg(params: &PcgParams) -> Result<Vec<f32>, SynthError> {
    if params.sample_rate == 0 || !(params.bpm > 0.0) || !(params.duration_secs > 0.0) {
        return Err(SynthError::InvalidParams(format!("{params:?}")));
    }
    let beat_secs = 60.0 / params.bpm;
    let beats = (params.duration_secs / beat_secs) as usize;
    let beat_len = (params.sample_rate as f64 * beat_secs) as usize;
    if beats == 0 || beat_len < 2 {
        return Err(SynthError::InvalidParams(format!(
            "{params:?} yields no complete beat"
        )));
    }
    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut signal = Vec::with_capacity(beats * beat_len);
    for _ in 0..beats {
        push_beat(&mut signal, &mut rng, beat_len, beat_secs, params.severity);
    }
    let peak = signal.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if peak > 0.0 {
        for sample in &mut signal {
            *sample /= peak;
        }
    }
    Ok(moving_average_same(&signal, SMOOTHING_TAPS)
        .into_iter()
        .map(|v| v as f32)
        .collect())
}

/// Write mono 16-bit PCM, scaling `[-1, 1]` to the full integer range.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), SynthError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample((sample.clamp(-1.0, 1.0) * 32_767.0) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

fn push_beat(out: &mut Vec<f64>, rng: &mut StdRng, len: usize, secs: f64, severity: u32) {
    let noise_std = 0.02 + 0.05 * severity as f64;
    let murmur_hz = 100.0 * (1.0 + severity as f64);
    let step = secs / (len - 1) as f64;
    for i in 0..len {
        let t = i as f64 * step;
        let mut value = pulse(t, S1_CENTER_SECS) + pulse(t, S2_CENTER_SECS);
        value += gaussian(rng) * noise_std;
        if severity > 0 {
            value += MURMUR_AMPLITUDE * (2.0 * PI * murmur_hz * t).sin();
        }
        out.push(value);
    }
}

fn pulse(t: f64, center: f64) -> f64 {
    (-(t - center).powi(2) / (2.0 * PULSE_WIDTH_SECS * PULSE_WIDTH_SECS)).exp()
}

/// Standard normal sample via Box-Muller.
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1 = 1.0 - rng.random::<f64>();
    let u2 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Box filter aligned like a centered `same`-mode convolution: output `i`
/// sums inputs `i - taps/2 ..= i + taps/2 - 1`, treating samples past either
/// edge as zero, and divides by `taps`.
fn moving_average_same(signal: &[f64], taps: usize) -> Vec<f64> {
    let before = taps / 2;
    let after = taps - 1 - before;
    let mut prefix = Vec::with_capacity(signal.len() + 1);
    prefix.push(0.0);
    for &value in signal {
        let last = prefix.last().copied().unwrap_or(0.0);
        prefix.push(last + value);
    }
    (0..signal.len())
        .map(|i| {
            let start = i.saturating_sub(before);
            let end = (i + after + 1).min(signal.len());
            (prefix[end] - prefix[start]) / taps as f64
        })
        .collect()
}
