//! Decoding uploaded WAV/MP3 files into the fixed-rate mono [`Waveform`].

mod decode;
mod resample;

use std::path::Path;

use tracing::debug;

use super::{ANALYSIS_SAMPLE_RATE, Waveform};
use crate::evaluation::EvaluationError;

pub(crate) use decode::{DecodedAudio, decode_audio, decode_audio_bytes};
pub(crate) use resample::resample_linear_into;

/// Decode `path`, downmix to mono and resample to [`ANALYSIS_SAMPLE_RATE`].
///
/// Zero-byte files and streams that decode to no samples fail with
/// [`EvaluationError::EmptyAudio`]; anything symphonia cannot read fails with
/// [`EvaluationError::UnsupportedAudioFormat`].
pub fn load_waveform(path: &Path) -> Result<Waveform, EvaluationError> {
    let byte_len = std::fs::metadata(path)
        .map(|meta| meta.len())
        .map_err(|err| unsupported(path, format!("Open {}: {err}", path.display())))?;
    if byte_len == 0 {
        return Err(empty(path));
    }
    let decoded = decode_audio(path).map_err(|reason| unsupported(path, reason))?;
    finish(path, decoded)
}

/// Same as [`load_waveform`] for an upload held in memory. `name` is the
/// client file name; its extension is the container hint and it labels errors.
pub fn load_waveform_from_bytes(name: &str, bytes: Vec<u8>) -> Result<Waveform, EvaluationError> {
    let name = Path::new(name);
    if bytes.is_empty() {
        return Err(empty(name));
    }
    let decoded = decode_audio_bytes(name, bytes).map_err(|reason| unsupported(name, reason))?;
    finish(name, decoded)
}

fn finish(source: &Path, decoded: DecodedAudio) -> Result<Waveform, EvaluationError> {
    if decoded.samples.is_empty() {
        return Err(empty(source));
    }
    debug!(
        "Decoded {}: {} Hz, {} channel(s), {} samples",
        source.display(),
        decoded.sample_rate,
        decoded.channels,
        decoded.samples.len()
    );
    let waveform = to_analysis_waveform(&decoded);
    if waveform.is_empty() {
        return Err(empty(source));
    }
    Ok(waveform)
}

pub(crate) fn to_analysis_waveform(decoded: &DecodedAudio) -> Waveform {
    let mono = downmix_to_mono(&decoded.samples, decoded.channels);
    let mut resampled = Vec::new();
    resample_linear_into(
        &mut resampled,
        &mono,
        decoded.sample_rate,
        ANALYSIS_SAMPLE_RATE,
    );
    for sample in &mut resampled {
        if !sample.is_finite() {
            *sample = 0.0;
        }
    }
    Waveform::new(resampled, ANALYSIS_SAMPLE_RATE)
}

fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    let channels = channels.max(1) as usize;
    if channels == 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

fn empty(path: &Path) -> EvaluationError {
    EvaluationError::EmptyAudio {
        path: path.to_path_buf(),
    }
}

fn unsupported(path: &Path, reason: String) -> EvaluationError {
    EvaluationError::UnsupportedAudioFormat {
        path: path.to_path_buf(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec, WavWriter};
    use tempfile::TempDir;

    fn write_wav(path: &Path, sample_rate: u32, channels: u16, frames: usize, value: f32) {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for _ in 0..frames * channels as usize {
            writer.write_sample::<f32>(value).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn stereo_44k_wav_becomes_mono_4k() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav(&path, 44_100, 2, 44_100, 0.25);

        let waveform = load_waveform(&path).unwrap();
        assert_eq!(waveform.sample_rate(), ANALYSIS_SAMPLE_RATE);
        assert!((waveform.duration_seconds() - 1.0).abs() < 0.01);
        let mid = waveform.samples()[waveform.len() / 2];
        assert!((mid - 0.25).abs() < 1e-4);
    }

    #[test]
    fn native_rate_wav_is_passed_through() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("native.wav");
        write_wav(&path, ANALYSIS_SAMPLE_RATE, 1, 4_000, -0.5);

        let waveform = load_waveform(&path).unwrap();
        assert_eq!(waveform.len(), 4_000);
        assert!(waveform.samples().iter().all(|&s| (s + 0.5).abs() < 1e-6));
    }

    #[test]
    fn zero_byte_file_is_empty_audio() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.wav");
        std::fs::write(&path, b"").unwrap();

        let err = load_waveform(&path).unwrap_err();
        assert!(matches!(err, EvaluationError::EmptyAudio { .. }));
    }

    #[test]
    fn garbage_bytes_are_unsupported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.wav");
        std::fs::write(&path, b"definitely not a RIFF stream, just text").unwrap();

        let err = load_waveform(&path).unwrap_err();
        assert!(matches!(err, EvaluationError::UnsupportedAudioFormat { .. }));
    }

    #[test]
    fn missing_file_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let err = load_waveform(&dir.path().join("missing.mp3")).unwrap_err();
        assert!(matches!(err, EvaluationError::UnsupportedAudioFormat { .. }));
    }

    #[test]
    fn downmix_averages_channels() {
        let mono = downmix_to_mono(&[1.0, 0.0, 0.5, 0.5], 2);
        assert_eq!(mono, vec![0.5, 0.5]);
    }

    const SILENT_MP3: &str = concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/silent_32k_mono.mp3"
    );

    #[test]
    fn mp3_file_becomes_mono_4k() {
        let waveform = load_waveform(Path::new(SILENT_MP3)).unwrap();
        assert_eq!(waveform.sample_rate(), ANALYSIS_SAMPLE_RATE);
        assert!(!waveform.is_empty());
        // 70 frames of 1152 samples at 32 kHz.
        assert!((waveform.duration_seconds() - 2.52).abs() < 0.1);
    }

    #[test]
    fn in_memory_upload_matches_file_decode() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("upload.wav");
        write_wav(&path, 8_000, 2, 8_000, 0.1);
        let from_file = load_waveform(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let from_bytes = load_waveform_from_bytes("upload.wav", bytes).unwrap();
        assert_eq!(from_bytes, from_file);

        let mp3 = std::fs::read(SILENT_MP3).unwrap();
        let waveform = load_waveform_from_bytes("scout.mp3", mp3).unwrap();
        assert_eq!(waveform.sample_rate(), ANALYSIS_SAMPLE_RATE);
        assert!(!waveform.is_empty());
    }

    #[test]
    fn in_memory_errors_name_the_upload() {
        let err = load_waveform_from_bytes("bella.wav", Vec::new()).unwrap_err();
        assert_eq!(
            err,
            EvaluationError::EmptyAudio {
                path: "bella.wav".into()
            }
        );
        let err = load_waveform_from_bytes("bella.mp3", b"no frames here".to_vec()).unwrap_err();
        assert!(matches!(err, EvaluationError::UnsupportedAudioFormat { .. }));
    }
}
