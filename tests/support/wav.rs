use std::path::{Path, PathBuf};

use vetcardio::synth::{PcgParams, generate_pcg, write_wav};

pub fn write_test_wav(path: &Path, samples: &[f32], sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create wav parent dirs");
    }
    let mut writer = hound::WavWriter::create(path, spec).expect("create wav writer");
    for &sample in samples {
        writer.write_sample(sample).expect("write wav sample");
    }
    writer.finalize().expect("finalize wav");
}

/// Ten-second synthetic phonocardiogram at the given severity.
pub fn write_pcg_wav(dir: &Path, severity: u32) -> PathBuf {
    let params = PcgParams {
        seed: 42,
        ..PcgParams::with_severity(severity)
    };
    let samples = generate_pcg(&params).expect("generate pcg");
    let path = dir.join(format!("pcg_severity_{severity}.wav"));
    write_wav(&path, &samples, params.sample_rate).expect("write pcg wav");
    path
}

/// Stereo 44.1 kHz tone, exercising downmix and resampling.
pub fn write_stereo_tone(path: &Path, seconds: f32) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 44_100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("create wav writer");
    let frames = (44_100.0 * seconds) as usize;
    for i in 0..frames {
        let t = i as f32 / 44_100.0;
        let value = (0.3 * (2.0 * std::f32::consts::PI * 220.0 * t).sin() * 32_767.0) as i16;
        writer.write_sample(value).expect("write left");
        writer.write_sample(value).expect("write right");
    }
    writer.finalize().expect("finalize wav");
}
