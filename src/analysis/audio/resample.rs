/// Resample by linear interpolation, box-filtering first when decimating so
/// content above the new Nyquist does not fold back into the heart-sound band.
pub(crate) fn resample_linear_into(
    out: &mut Vec<f32>,
    samples: &[f32],
    input_rate: u32,
    output_rate: u32,
) {
    let input_rate = input_rate.max(1);
    let output_rate = output_rate.max(1);
    out.clear();
    if samples.is_empty() || input_rate == output_rate {
        out.extend_from_slice(samples);
        return;
    }
    let filtered;
    let source = if input_rate > output_rate {
        let width = (input_rate as f64 / output_rate as f64).round() as usize;
        filtered = box_filter(samples, width);
        filtered.as_slice()
    } else {
        samples
    };
    let duration_seconds = source.len() as f64 / input_rate as f64;
    let out_len = (duration_seconds * output_rate as f64).round().max(1.0) as usize;
    out.reserve(out_len);
    for i in 0..out_len {
        let pos = i as f64 * input_rate as f64 / output_rate as f64;
        out.push(lerp_sample(source, pos));
    }
}

fn box_filter(samples: &[f32], width: usize) -> Vec<f32> {
    if width <= 1 {
        return samples.to_vec();
    }
    let half = width / 2;
    let mut prefix = Vec::with_capacity(samples.len() + 1);
    prefix.push(0.0_f64);
    let mut acc = 0.0_f64;
    for &sample in samples {
        acc += sample as f64;
        prefix.push(acc);
    }
    (0..samples.len())
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + width - half).min(samples.len());
            ((prefix[end] - prefix[start]) / (end - start) as f64) as f32
        })
        .collect()
}

fn lerp_sample(samples: &[f32], pos: f64) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let idx0 = pos.floor().max(0.0) as usize;
    let frac = (pos - idx0 as f64).clamp(0.0, 1.0) as f32;
    let idx1 = idx0.saturating_add(1).min(samples.len() - 1);
    let a = samples.get(idx0).copied().unwrap_or(samples[samples.len() - 1]);
    let b = samples.get(idx1).copied().unwrap_or(a);
    a + (b - a) * frac
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resample(samples: &[f32], input_rate: u32, output_rate: u32) -> Vec<f32> {
        let mut out = Vec::new();
        resample_linear_into(&mut out, samples, input_rate, output_rate);
        out
    }

    #[test]
    fn upsampling_preserves_ramp_start() {
        let out = resample(&[0.0, 1.0], 1, 2);
        assert_eq!(out.len(), 4);
        assert!(out[0].abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn downsampling_keeps_duration_and_dc_level() {
        let input = vec![0.3_f32; 8_000];
        let out = resample(&input, 8_000, 4_000);
        assert_eq!(out.len(), 4_000);
        assert!(out.iter().all(|v| (v - 0.3).abs() < 1e-5));
    }

    #[test]
    fn downsampling_attenuates_alternating_signal() {
        let input: Vec<f32> = (0..8_000)
            .map(|i| if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        let out = resample(&input, 8_000, 4_000);
        let interior = &out[2..out.len() - 2];
        assert!(interior.iter().all(|v| v.abs() < 1e-5));
    }

    #[test]
    fn equal_rates_copy_input() {
        let out = resample(&[0.1, 0.2, 0.3], 4_000, 4_000);
        assert_eq!(out, vec![0.1, 0.2, 0.3]);
    }
}
