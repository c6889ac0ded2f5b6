use std::sync::LazyLock;

/// Number of entries in the colour lookup table.
pub(crate) const LUT_SIZE: usize = 256;

// Sixth-order polynomial fit of matplotlib's magma, one row per power of t.
const MAGMA_COEFFS: [[f64; 3]; 7] = [
    [-0.002136485053939582, -0.000749655052795221, -0.005386127855323933],
    [0.2516605407371642, 0.6775232436837668, 2.494026599312351],
    [8.353717279216625, -3.577719514958484, 0.3144679030132573],
    [-27.66873308576866, 14.26473078096533, -13.64921318813922],
    [52.17613981234068, -27.94360607168351, 12.94416944238394],
    [-50.76852536473588, 29.04658282127291, 4.23415299384598],
    [18.65570506591883, -11.48977351997711, -5.601961508734096],
];

static MAGMA_LUT: LazyLock<[[u8; 3]; LUT_SIZE]> = LazyLock::new(|| {
    let mut lut = [[0u8; 3]; LUT_SIZE];
    for (idx, entry) in lut.iter_mut().enumerate() {
        let t = idx as f64 / (LUT_SIZE - 1) as f64;
        for (channel, slot) in entry.iter_mut().enumerate() {
            let value = MAGMA_COEFFS
                .iter()
                .rev()
                .fold(0.0_f64, |acc, row| acc * t + row[channel]);
            *slot = (value.clamp(0.0, 1.0) * 255.0).round() as u8;
        }
    }
    lut
});

/// Map a normalised value in `[0, 1]` to a magma colour. Values outside the
/// range (and NaN) are clamped.
pub(crate) fn magma(t: f32) -> [u8; 3] {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let idx = ((t * LUT_SIZE as f32) as usize).min(LUT_SIZE - 1);
    MAGMA_LUT[idx]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brightness(rgb: [u8; 3]) -> u32 {
        rgb.iter().map(|&c| c as u32).sum()
    }

    #[test]
    fn endpoints_match_magma() {
        let low = magma(0.0);
        assert!(low.iter().all(|&c| c < 10), "{low:?}");
        let high = magma(1.0);
        assert!(high[0] > 240 && high[1] > 240, "{high:?}");
        assert!(high[2] > 170 && high[2] < 205, "{high:?}");
    }

    #[test]
    fn brightness_increases_across_the_map() {
        let samples = [0.0, 0.25, 0.5, 0.75, 1.0].map(|t| brightness(magma(t)));
        assert!(samples.windows(2).all(|pair| pair[0] < pair[1]), "{samples:?}");
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        assert_eq!(magma(-3.0), magma(0.0));
        assert_eq!(magma(7.0), magma(1.0));
        assert_eq!(magma(f32::NAN), magma(0.0));
    }
}
