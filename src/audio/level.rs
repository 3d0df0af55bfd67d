//! Loudness helpers shared by the capture tail logic and the decode trimmer.

/// Root-mean-square amplitude of a sample window.
///
/// Returns `0.0` for an empty slice.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let mean_sq = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    mean_sq.sqrt()
}

/// Linear-interpolated percentile of `values` (`q` in `[0, 100]`).
///
/// Returns `0.0` for an empty slice.  The input order does not matter.
pub fn percentile(values: &[f32], q: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<f32> = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let q = q.clamp(0.0, 100.0);
    let rank = (sorted.len() - 1) as f32 * q / 100.0;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = rank - lo as f32;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_of_silence_is_zero() {
        assert_eq!(rms(&[0.0; 128]), 0.0);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn rms_of_constant_signal_is_its_amplitude() {
        let signal = vec![0.25_f32; 64];
        assert!((rms(&signal) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn rms_of_mixed_signs_uses_magnitude() {
        let signal = vec![0.5_f32, -0.5, 0.5, -0.5];
        assert!((rms(&signal) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn percentile_endpoints() {
        let values = vec![1.0_f32, 2.0, 3.0, 4.0];
        assert!((percentile(&values, 0.0) - 1.0).abs() < 1e-6);
        assert!((percentile(&values, 100.0) - 4.0).abs() < 1e-6);
    }

    #[test]
    fn percentile_interpolates_between_ranks() {
        let values = vec![0.0_f32, 1.0];
        assert!((percentile(&values, 50.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn percentile_is_order_independent() {
        let a = vec![3.0_f32, 1.0, 2.0];
        let b = vec![1.0_f32, 2.0, 3.0];
        assert!((percentile(&a, 25.0) - percentile(&b, 25.0)).abs() < 1e-6);
    }

    #[test]
    fn percentile_of_empty_is_zero() {
        assert_eq!(percentile(&[], 25.0), 0.0);
    }
}
