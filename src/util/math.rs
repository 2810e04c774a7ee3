//! Numeric helpers shared by the metric engines.

/// Magnitudes below this are treated as zero (norms, variances, totals).
pub(crate) const EPSILON: f64 = 1e-9;

/// Dot product accumulated in `f64`.
pub(crate) fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum()
}

/// Euclidean norm accumulated in `f64`.
pub(crate) fn l2_norm(values: &[f32]) -> f64 {
    dot(values, values).sqrt()
}

/// Returns `(mean, sum of squared deviations)` of a buffer.
pub(crate) fn mean_and_ssd(values: &[f32]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
    let ssd = values
        .iter()
        .map(|&v| {
            let d = f64::from(v) - mean;
            d * d
        })
        .sum();
    (mean, ssd)
}

/// Largest power of two that is `<= n` (0 for 0).
pub(crate) fn floor_power_of_two(n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    1usize << (usize::BITS - 1 - n.leading_zeros())
}

/// Smallest size `>= n` whose only prime factors are 2, 3 and 5.
pub(crate) fn optimal_dft_size(n: usize) -> usize {
    let mut candidate = n.max(1);
    loop {
        let mut rest = candidate;
        for p in [2, 3, 5] {
            while rest % p == 0 {
                rest /= p;
            }
        }
        if rest == 1 {
            return candidate;
        }
        candidate += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::{dot, floor_power_of_two, l2_norm, mean_and_ssd, optimal_dft_size};

    #[test]
    fn floor_power_of_two_rounds_down() {
        assert_eq!(floor_power_of_two(0), 0);
        assert_eq!(floor_power_of_two(1), 1);
        assert_eq!(floor_power_of_two(64), 64);
        assert_eq!(floor_power_of_two(100), 64);
        assert_eq!(floor_power_of_two(1023), 512);
    }

    #[test]
    fn optimal_dft_size_is_five_smooth() {
        assert_eq!(optimal_dft_size(1), 1);
        assert_eq!(optimal_dft_size(7), 8);
        assert_eq!(optimal_dft_size(11), 12);
        assert_eq!(optimal_dft_size(64), 64);
        assert_eq!(optimal_dft_size(97), 100);
    }

    #[test]
    fn norms_and_moments() {
        let v = [3.0f32, 4.0];
        assert!((l2_norm(&v) - 5.0).abs() < 1e-12);
        assert!((dot(&v, &[1.0, 1.0]) - 7.0).abs() < 1e-12);
        let (mean, ssd) = mean_and_ssd(&[1.0, 2.0, 3.0]);
        assert!((mean - 2.0).abs() < 1e-12);
        assert!((ssd - 2.0).abs() < 1e-12);
    }
}
