//! Golden-ratio frequency ladder and Fibonacci step sequence.

/// The golden ratio, (1 + √5) / 2.
pub const PHI: f64 = 1.618_033_988_749_895;

/// Build a frequency ladder of powers of φ around `base_hz`.
///
/// Rungs run from `base × φ^-h` to `base × φ^h` with `h = steps / 2`
/// (integer division), so an odd `steps` yields exactly `steps` rungs and
/// an even `steps` yields `steps + 1`. The center rung `h` is always
/// `base_hz` itself.
///
/// Returns an empty ladder for a non-positive or non-finite base.
pub fn build_scale(base_hz: f64, steps: usize) -> Vec<f64> {
    if !(base_hz.is_finite() && base_hz > 0.0) {
        return Vec::new();
    }
    let half = (steps / 2) as i32;
    (-half..=half)
        .map(|n| if n == 0 { base_hz } else { base_hz * PHI.powi(n) })
        .collect()
}

/// First `length` Fibonacci numbers seeded `[1, 1]`.
///
/// Lengths below 2 still return the seed pair truncated to `length`.
pub fn build_fibonacci(length: usize) -> Vec<u64> {
    let mut seq: Vec<u64> = vec![1, 1];
    while seq.len() < length {
        let next = seq[seq.len() - 1].saturating_add(seq[seq.len() - 2]);
        seq.push(next);
    }
    seq.truncate(length);
    seq
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phi_matches_definition() {
        let phi = (1.0 + 5.0_f64.sqrt()) / 2.0;
        assert!((PHI - phi).abs() < 1e-15);
    }

    #[test]
    fn odd_ladder_has_exact_length_and_center() {
        for &steps in &[1usize, 3, 7, 13, 15, 21] {
            for &base in &[0.5, 174.0, 432.0, 963.0, 12_000.0] {
                let scale = build_scale(base, steps);
                assert_eq!(scale.len(), steps, "steps={steps}");
                assert_eq!(scale[steps / 2], base, "center must equal the base");
            }
        }
    }

    #[test]
    fn ladder_strictly_increasing() {
        let scale = build_scale(432.0, 15);
        for pair in scale.windows(2) {
            assert!(pair[1] > pair[0], "ladder not increasing: {pair:?}");
        }
    }

    #[test]
    fn neighbours_differ_by_phi() {
        let scale = build_scale(528.0, 9);
        for pair in scale.windows(2) {
            assert!((pair[1] / pair[0] - PHI).abs() < 1e-9);
        }
    }

    #[test]
    fn default_even_steps_gives_fifteen_rungs() {
        let scale = build_scale(432.0, 14);
        assert_eq!(scale.len(), 15);
        assert_eq!(scale[7], 432.0);
        assert!((scale[8] - 432.0 * PHI).abs() < 1e-9);
    }

    #[test]
    fn invalid_base_yields_empty_ladder() {
        assert!(build_scale(0.0, 15).is_empty());
        assert!(build_scale(-10.0, 15).is_empty());
        assert!(build_scale(f64::NAN, 15).is_empty());
    }

    #[test]
    fn fibonacci_eight() {
        assert_eq!(build_fibonacci(8), vec![1, 1, 2, 3, 5, 8, 13, 21]);
    }

    #[test]
    fn fibonacci_short_lengths() {
        assert_eq!(build_fibonacci(2), vec![1, 1]);
        assert_eq!(build_fibonacci(1), vec![1]);
        assert_eq!(build_fibonacci(3), vec![1, 1, 2]);
    }
}
