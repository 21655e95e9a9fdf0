//! Fibonacci index walk over a golden-ratio ladder.

use super::scale::{build_fibonacci, build_scale};

/// Walks a ladder outward then inward from its center, stepping by
/// successive Fibonacci numbers.
///
/// Call `k` (0-based) reads `fib[k mod n]`, walks up from the center on even
/// traversals of the sequence and down on odd ones, and clamps to the ladder.
#[derive(Debug, Clone)]
pub struct MelodicWalker {
    scale: Vec<f64>,
    fib: Vec<u64>,
    step_index: u64,
}

impl MelodicWalker {
    pub fn new(scale: Vec<f64>, fib: Vec<u64>) -> Self {
        MelodicWalker {
            scale,
            fib,
            step_index: 0,
        }
    }

    /// Build the ladder and sequence for `base_hz` in one go.
    pub fn for_base(base_hz: f64, steps: usize, fib_len: usize) -> Self {
        Self::new(build_scale(base_hz, steps), build_fibonacci(fib_len))
    }

    /// Ladder index the walk lands on at `step`.
    ///
    /// Always within `0..scale.len()` for a non-empty ladder.
    pub fn position_at(&self, step: u64) -> usize {
        let len = self.scale.len();
        if len == 0 || self.fib.is_empty() {
            return 0;
        }
        let n = self.fib.len() as u64;
        let fib_step = self.fib[(step % n) as usize].min(i64::MAX as u64) as i64;
        let outward = (step / n) % 2 == 0;
        let center = (len / 2) as i64;
        let target = if outward {
            center.saturating_add(fib_step)
        } else {
            center.saturating_sub(fib_step)
        };
        target.clamp(0, len as i64 - 1) as usize
    }

    /// Next frequency on the walk. Advances the step counter.
    ///
    /// Returns 0.0 only if the ladder is empty.
    pub fn next(&mut self) -> f64 {
        let pos = self.position_at(self.step_index);
        self.step_index += 1;
        self.scale.get(pos).copied().unwrap_or(0.0)
    }

    /// The ladder's root (center rung).
    pub fn root(&self) -> f64 {
        self.scale.get(self.scale.len() / 2).copied().unwrap_or(0.0)
    }

    pub fn step_index(&self) -> u64 {
        self.step_index
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::scale::PHI;

    #[test]
    fn first_traversal_walks_outward() {
        let walker = MelodicWalker::for_base(432.0, 14, 8);
        // center 7; fib 1,1,2,3,5,8,13,21 → 8,8,9,10,12,14(clamped)...
        let positions: Vec<usize> = (0..8).map(|s| walker.position_at(s)).collect();
        assert_eq!(positions, vec![8, 8, 9, 10, 12, 14, 14, 14]);
    }

    #[test]
    fn second_traversal_walks_inward() {
        let walker = MelodicWalker::for_base(432.0, 14, 8);
        let positions: Vec<usize> = (8..16).map(|s| walker.position_at(s)).collect();
        assert_eq!(positions, vec![6, 6, 5, 4, 2, 0, 0, 0]);
    }

    #[test]
    fn next_returns_ladder_frequencies_in_order() {
        let mut walker = MelodicWalker::for_base(432.0, 14, 8);
        let first = walker.next();
        assert!((first - 432.0 * PHI).abs() < 1e-9, "got {first}");
        assert_eq!(walker.step_index(), 1);
        let second = walker.next();
        assert!((second - 432.0 * PHI).abs() < 1e-9);
        let third = walker.next();
        assert!((third - 432.0 * PHI * PHI).abs() < 1e-9);
    }

    #[test]
    fn position_never_out_of_range() {
        for &steps in &[1usize, 2, 5, 14, 15, 31] {
            for &fib_len in &[2usize, 5, 8, 20, 90] {
                let walker = MelodicWalker::for_base(200.0, steps, fib_len);
                let len = walker.scale().len();
                for step in (0..2_000).chain([u64::MAX - 3, u64::MAX - 1]) {
                    let pos = walker.position_at(step);
                    assert!(pos < len, "pos {pos} out of range for len {len}");
                }
            }
        }
    }

    #[test]
    fn walk_is_deterministic() {
        let mut a = MelodicWalker::for_base(396.0, 14, 8);
        let mut b = MelodicWalker::for_base(396.0, 14, 8);
        for _ in 0..100 {
            assert_eq!(a.next(), b.next());
        }
    }

    #[test]
    fn root_is_base() {
        let walker = MelodicWalker::for_base(528.0, 14, 8);
        assert_eq!(walker.root(), 528.0);
    }

    #[test]
    fn empty_ladder_is_silent() {
        let mut walker = MelodicWalker::new(Vec::new(), build_fibonacci(8));
        assert_eq!(walker.next(), 0.0);
        assert_eq!(walker.position_at(5), 0);
    }
}
