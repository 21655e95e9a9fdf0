//! Golden-ratio rhythm: note lengths cycle through `[1, φ/2, 1/φ]` beats.

use super::scale::PHI;

/// Beats per slot, repeated every three notes.
pub const PHI_RHYTHM: [f64; 3] = [1.0, PHI / 2.0, 1.0 / PHI];

/// A repeating ratio pattern at a fixed tempo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RhythmPattern {
    pub ratios: [f64; 3],
    pub tempo_bpm: f64,
}

impl RhythmPattern {
    pub fn new(tempo_bpm: f64) -> Self {
        RhythmPattern {
            ratios: PHI_RHYTHM,
            tempo_bpm,
        }
    }

    /// Seconds per beat.
    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.tempo_bpm
    }

    /// Beats occupied by the note in slot `index`.
    pub fn beats(&self, index: u64) -> f64 {
        self.ratios[(index % self.ratios.len() as u64) as usize]
    }

    /// Duration in seconds of the note in slot `index`.
    pub fn duration(&self, index: u64) -> f64 {
        self.beats(index) * self.seconds_per_beat()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_at_68_bpm() {
        let rhythm = RhythmPattern::new(68.0);
        let spb = 60.0 / 68.0;
        assert!((rhythm.duration(0) - spb).abs() < 1e-12);
        assert!((rhythm.duration(1) - spb * PHI / 2.0).abs() < 1e-12);
        assert!((rhythm.duration(2) - spb / PHI).abs() < 1e-12);
    }

    #[test]
    fn pattern_repeats_every_three() {
        let rhythm = RhythmPattern::new(90.0);
        for i in 0..30 {
            assert_eq!(rhythm.duration(i), rhythm.duration(i + 3));
        }
    }

    #[test]
    fn all_durations_positive() {
        let rhythm = RhythmPattern::new(68.0);
        assert!((0..3).all(|i| rhythm.duration(i) > 0.0));
    }
}
