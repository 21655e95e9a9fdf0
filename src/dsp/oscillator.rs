//! Tone oscillators for the melodic voice, binaural carriers and tonal
//! ambient layers.

use std::f64::consts::PI;

/// Supported waveform shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Waveform {
    Sine,
    /// Sum of sine harmonics; entry `k` is the amplitude of harmonic `k + 1`.
    Partials(Vec<f64>),
}

/// A phase-accumulating oscillator.
#[derive(Debug, Clone)]
pub struct Oscillator {
    pub waveform: Waveform,
    pub frequency: f64,
    phase: f64,
    sample_rate: f64,
    /// 1 / Σ|partials|, so additive tones stay within [-1, 1].
    norm: f64,
}

impl Oscillator {
    pub fn new(waveform: Waveform, sample_rate: f64) -> Self {
        let norm = match &waveform {
            Waveform::Partials(p) => {
                let sum: f64 = p.iter().map(|a| a.abs()).sum();
                if sum > 0.0 { 1.0 / sum } else { 0.0 }
            }
            _ => 1.0,
        };
        Oscillator {
            waveform,
            frequency: 440.0,
            phase: 0.0,
            sample_rate,
            norm,
        }
    }

    /// Sine oscillator at `frequency`.
    pub fn sine(frequency: f64, sample_rate: f64) -> Self {
        let mut osc = Self::new(Waveform::Sine, sample_rate);
        osc.frequency = frequency;
        osc
    }

    fn phase_inc(&self) -> f64 {
        self.frequency / self.sample_rate
    }

    /// Generate the next sample.
    pub fn next_sample(&mut self) -> f64 {
        let sample = match &self.waveform {
            Waveform::Sine => (2.0 * PI * self.phase).sin(),
            Waveform::Partials(partials) => {
                let mut sum = 0.0;
                for (k, amp) in partials.iter().enumerate() {
                    if *amp != 0.0 {
                        sum += amp * (2.0 * PI * self.phase * (k + 1) as f64).sin();
                    }
                }
                sum * self.norm
            }
        };

        self.phase += self.phase_inc();
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }

        sample
    }

    /// Reset oscillator phase.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_zero_at_start() {
        let mut osc = Oscillator::sine(440.0, 44100.0);
        let sample = osc.next_sample();
        assert!(sample.abs() < 1e-10, "Sine should start near 0, got {sample}");
    }

    #[test]
    fn sine_range() {
        let mut osc = Oscillator::sine(432.0, 44100.0);
        for _ in 0..44100 {
            let s = osc.next_sample();
            assert!((-1.0..=1.0).contains(&s), "Sine out of range: {s}");
        }
    }

    #[test]
    fn partials_normalized() {
        let mut osc = Oscillator::new(Waveform::Partials(vec![1.0, 0.0, 0.1, 0.0, 0.05]), 44100.0);
        osc.frequency = 440.0;
        let mut peak = 0.0_f64;
        for _ in 0..44100 {
            peak = peak.max(osc.next_sample().abs());
        }
        assert!(peak <= 1.0 + 1e-9, "Additive tone out of range: {peak}");
        assert!(peak > 0.5, "Additive tone too quiet: {peak}");
    }

    #[test]
    fn sine_period_matches_frequency() {
        // 441 Hz at 44.1 kHz repeats every 100 samples
        let mut osc = Oscillator::sine(441.0, 44100.0);
        let first: Vec<f64> = (0..100).map(|_| osc.next_sample()).collect();
        let second: Vec<f64> = (0..100).map(|_| osc.next_sample()).collect();
        for (a, b) in first.iter().zip(&second) {
            assert!((a - b).abs() < 1e-6);
        }
    }
}
