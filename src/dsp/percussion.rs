//! Short randomized transients layered over ambient noise beds: rain
//! droplets, fire crackles, twig snaps.

use std::f64::consts::PI;

use rand::Rng;
use rand::rngs::StdRng;

use super::envelope::{Envelope, EnvelopeShape};
use super::noise::{Noise, NoiseColor};

/// A sine whose pitch drops exponentially from `frequency × octaves` to
/// `frequency` over `pitch_decay` seconds. Reads as a droplet or soft drum.
#[derive(Debug, Clone)]
pub struct MembraneHit {
    pub pitch_decay: f64,
    pub octaves: f64,
    envelope: Envelope,
    phase: f64,
    start_hz: f64,
    end_hz: f64,
    elapsed: usize,
    velocity: f64,
    sample_rate: f64,
}

impl MembraneHit {
    pub fn new(sample_rate: f64) -> Self {
        MembraneHit {
            pitch_decay: 0.01,
            octaves: 6.0,
            envelope: Envelope::new(EnvelopeShape::new(0.001, 0.15, 0.0, 0.2), sample_rate),
            phase: 0.0,
            start_hz: 0.0,
            end_hz: 0.0,
            elapsed: 0,
            velocity: 0.0,
            sample_rate,
        }
    }

    pub fn trigger(&mut self, frequency: f64, velocity: f64) {
        self.start_hz = frequency * self.octaves.max(1.0);
        self.end_hz = frequency;
        self.elapsed = 0;
        self.phase = 0.0;
        self.velocity = velocity.clamp(0.0, 1.0);
        self.envelope.gate_on();
    }

    fn current_hz(&self) -> f64 {
        let decay_samples = self.pitch_decay * self.sample_rate;
        if self.elapsed as f64 >= decay_samples || decay_samples <= 0.0 {
            return self.end_hz;
        }
        let t = self.elapsed as f64 / decay_samples;
        self.start_hz * (self.end_hz / self.start_hz).powf(t)
    }

    pub fn next_sample(&mut self) -> f64 {
        if self.envelope.is_finished() {
            return 0.0;
        }
        let s = (2.0 * PI * self.phase).sin();
        self.phase = (self.phase + self.current_hz() / self.sample_rate).fract();
        self.elapsed += 1;
        s * self.envelope.next_sample() * self.velocity
    }
}

/// White noise through a percussive envelope.
#[derive(Debug, Clone)]
pub struct NoiseBurst {
    noise: Noise,
    envelope: Envelope,
    velocity: f64,
}

impl NoiseBurst {
    pub fn new(shape: EnvelopeShape, seed: u64, sample_rate: f64) -> Self {
        NoiseBurst {
            noise: Noise::new(NoiseColor::White, seed),
            envelope: Envelope::new(shape, sample_rate),
            velocity: 0.0,
        }
    }

    pub fn trigger(&mut self, velocity: f64) {
        self.velocity = velocity.clamp(0.0, 1.0);
        self.envelope.gate_on();
    }

    pub fn next_sample(&mut self) -> f64 {
        if self.envelope.is_finished() {
            return 0.0;
        }
        self.noise.next_sample() * self.envelope.next_sample() * self.velocity
    }
}

/// Periodic trigger with random timing offsets, like a humanised loop.
#[derive(Debug, Clone)]
pub struct TriggerClock {
    interval: usize,
    humanize: usize,
    countdown: usize,
}

impl TriggerClock {
    /// Fires every `interval_secs` ± `humanize_secs`; first fire on the
    /// first sample.
    pub fn new(interval_secs: f64, humanize_secs: f64, sample_rate: f64) -> Self {
        TriggerClock {
            interval: ((interval_secs * sample_rate) as usize).max(1),
            humanize: (humanize_secs.max(0.0) * sample_rate) as usize,
            countdown: 0,
        }
    }

    /// Advance one sample; true on a trigger.
    pub fn tick(&mut self, rng: &mut StdRng) -> bool {
        if self.countdown > 0 {
            self.countdown -= 1;
            return false;
        }
        let jitter = if self.humanize > 0 {
            rng.gen_range(0..=2 * self.humanize) as i64 - self.humanize as i64
        } else {
            0
        };
        self.countdown = (self.interval as i64 + jitter).max(1) as usize - 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn membrane_hit_decays_to_silence() {
        let mut hit = MembraneHit::new(44100.0);
        hit.trigger(523.25, 1.0);
        let head: f64 = (0..2000).map(|_| hit.next_sample().abs()).fold(0.0, f64::max);
        assert!(head > 0.1, "droplet should be audible, got {head}");
        for _ in 0..44100 {
            hit.next_sample();
        }
        assert_eq!(hit.next_sample(), 0.0);
    }

    #[test]
    fn membrane_pitch_glides_down() {
        let mut hit = MembraneHit::new(44100.0);
        hit.trigger(500.0, 1.0);
        let start = hit.current_hz();
        for _ in 0..1000 {
            hit.next_sample();
        }
        assert!((start - 3000.0).abs() < 1e-9);
        assert!((hit.current_hz() - 500.0).abs() < 1e-9);
    }

    #[test]
    fn noise_burst_is_short() {
        let mut burst = NoiseBurst::new(EnvelopeShape::new(0.005, 0.08, 0.0, 0.1), 9, 44100.0);
        burst.trigger(1.0);
        let loud = (0..400).map(|_| burst.next_sample().abs()).fold(0.0, f64::max);
        assert!(loud > 0.1);
        for _ in 0..22050 {
            burst.next_sample();
        }
        // sustain 0 leaves the envelope parked at zero
        assert_eq!(burst.next_sample(), 0.0);
    }

    #[test]
    fn trigger_clock_period_without_humanize() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut clock = TriggerClock::new(0.01, 0.0, 1000.0);
        let fired: Vec<usize> = (0..50).filter(|_| clock.tick(&mut rng)).collect();
        assert_eq!(fired, vec![0, 10, 20, 30, 40]);
    }

    #[test]
    fn trigger_clock_humanized_rate_is_close() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut clock = TriggerClock::new(0.125, 0.03, 44100.0);
        let count = (0..441_000).filter(|_| clock.tick(&mut rng)).count();
        // 10 s at 8 per second
        assert!((70..=90).contains(&count), "got {count} triggers");
    }
}
