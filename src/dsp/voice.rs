//! Voice: one scheduled note, an oscillator shaped by an envelope, with the
//! frame at which its gate closes.

use super::envelope::{Envelope, EnvelopeShape};
use super::oscillator::{Oscillator, Waveform};

/// A single sounding note.
#[derive(Debug, Clone)]
pub struct Voice {
    pub oscillator: Oscillator,
    pub envelope: Envelope,
    /// Velocity gain [0, 1].
    pub velocity: f64,
    /// Frame at which the gate closes; `u64::MAX` holds until released.
    pub release_frame: u64,
    finished: bool,
}

impl Voice {
    pub fn new(waveform: Waveform, shape: EnvelopeShape, sample_rate: f64) -> Self {
        Voice {
            oscillator: Oscillator::new(waveform, sample_rate),
            envelope: Envelope::new(shape, sample_rate),
            velocity: 1.0,
            release_frame: u64::MAX,
            finished: false,
        }
    }

    /// Sine voice, the timbre of both the melody and the binaural carriers.
    pub fn sine(shape: EnvelopeShape, sample_rate: f64) -> Self {
        Self::new(Waveform::Sine, shape, sample_rate)
    }

    /// Start playing a note.
    pub fn note_on(&mut self, frequency: f64, velocity: f64) {
        self.oscillator.frequency = frequency;
        self.oscillator.reset();
        self.velocity = velocity;
        self.finished = false;
        self.envelope.gate_on();
    }

    /// Release the note. The envelope's release stage still plays out.
    pub fn note_off(&mut self) {
        self.envelope.gate_off();
    }

    /// Gate off once `frame` reaches the scheduled release.
    #[inline]
    pub fn release_if_due(&mut self, frame: u64) {
        if frame >= self.release_frame && !self.envelope.is_releasing() {
            self.note_off();
            self.release_frame = u64::MAX;
        }
    }

    /// Generate the next sample.
    pub fn next_sample(&mut self) -> f64 {
        if self.finished {
            return 0.0;
        }

        let osc = self.oscillator.next_sample();
        let env = self.envelope.next_sample();

        if self.envelope.is_finished() {
            self.finished = true;
        }

        osc * env * self.velocity
    }

    pub fn frequency(&self) -> f64 {
        self.oscillator.frequency
    }

    pub fn is_releasing(&self) -> bool {
        self.envelope.is_releasing()
    }

    /// Envelope has finished; the voice can be dropped.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_produces_sound() {
        let mut v = Voice::sine(EnvelopeShape::default(), 44100.0);
        v.note_on(432.0, 0.8);
        let has_nonzero = (0..4410).any(|_| v.next_sample().abs() > 0.001);
        assert!(has_nonzero, "Voice should produce non-zero output");
    }

    #[test]
    fn scheduled_release_closes_gate() {
        let mut v = Voice::sine(EnvelopeShape::new(0.001, 0.001, 0.5, 0.01), 44100.0);
        v.note_on(440.0, 1.0);
        v.release_frame = 1000;

        for frame in 0..1000 {
            v.release_if_due(frame);
            v.next_sample();
        }
        assert!(!v.is_releasing());

        for frame in 1000..4000 {
            v.release_if_due(frame);
            v.next_sample();
        }
        assert!(v.is_finished(), "Voice should be finished after release");
        assert!(v.next_sample().abs() < 1e-12);
    }

    #[test]
    fn voice_output_range() {
        let mut v = Voice::sine(EnvelopeShape::default(), 44100.0);
        v.note_on(880.0, 1.0);
        for _ in 0..44100 {
            let s = v.next_sample();
            assert!(s.abs() <= 1.0, "Voice output should be within [-1, 1], got {s}");
        }
    }
}
