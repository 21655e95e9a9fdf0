//! Binaural pair: two sustained sines, one per ear.
//!
//! The slow envelope keeps starts and stops click-free. A stopped pair
//! keeps sounding as a release tail until both envelopes finish, but it no
//! longer counts as active.

use tracing::debug;

use crate::config::EngineConfig;
use crate::dsp::envelope::EnvelopeShape;
use crate::dsp::voice::Voice;

use super::volume::db_to_gain;

#[derive(Debug, Clone)]
struct TonePair {
    left: Voice,
    right: Voice,
}

impl TonePair {
    fn is_finished(&self) -> bool {
        self.left.is_finished() && self.right.is_finished()
    }

    fn release(&mut self) {
        self.left.note_off();
        self.right.note_off();
    }
}

#[derive(Debug, Clone)]
pub struct BinauralDriver {
    pair: Option<TonePair>,
    tails: Vec<TonePair>,
    envelope: EnvelopeShape,
    gain: f64,
    sample_rate: f64,
}

impl BinauralDriver {
    pub fn new(config: &EngineConfig) -> Self {
        BinauralDriver {
            pair: None,
            tails: Vec::new(),
            envelope: config.binaural_envelope,
            gain: db_to_gain(config.binaural_tone_db),
            sample_rate: config.sample_rate,
        }
    }

    /// Attack both tones. A pair already sounding is released first.
    pub fn start(&mut self, left_hz: f64, right_hz: f64) {
        self.stop();
        let mut left = Voice::sine(self.envelope, self.sample_rate);
        let mut right = Voice::sine(self.envelope, self.sample_rate);
        left.note_on(left_hz, 1.0);
        right.note_on(right_hz, 1.0);
        debug!(left_hz, right_hz, beat_hz = right_hz - left_hz, "binaural pair started");
        self.pair = Some(TonePair { left, right });
    }

    /// Release the sustained pair. No-op when nothing is playing.
    pub fn stop(&mut self) {
        if let Some(mut pair) = self.pair.take() {
            pair.release();
            self.tails.push(pair);
        }
    }

    pub fn is_active(&self) -> bool {
        self.pair.is_some()
    }

    /// `(left, right)` frequencies of the sustained pair.
    pub fn frequencies(&self) -> Option<(f64, f64)> {
        self.pair
            .as_ref()
            .map(|p| (p.left.frequency(), p.right.frequency()))
    }

    pub fn tail_count(&self) -> usize {
        self.tails.len()
    }

    /// Mix the pair and any release tails into the buffers, left tone hard
    /// left and right tone hard right.
    pub fn render_add(&mut self, left: &mut [f64], right: &mut [f64]) {
        if self.pair.is_none() && self.tails.is_empty() {
            return;
        }
        let gain = self.gain;
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            for pair in self.pair.iter_mut().chain(self.tails.iter_mut()) {
                *l += pair.left.next_sample() * gain;
                *r += pair.right.next_sample() * gain;
            }
        }
        self.tails.retain(|p| !p.is_finished());
    }
}
