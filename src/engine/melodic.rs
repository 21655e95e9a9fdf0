//! The melodic voice chain: polyphonic sine voices through an auto-panner,
//! a ramped stereo low-pass, a long reverb and a level stage.
//!
//! Notes arrive from the scheduler ahead of time and wait in `pending`
//! until their start frame; each voice closes its gate on its own release
//! frame, so timing is exact regardless of block size.

use std::collections::VecDeque;

use crate::config::EngineConfig;
use crate::dsp::envelope::EnvelopeShape;
use crate::dsp::filter::BiquadFilter;
use crate::dsp::modulation::AutoPanner;
use crate::dsp::ramp::{LinearRamp, SmoothedGain};
use crate::dsp::reverb::Reverb;
use crate::dsp::voice::Voice;

use super::scheduler::ScheduledNote;
use super::volume::db_to_gain;

#[derive(Debug, Clone)]
pub struct MelodicChain {
    pending: VecDeque<ScheduledNote>,
    voices: Vec<Voice>,
    envelope: EnvelopeShape,
    max_voices: usize,
    panner: AutoPanner,
    filters: [BiquadFilter; 2],
    cutoff: LinearRamp,
    ramp_samples: usize,
    reverb: Reverb,
    level: SmoothedGain,
    sample_rate: f64,
}

impl MelodicChain {
    pub fn new(config: &EngineConfig) -> Self {
        let sr = config.sample_rate;
        let cutoff = config.default_cutoff_hz;
        MelodicChain {
            pending: VecDeque::new(),
            voices: Vec::with_capacity(config.max_voices),
            envelope: config.voice_envelope,
            max_voices: config.max_voices,
            panner: AutoPanner::new(config.autopan_hz, sr),
            filters: [BiquadFilter::lowpass(cutoff, sr), BiquadFilter::lowpass(cutoff, sr)],
            cutoff: LinearRamp::new(cutoff),
            ramp_samples: config.secs_to_frames(config.filter_ramp_secs),
            reverb: Reverb::with_decay(sr, config.reverb_decay_secs, config.reverb_mix),
            level: SmoothedGain::new(db_to_gain(config.scale_voice_db), config.gain_smoothing_ms, sr),
            sample_rate: sr,
        }
    }

    /// Envelope used by voices started from now on.
    pub fn set_envelope(&mut self, shape: EnvelopeShape) {
        self.envelope = shape;
    }

    pub fn envelope(&self) -> EnvelopeShape {
        self.envelope
    }

    pub fn set_level_db(&mut self, db: f64) {
        self.level.set_target(db_to_gain(db));
    }

    pub fn level(&self) -> f64 {
        self.level.target()
    }

    /// Queue scheduled notes. They must arrive in start order.
    pub fn schedule(&mut self, notes: impl IntoIterator<Item = ScheduledNote>) {
        self.pending.extend(notes);
    }

    /// Soft stop: sounding voices enter their release, queued notes are
    /// discarded.
    pub fn release_all(&mut self) {
        self.pending.clear();
        for voice in &mut self.voices {
            voice.note_off();
        }
    }

    pub fn upcoming(&self) -> Vec<ScheduledNote> {
        self.pending.iter().copied().collect()
    }

    /// Voices still producing sound, including releases.
    pub fn sounding(&self) -> usize {
        self.voices.iter().filter(|v| !v.is_finished()).count()
    }

    /// Voices whose gate is still held.
    pub fn held(&self) -> usize {
        self.voices
            .iter()
            .filter(|v| !v.is_finished() && !v.is_releasing())
            .count()
    }

    pub fn cutoff_hz(&self) -> f64 {
        self.cutoff.value()
    }

    fn frame_of(&self, secs: f64) -> u64 {
        (secs.max(0.0) * self.sample_rate).round() as u64
    }

    fn activate_due(&mut self, frame: u64) {
        while let Some(note) = self.pending.front() {
            if self.frame_of(note.start) > frame {
                break;
            }
            let note = *note;
            self.pending.pop_front();

            self.cutoff.ramp_to(note.cutoff_hz, self.ramp_samples);
            self.voices.retain(|v| !v.is_finished());
            if self.voices.len() >= self.max_voices {
                continue;
            }
            let mut voice = Voice::sine(self.envelope, self.sample_rate);
            voice.note_on(note.frequency, 1.0);
            voice.release_frame = self.frame_of(note.end_of_gate());
            self.voices.push(voice);
        }
    }

    /// Mix `left.len()` frames starting at `start_frame` into the buffers.
    pub fn render_add(&mut self, start_frame: u64, left: &mut [f64], right: &mut [f64]) {
        for (i, (l, r)) in left.iter_mut().zip(right.iter_mut()).enumerate() {
            let frame = start_frame + i as u64;
            self.activate_due(frame);

            let mut dry = 0.0;
            for voice in &mut self.voices {
                voice.release_if_due(frame);
                dry += voice.next_sample();
            }

            if self.cutoff.is_ramping() {
                let hz = self.cutoff.next_value();
                for filter in &mut self.filters {
                    filter.set_frequency(hz);
                }
            }

            let (pl, pr) = self.panner.process(dry);
            let fl = self.filters[0].process(pl);
            let fr = self.filters[1].process(pr);
            let (wl, wr) = self.reverb.process(fl, fr);
            let gain = self.level.next_gain();
            *l += wl * gain;
            *r += wr * gain;
        }
        self.voices.retain(|v| !v.is_finished());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(start: f64, gate: f64, frequency: f64) -> ScheduledNote {
        ScheduledNote {
            start,
            duration: gate,
            gate,
            frequency,
            cutoff_hz: 2000.0,
        }
    }

    fn render(chain: &mut MelodicChain, start_frame: u64, frames: usize) -> (Vec<f64>, Vec<f64>) {
        let mut l = vec![0.0; frames];
        let mut r = vec![0.0; frames];
        chain.render_add(start_frame, &mut l, &mut r);
        (l, r)
    }

    #[test]
    fn note_starts_on_its_frame() {
        let mut chain = MelodicChain::new(&EngineConfig::default());
        chain.schedule([note(0.01, 0.5, 432.0)]);
        let (l, r) = render(&mut chain, 0, 441);
        assert!(l.iter().chain(r.iter()).all(|&s| s == 0.0), "silent before onset");
        assert_eq!(chain.upcoming().len(), 1);

        let (l, _) = render(&mut chain, 441, 4410);
        assert!(l.iter().any(|s| s.abs() > 1e-4));
        assert!(chain.upcoming().is_empty());
        assert_eq!(chain.held(), 1);
    }

    #[test]
    fn gate_closes_after_gate_time() {
        let mut chain = MelodicChain::new(&EngineConfig::default());
        chain.schedule([note(0.0, 0.1, 432.0)]);
        render(&mut chain, 0, 4000);
        assert_eq!(chain.held(), 1);
        render(&mut chain, 4000, 1000);
        assert_eq!(chain.held(), 0);
        assert_eq!(chain.sounding(), 1, "release tail still sounds");
    }

    #[test]
    fn cutoff_ramps_toward_note_hint() {
        let mut chain = MelodicChain::new(&EngineConfig::default());
        assert_eq!(chain.cutoff_hz(), 9000.0);
        chain.schedule([note(0.0, 0.5, 432.0)]);
        render(&mut chain, 0, 100);
        let mid = chain.cutoff_hz();
        assert!(mid < 9000.0 && mid > 2000.0, "ramp in progress, got {mid}");
        render(&mut chain, 100, 4410);
        assert_eq!(chain.cutoff_hz(), 2000.0);
    }

    #[test]
    fn release_all_discards_pending_and_releases_voices() {
        let mut chain = MelodicChain::new(&EngineConfig::default());
        chain.schedule([note(0.0, 2.0, 432.0), note(1.0, 2.0, 528.0)]);
        render(&mut chain, 0, 1000);
        chain.release_all();
        assert!(chain.upcoming().is_empty());
        assert_eq!(chain.held(), 0);
        assert_eq!(chain.sounding(), 1);

        // release is 1.5 s
        render(&mut chain, 1000, 44100 * 3);
        assert_eq!(chain.sounding(), 0);
    }

    #[test]
    fn voice_limit_is_respected() {
        let config = EngineConfig {
            max_voices: 2,
            ..Default::default()
        };
        let mut chain = MelodicChain::new(&config);
        chain.schedule((0..5).map(|i| note(i as f64 * 0.001, 1.0, 200.0 + i as f64)));
        render(&mut chain, 0, 441);
        assert_eq!(chain.sounding(), 2);
    }

    #[test]
    fn output_is_bounded() {
        let mut chain = MelodicChain::new(&EngineConfig::default());
        chain.set_envelope(EnvelopeShape::new(0.01, 0.2, 0.8, 0.5));
        chain.schedule((0..8).map(|i| note(i as f64 * 0.25, 0.2, 432.0 * (1.0 + i as f64 * 0.1))));
        let (l, r) = render(&mut chain, 0, 44100 * 3);
        for s in l.iter().chain(r.iter()) {
            assert!(s.is_finite() && s.abs() < 2.0, "sample out of range: {s}");
        }
    }
}
