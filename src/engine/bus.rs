//! Output bus: the single destination every path mixes into.
//!
//! Applies the smoothed master gain, the mute switch and tanh soft
//! clipping. Muting is the one place where "silence everything" happens.

use crate::dsp::ramp::SmoothedGain;

#[derive(Debug, Clone)]
pub struct OutputBus {
    master: SmoothedGain,
    mute: SmoothedGain,
    muted: bool,
}

impl OutputBus {
    pub fn new(master_gain: f64, smoothing_ms: f64, sample_rate: f64) -> Self {
        OutputBus {
            master: SmoothedGain::new(master_gain, smoothing_ms, sample_rate),
            mute: SmoothedGain::new(1.0, smoothing_ms, sample_rate),
            muted: false,
        }
    }

    pub fn set_master_gain(&mut self, gain: f64) {
        self.master.set_target(gain);
    }

    pub fn master_gain(&self) -> f64 {
        self.master.target()
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.mute.set_target(if muted { 0.0 } else { 1.0 });
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Mix one stereo frame already summed from every path.
    #[inline]
    pub fn process(&mut self, left: f64, right: f64) -> (f64, f64) {
        let gain = self.master.next_gain() * self.mute.next_gain();
        (soft_clip(left * gain), soft_clip(right * gain))
    }
}

/// Soft clipper using tanh to prevent harsh digital clipping.
#[inline]
fn soft_clip(x: f64) -> f64 {
    x.tanh()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_stays_silent() {
        let mut bus = OutputBus::new(1.0, 10.0, 44100.0);
        for _ in 0..100 {
            assert_eq!(bus.process(0.0, 0.0), (0.0, 0.0));
        }
    }

    #[test]
    fn applies_master_gain_and_clip() {
        let mut bus = OutputBus::new(0.5, 10.0, 44100.0);
        let (l, r) = bus.process(0.8, -0.4);
        assert!((l - soft_clip(0.4)).abs() < 1e-10);
        assert!((r - soft_clip(-0.2)).abs() < 1e-10);
    }

    #[test]
    fn loud_input_is_bounded() {
        let mut bus = OutputBus::new(1.0, 10.0, 44100.0);
        let (l, r) = bus.process(50.0, -50.0);
        assert!(l < 1.0 && r > -1.0);
    }

    #[test]
    fn mute_fades_to_silence() {
        let mut bus = OutputBus::new(1.0, 5.0, 44100.0);
        bus.set_muted(true);
        assert!(bus.is_muted());
        let mut last = (0.0, 0.0);
        for _ in 0..44100 {
            last = bus.process(0.5, 0.5);
        }
        assert!(last.0.abs() < 1e-6, "muted bus should be silent, got {}", last.0);

        bus.set_muted(false);
        for _ in 0..44100 {
            last = bus.process(0.5, 0.5);
        }
        assert!((last.0 - soft_clip(0.5)).abs() < 1e-6);
    }

    #[test]
    fn master_gain_changes_smoothly() {
        let mut bus = OutputBus::new(1.0, 20.0, 44100.0);
        bus.set_master_gain(0.0);
        let (first, _) = bus.process(0.5, 0.5);
        assert!(first > 0.4, "gain change must not jump, got {first}");
        assert_eq!(bus.master_gain(), 0.0);
    }
}
