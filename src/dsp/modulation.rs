//! Low-frequency modulation: LFOs, swept filters and auto-panning.

use std::f64::consts::{FRAC_PI_2, PI};

use super::filter::{BiquadFilter, FilterType};

/// Sine LFO producing values in [0, 1].
#[derive(Debug, Clone)]
pub struct Lfo {
    pub rate_hz: f64,
    phase: f64,
    sample_rate: f64,
}

impl Lfo {
    pub fn new(rate_hz: f64, sample_rate: f64) -> Self {
        Lfo {
            rate_hz,
            phase: 0.0,
            sample_rate,
        }
    }

    /// Start at a given phase in cycles, [0, 1).
    pub fn with_phase(mut self, phase: f64) -> Self {
        self.phase = phase.rem_euclid(1.0);
        self
    }

    /// Next value in [0, 1]. Starts at the trough.
    #[inline]
    pub fn next01(&mut self) -> f64 {
        let v = 0.5 - 0.5 * (2.0 * PI * self.phase).cos();
        self.phase += self.rate_hz / self.sample_rate;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        v
    }

    /// Next value mapped onto [min, max].
    #[inline]
    pub fn next_between(&mut self, min: f64, max: f64) -> f64 {
        min + (max - min) * self.next01()
    }
}

/// Equal-power pan gains for a mono source. `pan` in [-1, 1]; -1 is hard
/// left (right gain 0), +1 hard right.
#[inline]
pub fn pan_gains(pan: f64) -> (f64, f64) {
    let angle = (pan.clamp(-1.0, 1.0) + 1.0) * 0.5 * FRAC_PI_2;
    (angle.cos(), angle.sin())
}

/// A biquad whose cutoff an LFO sweeps exponentially from `base_hz` up to
/// `base_hz × 2^(octaves × depth)`.
#[derive(Debug, Clone)]
pub struct AutoFilter {
    filter: BiquadFilter,
    lfo: Lfo,
    base_hz: f64,
    octaves: f64,
    depth: f64,
}

impl AutoFilter {
    pub fn new(
        filter_type: FilterType,
        rate_hz: f64,
        base_hz: f64,
        octaves: f64,
        sample_rate: f64,
    ) -> Self {
        AutoFilter {
            filter: BiquadFilter::new(filter_type, base_hz, sample_rate),
            lfo: Lfo::new(rate_hz, sample_rate),
            base_hz,
            octaves,
            depth: 1.0,
        }
    }

    pub fn with_depth(mut self, depth: f64) -> Self {
        self.depth = depth.clamp(0.0, 1.0);
        self
    }

    pub fn with_q(mut self, q: f64) -> Self {
        self.filter.set_q(q);
        self
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let sweep = self.lfo.next01() * self.octaves * self.depth;
        self.filter.set_frequency(self.base_hz * sweep.exp2());
        self.filter.process(input)
    }

    pub fn cutoff(&self) -> f64 {
        self.filter.frequency()
    }
}

/// Moves a mono signal across the stereo field with a sine LFO.
#[derive(Debug, Clone)]
pub struct AutoPanner {
    lfo: Lfo,
    pub depth: f64,
}

impl AutoPanner {
    pub fn new(rate_hz: f64, sample_rate: f64) -> Self {
        AutoPanner {
            // quarter-cycle offset so the sweep starts centered
            lfo: Lfo::new(rate_hz, sample_rate).with_phase(0.25),
            depth: 1.0,
        }
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> (f64, f64) {
        let pan = (self.lfo.next01() * 2.0 - 1.0) * self.depth;
        let (gl, gr) = pan_gains(pan);
        (input * gl, input * gr)
    }
}
