//! Parameter smoothing: linear ramps toward a target and one-pole gain
//! smoothing for click-free level changes.

/// Linear ramp from the current value to a target over a fixed number of
/// samples.
#[derive(Debug, Clone)]
pub struct LinearRamp {
    value: f64,
    target: f64,
    step: f64,
    remaining: usize,
}

impl LinearRamp {
    pub fn new(value: f64) -> Self {
        LinearRamp {
            value,
            target: value,
            step: 0.0,
            remaining: 0,
        }
    }

    /// Start ramping toward `target`, arriving after `samples` samples.
    /// Zero samples jumps immediately.
    pub fn ramp_to(&mut self, target: f64, samples: usize) {
        self.target = target;
        if samples == 0 {
            self.value = target;
            self.remaining = 0;
        } else {
            self.step = (target - self.value) / samples as f64;
            self.remaining = samples;
        }
    }

    /// Advance one sample and return the new value.
    #[inline]
    pub fn next_value(&mut self) -> f64 {
        if self.remaining > 0 {
            self.remaining -= 1;
            self.value = if self.remaining == 0 {
                self.target
            } else {
                self.value + self.step
            };
        }
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn is_ramping(&self) -> bool {
        self.remaining > 0
    }
}

/// One-pole smoother for linear gain.
#[derive(Debug, Clone)]
pub struct SmoothedGain {
    current: f64,
    target: f64,
    coeff: f64,
}

impl SmoothedGain {
    /// Smoother reaching ~63% of a step in `time_ms`.
    pub fn new(gain: f64, time_ms: f64, sample_rate: f64) -> Self {
        let samples = (time_ms * 0.001 * sample_rate).max(1.0);
        SmoothedGain {
            current: gain,
            target: gain,
            coeff: (-1.0 / samples).exp(),
        }
    }

    pub fn set_target(&mut self, gain: f64) {
        self.target = gain.max(0.0);
    }

    #[inline]
    pub fn next_gain(&mut self) -> f64 {
        self.current = self.target + (self.current - self.target) * self.coeff;
        if (self.current - self.target).abs() < 1e-9 {
            self.current = self.target;
        }
        self.current
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn current(&self) -> f64 {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_arrives_exactly() {
        let mut ramp = LinearRamp::new(9000.0);
        ramp.ramp_to(2000.0, 4410);
        let mut last = 9000.0;
        for _ in 0..4410 {
            let v = ramp.next_value();
            assert!(v <= last, "ramp should descend");
            last = v;
        }
        assert_eq!(ramp.value(), 2000.0);
        assert!(!ramp.is_ramping());
        assert_eq!(ramp.next_value(), 2000.0);
    }

    #[test]
    fn zero_length_ramp_jumps() {
        let mut ramp = LinearRamp::new(1.0);
        ramp.ramp_to(5.0, 0);
        assert_eq!(ramp.value(), 5.0);
    }

    #[test]
    fn retarget_mid_ramp_starts_from_current() {
        let mut ramp = LinearRamp::new(0.0);
        ramp.ramp_to(100.0, 100);
        for _ in 0..50 {
            ramp.next_value();
        }
        let mid = ramp.value();
        ramp.ramp_to(0.0, 10);
        let next = ramp.next_value();
        assert!((next - (mid - mid / 10.0)).abs() < 1e-9);
    }

    #[test]
    fn smoother_converges_without_overshoot() {
        let mut g = SmoothedGain::new(0.0, 10.0, 44100.0);
        g.set_target(1.0);
        let mut prev = 0.0;
        for _ in 0..44100 {
            let v = g.next_gain();
            assert!(v >= prev && v <= 1.0);
            prev = v;
        }
        assert_eq!(g.current(), 1.0);
    }
}
