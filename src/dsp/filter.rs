//! Biquad filter (RBJ Audio EQ Cookbook coefficients, Direct Form II
//! Transposed).

use std::f64::consts::PI;

/// Filter response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterType {
    Lowpass,
    Bandpass,
}

/// A 2nd-order IIR filter whose cutoff may be moved every sample.
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    pub filter_type: FilterType,
    frequency: f64,
    q: f64,

    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,

    z1: f64,
    z2: f64,

    sample_rate: f64,
    dirty: bool,
}

impl BiquadFilter {
    pub fn new(filter_type: FilterType, frequency: f64, sample_rate: f64) -> Self {
        let mut f = BiquadFilter {
            filter_type,
            frequency: 1000.0,
            q: std::f64::consts::FRAC_1_SQRT_2,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
            sample_rate,
            dirty: true,
        };
        f.set_frequency(frequency);
        f.update_coefficients();
        f
    }

    pub fn lowpass(frequency: f64, sample_rate: f64) -> Self {
        Self::new(FilterType::Lowpass, frequency, sample_rate)
    }

    fn update_coefficients(&mut self) {
        let w0 = 2.0 * PI * self.frequency / self.sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * self.q);

        let (b0, b1, b2) = match self.filter_type {
            FilterType::Lowpass => {
                let b1 = 1.0 - cos_w0;
                (b1 / 2.0, b1, b1 / 2.0)
            }
            // constant 0 dB peak gain
            FilterType::Bandpass => (alpha, 0.0, -alpha),
        };
        let a0 = 1.0 + alpha;

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = -2.0 * cos_w0 / a0;
        self.a2 = (1.0 - alpha) / a0;
        self.dirty = false;
    }

    /// Process a single sample through the filter.
    pub fn process(&mut self, input: f64) -> f64 {
        if self.dirty {
            self.update_coefficients();
        }

        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output
    }

    /// Move the cutoff, kept between 10 Hz and just under Nyquist.
    pub fn set_frequency(&mut self, freq: f64) {
        let nyquist = self.sample_rate * 0.5;
        let clamped = freq.clamp(10.0, nyquist * 0.99);
        if clamped != self.frequency {
            self.frequency = clamped;
            self.dirty = true;
        }
    }

    pub fn set_q(&mut self, q: f64) {
        self.q = q.max(0.01);
        self.dirty = true;
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }
}
