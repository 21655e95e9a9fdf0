//! Stereo hall reverb for the melodic voice.
//!
//! Freeverb topology: eight damped comb filters in parallel per channel,
//! then four allpass diffusers in series. The comb feedback is derived from
//! the requested decay time instead of an abstract room size.

/// Delay-line lengths at 44.1 kHz.
const COMB_TUNING: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];
const ALLPASS_TUNING: [usize; 4] = [556, 441, 341, 225];
const STEREO_SPREAD: usize = 23;
/// Input attenuation so eight summed combs stay in range.
const INPUT_GAIN: f64 = 0.015;
const MAX_FEEDBACK: f64 = 0.98;
const MIN_FEEDBACK: f64 = 0.5;

#[derive(Debug, Clone)]
struct Comb {
    buffer: Vec<f64>,
    index: usize,
    feedback: f64,
    damp: f64,
    store: f64,
}

impl Comb {
    fn new(size: usize) -> Self {
        Comb {
            buffer: vec![0.0; size.max(1)],
            index: 0,
            feedback: 0.84,
            damp: 0.5,
            store: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f64) -> f64 {
        let output = self.buffer[self.index];
        self.store = output * (1.0 - self.damp) + self.store * self.damp;
        self.buffer[self.index] = input + self.store * self.feedback;
        self.index = (self.index + 1) % self.buffer.len();
        output
    }
}

#[derive(Debug, Clone)]
struct Allpass {
    buffer: Vec<f64>,
    index: usize,
}

impl Allpass {
    fn new(size: usize) -> Self {
        Allpass {
            buffer: vec![0.0; size.max(1)],
            index: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f64) -> f64 {
        let delayed = self.buffer[self.index];
        self.buffer[self.index] = input + delayed * 0.5;
        self.index = (self.index + 1) % self.buffer.len();
        delayed - input
    }
}

/// A stereo algorithmic reverb with a dry/wet mix.
#[derive(Debug, Clone)]
pub struct Reverb {
    comb_l: Vec<Comb>,
    comb_r: Vec<Comb>,
    allpass_l: Vec<Allpass>,
    allpass_r: Vec<Allpass>,
    /// Dry/wet mix (0.0 = fully dry, 1.0 = fully wet).
    pub mix: f64,
    /// Approximate RT60 in seconds.
    decay: f64,
    sample_rate: f64,
}

impl Reverb {
    /// Reverb whose tail falls by 60 dB in roughly `decay_secs`.
    pub fn with_decay(sample_rate: f64, decay_secs: f64, mix: f64) -> Self {
        let scale = sample_rate / 44100.0;
        let sized = |t: usize, spread: usize| ((t as f64) * scale) as usize + spread;

        let mut reverb = Reverb {
            comb_l: COMB_TUNING.iter().map(|&t| Comb::new(sized(t, 0))).collect(),
            comb_r: COMB_TUNING.iter().map(|&t| Comb::new(sized(t, STEREO_SPREAD))).collect(),
            allpass_l: ALLPASS_TUNING.iter().map(|&t| Allpass::new(sized(t, 0))).collect(),
            allpass_r: ALLPASS_TUNING
                .iter()
                .map(|&t| Allpass::new(sized(t, STEREO_SPREAD)))
                .collect(),
            mix: mix.clamp(0.0, 1.0),
            decay: decay_secs,
            sample_rate,
        };
        reverb.set_decay(decay_secs);
        reverb
    }

    /// Recompute comb feedback so each comb loses 60 dB over `decay_secs`.
    pub fn set_decay(&mut self, decay_secs: f64) {
        self.decay = decay_secs.max(0.01);
        for comb in self.comb_l.iter_mut().chain(self.comb_r.iter_mut()) {
            let delay_secs = comb.buffer.len() as f64 / self.sample_rate;
            let g = 10f64.powf(-3.0 * delay_secs / self.decay);
            comb.feedback = g.clamp(MIN_FEEDBACK, MAX_FEEDBACK);
        }
    }

    /// Process a stereo sample pair.
    #[inline]
    pub fn process(&mut self, left: f64, right: f64) -> (f64, f64) {
        let input = (left + right) * INPUT_GAIN;

        let mut wet_l: f64 = self.comb_l.iter_mut().map(|c| c.process(input)).sum();
        let mut wet_r: f64 = self.comb_r.iter_mut().map(|c| c.process(input)).sum();
        for ap in &mut self.allpass_l {
            wet_l = ap.process(wet_l);
        }
        for ap in &mut self.allpass_r {
            wet_r = ap.process(wet_r);
        }

        (
            left * (1.0 - self.mix) + wet_l * self.mix,
            right * (1.0 - self.mix) + wet_r * self.mix,
        )
    }
}
