//! Colored noise sources over a seeded RNG.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Spectral tilt of a noise source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseColor {
    White,
    Pink,
    Brown,
}

/// A noise generator with output roughly within [-1, 1].
#[derive(Debug, Clone)]
pub struct Noise {
    pub color: NoiseColor,
    rng: StdRng,
    // Paul Kellet's pink filter state
    b: [f64; 7],
    // leaky integrator state for brown
    brown: f64,
}

impl Noise {
    pub fn new(color: NoiseColor, seed: u64) -> Self {
        Noise {
            color,
            rng: StdRng::seed_from_u64(seed),
            b: [0.0; 7],
            brown: 0.0,
        }
    }

    #[inline]
    fn white(&mut self) -> f64 {
        self.rng.gen_range(-1.0..1.0)
    }

    /// Generate the next sample.
    pub fn next_sample(&mut self) -> f64 {
        let white = self.white();
        match self.color {
            NoiseColor::White => white,
            NoiseColor::Pink => {
                let b = &mut self.b;
                b[0] = 0.99886 * b[0] + white * 0.0555179;
                b[1] = 0.99332 * b[1] + white * 0.0750759;
                b[2] = 0.96900 * b[2] + white * 0.1538520;
                b[3] = 0.86650 * b[3] + white * 0.3104856;
                b[4] = 0.55000 * b[4] + white * 0.5329522;
                b[5] = -0.7616 * b[5] - white * 0.0168980;
                let pink = b[0] + b[1] + b[2] + b[3] + b[4] + b[5] + b[6] + white * 0.5362;
                b[6] = white * 0.115926;
                pink * 0.11
            }
            NoiseColor::Brown => {
                self.brown = (self.brown + 0.02 * white) / 1.02;
                self.brown * 3.5
            }
        }
    }
}
