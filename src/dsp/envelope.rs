//! ADSR envelope: linear attack, exponential decay and release.

use serde::{Deserialize, Serialize};

/// Exponential segments reach ~0.1% of their span by the end of the stage,
/// then snap to the target.
const EXP_RATE: f64 = 6.9;

/// Envelope timing in seconds and sustain level in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeShape {
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
}

impl EnvelopeShape {
    pub const fn new(attack: f64, decay: f64, sustain: f64, release: f64) -> Self {
        EnvelopeShape {
            attack,
            decay,
            sustain,
            release,
        }
    }
}

impl Default for EnvelopeShape {
    fn default() -> Self {
        EnvelopeShape::new(0.02, 0.8, 0.2, 1.5)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Stage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Envelope generator producing a gain in [0, 1] per sample.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub shape: EnvelopeShape,
    stage: Stage,
    level: f64,
    sample_rate: f64,
    stage_samples: usize,
    stage_counter: usize,
    start_level: f64,
}

impl Envelope {
    pub fn new(shape: EnvelopeShape, sample_rate: f64) -> Self {
        Envelope {
            shape,
            stage: Stage::Idle,
            level: 0.0,
            sample_rate,
            stage_samples: 0,
            stage_counter: 0,
            start_level: 0.0,
        }
    }

    fn enter(&mut self, stage: Stage, seconds: f64) {
        self.stage = stage;
        self.stage_samples = (seconds.max(0.0) * self.sample_rate) as usize;
        self.stage_counter = 0;
        self.start_level = self.level;
    }

    /// Note on. Retriggers from the current level.
    pub fn gate_on(&mut self) {
        self.enter(Stage::Attack, self.shape.attack);
    }

    /// Note off. No-op when idle or already releasing.
    pub fn gate_off(&mut self) {
        if matches!(self.stage, Stage::Idle | Stage::Release) {
            return;
        }
        self.enter(Stage::Release, self.shape.release);
    }

    /// Generate the next envelope sample [0, 1].
    pub fn next_sample(&mut self) -> f64 {
        match self.stage {
            Stage::Idle => self.level = 0.0,
            Stage::Attack => {
                if self.stage_counter >= self.stage_samples {
                    self.level = 1.0;
                    self.enter(Stage::Decay, self.shape.decay);
                } else {
                    let t = self.stage_counter as f64 / self.stage_samples as f64;
                    self.level = self.start_level + (1.0 - self.start_level) * t;
                    self.stage_counter += 1;
                }
            }
            Stage::Decay => {
                let sustain = self.shape.sustain.clamp(0.0, 1.0);
                if self.stage_counter >= self.stage_samples {
                    self.level = sustain;
                    self.stage = Stage::Sustain;
                } else {
                    let t = self.stage_counter as f64 / self.stage_samples as f64;
                    self.level = sustain + (self.start_level - sustain) * (-EXP_RATE * t).exp();
                    self.stage_counter += 1;
                }
            }
            Stage::Sustain => self.level = self.shape.sustain.clamp(0.0, 1.0),
            Stage::Release => {
                if self.stage_counter >= self.stage_samples {
                    self.level = 0.0;
                    self.stage = Stage::Idle;
                } else {
                    let t = self.stage_counter as f64 / self.stage_samples as f64;
                    self.level = self.start_level * (-EXP_RATE * t).exp();
                    self.stage_counter += 1;
                }
            }
        }
        self.level
    }

    /// Current level without advancing.
    pub fn level(&self) -> f64 {
        self.level
    }

    /// True once the release has run out (or the envelope never started).
    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Idle
    }

    pub fn is_releasing(&self) -> bool {
        self.stage == Stage::Release
    }
}
