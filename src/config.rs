//! Engine configuration.
//!
//! Every tunable constant lives here with its default. Configurations are
//! plain serde data, so hosts can ship a JSON file and override only the
//! fields they care about.

use serde::{Deserialize, Serialize};

use crate::dsp::envelope::EnvelopeShape;
use crate::engine::volume::VolumeRange;
use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sample_rate: f64,

    // Scheduling
    pub tempo_bpm: f64,
    /// Notes due before `now + lookahead_secs` are scheduled on each tick.
    pub lookahead_secs: f64,
    pub tick_secs: f64,
    /// Delay before the first note after a start.
    pub lead_in_secs: f64,
    /// Fraction of each note's slot during which the gate is held.
    pub gate_ratio: f64,
    pub scale_steps: usize,
    pub fibonacci_len: usize,
    /// Open every start on the root before walking the ladder.
    pub anchor_root: bool,

    // Melodic voice
    pub voice_envelope: EnvelopeShape,
    pub max_voices: usize,
    pub default_cutoff_hz: f64,
    pub filter_ramp_secs: f64,
    pub autopan_hz: f64,
    pub reverb_decay_secs: f64,
    pub reverb_mix: f64,
    pub scale_voice_db: f64,
    pub binaural_voice_db: f64,

    // Binaural pair
    pub binaural_envelope: EnvelopeShape,
    pub binaural_tone_db: f64,

    // Levels
    pub main_initial_db: f64,
    pub ambient_initial_db: f64,
    pub main_range: VolumeRange,
    pub ambient_range: VolumeRange,
    pub sound_range: VolumeRange,
    pub gain_smoothing_ms: f64,

    // Ambient layers
    pub texture_secs: f64,
    pub texture_crossfade_secs: f64,
    pub toggle_fade_secs: f64,
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            sample_rate: 44100.0,
            tempo_bpm: 68.0,
            lookahead_secs: 0.15,
            tick_secs: 0.025,
            lead_in_secs: 0.1,
            gate_ratio: 0.95,
            scale_steps: 14,
            fibonacci_len: 8,
            anchor_root: true,
            voice_envelope: EnvelopeShape::new(0.02, 0.8, 0.2, 1.5),
            max_voices: 16,
            default_cutoff_hz: 9000.0,
            filter_ramp_secs: 0.1,
            autopan_hz: 1.0,
            reverb_decay_secs: 10.0,
            reverb_mix: 0.5,
            scale_voice_db: -9.0,
            binaural_voice_db: -18.0,
            binaural_envelope: EnvelopeShape::new(3.0, 1.0, 1.0, 3.0),
            binaural_tone_db: 0.0,
            main_initial_db: -9.0,
            ambient_initial_db: -12.0,
            main_range: VolumeRange::new(-40.0, 0.0),
            ambient_range: VolumeRange::new(-35.0, 0.0),
            sound_range: VolumeRange::new(-30.0, 6.0),
            gain_smoothing_ms: 20.0,
            texture_secs: 15.0,
            texture_crossfade_secs: 0.5,
            toggle_fade_secs: 0.05,
            seed: 0x5eed_ca1a,
        }
    }
}

impl EngineConfig {
    /// Parse a (possibly partial) JSON configuration and validate it.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let positive = [
            ("sample_rate", self.sample_rate),
            ("tempo_bpm", self.tempo_bpm),
            ("tick_secs", self.tick_secs),
            ("lookahead_secs", self.lookahead_secs),
            ("gate_ratio", self.gate_ratio),
            ("default_cutoff_hz", self.default_cutoff_hz),
            ("texture_secs", self.texture_secs),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(EngineError::Config(format!("{name} must be positive, got {value}")));
            }
        }
        if self.lookahead_secs <= self.tick_secs {
            return Err(EngineError::Config(format!(
                "lookahead ({}s) must exceed the tick period ({}s)",
                self.lookahead_secs, self.tick_secs
            )));
        }
        let non_negative = [
            ("lead_in_secs", self.lead_in_secs),
            ("filter_ramp_secs", self.filter_ramp_secs),
            ("gain_smoothing_ms", self.gain_smoothing_ms),
            ("texture_crossfade_secs", self.texture_crossfade_secs),
            ("toggle_fade_secs", self.toggle_fade_secs),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(EngineError::Config(format!("{name} must not be negative, got {value}")));
            }
        }
        if self.gate_ratio > 1.0 {
            return Err(EngineError::Config("gate_ratio must be at most 1".into()));
        }
        if self.scale_steps == 0 || self.fibonacci_len < 2 {
            return Err(EngineError::Config(
                "scale_steps must be at least 1 and fibonacci_len at least 2".into(),
            ));
        }
        if self.max_voices == 0 {
            return Err(EngineError::Config("max_voices must be at least 1".into()));
        }
        if self.texture_crossfade_secs >= self.texture_secs {
            return Err(EngineError::Config(
                "texture_crossfade_secs must be shorter than texture_secs".into(),
            ));
        }
        for (name, range) in [
            ("main_range", self.main_range),
            ("ambient_range", self.ambient_range),
            ("sound_range", self.sound_range),
        ] {
            if !(range.min_db < range.max_db) {
                return Err(EngineError::Config(format!("{name} min must be below max")));
            }
        }
        Ok(())
    }

    pub fn secs_to_frames(&self, secs: f64) -> usize {
        (secs.max(0.0) * self.sample_rate).round() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{ "tempo_bpm": 72, "seed": 7 }"#).unwrap();
        assert_eq!(config.tempo_bpm, 72.0);
        assert_eq!(config.seed, 7);
        assert_eq!(config.lookahead_secs, 0.15);
        assert_eq!(config.main_range, VolumeRange::new(-40.0, 0.0));
    }

    #[test]
    fn lookahead_must_exceed_tick() {
        let err = EngineConfig::from_json(r#"{ "lookahead_secs": 0.02, "tick_secs": 0.025 }"#)
            .unwrap_err();
        assert!(matches!(err, EngineError::Config(_)), "got {err}");
    }

    #[test]
    fn rejects_nan_lead_in() {
        let config = EngineConfig {
            lead_in_secs: f64::NAN,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("lead_in_secs"), "got {err}");

        let config = EngineConfig {
            toggle_fade_secs: f64::INFINITY,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_sample_rate() {
        let config = EngineConfig {
            sample_rate: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_inverted_volume_range() {
        let config = EngineConfig {
            sound_range: VolumeRange::new(6.0, -30.0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_json_is_reported() {
        assert!(matches!(
            EngineConfig::from_json("{ tempo"),
            Err(EngineError::Json(_))
        ));
    }
}
