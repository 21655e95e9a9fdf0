//! Preset tables: the tracks a session can start and the ambient sounds it
//! can layer.
//!
//! Tables are read-only data supplied by the host. The built-in defaults
//! cover the standard solfeggio tones, the five brainwave bands and the
//! stock ambient library; a host can replace any of them with JSON.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::dsp::envelope::EnvelopeShape;
use crate::engine::PlaybackMode;
use crate::engine::ambient::RecipeTag;
use crate::error::EngineError;

// ── Tracks ──────────────────────────────────────────────────

/// A melodic track walked around a single root frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleTrack {
    pub name: String,
    pub freq_hz: f64,
    /// Cutoff the voice filter ramps toward on each note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lowpass_hz: Option<f64>,
    #[serde(default)]
    pub envelope: EnvelopeShape,
}

/// A binaural-beat track: one tone per ear, `delta_hz` apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinauralTrack {
    pub name: String,
    pub base_hz: f64,
    pub delta_hz: f64,
    pub left_hz: f64,
    pub right_hz: f64,
    /// Cutoff for the quiet melodic layer under the tones.
    pub safe_lowpass_hz: f64,
}

impl BinauralTrack {
    pub fn new(name: &str, base_hz: f64, delta_hz: f64, safe_lowpass_hz: f64) -> Self {
        BinauralTrack {
            name: name.to_owned(),
            base_hz,
            delta_hz,
            left_hz: base_hz,
            right_hz: base_hz + delta_hz,
            safe_lowpass_hz,
        }
    }
}

/// A resolved preset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Track<'a> {
    Scale(&'a ScaleTrack),
    Binaural(&'a BinauralTrack),
}

impl Track<'_> {
    pub fn mode(&self) -> PlaybackMode {
        match self {
            Track::Scale(_) => PlaybackMode::Scale,
            Track::Binaural(_) => PlaybackMode::Binaural,
        }
    }

    /// Root of the melodic walk.
    pub fn base_hz(&self) -> f64 {
        match self {
            Track::Scale(t) => t.freq_hz,
            Track::Binaural(t) => t.base_hz,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Track::Scale(t) => &t.name,
            Track::Binaural(t) => &t.name,
        }
    }
}

// ── Ambient descriptors ─────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbientDescriptor {
    pub id: String,
    pub recipe: RecipeTag,
}

impl AmbientDescriptor {
    pub fn new(id: &str, recipe: RecipeTag) -> Self {
        AmbientDescriptor {
            id: id.to_owned(),
            recipe,
        }
    }
}

// ── Table ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresetTable {
    pub scale: Vec<ScaleTrack>,
    pub binaural: Vec<BinauralTrack>,
    pub ambient: Vec<AmbientDescriptor>,
}

fn scale_track(freq_hz: f64, lowpass_hz: f64, envelope: EnvelopeShape) -> ScaleTrack {
    ScaleTrack {
        name: format!("{freq_hz} Hz"),
        freq_hz,
        lowpass_hz: Some(lowpass_hz),
        envelope,
    }
}

impl Default for PresetTable {
    fn default() -> Self {
        let soft = EnvelopeShape::new(0.05, 1.2, 0.3, 2.5);
        let plain = EnvelopeShape::default();
        let bright = EnvelopeShape::new(0.02, 0.6, 0.15, 1.2);
        PresetTable {
            scale: vec![
                scale_track(174.0, 1200.0, soft),
                scale_track(285.0, 1500.0, soft),
                scale_track(396.0, 2000.0, plain),
                scale_track(417.0, 2200.0, plain),
                scale_track(432.0, 2400.0, plain),
                scale_track(528.0, 2800.0, plain),
                scale_track(639.0, 3200.0, plain),
                scale_track(741.0, 3600.0, bright),
                scale_track(852.0, 4200.0, bright),
                scale_track(963.0, 4800.0, bright),
            ],
            binaural: vec![
                BinauralTrack::new("delta", 100.0, 2.5, 800.0),
                BinauralTrack::new("theta", 150.0, 6.0, 1000.0),
                BinauralTrack::new("alpha", 200.0, 10.0, 1200.0),
                BinauralTrack::new("beta", 220.0, 18.0, 1500.0),
                BinauralTrack::new("gamma", 250.0, 40.0, 2000.0),
            ],
            ambient: vec![
                AmbientDescriptor::new("white_noise", RecipeTag::WhiteNoise),
                AmbientDescriptor::new("pink_noise", RecipeTag::PinkNoise),
                AmbientDescriptor::new("brown_noise", RecipeTag::BrownNoise),
                AmbientDescriptor::new("rain", RecipeTag::Rain),
                AmbientDescriptor::new("ocean_waves", RecipeTag::OceanWaves),
                AmbientDescriptor::new("wind", RecipeTag::Wind),
                AmbientDescriptor::new("fire", RecipeTag::Fire),
                AmbientDescriptor::new("stream", RecipeTag::Stream),
                AmbientDescriptor::new("tuning_forks_spatial", RecipeTag::TuningForks),
                AmbientDescriptor::new("forest", RecipeTag::Forest),
                AmbientDescriptor::new("gentle_stream", RecipeTag::GentleStream),
            ],
        }
    }
}

impl PresetTable {
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let table: PresetTable = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let positive = |what: &str, name: &str, hz: f64| {
            if hz.is_finite() && hz > 0.0 {
                Ok(())
            } else {
                Err(EngineError::Config(format!("{what} of '{name}' must be positive, got {hz}")))
            }
        };
        for t in &self.scale {
            positive("frequency", &t.name, t.freq_hz)?;
            if let Some(hz) = t.lowpass_hz {
                positive("lowpass", &t.name, hz)?;
            }
        }
        for t in &self.binaural {
            positive("base frequency", &t.name, t.base_hz)?;
            positive("left frequency", &t.name, t.left_hz)?;
            positive("right frequency", &t.name, t.right_hz)?;
            positive("safe lowpass", &t.name, t.safe_lowpass_hz)?;
        }
        let mut seen = HashSet::new();
        for d in &self.ambient {
            if !seen.insert(d.id.as_str()) {
                return Err(EngineError::Config(format!("duplicate ambient id '{}'", d.id)));
            }
        }
        Ok(())
    }

    pub fn track(&self, mode: PlaybackMode, index: usize) -> Result<Track<'_>, EngineError> {
        let track = match mode {
            PlaybackMode::Scale => self.scale.get(index).map(Track::Scale),
            PlaybackMode::Binaural => self.binaural.get(index).map(Track::Binaural),
        };
        track.ok_or(EngineError::UnknownPreset { mode, index })
    }

    pub fn ambient_ids(&self) -> impl Iterator<Item = &str> {
        self.ambient.iter().map(|d| d.id.as_str())
    }
}
