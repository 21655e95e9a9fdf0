//! Offline rendering: run a whole session through the engine and encode it
//! as a 16-bit stereo WAV.

use std::collections::HashSet;
use std::io::Cursor;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::EngineConfig;
use crate::engine::{Engine, PlaybackMode};
use crate::error::EngineError;
use crate::preset::PresetTable;

const BLOCK_FRAMES: usize = 1024;

/// What to play in an offline session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionPlan {
    /// Track kind; `None` renders ambient layers only.
    pub mode: Option<PlaybackMode>,
    pub preset: usize,
    pub ambient: Vec<String>,
    pub main_volume: Option<f64>,
    pub ambient_volume: Option<f64>,
}

impl Default for SessionPlan {
    fn default() -> Self {
        SessionPlan {
            mode: Some(PlaybackMode::Scale),
            preset: 4,
            ambient: Vec::new(),
            main_volume: None,
            ambient_volume: None,
        }
    }
}

impl SessionPlan {
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Ambient ids in plan order with repeats dropped. Each id is a toggle,
    /// so a repeat would switch the layer back off.
    pub fn ambient_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.ambient
            .iter()
            .map(String::as_str)
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

/// Rendered stereo audio.
#[derive(Debug, Clone)]
pub struct RenderedSession {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
    pub sample_rate: u32,
}

impl RenderedSession {
    pub fn frames(&self) -> usize {
        self.left.len()
    }
}

/// Render `seconds` of the planned session. Unknown presets and sound ids
/// are errors here, since nobody is around to notice a silent no-op.
pub fn render_session(
    config: EngineConfig,
    presets: PresetTable,
    plan: &SessionPlan,
    seconds: f64,
) -> Result<RenderedSession, EngineError> {
    if !(seconds.is_finite() && seconds >= 0.0) {
        return Err(EngineError::Config(format!("session length must be finite and non-negative, got {seconds}")));
    }
    if let Some(mode) = plan.mode {
        presets.track(mode, plan.preset)?;
    }
    let ambient = plan.ambient_ids();
    if let Some(id) = ambient.iter().find(|id| !presets.ambient_ids().any(|k| k == **id)) {
        return Err(EngineError::UnknownSound(id.to_string()));
    }

    let sample_rate = config.sample_rate;
    let mut engine = Engine::new(config, presets)?;
    if let Some(v) = plan.main_volume {
        engine.set_main_volume(v);
    }
    if let Some(v) = plan.ambient_volume {
        engine.set_ambient_master_volume(v);
    }
    for id in ambient {
        engine.toggle_ambient(id);
    }
    if let Some(mode) = plan.mode {
        engine.start(mode, plan.preset)?;
    }

    let total = (seconds * sample_rate).round() as usize;
    let mut left = vec![0.0_f32; total];
    let mut right = vec![0.0_f32; total];
    for (l, r) in left
        .chunks_mut(BLOCK_FRAMES)
        .zip(right.chunks_mut(BLOCK_FRAMES))
    {
        engine.render(l, r);
    }
    engine.stop(true);
    info!(frames = total, seconds, "session rendered");

    Ok(RenderedSession {
        left,
        right,
        sample_rate: sample_rate.round() as u32,
    })
}

/// Encode a rendered session as 16-bit stereo PCM WAV bytes.
pub fn encode_wav(session: &RenderedSession) -> Result<Vec<u8>, EngineError> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: session.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::with_capacity(44 + session.frames() * 4));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for (&l, &r) in session.left.iter().zip(&session.right) {
            writer.write_sample(to_i16(l))?;
            writer.write_sample(to_i16(r))?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Render and encode in one step.
pub fn render_wav(
    config: EngineConfig,
    presets: PresetTable,
    plan: &SessionPlan,
    seconds: f64,
) -> Result<Vec<u8>, EngineError> {
    encode_wav(&render_session(config, presets, plan, seconds)?)
}

#[inline]
fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0) as i16
}
