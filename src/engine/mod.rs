//! The relaxation engine.
//!
//! [`Engine`] owns every synthesis node it creates: the note scheduler and
//! melodic voice chain, the binaural pair, the ambient layers and the
//! output bus. All of it runs on one timeline, the [`AudioClock`], which
//! only advances as frames are rendered. Control calls and the lookahead
//! tick therefore never race; `render` runs the tick at its exact frame by
//! splitting each block at tick boundaries.

pub mod ambient;
pub mod binaural;
pub mod bus;
pub mod clock;
pub mod melodic;
pub mod scheduler;
pub mod volume;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::preset::{PresetTable, Track};

use self::ambient::{MixerGraphManager, Texture, TextureJob};
use self::binaural::BinauralDriver;
use self::bus::OutputBus;
use self::clock::AudioClock;
use self::melodic::MelodicChain;
use self::scheduler::{NoteScheduler, ScheduledNote};
use self::volume::{db_to_gain, to_control, to_gain};

/// Which kind of track to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackMode {
    #[serde(alias = "solfeggio")]
    Scale,
    #[serde(alias = "binaural-beat")]
    Binaural,
}

impl FromStr for PlaybackMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scale" | "solfeggio" => Ok(PlaybackMode::Scale),
            "binaural" | "binaural-beat" => Ok(PlaybackMode::Binaural),
            other => Err(EngineError::Config(format!("unknown playback mode '{other}'"))),
        }
    }
}

impl fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PlaybackMode::Scale => "scale",
            PlaybackMode::Binaural => "binaural",
        })
    }
}

/// The melodic/binaural path. Ambient layers are tracked separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Idle,
    PlayingScale,
    PlayingBinaural,
}

/// Whether the audio backend lets us produce sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextState {
    /// Not yet permitted (e.g. waiting for a user gesture).
    Suspended,
    Running,
    /// The backend failed; only a new engine can play again.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOutcome {
    Started,
    /// Queued until the context resumes.
    Deferred,
    /// Unknown preset; nothing changed.
    Ignored,
}

/// Point-in-time view of the engine for hosts and UIs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineSnapshot {
    pub state: EngineState,
    pub context: ContextState,
    pub time_secs: f64,
    pub preset: Option<(PlaybackMode, usize)>,
    pub pending_start: Option<(PlaybackMode, usize)>,
    pub binaural_hz: Option<(f64, f64)>,
    pub upcoming: Vec<ScheduledNote>,
    pub active_ambient: Vec<String>,
    pub main_volume: f64,
    pub ambient_volume: f64,
    pub muted: bool,
}

/// What a start needs from the preset, copied out so the table borrow ends.
struct TrackPlan {
    mode: PlaybackMode,
    name: String,
    base_hz: f64,
    cutoff_hz: f64,
    envelope: crate::dsp::envelope::EnvelopeShape,
    voice_db: f64,
    binaural: Option<(f64, f64)>,
}

pub struct Engine {
    config: EngineConfig,
    presets: PresetTable,
    clock: AudioClock,
    context: ContextState,
    state: EngineState,
    current: Option<(PlaybackMode, usize)>,
    pending_start: Option<(PlaybackMode, usize)>,
    scheduler: NoteScheduler,
    melodic: MelodicChain,
    binaural: BinauralDriver,
    ambient: MixerGraphManager,
    bus: OutputBus,
    main_volume: f64,
    ambient_volume: f64,
    scratch: (Vec<f64>, Vec<f64>),
    interleave: (Vec<f32>, Vec<f32>),
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("context", &self.context)
            .field("state", &self.state)
            .field("current", &self.current)
            .field("time_secs", &self.clock.now())
            .field("active_ambient", &self.ambient.active_ids())
            .finish()
    }
}

impl Engine {
    /// Validate the configuration and presets and build a running engine.
    pub fn new(config: EngineConfig, presets: PresetTable) -> Result<Self, EngineError> {
        config.validate()?;
        presets.validate()?;
        Ok(Self::build(config, presets, ContextState::Running))
    }

    /// An engine whose context starts suspended; starts are deferred until
    /// [`Engine::resume`].
    pub fn suspended(config: EngineConfig, presets: PresetTable) -> Result<Self, EngineError> {
        config.validate()?;
        presets.validate()?;
        Ok(Self::build(config, presets, ContextState::Suspended))
    }

    /// Default configuration and the built-in preset tables.
    pub fn with_defaults() -> Self {
        Self::build(EngineConfig::default(), PresetTable::default(), ContextState::Running)
    }

    fn build(config: EngineConfig, presets: PresetTable, context: ContextState) -> Self {
        let sr = config.sample_rate;
        let ambient = MixerGraphManager::new(&config, &presets.ambient);
        Engine {
            clock: AudioClock::new(sr),
            context,
            state: EngineState::Idle,
            current: None,
            pending_start: None,
            scheduler: NoteScheduler::new(&config),
            melodic: MelodicChain::new(&config),
            binaural: BinauralDriver::new(&config),
            ambient,
            bus: OutputBus::new(db_to_gain(config.main_initial_db), config.gain_smoothing_ms, sr),
            main_volume: to_control(config.main_initial_db, config.main_range),
            ambient_volume: to_control(config.ambient_initial_db, config.ambient_range),
            scratch: (Vec::new(), Vec::new()),
            interleave: (Vec::new(), Vec::new()),
            config,
            presets,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn presets(&self) -> &PresetTable {
        &self.presets
    }

    // ── Transport ───────────────────────────────────────────

    /// Start a track, tearing down whatever melodic or binaural playback
    /// was running.
    ///
    /// Unknown presets are logged and ignored. While the context is
    /// suspended the start is queued and runs on [`Engine::resume`]. A
    /// closed context is a backend failure.
    pub fn start(&mut self, mode: PlaybackMode, index: usize) -> Result<StartOutcome, EngineError> {
        if let Err(err) = self.presets.track(mode, index) {
            warn!(%err, "start ignored");
            return Ok(StartOutcome::Ignored);
        }
        match self.context {
            ContextState::Closed => Err(EngineError::Backend("audio context is closed".into())),
            ContextState::Suspended => {
                info!(%mode, index, "audio context suspended, start deferred");
                self.pending_start = Some((mode, index));
                Ok(StartOutcome::Deferred)
            }
            ContextState::Running => {
                self.begin(mode, index);
                Ok(StartOutcome::Started)
            }
        }
    }

    fn plan(&self, mode: PlaybackMode, index: usize) -> Option<TrackPlan> {
        let track = self.presets.track(mode, index).ok()?;
        let plan = match track {
            Track::Scale(t) => TrackPlan {
                mode,
                name: t.name.clone(),
                base_hz: t.freq_hz,
                cutoff_hz: t.lowpass_hz.unwrap_or(self.config.default_cutoff_hz),
                envelope: t.envelope,
                voice_db: self.config.scale_voice_db,
                binaural: None,
            },
            Track::Binaural(t) => TrackPlan {
                mode,
                name: t.name.clone(),
                base_hz: t.base_hz,
                cutoff_hz: t.safe_lowpass_hz,
                envelope: self.config.voice_envelope,
                voice_db: self.config.binaural_voice_db,
                binaural: Some((t.left_hz, t.right_hz)),
            },
        };
        Some(plan)
    }

    fn begin(&mut self, mode: PlaybackMode, index: usize) {
        let Some(plan) = self.plan(mode, index) else {
            return;
        };
        self.teardown_playback();

        self.melodic.set_envelope(plan.envelope);
        self.melodic.set_level_db(plan.voice_db);
        self.scheduler.start(plan.base_hz, plan.cutoff_hz, self.clock.now());
        self.state = match plan.binaural {
            Some((left, right)) => {
                self.binaural.start(left, right);
                EngineState::PlayingBinaural
            }
            None => EngineState::PlayingScale,
        };
        self.current = Some((mode, index));
        info!(mode = %plan.mode, index, track = %plan.name, base_hz = plan.base_hz, "playback started");

        // First tick runs immediately so the lead-in note is queued.
        self.run_tick();
    }

    fn teardown_playback(&mut self) {
        self.scheduler.stop();
        self.melodic.release_all();
        self.binaural.stop();
        self.state = EngineState::Idle;
        self.current = None;
    }

    /// Stop melodic/binaural playback, optionally clearing ambient layers
    /// too. Safe to call at any time.
    pub fn stop(&mut self, clear_ambient: bool) {
        let was = self.state;
        self.pending_start = None;
        self.teardown_playback();
        if clear_ambient {
            self.ambient.deactivate_all();
        }
        if was != EngineState::Idle || clear_ambient {
            info!(clear_ambient, "playback stopped");
        }
    }

    /// Stop the melody and tones; ambient layers keep playing.
    pub fn pause(&mut self) {
        self.stop(false);
    }

    /// Mark the context running and run any deferred start.
    pub fn resume(&mut self) -> Result<(), EngineError> {
        match self.context {
            ContextState::Closed => Err(EngineError::Backend("audio context is closed".into())),
            ContextState::Running => Ok(()),
            ContextState::Suspended => {
                self.context = ContextState::Running;
                debug!("audio context resumed");
                if let Some((mode, index)) = self.pending_start.take() {
                    self.begin(mode, index);
                }
                Ok(())
            }
        }
    }

    /// Handle an audio backend failure: full cleanup, context closed, state
    /// Idle. Returns the error to surface to the caller.
    pub fn fail_backend(&mut self, reason: impl Into<String>) -> EngineError {
        let reason = reason.into();
        error!(%reason, "audio backend failed");
        self.stop(true);
        self.context = ContextState::Closed;
        EngineError::Backend(reason)
    }

    // ── Ambient and levels ──────────────────────────────────

    /// Flip one ambient layer. A sound whose texture is not cached yet is
    /// rendered inside this call; realtime hosts prepare it first.
    pub fn toggle_ambient(&mut self, id: &str) -> bool {
        self.ambient.toggle(id)
    }

    /// Render and cache `id`'s texture now so a later toggle is instant.
    /// `false` for unknown ids.
    pub fn prepare_ambient(&mut self, id: &str) -> bool {
        match self.ambient.texture_job(id) {
            Some(job) => self.ambient.insert_texture(id, job.render()),
            None => self.ambient.is_known(id),
        }
    }

    /// The texture render `id` still needs, for running off the audio path.
    pub fn ambient_texture_job(&self, id: &str) -> Option<TextureJob> {
        self.ambient.texture_job(id)
    }

    /// Hand back a texture rendered from [`Engine::ambient_texture_job`].
    pub fn insert_ambient_texture(&mut self, id: &str, texture: Arc<Texture>) -> bool {
        self.ambient.insert_texture(id, texture)
    }

    pub fn set_main_volume(&mut self, control: f64) {
        self.main_volume = control.clamp(0.0, 100.0);
        self.bus.set_master_gain(to_gain(self.main_volume, self.config.main_range));
    }

    pub fn set_ambient_master_volume(&mut self, control: f64) {
        self.ambient_volume = control.clamp(0.0, 100.0);
        self.ambient.set_master_volume(self.ambient_volume);
    }

    pub fn set_ambient_volume(&mut self, id: &str, control: f64) -> bool {
        self.ambient.set_sound_volume(id, control)
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.bus.set_muted(muted);
    }

    // ── Observation ─────────────────────────────────────────

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn context_state(&self) -> ContextState {
        self.context
    }

    pub fn current_preset(&self) -> Option<(PlaybackMode, usize)> {
        self.current
    }

    /// Seconds of audio rendered so far.
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Notes scheduled but not yet sounding.
    pub fn upcoming_notes(&self) -> Vec<ScheduledNote> {
        self.melodic.upcoming()
    }

    pub fn active_ambient(&self) -> Vec<String> {
        self.ambient.active_ids()
    }

    pub fn ambient(&self) -> &MixerGraphManager {
        &self.ambient
    }

    pub fn binaural_frequencies(&self) -> Option<(f64, f64)> {
        self.binaural.frequencies()
    }

    /// Main bus gain target, linear.
    pub fn main_gain(&self) -> f64 {
        self.bus.master_gain()
    }

    /// Melodic voice level target, linear. Binaural tracks sit lower.
    pub fn melodic_gain(&self) -> f64 {
        self.melodic.level()
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            state: self.state,
            context: self.context,
            time_secs: self.clock.now(),
            preset: self.current,
            pending_start: self.pending_start,
            binaural_hz: self.binaural.frequencies(),
            upcoming: self.melodic.upcoming(),
            active_ambient: self.ambient.active_ids(),
            main_volume: self.main_volume,
            ambient_volume: self.ambient_volume,
            muted: self.bus.is_muted(),
        }
    }

    // ── Rendering ───────────────────────────────────────────

    fn run_tick(&mut self) {
        let notes = self.scheduler.poll(self.clock.now());
        if !notes.is_empty() {
            self.melodic.schedule(notes);
        }
    }

    /// Render one block into separate channel buffers. Outputs silence, and
    /// leaves the clock where it is, unless the context is running.
    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        let frames = left.len().min(right.len());
        if self.context != ContextState::Running {
            left.fill(0.0);
            right.fill(0.0);
            return;
        }

        let mut done = 0;
        while done < frames {
            self.run_tick();
            let mut chunk = frames - done;
            if let Some(next) = self.scheduler.next_tick() {
                let until = self.clock.frame_at(next).saturating_sub(self.clock.frame());
                chunk = chunk.min((until as usize).max(1));
            }
            self.render_chunk(&mut left[done..done + chunk], &mut right[done..done + chunk]);
            done += chunk;
        }
    }

    fn render_chunk(&mut self, left: &mut [f32], right: &mut [f32]) {
        let n = left.len();
        let (mut sl, mut sr) = std::mem::take(&mut self.scratch);
        sl.clear();
        sl.resize(n, 0.0);
        sr.clear();
        sr.resize(n, 0.0);

        self.melodic.render_add(self.clock.frame(), &mut sl, &mut sr);
        self.binaural.render_add(&mut sl, &mut sr);
        self.ambient.render_add(&mut sl, &mut sr);

        for i in 0..n {
            let (l, r) = self.bus.process(sl[i], sr[i]);
            left[i] = l as f32;
            right[i] = r as f32;
        }
        self.clock.advance(n);
        self.scratch = (sl, sr);
    }

    /// Render interleaved stereo (`L R L R ...`).
    pub fn render_interleaved(&mut self, out: &mut [f32]) {
        let frames = out.len() / 2;
        let (mut l, mut r) = std::mem::take(&mut self.interleave);
        l.resize(frames, 0.0);
        r.resize(frames, 0.0);
        self.render(&mut l[..frames], &mut r[..frames]);
        for (i, frame) in out.chunks_exact_mut(2).enumerate() {
            frame[0] = l[i];
            frame[1] = r[i];
        }
        self.interleave = (l, r);
    }

    /// Render `frames` frames into new buffers.
    pub fn render_frames(&mut self, frames: usize) -> (Vec<f32>, Vec<f32>) {
        let mut left = vec![0.0; frames];
        let mut right = vec![0.0; frames];
        self.render(&mut left, &mut right);
        (left, right)
    }
}
